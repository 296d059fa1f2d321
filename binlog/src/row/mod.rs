pub mod rows_event;
pub mod rows_decoder;

pub use rows_event::{NdbExtraInfo, RowChange, RowSkipped, RowsEvent, RowsEventKind, RowsEventType, RowsEventVersion};
pub use rows_decoder::{decode_rows_event, TableMap};
