//! Decoder for MySQL/MariaDB binlog row-based replication events:
//! TABLE_MAP events (schema snapshots) and WRITE/UPDATE/DELETE_ROWS events
//! (the row changes themselves), decoded independently of any particular
//! network transport or connection pool.

pub mod column;
pub mod metadata;
pub mod row;
mod utils;

pub use column::{decode_cell, rewrite_string_type, ColumnMetadata, ColumnValue, TypeDecoder};
pub use metadata::{decode_table_map, TableDescriptor};
pub use row::{decode_rows_event, NdbExtraInfo, RowChange, RowSkipped, RowsEvent, RowsEventKind, RowsEventType, RowsEventVersion, TableMap};
