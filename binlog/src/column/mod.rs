// Value Codec: per-cell decoding of a row image's raw bytes into typed values.

pub mod column_metadata;
pub mod column_value;
pub mod type_decoder;
pub mod codec;
pub mod decoders;

pub use column_metadata::ColumnMetadata;
pub use column_value::ColumnValue;
pub use type_decoder::TypeDecoder;
pub use codec::{decode_cell, rewrite_string_type};
