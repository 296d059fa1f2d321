use std::io::Cursor;
use common::err::decode_error::ReError;
use common::config::DecodeOptions;
use crate::column::column_metadata::ColumnMetadata;
use crate::column::column_value::ColumnValue;

/// Decodes the wire representation of one MySQL column type into a
/// `ColumnValue`. Each type in `column/decoders/` gets its own zero-sized
/// implementor; dispatch from `(type, meta)` to the right one lives in
/// `column::codec::decode_cell`, not here.
pub trait TypeDecoder: Send + Sync {
    fn decode(
        &self,
        cursor: &mut Cursor<&[u8]>,
        metadata: &ColumnMetadata,
        options: &DecodeOptions,
    ) -> Result<ColumnValue, ReError>;

    /// The MySQL column type identifier this decoder handles.
    fn column_type(&self) -> u8;

    fn type_name(&self) -> &'static str;
}
