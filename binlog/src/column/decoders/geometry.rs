use std::io::{Cursor, Read};
use byteorder::{LittleEndian, ReadBytesExt};
use common::err::decode_error::ReError;
use common::config::DecodeOptions;
use common::binlog::column::column_type::ColumnType;
use crate::column::column_metadata::ColumnMetadata;
use crate::column::column_value::ColumnValue;
use crate::column::type_decoder::TypeDecoder;

/// GEOMETRY (and MySQL 9's VECTOR) decode the same as BLOB: a `meta`-byte
/// little-endian length prefix followed by that many opaque bytes. Callers
/// that need the WKB structure parse it themselves from the returned bytes.
pub struct GeometryDecoder;

impl TypeDecoder for GeometryDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        let packlen = metadata.metadata as u8;
        if packlen == 0 || packlen > 4 {
            return Err(ReError::InvalidBlobPacklen(packlen));
        }
        let length = cursor.read_uint::<LittleEndian>(packlen as usize)? as usize;
        let mut buf = vec![0u8; length];
        cursor.read_exact(&mut buf)?;
        Ok(ColumnValue::Bytes(buf))
    }
    fn column_type(&self) -> u8 { ColumnType::Geometry as u8 }
    fn type_name(&self) -> &'static str { "GEOMETRY" }
}

/// MySQL 9.0's VECTOR column. Wire layout is identical to GEOMETRY/BLOB.
pub struct VectorDecoder;

impl TypeDecoder for VectorDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        let packlen = metadata.metadata as u8;
        if packlen == 0 || packlen > 4 {
            return Err(ReError::InvalidBlobPacklen(packlen));
        }
        let length = cursor.read_uint::<LittleEndian>(packlen as usize)? as usize;
        let mut buf = vec![0u8; length];
        cursor.read_exact(&mut buf)?;
        Ok(ColumnValue::Bytes(buf))
    }
    fn column_type(&self) -> u8 { ColumnType::Vector as u8 }
    fn type_name(&self) -> &'static str { "VECTOR" }
}
