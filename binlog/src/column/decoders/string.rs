use std::io::{Cursor, Read};
use byteorder::{LittleEndian, ReadBytesExt};
use common::err::decode_error::ReError;
use common::config::DecodeOptions;
use common::binlog::column::column_type::ColumnType;
use crate::column::column_metadata::ColumnMetadata;
use crate::column::column_value::ColumnValue;
use crate::column::type_decoder::TypeDecoder;

/// VARCHAR / VAR_STRING / STRING share one length-prefix rule: a 1-byte
/// length if `meta < 256`, otherwise a 2-byte little-endian length.
fn read_length_prefixed_text(cursor: &mut Cursor<&[u8]>, meta: u16) -> Result<String, ReError> {
    let length = if meta < 256 {
        cursor.read_u8()? as usize
    } else {
        cursor.read_u16::<LittleEndian>()? as usize
    };
    let mut buf = vec![0u8; length];
    cursor.read_exact(&mut buf)?;
    Ok(String::from_utf8(buf)?)
}

pub struct VarCharDecoder;

impl TypeDecoder for VarCharDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        Ok(ColumnValue::Text(read_length_prefixed_text(cursor, metadata.metadata)?))
    }
    fn column_type(&self) -> u8 { ColumnType::VarChar as u8 }
    fn type_name(&self) -> &'static str { "VARCHAR" }
}

pub struct VarStringDecoder;

impl TypeDecoder for VarStringDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        Ok(ColumnValue::Text(read_length_prefixed_text(cursor, metadata.metadata)?))
    }
    fn column_type(&self) -> u8 { ColumnType::VarString as u8 }
    fn type_name(&self) -> &'static str { "VAR_STRING" }
}

/// Reached only after the STRING type/length rewrite (see `column::codec`)
/// has produced the true on-wire length; `metadata.metadata` here already
/// carries the rewritten value, not the raw Table Map meta.
pub struct StringDecoder;

impl TypeDecoder for StringDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        Ok(ColumnValue::Text(read_length_prefixed_text(cursor, metadata.metadata)?))
    }
    fn column_type(&self) -> u8 { ColumnType::String as u8 }
    fn type_name(&self) -> &'static str { "STRING" }
}

pub struct EnumDecoder;

impl TypeDecoder for EnumDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        let packlen = (metadata.metadata & 0xFF) as u8;
        if packlen != 1 && packlen != 2 {
            return Err(ReError::UnknownEnumPacklen(packlen));
        }
        let value = cursor.read_uint::<LittleEndian>(packlen as usize)?;
        Ok(ColumnValue::Enum(value as i64))
    }
    fn column_type(&self) -> u8 { ColumnType::Enum as u8 }
    fn type_name(&self) -> &'static str { "ENUM" }
}

pub struct SetDecoder;

impl TypeDecoder for SetDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        let packlen = (metadata.metadata & 0xFF) as u8;
        if packlen == 0 || packlen > 8 {
            return Err(ReError::UnknownEnumPacklen(packlen));
        }
        let value = cursor.read_uint::<LittleEndian>(packlen as usize)?;
        Ok(ColumnValue::Set(value as i64))
    }
    fn column_type(&self) -> u8 { ColumnType::Set as u8 }
    fn type_name(&self) -> &'static str { "SET" }
}
