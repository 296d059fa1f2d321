use std::io::Cursor;
use byteorder::{LittleEndian, ReadBytesExt};
use common::err::decode_error::ReError;
use common::config::DecodeOptions;
use common::binlog::column::column_type::ColumnType;
use crate::column::column_metadata::ColumnMetadata;
use crate::column::column_value::ColumnValue;
use crate::column::type_decoder::TypeDecoder;

/// TINY, SHORT, INT24, LONG and LONGLONG share one decoder: each reads the
/// column's natural width as a plain two's-complement signed integer and
/// widens it to `i64`. The stored UNSIGNED flag never changes this — the
/// value codec always hands back the raw bit pattern reinterpreted as
/// signed; a caller that needs the true unsigned magnitude consults the
/// table's signedness bitmap and reinterprets the bits itself.
pub struct TinyIntDecoder;
pub struct SmallIntDecoder;
pub struct MediumIntDecoder;
pub struct IntDecoder;
pub struct BigIntDecoder;
pub struct FloatDecoder;
pub struct DoubleDecoder;

impl TypeDecoder for TinyIntDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, _metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        Ok(ColumnValue::Integer(cursor.read_u8()? as i8 as i64))
    }
    fn column_type(&self) -> u8 { ColumnType::Tiny as u8 }
    fn type_name(&self) -> &'static str { "TINYINT" }
}

impl TypeDecoder for SmallIntDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, _metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        Ok(ColumnValue::Integer(cursor.read_u16::<LittleEndian>()? as i16 as i64))
    }
    fn column_type(&self) -> u8 { ColumnType::Short as u8 }
    fn type_name(&self) -> &'static str { "SMALLINT" }
}

impl TypeDecoder for MediumIntDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, _metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        Ok(ColumnValue::Integer(cursor.read_i24::<LittleEndian>()? as i64))
    }
    fn column_type(&self) -> u8 { ColumnType::Int24 as u8 }
    fn type_name(&self) -> &'static str { "MEDIUMINT" }
}

impl TypeDecoder for IntDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, _metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        Ok(ColumnValue::Integer(cursor.read_u32::<LittleEndian>()? as i32 as i64))
    }
    fn column_type(&self) -> u8 { ColumnType::Long as u8 }
    fn type_name(&self) -> &'static str { "INT" }
}

impl TypeDecoder for BigIntDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, _metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        Ok(ColumnValue::Integer(cursor.read_u64::<LittleEndian>()? as i64))
    }
    fn column_type(&self) -> u8 { ColumnType::LongLong as u8 }
    fn type_name(&self) -> &'static str { "BIGINT" }
}

impl TypeDecoder for FloatDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, _metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        Ok(ColumnValue::Float(cursor.read_f32::<LittleEndian>()?))
    }
    fn column_type(&self) -> u8 { ColumnType::Float as u8 }
    fn type_name(&self) -> &'static str { "FLOAT" }
}

impl TypeDecoder for DoubleDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, _metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        Ok(ColumnValue::Double(cursor.read_f64::<LittleEndian>()?))
    }
    fn column_type(&self) -> u8 { ColumnType::Double as u8 }
    fn type_name(&self) -> &'static str { "DOUBLE" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tinyint_high_bit_storage_decodes_negative_regardless_of_signedness() {
        // raw byte 0xFA is the on-wire form of both UNSIGNED 250 and SIGNED -6;
        // the codec always returns the signed interpretation (spec scenario S2).
        let decoder = TinyIntDecoder;
        let data = vec![0xFAu8];
        let mut cursor = Cursor::new(data.as_slice());
        let metadata = ColumnMetadata::new(ColumnType::Tiny as u8, 0);
        let result = decoder.decode(&mut cursor, &metadata, &DecodeOptions::default()).unwrap();
        assert_eq!(result, ColumnValue::Integer(-6));
    }

    #[test]
    fn int_decoder_reads_little_endian() {
        let decoder = IntDecoder;
        let data = 12345i32.to_le_bytes().to_vec();
        let mut cursor = Cursor::new(data.as_slice());
        let metadata = ColumnMetadata::new(ColumnType::Long as u8, 0);
        let result = decoder.decode(&mut cursor, &metadata, &DecodeOptions::default()).unwrap();
        assert_eq!(result, ColumnValue::Integer(12345));
    }

    #[test]
    fn biglong_wraps_full_width_unsigned_storage_to_negative() {
        let decoder = BigIntDecoder;
        let data = u64::MAX.to_le_bytes().to_vec();
        let mut cursor = Cursor::new(data.as_slice());
        let metadata = ColumnMetadata::new(ColumnType::LongLong as u8, 0);
        let result = decoder.decode(&mut cursor, &metadata, &DecodeOptions::default()).unwrap();
        assert_eq!(result, ColumnValue::Integer(-1));
    }
}
