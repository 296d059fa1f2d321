use std::io::Cursor;
use common::err::decode_error::ReError;
use common::config::DecodeOptions;
use common::binlog::column::column_type::ColumnType;
use crate::column::column_metadata::ColumnMetadata;
use crate::column::column_value::ColumnValue;
use crate::column::type_decoder::TypeDecoder;
use crate::column::decoders::*;

/// Applies the STRING real-type rewrite described by the per-type metadata
/// table: a Table Map column_type byte of STRING (254) packs its *actual*
/// stored type and length into `meta` rather than carrying them directly.
/// `meta < 256` is the short-length encoding (STRING stays STRING, `meta`
/// is the length). `meta >= 256` packs `(real_type << 8) | length_byte`,
/// with the low two bits of `real_type`'s top nibble folded into the high
/// bits of the length for the long-CHAR() case. Every other column type
/// passes through unchanged.
pub fn rewrite_string_type(column_type: u8, meta: u16) -> (u8, u16) {
    if column_type != ColumnType::String as u8 || meta < 256 {
        return (column_type, meta);
    }
    let byte0 = (meta >> 8) as u8;
    let byte1 = (meta & 0xFF) as u8;
    if (byte0 & 0x30) != 0x30 {
        let length = byte1 as u16 | (((byte0 & 0x30) ^ 0x30) as u16) << 4;
        (byte0 | 0x30, length)
    } else {
        (byte0, byte1 as u16)
    }
}

/// Decodes a single cell's raw bytes given the owning column's Table Map
/// `(column_type, meta)` pair. Applies the STRING rewrite first, then
/// dispatches to the matching `TypeDecoder`. `is_partial` is forwarded into
/// the `ColumnMetadata` handed to the decoder; only `JsonDecoder` consults it.
pub fn decode_cell(
    cursor: &mut Cursor<&[u8]>,
    column_type: u8,
    meta: u16,
    is_partial: bool,
    options: &DecodeOptions,
) -> Result<ColumnValue, ReError> {
    let (real_type, real_meta) = rewrite_string_type(column_type, meta);
    let metadata = ColumnMetadata::new(real_type, real_meta).with_partial(is_partial);

    let kind = ColumnType::try_from(real_type)
        .map_err(|_| ReError::UnsupportedType(format!("unknown column type byte {}", real_type)))?;

    match kind {
        ColumnType::Null => Ok(ColumnValue::Null),
        ColumnType::Tiny => TinyIntDecoder.decode(cursor, &metadata, options),
        ColumnType::Short => SmallIntDecoder.decode(cursor, &metadata, options),
        ColumnType::Int24 => MediumIntDecoder.decode(cursor, &metadata, options),
        ColumnType::Long => IntDecoder.decode(cursor, &metadata, options),
        ColumnType::LongLong => BigIntDecoder.decode(cursor, &metadata, options),
        ColumnType::Float => FloatDecoder.decode(cursor, &metadata, options),
        ColumnType::Double => DoubleDecoder.decode(cursor, &metadata, options),
        ColumnType::Year => YearDecoder.decode(cursor, &metadata, options),
        ColumnType::Date => DateDecoder.decode(cursor, &metadata, options),
        ColumnType::Time => TimeDecoder.decode(cursor, &metadata, options),
        ColumnType::Time2 => Time2Decoder.decode(cursor, &metadata, options),
        ColumnType::DateTime => DateTimeDecoder.decode(cursor, &metadata, options),
        ColumnType::DateTime2 => DateTime2Decoder.decode(cursor, &metadata, options),
        ColumnType::Timestamp => TimestampDecoder.decode(cursor, &metadata, options),
        ColumnType::Timestamp2 => Timestamp2Decoder.decode(cursor, &metadata, options),
        ColumnType::VarChar => VarCharDecoder.decode(cursor, &metadata, options),
        ColumnType::VarString => VarStringDecoder.decode(cursor, &metadata, options),
        ColumnType::String => StringDecoder.decode(cursor, &metadata, options),
        ColumnType::Enum => EnumDecoder.decode(cursor, &metadata, options),
        ColumnType::Set => SetDecoder.decode(cursor, &metadata, options),
        ColumnType::Bit => BitDecoder.decode(cursor, &metadata, options),
        ColumnType::NewDecimal => DecimalDecoder.decode(cursor, &metadata, options),
        ColumnType::Decimal => Err(ReError::UnsupportedType("legacy DECIMAL (pre-5.0) is not supported".to_string())),
        ColumnType::Blob => BlobDecoder.decode(cursor, &metadata, options),
        ColumnType::TinyBlob => TinyBlobDecoder.decode(cursor, &metadata, options),
        ColumnType::MediumBlob => MediumBlobDecoder.decode(cursor, &metadata, options),
        ColumnType::LongBlob => LongBlobDecoder.decode(cursor, &metadata, options),
        ColumnType::Json => JsonTypeDecoder.decode(cursor, &metadata, options),
        ColumnType::Geometry => GeometryTypeDecoder.decode(cursor, &metadata, options),
        ColumnType::Vector => VectorDecoder.decode(cursor, &metadata, options),
        ColumnType::NewDate => Err(ReError::UnsupportedType("NEWDATE never appears as a wire column type".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_string_length_passes_through_unchanged() {
        assert_eq!(rewrite_string_type(ColumnType::String as u8, 120), (ColumnType::String as u8, 120));
    }

    #[test]
    fn long_char_rewrite_folds_high_bits_into_length() {
        // real_type byte = 0x01 (not 0x30-masked), length byte = 0xF4
        let meta = (0x01u16 << 8) | 0xF4;
        let (real_type, length) = rewrite_string_type(ColumnType::String as u8, meta);
        assert_eq!(real_type, 0x01 | 0x30);
        assert_eq!(length, 0xF4 | (((0x01u16 & 0x30) ^ 0x30) << 4));
    }

    #[test]
    fn enum_rewrite_reports_real_type_and_packlen() {
        let meta = ((ColumnType::Enum as u16) << 8) | 1;
        let (real_type, length) = rewrite_string_type(ColumnType::String as u8, meta);
        assert_eq!(real_type, ColumnType::Enum as u8);
        assert_eq!(length, 1);
    }

    #[test]
    fn dispatches_tiny_int_through_rewrite_free_path() {
        let data = vec![0xFAu8];
        let mut cursor = Cursor::new(data.as_slice());
        let result = decode_cell(&mut cursor, ColumnType::Tiny as u8, 0, false, &DecodeOptions::default()).unwrap();
        assert_eq!(result, ColumnValue::Integer(-6));
    }
}
