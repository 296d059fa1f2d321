use std::io::{Cursor, Read};
use common::err::decode_error::ReError;
use common::config::DecodeOptions;
use common::binlog::column::column_type::ColumnType;
use crate::column::column_metadata::ColumnMetadata;
use crate::column::column_value::ColumnValue;
use crate::column::type_decoder::TypeDecoder;

/// BIT(M): `meta` packs the bit count as `(bytes << 8) | remainder_bits`. The
/// stored value is always read big-endian and zero-extended to 64 bits,
/// regardless of the declared width.
pub struct BitDecoder;

impl TypeDecoder for BitDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        let meta = metadata.metadata;
        let bits = ((meta >> 8) * 8) + (meta & 0xFF);
        if bits == 0 || bits > 64 {
            return Err(ReError::InvalidBitLength(bits));
        }
        let byte_len = ((bits as usize) + 7) / 8;
        let mut buf = [0u8; 8];
        cursor.read_exact(&mut buf[8 - byte_len..])?;
        let value = u64::from_be_bytes(buf);
        Ok(ColumnValue::Bit(value as i64))
    }
    fn column_type(&self) -> u8 { ColumnType::Bit as u8 }
    fn type_name(&self) -> &'static str { "BIT" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_reads_big_endian_zero_extended() {
        let decoder = BitDecoder;
        let data = vec![0xFFu8];
        let mut cursor = Cursor::new(data.as_slice());
        // meta = (1 << 8) | 0 => 1 byte, 0 remainder bits => 8 bits total
        let metadata = ColumnMetadata::new(ColumnType::Bit as u8, (1u16 << 8) | 0);
        let result = decoder.decode(&mut cursor, &metadata, &DecodeOptions::default()).unwrap();
        assert_eq!(result, ColumnValue::Bit(0xFF));
    }

    #[test]
    fn bit_spans_two_bytes() {
        let decoder = BitDecoder;
        let data = vec![0x01u8, 0x02];
        let mut cursor = Cursor::new(data.as_slice());
        let metadata = ColumnMetadata::new(ColumnType::Bit as u8, (2u16 << 8) | 0);
        let result = decoder.decode(&mut cursor, &metadata, &DecodeOptions::default()).unwrap();
        assert_eq!(result, ColumnValue::Bit(0x0102));
    }

    #[test]
    fn bit_rejects_zero_length() {
        let decoder = BitDecoder;
        let data: Vec<u8> = vec![];
        let mut cursor = Cursor::new(data.as_slice());
        let metadata = ColumnMetadata::new(ColumnType::Bit as u8, 0);
        let err = decoder.decode(&mut cursor, &metadata, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, ReError::InvalidBitLength(0)));
    }
}
