use std::io::{Cursor, Read};
use byteorder::{LittleEndian, ReadBytesExt};
use common::err::decode_error::ReError;
use common::config::DecodeOptions;
use common::binlog::column::column_type::ColumnType;
use crate::column::column_metadata::ColumnMetadata;
use crate::column::column_value::ColumnValue;
use crate::column::type_decoder::TypeDecoder;

/// BLOB family and GEOMETRY/VECTOR share a decode shape: a length prefix whose
/// own width is carried in `meta` (1..=4 bytes, little-endian), followed by
/// that many payload bytes. None of these types ever reach the wire with a
/// different pack length, so one routine covers TINY/MEDIUM/LONG_BLOB too
/// (they are normalized to plain BLOB by the Table Map Decoder).
fn read_length_prefixed(cursor: &mut Cursor<&[u8]>, meta: u16) -> Result<Vec<u8>, ReError> {
    let packlen = meta as u8;
    if packlen == 0 || packlen > 4 {
        return Err(ReError::InvalidBlobPacklen(packlen));
    }
    let length = cursor.read_uint::<LittleEndian>(packlen as usize)? as usize;
    let mut buf = vec![0u8; length];
    cursor.read_exact(&mut buf)?;
    Ok(buf)
}

pub struct BlobDecoder;
pub struct TinyBlobDecoder;
pub struct MediumBlobDecoder;
pub struct LongBlobDecoder;

impl TypeDecoder for BlobDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        Ok(ColumnValue::Bytes(read_length_prefixed(cursor, metadata.metadata)?))
    }
    fn column_type(&self) -> u8 { ColumnType::Blob as u8 }
    fn type_name(&self) -> &'static str { "BLOB" }
}

/// Kept for symmetry with the teacher's per-subtype decoders; the Table Map
/// Decoder always normalizes these to plain BLOB before a cell is ever
/// decoded, so this is never reached on a real wire stream.
impl TypeDecoder for TinyBlobDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        Ok(ColumnValue::Bytes(read_length_prefixed(cursor, metadata.metadata)?))
    }
    fn column_type(&self) -> u8 { ColumnType::TinyBlob as u8 }
    fn type_name(&self) -> &'static str { "TINYBLOB" }
}

impl TypeDecoder for MediumBlobDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        Ok(ColumnValue::Bytes(read_length_prefixed(cursor, metadata.metadata)?))
    }
    fn column_type(&self) -> u8 { ColumnType::MediumBlob as u8 }
    fn type_name(&self) -> &'static str { "MEDIUMBLOB" }
}

impl TypeDecoder for LongBlobDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        Ok(ColumnValue::Bytes(read_length_prefixed(cursor, metadata.metadata)?))
    }
    fn column_type(&self) -> u8 { ColumnType::LongBlob as u8 }
    fn type_name(&self) -> &'static str { "LONGBLOB" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_reads_its_own_length_prefix_width() {
        let decoder = BlobDecoder;
        let mut data = vec![3u8, 0, 0, 0];
        data.extend_from_slice(b"abc");
        let mut cursor = Cursor::new(data.as_slice());
        let metadata = ColumnMetadata::new(ColumnType::Blob as u8, 4);
        let result = decoder.decode(&mut cursor, &metadata, &DecodeOptions::default()).unwrap();
        assert_eq!(result, ColumnValue::Bytes(b"abc".to_vec()));
    }

    #[test]
    fn blob_rejects_out_of_range_packlen() {
        let decoder = BlobDecoder;
        let data = vec![0u8];
        let mut cursor = Cursor::new(data.as_slice());
        let metadata = ColumnMetadata::new(ColumnType::Blob as u8, 5);
        let err = decoder.decode(&mut cursor, &metadata, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, ReError::InvalidBlobPacklen(5)));
    }
}
