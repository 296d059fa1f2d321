use std::io::{Cursor, Read};
use byteorder::{LittleEndian, ReadBytesExt};
use common::err::decode_error::ReError;

/// Test bit `i` of a bitmap that is packed LSB-first within each byte.
/// This is the convention used by null bitmaps, presence (image) bitmaps
/// and the partial-JSON bitmap.
pub fn bit_lsb_first(bitmap: &[u8], i: usize) -> bool {
    (bitmap[i / 8] >> (i % 8)) & 1 == 1
}

/// Test bit `i` of a bitmap that is packed MSB-first within each byte.
/// This is the convention used by the SIGNEDNESS and COLUMN_VISIBILITY
/// optional-metadata fields.
pub fn bit_msb_first(bitmap: &[u8], i: usize) -> bool {
    (bitmap[i / 8] >> (7 - i % 8)) & 1 == 1
}

/// Number of bits set in a bitmap, i.e. how many columns are present in an image.
pub fn popcount(bitmap: &[u8]) -> usize {
    bitmap.iter().map(|b| b.count_ones() as usize).sum()
}

pub fn bitmap_bytes(bit_count: usize) -> usize {
    (bit_count + 7) / 8
}

/// Read a MySQL length-encoded integer. Treated as a thin leaf adapter, not a
/// general wire-protocol facility: the surrounding stream/connection layer
/// owns the rest of the protocol's lenenc usage.
pub fn read_lenenc_int(cursor: &mut Cursor<&[u8]>) -> Result<u64, ReError> {
    let first = cursor.read_u8()?;
    match first {
        0..=0xfa => Ok(first as u64),
        0xfc => Ok(cursor.read_u16::<LittleEndian>()? as u64),
        0xfd => Ok(cursor.read_uint::<LittleEndian>(3)?),
        0xfe => Ok(cursor.read_u64::<LittleEndian>()?),
        other => Err(ReError::String(format!("unsupported lenenc prefix 0x{:x}", other))),
    }
}

/// Read a lenenc-prefixed byte string.
pub fn read_lenenc_bytes(cursor: &mut Cursor<&[u8]>) -> Result<Vec<u8>, ReError> {
    let len = read_lenenc_int(cursor)? as usize;
    read_exact_bytes(cursor, len)
}

pub fn read_exact_bytes(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>, ReError> {
    let mut buf = vec![0u8; len];
    cursor.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn read_fixed_len_uint(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<u64, ReError> {
    Ok(cursor.read_uint::<LittleEndian>(len)?)
}
