use std::io::Cursor;
use byteorder::{LittleEndian, ReadBytesExt};
use common::err::decode_error::ReError;
use common::binlog::column::column_type::{ColumnType, Flavor};
use crate::metadata::default_charset::DefaultCharset;
use crate::metadata::metadata_type::MetadataType;
use crate::metadata::table_descriptor::TableDescriptor;
use crate::utils::{bitmap_bytes, read_exact_bytes, read_lenenc_bytes, read_lenenc_int};

/// Decodes a TABLE_MAP_EVENT body into a [`TableDescriptor`]. `table_id_size`
/// is 6 on every server still in use; it is a parameter rather than a
/// constant only because the FORMAT_DESCRIPTION event formally allows 4.
pub fn decode_table_map(
    cursor: &mut Cursor<&[u8]>,
    flavor: Flavor,
    table_id_size: u8,
) -> Result<TableDescriptor, ReError> {
    let table_id = cursor.read_uint::<LittleEndian>(table_id_size as usize)?;
    let flags = cursor.read_u16::<LittleEndian>()?;

    let schema = read_null_terminated_name(cursor)?;
    let table = read_null_terminated_name(cursor)?;

    let column_count = read_lenenc_int(cursor)? as usize;
    let column_type = read_exact_bytes(cursor, column_count)?;

    let _column_meta_block_len = read_lenenc_int(cursor)?;
    let mut column_meta = Vec::with_capacity(column_count);
    for &raw_type in &column_type {
        let kind = ColumnType::try_from(raw_type)
            .map_err(|_| ReError::UnsupportedType(format!("unknown column type byte {} in table map", raw_type)))?;
        column_meta.push(read_column_meta(cursor, kind)?);
    }

    let null_bitmap = read_exact_bytes(cursor, bitmap_bytes(column_count))?;

    let mut descriptor = TableDescriptor {
        flavor,
        table_id_size,
        table_id,
        flags,
        schema,
        table,
        column_type,
        column_meta,
        null_bitmap,
        signedness_bitmap: None,
        default_charset: None,
        column_charset: None,
        enum_set_default_charset: None,
        enum_set_column_charset: None,
        set_str_values: None,
        enum_str_values: None,
        column_names: None,
        primary_key: None,
        primary_key_prefix: None,
        geometry_types: None,
        visibility_bitmap: None,
    };

    decode_optional_metadata(cursor, &mut descriptor)?;
    Ok(descriptor)
}

fn read_null_terminated_name(cursor: &mut Cursor<&[u8]>) -> Result<Vec<u8>, ReError> {
    let len = cursor.read_u8()? as usize;
    let name = read_exact_bytes(cursor, len)?;
    let terminator = cursor.read_u8()?;
    if terminator != 0 {
        return Err(ReError::String(format!("expected null terminator after name, found 0x{:x}", terminator)));
    }
    Ok(name)
}

fn read_column_meta(cursor: &mut Cursor<&[u8]>, kind: ColumnType) -> Result<u16, ReError> {
    // These never appear directly as a Table Map column_type byte: ENUM/SET
    // only reach us as STRING with a real-type override, DATE is always
    // written as NEWDATE's 0-meta sibling... but MySQL's own column type
    // table lists them as having no independently defined wire meta, so a
    // table map that names one directly is malformed rather than silently
    // zero-meta.
    if matches!(
        kind,
        ColumnType::NewDate
            | ColumnType::Enum
            | ColumnType::Set
            | ColumnType::TinyBlob
            | ColumnType::MediumBlob
            | ColumnType::LongBlob
    ) {
        return Err(ReError::UnsupportedType(format!("{:?} never appears directly in a table map column_type list", kind)));
    }
    Ok(match kind.meta_bytes() {
        0 => 0,
        1 => cursor.read_u8()? as u16,
        2 => match kind {
            // VARCHAR's 2-byte metadata is the declared max length, stored
            // as a plain little-endian integer.
            ColumnType::VarChar => cursor.read_u16::<LittleEndian>()?,
            // NEWDECIMAL (precision, scale), STRING (real_type, length) and
            // BIT (whole bytes, remainder bits) each pack two independent
            // byte fields as `(first << 8) | second`, not a little-endian
            // integer.
            _ => {
                let hi = cursor.read_u8()? as u16;
                let lo = cursor.read_u8()? as u16;
                (hi << 8) | lo
            }
        },
        other => return Err(ReError::BUG(format!("unexpected meta_bytes() {} for {:?}", other, kind))),
    })
}

fn decode_optional_metadata(cursor: &mut Cursor<&[u8]>, descriptor: &mut TableDescriptor) -> Result<(), ReError> {
    let numeric_count = descriptor
        .column_type
        .iter()
        .filter(|&&t| is_numeric(t))
        .count();
    let character_count = descriptor.character_column_indices().len();

    while let Ok(type_byte) = cursor.read_u8() {
        let length = read_lenenc_int(cursor)? as usize;
        let value = read_exact_bytes(cursor, length)?;
        let mut value_cursor = Cursor::new(value.as_slice());

        let metadata_type = match MetadataType::try_from(type_byte) {
            Ok(mt) => mt,
            Err(_) => continue, // unknown metadata type: skip, already consumed via length
        };

        match metadata_type {
            MetadataType::Signedness => {
                descriptor.signedness_bitmap = Some(read_exact_bytes(&mut value_cursor, bitmap_bytes(numeric_count))?);
            }
            MetadataType::DefaultCharset => {
                descriptor.default_charset = Some(read_default_charset(&mut value_cursor).map_err(|e| {
                    ReError::MalformedOptionalMetadata(format!("DEFAULT_CHARSET: {}", e))
                })?);
            }
            MetadataType::ColumnCharset => {
                descriptor.column_charset = Some(read_charset_list(&mut value_cursor, character_count)?);
            }
            MetadataType::ColumnName => {
                let mut names = Vec::with_capacity(descriptor.column_count());
                while (value_cursor.position() as usize) < value.len() {
                    names.push(String::from_utf8(read_lenenc_bytes(&mut value_cursor)?)?);
                }
                if names.len() != descriptor.column_count() {
                    return Err(ReError::MalformedOptionalMetadata(format!(
                        "COLUMN_NAME: name-count mismatch, got {} names for {} columns",
                        names.len(),
                        descriptor.column_count()
                    )));
                }
                descriptor.column_names = Some(names);
            }
            MetadataType::SetStrValue => {
                descriptor.set_str_values = Some(read_str_value_list(&mut value_cursor, &value)?);
            }
            MetadataType::EnumStrValue => {
                descriptor.enum_str_values = Some(read_str_value_list(&mut value_cursor, &value)?);
            }
            MetadataType::GeometryType => {
                let mut types = Vec::new();
                while (value_cursor.position() as usize) < value.len() {
                    types.push(read_lenenc_int(&mut value_cursor)? as u32);
                }
                descriptor.geometry_types = Some(types);
            }
            MetadataType::SimplePrimaryKey => {
                // Lenient by design: a truncated or malformed SIMPLE_PRIMARY_KEY
                // block degrades to "whatever parsed so far" instead of
                // failing the whole Table Map decode, unlike DEFAULT_CHARSET.
                let mut indices = Vec::new();
                while (value_cursor.position() as usize) < value.len() {
                    match read_lenenc_int(&mut value_cursor) {
                        Ok(idx) => indices.push(idx as u32),
                        Err(_) => break,
                    }
                }
                descriptor.primary_key = Some(indices);
            }
            MetadataType::PrimaryKeyWithPrefix => {
                let mut indices = Vec::new();
                let mut prefixes = Vec::new();
                while (value_cursor.position() as usize) < value.len() {
                    let idx = read_lenenc_int(&mut value_cursor)? as u32;
                    let prefix = read_lenenc_int(&mut value_cursor)? as u32;
                    indices.push(idx);
                    prefixes.push(prefix);
                }
                descriptor.primary_key = Some(indices);
                descriptor.primary_key_prefix = Some(prefixes);
            }
            MetadataType::EnumAndSetDefaultCharset => {
                descriptor.enum_set_default_charset = Some(read_default_charset(&mut value_cursor).map_err(|e| {
                    ReError::MalformedOptionalMetadata(format!("ENUM_AND_SET_DEFAULT_CHARSET: {}", e))
                })?);
            }
            MetadataType::EnumAndSetColumnCharset => {
                let enum_set_count = descriptor.enum_set_column_indices().len();
                descriptor.enum_set_column_charset = Some(read_charset_list(&mut value_cursor, enum_set_count)?);
            }
            MetadataType::ColumnVisibility => {
                descriptor.visibility_bitmap = Some(read_exact_bytes(&mut value_cursor, bitmap_bytes(descriptor.column_count()))?);
            }
        }
    }
    Ok(())
}

fn is_numeric(column_type: u8) -> bool {
    matches!(
        ColumnType::try_from(column_type),
        Ok(ColumnType::Tiny)
            | Ok(ColumnType::Short)
            | Ok(ColumnType::Int24)
            | Ok(ColumnType::Long)
            | Ok(ColumnType::LongLong)
            | Ok(ColumnType::Float)
            | Ok(ColumnType::Double)
            | Ok(ColumnType::NewDecimal)
    )
}

fn read_default_charset(cursor: &mut Cursor<&[u8]>) -> Result<DefaultCharset, ReError> {
    let default_charset_collation = read_lenenc_int(cursor)? as u32;
    let mut overrides = Vec::new();
    let data = cursor.get_ref();
    while (cursor.position() as usize) < data.len() {
        let column_index = read_lenenc_int(cursor)? as u32;
        let charset_collation = read_lenenc_int(cursor)? as u32;
        overrides.push((column_index, charset_collation));
    }
    Ok(DefaultCharset::new(default_charset_collation, overrides))
}

fn read_charset_list(cursor: &mut Cursor<&[u8]>, expected_count: usize) -> Result<Vec<u32>, ReError> {
    let mut charsets = Vec::with_capacity(expected_count);
    let data = cursor.get_ref();
    while (cursor.position() as usize) < data.len() {
        charsets.push(read_lenenc_int(cursor)? as u32);
    }
    Ok(charsets)
}

fn read_str_value_list(cursor: &mut Cursor<&[u8]>, value: &[u8]) -> Result<Vec<Vec<String>>, ReError> {
    let mut columns = Vec::new();
    while (cursor.position() as usize) < value.len() {
        let count = read_lenenc_int(cursor)? as usize;
        let mut labels = Vec::with_capacity(count);
        for _ in 0..count {
            labels.push(String::from_utf8(read_lenenc_bytes(cursor)?)?);
        }
        columns.push(labels);
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_name(name: &[u8]) -> Vec<u8> {
        let mut v = vec![name.len() as u8];
        v.extend_from_slice(name);
        v.push(0);
        v
    }

    #[test]
    fn rejects_enum_appearing_directly_as_a_column_type() {
        let mut data = Vec::new();
        data.extend_from_slice(&1u64.to_le_bytes()[..6]);
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&encode_name(b"db"));
        data.extend_from_slice(&encode_name(b"t"));
        data.push(1); // column_count
        data.push(ColumnType::Enum as u8);

        let mut cursor = Cursor::new(data.as_slice());
        let err = decode_table_map(&mut cursor, Flavor::Mysql, 6).unwrap_err();
        assert!(matches!(err, ReError::UnsupportedType(_)));
    }

    #[test]
    fn decodes_a_minimal_two_column_table() {
        let mut data = Vec::new();
        data.extend_from_slice(&1u64.to_le_bytes()[..6]); // table_id
        data.extend_from_slice(&0u16.to_le_bytes()); // flags
        data.extend_from_slice(&encode_name(b"db"));
        data.extend_from_slice(&encode_name(b"t"));
        data.push(2); // column_count
        data.push(ColumnType::Tiny as u8);
        data.push(ColumnType::VarChar as u8);
        data.push(3); // meta block length: 0 (tiny) + 2 (varchar)
        data.extend_from_slice(&20u16.to_le_bytes()); // varchar max length meta
        data.push(0b0000_0010); // null_bitmap: column 1 nullable

        let mut cursor = Cursor::new(data.as_slice());
        let descriptor = decode_table_map(&mut cursor, Flavor::Mysql, 6).unwrap();

        assert_eq!(descriptor.table_id, 1);
        assert_eq!(descriptor.schema, b"db");
        assert_eq!(descriptor.table, b"t");
        assert_eq!(descriptor.column_count(), 2);
        assert_eq!(descriptor.column_meta, vec![0, 20]);
        assert!(!descriptor.is_nullable(0));
        assert!(descriptor.is_nullable(1));
    }

    #[test]
    fn decodes_signedness_and_visibility_optional_metadata() {
        let mut data = Vec::new();
        data.extend_from_slice(&7u64.to_le_bytes()[..6]);
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&encode_name(b"db"));
        data.extend_from_slice(&encode_name(b"t"));
        data.push(1); // column_count
        data.push(ColumnType::Tiny as u8);
        data.push(0); // meta block length
        data.push(0b0000_0000); // null_bitmap

        // SIGNEDNESS: 1 numeric column, bitmap MSB-first, bit 0 set (unsigned)
        data.push(MetadataType::Signedness as u8);
        data.push(1); // lenenc length
        data.push(0b1000_0000);

        // COLUMN_VISIBILITY: 1 column, bit 0 clear (hidden)
        data.push(MetadataType::ColumnVisibility as u8);
        data.push(1);
        data.push(0b0000_0000);

        let mut cursor = Cursor::new(data.as_slice());
        let descriptor = decode_table_map(&mut cursor, Flavor::Mysql, 6).unwrap();

        assert!(descriptor.is_unsigned(0));
        assert!(!descriptor.is_visible(0));
    }

    #[test]
    fn year_is_temporal_not_numeric_for_signedness_indexing() {
        // (y YEAR, a INT UNSIGNED): only `a` is numeric, so SIGNEDNESS must be
        // indexed as a single bit, not two.
        let mut data = Vec::new();
        data.extend_from_slice(&8u64.to_le_bytes()[..6]);
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&encode_name(b"db"));
        data.extend_from_slice(&encode_name(b"t"));
        data.push(2); // column_count
        data.push(ColumnType::Year as u8);
        data.push(ColumnType::Long as u8);
        data.push(0); // meta block length: both types carry 0 meta bytes
        data.push(0b0000_0000); // null_bitmap

        // SIGNEDNESS: 1 numeric column (`a`), MSB-first, bit 0 set (unsigned)
        data.push(MetadataType::Signedness as u8);
        data.push(1); // lenenc length
        data.push(0b1000_0000);

        let mut cursor = Cursor::new(data.as_slice());
        let descriptor = decode_table_map(&mut cursor, Flavor::Mysql, 6).unwrap();
        assert!(descriptor.is_unsigned(0));
    }

    #[test]
    fn column_name_count_mismatch_is_malformed_optional_metadata() {
        let mut data = Vec::new();
        data.extend_from_slice(&10u64.to_le_bytes()[..6]);
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&encode_name(b"db"));
        data.extend_from_slice(&encode_name(b"t"));
        data.push(3); // column_count
        data.push(ColumnType::Tiny as u8);
        data.push(ColumnType::Tiny as u8);
        data.push(ColumnType::Tiny as u8);
        data.push(0); // meta block length
        data.push(0b0000_0000); // null_bitmap

        // COLUMN_NAME: only 2 names for 3 columns
        let mut value = Vec::new();
        value.push(1);
        value.extend_from_slice(b"a");
        value.push(1);
        value.extend_from_slice(b"b");
        data.push(MetadataType::ColumnName as u8);
        data.push(value.len() as u8);
        data.extend_from_slice(&value);

        let mut cursor = Cursor::new(data.as_slice());
        let err = decode_table_map(&mut cursor, Flavor::Mysql, 6).unwrap_err();
        assert!(matches!(err, ReError::MalformedOptionalMetadata(_)));
    }

    #[test]
    fn decodes_default_charset_with_per_column_override() {
        let mut data = Vec::new();
        data.extend_from_slice(&9u64.to_le_bytes()[..6]);
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&encode_name(b"db"));
        data.extend_from_slice(&encode_name(b"t"));
        data.push(1);
        data.push(ColumnType::VarChar as u8);
        data.push(2);
        data.extend_from_slice(&10u16.to_le_bytes());
        data.push(0); // null_bitmap

        // DEFAULT_CHARSET value: default=33, then one override (col 0 -> 45)
        let value: Vec<u8> = vec![33, 0, 45];
        data.push(MetadataType::DefaultCharset as u8);
        data.push(value.len() as u8);
        data.extend_from_slice(&value);

        let mut cursor = Cursor::new(data.as_slice());
        let descriptor = decode_table_map(&mut cursor, Flavor::Mysql, 6).unwrap();
        assert_eq!(descriptor.charset_for_column(0), Some(45));
    }
}
