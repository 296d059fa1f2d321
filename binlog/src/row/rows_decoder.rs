use std::any::Any;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::panic::{catch_unwind, AssertUnwindSafe};
use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;
use common::config::DecodeOptions;
use common::err::decode_error::ReError;
use common::binlog::column::column_type::ColumnType;
use crate::column::codec::decode_cell;
use crate::column::ColumnValue;
use crate::metadata::table_descriptor::TableDescriptor;
use crate::row::rows_event::{NdbExtraInfo, RowChange, RowSkipped, RowsEvent, RowsEventKind, RowsEventType, RowsEventVersion};
use crate::utils::{bit_lsb_first, bitmap_bytes, popcount, read_exact_bytes, read_lenenc_int};

/// `table_id -> TableDescriptor` lookup the Rows Decoder is handed by its
/// caller; built up from every TABLE_MAP event seen earlier in the stream.
pub type TableMap = HashMap<u64, TableDescriptor>;

/// Extra-data TLV type codes carried by a V2 rows event, between the
/// extra-data length field and `column_count`.
const EXTRA_ROW_INFO_TYPECODE_NDB: u8 = 0;
const EXTRA_ROW_INFO_TYPECODE_PARTITION: u8 = 1;

/// Bit 0 of `binlog_row_value_options`: this after-image carries a
/// partial-JSON diff bitmap instead of full JSON documents.
const PARTIAL_JSON_ROW_VALUE_OPTION: u64 = 0x1;

/// Decodes a WRITE/UPDATE/DELETE_ROWS (v0, v1, v2, or PARTIAL_UPDATE) event
/// body into a [`RowsEvent`]. `data` is the event body after the common
/// 19-byte header has already been stripped. `compressed` reflects whatever
/// the surrounding stream reader determined about MariaDB row-event
/// compression from the FDE's post-header lengths; it is OR'd with whatever
/// the event's own type code implies (MariaDB's `*_COMPRESSED_EVENT[_V1]`
/// codes are self-describing, but callers may also detect compression from
/// context this decoder doesn't see).
///
/// A malformed row body can panic deep inside a `TypeDecoder` (an
/// unexpectedly short buffer turning an `unwrap`-free bounds check into an
/// out-of-bounds slice, say) rather than surfacing a typed error. That panic
/// is caught here and converted to [`ReError::ParseRowsPanic`] so one bad
/// event cannot take down a caller driving a long-lived stream.
pub fn decode_rows_event(
    data: &[u8],
    event_type_code: u8,
    compressed: bool,
    table_id_size: u8,
    tables: &TableMap,
    options: &DecodeOptions,
) -> Result<RowsEvent, ReError> {
    let event_type = RowsEventType::from_code(event_type_code)?;
    let compressed = compressed || event_type.is_compressed();

    let decompressed;
    let body: &[u8] = if compressed {
        decompressed = decompress_zlib(data)?;
        &decompressed
    } else {
        data
    };

    let mut cursor = Cursor::new(body);
    let table_id = cursor.read_uint::<LittleEndian>(table_id_size as usize)?;
    let flags = cursor.read_u16::<LittleEndian>()?;

    let mut ndb_info = None;
    let mut partition_id = None;
    let mut source_partition_id = None;

    if matches!(event_type.version(), RowsEventVersion::V2) {
        let extra_len = cursor.read_u16::<LittleEndian>()?;
        let payload_len = (extra_len as usize).checked_sub(2).ok_or_else(|| {
            ReError::String(format!("rows event extra-data length {} underflows its own header", extra_len))
        })?;
        let extra_data = read_exact_bytes(&mut cursor, payload_len)?;
        let (ndb, part, source_part) = parse_extra_data(&extra_data, event_type.needs_bitmap2())?;
        ndb_info = ndb;
        partition_id = part;
        source_partition_id = source_part;
    }

    let table = tables.get(&table_id).ok_or_else(|| {
        if tables.is_empty() {
            ReError::MissingTableMap(table_id)
        } else {
            ReError::UnknownTableId(table_id)
        }
    })?;

    let result = catch_unwind(AssertUnwindSafe(|| decode_rows_body(&mut cursor, body.len(), event_type, table, options)));

    match result {
        Ok(Ok((column_count, before_bitmap, after_bitmap, rows, skipped_columns))) => Ok(RowsEvent {
            table_id,
            flags,
            event_type,
            column_count,
            columns_before_image: before_bitmap,
            columns_after_image: after_bitmap,
            rows,
            skipped_columns,
            ndb_info,
            partition_id,
            source_partition_id,
        }),
        Ok(Err(e)) => Err(e),
        Err(payload) => Err(ReError::ParseRowsPanic {
            table_id,
            message: panic_message(&payload),
        }),
    }
}

/// Parses the extra-data TLV block that follows a V2 event's extra-data
/// length field. An unrecognized type code has no declared length to skip
/// safely by, so parsing stops there rather than guessing.
/// Returns `(ndb_info, partition_id, source_partition_id)`.
fn parse_extra_data(
    data: &[u8],
    needs_bitmap2: bool,
) -> Result<(Option<NdbExtraInfo>, Option<u16>, Option<u16>), ReError> {
    let mut cursor = Cursor::new(data);
    let mut ndb_info = None;
    let mut partition_id = None;
    let mut source_partition_id = None;

    while (cursor.position() as usize) < data.len() {
        let type_code = cursor.read_u8()?;
        match type_code {
            EXTRA_ROW_INFO_TYPECODE_NDB => {
                let len = cursor.read_u8()? as usize;
                let format = cursor.read_u8()?;
                let ndb_len = len.checked_sub(2).ok_or_else(|| {
                    ReError::String(format!("NDB extra row info length {} too short for its own format byte", len))
                })?;
                let ndb_data = read_exact_bytes(&mut cursor, ndb_len)?;
                ndb_info = Some(NdbExtraInfo { format, data: ndb_data });
            }
            EXTRA_ROW_INFO_TYPECODE_PARTITION => {
                partition_id = Some(cursor.read_u16::<LittleEndian>()?);
                if needs_bitmap2 {
                    source_partition_id = Some(cursor.read_u16::<LittleEndian>()?);
                }
            }
            _ => break, // unknown type code: no declared length, stop rather than misparse
        }
    }
    Ok((ndb_info, partition_id, source_partition_id))
}

type RowsBody = (usize, Vec<u8>, Option<Vec<u8>>, Vec<RowChange>, Vec<RowSkipped>);

fn decode_rows_body(
    cursor: &mut Cursor<&[u8]>,
    body_len: usize,
    event_type: RowsEventType,
    table: &TableDescriptor,
    options: &DecodeOptions,
) -> Result<RowsBody, ReError> {
    let column_count = crate::utils::read_lenenc_int(cursor)? as usize;
    let before_bitmap = read_exact_bytes(cursor, bitmap_bytes(column_count))?;
    let after_bitmap = if event_type.needs_bitmap2() {
        Some(read_exact_bytes(cursor, bitmap_bytes(column_count))?)
    } else {
        None
    };

    let mut rows = Vec::new();
    let mut skipped_columns = Vec::new();
    while (cursor.position() as usize) < body_len {
        let (row, skips) = match event_type.kind() {
            RowsEventKind::Write => {
                let (values, skipped) = decode_row_image(cursor, table, &before_bitmap, false, options)?;
                (RowChange::Insert { after: values }, RowSkipped { before: skipped, after: None })
            }
            RowsEventKind::Delete => {
                let (values, skipped) = decode_row_image(cursor, table, &before_bitmap, false, options)?;
                (RowChange::Delete { before: values }, RowSkipped { before: skipped, after: None })
            }
            RowsEventKind::Update => {
                let (before, before_skipped) = decode_row_image(cursor, table, &before_bitmap, false, options)?;
                let after_image_bitmap = after_bitmap.as_ref().expect("UPDATE always carries an after-image bitmap");
                let (after, after_skipped) =
                    decode_row_image(cursor, table, after_image_bitmap, event_type.is_partial_update(), options)?;
                (RowChange::Update { before, after }, RowSkipped { before: before_skipped, after: Some(after_skipped) })
            }
        };
        rows.push(row);
        skipped_columns.push(skips);
    }

    Ok((column_count, before_bitmap, after_bitmap, rows, skipped_columns))
}

/// Decodes one row image (one before- or after-image) against `presence`,
/// the bitmap naming which columns this image carries at all. Returns the
/// decoded `(column_index, value)` pairs plus the full-column indices this
/// image skipped entirely (bit 0 in `presence`).
///
/// `may_be_partial` is set only for a PARTIAL_UPDATE_ROWS after-image: the
/// image first carries a lenenc `binlog_row_value_options`, whose bit 0
/// signals that a bitmap of one bit per *JSON* column present in this image
/// follows the null bitmap, marking which JSON columns carry a diff instead
/// of a full document. The JSON-column cursor into that bitmap must advance
/// for every JSON column the loop visits, independent of whether that column
/// turns out to be null or absent — skipping the advance on a null JSON
/// column silently misaligns every partial bit after it.
fn decode_row_image(
    cursor: &mut Cursor<&[u8]>,
    table: &TableDescriptor,
    presence: &[u8],
    may_be_partial: bool,
    options: &DecodeOptions,
) -> Result<(Vec<(usize, ColumnValue)>, Vec<usize>), ReError> {
    let partial_json_mode = if may_be_partial {
        let row_value_options = read_lenenc_int(cursor)?;
        row_value_options & PARTIAL_JSON_ROW_VALUE_OPTION != 0
    } else {
        false
    };

    let population_count = popcount(presence);
    let null_bitmap = read_exact_bytes(cursor, bitmap_bytes(population_count))?;

    // The partial bitmap is sized over every JSON column the table declares,
    // not just the ones present in this image: the partial-bit cursor below
    // advances for every JSON column it visits regardless of presence, so a
    // column absent from this image still consumes a bit.
    let total_json_columns = (0..table.column_count()).filter(|&i| is_json_column(table, i)).count();
    let partial_bitmap = if partial_json_mode {
        Some(read_exact_bytes(cursor, bitmap_bytes(total_json_columns))?)
    } else {
        None
    };

    let mut values = Vec::new();
    let mut skipped_indices = Vec::new();
    let mut partial_bit_i = 0usize;
    let mut null_bit_i = 0usize;
    for column_index in 0..table.column_count() {
        let is_partial_column = if is_json_column(table, column_index) {
            let bit = partial_bitmap.as_ref().map(|pb| bit_lsb_first(pb, partial_bit_i)).unwrap_or(false);
            partial_bit_i += 1;
            partial_json_mode && bit
        } else {
            false
        };

        if !bit_lsb_first(presence, column_index) {
            skipped_indices.push(column_index);
            continue;
        }

        let is_null = bit_lsb_first(&null_bitmap, null_bit_i);
        null_bit_i += 1;
        if is_null {
            values.push((column_index, ColumnValue::Null));
            continue;
        }

        let column_type = table.column_type[column_index];
        let meta = table.column_meta[column_index];
        let value = decode_cell(cursor, column_type, meta, is_partial_column, options)?;
        values.push((column_index, value));
    }
    Ok((values, skipped_indices))
}

fn is_json_column(table: &TableDescriptor, column_index: usize) -> bool {
    table.column_type[column_index] == ColumnType::Json as u8
}

fn decompress_zlib(data: &[u8]) -> Result<Vec<u8>, ReError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| ReError::String(format!("failed to decompress MariaDB row event: {}", e)))?;
    Ok(out)
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "row decode panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::binlog::column::column_type::Flavor;

    fn single_tiny_column_table(table_id: u64) -> TableDescriptor {
        TableDescriptor {
            flavor: Flavor::Mysql,
            table_id_size: 6,
            table_id,
            flags: 0,
            schema: b"db".to_vec(),
            table: b"t".to_vec(),
            column_type: vec![ColumnType::Tiny as u8],
            column_meta: vec![0],
            null_bitmap: vec![0],
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
        }
    }

    #[test]
    fn decodes_a_write_rows_v2_single_row() {
        let mut tables = TableMap::new();
        tables.insert(1, single_tiny_column_table(1));

        let mut data = Vec::new();
        data.extend_from_slice(&1u64.to_le_bytes()[..6]); // table_id
        data.extend_from_slice(&0u16.to_le_bytes()); // flags
        data.extend_from_slice(&2u16.to_le_bytes()); // extra-data length (header only)
        data.push(1); // column_count
        data.push(0b0000_0001); // presence bitmap: column 0 present
        data.push(0b0000_0000); // null bitmap: column 0 not null
        data.push(42); // TINYINT value

        let event = decode_rows_event(&data, 30, false, 6, &tables, &DecodeOptions::default()).unwrap();
        assert_eq!(event.rows.len(), 1);
        assert_eq!(event.skipped_columns.len(), 1);
        assert!(event.skipped_columns[0].before.is_empty());
        match &event.rows[0] {
            RowChange::Insert { after } => assert_eq!(after, &vec![(0, ColumnValue::Integer(42))]),
            other => panic!("expected Insert, got {:?}", other),
        }
    }

    #[test]
    fn empty_table_map_is_missing_table_map_error() {
        let tables = TableMap::new();
        let mut data = Vec::new();
        data.extend_from_slice(&9u64.to_le_bytes()[..6]);
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes());
        data.push(0);

        let err = decode_rows_event(&data, 30, false, 6, &tables, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, ReError::MissingTableMap(9)));
    }

    #[test]
    fn unknown_table_id_in_a_non_empty_map_is_a_distinct_error() {
        let mut tables = TableMap::new();
        tables.insert(1, single_tiny_column_table(1));

        let mut data = Vec::new();
        data.extend_from_slice(&9u64.to_le_bytes()[..6]);
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes());
        data.push(0);

        let err = decode_rows_event(&data, 30, false, 6, &tables, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, ReError::UnknownTableId(9)));
    }

    #[test]
    fn update_rows_pairs_before_and_after_images() {
        let mut tables = TableMap::new();
        tables.insert(5, single_tiny_column_table(5));

        let mut data = Vec::new();
        data.extend_from_slice(&5u64.to_le_bytes()[..6]);
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes());
        data.push(1); // column_count
        data.push(0b0000_0001); // before-image presence
        data.push(0b0000_0001); // after-image presence
        // before image
        data.push(0b0000_0000); // null bitmap
        data.push(1);
        // after image
        data.push(0b0000_0000);
        data.push(2);

        let event = decode_rows_event(&data, 31, false, 6, &tables, &DecodeOptions::default()).unwrap();
        match &event.rows[0] {
            RowChange::Update { before, after } => {
                assert_eq!(before, &vec![(0, ColumnValue::Integer(1))]);
                assert_eq!(after, &vec![(0, ColumnValue::Integer(2))]);
            }
            other => panic!("expected Update, got {:?}", other),
        }
        assert!(event.skipped_columns[0].before.is_empty());
        assert_eq!(event.skipped_columns[0].after, Some(vec![]));
    }

    #[test]
    fn skips_a_column_absent_from_the_presence_bitmap() {
        let mut table = single_tiny_column_table(2);
        table.column_type = vec![ColumnType::Tiny as u8, ColumnType::Tiny as u8];
        table.column_meta = vec![0, 0];
        table.null_bitmap = vec![0b00];
        let mut tables = TableMap::new();
        tables.insert(2, table);

        let mut data = Vec::new();
        data.extend_from_slice(&2u64.to_le_bytes()[..6]);
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes());
        data.push(2); // column_count
        data.push(0b0000_0001); // presence: only column 0 present
        data.push(0b0000_0000); // null bitmap for the 1 present column
        data.push(7);

        let event = decode_rows_event(&data, 30, false, 6, &tables, &DecodeOptions::default()).unwrap();
        match &event.rows[0] {
            RowChange::Insert { after } => assert_eq!(after, &vec![(0, ColumnValue::Integer(7))]),
            other => panic!("expected Insert, got {:?}", other),
        }
        assert_eq!(event.skipped_columns[0].before, vec![1]);
    }

    #[test]
    fn partial_update_reads_row_value_options_before_null_bitmap() {
        let mut table = single_tiny_column_table(6);
        table.column_type = vec![ColumnType::Json as u8];
        table.column_meta = vec![4];
        table.null_bitmap = vec![0];
        let mut tables = TableMap::new();
        tables.insert(6, table);

        let mut data = Vec::new();
        data.extend_from_slice(&6u64.to_le_bytes()[..6]);
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes());
        data.push(1); // column_count
        data.push(0b0000_0001); // before-image presence
        data.push(0b0000_0001); // after-image presence
        // before image: row_value_options is only read on the after-image
        data.push(0b0000_0000); // null bitmap
        let doc = vec![0x0Fu8, 1, 0]; // literal true
        data.extend_from_slice(&(doc.len() as u32).to_le_bytes());
        data.extend_from_slice(&doc);
        // after image: row_value_options = 0 (not partial), then null bitmap, then full doc
        data.push(0); // lenenc row_value_options = 0
        data.push(0b0000_0000); // null bitmap
        data.extend_from_slice(&(doc.len() as u32).to_le_bytes());
        data.extend_from_slice(&doc);

        let event = decode_rows_event(&data, 39, false, 6, &tables, &DecodeOptions::default()).unwrap();
        match &event.rows[0] {
            RowChange::Update { before, after } => {
                assert_eq!(before[0].1, ColumnValue::JsonText("true".to_string()));
                assert_eq!(after[0].1, ColumnValue::JsonText("true".to_string()));
            }
            other => panic!("expected Update, got {:?}", other),
        }
    }

    #[test]
    fn partial_bit_cursor_advances_for_json_columns_skipped_in_the_image() {
        // Two JSON columns; only column 1 is present in the after-image, so
        // the partial bitmap must still be sized for both JSON columns and
        // the cursor must advance past column 0's bit before reading column
        // 1's, even though column 0 never appears on the wire.
        let mut table = single_tiny_column_table(7);
        table.column_type = vec![ColumnType::Json as u8, ColumnType::Json as u8];
        table.column_meta = vec![4, 4];
        table.null_bitmap = vec![0];
        let mut tables = TableMap::new();
        tables.insert(7, table);

        let literal_true = vec![0x0Fu8, 1, 0];

        let mut data = Vec::new();
        data.extend_from_slice(&7u64.to_le_bytes()[..6]);
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes());
        data.push(2); // column_count
        data.push(0b0000_0011); // before-image presence: both columns present
        data.push(0b0000_0010); // after-image presence: only column 1 present

        // before image: both columns present, neither null, both literal true
        data.push(0b0000_0000); // null bitmap (2 bits -> 1 byte)
        data.extend_from_slice(&(literal_true.len() as u32).to_le_bytes());
        data.extend_from_slice(&literal_true);
        data.extend_from_slice(&(literal_true.len() as u32).to_le_bytes());
        data.extend_from_slice(&literal_true);

        // after image: partial-JSON mode, only column 1 present
        data.push(1); // lenenc binlog_row_value_options, bit 0 set
        data.push(0b0000_0000); // null bitmap (1 bit -> 1 byte)
        data.push(0b0000_0010); // partial bitmap (2 JSON columns -> 1 byte); column 1's bit set
        let remove_a = vec![2u8, 2, b'$', b'a']; // Remove "$a"
        data.extend_from_slice(&(remove_a.len() as u32).to_le_bytes());
        data.extend_from_slice(&remove_a);

        let event = decode_rows_event(&data, 39, false, 6, &tables, &DecodeOptions::default()).unwrap();
        match &event.rows[0] {
            RowChange::Update { before, after } => {
                assert_eq!(before.len(), 2);
                assert_eq!(after.len(), 1);
                assert_eq!(after[0].0, 1);
                match &after[0].1 {
                    ColumnValue::JsonDiff(v) => assert_eq!(v[0]["path"], "$a"),
                    other => panic!("expected JsonDiff for the partial column, got {:?}", other),
                }
            }
            other => panic!("expected Update, got {:?}", other),
        }
        assert_eq!(event.skipped_columns[0].after, Some(vec![0]));
    }

    #[test]
    fn partition_extra_data_is_parsed_for_update_events() {
        let mut tables = TableMap::new();
        tables.insert(5, single_tiny_column_table(5));

        let mut extra = vec![1u8]; // PARTITION type code
        extra.extend_from_slice(&3u16.to_le_bytes()); // partition_id
        extra.extend_from_slice(&2u16.to_le_bytes()); // source_partition_id

        let mut data = Vec::new();
        data.extend_from_slice(&5u64.to_le_bytes()[..6]);
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&((extra.len() + 2) as u16).to_le_bytes());
        data.extend_from_slice(&extra);
        data.push(1); // column_count
        data.push(0b0000_0001);
        data.push(0b0000_0001);
        data.push(0b0000_0000);
        data.push(1);
        data.push(0b0000_0000);
        data.push(2);

        let event = decode_rows_event(&data, 31, false, 6, &tables, &DecodeOptions::default()).unwrap();
        assert_eq!(event.partition_id, Some(3));
        assert_eq!(event.source_partition_id, Some(2));
    }

    #[test]
    fn mariadb_compressed_type_code_implies_compression_without_external_flag() {
        let event_type = RowsEventType::from_code(169).unwrap();
        assert!(event_type.is_compressed());
        assert_eq!(event_type.kind(), RowsEventKind::Write);
    }
}
