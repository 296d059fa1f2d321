use std::io::{Cursor, Read};
use byteorder::{LittleEndian, ReadBytesExt};
use common::err::decode_error::ReError;
use common::config::DecodeOptions;
use common::binlog::column::column_type::ColumnType;
use tracing::warn;
use crate::column::column_metadata::ColumnMetadata;
use crate::column::column_value::ColumnValue;
use crate::column::type_decoder::TypeDecoder;

/// Parses a MySQL binary JSON document into a `serde_json::Value`. The
/// format is a compact type-tagged encoding (JSONB); this covers the
/// scalar/object/array shapes that appear in row images. It is not a full
/// reimplementation of MySQL's offset-table JSONB reader (inline vs.
/// large-object layouts, literal dedup) — good enough to reconstruct the
/// logical document, not to round-trip its exact on-disk byte layout.
pub fn parse_binary_json(data: &[u8]) -> Result<serde_json::Value, ReError> {
    if data.is_empty() {
        return Ok(serde_json::Value::Null);
    }
    let mut cursor = Cursor::new(data);
    let type_marker = cursor.read_u8()?;
    parse_value(&mut cursor, type_marker)
}

fn parse_value(cursor: &mut Cursor<&[u8]>, type_marker: u8) -> Result<serde_json::Value, ReError> {
    match type_marker {
        0x00 => Ok(serde_json::Value::Object(parse_object(cursor)?)),
        0x01 => Ok(serde_json::Value::Array(parse_array(cursor)?)),
        0x02 => Ok(serde_json::Value::Number(cursor.read_i16::<LittleEndian>()?.into())),
        0x03 => Ok(serde_json::Value::Number(cursor.read_i32::<LittleEndian>()?.into())),
        0x04 => Ok(serde_json::Value::Number(cursor.read_i64::<LittleEndian>()?.into())),
        0x05 => Ok(serde_json::Value::Number(cursor.read_u16::<LittleEndian>()?.into())),
        0x06 => Ok(serde_json::Value::Number(cursor.read_u32::<LittleEndian>()?.into())),
        0x07 => Ok(serde_json::Value::Number(cursor.read_u64::<LittleEndian>()?.into())),
        0x08 => {
            let v = cursor.read_f64::<LittleEndian>()?;
            Ok(serde_json::Number::from_f64(v).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null))
        }
        0x0C => {
            let len = read_variable_length(cursor)?;
            let mut buf = vec![0u8; len];
            cursor.read_exact(&mut buf)?;
            Ok(serde_json::Value::String(String::from_utf8(buf)?))
        }
        0x0F => {
            // Literal: 0=null, 1=true, 2=false, stored as a 2-byte field.
            let lit = cursor.read_u8()?;
            let _ = cursor.read_u8();
            Ok(match lit {
                0 => serde_json::Value::Null,
                1 => serde_json::Value::Bool(true),
                2 => serde_json::Value::Bool(false),
                other => return Err(ReError::String(format!("unknown JSON literal marker {}", other))),
            })
        }
        other => Err(ReError::String(format!("unsupported JSON type marker {}", other))),
    }
}

fn read_variable_length(cursor: &mut Cursor<&[u8]>) -> Result<usize, ReError> {
    let mut result: usize = 0;
    for i in 0..5 {
        let byte = cursor.read_u8()?;
        result |= ((byte & 0x7F) as usize) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }
    Err(ReError::String("JSON variable-length integer too long".to_string()))
}

fn parse_object(cursor: &mut Cursor<&[u8]>) -> Result<serde_json::Map<String, serde_json::Value>, ReError> {
    let element_count = read_variable_length(cursor)?;
    let _size = read_variable_length(cursor)?;
    let mut keys = Vec::with_capacity(element_count);
    for _ in 0..element_count {
        let key_len = read_variable_length(cursor)?;
        let mut buf = vec![0u8; key_len];
        cursor.read_exact(&mut buf)?;
        keys.push(String::from_utf8(buf)?);
    }
    let mut map = serde_json::Map::new();
    for key in keys {
        let value_type = cursor.read_u8()?;
        map.insert(key, parse_value(cursor, value_type)?);
    }
    Ok(map)
}

fn parse_array(cursor: &mut Cursor<&[u8]>) -> Result<Vec<serde_json::Value>, ReError> {
    let element_count = read_variable_length(cursor)?;
    let _size = read_variable_length(cursor)?;
    let mut values = Vec::with_capacity(element_count);
    for _ in 0..element_count {
        let value_type = cursor.read_u8()?;
        values.push(parse_value(cursor, value_type)?);
    }
    Ok(values)
}

/// A single partial-update diff operation against a JSON document, as
/// carried in a MySQL 8.0 `PARTIAL_UPDATE_ROWS` after-image.
#[derive(Debug, Clone, serde::Serialize, PartialEq)]
pub struct JsonDiffOp {
    pub op: JsonDiffKind,
    pub path: String,
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, serde::Serialize, PartialEq)]
pub enum JsonDiffKind {
    Replace,
    Insert,
    Remove,
}

/// Decodes a partial-update JSON diff payload: a sequence of
/// `(opcode: u8, path_len: varlen, path: utf8, [value_len: varlen, value: binary-json])`
/// tuples, terminated by end-of-buffer. `Remove` carries no value.
pub fn parse_json_diff(data: &[u8]) -> Result<serde_json::Value, ReError> {
    let mut cursor = Cursor::new(data);
    let mut ops = Vec::new();
    while (cursor.position() as usize) < data.len() {
        let opcode = cursor.read_u8()?;
        let kind = match opcode {
            0 => JsonDiffKind::Replace,
            1 => JsonDiffKind::Insert,
            2 => JsonDiffKind::Remove,
            other => return Err(ReError::String(format!("unknown JSON diff opcode {}", other))),
        };
        let path_len = read_variable_length(&mut cursor)?;
        let mut path_buf = vec![0u8; path_len];
        cursor.read_exact(&mut path_buf)?;
        let path = String::from_utf8(path_buf)?;

        let value = if matches!(kind, JsonDiffKind::Remove) {
            None
        } else {
            let value_len = read_variable_length(&mut cursor)?;
            let mut value_buf = vec![0u8; value_len];
            cursor.read_exact(&mut value_buf)?;
            Some(parse_binary_json(&value_buf)?)
        };

        ops.push(JsonDiffOp { op: kind, path, value });
    }
    serde_json::to_value(&ops).map_err(|e| ReError::String(format!("failed to serialize JSON diff: {}", e)))
}

pub struct JsonDecoder;

impl TypeDecoder for JsonDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, metadata: &ColumnMetadata, options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        let packlen = metadata.metadata as u8;
        let length = if packlen == 0 {
            cursor.read_u32::<LittleEndian>()? as usize
        } else {
            cursor.read_uint::<LittleEndian>(packlen as usize)? as usize
        };
        if length == 0 {
            return Ok(ColumnValue::JsonText(String::new()));
        }
        let mut buf = vec![0u8; length];
        cursor.read_exact(&mut buf)?;

        let parsed = if metadata.is_partial {
            parse_json_diff(&buf).map(ColumnValue::JsonDiff)
        } else {
            parse_binary_json(&buf).map(|v| ColumnValue::JsonText(v.to_string()))
        };

        match parsed {
            Ok(value) => Ok(value),
            Err(e) => {
                if options.ignore_json_decode_err {
                    warn!("ignoring JSON decode failure: {}", e);
                    Ok(ColumnValue::JsonText("null".to_string()))
                } else {
                    Err(e)
                }
            }
        }
    }
    fn column_type(&self) -> u8 { ColumnType::Json as u8 }
    fn type_name(&self) -> &'static str { "JSON" }
}
