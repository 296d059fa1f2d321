use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::Serialize;

/// The decoded value of a single cell. One variant per output shape a column
/// type can produce; several MySQL types map onto the same shape (e.g. TINY,
/// SHORT, LONG and LONGLONG all decode to `Integer`) rather than getting one
/// variant apiece, since callers never need to distinguish the storage width
/// after decode.
///
/// <a href="https://dev.mysql.com/doc/dev/mysql-server/latest/classbinary__log_1_1Table__map__event.html">See more</a>
#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum ColumnValue {
    Null,

    /// TINY, SHORT, INT24, LONG, LONGLONG. Always signed: the stored
    /// UNSIGNED flag only changes how the raw bits are reinterpreted before
    /// arriving here, never the output shape.
    Integer(i64),
    Float(f32),
    Double(f64),

    /// NEWDECIMAL, formatted as the exact base-10 text MySQL would print.
    DecimalText(String),
    /// NEWDECIMAL, returned as an arbitrary-precision value instead of text
    /// when `DecodeOptions::use_decimal` is set.
    #[serde(skip)]
    DecimalBig(BigDecimal),

    /// CHAR, VARCHAR, VAR_STRING, and STRING decoded as text.
    Text(String),
    /// BLOB family and GEOMETRY: opaque bytes, no charset applied.
    Bytes(Vec<u8>),

    /// BIT, zero-extended to 64 bits, read big-endian per byte.
    Bit(i64),
    /// ENUM index, 1-based (0 means the empty-string/invalid member),
    /// widened from its on-wire LE width to a signed 64-bit integer.
    Enum(i64),
    /// SET membership bitmap, one bit per possible member, widened from its
    /// on-wire LE width to a signed 64-bit integer.
    Set(i64),

    Year(u16),
    /// DATE/TIME/DATETIME/TIMESTAMP family formatted as MySQL would print
    /// them, used when `DecodeOptions::parse_time` is false.
    TimeText(String),
    /// Same family as `TimeText`, returned as a native time point when
    /// `DecodeOptions::parse_time` is true and the value isn't a MySQL
    /// zero-date sentinel (those have no `NaiveDateTime` equivalent).
    #[serde(skip)]
    TimePoint(NaiveDateTime),

    /// A JSON column's binary payload, re-serialized as JSON text.
    JsonText(String),
    /// A JSON column decoded from a MySQL 8.0 partial-update event: the diff
    /// operations to apply rather than the full document.
    JsonDiff(serde_json::Value),
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnValue::Null => "NULL",
            ColumnValue::Integer(_) => "INTEGER",
            ColumnValue::Float(_) => "FLOAT",
            ColumnValue::Double(_) => "DOUBLE",
            ColumnValue::DecimalText(_) => "DECIMAL",
            ColumnValue::DecimalBig(_) => "DECIMAL",
            ColumnValue::Text(_) => "TEXT",
            ColumnValue::Bytes(_) => "BYTES",
            ColumnValue::Bit(_) => "BIT",
            ColumnValue::Enum(_) => "ENUM",
            ColumnValue::Set(_) => "SET",
            ColumnValue::Year(_) => "YEAR",
            ColumnValue::TimeText(_) => "TIME",
            ColumnValue::TimePoint(_) => "TIME",
            ColumnValue::JsonText(_) => "JSON",
            ColumnValue::JsonDiff(_) => "JSON",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn null_is_recognized_across_variants() {
        assert!(ColumnValue::Null.is_null());
        assert!(!ColumnValue::Integer(0).is_null());
    }
}
