use std::fmt::Display;
use std::{fmt, io};
use std::num::ParseIntError;
use std::str::Utf8Error;
use std::string::FromUtf8Error;
use hex::FromHexError;

#[derive(Debug)]
pub enum ReError {
    //////////////////////
    // Common
    //////////////////////
    /// 一定不会出现的异常。如果出现，一定是BUG
    BUG(String),
    /// The parser had an error (recoverable)
    Error(String),

    //////////////////////
    // Binlog
    //////////////////////
    /// Byte code is incomplete
    /// 此错误用于binlog编解码过程中的异常处理，包含：
    ///     编解码进行中、已完成、格式错误等， 由 Needed 产生为具体的错误信息描述
    Incomplete(Needed),

    /// The input ended before the declared structure was fully read.
    Truncated { offset: usize, need: usize, have: usize },

    /// A column/metadata type byte this decoder does not know how to interpret.
    UnsupportedType(String),

    /// A Rows event referenced a table_id for which no Table Map has ever been seen.
    MissingTableMap(u64),

    /// A Rows event referenced a table_id absent from a non-empty table map.
    UnknownTableId(u64),

    /// The optional-metadata TLV block of a Table Map violated its own grammar.
    MalformedOptionalMetadata(String),

    /// A BIT column declared a bit length that produced an invalid byte count.
    InvalidBitLength(u16),

    /// A BLOB/GEOMETRY pack length outside the valid 1..=4 range.
    InvalidBlobPacklen(u8),

    /// An ENUM pack length outside the valid {1, 2} set.
    UnknownEnumPacklen(u8),

    /// A NEWDECIMAL value failed to parse back into text or arbitrary precision form.
    DecimalParseFailure(String),

    /// A panic was caught while decoding a Rows event body; carries enough context
    /// to reproduce the failure (raw bytes, table id, how far decoding got).
    ParseRowsPanic { table_id: u64, message: String },

    //////////////////////
    // IO
    //////////////////////
    IoError(io::Error),
    Utf8Error(Utf8Error),
    FromUtf8Error(FromUtf8Error),
    FromHexError(FromHexError),
    ParseIntError(ParseIntError),
    String(String),

    /// The parser had an unrecoverable error: we got to the right
    /// branch and we know other branches won't work, so backtrack
    /// as fast as possible
    Failure(String),

    ConfigFileParseErr(String),
}

impl Display for ReError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> fmt::Result {
        match self {
            ReError::BUG(s) | ReError::Error(s) | ReError::String(s) | ReError::Failure(s)
            | ReError::ConfigFileParseErr(s) | ReError::UnsupportedType(s)
            | ReError::MalformedOptionalMetadata(s) | ReError::DecimalParseFailure(s) => {
                write!(f, "{}", s)
            }
            ReError::Incomplete(n) => {
                write!(f, "{}", n)
            }
            ReError::Truncated { offset, need, have } => {
                write!(f, "truncated input at offset {}: need {} bytes, have {}", offset, need, have)
            }
            ReError::MissingTableMap(id) => {
                write!(f, "no table map has ever been seen for table_id {}", id)
            }
            ReError::UnknownTableId(id) => {
                write!(f, "table_id {} is not present in the current table map", id)
            }
            ReError::InvalidBitLength(len) => {
                write!(f, "invalid BIT column length {}", len)
            }
            ReError::InvalidBlobPacklen(len) => {
                write!(f, "invalid BLOB/GEOMETRY pack length {}", len)
            }
            ReError::UnknownEnumPacklen(len) => {
                write!(f, "invalid ENUM pack length {}", len)
            }
            ReError::ParseRowsPanic { table_id, message } => {
                write!(f, "panic while decoding rows event for table_id {}: {}", table_id, message)
            }
            ReError::IoError(err) => {
                write!(f, "{}", err)
            }
            ReError::Utf8Error(err) => {
                write!(f, "{}", err)
            }
            ReError::FromUtf8Error(err) => {
                write!(f, "{}", err)
            }
            ReError::FromHexError(err) => {
                write!(f, "{}", err)
            }
            ReError::ParseIntError(err) => {
                write!(f, "{}", err)
            }
        }
    }
}

impl std::error::Error for ReError {}

impl From<io::Error> for ReError {
    fn from(error: io::Error) -> Self {
        ReError::IoError(error)
    }
}

impl From<Utf8Error> for ReError {
    fn from(error: Utf8Error) -> Self {
        ReError::Utf8Error(error)
    }
}

impl From<FromUtf8Error> for ReError {
    fn from(error: FromUtf8Error) -> Self {
        ReError::FromUtf8Error(error)
    }
}

impl From<FromHexError> for ReError {
    fn from(error: FromHexError) -> Self {
        ReError::FromHexError(error)
    }
}

impl From<ParseIntError> for ReError {
    fn from(error: ParseIntError) -> Self {
        ReError::ParseIntError(error)
    }
}

/// Contains information on needed data if a parser returned `Incomplete`
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Needed {
    /// Needs more data, but we do not know how much
    Unknown,

    NoEnoughData,

    InvalidUtf8,

    /// 被忽略的异常。
    MissingNull,

    InvalidData(String),
}

impl Display for Needed {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> fmt::Result {
        match self {
            Needed::Unknown => {
                write!(f, "Unknown")
            }
            Needed::NoEnoughData => {
                write!(f, "NoEnoughData")
            }
            Needed::InvalidUtf8 => {
                write!(f, "InvalidUtf8")
            }
            Needed::MissingNull => {
                write!(f, "MissingNull")
            }
            Needed::InvalidData(s) => {
                write!(f, "{}", s)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_truncated_display() {
        let e = ReError::Truncated { offset: 4, need: 8, have: 2 };
        assert_eq!(e.to_string(), "truncated input at offset 4: need 8 bytes, have 2");
    }

    #[test]
    fn test_missing_table_map_display() {
        let e = ReError::MissingTableMap(42);
        assert!(e.to_string().contains("42"));
    }
}
