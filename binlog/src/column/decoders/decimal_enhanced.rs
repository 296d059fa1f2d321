use std::io::{Cursor, Read};
use std::str::FromStr;
use byteorder::{BigEndian, ReadBytesExt};
use bigdecimal::BigDecimal;
use common::err::decode_error::ReError;
use common::config::DecodeOptions;
use common::binlog::column::column_type::ColumnType;
use crate::column::column_metadata::ColumnMetadata;
use crate::column::column_value::ColumnValue;
use crate::column::type_decoder::TypeDecoder;

const DIGITS_PER_INT: u8 = 9;
const COMPRESSED_BYTES: [u8; 10] = [0, 1, 1, 2, 2, 3, 3, 4, 4, 4];

/// Splits a NEWDECIMAL's `(precision << 8) | scale` metadata into the byte
/// layout MySQL uses to store it: whole groups of 9 digits (4 bytes each)
/// on either side of the decimal point, plus a compressed head/tail group
/// holding the remainder.
fn decimal_layout(metadata: u16) -> (u8, u8, u8, u8, u8, u8) {
    let scale = (metadata & 0xFF) as u8;
    let precision = (metadata >> 8) as u8;
    let integral = if precision > scale { precision - scale } else { scale - precision };

    let uncompressed_integral = integral / DIGITS_PER_INT;
    let uncompressed_fractional = scale / DIGITS_PER_INT;
    let compressed_integral = integral - (uncompressed_integral * DIGITS_PER_INT);
    let compressed_fractional = scale - (uncompressed_fractional * DIGITS_PER_INT);

    let length = (uncompressed_integral << 2)
        + COMPRESSED_BYTES[compressed_integral as usize]
        + (uncompressed_fractional << 2)
        + COMPRESSED_BYTES[compressed_fractional as usize];

    (length, scale, compressed_integral, compressed_fractional, uncompressed_integral, uncompressed_fractional)
}

/// Decodes a MySQL NEWDECIMAL cell into its exact base-10 text.
pub fn parse_decimal_text(cursor: &mut Cursor<&[u8]>, metadata: u16) -> Result<String, ReError> {
    let (length, scale, compressed_integral, compressed_fractional, uncompressed_integral, uncompressed_fractional) =
        decimal_layout(metadata);

    let mut value = vec![0u8; length as usize];
    cursor.read_exact(&mut value)?;
    let mut result = String::new();

    // High bit set means positive; this convention is inverted from plain
    // two's-complement, so XOR every byte with the inferred mask.
    let negative = (value[0] & 0x80) == 0;
    value[0] ^= 0x80;
    if negative {
        result += "-";
        for b in value.iter_mut() {
            *b ^= 0xFF;
        }
    }

    let mut buffer = Cursor::new(value.as_slice());
    let mut started = false;

    let head_size = COMPRESSED_BYTES[compressed_integral as usize];
    if head_size > 0 {
        let number = buffer.read_uint::<BigEndian>(head_size as usize)? as u32;
        if number > 0 {
            started = true;
            result += &number.to_string();
        }
    }
    for _ in 0..uncompressed_integral {
        let number = buffer.read_u32::<BigEndian>()?;
        if started {
            result += &format!("{:09}", number);
        } else if number > 0 {
            started = true;
            result += &number.to_string();
        }
    }
    if !started {
        result += "0";
    }

    if scale > 0 {
        result += ".";
    }
    for _ in 0..uncompressed_fractional {
        let number = buffer.read_u32::<BigEndian>()?;
        result += &format!("{:09}", number);
    }
    let tail_size = COMPRESSED_BYTES[compressed_fractional as usize];
    if tail_size > 0 {
        let number = buffer.read_uint::<BigEndian>(tail_size as usize)? as u32;
        result += &format!("{:0width$}", number, width = compressed_fractional as usize);
    }

    Ok(result)
}

pub struct DecimalDecoder;

impl TypeDecoder for DecimalDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, metadata: &ColumnMetadata, options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        let text = parse_decimal_text(cursor, metadata.metadata)?;
        if options.use_decimal {
            let parsed = BigDecimal::from_str(&text)
                .map_err(|e| ReError::DecimalParseFailure(format!("{}: {}", text, e)))?;
            Ok(ColumnValue::DecimalBig(parsed))
        } else {
            Ok(ColumnValue::DecimalText(text))
        }
    }
    fn column_type(&self) -> u8 { ColumnType::NewDecimal as u8 }
    fn type_name(&self) -> &'static str { "NEWDECIMAL" }
}

pub fn meta_from_precision_scale(precision: u16, scale: u8) -> u16 {
    (precision << 8) + scale as u16
}
