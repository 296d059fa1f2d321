use std::io::Cursor;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Local};
use common::err::decode_error::ReError;
use common::config::{DecodeOptions, TimestampStringLocation};
use common::binlog::column::column_type::ColumnType;
use crate::column::column_metadata::ColumnMetadata;
use crate::column::column_value::ColumnValue;
use crate::column::type_decoder::TypeDecoder;

const DATETIMEF_INT_OFS: i64 = 0x8000000000;
const TIMEF_INT_OFS: i64 = 0x800000;
const TIMEF_OFS: i64 = 0x800000000000;

/// Width in bytes of the fractional-second tail for a given `dec` (0..=6),
/// shared by TIMESTAMP2/DATETIME2/TIME2.
fn frac_byte_len(dec: u8) -> usize {
    ((dec as u32 + 1) / 2) as usize
}

/// Reads the fractional tail and scales it to microseconds.
fn read_frac_micros(cursor: &mut Cursor<&[u8]>, dec: u8) -> Result<u64, ReError> {
    let len = frac_byte_len(dec);
    if len == 0 {
        return Ok(0);
    }
    let raw = cursor.read_uint::<BigEndian>(len)?;
    Ok(raw * 100u64.pow(3 - len as u32))
}

fn frac_suffix(micros: u64, dec: u8) -> String {
    if dec == 0 {
        return String::new();
    }
    let divisor = 10u64.pow(6 - dec as u32);
    format!(".{:0width$}", micros / divisor, width = dec as usize)
}

/// YEAR: single byte, 0 is a literal zero year rather than 1900.
pub struct YearDecoder;

impl TypeDecoder for YearDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, _metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        let raw = cursor.read_u8()?;
        let year = if raw == 0 { 0 } else { 1900 + raw as u16 };
        Ok(ColumnValue::Year(year))
    }
    fn column_type(&self) -> u8 { ColumnType::Year as u8 }
    fn type_name(&self) -> &'static str { "YEAR" }
}

/// DATE: 3-byte LE, always formatted as a string.
pub struct DateDecoder;

impl TypeDecoder for DateDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, _metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        let value = cursor.read_u24::<LittleEndian>()?;
        if value == 0 {
            return Ok(ColumnValue::TimeText("0000-00-00".to_string()));
        }
        let day = value & 0x1F;
        let month = (value / 32) & 0xF;
        let year = value / 512;
        Ok(ColumnValue::TimeText(format!("{:04}-{:02}-{:02}", year, month, day)))
    }
    // The wire byte is plain DATE (10); NEWDATE (14) is only ever the real-type
    // label this column reports to metadata lookups, never a stored type byte.
    fn column_type(&self) -> u8 { ColumnType::Date as u8 }
    fn type_name(&self) -> &'static str { "DATE" }
}

/// TIME: 3-byte LE packed HHMMSS, possibly negative.
pub struct TimeDecoder;

impl TypeDecoder for TimeDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, _metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        let raw = cursor.read_i24::<LittleEndian>()?;
        if raw == 0 {
            return Ok(ColumnValue::TimeText("00:00:00".to_string()));
        }
        let negative = raw < 0;
        let mut value = raw.unsigned_abs();
        let second = value % 100;
        value /= 100;
        let minute = value % 100;
        value /= 100;
        let hour = value;
        let sign = if negative { "-" } else { "" };
        Ok(ColumnValue::TimeText(format!("{}{:02}:{:02}:{:02}", sign, hour, minute, second)))
    }
    fn column_type(&self) -> u8 { ColumnType::Time as u8 }
    fn type_name(&self) -> &'static str { "TIME" }
}

/// TIME2: 3-byte BE biased integer plus a fractional tail with a
/// reversed-sign encoding for negative sub-second values.
pub struct Time2Decoder;

impl TypeDecoder for Time2Decoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, metadata: &ColumnMetadata, _options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        let dec = metadata.metadata as u8;
        let len = frac_byte_len(dec);

        let (negative, hms_abs, micros_abs): (bool, u32, u64) = if len <= 2 {
            let raw_int = cursor.read_u24::<BigEndian>()? as i64;
            let int_part = raw_int - TIMEF_INT_OFS;
            let orig_negative = int_part < 0;
            let mut frac_raw: i64 = if len > 0 { cursor.read_uint::<BigEndian>(len)? as i64 } else { 0 };
            let mut int_part = int_part;
            if orig_negative && frac_raw != 0 {
                let adj = 1i64 << (8 * len as u32);
                int_part += 1;
                frac_raw -= adj;
            }
            let mult = if len > 0 { 100u64.pow(3 - len as u32) } else { 0 };
            let micros = (frac_raw.unsigned_abs() as u64) * mult;
            (orig_negative, int_part.unsigned_abs() as u32, micros)
        } else {
            let combined = cursor.read_uint::<BigEndian>(6)? as i64;
            let total = combined - TIMEF_OFS;
            let negative = total < 0;
            let total_abs = total.unsigned_abs();
            ((negative), (total_abs / 1_000_000) as u32, total_abs % 1_000_000)
        };

        let hour = (hms_abs >> 12) & 0x3FF;
        let minute = (hms_abs >> 6) & 0x3F;
        let second = hms_abs & 0x3F;
        let sign = if negative { "-" } else { "" };
        Ok(ColumnValue::TimeText(format!(
            "{}{:02}:{:02}:{:02}{}",
            sign, hour, minute, second, frac_suffix(micros_abs, dec)
        )))
    }
    fn column_type(&self) -> u8 { ColumnType::Time2 as u8 }
    fn type_name(&self) -> &'static str { "TIME2" }
}

/// DATETIME: 8-byte LE packed YYYYMMDDHHMMSS.
pub struct DateTimeDecoder;

impl TypeDecoder for DateTimeDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, _metadata: &ColumnMetadata, options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        let mut value = cursor.read_u64::<LittleEndian>()?;
        if value == 0 {
            return Ok(ColumnValue::TimeText("0000-00-00 00:00:00".to_string()));
        }
        let second = value % 100;
        value /= 100;
        let minute = value % 100;
        value /= 100;
        let hour = value % 100;
        value /= 100;
        let day = value % 100;
        value /= 100;
        let month = value % 100;
        value /= 100;
        let year = value;

        if options.parse_time && month != 0 && day != 0 {
            let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
                .ok_or_else(|| ReError::String(format!("invalid DATETIME date {}-{}-{}", year, month, day)))?;
            let time = NaiveTime::from_hms_opt(hour as u32, minute as u32, second as u32)
                .ok_or_else(|| ReError::String(format!("invalid DATETIME time {}:{}:{}", hour, minute, second)))?;
            Ok(ColumnValue::TimePoint(NaiveDateTime::new(date, time)))
        } else {
            Ok(ColumnValue::TimeText(format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            )))
        }
    }
    fn column_type(&self) -> u8 { ColumnType::DateTime as u8 }
    fn type_name(&self) -> &'static str { "DATETIME" }
}

/// DATETIME2: 5-byte BE biased integer packing year/month/day/h/m/s plus a
/// fractional tail.
pub struct DateTime2Decoder;

impl TypeDecoder for DateTime2Decoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, metadata: &ColumnMetadata, options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        let dec = metadata.metadata as u8;
        let raw = cursor.read_uint::<BigEndian>(5)? as i64;
        let intpart = raw - DATETIMEF_INT_OFS;
        let frac_micros = read_frac_micros(cursor, dec)?;

        if intpart == 0 {
            return Ok(ColumnValue::TimeText(format!("0000-00-00 00:00:00{}", frac_suffix(0, dec))));
        }

        let ymd = intpart >> 17;
        let hms = intpart & 0x1FFFF;
        let day = (ymd & 0x1F) as u32;
        let ym = ymd >> 5;
        let month = (ym % 13) as u32;
        let year = (ym / 13) as u32;
        let second = (hms & 0x3F) as u32;
        let minute = ((hms >> 6) & 0x3F) as u32;
        let hour = (hms >> 12) as u32;

        if intpart < 107_420_450_816 || month == 0 || day == 0 || !options.parse_time {
            Ok(ColumnValue::TimeText(format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}{}",
                year, month, day, hour, minute, second, frac_suffix(frac_micros, dec)
            )))
        } else {
            let date = NaiveDate::from_ymd_opt(year as i32, month, day)
                .ok_or_else(|| ReError::String(format!("invalid DATETIME2 date {}-{}-{}", year, month, day)))?;
            let time = NaiveTime::from_hms_micro_opt(hour, minute, second, frac_micros as u32)
                .ok_or_else(|| ReError::String(format!("invalid DATETIME2 time {}:{}:{}", hour, minute, second)))?;
            Ok(ColumnValue::TimePoint(NaiveDateTime::new(date, time)))
        }
    }
    fn column_type(&self) -> u8 { ColumnType::DateTime2 as u8 }
    fn type_name(&self) -> &'static str { "DATETIME2" }
}

/// TIMESTAMP: 4-byte LE unix seconds, no sub-second precision.
pub struct TimestampDecoder;

impl TypeDecoder for TimestampDecoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, _metadata: &ColumnMetadata, options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        let secs = cursor.read_u32::<LittleEndian>()? as i64;
        format_timestamp(secs, 0, 0, options)
    }
    fn column_type(&self) -> u8 { ColumnType::Timestamp as u8 }
    fn type_name(&self) -> &'static str { "TIMESTAMP" }
}

/// TIMESTAMP2: 4-byte BE unix seconds plus a fractional tail.
pub struct Timestamp2Decoder;

impl TypeDecoder for Timestamp2Decoder {
    fn decode(&self, cursor: &mut Cursor<&[u8]>, metadata: &ColumnMetadata, options: &DecodeOptions) -> Result<ColumnValue, ReError> {
        let dec = metadata.metadata as u8;
        let secs = cursor.read_u32::<BigEndian>()? as i64;
        let micros = read_frac_micros(cursor, dec)?;
        format_timestamp(secs, micros, dec, options)
    }
    fn column_type(&self) -> u8 { ColumnType::Timestamp2 as u8 }
    fn type_name(&self) -> &'static str { "TIMESTAMP2" }
}

fn format_timestamp(secs: i64, micros: u64, dec: u8, options: &DecodeOptions) -> Result<ColumnValue, ReError> {
    if secs == 0 {
        return Ok(ColumnValue::TimeText(format!("0000-00-00 00:00:00{}", frac_suffix(0, dec))));
    }

    if options.parse_time {
        let naive = NaiveDateTime::from_timestamp_opt(secs, (micros * 1000) as u32)
            .ok_or_else(|| ReError::String(format!("timestamp {} out of range", secs)))?;
        Ok(ColumnValue::TimePoint(naive))
    } else {
        let naive = NaiveDateTime::from_timestamp_opt(secs, (micros * 1000) as u32)
            .ok_or_else(|| ReError::String(format!("timestamp {} out of range", secs)))?;
        let formatted = match options.timestamp_string_location {
            TimestampStringLocation::Utc => Utc.from_utc_datetime(&naive).format("%Y-%m-%d %H:%M:%S").to_string(),
            TimestampStringLocation::Local => {
                Local.from_utc_datetime(&naive).format("%Y-%m-%d %H:%M:%S").to_string()
            }
        };
        Ok(ColumnValue::TimeText(format!("{}{}", formatted, frac_suffix(micros, dec))))
    }
}
