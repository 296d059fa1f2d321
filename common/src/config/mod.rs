use serde::{Deserialize, Serialize};

/// Options threaded into every Rows Decoder call. These never change mid-stream
/// decode of a single event but are expected to vary per-caller (e.g. a caller
/// that wants native `chrono` values instead of formatted strings).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecodeOptions {
    /// Return TIMESTAMP/DATETIME-family values as native time points when the
    /// stored value permits it, instead of always formatting them as strings.
    pub parse_time: bool,

    /// Timezone applied when formatting TIMESTAMP-family values as strings.
    pub timestamp_string_location: TimestampStringLocation,

    /// Return NEWDECIMAL as an arbitrary-precision `bigdecimal::BigDecimal`
    /// instead of the formatted decimal text.
    pub use_decimal: bool,

    /// Pass-through formatting flag for FLOAT/DOUBLE: keep a trailing ".0"
    /// when the caller renders the value as text.
    pub use_float_with_trailing_zero: bool,

    /// Demote a JSON decode failure to a logged warning plus a placeholder
    /// value rather than aborting the whole rows event.
    pub ignore_json_decode_err: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimestampStringLocation {
    Utc,
    Local,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            parse_time: false,
            timestamp_string_location: TimestampStringLocation::Utc,
            use_decimal: false,
            use_float_with_trailing_zero: false,
            ignore_json_decode_err: false,
        }
    }
}
