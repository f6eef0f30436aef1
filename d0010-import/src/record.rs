//! Typed view of one pipe-delimited D0010 line.

pub const METER_POINT_CODE: &str = "026";
pub const SERIAL_CODE: &str = "028";
pub const READING_CODE: &str = "030";

pub const FIELD_DELIMITER: char = '|';

/// Rows shorter than this are dropped without touching the scan context.
pub const MIN_FIELDS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum D0010Line {
    /// `026`: meter point administration number.
    MeterPoint(String),
    /// `028`: meter serial number, whitespace already removed.
    Serial(String),
    /// `030`: register reading, not yet validated.
    Reading(RawReading),
    Unrecognized(String),
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReading {
    pub register_id: String,
    pub date: String,
    pub value: String,
}

/// Classifies a split line. Fields are trimmed here, so callers can pass the
/// raw output of the delimiter split.
///
/// A `030` row with only three fields has no value column; it comes back with
/// an empty value, which validation rejects.
pub fn classify(fields: &[&str]) -> D0010Line {
    if fields.len() < MIN_FIELDS {
        return D0010Line::Malformed;
    }

    let field = |idx: usize| fields.get(idx).map(|f| f.trim()).unwrap_or("");

    match field(0) {
        METER_POINT_CODE => D0010Line::MeterPoint(field(1).to_string()),
        SERIAL_CODE => D0010Line::Serial(normalize_serial(field(1))),
        READING_CODE => D0010Line::Reading(RawReading {
            register_id: field(1).to_string(),
            date: field(2).to_string(),
            value: field(3).to_string(),
        }),
        other => D0010Line::Unrecognized(other.to_string()),
    }
}

/// Removes every whitespace character, embedded ones included.
pub fn normalize_serial(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}
