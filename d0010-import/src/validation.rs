use std::str::FromStr;

use rust_decimal::Decimal;
use time::{macros::format_description, OffsetDateTime, PrimitiveDateTime};

use crate::{error::RowRejection, record::RawReading};

/// Reading values are stored with at least this many fractional digits.
pub const MIN_VALUE_SCALE: u32 = 3;

const DATE_LEN: usize = 14;

/// A reading row that passed validation, ready to be attached to a meter.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReading {
    pub register_id: String,
    pub reading_date: OffsetDateTime,
    pub value: Decimal,
}

/// Validates the value first, then the date.
pub fn validate_reading(raw: &RawReading) -> Result<ValidReading, RowRejection> {
    let value = parse_reading_value(&raw.value)?;
    let reading_date = parse_reading_date(&raw.date)?;

    Ok(ValidReading {
        register_id: raw.register_id.clone(),
        reading_date,
        value,
    })
}

/// Parses plain or scientific decimal text. `Decimal` has no NaN or infinity,
/// so anything accepted is finite.
pub fn parse_reading_value(text: &str) -> Result<Decimal, RowRejection> {
    let text = text.trim();
    let mut value = Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|_| RowRejection::InvalidValue(text.to_string()))?;

    if value.scale() < MIN_VALUE_SCALE {
        value.rescale(MIN_VALUE_SCALE);
    }
    Ok(value)
}

/// Parses a `YYYYMMDDhhmmss` timestamp. File timestamps carry no offset and
/// are taken as UTC.
pub fn parse_reading_date(text: &str) -> Result<OffsetDateTime, RowRejection> {
    let invalid = || RowRejection::InvalidDate(text.to_string());

    // The format parser alone would accept a leading sign on the year.
    if text.len() != DATE_LEN || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if text.starts_with("0000") {
        return Err(invalid());
    }

    let ts = PrimitiveDateTime::parse(
        text,
        format_description!("[year][month][day][hour][minute][second]"),
    )
    .map_err(|_| invalid())?;

    Ok(ts.assume_utc())
}
