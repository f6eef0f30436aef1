use rust_decimal::Decimal;
use time::OffsetDateTime;

use super::MeterId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, sqlx::Type)]
#[sqlx(transparent)]
pub struct ReadingId(pub i64);

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Reading {
    pub id: ReadingId,
    pub meter_id: MeterId,
    pub value: Decimal,
    pub reading_date: OffsetDateTime,
    pub meter_register_id: String,
    pub file_name: String,
}

/// Insert payload for a reading. Readings have no natural key, so every
/// `NewReading` handed to a store becomes a new row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub meter_id: MeterId,
    pub value: Decimal,
    pub reading_date: OffsetDateTime,
    pub meter_register_id: String,
    pub file_name: String,
}

impl NewReading {
    pub(crate) fn into_reading(self, id: ReadingId) -> Reading {
        Reading {
            id,
            meter_id: self.meter_id,
            value: self.value,
            reading_date: self.reading_date,
            meter_register_id: self.meter_register_id,
            file_name: self.file_name,
        }
    }
}
