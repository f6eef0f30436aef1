use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, sqlx::Type)]
#[sqlx(transparent)]
pub struct MeterPointId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, sqlx::Type)]
#[sqlx(transparent)]
pub struct MeterId(pub i64);

/// A metering point, keyed by its administration number (MPAN).
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MeterPoint {
    pub id: MeterPointId,
    pub mpan: String,
}

/// A physical meter, keyed by its whitespace-free serial number.
///
/// The meter point association is fixed by whichever import created the
/// meter first.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Meter {
    pub id: MeterId,
    pub serial_number: String,
    pub meter_point_id: MeterPointId,
}

impl fmt::Display for MeterPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mpan)
    }
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serial_number)
    }
}
