use meter_store::domain::MeterId;

use crate::error::RowRejection;

/// Meter point and serial most recently declared in the file being scanned.
///
/// Created fresh for every file; `026` and `028` lines overwrite their slot
/// and the values stay in force for every reading until the next overwrite.
/// The meter they resolve to is cached until either slot changes.
#[derive(Debug, Default, Clone)]
pub struct ScanContext {
    mpan: Option<String>,
    serial_number: Option<String>,
    meter_id: Option<MeterId>,
}

/// Identity a reading row resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingIdentity<'a> {
    pub mpan: &'a str,
    pub serial_number: &'a str,
}

impl ScanContext {
    pub fn set_meter_point(&mut self, mpan: String) {
        self.mpan = Some(mpan);
        self.meter_id = None;
    }

    pub fn set_serial(&mut self, serial_number: String) {
        self.serial_number = Some(serial_number);
        self.meter_id = None;
    }

    /// Both slots must be filled; a reading seen before either declaration is
    /// rejected rather than stored against an empty identity.
    pub fn identity(&self) -> Result<ReadingIdentity<'_>, RowRejection> {
        match (self.mpan.as_deref(), self.serial_number.as_deref()) {
            (Some(mpan), Some(serial_number)) => Ok(ReadingIdentity {
                mpan,
                serial_number,
            }),
            _ => Err(RowRejection::MissingContext),
        }
    }

    pub fn resolved_meter(&self) -> Option<MeterId> {
        self.meter_id
    }

    pub fn set_resolved_meter(&mut self, meter_id: MeterId) {
        self.meter_id = Some(meter_id);
    }
}
