pub mod import_record;
pub mod meter;
pub mod reading;

pub use import_record::ImportRecord;
pub use meter::{Meter, MeterId, MeterPoint, MeterPointId};
pub use reading::{NewReading, Reading, ReadingId};
