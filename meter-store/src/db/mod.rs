pub mod memory;
pub mod postgres;

pub use memory::{MemoryMeterStore, MemoryTransaction};
pub use postgres::{PgMeterStore, PgTransaction};

use crate::domain::{ImportRecord, Meter, MeterPoint, MeterPointId, NewReading, ReadingId};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("file '{0}' has already been imported")]
    AlreadyProcessed(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Shared handle to the reading store and its import ledger.
///
/// Meter points and meters live for the life of the system, so they are
/// resolved through the handle and committed straight away. Readings and the
/// ledger entry of a file go through a [`StoreTransaction`] and land together
/// or not at all.
#[async_trait::async_trait]
pub trait MeterStore: Send + Sync {
    type Tx: StoreTransaction;

    async fn has_processed(&self, file_name: &str) -> Result<bool, StoreError>;

    /// Returns the meter point for `mpan`, creating it if absent.
    async fn get_or_create_meter_point(&self, mpan: &str) -> Result<MeterPoint, StoreError>;

    /// Returns the meter for `serial_number`, creating it under `meter_point_id`
    /// if absent. An existing meter keeps its original meter point.
    async fn get_or_create_meter(
        &self,
        serial_number: &str,
        meter_point_id: MeterPointId,
    ) -> Result<Meter, StoreError>;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

/// Unit of work for one file import. Dropping it without calling
/// [`StoreTransaction::commit`] discards everything written through it.
#[async_trait::async_trait]
pub trait StoreTransaction: Send {
    async fn create_reading(&mut self, reading: &NewReading) -> Result<ReadingId, StoreError>;

    /// Appends `file_name` to the ledger. Fails with
    /// [`StoreError::AlreadyProcessed`] if the name is already present,
    /// including when another transaction committed it first.
    async fn mark_processed(&mut self, file_name: &str) -> Result<ImportRecord, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}
