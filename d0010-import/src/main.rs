use anyhow::{bail, Result};
use d0010_import::{
    batch,
    config::{AppConfig, StoreConfig, StoreKind},
    observability, FileImporter,
};
use meter_store::{
    db::{
        MemoryMeterStore, MemoryTransaction, MeterStore, PgMeterStore, PgTransaction, StoreError,
        StoreTransaction,
    },
    domain::{ImportRecord, Meter, MeterPoint, MeterPointId, NewReading, ReadingId},
};
use sqlx::postgres::PgPoolOptions;
use std::{env, path::PathBuf};

enum AnyStore {
    Postgres(PgMeterStore),
    Memory(MemoryMeterStore),
}

enum AnyTransaction {
    Postgres(PgTransaction),
    Memory(MemoryTransaction),
}

#[async_trait::async_trait]
impl MeterStore for AnyStore {
    type Tx = AnyTransaction;

    async fn has_processed(&self, file_name: &str) -> Result<bool, StoreError> {
        match self {
            Self::Postgres(s) => s.has_processed(file_name).await,
            Self::Memory(s) => s.has_processed(file_name).await,
        }
    }

    async fn get_or_create_meter_point(&self, mpan: &str) -> Result<MeterPoint, StoreError> {
        match self {
            Self::Postgres(s) => s.get_or_create_meter_point(mpan).await,
            Self::Memory(s) => s.get_or_create_meter_point(mpan).await,
        }
    }

    async fn get_or_create_meter(
        &self,
        serial_number: &str,
        meter_point_id: MeterPointId,
    ) -> Result<Meter, StoreError> {
        match self {
            Self::Postgres(s) => s.get_or_create_meter(serial_number, meter_point_id).await,
            Self::Memory(s) => s.get_or_create_meter(serial_number, meter_point_id).await,
        }
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        match self {
            Self::Postgres(s) => s.begin().await.map(AnyTransaction::Postgres),
            Self::Memory(s) => s.begin().await.map(AnyTransaction::Memory),
        }
    }
}

#[async_trait::async_trait]
impl StoreTransaction for AnyTransaction {
    async fn create_reading(&mut self, reading: &NewReading) -> Result<ReadingId, StoreError> {
        match self {
            Self::Postgres(tx) => tx.create_reading(reading).await,
            Self::Memory(tx) => tx.create_reading(reading).await,
        }
    }

    async fn mark_processed(&mut self, file_name: &str) -> Result<ImportRecord, StoreError> {
        match self {
            Self::Postgres(tx) => tx.mark_processed(file_name).await,
            Self::Memory(tx) => tx.mark_processed(file_name).await,
        }
    }

    async fn commit(self) -> Result<(), StoreError> {
        match self {
            Self::Postgres(tx) => tx.commit().await,
            Self::Memory(tx) => tx.commit().await,
        }
    }

    async fn rollback(self) -> Result<(), StoreError> {
        match self {
            Self::Postgres(tx) => tx.rollback().await,
            Self::Memory(tx) => tx.rollback().await,
        }
    }
}

async fn connect_store(cfg: &StoreConfig) -> Result<AnyStore> {
    match cfg.kind {
        StoreKind::Postgres => {
            let Some(uri) = cfg.uri.as_deref() else {
                bail!("store.uri must be set to import into postgres (see D0010_CONFIG)");
            };
            let pool = PgPoolOptions::new()
                .max_connections(cfg.max_connections)
                .connect(uri)
                .await?;
            Ok(AnyStore::Postgres(PgMeterStore::new(pool)))
        }
        StoreKind::Memory => {
            tracing::warn!("using the in-memory store, imported readings will not be kept");
            Ok(AnyStore::Memory(MemoryMeterStore::new()))
        }
    }
}

/// Import D0010 meter reading file(s) and store the readings.
///
/// Usage:
///   import_d0010 <path>
///
/// `path` is a D0010 file or a directory of them. Exits non-zero if the path
/// is unusable or if any file failed; the other files are still imported.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        bail!("usage: import_d0010 <d0010_file_or_directory>");
    }
    let path = PathBuf::from(&args[1]);

    let cfg = AppConfig::load()?;

    let files = batch::discover_files(&path, &cfg.import.extension)?;
    if files.is_empty() {
        tracing::info!(path = %path.display(), extension = %cfg.import.extension, "no files to import");
        return Ok(());
    }

    let store = connect_store(&cfg.store).await?;
    let importer = FileImporter::new(store);

    let report = batch::run_batch(&importer, files, cfg.import.workers).await;
    report.log_summary();
    report.into_result()
}
