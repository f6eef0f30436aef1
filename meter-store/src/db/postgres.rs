use sqlx::{PgPool, Postgres, Transaction};

use super::{MeterStore, StoreError, StoreTransaction};
use crate::domain::{ImportRecord, Meter, MeterPoint, MeterPointId, NewReading, ReadingId};

/// PostgreSQL-backed store.
///
/// Expects the tables from `sql/schema/01_meter_readings.sql`; the schema is
/// applied out-of-band. Identity lookups run on their own pool connection
/// while a file transaction is open, so the pool needs at least one more
/// connection than there are concurrent imports.
#[derive(Clone)]
pub struct PgMeterStore {
    pool: PgPool,
}

impl PgMeterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait::async_trait]
impl MeterStore for PgMeterStore {
    type Tx = PgTransaction;

    async fn has_processed(&self, file_name: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM processed_files WHERE file_name = $1)",
        )
        .bind(file_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn get_or_create_meter_point(&self, mpan: &str) -> Result<MeterPoint, StoreError> {
        // Autocommitted and row-lock free: a concurrent insert of the same key
        // only waits for that single statement.
        let created = sqlx::query_as::<_, MeterPoint>(
            r#"
            INSERT INTO meter_points (mpan)
            VALUES ($1)
            ON CONFLICT (mpan) DO NOTHING
            RETURNING id, mpan
            "#,
        )
        .bind(mpan)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(point) = created {
            return Ok(point);
        }

        let point = sqlx::query_as::<_, MeterPoint>(
            "SELECT id, mpan FROM meter_points WHERE mpan = $1",
        )
        .bind(mpan)
        .fetch_one(&self.pool)
        .await?;

        Ok(point)
    }

    async fn get_or_create_meter(
        &self,
        serial_number: &str,
        meter_point_id: MeterPointId,
    ) -> Result<Meter, StoreError> {
        let created = sqlx::query_as::<_, Meter>(
            r#"
            INSERT INTO meters (serial_number, meter_point_id)
            VALUES ($1, $2)
            ON CONFLICT (serial_number) DO NOTHING
            RETURNING id, serial_number, meter_point_id
            "#,
        )
        .bind(serial_number)
        .bind(meter_point_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(meter) = created {
            return Ok(meter);
        }

        let meter = sqlx::query_as::<_, Meter>(
            "SELECT id, serial_number, meter_point_id FROM meters WHERE serial_number = $1",
        )
        .bind(serial_number)
        .fetch_one(&self.pool)
        .await?;

        Ok(meter)
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgTransaction { tx })
    }
}

#[async_trait::async_trait]
impl StoreTransaction for PgTransaction {
    async fn create_reading(&mut self, reading: &NewReading) -> Result<ReadingId, StoreError> {
        let id = sqlx::query_scalar::<_, ReadingId>(
            r#"
            INSERT INTO readings (meter_id, value, reading_date, meter_register_id, file_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(reading.meter_id)
        .bind(reading.value)
        .bind(reading.reading_date)
        .bind(&reading.meter_register_id)
        .bind(&reading.file_name)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(id)
    }

    async fn mark_processed(&mut self, file_name: &str) -> Result<ImportRecord, StoreError> {
        // A concurrent importer holding the same name blocks this insert until it
        // finishes; if it committed, the conflict leaves no row to return.
        let record = sqlx::query_as::<_, ImportRecord>(
            r#"
            INSERT INTO processed_files (file_name)
            VALUES ($1)
            ON CONFLICT (file_name) DO NOTHING
            RETURNING file_name, processed_at
            "#,
        )
        .bind(file_name)
        .fetch_optional(&mut *self.tx)
        .await?;

        record.ok_or_else(|| {
            tracing::debug!(file = file_name, "ledger already holds file name");
            StoreError::AlreadyProcessed(file_name.to_string())
        })
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
