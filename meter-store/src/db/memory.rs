use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use time::OffsetDateTime;

use super::{MeterStore, StoreError, StoreTransaction};
use crate::domain::{
    ImportRecord, Meter, MeterId, MeterPoint, MeterPointId, NewReading, Reading, ReadingId,
};

#[derive(Debug, Default)]
struct State {
    meter_points: Vec<MeterPoint>,
    meters: Vec<Meter>,
    readings: Vec<Reading>,
    imports: Vec<ImportRecord>,
    mpan_index: HashMap<String, usize>,
    serial_index: HashMap<String, usize>,
    /// Names marked by transactions that have not finished yet.
    pending_imports: HashSet<String>,
    next_reading_id: i64,
}

impl State {
    fn is_recorded(&self, file_name: &str) -> bool {
        self.imports.iter().any(|r| r.file_name == file_name)
    }
}

/// Process-local store with the same contract as the PostgreSQL one.
///
/// Identities are written immediately. A transaction stages its readings and
/// reserves its ledger name; the reservation makes a second mark of the same
/// name fail until the first transaction is dropped.
#[derive(Clone, Default)]
pub struct MemoryMeterStore {
    state: Arc<Mutex<State>>,
}

pub struct MemoryTransaction {
    state: Arc<Mutex<State>>,
    staged: Vec<Reading>,
    marked: Option<ImportRecord>,
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryMeterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn meter_points(&self) -> Vec<MeterPoint> {
        lock(&self.state).meter_points.clone()
    }

    pub fn meters(&self) -> Vec<Meter> {
        lock(&self.state).meters.clone()
    }

    pub fn readings(&self) -> Vec<Reading> {
        lock(&self.state).readings.clone()
    }

    pub fn import_records(&self) -> Vec<ImportRecord> {
        lock(&self.state).imports.clone()
    }
}

#[async_trait::async_trait]
impl MeterStore for MemoryMeterStore {
    type Tx = MemoryTransaction;

    async fn has_processed(&self, file_name: &str) -> Result<bool, StoreError> {
        Ok(lock(&self.state).is_recorded(file_name))
    }

    async fn get_or_create_meter_point(&self, mpan: &str) -> Result<MeterPoint, StoreError> {
        let mut state = lock(&self.state);
        if let Some(&idx) = state.mpan_index.get(mpan) {
            return Ok(state.meter_points[idx].clone());
        }

        let point = MeterPoint {
            id: MeterPointId(state.meter_points.len() as i64 + 1),
            mpan: mpan.to_string(),
        };
        let idx = state.meter_points.len();
        state.mpan_index.insert(point.mpan.clone(), idx);
        state.meter_points.push(point.clone());
        Ok(point)
    }

    async fn get_or_create_meter(
        &self,
        serial_number: &str,
        meter_point_id: MeterPointId,
    ) -> Result<Meter, StoreError> {
        let mut state = lock(&self.state);
        if let Some(&idx) = state.serial_index.get(serial_number) {
            return Ok(state.meters[idx].clone());
        }

        let meter = Meter {
            id: MeterId(state.meters.len() as i64 + 1),
            serial_number: serial_number.to_string(),
            meter_point_id,
        };
        let idx = state.meters.len();
        state.serial_index.insert(meter.serial_number.clone(), idx);
        state.meters.push(meter.clone());
        Ok(meter)
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        Ok(MemoryTransaction {
            state: self.state.clone(),
            staged: Vec::new(),
            marked: None,
        })
    }
}

#[async_trait::async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn create_reading(&mut self, reading: &NewReading) -> Result<ReadingId, StoreError> {
        let id = {
            let mut state = lock(&self.state);
            state.next_reading_id += 1;
            ReadingId(state.next_reading_id)
        };
        self.staged.push(reading.clone().into_reading(id));
        Ok(id)
    }

    async fn mark_processed(&mut self, file_name: &str) -> Result<ImportRecord, StoreError> {
        let mut state = lock(&self.state);
        let already_marked = self.marked.as_ref().is_some_and(|r| r.file_name == file_name);
        if already_marked
            || state.is_recorded(file_name)
            || !state.pending_imports.insert(file_name.to_string())
        {
            tracing::debug!(file = file_name, "ledger already holds file name");
            return Err(StoreError::AlreadyProcessed(file_name.to_string()));
        }
        drop(state);

        let record = ImportRecord {
            file_name: file_name.to_string(),
            processed_at: OffsetDateTime::now_utc(),
        };
        self.release_mark();
        self.marked = Some(record.clone());
        Ok(record)
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        state.readings.append(&mut self.staged);
        if let Some(record) = self.marked.take() {
            state.pending_imports.remove(&record.file_name);
            state.imports.push(record);
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl MemoryTransaction {
    fn release_mark(&mut self) {
        if let Some(record) = self.marked.take() {
            lock(&self.state).pending_imports.remove(&record.file_name);
        }
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        self.release_mark();
    }
}
