use std::path::Path;

use futures::StreamExt;
use meter_store::{
    db::{MeterStore, StoreError, StoreTransaction},
    domain::{MeterId, NewReading},
};

use crate::{
    context::ScanContext,
    error::{ImportError, RowRejection},
    record::D0010Line,
    sources::D0010FileSource,
    validation::validate_reading,
};

/// Result of importing one file that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Imported(ImportStats),
    /// The ledger already listed the file when the import started.
    AlreadyImported,
    /// Another importer committed the same file name while this one was
    /// scanning. The readings this import staged were rolled back.
    CompletedConcurrently,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub lines: u64,
    pub readings_created: u64,
    pub rows_rejected: u64,
    /// Malformed rows and rows with an unrecognized record type.
    pub lines_ignored: u64,
}

/// Imports D0010 files into a [`MeterStore`].
///
/// Each file is one store transaction: its readings and its ledger entry are
/// committed together, and a fatal error part way through leaves no readings
/// behind. Meter points and meters are resolved outside that transaction and
/// kept, since they are shared by every file that names them.
pub struct FileImporter<S> {
    store: S,
}

impl<S: MeterStore> FileImporter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn import_file(&self, path: &Path) -> Result<FileOutcome, ImportError> {
        let file_name = file_name_of(path)?;

        if self.store.has_processed(&file_name).await? {
            tracing::info!(file = %file_name, "file has already been imported, skipping");
            metrics::counter!("d0010_files_skipped_total").increment(1);
            return Ok(FileOutcome::AlreadyImported);
        }

        let mut tx = self.store.begin().await?;
        let mut ctx = ScanContext::default();
        let mut stats = ImportStats::default();
        let mut lines = D0010FileSource::new(path).stream();

        // Any error returned from here drops `tx`, discarding the file's rows.
        while let Some(item) = lines.next().await {
            let env = item?;
            stats.lines += 1;

            match env.payload {
                D0010Line::MeterPoint(mpan) => ctx.set_meter_point(mpan),
                D0010Line::Serial(serial_number) => ctx.set_serial(serial_number),
                D0010Line::Reading(raw) => {
                    let reading = match validate_reading(&raw) {
                        Ok(reading) => reading,
                        Err(rejection) => {
                            reject_row(&file_name, env.line, &rejection, &mut stats);
                            continue;
                        }
                    };
                    let meter_id = match self.resolve_meter(&mut ctx, &file_name, env.line).await? {
                        Ok(meter_id) => meter_id,
                        Err(rejection) => {
                            reject_row(&file_name, env.line, &rejection, &mut stats);
                            continue;
                        }
                    };

                    tx.create_reading(&NewReading {
                        meter_id,
                        value: reading.value,
                        reading_date: reading.reading_date,
                        meter_register_id: reading.register_id,
                        file_name: file_name.clone(),
                    })
                    .await?;
                    stats.readings_created += 1;
                }
                D0010Line::Unrecognized(code) => {
                    tracing::debug!(file = %file_name, line = env.line, code = %code, "ignoring unrecognized record type");
                    stats.lines_ignored += 1;
                }
                D0010Line::Malformed => {
                    tracing::debug!(file = %file_name, line = env.line, "ignoring malformed line");
                    stats.lines_ignored += 1;
                }
            }
        }

        match tx.mark_processed(&file_name).await {
            Ok(_) => {}
            Err(StoreError::AlreadyProcessed(_)) => {
                tx.rollback().await?;
                tracing::warn!(file = %file_name, "file was imported concurrently, discarding this import");
                metrics::counter!("d0010_files_skipped_total").increment(1);
                return Ok(FileOutcome::CompletedConcurrently);
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit().await?;

        metrics::counter!("d0010_files_imported_total").increment(1);
        metrics::counter!("d0010_readings_created_total").increment(stats.readings_created);
        tracing::info!(
            file = %file_name,
            readings = stats.readings_created,
            rejected = stats.rows_rejected,
            ignored = stats.lines_ignored,
            "imported readings"
        );

        Ok(FileOutcome::Imported(stats))
    }

    /// Meter for the current context, resolved once per `026`/`028`
    /// declaration. The outer error is fatal for the file; the inner one only
    /// drops the row.
    async fn resolve_meter(
        &self,
        ctx: &mut ScanContext,
        file_name: &str,
        line: u64,
    ) -> Result<Result<MeterId, RowRejection>, StoreError> {
        if let Some(meter_id) = ctx.resolved_meter() {
            return Ok(Ok(meter_id));
        }
        let identity = match ctx.identity() {
            Ok(identity) => identity,
            Err(rejection) => return Ok(Err(rejection)),
        };

        let point = self.store.get_or_create_meter_point(identity.mpan).await?;
        let meter = self
            .store
            .get_or_create_meter(identity.serial_number, point.id)
            .await?;
        if meter.meter_point_id != point.id {
            tracing::warn!(
                file = %file_name,
                line,
                meter = %meter,
                meter_point = %point,
                "meter already belongs to a different meter point, keeping existing association"
            );
        }

        ctx.set_resolved_meter(meter.id);
        Ok(Ok(meter.id))
    }
}

fn reject_row(file_name: &str, line: u64, rejection: &RowRejection, stats: &mut ImportStats) {
    tracing::warn!(file = %file_name, line, reason = %rejection, "skipping reading row");
    metrics::counter!("d0010_rows_rejected_total").increment(1);
    stats.rows_rejected += 1;
}

fn file_name_of(path: &Path) -> Result<String, ImportError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| ImportError::Path(format!("'{}' has no usable file name", path.display())))
}
