use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use futures::StreamExt;
use meter_store::db::MeterStore;

use crate::{
    error::ImportError,
    importer::{FileImporter, FileOutcome},
};

/// Resolves the command-line path to the files to import.
///
/// A file is imported as given, whatever its extension. A directory yields its
/// immediate regular files with the given extension, sorted by name.
pub fn discover_files(path: &Path, extension: &str) -> Result<Vec<PathBuf>, ImportError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(ImportError::Path(format!(
            "'{}' is neither a file nor a directory",
            path.display()
        )));
    }

    let read_err = |e: std::io::Error| {
        ImportError::Path(format!("failed to list directory {}: {e}", path.display()))
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(path).map_err(read_err)? {
        let entry_path = entry.map_err(read_err)?.path();
        if entry_path.is_file() && entry_path.extension() == Some(OsStr::new(extension)) {
            files.push(entry_path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(files)
}

/// Per-file results of a batch, in the order the files were given.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<(PathBuf, Result<FileOutcome, ImportError>)>,
}

impl BatchReport {
    pub fn imported(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, r)| matches!(r, Ok(FileOutcome::Imported(_))))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, r)| {
                matches!(
                    r,
                    Ok(FileOutcome::AlreadyImported | FileOutcome::CompletedConcurrently)
                )
            })
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &ImportError)> {
        self.results
            .iter()
            .filter_map(|(path, r)| r.as_ref().err().map(|e| (path.as_path(), e)))
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn log_summary(&self) {
        tracing::info!(
            files = self.results.len(),
            imported = self.imported(),
            skipped = self.skipped(),
            failed = self.failures().count(),
            "batch finished"
        );
    }

    /// Every file has been attempted by the time a report exists; this turns
    /// any per-file failure into an error for the process exit status.
    pub fn into_result(self) -> anyhow::Result<()> {
        let failed: Vec<String> = self
            .failures()
            .map(|(path, _)| path.display().to_string())
            .collect();
        if failed.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("{} file(s) failed to import: {}", failed.len(), failed.join(", "))
        }
    }
}

/// Imports `files` with at most `workers` imports in flight. A failing file
/// is logged and recorded; the rest of the batch still runs.
pub async fn run_batch<S: MeterStore>(
    importer: &FileImporter<S>,
    files: Vec<PathBuf>,
    workers: usize,
) -> BatchReport {
    let results = futures::stream::iter(files)
        .map(|path| async move {
            let result = importer.import_file(&path).await;
            if let Err(e) = &result {
                tracing::error!(file = %path.display(), error = %e, "failed to import file");
                metrics::counter!("d0010_files_failed_total").increment(1);
            }
            (path, result)
        })
        .buffered(workers.max(1))
        .collect()
        .await;

    BatchReport { results }
}
