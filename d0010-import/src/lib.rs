pub mod batch;
pub mod config;
pub mod context;
pub mod error;
pub mod importer;
pub mod observability;
pub mod record;
pub mod sources;
pub mod validation;

pub use error::{ImportError, RowRejection};
pub use importer::{FileImporter, FileOutcome, ImportStats};
