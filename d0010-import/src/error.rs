use meter_store::db::StoreError;

/// Failures that abort the import of a whole file (or, for `Path`, the whole
/// batch before it starts).
#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    #[error("source error: {0}")]
    Source(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("path error: {0}")]
    Path(String),
}

/// Why a single reading row was dropped. The scan carries on after any of
/// these.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RowRejection {
    #[error("invalid reading value '{0}'")]
    InvalidValue(String),
    #[error("invalid reading date '{0}'")]
    InvalidDate(String),
    #[error("reading precedes its meter point or serial number")]
    MissingContext,
}
