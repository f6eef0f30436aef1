use time::OffsetDateTime;

/// Ledger entry for a file whose readings were fully imported.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ImportRecord {
    pub file_name: String,
    pub processed_at: OffsetDateTime,
}
