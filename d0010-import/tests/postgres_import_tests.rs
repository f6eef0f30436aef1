//! Runs against a live PostgreSQL named by `DATABASE_URL`; skipped when unset.

use std::{
    fs,
    time::{SystemTime, UNIX_EPOCH},
};

use d0010_import::{
    batch::{discover_files, run_batch},
    FileImporter, FileOutcome,
};
use meter_store::db::PgMeterStore;
use sqlx::postgres::PgPoolOptions;
use tempfile::TempDir;

const SCHEMA: &str = include_str!("../../sql/schema/01_meter_readings.sql");

fn run_tag() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{nanos}", std::process::id())
}

/// Declares every meter point in `order`, one reading each.
fn shared_identity_file(tag: &str, order: impl Iterator<Item = usize>) -> String {
    order
        .map(|i| format!("026|{tag}-MP{i}|V|\n028|{tag}-SERIAL{i}|\n030|S|20160222000000|{i}|\n"))
        .collect()
}

#[tokio::test]
async fn test_parallel_files_sharing_identities_in_opposite_order() {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping PostgreSQL test");
        return;
    };
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .unwrap();
    let setup = format!("SELECT pg_advisory_xact_lock(10010);\n{SCHEMA}");
    sqlx::raw_sql(&setup).execute(&pool).await.unwrap();

    let tag = run_tag();
    let dir = TempDir::new().unwrap();
    let names = vec![format!("{tag}-a.uff"), format!("{tag}-b.uff")];
    fs::write(dir.path().join(&names[0]), shared_identity_file(&tag, 0..20)).unwrap();
    fs::write(
        dir.path().join(&names[1]),
        shared_identity_file(&tag, (0..20).rev()),
    )
    .unwrap();
    let importer = FileImporter::new(PgMeterStore::new(pool.clone()));

    let files = discover_files(dir.path(), "uff").unwrap();
    let report = run_batch(&importer, files, 2).await;

    for (path, result) in &report.results {
        assert!(
            matches!(result, Ok(FileOutcome::Imported(_))),
            "{} ended with {result:?}",
            path.display()
        );
    }
    let readings: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM readings WHERE file_name = ANY($1)")
            .bind(&names)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(readings, 40);
    let ledger: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM processed_files WHERE file_name = ANY($1)")
            .bind(&names)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(ledger, 2);
}
