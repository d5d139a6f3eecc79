//! Failure handling of the import pipeline.
//!
//! Collaborator failures must degrade the report, not abort the run:
//! - OCR failures drop a single page
//! - Unresolvable orientation falls back to 0°
//! - Directory failures leave names unmatched
//! - Shift store failures stop the run with a database status
//!
//! Only an invalid configuration is returned as an error.

mod helpers;

use helpers::*;
use rosterscan::core::config::ImportConfig;
use rosterscan::core::pipeline::import_document;
use rosterscan::plugins::{InMemoryDirectory, InMemoryShiftStore, PrecomputedOcr};
use rosterscan::types::{ImportStatus, PageImage, Rotation, UnmatchedReason};
use rosterscan::RosterError;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn placeholders(count: usize) -> Vec<PageImage> {
    (0..count).map(PageImage::placeholder).collect()
}

fn roster(name: &str) -> Vec<rosterscan::TextFragment> {
    page(vec![header(100.0, 3), data_row(200.0, name, &[(0, "9A-5P"), (2, "1P-9P")])])
}

#[tokio::test]
async fn test_ocr_failure_drops_only_that_page() {
    let ocr = ScriptedOcr::new().with_upright(0, roster("Eve")).with_upright(2, roster("Bob"));
    let directory = InMemoryDirectory::new(employees());
    let store = InMemoryShiftStore::new();

    let report = import_document(&placeholders(3), &ocr, &directory, &store, &options(false), &ImportConfig::default())
        .await
        .unwrap();

    assert_eq!(report.status, ImportStatus::Completed);
    assert_eq!(report.imported_count, 4);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("Page 1:"), "unexpected error: {}", report.errors[0]);
    assert_eq!(ocr.requests_for(1), vec![Rotation::Deg0, Rotation::Deg0], "failed call is retried once");
}

#[tokio::test]
async fn test_page_without_header_reports_unmatched_rows() {
    let ocr = PrecomputedOcr::from_pages(vec![page(vec![
        line(50.0, "Weekly roster"),
        data_row(200.0, "Eve", &[(0, "9A-5P")]),
    ])]);
    let directory = InMemoryDirectory::new(employees());
    let store = InMemoryShiftStore::new();

    let report = import_document(&ocr.page_images(), &ocr, &directory, &store, &options(false), &ImportConfig::default())
        .await
        .unwrap();

    assert_eq!(report.imported_count, 0);
    assert!(store.is_empty());
    assert_eq!(report.unmatched_rows.len(), 2);
    assert!(report.unmatched_rows.iter().all(|r| r.reason == UnmatchedReason::NoColumns));
    assert_eq!(report.unmatched_rows[1].text, "Eve 9A-5P");
}

#[tokio::test]
async fn test_cells_without_name_are_reported() {
    let ocr = PrecomputedOcr::from_pages(vec![page(vec![
        header(100.0, 3),
        data_row(200.0, "", &[(0, "9A-5P"), (1, "9A-5P")]),
        data_row(300.0, "Eve", &[(2, "9A-5P")]),
    ])]);
    let directory = InMemoryDirectory::new(employees());
    let store = InMemoryShiftStore::new();

    let report = import_document(&ocr.page_images(), &ocr, &directory, &store, &options(false), &ImportConfig::default())
        .await
        .unwrap();

    assert_eq!(report.imported_count, 1);
    assert_eq!(report.unmatched_rows.len(), 1);
    assert_eq!(report.unmatched_rows[0].reason, UnmatchedReason::MissingName);
}

#[tokio::test]
async fn test_store_failure_stops_the_run() {
    let ocr = PrecomputedOcr::from_pages(vec![roster("Eve"), roster("Bob")]);
    let directory = InMemoryDirectory::new(employees());
    let store = FailingStore::after(1);

    let report = import_document(&ocr.page_images(), &ocr, &directory, &store, &options(false), &ImportConfig::default())
        .await
        .unwrap();

    assert!(report.is_database_error());
    match &report.status {
        ImportStatus::DatabaseError { message } => {
            assert!(message.contains("database is locked"), "unexpected message: {}", message);
        }
        other => panic!("Expected database error, got {:?}", other),
    }
    assert_eq!(report.imported_count, 1, "the insert before the failure still counts");
    assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unresolvable_orientation_defaults_to_upright() {
    let ocr = ScriptedOcr::new().with(1, Rotation::Deg0, roster("Eve"));
    let directory = InMemoryDirectory::new(employees());
    let store = InMemoryShiftStore::new();

    let report = import_document(&placeholders(2), &ocr, &directory, &store, &options(false), &ImportConfig::default())
        .await
        .unwrap();

    assert_eq!(report.rotation, Some(Rotation::Deg0));
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("Page 0:"));
    assert!(report.errors[0].contains("Orientation undetermined"));
    assert_eq!(report.imported_count, 2, "later pages still run at 0°");
    assert_eq!(ocr.call_count.load(Ordering::SeqCst), 9);
}

#[tokio::test]
async fn test_directory_failure_leaves_names_unmatched() {
    let ocr = PrecomputedOcr::from_pages(vec![roster("Eve")]);
    let store = InMemoryShiftStore::new();

    let report = import_document(
        &ocr.page_images(),
        &ocr,
        &UnreachableDirectory,
        &store,
        &options(false),
        &ImportConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.status, ImportStatus::Completed);
    assert_eq!(report.imported_count, 0);
    assert!(report.errors.iter().any(|e| e.contains("connection refused")));
    assert_eq!(report.unmatched_employees.len(), 1);
    assert_eq!(report.unmatched_employees[0].shifts.len(), 2);
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_ocr() {
    let ocr = ScriptedOcr::new();
    let directory = InMemoryDirectory::new(employees());
    let store = InMemoryShiftStore::new();

    let mut config = ImportConfig::default();
    config.ocr.max_attempts = 0;

    let result = import_document(&placeholders(1), &ocr, &directory, &store, &options(false), &config).await;

    assert!(matches!(result, Err(RosterError::Validation { .. })));
    assert_eq!(ocr.call_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_slow_ocr_call_times_out() {
    let ocr = ScriptedOcr::new()
        .with_upright(0, roster("Eve"))
        .with(1, Rotation::Deg0, roster("Bob"))
        .with_delay(1, Duration::from_secs(3));
    let directory = InMemoryDirectory::new(employees());
    let store = InMemoryShiftStore::new();

    let mut config = ImportConfig::default();
    config.ocr.timeout_secs = 1;
    config.ocr.max_attempts = 1;

    let report = import_document(&placeholders(2), &ocr, &directory, &store, &options(false), &config)
        .await
        .unwrap();

    assert_eq!(report.imported_count, 2);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("Timed out"), "unexpected error: {}", report.errors[0]);
}
