//! Document import orchestration.
//!
//! Pages are processed strictly in order, and rows within a page top to
//! bottom, because section, header, and date state carries forward. Failures
//! are accounted for in the [`ImportReport`] rather than aborting the run:
//!
//! - an OCR failure on a page drops that page and is listed in `errors`
//! - a page without a header reports its rows as unmatched
//! - a shift store failure stops materialization with a database error status

use crate::Result;
use crate::core::config::ImportConfig;
use crate::layout::lines::reconstruct_lines;
use crate::layout::orientation::{recognize_with_retry, resolve_orientation};
use crate::plugins::{EmployeeDirectory, OcrBackend, ShiftStore};
use crate::schedule::materialize::Materializer;
use crate::schedule::page::parse_page;
use crate::schedule::state::DocumentState;
use crate::text::location::LocationMatcher;
use crate::types::{ImportOptions, ImportReport, ImportStatus, PageImage, Rotation, TextFragment};

/// Reconstruct the shifts of a scanned weekly schedule.
///
/// The first page is recognized at all four rotations and the best-scoring
/// one is used for every page of the document. Candidates are stored through
/// `store` unless `options.dry_run` is set, in which case they are returned in
/// `parsed_shifts` and nothing is written.
///
/// # Errors
///
/// Only an invalid `config` is an error. Everything that goes wrong while
/// processing pages is reported through the returned report.
///
/// # Example
///
/// ```rust,no_run
/// use rosterscan::core::config::ImportConfig;
/// use rosterscan::core::pipeline::import_document;
/// use rosterscan::plugins::{InMemoryDirectory, InMemoryShiftStore, PrecomputedOcr};
/// use rosterscan::types::ImportOptions;
///
/// # async fn example() -> rosterscan::Result<()> {
/// let ocr = PrecomputedOcr::from_file("fragments.json")?;
/// let directory = InMemoryDirectory::from_json_file("employees.json")?;
/// let store = InMemoryShiftStore::new();
///
/// let report = import_document(
///     &ocr.page_images(),
///     &ocr,
///     &directory,
///     &store,
///     &ImportOptions::default(),
///     &ImportConfig::default(),
/// )
/// .await?;
/// println!("Imported {} shifts", report.imported_count);
/// # Ok(())
/// # }
/// ```
#[tracing::instrument(
    name = "import_document",
    skip_all,
    fields(pages = pages.len(), dry_run = options.dry_run)
)]
pub async fn import_document(
    pages: &[PageImage],
    ocr: &dyn OcrBackend,
    directory: &dyn EmployeeDirectory,
    store: &dyn ShiftStore,
    options: &ImportOptions,
    config: &ImportConfig,
) -> Result<ImportReport> {
    config.validate()?;
    let matcher = LocationMatcher::new(&config.locations)?;

    let reference_date = options
        .reference_date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let mut document = DocumentState::new(reference_date, config.locations.initial.clone());
    let mut materializer = Materializer::new(directory, store, &matcher, config, options.dry_run);
    let mut report = ImportReport::new(options.dry_run);

    for page in pages {
        if let Err(e) = process_page(page, ocr, &matcher, config, &mut document, &mut materializer, &mut report).await {
            tracing::warn!("Shift store failed on page {}: {}", page.number, e);
            report.status = ImportStatus::DatabaseError { message: e.to_string() };
            break;
        }
    }

    report.rotation = document.rotation;

    tracing::info!(
        "Import finished: {} imported, {} skipped as duplicates, {} unmatched names, {} unmatched rows, {} errors",
        report.imported_count,
        report.skipped_duplicates,
        report.unmatched_employees.len(),
        report.unmatched_rows.len(),
        report.errors.len()
    );

    Ok(report)
}

/// Fragments of `page` at the document's rotation, resolving the rotation on
/// the first page. OCR failures are recorded in the report.
async fn page_fragments(
    page: &PageImage,
    ocr: &dyn OcrBackend,
    config: &ImportConfig,
    document: &mut DocumentState,
    report: &mut ImportReport,
) -> Option<Vec<TextFragment>> {
    match document.rotation {
        Some(rotation) => match recognize_with_retry(ocr, page, rotation, &config.ocr).await {
            Ok(fragments) => Some(fragments),
            Err(e) => {
                report.errors.push(format!("Page {}: {}", page.number, e));
                None
            }
        },
        None => match resolve_orientation(ocr, page, &config.ocr).await {
            Ok(orientation) => {
                tracing::info!(
                    "Using rotation {} (score {}) for the document",
                    orientation.rotation,
                    orientation.score
                );
                document.rotation = Some(orientation.rotation);
                Some(orientation.fragments)
            }
            Err(e) => {
                tracing::warn!("Defaulting to {}: {}", Rotation::Deg0, e);
                document.rotation = Some(Rotation::Deg0);
                report.errors.push(format!("Page {}: {}", page.number, e));
                None
            }
        },
    }
}

/// Process one page. Only a shift store failure is returned as an error.
#[tracing::instrument(name = "page", skip_all, fields(number = page.number))]
async fn process_page(
    page: &PageImage,
    ocr: &dyn OcrBackend,
    matcher: &LocationMatcher,
    config: &ImportConfig,
    document: &mut DocumentState,
    materializer: &mut Materializer<'_>,
    report: &mut ImportReport,
) -> Result<()> {
    let Some(fragments) = page_fragments(page, ocr, config, document, report).await else {
        return Ok(());
    };

    let rows = reconstruct_lines(fragments, config.layout.row_tolerance_px);
    let parsed = parse_page(page.number, &rows, document, matcher, config);

    tracing::info!(
        "Page {}: {} rows, {} data rows, {} unmatched rows",
        page.number,
        rows.len(),
        parsed.rows.len(),
        parsed.unmatched_rows.len()
    );

    report.unmatched_rows.extend(parsed.unmatched_rows.iter().cloned());
    materializer.materialize_page(&parsed, document, report).await
}
