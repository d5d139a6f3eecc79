//! Page orientation by scoring OCR output of each rotation.

use crate::core::config::OcrConfig;
use crate::layout::header::count_day_tokens;
use crate::plugins::OcrBackend;
use crate::text::time::count_time_ranges;
use crate::types::{PageImage, Rotation, TextFragment};
use crate::{Result, RosterError};
use std::time::Duration;

/// The winning rotation of a page and its fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct Orientation {
    pub rotation: Rotation,
    pub score: usize,
    pub fragments: Vec<TextFragment>,
}

/// How schedule-like a fragment stream reads: two points per time range,
/// one per token naming a day.
pub fn score_fragments(fragments: &[TextFragment]) -> usize {
    fragments
        .iter()
        .map(|f| 2 * count_time_ranges(&f.text) + count_day_tokens(&f.text))
        .sum()
}

/// Run one OCR call under the configured timeout, retrying failures.
pub async fn recognize_with_retry(
    ocr: &dyn OcrBackend,
    page: &PageImage,
    rotation: Rotation,
    config: &OcrConfig,
) -> Result<Vec<TextFragment>> {
    let limit = Duration::from_secs(config.timeout_secs);
    let attempts = config.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match tokio::time::timeout(limit, ocr.recognize(page, rotation)).await {
            Ok(Ok(fragments)) => return Ok(fragments),
            Ok(Err(e)) => {
                tracing::warn!(
                    "OCR attempt {}/{} failed for page {} at {}: {}",
                    attempt,
                    attempts,
                    page.number,
                    rotation,
                    e
                );
                last_error = Some(e);
            }
            Err(_) => {
                tracing::warn!(
                    "OCR attempt {}/{} timed out for page {} at {}",
                    attempt,
                    attempts,
                    page.number,
                    rotation
                );
                last_error = Some(RosterError::Timeout {
                    operation: format!("OCR page {} at {}", page.number, rotation),
                    seconds: config.timeout_secs,
                });
            }
        }
    }

    Err(last_error.unwrap_or_else(|| RosterError::ocr(format!("OCR never ran for page {}", page.number))))
}

/// Pick the best-scoring rotation of `page`.
///
/// Rotations are evaluated in the order 0°, 90°, 180°, 270° and only a
/// strictly higher score displaces the current best, so ties go to the
/// earlier rotation. A rotation whose OCR call fails is skipped. Fails only
/// when every rotation failed.
pub async fn resolve_orientation(ocr: &dyn OcrBackend, page: &PageImage, config: &OcrConfig) -> Result<Orientation> {
    let mut best: Option<Orientation> = None;
    let mut failures = Vec::new();

    for rotation in Rotation::ALL {
        let fragments = match recognize_with_retry(ocr, page, rotation, config).await {
            Ok(fragments) => fragments,
            Err(e) => {
                tracing::warn!("Skipping rotation {} of page {}: {}", rotation, page.number, e);
                failures.push(format!("{}: {}", rotation, e));
                continue;
            }
        };

        let score = score_fragments(&fragments);
        tracing::debug!("Page {} at {} scores {}", page.number, rotation, score);

        if best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(Orientation {
                rotation,
                score,
                fragments,
            });
        }
    }

    best.ok_or_else(|| {
        RosterError::ocr(format!(
            "Orientation undetermined for page {}, every rotation failed ({})",
            page.number,
            failures.join("; ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::Plugin;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RotatingOcr {
        outputs: HashMap<Rotation, Vec<&'static str>>,
        calls: AtomicUsize,
    }

    impl RotatingOcr {
        fn new(outputs: Vec<(Rotation, Vec<&'static str>)>) -> Self {
            Self {
                outputs: outputs.into_iter().collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Plugin for RotatingOcr {
        fn name(&self) -> &str {
            "rotating-ocr"
        }

        fn version(&self) -> String {
            "1.0.0".to_string()
        }

        fn initialize(&self) -> Result<()> {
            Ok(())
        }

        fn shutdown(&self) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl OcrBackend for RotatingOcr {
        async fn recognize(&self, _page: &PageImage, rotation: Rotation) -> Result<Vec<TextFragment>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outputs.get(&rotation) {
                Some(texts) => Ok(texts
                    .iter()
                    .enumerate()
                    .map(|(i, t)| TextFragment::from_rect(i as f64 * 100.0, 0.0, i as f64 * 100.0 + 50.0, 20.0, *t))
                    .collect()),
                None => Err(RosterError::ocr("engine crashed")),
            }
        }
    }

    fn config() -> OcrConfig {
        OcrConfig {
            timeout_secs: 5,
            max_attempts: 2,
        }
    }

    #[test]
    fn test_score_fragments() {
        let fragments = vec![
            TextFragment::from_rect(0.0, 0.0, 10.0, 10.0, "MON TUE"),
            TextFragment::from_rect(0.0, 0.0, 10.0, 10.0, "9:00A-5:00P"),
            TextFragment::from_rect(0.0, 0.0, 10.0, 10.0, "hello"),
        ];
        assert_eq!(score_fragments(&fragments), 4);
    }

    #[tokio::test]
    async fn test_best_rotation_wins() {
        let ocr = RotatingOcr::new(vec![
            (Rotation::Deg0, vec!["NOM", "3UT"]),
            (Rotation::Deg90, vec!["MON", "TUE", "9A-5P"]),
            (Rotation::Deg180, vec!["MON"]),
            (Rotation::Deg270, vec![]),
        ]);

        let orientation = resolve_orientation(&ocr, &PageImage::placeholder(0), &config()).await.unwrap();
        assert_eq!(orientation.rotation, Rotation::Deg90);
        assert_eq!(orientation.score, 4);
        assert_eq!(orientation.fragments.len(), 3);
    }

    #[tokio::test]
    async fn test_ties_go_to_first_rotation() {
        let ocr = RotatingOcr::new(vec![
            (Rotation::Deg0, vec!["MON"]),
            (Rotation::Deg90, vec!["TUE"]),
            (Rotation::Deg180, vec!["WED"]),
            (Rotation::Deg270, vec!["THU"]),
        ]);

        let orientation = resolve_orientation(&ocr, &PageImage::placeholder(0), &config()).await.unwrap();
        assert_eq!(orientation.rotation, Rotation::Deg0);
    }

    #[tokio::test]
    async fn test_failing_rotation_is_skipped_and_retried() {
        let ocr = RotatingOcr::new(vec![(Rotation::Deg180, vec!["MON"])]);

        let orientation = resolve_orientation(&ocr, &PageImage::placeholder(0), &config()).await.unwrap();
        assert_eq!(orientation.rotation, Rotation::Deg180);
        // Three failing rotations, two attempts each, plus one success.
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_all_rotations_failing() {
        let ocr = RotatingOcr::new(Vec::new());

        let result = resolve_orientation(&ocr, &PageImage::placeholder(2), &config()).await;
        let err = result.unwrap_err();
        assert!(matches!(err, RosterError::Ocr { .. }));
        assert!(err.to_string().contains("page 2"));
    }
}
