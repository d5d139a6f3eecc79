//! OCR engine collaborator.

use crate::Result;
use crate::plugins::Plugin;
use crate::types::{PageImage, Rotation, TextFragment};
use async_trait::async_trait;

/// Text recognition over a page image.
///
/// The pipeline calls `recognize` once per rotation hypothesis on the first
/// page, then once per remaining page at the winning rotation. Calls may be
/// slow; the pipeline wraps each one in a timeout and retries it up to
/// `ocr.max_attempts` times.
///
/// # Example
///
/// ```rust
/// use rosterscan::plugins::{OcrBackend, Plugin};
/// use rosterscan::types::{PageImage, Rotation, TextFragment};
/// use rosterscan::Result;
/// use async_trait::async_trait;
///
/// struct FixedOcr;
///
/// impl Plugin for FixedOcr {
///     fn name(&self) -> &str { "fixed-ocr" }
///     fn version(&self) -> String { "1.0.0".to_string() }
///     fn initialize(&self) -> Result<()> { Ok(()) }
///     fn shutdown(&self) -> Result<()> { Ok(()) }
/// }
///
/// #[async_trait]
/// impl OcrBackend for FixedOcr {
///     async fn recognize(&self, _page: &PageImage, _rotation: Rotation) -> Result<Vec<TextFragment>> {
///         Ok(vec![TextFragment::from_rect(80.0, 90.0, 120.0, 110.0, "MON")])
///     }
/// }
/// ```
#[async_trait]
pub trait OcrBackend: Plugin {
    /// Recognize text on `page` after rotating it by `rotation`.
    ///
    /// Fragment coordinates are in the rotated page's pixel space.
    ///
    /// # Errors
    ///
    /// - `RosterError::Ocr` - the engine failed or the image is undecodable
    async fn recognize(&self, page: &PageImage, rotation: Rotation) -> Result<Vec<TextFragment>>;
}
