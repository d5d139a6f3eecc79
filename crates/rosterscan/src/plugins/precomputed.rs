//! OCR backend serving fragments recognized ahead of time.
//!
//! The JSON document is either an array of pages or `{"pages": [...]}`. Each
//! page is either a plain list of fragments, served for every rotation, or a
//! map from rotation degrees (`"0"`, `"90"`, ...) to fragment lists. A
//! fragment is `[bbox, text, confidence]`, `[bbox, text]`, or an object with
//! those fields.

use crate::plugins::{OcrBackend, Plugin};
use crate::types::{PageImage, Point, Rotation, TextFragment};
use crate::{Result, RosterError};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Confidence given to fragments recorded without one.
const UNSCORED_CONFIDENCE: f64 = 1.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FragmentEntry {
    Tuple([Point; 4], String, f64),
    Pair([Point; 4], String),
    Object(TextFragment),
}

impl From<FragmentEntry> for TextFragment {
    fn from(entry: FragmentEntry) -> Self {
        match entry {
            FragmentEntry::Tuple(bbox, text, confidence) => TextFragment::new(bbox, text, confidence),
            FragmentEntry::Pair(bbox, text) => TextFragment::new(bbox, text, UNSCORED_CONFIDENCE),
            FragmentEntry::Object(fragment) => fragment,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PageEntry {
    Plain(Vec<FragmentEntry>),
    Rotated(BTreeMap<String, Vec<FragmentEntry>>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Document {
    Pages(Vec<PageEntry>),
    Wrapped { pages: Vec<PageEntry> },
}

#[derive(Debug, Clone)]
enum PrecomputedPage {
    Upright(Vec<TextFragment>),
    Rotated(BTreeMap<Rotation, Vec<TextFragment>>),
}

fn convert(entries: Vec<FragmentEntry>) -> Vec<TextFragment> {
    entries.into_iter().map(TextFragment::from).collect()
}

impl TryFrom<PageEntry> for PrecomputedPage {
    type Error = RosterError;

    fn try_from(entry: PageEntry) -> Result<Self> {
        match entry {
            PageEntry::Plain(fragments) => Ok(Self::Upright(convert(fragments))),
            PageEntry::Rotated(map) => {
                let mut rotations = BTreeMap::new();
                for (key, fragments) in map {
                    let rotation = key
                        .trim()
                        .trim_end_matches('°')
                        .parse::<u16>()
                        .ok()
                        .and_then(Rotation::from_degrees)
                        .ok_or_else(|| RosterError::validation(format!("Invalid rotation key '{}'", key)))?;
                    rotations.insert(rotation, convert(fragments));
                }
                Ok(Self::Rotated(rotations))
            }
        }
    }
}

/// OCR backend answering from a recorded JSON document.
#[derive(Debug, Clone)]
pub struct PrecomputedOcr {
    pages: Vec<PrecomputedPage>,
}

impl PrecomputedOcr {
    /// Parse a recorded document.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: Document = serde_json::from_str(json)
            .map_err(|e| RosterError::serialization_with_source("Invalid precomputed OCR document", e))?;
        let entries = match document {
            Document::Pages(pages) | Document::Wrapped { pages } => pages,
        };
        let pages = entries
            .into_iter()
            .map(PrecomputedPage::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { pages })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Upright fragments, one list per page.
    pub fn from_pages(pages: Vec<Vec<TextFragment>>) -> Self {
        Self {
            pages: pages.into_iter().map(PrecomputedPage::Upright).collect(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Placeholder page images matching the recorded pages.
    pub fn page_images(&self) -> Vec<PageImage> {
        (0..self.pages.len()).map(PageImage::placeholder).collect()
    }
}

impl Plugin for PrecomputedOcr {
    fn name(&self) -> &str {
        "precomputed-ocr"
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn description(&self) -> &str {
        "Serves OCR fragments recorded in a JSON document"
    }
}

#[async_trait]
impl OcrBackend for PrecomputedOcr {
    async fn recognize(&self, page: &PageImage, rotation: Rotation) -> Result<Vec<TextFragment>> {
        match self.pages.get(page.number) {
            Some(PrecomputedPage::Upright(fragments)) => Ok(fragments.clone()),
            Some(PrecomputedPage::Rotated(rotations)) => rotations
                .get(&rotation)
                .cloned()
                .ok_or_else(|| RosterError::ocr(format!("No fragments recorded for page {} at {}", page.number, rotation))),
            None => Err(RosterError::ocr(format!("No page {} in precomputed document", page.number))),
        }
    }
}
