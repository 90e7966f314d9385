//! Collaborator interfaces for PDF access and layout detection.
//!
//! The reasoning pipeline works purely on bounding boxes and text; opening,
//! rendering, text extraction, and cropping of the PDF, and the vision
//! model itself, sit behind these traits. Implementations are expected to
//! map their library's failure modes onto the error taxonomy: fatal
//! document problems at open time, [`crate::Error::Detection`] /
//! [`crate::Error::TextExtraction`] / [`crate::Error::Crop`] for
//! per-page and per-element failures the orchestrator degrades on.

use std::path::Path;

use image::DynamicImage;

use crate::error::Result;
use crate::models::{BoundingBox, Document, Element};

/// One raw detection from the vision model, in image space.
///
/// Coordinates refer to the rendered raster; the routing layer rescales
/// them into page space using the render scale factor.
#[derive(Debug, Clone)]
pub struct RawDetection {
    /// Left edge in image pixels
    pub x1: f32,
    /// Top edge in image pixels
    pub y1: f32,
    /// Right edge in image pixels
    pub x2: f32,
    /// Bottom edge in image pixels
    pub y2: f32,
    /// Model class label (e.g. `figure`, `table`, `figure_caption`)
    pub label: String,
    /// Model confidence in [0, 1]
    pub confidence: f32,
}

/// Access to one opened PDF document.
///
/// A backend represents a validated, loaded document; constructing one is
/// where the fatal open/validate errors surface.
pub trait PdfBackend {
    /// Metadata of the loaded document, including page descriptors.
    fn document(&self) -> &Document;

    /// Render a page to a raster image for detector inference.
    ///
    /// Returns the image together with the scale factor that was applied
    /// to the page (image pixels = page points × scale factor).
    fn render_page(&self, page_number: u32) -> Result<(DynamicImage, f32)>;

    /// Extract text clipped to a region of a page.
    fn extract_text(&self, page_number: u32, clip: &BoundingBox) -> Result<String>;

    /// Extract the full text of a page.
    fn extract_page_text(&self, page_number: u32) -> Result<String>;

    /// Crop an element's padded region from its page and save it as a new
    /// single-page PDF at `output_path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutputExists`] when the file exists and
    /// `overwrite` is false, [`crate::Error::Crop`] for other failures.
    fn crop_to_file(&self, element: &Element, output_path: &Path, overwrite: bool) -> Result<()>;
}

/// The object-detection model applied to rendered page images.
pub trait LayoutDetector {
    /// Run inference on a rendered page.
    ///
    /// Returns every detection at or above `confidence_threshold`, with
    /// class labels from the model's lexicon.
    fn detect(&self, image: &DynamicImage, confidence_threshold: f32) -> Result<Vec<RawDetection>>;
}
