//! Core data model for the extraction pipeline.
//!
//! All entities here are page- or document-scoped value objects. None of
//! them outlives one extraction run, and none is mutated in place: merge
//! and sequencing steps construct fresh values.

use serde::Serialize;

use crate::error::{Error, Result};

/// The kinds of elements the pipeline can extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// A figure, plot, diagram, or image
    Figure,
    /// A data table
    Table,
    /// A displayed equation
    Equation,
}

impl ElementKind {
    /// Stable lowercase name, used in filenames and output formatting.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Figure => "figure",
            ElementKind::Table => "table",
            ElementKind::Equation => "equation",
        }
    }

    /// All kinds, in canonical order.
    pub fn all() -> [ElementKind; 3] {
        [ElementKind::Figure, ElementKind::Table, ElementKind::Equation]
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ElementKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "figure" => Ok(ElementKind::Figure),
            "table" => Ok(ElementKind::Table),
            "equation" => Ok(ElementKind::Equation),
            other => Err(Error::Configuration(format!(
                "invalid element kind '{}' (valid: figure, table, equation)",
                other
            ))),
        }
    }
}

/// A 2D point in page space (PDF points).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

/// The rectangular region of an element on a page.
///
/// Coordinates are in page-space units (PDF points), with the origin at the
/// top-left corner. A box is immutable once constructed; transformations
/// (merging, padding, scaling) build new boxes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    /// X coordinate of the top-left corner
    pub x: f32,
    /// Y coordinate of the top-left corner
    pub y: f32,
    /// Width in points, always positive
    pub width: f32,
    /// Height in points, always positive
    pub height: f32,
    /// 1-indexed page number
    pub page_number: u32,
    /// Extra margin in points applied when cropping
    pub padding: f32,
}

impl BoundingBox {
    /// Create a new bounding box, validating its invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBoundingBox`] when coordinates are negative,
    /// width or height are not positive, the page number is zero, or the
    /// padding is negative.
    pub fn new(x: f32, y: f32, width: f32, height: f32, page_number: u32, padding: f32) -> Result<Self> {
        if x < 0.0 || y < 0.0 {
            return Err(Error::InvalidBoundingBox(
                "coordinates must be non-negative".to_string(),
            ));
        }
        if width <= 0.0 || height <= 0.0 {
            return Err(Error::InvalidBoundingBox(
                "width and height must be positive".to_string(),
            ));
        }
        if page_number < 1 {
            return Err(Error::InvalidBoundingBox("page number must be >= 1".to_string()));
        }
        if padding < 0.0 {
            return Err(Error::InvalidBoundingBox("padding must be non-negative".to_string()));
        }
        Ok(Self {
            x,
            y,
            width,
            height,
            page_number,
            padding,
        })
    }

    /// Right edge coordinate.
    pub fn x2(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge coordinate.
    pub fn y2(&self) -> f32 {
        self.y + self.height
    }

    /// Total area in square points.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Center point of the box.
    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }
}

/// A detected figure, table, or equation instance.
///
/// Detectors create elements with placeholder sequence numbers and empty
/// filenames; the merger and sequencer re-create them with final values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    /// Opaque unique token (UUID v4)
    pub element_id: String,
    /// Kind of the element
    pub kind: ElementKind,
    /// Region of the element on its page
    pub bounding_box: BoundingBox,
    /// 1-indexed page number
    pub page_number: u32,
    /// Final per-kind sequence number (>= 1)
    pub sequence_number: u32,
    /// Detector confidence in [0, 1]
    pub confidence_score: f32,
    /// Output filename, generated by the sequencer
    pub output_filename: String,
}

impl Element {
    /// Create a new element, validating its invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidElement`] when the confidence score is
    /// outside [0, 1] or the sequence or page number is zero.
    pub fn new(
        element_id: String,
        kind: ElementKind,
        bounding_box: BoundingBox,
        page_number: u32,
        sequence_number: u32,
        confidence_score: f32,
        output_filename: String,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence_score) {
            return Err(Error::InvalidElement(
                "confidence score must be between 0.0 and 1.0".to_string(),
            ));
        }
        if sequence_number < 1 {
            return Err(Error::InvalidElement("sequence number must be >= 1".to_string()));
        }
        if page_number < 1 {
            return Err(Error::InvalidElement("page number must be >= 1".to_string()));
        }
        Ok(Self {
            element_id,
            kind,
            bounding_box,
            page_number,
            sequence_number,
            confidence_score,
            output_filename,
        })
    }
}

/// Create an element with an auto-generated UUID identity.
pub fn create_element(
    kind: ElementKind,
    bounding_box: BoundingBox,
    page_number: u32,
    sequence_number: u32,
    confidence_score: f32,
    output_filename: String,
) -> Result<Element> {
    Element::new(
        uuid::Uuid::new_v4().to_string(),
        kind,
        bounding_box,
        page_number,
        sequence_number,
        confidence_score,
        output_filename,
    )
}

/// A single page within a PDF document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// 1-indexed page number
    pub page_number: u32,
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Rotation in degrees: 0, 90, 180, or 270
    pub rotation: u16,
}

impl Page {
    /// Create a new page descriptor, validating its invariants.
    pub fn new(page_number: u32, width: f32, height: f32, rotation: u16) -> Result<Self> {
        if page_number < 1 {
            return Err(Error::InvalidPdf("page number must be >= 1".to_string()));
        }
        if width <= 0.0 || height <= 0.0 {
            return Err(Error::InvalidPdf("page dimensions must be positive".to_string()));
        }
        if !matches!(rotation, 0 | 90 | 180 | 270) {
            return Err(Error::InvalidPdf("rotation must be 0, 90, 180, or 270".to_string()));
        }
        Ok(Self {
            page_number,
            width,
            height,
            rotation,
        })
    }
}

/// Metadata for the input PDF document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Document {
    /// Path to the source file
    pub file_path: String,
    /// Total page count of the file (may exceed `pages.len()` when a page
    /// limit was applied at load time)
    pub page_count: u32,
    /// Loaded pages, in order
    pub pages: Vec<Page>,
    /// Document metadata (title, author, ...)
    pub metadata: std::collections::HashMap<String, String>,
    /// File size in bytes
    pub file_size_bytes: u64,
    /// Whether the document is encrypted
    pub is_encrypted: bool,
}

/// Result of validating a PDF without fully loading it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    /// Whether the file is a loadable PDF
    pub is_valid: bool,
    /// Failure detail when `is_valid` is false
    pub error_message: Option<String>,
    /// Page count when it could be determined
    pub page_count: Option<u32>,
    /// Whether the file is encrypted
    pub is_encrypted: bool,
}

/// Outcome of one extraction run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// The processed document's metadata
    pub document: Document,
    /// Successfully extracted elements, in final reading order
    pub elements: Vec<Element>,
    /// Directory the output files were written to
    pub output_directory: String,
    /// Whether the run completed
    pub success: bool,
    /// Wall-clock duration of the run
    pub extraction_time_seconds: f64,
    /// Fatal-path error strings (empty on success)
    pub errors: Vec<String>,
    /// Per-page and per-element degradation warnings
    pub warnings: Vec<String>,
}

impl ExtractionResult {
    /// Count of figure elements.
    pub fn figure_count(&self) -> usize {
        self.count_kind(ElementKind::Figure)
    }

    /// Count of table elements.
    pub fn table_count(&self) -> usize {
        self.count_kind(ElementKind::Table)
    }

    /// Count of equation elements.
    pub fn equation_count(&self) -> usize {
        self.count_kind(ElementKind::Equation)
    }

    /// Total count of extracted elements.
    pub fn total_elements(&self) -> usize {
        self.elements.len()
    }

    fn count_kind(&self, kind: ElementKind) -> usize {
        self.elements.iter().filter(|e| e.kind == kind).count()
    }
}
