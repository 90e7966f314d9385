// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::match_like_matches_macro)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # DocScalpel
//!
//! Extraction of figures, tables, and equations from PDF documents as
//! standalone PDF files.
//!
//! ## Pipeline
//!
//! - **Detection**: a layout model finds element and caption regions on
//!   rendered pages; boxes are rescaled into page space
//! - **Merging**: fragmented detections are recombined geometrically, and
//!   again after association when fragments share a caption
//! - **Captions**: caption text is parsed for `Figure N` / `Table N` /
//!   `Equation N` ordinals, with page-wide fallbacks and gap recovery for
//!   numbers the detector missed
//! - **Association**: each element is matched with at most one caption by
//!   position and distance
//! - **Sequencing**: caption numbers become per-kind sequence numbers and
//!   output filenames; remaining elements are numbered in reading order
//! - **Cropping**: each element is saved to its own single-page PDF
//!
//! PDF access and the detection model sit behind the [`PdfBackend`] and
//! [`LayoutDetector`] traits; the pipeline itself is pure geometry and
//! text reasoning.
//!
//! ## Quick Start
//!
//! ```ignore
//! use docscalpel::{extract_elements, ExtractionConfig, ElementKind};
//!
//! # fn main() -> docscalpel::Result<()> {
//! # let backend = unimplemented!();
//! # let detector = unimplemented!();
//! let config = ExtractionConfig::new()
//!     .with_element_kinds(vec![ElementKind::Figure, ElementKind::Table])
//!     .with_output_directory("extracted");
//!
//! let result = extract_elements(&backend, &detector, &config)?;
//! println!("Extracted {} elements", result.total_elements());
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Core data model
pub mod models;

// Geometry kernel
pub mod geometry;

// Configuration
pub mod config;

// Collaborator interfaces (PDF access, layout detection)
pub mod backend;

// Detection routing
pub mod detect;

// Caption parsing
pub mod caption;

// Multi-part element merging
pub mod merger;

// Caption association
pub mod associate;

// Overlap handling, sequencing, and naming
pub mod sequencer;

// Pipeline orchestration
pub mod extractor;

// Re-exports
pub use associate::CaptionAssociator;
pub use backend::{LayoutDetector, PdfBackend, RawDetection};
pub use caption::{Caption, CaptionParser, CaptionRegion};
pub use config::ExtractionConfig;
pub use error::{Error, Result};
pub use extractor::extract_elements;
pub use merger::FigureMerger;
pub use models::{
    BoundingBox, Document, Element, ElementKind, ExtractionResult, Page, ValidationResult,
};

// Internal utilities
pub(crate) mod utils {
    //! Internal utility functions for the library.

    use std::cmp::Ordering;

    /// Safely compare two floating point numbers, handling NaN cases.
    ///
    /// NaN values are treated as equal to each other and greater than all
    /// other values, so sorting never panics on NaN.
    #[inline]
    pub fn safe_float_cmp(a: f32, b: f32) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater, // NaN > all numbers
            (false, true) => Ordering::Less,    // all numbers < NaN
            (false, false) => {
                // Both are normal numbers, safe to unwrap
                a.partial_cmp(&b).unwrap()
            },
        }
    }

}

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
