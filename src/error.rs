//! Error types for the extraction library.
//!
//! This module defines all error types that can occur during PDF element
//! extraction. Document-level failures (invalid, corrupted, or encrypted
//! files) are fatal and abort the run; page- and element-level failures are
//! caught by the orchestrator and degrade to warnings.

/// Result type alias for extraction library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during element extraction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File is not a valid PDF (missing, wrong format, or unreadable)
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// PDF structure is damaged or incomplete
    #[error("Corrupted PDF: {0}")]
    CorruptedPdf(String),

    /// PDF is password-protected
    #[error("Encrypted PDF: {0}")]
    EncryptedPdf(String),

    /// Extraction configuration has invalid values
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Bounding box violates its invariants
    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    /// Element violates its invariants
    #[error("Invalid element: {0}")]
    InvalidElement(String),

    /// Detector inference failed for a page
    #[error("Detection failed: {0}")]
    Detection(String),

    /// Text extraction failed for a page or region
    #[error("Text extraction failed: {0}")]
    TextExtraction(String),

    /// Cropping an element to an output file failed
    #[error("Crop failed: {0}")]
    Crop(String),

    /// Output file already exists and overwriting is disabled
    #[error("Output file already exists: {0}")]
    OutputExists(String),

    /// Extraction process encountered a fatal error
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
