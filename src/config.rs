//! Configuration for the extraction pipeline.

use crate::error::{Error, Result};
use crate::models::ElementKind;

/// Default minimum detector confidence for a detection to be kept.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Default minimum IoU for two same-kind boxes to merge geometrically.
pub const DEFAULT_OVERLAP_THRESHOLD: f32 = 0.3;

/// Default maximum axis-aligned distance (points) for two same-kind boxes
/// to merge geometrically.
pub const DEFAULT_PROXIMITY_THRESHOLD: f32 = 20.0;

/// Default maximum distance (points) for a caption to be associated with
/// an element.
pub const DEFAULT_MAX_CAPTION_DISTANCE: f32 = 100.0;

/// Extraction behavior configuration.
///
/// Validated eagerly via [`ExtractionConfig::validate`] before any
/// processing starts; invalid configurations are always fatal.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Element kinds to extract.
    pub element_kinds: Vec<ElementKind>,

    /// Directory extracted element files are written to.
    pub output_directory: String,

    /// Output filename pattern. Must contain both `{type}` and `{counter}`;
    /// `{counter}` is rendered zero-padded to two digits.
    pub naming_pattern: String,

    /// Extra margin in points applied around each element when cropping.
    pub boundary_padding: f32,

    /// Minimum detector confidence in [0, 1].
    pub confidence_threshold: f32,

    /// Minimum IoU for geometric merging of same-kind detections.
    pub overlap_threshold: f32,

    /// Maximum distance in points for geometric merging of same-kind
    /// detections.
    pub proximity_threshold: f32,

    /// Maximum distance in points for caption association.
    pub max_caption_distance: f32,

    /// Whether existing output files may be overwritten.
    pub overwrite_existing: bool,

    /// Process at most this many pages when set.
    pub max_pages: Option<u32>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionConfig {
    /// Create a configuration with the documented defaults: all three
    /// kinds, current directory output, `{type}_{counter}.pdf` naming,
    /// thresholds 0.5 / 0.3 / 20.0 / 100.0.
    pub fn new() -> Self {
        Self {
            element_kinds: ElementKind::all().to_vec(),
            output_directory: ".".to_string(),
            naming_pattern: "{type}_{counter}.pdf".to_string(),
            boundary_padding: 0.0,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
            proximity_threshold: DEFAULT_PROXIMITY_THRESHOLD,
            max_caption_distance: DEFAULT_MAX_CAPTION_DISTANCE,
            overwrite_existing: false,
            max_pages: None,
        }
    }

    /// Set the element kinds to extract.
    pub fn with_element_kinds(mut self, kinds: Vec<ElementKind>) -> Self {
        self.element_kinds = kinds;
        self
    }

    /// Set the output directory.
    pub fn with_output_directory(mut self, dir: impl Into<String>) -> Self {
        self.output_directory = dir.into();
        self
    }

    /// Set the output filename pattern.
    pub fn with_naming_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.naming_pattern = pattern.into();
        self
    }

    /// Set the crop padding in points.
    pub fn with_boundary_padding(mut self, padding: f32) -> Self {
        self.boundary_padding = padding;
        self
    }

    /// Set the minimum detector confidence.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set whether existing output files may be overwritten.
    pub fn with_overwrite_existing(mut self, overwrite: bool) -> Self {
        self.overwrite_existing = overwrite;
        self
    }

    /// Limit processing to the first `max_pages` pages.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Validate all configuration constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] describing the first violated
    /// constraint.
    pub fn validate(&self) -> Result<()> {
        if self.element_kinds.is_empty() {
            return Err(Error::Configuration("element kinds must not be empty".to_string()));
        }
        if !self.naming_pattern.contains("{type}") || !self.naming_pattern.contains("{counter}") {
            return Err(Error::Configuration(
                "naming pattern must contain {type} and {counter} placeholders".to_string(),
            ));
        }
        if self.boundary_padding < 0.0 {
            return Err(Error::Configuration("boundary padding must be non-negative".to_string()));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::Configuration(
                "confidence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.overlap_threshold) {
            return Err(Error::Configuration(
                "overlap threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.proximity_threshold < 0.0 {
            return Err(Error::Configuration(
                "proximity threshold must be non-negative".to_string(),
            ));
        }
        if self.max_caption_distance <= 0.0 {
            return Err(Error::Configuration(
                "max caption distance must be positive".to_string(),
            ));
        }
        if let Some(max_pages) = self.max_pages {
            if max_pages < 1 {
                return Err(Error::Configuration("max pages must be >= 1".to_string()));
            }
        }
        Ok(())
    }
}
