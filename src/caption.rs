//! Caption detection, text extraction, and number parsing.
//!
//! Captions carry the numbering evidence the sequencer prefers over raw
//! reading order. The parser pulls text for each detected caption region
//! through the backend, parses the kind's label lexicon for an ordinal,
//! and falls back to page-wide searches when the narrow region misses the
//! numeral.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::backend::PdfBackend;
use crate::error::Result;
use crate::models::{BoundingBox, ElementKind};

/// Margin in points used when re-extracting text around a figure caption
/// whose immediate box yielded no parseable number.
const EXPANSION_MARGIN: f32 = 50.0;

lazy_static! {
    /// Figure label patterns, digit form first so "Fig. 6" beats "Fig. B".
    static ref FIGURE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:Figure|Fig\.?)\s*(\d+)").unwrap(),
        Regex::new(r"(?i)(?:Figure|Fig\.?)\s*([A-Z])\b").unwrap(),
    ];

    /// Table label patterns.
    static ref TABLE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:Table|Tbl\.?)\s*(\d+)").unwrap(),
        Regex::new(r"(?i)(?:Table|Tbl\.?)\s*([A-Z])\b").unwrap(),
    ];

    /// Equation label patterns (digits only).
    static ref EQUATION_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:Equation|Eq\.?)\s*(\d+)").unwrap(),
    ];
}

/// Compiled label patterns for a kind, in match-priority order.
fn patterns_for(kind: ElementKind) -> &'static [Regex] {
    match kind {
        ElementKind::Figure => &FIGURE_PATTERNS,
        ElementKind::Table => &TABLE_PATTERNS,
        ElementKind::Equation => &EQUATION_PATTERNS,
    }
}

/// The region a caption was detected in.
///
/// Synthetic captions are reconstructed placeholders ("this number exists
/// on this page") with no detected region at all.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptionRegion {
    /// A real detected caption region
    Real(BoundingBox),
    /// A reconstructed placeholder with no geometry
    Synthetic,
}

/// A caption (real or reconstructed) that labels and numbers an element.
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    /// Extracted or synthesized caption text
    pub text: String,
    /// Detected region, or none for synthetic captions
    pub region: CaptionRegion,
    /// 1-indexed page number
    pub page_number: u32,
    /// Kind of element this caption labels
    pub kind: ElementKind,
    /// Ordinal parsed from the label, when found
    pub parsed_number: Option<u32>,
}

impl Caption {
    /// Create a synthetic caption for a known number on a page.
    pub fn synthetic(kind: ElementKind, page_number: u32, number: u32, text: String) -> Self {
        Self {
            text,
            region: CaptionRegion::Synthetic,
            page_number,
            kind,
            parsed_number: Some(number),
        }
    }

    /// Whether this caption is a reconstructed placeholder.
    pub fn is_synthetic(&self) -> bool {
        matches!(self.region, CaptionRegion::Synthetic)
    }

    /// The detected region, when the caption has one.
    pub fn bounding_box(&self) -> Option<&BoundingBox> {
        match &self.region {
            CaptionRegion::Real(bbox) => Some(bbox),
            CaptionRegion::Synthetic => None,
        }
    }
}

/// Parser for caption text and caption numbers.
#[derive(Debug, Default)]
pub struct CaptionParser;

impl CaptionParser {
    /// Create a caption parser. The pattern tables are compiled once per
    /// process and shared.
    pub fn new() -> Self {
        Self
    }

    /// Parse the ordinal from a caption text for the given kind.
    ///
    /// Patterns are tried in declared order and the first match wins. A
    /// digit capture converts directly; a single-letter capture converts
    /// as A=1, B=2, ...
    ///
    /// # Examples
    ///
    /// ```
    /// use docscalpel::caption::CaptionParser;
    /// use docscalpel::models::ElementKind;
    ///
    /// let parser = CaptionParser::new();
    /// assert_eq!(parser.parse_number("Figure 7: loss curves", ElementKind::Figure), Some(7));
    /// assert_eq!(parser.parse_number("Fig. B", ElementKind::Figure), Some(2));
    /// assert_eq!(parser.parse_number("no label here", ElementKind::Figure), None);
    /// ```
    pub fn parse_number(&self, text: &str, kind: ElementKind) -> Option<u32> {
        for pattern in patterns_for(kind) {
            if let Some(captures) = pattern.captures(text) {
                let group = captures.get(1)?.as_str();
                if let Ok(number) = group.parse::<u32>() {
                    return Some(number);
                }
                let mut chars = group.chars();
                if let (Some(letter), None) = (chars.next(), chars.next()) {
                    if letter.is_ascii_alphabetic() {
                        return Some(letter.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
                    }
                }
                log::debug!("Could not convert '{}' to a caption number", group);
            }
        }
        None
    }

    /// Extract and parse captions for all detected caption regions on a
    /// page.
    ///
    /// A text-extraction failure for the page is logged and yields zero
    /// captions for that page rather than an error.
    pub fn extract_captions_from_page<B: PdfBackend>(
        &self,
        backend: &B,
        page_number: u32,
        caption_boxes: &[(BoundingBox, ElementKind)],
    ) -> Vec<Caption> {
        match self.try_extract_captions(backend, page_number, caption_boxes) {
            Ok(captions) => captions,
            Err(e) => {
                log::error!("Failed to extract captions from page {}: {}", page_number, e);
                Vec::new()
            },
        }
    }

    fn try_extract_captions<B: PdfBackend>(
        &self,
        backend: &B,
        page_number: u32,
        caption_boxes: &[(BoundingBox, ElementKind)],
    ) -> Result<Vec<Caption>> {
        let mut captions = Vec::new();

        for (bbox, kind) in caption_boxes {
            let mut text = backend.extract_text(page_number, bbox)?.trim().to_string();
            if text.is_empty() {
                log::debug!("No text found in caption bbox on page {}", page_number);
                continue;
            }

            let mut parsed_number = self.parse_number(&text, *kind);

            // The numeric label sometimes sits just outside the detected
            // caption region; retry with an expanded clip for figures.
            if parsed_number.is_none() && *kind == ElementKind::Figure {
                let expanded = expand_box(bbox, EXPANSION_MARGIN)?;
                let expanded_text = backend.extract_text(page_number, &expanded)?.trim().to_string();
                if let Some(number) = self.parse_number(&expanded_text, *kind) {
                    parsed_number = Some(number);
                    text = expanded_text;
                    log::debug!(
                        "Found caption number {} with expanded search on page {}",
                        number,
                        page_number
                    );
                }
            }

            log::debug!(
                "Extracted caption on page {}: '{:.50}' (number={:?})",
                page_number,
                text,
                parsed_number
            );
            captions.push(Caption {
                text,
                region: CaptionRegion::Real(*bbox),
                page_number,
                kind: *kind,
                parsed_number,
            });
        }

        // Page-wide fallback: figure captions that still lack a number
        // claim the lowest unclaimed figure number mentioned on the page.
        if captions
            .iter()
            .any(|c| c.parsed_number.is_none() && c.kind == ElementKind::Figure)
        {
            let full_text = backend.extract_page_text(page_number)?;
            let mut found_numbers = numbers_in_text(&full_text, ElementKind::Figure);
            found_numbers.sort_unstable();
            found_numbers.dedup();

            let mut used: HashSet<u32> = captions.iter().filter_map(|c| c.parsed_number).collect();
            for caption in &mut captions {
                if caption.parsed_number.is_some() || caption.kind != ElementKind::Figure {
                    continue;
                }
                if let Some(&number) = found_numbers.iter().find(|n| !used.contains(n)) {
                    caption.parsed_number = Some(number);
                    used.insert(number);
                    log::debug!(
                        "Assigned number {} to caption via full-page search on page {}",
                        number,
                        page_number
                    );
                }
            }
        }

        Ok(captions)
    }

    /// Search a page's full text for caption numbers in the contiguous
    /// range `[start, start + count)` that are not in `used`.
    ///
    /// Used when several elements collapsed onto one shared caption: the
    /// detector missed the other captions, but their numbers usually still
    /// appear in the page text. Returns the recovered numbers sorted and
    /// deduplicated; extraction failures log and return nothing.
    pub fn search_missing_numbers<B: PdfBackend>(
        &self,
        backend: &B,
        page_number: u32,
        kind: ElementKind,
        used: &HashSet<u32>,
        start: u32,
        count: usize,
    ) -> Vec<u32> {
        let text = match backend.extract_page_text(page_number) {
            Ok(text) => text,
            Err(e) => {
                log::error!("Failed to search for missing numbers on page {}: {}", page_number, e);
                return Vec::new();
            },
        };

        let end = start + count as u32;
        let mut missing: Vec<u32> = numbers_in_text(&text, kind)
            .into_iter()
            .filter(|n| (start..end).contains(n) && !used.contains(n))
            .collect();
        missing.sort_unstable();
        missing.dedup();
        missing
    }
}

/// Strict caption-format pattern for a specific number: the kind's label
/// followed by the number and a colon (`Figure 3:`). In-text references
/// like "see Figure 3" do not match.
pub fn caption_label_regex(kind: ElementKind, number: u32) -> Regex {
    let label = match kind {
        ElementKind::Figure => "Figure",
        ElementKind::Table => "Table",
        ElementKind::Equation => "Equation",
    };
    // The pattern pieces are fixed and the number is a plain integer, so
    // compilation cannot fail.
    Regex::new(&format!(r"(?i){}\s+{}\s*:", label, number)).unwrap()
}

/// All digit-form caption numbers of a kind mentioned in a text.
fn numbers_in_text(text: &str, kind: ElementKind) -> Vec<u32> {
    let mut numbers = Vec::new();
    for pattern in patterns_for(kind) {
        for captures in pattern.captures_iter(text) {
            if let Some(group) = captures.get(1) {
                if let Ok(number) = group.as_str().parse::<u32>() {
                    numbers.push(number);
                }
            }
        }
    }
    numbers
}

/// Expand a box by `margin` points in all directions, clamped to the page
/// origin.
fn expand_box(bbox: &BoundingBox, margin: f32) -> Result<BoundingBox> {
    let x = (bbox.x - margin).max(0.0);
    let y = (bbox.y - margin).max(0.0);
    BoundingBox::new(
        x,
        y,
        bbox.x2() + margin - x,
        bbox.y2() + margin - y,
        bbox.page_number,
        bbox.padding,
    )
}
