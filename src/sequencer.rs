//! Final ordering of elements: overlap resolution, sequence numbers, and
//! output filenames.
//!
//! Runs after merging and caption association. Overlap resolution removes
//! cross-kind duplicates (the detector occasionally reports the same
//! region as both a figure and a table); sequencing turns caption numbers
//! into per-kind sequence numbers and renders the filename pattern.

use std::collections::{BTreeMap, HashMap};

use crate::caption::Caption;
use crate::models::{Element, ElementKind};
use crate::utils::safe_float_cmp;

/// IoU at or above which two elements are considered the same region.
pub const OVERLAP_DEDUP_THRESHOLD: f32 = 0.5;

/// Remove elements that substantially overlap a higher-confidence element.
///
/// Elements of any kind compete: when two boxes on the same page overlap
/// with IoU at or above `iou_threshold`, only the higher-confidence one
/// survives. Returns the surviving elements together with one warning per
/// removal.
pub fn handle_overlaps(elements: Vec<Element>, iou_threshold: f32) -> (Vec<Element>, Vec<String>) {
    let mut warnings = Vec::new();
    if elements.len() < 2 {
        return (elements, warnings);
    }

    let mut candidates = elements;
    candidates.sort_by(|a, b| safe_float_cmp(b.confidence_score, a.confidence_score));

    let mut kept: Vec<Element> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let winner = kept
            .iter()
            .find(|k| crate::geometry::iou(&k.bounding_box, &candidate.bounding_box) >= iou_threshold);
        match winner {
            Some(winner) => {
                warnings.push(format!(
                    "Removed overlapping {} (confidence={:.2}) in favor of {} (confidence={:.2}) on page {}",
                    candidate.kind,
                    candidate.confidence_score,
                    winner.kind,
                    winner.confidence_score,
                    candidate.page_number
                ));
                log::info!("{}", warnings.last().map(String::as_str).unwrap_or_default());
            }
            None => kept.push(candidate),
        }
    }

    (kept, warnings)
}

/// Assign final per-kind sequence numbers and render output filenames.
///
/// Elements whose associated caption carries a parsed number take that
/// number as their sequence number; the rest are numbered sequentially
/// after the highest caption number, in reading order. Without any
/// numbered captions a kind is numbered 1..N in reading order.
///
/// # Errors
///
/// Returns an error if a rebuilt element fails validation, which only
/// happens for inputs that already violate element invariants.
pub fn assign_sequence_numbers_and_filenames(
    elements: Vec<Element>,
    associations: &HashMap<String, Caption>,
    naming_pattern: &str,
) -> crate::error::Result<Vec<Element>> {
    let mut by_kind: HashMap<ElementKind, Vec<Element>> = HashMap::new();
    for element in elements {
        by_kind.entry(element.kind).or_default().push(element);
    }

    let mut kinds: Vec<ElementKind> = by_kind.keys().copied().collect();
    kinds.sort();

    let mut result = Vec::new();
    for kind in kinds {
        let mut group = by_kind.remove(&kind).unwrap_or_default();
        group.sort_by(compare_reading_order);

        // Caption numbers claim their sequence slots first. A BTreeMap
        // keeps the numbered elements in caption order; a duplicate
        // caption number keeps only the last claimant, the earlier one
        // falls back to sequential numbering.
        let mut numbered: BTreeMap<u32, Element> = BTreeMap::new();
        let mut unnumbered: Vec<Element> = Vec::new();
        for element in group {
            match associations
                .get(&element.element_id)
                .and_then(|caption| caption.parsed_number)
            {
                Some(number) => {
                    if let Some(displaced) = numbered.insert(number, element) {
                        unnumbered.push(displaced);
                    }
                }
                None => unnumbered.push(element),
            }
        }

        let mut next_sequence = numbered.keys().next_back().copied().unwrap_or(0) + 1;
        unnumbered.sort_by(compare_reading_order);

        for (number, element) in numbered {
            result.push(finalize_element(element, number, naming_pattern)?);
        }
        for element in unnumbered {
            result.push(finalize_element(element, next_sequence, naming_pattern)?);
            next_sequence += 1;
        }
    }

    Ok(result)
}

/// Sort elements into document reading order: page, then top edge, then
/// left edge.
pub fn sort_elements(elements: &mut [Element]) {
    elements.sort_by(|a, b| {
        a.page_number
            .cmp(&b.page_number)
            .then(compare_reading_order(a, b))
    });
}

/// Render the filename pattern for one element. `{type}` becomes the kind
/// name, `{counter}` the sequence number zero-padded to two digits.
pub fn render_pattern(pattern: &str, kind: ElementKind, counter: u32) -> String {
    pattern
        .replace("{type}", kind.as_str())
        .replace("{counter}", &format!("{:02}", counter))
}

fn finalize_element(
    element: Element,
    sequence_number: u32,
    naming_pattern: &str,
) -> crate::error::Result<Element> {
    let output_filename = render_pattern(naming_pattern, element.kind, sequence_number);
    Element::new(
        element.element_id,
        element.kind,
        element.bounding_box,
        element.page_number,
        sequence_number,
        element.confidence_score,
        output_filename,
    )
}

fn compare_reading_order(a: &Element, b: &Element) -> std::cmp::Ordering {
    safe_float_cmp(a.bounding_box.y, b.bounding_box.y)
        .then(safe_float_cmp(a.bounding_box.x, b.bounding_box.x))
}
