//! Association of captions with detected elements.
//!
//! Produces the element-to-caption map the sequencer and subfigure merger
//! consume. Three strategies run in order: position-based matching for
//! pages dense in both elements and numbered captions, greedy
//! distance-based matching with a below-position preference, and an
//! index-wise pairing against synthetic captions for whatever is left.

use std::collections::HashMap;

use crate::caption::Caption;
use crate::config::DEFAULT_MAX_CAPTION_DISTANCE;
use crate::geometry::{is_below, vertical_gap};
use crate::models::{Element, ElementKind};
use crate::utils::safe_float_cmp;

/// Score penalty for a caption that overlaps or sits above its candidate
/// element. Captions are conventionally below their figure; anything else
/// is a weak signal.
const ABOVE_POSITION_PENALTY: f32 = 500.0;

/// Associates captions with elements.
#[derive(Debug, Clone)]
pub struct CaptionAssociator {
    /// Maximum distance in points for a caption to be considered at all
    pub max_distance: f32,
}

impl Default for CaptionAssociator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CAPTION_DISTANCE)
    }
}

impl CaptionAssociator {
    /// Create an associator with an explicit distance cutoff.
    pub fn new(max_distance: f32) -> Self {
        Self { max_distance }
    }

    /// Build the association map for a document's elements and captions.
    ///
    /// At most one caption per element; elements may remain unassociated.
    /// The result is deterministic for a fixed input set: all grouping is
    /// resolved through explicit position and number sorts.
    pub fn associate(&self, elements: &[Element], captions: &[Caption]) -> HashMap<String, Caption> {
        let mut associations: HashMap<String, Caption> = HashMap::new();

        let mut elements_by_group: HashMap<(u32, ElementKind), Vec<&Element>> = HashMap::new();
        for element in elements {
            elements_by_group
                .entry((element.page_number, element.kind))
                .or_default()
                .push(element);
        }

        let mut numbered_by_group: HashMap<(u32, ElementKind), Vec<&Caption>> = HashMap::new();
        for caption in captions {
            if caption.parsed_number.is_some() {
                numbered_by_group
                    .entry((caption.page_number, caption.kind))
                    .or_default()
                    .push(caption);
            }
        }

        // Step 1: position-based matching for pages with multiple elements
        // AND multiple numbered captions. A single caption with several
        // elements means subfigures; those go through distance matching
        // and the shared-caption merge instead.
        for (key, group_elements) in &elements_by_group {
            let group_captions = match numbered_by_group.get(key) {
                Some(captions) if captions.len() > 1 && group_elements.len() > 1 => captions,
                _ => continue,
            };

            let mut sorted_elements: Vec<&Element> = group_elements.clone();
            sorted_elements.sort_by(|a, b| reading_order(a, b));

            let mut sorted_captions: Vec<&Caption> = group_captions.clone();
            sorted_captions.sort_by_key(|c| c.parsed_number);

            // Extra elements beyond the caption count take the last
            // caption; they are likely subfigures of the final figure.
            for (i, element) in sorted_elements.iter().enumerate() {
                let caption = sorted_captions[i.min(sorted_captions.len() - 1)];
                associations.insert(element.element_id.clone(), caption.clone());
                log::debug!(
                    "Associated {} {} with caption (number={:?}) via position matching",
                    key.1,
                    element.element_id,
                    caption.parsed_number
                );
            }
        }

        // Step 2: greedy distance-based matching for the rest, over real
        // numbered captions only.
        for element in elements {
            if associations.contains_key(&element.element_id) {
                continue;
            }

            let mut best: Option<(&Caption, f32)> = None;
            for caption in captions {
                if caption.kind != element.kind
                    || caption.page_number != element.page_number
                    || caption.parsed_number.is_none()
                {
                    continue;
                }
                let bbox = match caption.bounding_box() {
                    Some(bbox) => bbox,
                    None => continue,
                };

                let distance = vertical_gap(&element.bounding_box, bbox).abs();
                if distance >= self.max_distance {
                    continue;
                }

                let score = if is_below(&element.bounding_box, bbox) {
                    distance
                } else {
                    distance + ABOVE_POSITION_PENALTY
                };

                if best.map_or(true, |(_, best_score)| score < best_score) {
                    best = Some((caption, score));
                }
            }

            if let Some((caption, _)) = best {
                associations.insert(element.element_id.clone(), caption.clone());
                log::debug!(
                    "Associated {} {} with caption (number={:?})",
                    element.kind,
                    element.element_id,
                    caption.parsed_number
                );
            }
        }

        // Step 3: synthetic caption fallback, paired index-wise per group.
        let mut synthetic_by_group: HashMap<(u32, ElementKind), Vec<&Caption>> = HashMap::new();
        for caption in captions {
            if caption.is_synthetic() {
                synthetic_by_group
                    .entry((caption.page_number, caption.kind))
                    .or_default()
                    .push(caption);
            }
        }

        if !synthetic_by_group.is_empty() {
            for (key, group_elements) in &elements_by_group {
                let synthetic = match synthetic_by_group.get(key) {
                    Some(captions) => captions,
                    None => continue,
                };

                let mut unassociated: Vec<&Element> = group_elements
                    .iter()
                    .copied()
                    .filter(|e| !associations.contains_key(&e.element_id))
                    .collect();
                unassociated.sort_by(|a, b| reading_order(a, b));

                let mut sorted_synthetic: Vec<&Caption> = synthetic.clone();
                sorted_synthetic.sort_by_key(|c| c.parsed_number);

                for (element, caption) in unassociated.iter().zip(sorted_synthetic.iter()) {
                    associations.insert(element.element_id.clone(), (*caption).clone());
                    log::info!(
                        "Associated {} {} with synthetic caption {:?} on page {}",
                        key.1,
                        element.element_id,
                        caption.parsed_number,
                        key.0
                    );
                }
            }
        }

        associations
    }
}

/// Top-to-bottom, left-to-right ordering of elements on a page.
fn reading_order(a: &Element, b: &Element) -> std::cmp::Ordering {
    safe_float_cmp(a.bounding_box.y, b.bounding_box.y)
        .then(safe_float_cmp(a.bounding_box.x, b.bounding_box.x))
}
