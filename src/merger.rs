//! Merging of multi-part detections into single logical elements.
//!
//! The detector frequently fragments one visual figure into several boxes
//! (sub-panels, inset axes, disjoint legend blocks). Two passes recombine
//! them: a geometric pass over raw detections, and a caption-driven pass
//! after association that catches fragments too far apart for geometry but
//! proven to belong together by a shared caption.

use std::collections::HashMap;

use crate::caption::Caption;
use crate::config::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_OVERLAP_THRESHOLD, DEFAULT_PROXIMITY_THRESHOLD};
use crate::error::Result;
use crate::geometry::{enclosing, iou, min_distance};
use crate::models::{create_element, Element, ElementKind};
use crate::utils::safe_float_cmp;

/// Merger for multi-part detections of the same kind on the same page.
#[derive(Debug, Clone)]
pub struct FigureMerger {
    /// Minimum IoU for two boxes to be considered overlapping
    pub overlap_threshold: f32,
    /// Maximum axis-aligned distance in points for two boxes to be close
    pub proximity_threshold: f32,
    /// Minimum confidence considered for merging
    pub min_confidence: f32,
}

impl Default for FigureMerger {
    fn default() -> Self {
        Self::new(
            DEFAULT_OVERLAP_THRESHOLD,
            DEFAULT_PROXIMITY_THRESHOLD,
            DEFAULT_CONFIDENCE_THRESHOLD,
        )
    }
}

impl FigureMerger {
    /// Create a merger with explicit thresholds.
    pub fn new(overlap_threshold: f32, proximity_threshold: f32, min_confidence: f32) -> Self {
        Self {
            overlap_threshold,
            proximity_threshold,
            min_confidence,
        }
    }

    /// Pass A: merge overlapping or closely-spaced elements per page and
    /// kind.
    ///
    /// Within each `(page, kind)` group, elements are processed in
    /// descending confidence order; each not-yet-consumed element greedily
    /// absorbs every remaining element that overlaps it
    /// (`iou >= overlap_threshold`) or lies within `proximity_threshold`.
    /// A merged group becomes one fresh element whose bounding box is the
    /// minimum enclosing rectangle and whose confidence is the group
    /// maximum. Groups of one pass through unchanged.
    pub fn merge_elements(&self, elements: Vec<Element>) -> Result<Vec<Element>> {
        if elements.is_empty() {
            return Ok(elements);
        }

        let mut by_page_kind: HashMap<(u32, ElementKind), Vec<Element>> = HashMap::new();
        for element in elements {
            by_page_kind
                .entry((element.page_number, element.kind))
                .or_default()
                .push(element);
        }

        let mut keys: Vec<(u32, ElementKind)> = by_page_kind.keys().copied().collect();
        keys.sort_unstable();

        let mut merged_elements = Vec::new();
        for key in keys {
            let group = by_page_kind.remove(&key).unwrap_or_default();
            let group_len = group.len();
            log::debug!("Merging {} {}(s) on page {}", group_len, key.1, key.0);

            let merged = self.merge_group(group)?;
            if merged.len() < group_len {
                log::info!(
                    "Merged {} -> {} {}(s) on page {}",
                    group_len,
                    merged.len(),
                    key.1,
                    key.0
                );
            }
            merged_elements.extend(merged);
        }

        Ok(merged_elements)
    }

    /// Pass B: merge elements of one kind and page that were associated
    /// with the identical caption (subfigures of one logical figure).
    ///
    /// The association map is collapsed so the shared caption maps to the
    /// single merged element. Elements without an association are left
    /// untouched.
    pub fn merge_by_shared_captions(
        &self,
        elements: Vec<Element>,
        mut associations: HashMap<String, Caption>,
    ) -> Result<(Vec<Element>, HashMap<String, Caption>)> {
        let mut by_page_kind: HashMap<(u32, ElementKind), Vec<Element>> = HashMap::new();
        for element in elements {
            by_page_kind
                .entry((element.page_number, element.kind))
                .or_default()
                .push(element);
        }

        let mut keys: Vec<(u32, ElementKind)> = by_page_kind.keys().copied().collect();
        keys.sort_unstable();

        let mut result = Vec::new();
        for key in keys {
            let group = by_page_kind.remove(&key).unwrap_or_default();

            // Bucket associated elements by caption identity; comparison is
            // by caption equality, not number alone.
            let mut buckets: Vec<(Caption, Vec<Element>)> = Vec::new();
            for element in group {
                let caption = match associations.get(&element.element_id) {
                    Some(caption) => caption.clone(),
                    None => {
                        result.push(element);
                        continue;
                    },
                };
                match buckets.iter_mut().find(|(c, _)| *c == caption) {
                    Some((_, members)) => members.push(element),
                    None => buckets.push((caption, vec![element])),
                }
            }

            for (caption, members) in buckets {
                if members.len() <= 1 {
                    result.extend(members);
                    continue;
                }

                log::info!(
                    "Merging {} subfigure(s) sharing caption {:?} on page {}",
                    members.len(),
                    caption.parsed_number,
                    key.0
                );
                for member in &members {
                    associations.remove(&member.element_id);
                }
                let merged = self.create_merged_element(&members)?;
                associations.insert(merged.element_id.clone(), caption);
                result.push(merged);
            }
        }

        Ok((result, associations))
    }

    fn merge_group(&self, elements: Vec<Element>) -> Result<Vec<Element>> {
        if elements.len() <= 1 {
            return Ok(elements);
        }

        let mut sorted = elements;
        sorted.sort_by(|a, b| safe_float_cmp(b.confidence_score, a.confidence_score));

        let mut used = vec![false; sorted.len()];
        let mut merged = Vec::new();

        for i in 0..sorted.len() {
            if used[i] {
                continue;
            }
            used[i] = true;

            let mut cluster = vec![&sorted[i]];
            for j in (i + 1)..sorted.len() {
                if used[j] {
                    continue;
                }
                if self.should_merge(&sorted[i], &sorted[j]) {
                    cluster.push(&sorted[j]);
                    used[j] = true;
                }
            }

            if cluster.len() > 1 {
                log::debug!(
                    "Merged {} boxes on page {} into single {}",
                    cluster.len(),
                    sorted[i].page_number,
                    sorted[i].kind
                );
                merged.push(self.create_merged_element_refs(&cluster)?);
            } else {
                merged.push(sorted[i].clone());
            }
        }

        Ok(merged)
    }

    fn should_merge(&self, a: &Element, b: &Element) -> bool {
        let overlap = iou(&a.bounding_box, &b.bounding_box);
        if overlap >= self.overlap_threshold {
            log::debug!("Merging due to overlap (IoU={:.2})", overlap);
            return true;
        }

        let distance = min_distance(&a.bounding_box, &b.bounding_box);
        if distance <= self.proximity_threshold {
            log::debug!("Merging due to proximity (distance={:.1})", distance);
            return true;
        }

        false
    }

    fn create_merged_element(&self, elements: &[Element]) -> Result<Element> {
        let refs: Vec<&Element> = elements.iter().collect();
        self.create_merged_element_refs(&refs)
    }

    fn create_merged_element_refs(&self, elements: &[&Element]) -> Result<Element> {
        let boxes: Vec<&crate::models::BoundingBox> =
            elements.iter().map(|e| &e.bounding_box).collect();
        let merged_bbox = enclosing(&boxes)?;

        let max_confidence = elements
            .iter()
            .map(|e| e.confidence_score)
            .fold(f32::NEG_INFINITY, f32::max);

        // A merge produces a fresh logical element with its own identity.
        create_element(
            elements[0].kind,
            merged_bbox,
            elements[0].page_number,
            elements[0].sequence_number,
            max_confidence,
            elements[0].output_filename.clone(),
        )
    }
}
