//! Routing of raw detector output into pipeline inputs.
//!
//! The vision model reports class labels in image space; this module maps
//! labels onto element and caption kinds, rescales boxes into page space,
//! and drops detections the pipeline cannot use.

use crate::backend::{LayoutDetector, PdfBackend};
use crate::error::Result;
use crate::models::{create_element, BoundingBox, Element, ElementKind};

/// Element kind for a detector class label, when the label names an
/// extractable element.
pub fn element_kind_for_label(label: &str) -> Option<ElementKind> {
    match label.to_ascii_lowercase().as_str() {
        "figure" | "fig" | "image" | "picture" => Some(ElementKind::Figure),
        "table" => Some(ElementKind::Table),
        "equation" | "formula" | "isolate_formula" => Some(ElementKind::Equation),
        _ => None,
    }
}

/// Element kind a caption class label belongs to, when the label names a
/// caption.
pub fn caption_kind_for_label(label: &str) -> Option<ElementKind> {
    match label.to_ascii_lowercase().as_str() {
        "figure_caption" | "caption" => Some(ElementKind::Figure),
        "table_caption" => Some(ElementKind::Table),
        "formula_caption" => Some(ElementKind::Equation),
        _ => None,
    }
}

/// Detections of one page, split into elements and caption regions.
#[derive(Debug, Default)]
pub struct PageDetections {
    /// Candidate elements, with placeholder sequence numbers and filenames
    pub elements: Vec<Element>,
    /// Caption regions with the kind of element they label
    pub caption_boxes: Vec<(BoundingBox, ElementKind)>,
}

/// Render a page, run the detector on it, and route the detections.
///
/// Only element labels in `kinds` are kept; caption labels are always
/// kept so association evidence survives even when a kind is filtered.
/// Detector coordinates are rescaled from image space to page space, and
/// degenerate boxes (non-positive extent after rescale) are dropped with
/// a debug log. Element boxes carry `boundary_padding` from construction;
/// caption boxes are never cropped and carry none.
///
/// # Errors
///
/// Propagates rendering and inference failures; the orchestrator treats
/// them as per-page degradation.
pub fn detect_page<B: PdfBackend, D: LayoutDetector>(
    backend: &B,
    detector: &D,
    page_number: u32,
    kinds: &[ElementKind],
    confidence_threshold: f32,
    boundary_padding: f32,
) -> Result<PageDetections> {
    let (image, scale) = backend.render_page(page_number)?;
    let raw = detector.detect(&image, confidence_threshold)?;
    log::debug!("Detector returned {} boxes on page {}", raw.len(), page_number);

    let mut detections = PageDetections::default();
    for detection in raw {
        let x = (detection.x1 / scale).max(0.0);
        let y = (detection.y1 / scale).max(0.0);
        let width = detection.x2 / scale - x;
        let height = detection.y2 / scale - y;
        if width <= 0.0 || height <= 0.0 {
            log::debug!(
                "Dropping degenerate '{}' box on page {}",
                detection.label,
                page_number
            );
            continue;
        }

        if let Some(kind) = element_kind_for_label(&detection.label) {
            if !kinds.contains(&kind) {
                continue;
            }
            let bbox = BoundingBox::new(x, y, width, height, page_number, boundary_padding)?;
            let confidence = detection.confidence.clamp(0.0, 1.0);
            detections.elements.push(create_element(
                kind,
                bbox,
                page_number,
                1,
                confidence,
                String::new(),
            )?);
        } else if let Some(kind) = caption_kind_for_label(&detection.label) {
            let bbox = BoundingBox::new(x, y, width, height, page_number, 0.0)?;
            detections.caption_boxes.push((bbox, kind));
        } else {
            log::debug!(
                "Ignoring detection with unhandled label '{}' on page {}",
                detection.label,
                page_number
            );
        }
    }

    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RawDetection;
    use crate::models::{Document, Page};
    use image::DynamicImage;
    use std::path::Path;

    struct FakeBackend {
        document: Document,
        scale: f32,
    }

    impl FakeBackend {
        fn new(scale: f32) -> Self {
            Self {
                document: Document {
                    pages: vec![Page::new(1, 612.0, 792.0, 0).unwrap()],
                    page_count: 1,
                    ..Document::default()
                },
                scale,
            }
        }
    }

    impl PdfBackend for FakeBackend {
        fn document(&self) -> &Document {
            &self.document
        }

        fn render_page(&self, _page_number: u32) -> Result<(DynamicImage, f32)> {
            Ok((DynamicImage::new_rgb8(8, 8), self.scale))
        }

        fn extract_text(&self, _page_number: u32, _clip: &BoundingBox) -> Result<String> {
            Ok(String::new())
        }

        fn extract_page_text(&self, _page_number: u32) -> Result<String> {
            Ok(String::new())
        }

        fn crop_to_file(&self, _element: &Element, _path: &Path, _overwrite: bool) -> Result<()> {
            Ok(())
        }
    }

    struct FakeDetector {
        detections: Vec<RawDetection>,
    }

    impl LayoutDetector for FakeDetector {
        fn detect(
            &self,
            _image: &DynamicImage,
            _confidence_threshold: f32,
        ) -> Result<Vec<RawDetection>> {
            Ok(self.detections.clone())
        }
    }

    fn raw(label: &str, x1: f32, y1: f32, x2: f32, y2: f32) -> RawDetection {
        RawDetection {
            x1,
            y1,
            x2,
            y2,
            label: label.to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_label_routing() {
        assert_eq!(element_kind_for_label("Figure"), Some(ElementKind::Figure));
        assert_eq!(element_kind_for_label("picture"), Some(ElementKind::Figure));
        assert_eq!(element_kind_for_label("table"), Some(ElementKind::Table));
        assert_eq!(element_kind_for_label("isolate_formula"), Some(ElementKind::Equation));
        assert_eq!(element_kind_for_label("plain_text"), None);

        assert_eq!(caption_kind_for_label("figure_caption"), Some(ElementKind::Figure));
        assert_eq!(caption_kind_for_label("caption"), Some(ElementKind::Figure));
        assert_eq!(caption_kind_for_label("table_caption"), Some(ElementKind::Table));
        assert_eq!(caption_kind_for_label("formula_caption"), Some(ElementKind::Equation));
        assert_eq!(caption_kind_for_label("figure"), None);
    }

    #[test]
    fn test_detect_page_rescales_to_page_space() {
        let backend = FakeBackend::new(2.0);
        let detector = FakeDetector {
            detections: vec![raw("figure", 20.0, 40.0, 220.0, 240.0)],
        };

        let detections =
            detect_page(&backend, &detector, 1, &[ElementKind::Figure], 0.5, 0.0).unwrap();
        assert_eq!(detections.elements.len(), 1);
        let bbox = detections.elements[0].bounding_box;
        assert_eq!(bbox.x, 10.0);
        assert_eq!(bbox.y, 20.0);
        assert_eq!(bbox.width, 100.0);
        assert_eq!(bbox.height, 100.0);
    }

    #[test]
    fn test_detect_page_filters_unrequested_kinds_but_keeps_captions() {
        let backend = FakeBackend::new(1.0);
        let detector = FakeDetector {
            detections: vec![
                raw("figure", 0.0, 0.0, 100.0, 100.0),
                raw("table", 0.0, 200.0, 100.0, 300.0),
                raw("table_caption", 0.0, 310.0, 100.0, 330.0),
            ],
        };

        let detections =
            detect_page(&backend, &detector, 1, &[ElementKind::Figure], 0.5, 0.0).unwrap();
        assert_eq!(detections.elements.len(), 1);
        assert_eq!(detections.elements[0].kind, ElementKind::Figure);
        assert_eq!(detections.caption_boxes.len(), 1);
        assert_eq!(detections.caption_boxes[0].1, ElementKind::Table);
    }

    #[test]
    fn test_detect_page_drops_degenerate_boxes() {
        let backend = FakeBackend::new(1.0);
        let detector = FakeDetector {
            detections: vec![raw("figure", 100.0, 100.0, 100.0, 100.0)],
        };

        let detections =
            detect_page(&backend, &detector, 1, &[ElementKind::Figure], 0.5, 0.0).unwrap();
        assert!(detections.elements.is_empty());
    }

    #[test]
    fn test_detect_page_placeholder_fields() {
        let backend = FakeBackend::new(1.0);
        let detector = FakeDetector {
            detections: vec![raw("figure", 0.0, 0.0, 100.0, 100.0)],
        };

        let detections =
            detect_page(&backend, &detector, 1, &[ElementKind::Figure], 0.5, 0.0).unwrap();
        assert_eq!(detections.elements[0].sequence_number, 1);
        assert!(detections.elements[0].output_filename.is_empty());
    }

    #[test]
    fn test_detect_page_builds_boxes_with_padding() {
        let backend = FakeBackend::new(1.0);
        let detector = FakeDetector {
            detections: vec![
                raw("figure", 0.0, 0.0, 100.0, 100.0),
                raw("figure_caption", 0.0, 110.0, 100.0, 130.0),
            ],
        };

        let detections =
            detect_page(&backend, &detector, 1, &[ElementKind::Figure], 0.5, 7.5).unwrap();
        assert_eq!(detections.elements[0].bounding_box.padding, 7.5);
        // Caption regions are never cropped, so they take no padding.
        assert_eq!(detections.caption_boxes[0].0.padding, 0.0);
    }
}
