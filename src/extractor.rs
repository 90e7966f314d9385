//! The extraction pipeline orchestrator.
//!
//! Wires detection, merging, caption parsing, association, sequencing, and
//! cropping into one run. Failure handling follows a two-tier policy:
//! configuration and document problems abort the run, while page- and
//! element-level failures degrade to warnings so one bad page never sinks
//! a 300-page document.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Instant;

use crate::associate::CaptionAssociator;
use crate::backend::{LayoutDetector, PdfBackend};
use crate::caption::{caption_label_regex, Caption, CaptionParser};
use crate::config::ExtractionConfig;
use crate::detect::detect_page;
use crate::error::{Error, Result};
use crate::merger::FigureMerger;
use crate::models::{Element, ElementKind, ExtractionResult};
use crate::sequencer;

/// Run the full extraction pipeline over an opened document.
///
/// # Errors
///
/// Returns [`Error::Configuration`] for an invalid configuration and
/// [`Error::ExtractionFailed`] when the output directory cannot be
/// prepared. Per-page and per-element failures are reported through
/// [`ExtractionResult::warnings`] instead.
pub fn extract_elements<B: PdfBackend, D: LayoutDetector>(
    backend: &B,
    detector: &D,
    config: &ExtractionConfig,
) -> Result<ExtractionResult> {
    config.validate()?;
    let started = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    prepare_output_directory(&config.output_directory)?;

    let document = backend.document().clone();
    let page_limit = config
        .max_pages
        .map(|max| max as usize)
        .unwrap_or(usize::MAX);

    // Detection: one render + inference per page, degrading per page.
    let mut elements: Vec<Element> = Vec::new();
    let mut caption_boxes_by_page: Vec<(u32, Vec<(crate::models::BoundingBox, ElementKind)>)> =
        Vec::new();
    for page in document.pages.iter().take(page_limit) {
        match detect_page(
            backend,
            detector,
            page.page_number,
            &config.element_kinds,
            config.confidence_threshold,
            config.boundary_padding,
        ) {
            Ok(detections) => {
                elements.extend(detections.elements);
                if !detections.caption_boxes.is_empty() {
                    caption_boxes_by_page.push((page.page_number, detections.caption_boxes));
                }
            }
            Err(e) => {
                let warning = format!("Failed to process page {}: {}", page.page_number, e);
                log::warn!("{}", warning);
                warnings.push(warning);
            }
        }
    }
    log::info!(
        "Detected {} candidate element(s) across {} page(s)",
        elements.len(),
        document.pages.len().min(page_limit)
    );

    // Geometric merge of fragmented figures.
    let merger = FigureMerger::new(
        config.overlap_threshold,
        config.proximity_threshold,
        config.confidence_threshold,
    );
    if config.element_kinds.contains(&ElementKind::Figure) && elements.len() > 1 {
        elements = merger.merge_elements(elements)?;
    }

    // Cross-kind duplicate removal.
    if config.element_kinds.len() > 1 {
        let (kept, overlap_warnings) =
            sequencer::handle_overlaps(elements, sequencer::OVERLAP_DEDUP_THRESHOLD);
        elements = kept;
        warnings.extend(overlap_warnings);
    }

    // Caption parsing, page by page.
    let parser = CaptionParser::new();
    let mut captions: Vec<Caption> = Vec::new();
    for (page_number, boxes) in &caption_boxes_by_page {
        captions.extend(parser.extract_captions_from_page(backend, *page_number, boxes));
    }
    log::info!("Parsed {} caption(s)", captions.len());

    if config.element_kinds.contains(&ElementKind::Figure) {
        fill_caption_gaps(backend, &document.pages, &mut captions, page_limit);
    }

    // Association and shared-caption handling.
    let associator = CaptionAssociator::new(config.max_caption_distance);
    let mut associations = associator.associate(&elements, &captions);
    recover_shared_caption_numbers(backend, &parser, &elements, &captions, &mut associations);
    let (elements, associations) = merger.merge_by_shared_captions(elements, associations)?;

    // Final numbering and ordering.
    let mut elements = sequencer::assign_sequence_numbers_and_filenames(
        elements,
        &associations,
        &config.naming_pattern,
    )?;
    sequencer::sort_elements(&mut elements);

    // Crop each element to its own file, degrading per element.
    let output_dir = Path::new(&config.output_directory);
    let mut extracted: Vec<Element> = Vec::with_capacity(elements.len());
    for element in elements {
        let output_path = output_dir.join(&element.output_filename);
        match backend.crop_to_file(&element, &output_path, config.overwrite_existing) {
            Ok(()) => extracted.push(element),
            Err(Error::OutputExists(_)) => {
                let warning = format!("Skipping existing file: {}", output_path.display());
                log::warn!("{}", warning);
                warnings.push(warning);
            }
            Err(e) => {
                let warning = format!(
                    "Failed to extract {} {}: {}",
                    element.kind, element.sequence_number, e
                );
                log::warn!("{}", warning);
                warnings.push(warning);
            }
        }
    }

    log::info!(
        "Extraction finished: {} element(s) in {:.2}s",
        extracted.len(),
        started.elapsed().as_secs_f64()
    );
    Ok(ExtractionResult {
        document,
        elements: extracted,
        output_directory: config.output_directory.clone(),
        success: true,
        extraction_time_seconds: started.elapsed().as_secs_f64(),
        errors: Vec::new(),
        warnings,
    })
}

fn prepare_output_directory(directory: &str) -> Result<()> {
    std::fs::create_dir_all(directory)?;
    let metadata = std::fs::metadata(directory)?;
    if metadata.permissions().readonly() {
        return Err(Error::ExtractionFailed(format!(
            "output directory is not writable: {}",
            directory
        )));
    }
    Ok(())
}

/// Reconstruct figure captions for numbers missing from the detected range.
///
/// With captions numbered {1, 2, 4} the detector most likely missed the
/// caption for figure 3. Each gap number is searched for in strict
/// caption format (`Figure N:`) across the page texts; a match becomes a
/// synthetic caption on that page.
fn fill_caption_gaps<B: PdfBackend>(
    backend: &B,
    pages: &[crate::models::Page],
    captions: &mut Vec<Caption>,
    page_limit: usize,
) {
    let figure_numbers: HashSet<u32> = captions
        .iter()
        .filter(|c| c.kind == ElementKind::Figure)
        .filter_map(|c| c.parsed_number)
        .collect();
    let (min, max) = match (figure_numbers.iter().min(), figure_numbers.iter().max()) {
        (Some(&min), Some(&max)) if max > min => (min, max),
        _ => return,
    };

    for number in min..=max {
        if figure_numbers.contains(&number) {
            continue;
        }
        let pattern = caption_label_regex(ElementKind::Figure, number);
        for page in pages.iter().take(page_limit) {
            let text = match backend.extract_page_text(page.page_number) {
                Ok(text) => text,
                Err(e) => {
                    log::debug!(
                        "Skipping page {} in caption gap search: {}",
                        page.page_number,
                        e
                    );
                    continue;
                }
            };
            if let Some(found) = pattern.find(&text) {
                log::info!(
                    "Recovered missing caption for figure {} on page {}",
                    number,
                    page.page_number
                );
                captions.push(Caption::synthetic(
                    ElementKind::Figure,
                    page.page_number,
                    number,
                    found.as_str().to_string(),
                ));
                break;
            }
        }
    }
}

/// Split apart element groups that all matched the same numbered caption.
///
/// When k elements share the caption numbered n, captions n+1 .. n+k-1
/// were probably missed by the detector. Their numbers are searched for in
/// the page text; each recovered number is reassigned to one of the extra
/// elements (top to bottom) as a synthetic caption. Elements whose numbers
/// cannot be recovered keep the shared caption and are merged later.
fn recover_shared_caption_numbers<B: PdfBackend>(
    backend: &B,
    parser: &CaptionParser,
    elements: &[Element],
    captions: &[Caption],
    associations: &mut HashMap<String, Caption>,
) {
    // Bucket associated elements by caption identity per page and kind.
    let mut buckets: Vec<(Caption, Vec<&Element>)> = Vec::new();
    for element in elements {
        let caption = match associations.get(&element.element_id) {
            Some(caption) => caption,
            None => continue,
        };
        match buckets.iter_mut().find(|(c, _)| c == caption) {
            Some((_, members)) => members.push(element),
            None => buckets.push((caption.clone(), vec![element])),
        }
    }

    for (caption, mut members) in buckets {
        let number = match caption.parsed_number {
            Some(number) if members.len() > 1 => number,
            _ => continue,
        };

        let used: HashSet<u32> = captions
            .iter()
            .filter(|c| c.kind == caption.kind)
            .filter_map(|c| c.parsed_number)
            .collect();
        let recovered = parser.search_missing_numbers(
            backend,
            caption.page_number,
            caption.kind,
            &used,
            number,
            members.len(),
        );
        if recovered.is_empty() {
            continue;
        }

        members.sort_by(|a, b| {
            crate::utils::safe_float_cmp(a.bounding_box.y, b.bounding_box.y)
                .then(crate::utils::safe_float_cmp(a.bounding_box.x, b.bounding_box.x))
        });

        // The top element keeps the detected caption; recovered numbers go
        // to the extras in reading order.
        for (member, &recovered_number) in members.iter().skip(1).zip(recovered.iter()) {
            log::info!(
                "Reassigning {} {} to recovered caption number {}",
                caption.kind,
                member.element_id,
                recovered_number
            );
            let label = match caption.kind {
                ElementKind::Figure => "Figure",
                ElementKind::Table => "Table",
                ElementKind::Equation => "Equation",
            };
            associations.insert(
                member.element_id.clone(),
                Caption::synthetic(
                    caption.kind,
                    caption.page_number,
                    recovered_number,
                    format!("{} {}:", label, recovered_number),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::CaptionRegion;
    use crate::models::{create_element, BoundingBox, Document, Page};
    use image::DynamicImage;

    struct TextBackend {
        document: Document,
        page_texts: Vec<String>,
    }

    impl TextBackend {
        fn new(page_texts: Vec<String>) -> Self {
            let pages = (1..=page_texts.len() as u32)
                .map(|n| Page::new(n, 612.0, 792.0, 0).unwrap())
                .collect::<Vec<_>>();
            Self {
                document: Document {
                    page_count: pages.len() as u32,
                    pages,
                    ..Document::default()
                },
                page_texts,
            }
        }
    }

    impl PdfBackend for TextBackend {
        fn document(&self) -> &Document {
            &self.document
        }

        fn render_page(&self, _page_number: u32) -> Result<(DynamicImage, f32)> {
            Ok((DynamicImage::new_rgb8(8, 8), 1.0))
        }

        fn extract_text(&self, page_number: u32, _clip: &BoundingBox) -> Result<String> {
            self.extract_page_text(page_number)
        }

        fn extract_page_text(&self, page_number: u32) -> Result<String> {
            Ok(self.page_texts[(page_number - 1) as usize].clone())
        }

        fn crop_to_file(&self, _element: &Element, _path: &Path, _overwrite: bool) -> Result<()> {
            Ok(())
        }
    }

    fn real_caption(page: u32, y: f32, number: u32) -> Caption {
        Caption {
            text: format!("Figure {}: caption", number),
            region: CaptionRegion::Real(
                BoundingBox::new(0.0, y, 200.0, 20.0, page, 0.0).unwrap(),
            ),
            page_number: page,
            kind: ElementKind::Figure,
            parsed_number: Some(number),
        }
    }

    #[test]
    fn test_fill_caption_gaps_recovers_interior_number() {
        let backend = TextBackend::new(vec![
            "Figure 1: first. Figure 2: second.".to_string(),
            "Body text with Figure 3: third somewhere.".to_string(),
            "Figure 4: fourth.".to_string(),
        ]);
        let mut captions = vec![
            real_caption(1, 100.0, 1),
            real_caption(1, 400.0, 2),
            real_caption(3, 100.0, 4),
        ];

        fill_caption_gaps(&backend, &backend.document.pages, &mut captions, usize::MAX);

        let recovered = captions
            .iter()
            .find(|c| c.parsed_number == Some(3))
            .expect("gap number 3 recovered");
        assert!(recovered.is_synthetic());
        assert_eq!(recovered.page_number, 2);
    }

    #[test]
    fn test_fill_caption_gaps_requires_strict_format() {
        // "see Figure 2" is a reference, not a caption; no recovery.
        let backend = TextBackend::new(vec![
            "Figure 1: first. For details see Figure 2 below. Figure 3: third.".to_string(),
        ]);
        let mut captions = vec![real_caption(1, 100.0, 1), real_caption(1, 500.0, 3)];

        fill_caption_gaps(&backend, &backend.document.pages, &mut captions, usize::MAX);
        assert!(captions.iter().all(|c| c.parsed_number != Some(2)));
    }

    #[test]
    fn test_recover_shared_caption_numbers() {
        // Two figures share caption 2; "Figure 3:" appears in the page
        // text, so the lower figure is reassigned to number 3.
        let backend = TextBackend::new(vec![
            "Figure 2: top panel. Figure 3: bottom panel.".to_string(),
        ]);
        let parser = CaptionParser::new();

        let top = create_element(
            ElementKind::Figure,
            BoundingBox::new(0.0, 0.0, 200.0, 100.0, 1, 0.0).unwrap(),
            1,
            1,
            0.9,
            String::new(),
        )
        .unwrap();
        let bottom = create_element(
            ElementKind::Figure,
            BoundingBox::new(0.0, 300.0, 200.0, 100.0, 1, 0.0).unwrap(),
            1,
            1,
            0.9,
            String::new(),
        )
        .unwrap();

        let caption = real_caption(1, 110.0, 2);
        let captions = vec![caption.clone()];
        let mut associations = HashMap::new();
        associations.insert(top.element_id.clone(), caption.clone());
        associations.insert(bottom.element_id.clone(), caption.clone());

        let elements = vec![top.clone(), bottom.clone()];
        recover_shared_caption_numbers(&backend, &parser, &elements, &captions, &mut associations);

        assert_eq!(associations[&top.element_id].parsed_number, Some(2));
        let reassigned = &associations[&bottom.element_id];
        assert_eq!(reassigned.parsed_number, Some(3));
        assert!(reassigned.is_synthetic());
    }

    #[test]
    fn test_shared_caption_left_intact_when_nothing_recovered() {
        let backend = TextBackend::new(vec!["Figure 2: two panels.".to_string()]);
        let parser = CaptionParser::new();

        let a = create_element(
            ElementKind::Figure,
            BoundingBox::new(0.0, 0.0, 80.0, 100.0, 1, 0.0).unwrap(),
            1,
            1,
            0.9,
            String::new(),
        )
        .unwrap();
        let b = create_element(
            ElementKind::Figure,
            BoundingBox::new(120.0, 0.0, 80.0, 100.0, 1, 0.0).unwrap(),
            1,
            1,
            0.9,
            String::new(),
        )
        .unwrap();

        let caption = real_caption(1, 110.0, 2);
        let captions = vec![caption.clone()];
        let mut associations = HashMap::new();
        associations.insert(a.element_id.clone(), caption.clone());
        associations.insert(b.element_id.clone(), caption.clone());

        let elements = vec![a.clone(), b.clone()];
        recover_shared_caption_numbers(&backend, &parser, &elements, &captions, &mut associations);

        assert_eq!(associations[&a.element_id], caption);
        assert_eq!(associations[&b.element_id], caption);
    }

    #[test]
    fn test_invalid_config_rejected_before_any_work() {
        struct PanicDetector;
        impl LayoutDetector for PanicDetector {
            fn detect(
                &self,
                _image: &DynamicImage,
                _confidence_threshold: f32,
            ) -> Result<Vec<crate::backend::RawDetection>> {
                panic!("detector must not run for invalid config");
            }
        }

        let backend = TextBackend::new(vec![String::new()]);
        let config = ExtractionConfig::new().with_element_kinds(vec![]);
        let result = extract_elements(&backend, &PanicDetector, &config);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
