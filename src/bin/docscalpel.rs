//! DocScalpel command-line front end.
//!
//! Parses extraction options, validates the input PDF, and runs the
//! pipeline through [`docscalpel::extract_elements`], printing the result
//! as human-readable text or JSON. PDF rendering and the detection model
//! are pluggable; this build ships without an integration and reports
//! that, but the full option and formatting surface is wired up for any
//! [`docscalpel::PdfBackend`] / [`docscalpel::LayoutDetector`] pair.
//!
//! Usage:
//!   docscalpel paper.pdf --types figure,table --output extracted/
//!   docscalpel paper.pdf --confidence 0.6 --max-pages 10 --json

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use image::DynamicImage;

use docscalpel::models::{BoundingBox, Document, Element};
use docscalpel::{
    extract_elements, ElementKind, Error, ExtractionConfig, ExtractionResult, LayoutDetector,
    PdfBackend, Result, ValidationResult,
};

struct CliOptions {
    pdf_path: PathBuf,
    config: ExtractionConfig,
    json: bool,
}

fn print_usage() {
    eprintln!("Usage: docscalpel <pdf> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --types <list>           Comma-separated: figure,table,equation (default: all)");
    eprintln!("  --output <dir>           Output directory (default: current directory)");
    eprintln!("  --naming-pattern <pat>   Filename pattern with {{type}} and {{counter}}");
    eprintln!("  --padding <points>       Crop padding in points (default: 0)");
    eprintln!("  --confidence <0..1>      Minimum detection confidence (default: 0.5)");
    eprintln!("  --max-pages <n>          Process at most n pages");
    eprintln!("  --overwrite              Overwrite existing output files");
    eprintln!("  --json                   Print results as JSON");
    eprintln!("  --verbose, -v            Verbose logging");
}

fn parse_args() -> std::result::Result<CliOptions, String> {
    let args: Vec<String> = std::env::args().collect();
    let mut pdf_path: Option<PathBuf> = None;
    let mut config = ExtractionConfig::new();
    let mut json = false;
    let mut verbose = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--types" => {
                i += 1;
                let value = args.get(i).ok_or("--types requires a value")?;
                let mut kinds = Vec::new();
                for part in value.split(',') {
                    kinds.push(ElementKind::from_str(part).map_err(|e| e.to_string())?);
                }
                config = config.with_element_kinds(kinds);
            },
            "--output" => {
                i += 1;
                let value = args.get(i).ok_or("--output requires a value")?;
                config = config.with_output_directory(value.clone());
            },
            "--naming-pattern" => {
                i += 1;
                let value = args.get(i).ok_or("--naming-pattern requires a value")?;
                config = config.with_naming_pattern(value.clone());
            },
            "--padding" => {
                i += 1;
                let value = args.get(i).ok_or("--padding requires a value")?;
                let padding: f32 = value.parse().map_err(|_| "invalid --padding value")?;
                config = config.with_boundary_padding(padding);
            },
            "--confidence" => {
                i += 1;
                let value = args.get(i).ok_or("--confidence requires a value")?;
                let confidence: f32 = value.parse().map_err(|_| "invalid --confidence value")?;
                config = config.with_confidence_threshold(confidence);
            },
            "--max-pages" => {
                i += 1;
                let value = args.get(i).ok_or("--max-pages requires a value")?;
                let max_pages: u32 = value.parse().map_err(|_| "invalid --max-pages value")?;
                config = config.with_max_pages(max_pages);
            },
            "--overwrite" => {
                config = config.with_overwrite_existing(true);
            },
            "--json" => {
                json = true;
            },
            "--verbose" | "-v" => {
                verbose = true;
            },
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            },
            other if other.starts_with('-') => {
                return Err(format!("unknown option: {}", other));
            },
            other => {
                if pdf_path.is_some() {
                    return Err("only one input PDF may be given".to_string());
                }
                pdf_path = Some(PathBuf::from(other));
            },
        }
        i += 1;
    }

    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    let pdf_path = pdf_path.ok_or("missing input PDF path")?;
    Ok(CliOptions { pdf_path, config, json })
}

/// Check that a file looks like a loadable PDF without parsing it fully.
fn validate_pdf(path: &Path) -> ValidationResult {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            return ValidationResult {
                is_valid: false,
                error_message: Some(format!("cannot read {}: {}", path.display(), e)),
                page_count: None,
                is_encrypted: false,
            };
        },
    };

    if !bytes.starts_with(b"%PDF-") {
        return ValidationResult {
            is_valid: false,
            error_message: Some("file does not start with a PDF header".to_string()),
            page_count: None,
            is_encrypted: false,
        };
    }

    // A trailer /Encrypt entry means the document needs a password.
    let is_encrypted = bytes.windows(8).any(|w| w == b"/Encrypt");

    ValidationResult {
        is_valid: true,
        error_message: None,
        page_count: None,
        is_encrypted,
    }
}

/// Run the pipeline and format its result for printing.
fn execute<B: PdfBackend, D: LayoutDetector>(
    backend: &B,
    detector: &D,
    config: &ExtractionConfig,
    json: bool,
) -> Result<String> {
    let result = extract_elements(backend, detector, config)?;
    render_output(&result, json)
}

/// Format an extraction result as text or pretty-printed JSON.
fn render_output(result: &ExtractionResult, json: bool) -> Result<String> {
    if json {
        serde_json::to_string_pretty(result)
            .map_err(|e| Error::ExtractionFailed(format!("failed to serialize result: {}", e)))
    } else {
        Ok(format_text(result))
    }
}

fn format_text(result: &ExtractionResult) -> String {
    let mut out = String::new();
    out.push_str("Extraction Results\n");
    out.push_str("==================\n");
    out.push_str(&format!("Document: {}\n", result.document.file_path));
    out.push_str(&format!("Figures: {}\n", result.figure_count()));
    out.push_str(&format!("Tables: {}\n", result.table_count()));
    out.push_str(&format!("Equations: {}\n", result.equation_count()));
    out.push_str(&format!("Total: {}\n", result.total_elements()));

    if !result.elements.is_empty() {
        out.push_str(&format!("\nExtracted files ({}):\n", result.output_directory));
        for element in &result.elements {
            out.push_str(&format!(
                "  {} (page {}, confidence {:.2})\n",
                element.output_filename, element.page_number, element.confidence_score
            ));
        }
    }

    if !result.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for warning in &result.warnings {
            out.push_str(&format!("  - {}\n", warning));
        }
    }

    out.push_str(&format!("\nCompleted in {:.2}s\n", result.extraction_time_seconds));
    out
}

// Uninhabited placeholders: the build carries no rendering or model
// runtime, so no value of these types can exist. They give the extraction
// path a concrete type until an integration is linked in.
enum NullBackend {}
enum NullDetector {}

impl PdfBackend for NullBackend {
    fn document(&self) -> &Document {
        match *self {}
    }

    fn render_page(&self, _page_number: u32) -> Result<(DynamicImage, f32)> {
        match *self {}
    }

    fn extract_text(&self, _page_number: u32, _clip: &BoundingBox) -> Result<String> {
        match *self {}
    }

    fn extract_page_text(&self, _page_number: u32) -> Result<String> {
        match *self {}
    }

    fn crop_to_file(&self, _element: &Element, _path: &Path, _overwrite: bool) -> Result<()> {
        match *self {}
    }
}

impl LayoutDetector for NullDetector {
    fn detect(
        &self,
        _image: &DynamicImage,
        _confidence_threshold: f32,
    ) -> Result<Vec<docscalpel::RawDetection>> {
        match *self {}
    }
}

/// Open the document with whatever integration this build carries.
fn load_integration(_pdf_path: &Path) -> Option<(NullBackend, NullDetector)> {
    None
}

fn main() -> ExitCode {
    let options = match parse_args() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            return ExitCode::from(2);
        },
    };

    if let Err(e) = options.config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::from(2);
    }

    let validation = validate_pdf(&options.pdf_path);
    if !validation.is_valid {
        match validation.error_message {
            Some(message) => eprintln!("Error: {} is not a loadable PDF: {}", options.pdf_path.display(), message),
            None => eprintln!("Error: {} is not a loadable PDF", options.pdf_path.display()),
        }
        return ExitCode::from(1);
    }
    if validation.is_encrypted {
        eprintln!(
            "Error: {} is encrypted; decrypt it before extraction",
            options.pdf_path.display()
        );
        return ExitCode::from(1);
    }

    match load_integration(&options.pdf_path) {
        Some((backend, detector)) => {
            match execute(&backend, &detector, &options.config, options.json) {
                Ok(output) => {
                    println!("{}", output);
                    ExitCode::SUCCESS
                },
                Err(e) => {
                    eprintln!("Error: {}", e);
                    ExitCode::from(1)
                },
            }
        },
        None => {
            eprintln!("Error: no PDF rendering backend is compiled into this build.");
            eprintln!(
                "Link an integration implementing PdfBackend and LayoutDetector, \
                 or drive the pipeline through the library API."
            );
            ExitCode::from(1)
        },
    }
}
