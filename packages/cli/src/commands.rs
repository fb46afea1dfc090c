//! Subcommand implementations.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use zafra_cli_utils::{IndicatifProgress, MultiProgress, ProgressCallback};
use zafra_image::{ImagePipeline, OcrEngine, TesseractCli};
use zafra_layout::{LayoutError, ReportLayout, layout_by_id, load_layout_file};
use zafra_pdf::{GridDocument, PdfError, read_page_text, read_section_sheets, write_section_sheets};
use zafra_report_models::{IndicatorGroup, RawRow, SectionKind, write_groups_json};

use crate::LayoutArgs;
use crate::config::RunConfig;

type BoxError = Box<dyn std::error::Error>;

/// Picks the layout from `--layout-file`, `--layout`, or the config default.
pub fn resolve_layout(args: &LayoutArgs, config: &RunConfig) -> Result<ReportLayout, LayoutError> {
    let layout = match &args.layout_file {
        Some(path) => load_layout_file(path)?,
        None => layout_by_id(args.layout.as_deref().unwrap_or(&config.default_layout))?,
    };
    log::debug!("Using layout {} v{}", layout.id, layout.version);
    Ok(layout)
}

/// Writes groups as JSON to `output`, or to stdout.
pub fn write_output(groups: &[IndicatorGroup], output: Option<&Path>) -> Result<(), BoxError> {
    match output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            write_groups_json(groups, &mut writer)?;
            writeln!(writer)?;
            writer.flush()?;
            log::info!("Wrote {} groups to {}", groups.len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            write_groups_json(groups, &mut stdout)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

fn load_grid_page(
    file: &Path,
    page: Option<usize>,
    config: &RunConfig,
) -> Result<Vec<RawRow>, PdfError> {
    let document = GridDocument::load(file)?;
    let page = document.resolve_page(page, config.default_page);
    let rows = document.into_page(page)?;
    log::info!("Read {} rows from page {page} of {}", rows.len(), file.display());
    Ok(rows)
}

/// `zafra grid`
pub fn grid(
    file: &Path,
    page: Option<usize>,
    layout: &ReportLayout,
    config: &RunConfig,
) -> Result<Vec<IndicatorGroup>, PdfError> {
    let rows = load_grid_page(file, page, config)?;
    Ok(zafra_extract::extract_grid(&rows, layout))
}

/// `zafra pdf`
pub fn pdf(
    file: &Path,
    page: Option<usize>,
    layout: &ReportLayout,
    config: &RunConfig,
) -> Result<Vec<IndicatorGroup>, PdfError> {
    let text = read_page_text(file, page.unwrap_or(config.default_page))?;
    Ok(zafra_extract::extract_text(&text, layout))
}

/// `zafra split`: returns the sheets written.
pub fn split(
    file: &Path,
    page: Option<usize>,
    out_dir: &Path,
    layout: &ReportLayout,
    config: &RunConfig,
) -> Result<Vec<PathBuf>, PdfError> {
    let rows = load_grid_page(file, page, config)?;
    let sections = zafra_extract::segment(&rows, &layout.segmentation);

    let parts: Vec<(SectionKind, &[RawRow])> = SectionKind::ALL
        .iter()
        .map(|&kind| (kind, sections.get(kind).unwrap_or(&[])))
        .collect();

    write_section_sheets(out_dir, &rows, &parts)
}

/// `zafra sheets`
pub fn sheets(dir: &Path, layout: &ReportLayout) -> Result<Vec<IndicatorGroup>, PdfError> {
    let sheets = read_section_sheets(dir)?;
    if sheets.is_empty() {
        log::warn!("No section sheets found in {}", dir.display());
    }
    Ok(zafra_extract::extract_sheets(&sheets, layout))
}

/// Where a batch run writes the JSON for `image`.
fn json_path_for(image: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = image
        .file_stem()
        .map_or_else(|| "report".to_string(), |s| s.to_string_lossy().into_owned());
    let name = format!("{stem}.json");
    match output_dir {
        Some(dir) => dir.join(name),
        None => image.with_file_name(name),
    }
}

/// `zafra image`: returns the number of images that failed.
///
/// A single image without `--output-dir` is written to `output` or stdout.
/// Otherwise each image gets its own JSON file and failures are logged
/// without stopping the batch.
pub fn images(
    files: &[PathBuf],
    layout: &ReportLayout,
    config: &RunConfig,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    multi: &MultiProgress,
) -> Result<usize, BoxError> {
    let engine = TesseractCli::new()
        .with_binary(&config.tesseract)
        .with_language(&config.ocr_lang);
    let pipeline = ImagePipeline::new(layout, engine);

    if let ([file], None) = (files, output_dir) {
        let groups = pipeline.extract_file(file)?;
        write_output(&groups, output)?;
        return Ok(0);
    }

    let progress = IndicatifProgress::files_bar(multi, "Images", files.len() as u64);
    Ok(run_batch(&pipeline, files, output_dir, progress.as_ref())?)
}

fn run_batch<E: OcrEngine>(
    pipeline: &ImagePipeline<'_, E>,
    files: &[PathBuf],
    output_dir: Option<&Path>,
    progress: &dyn ProgressCallback,
) -> Result<usize, std::io::Error> {
    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
    }

    let mut failed = 0;
    for file in files {
        progress.set_message(file.display().to_string());
        let target = json_path_for(file, output_dir);

        let result = pipeline
            .extract_file(file)
            .map_err(BoxError::from)
            .and_then(|groups| write_output(&groups, Some(&target)));
        if let Err(e) = result {
            log::error!("Failed to process {}: {e}", file.display());
            failed += 1;
        }

        progress.inc(1);
    }

    progress.finish(format!("{} images, {failed} failed", files.len()));
    Ok(failed)
}
