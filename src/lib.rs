//! Export diagram prototyping projects to paginated PDF.
//!
//! ```text
//! Project ──▶ ImagePool (one diagram per form, temp files)
//!         ──▶ build_blocks ──▶ paginate (Measurer) ──▶ pdf::render ──▶ file
//! ```

mod error;
mod fonts;
mod pdf;
mod text;

pub mod blocks;
pub mod config;
pub mod diagram;
pub mod images;
pub mod layout;
pub mod measure;
pub mod model;
pub mod project;

pub use config::{ExportConfig, ImageAlign, PageSize};
pub use error::Error;

use std::path::Path;
use std::time::Instant;

use crate::blocks::build_blocks;
use crate::diagram::{DiagramRenderer, SvgDiagramRenderer};
use crate::fonts::{FontSet, UsedChars};
use crate::images::ImagePool;
use crate::layout::paginate;
use crate::measure::DocumentMeasurer;
use crate::model::Project;

/// Read a project file and write its PDF export to `output`.
pub fn export_project_file(input: &Path, output: &Path, config: &ExportConfig) -> Result<(), Error> {
    let project = project::parse(input)?;
    export_to_pdf(&project, output, config)
}

/// Export with the built-in SVG diagram renderer.
pub fn export_to_pdf(project: &Project, output: &Path, config: &ExportConfig) -> Result<(), Error> {
    export_with_renderer(project, &SvgDiagramRenderer::default(), output, config)
}

/// Export using `renderer` to produce each form's diagram. The temporary
/// images live until the output file is written and are removed on every
/// path out of this function.
pub fn export_with_renderer(
    project: &Project,
    renderer: &dyn DiagramRenderer,
    output: &Path,
    config: &ExportConfig,
) -> Result<(), Error> {
    let t0 = Instant::now();
    let pool = ImagePool::generate(&project.forms, renderer)?;
    let t_images = t0.elapsed();

    let bytes = render_with_pool(project, &pool, config)?;
    let t_render = t0.elapsed();

    std::fs::write(output, &bytes).map_err(Error::Io)?;
    pool.close()?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: images={:.1}ms, layout+render={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_images.as_secs_f64() * 1000.0,
        (t_render - t_images).as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );
    Ok(())
}

/// Export to an in-memory PDF.
pub fn render_pdf(
    project: &Project,
    renderer: &dyn DiagramRenderer,
    config: &ExportConfig,
) -> Result<Vec<u8>, Error> {
    let pool = ImagePool::generate(&project.forms, renderer)?;
    let bytes = render_with_pool(project, &pool, config)?;
    pool.close()?;
    Ok(bytes)
}

fn render_with_pool(project: &Project, pool: &ImagePool, config: &ExportConfig) -> Result<Vec<u8>, Error> {
    let blocks = build_blocks(project, pool)?;

    let mut used_chars = UsedChars::new();
    for tb in blocks.iter().filter_map(|b| b.text()) {
        text::collect_used_chars(&tb.runs, &mut used_chars);
    }
    let fonts = FontSet::load(&config.font_family, &used_chars);

    let body = config.page_body();
    let measurer = DocumentMeasurer {
        fonts: &fonts,
        images: pool,
    };
    let layout = paginate(&blocks, &measurer, body);
    log::info!(
        "Paginated {} blocks onto {} pages ({:.1}x{:.1}pt body)",
        blocks.len(),
        layout.page_count,
        body.width,
        body.height
    );

    pdf::render(&blocks, &layout, &fonts, pool, config, &project.name)
}
