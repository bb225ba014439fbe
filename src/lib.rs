mod cascade;
mod catalog;
mod error;
mod inject;
pub mod model;
mod pptx;
mod store;
mod xml;

pub use cascade::{resolve_scheme_color, resolve_style};
pub use catalog::{
    LayoutRef, LayoutSignature, ResolutionPath, ResolvedLayout, build_layout_catalog,
    resolve_layout,
};
pub use error::Error;
pub use inject::{
    InjectOptions, InjectionReport, SlideBuilder, SlotFailure, inject_content, inject_content_with,
};
pub use pptx::{MasterPart, Package, Presentation, Relationship};
pub use store::{CatalogStore, SidecarStore, StoredCatalog, StoredSummary};

use std::path::Path;
use std::time::Instant;

use model::{GenerationRequest, LayoutCatalog, MasterStyles, ThemeInfo};

/// The document theme and the text styles of the primary master.
pub fn read_theme_and_master_styles(pres: &Presentation) -> (ThemeInfo, MasterStyles) {
    (
        pptx::theme::read_theme(pres),
        pptx::styles::read_master_styles(pres, 0),
    )
}

/// Build every slide of `request` on a copy of `template`.
///
/// Slots that fail are listed in the reports; any other failure aborts the
/// whole request and no document is returned.
pub fn generate(
    template: &Presentation,
    catalog: Option<&LayoutCatalog>,
    request: &GenerationRequest,
    options: InjectOptions,
) -> Result<(Presentation, Vec<InjectionReport>), Error> {
    if template.layout_count() == 0 {
        return Err(Error::NoLayouts);
    }
    let mut pres = template.clone();
    let mut reports = Vec::with_capacity(request.slides.len());
    for slide in &request.slides {
        let layout_ref = LayoutRef::Catalog {
            index: slide.layout_index,
            catalog,
        };
        reports.push(inject_content_with(&mut pres, layout_ref, slide, options)?);
    }
    Ok((pres, reports))
}

pub fn scan_template(input: &Path) -> Result<LayoutCatalog, Error> {
    let t0 = Instant::now();

    let pres = Presentation::open(input)?;
    let t_open = t0.elapsed();

    let mut catalog = build_layout_catalog(&pres)?;
    catalog.template_identity = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned());
    let t_total = t0.elapsed();

    log::info!(
        "Timing: open={:.1}ms, catalog={:.1}ms, total={:.1}ms ({} layouts)",
        t_open.as_secs_f64() * 1000.0,
        (t_total - t_open).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        catalog.layouts.len(),
    );

    Ok(catalog)
}

pub fn generate_pptx(
    template: &Path,
    catalog: Option<&LayoutCatalog>,
    request: &GenerationRequest,
    output: &Path,
) -> Result<Vec<InjectionReport>, Error> {
    let t0 = Instant::now();

    let pres = Presentation::open(template)?;
    let t_open = t0.elapsed();

    let (generated, reports) = generate(&pres, catalog, request, InjectOptions::default())?;
    let bytes = generated.to_bytes()?;
    let t_generate = t0.elapsed();

    std::fs::write(output, &bytes).map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: open={:.1}ms, generate={:.1}ms, write={:.1}ms, total={:.1}ms ({} slides, output {} bytes)",
        t_open.as_secs_f64() * 1000.0,
        (t_generate - t_open).as_secs_f64() * 1000.0,
        (t_total - t_generate).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        reports.len(),
        bytes.len(),
    );

    Ok(reports)
}
