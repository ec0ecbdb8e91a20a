//! One-page document rendering of the report.

use anyhow::{anyhow, Context, Result};
use printpdf::{BuiltinFont, Mm, PdfDocument};
use std::{fs, path::Path};
use tracing::info;

use crate::report::ReportDocument;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const LINE_HEIGHT_MM: f32 = 10.0;

pub fn summary_pdf_bytes(doc: &ReportDocument) -> Result<Vec<u8>> {
    let (pdf, page, layer) = PdfDocument::new(
        doc.title.as_str(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Summary",
    );
    let layer = pdf.get_page(page).get_layer(layer);
    let title_font = pdf
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| anyhow!("loading font: {}", e))?;
    let body_font = pdf
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow!("loading font: {}", e))?;

    let mut y = PAGE_HEIGHT_MM - MARGIN_MM;
    layer.use_text(doc.title.as_str(), 16.0, Mm(MARGIN_MM), Mm(y), &title_font);
    y -= LINE_HEIGHT_MM * 2.0;

    for line in doc.formatted_lines() {
        layer.use_text(line, 12.0, Mm(MARGIN_MM), Mm(y), &body_font);
        y -= LINE_HEIGHT_MM;
    }

    pdf.save_to_bytes().map_err(|e| anyhow!("rendering pdf: {}", e))
}

pub fn write_summary_pdf(doc: &ReportDocument, path: &Path) -> Result<()> {
    let bytes = summary_pdf_bytes(doc)?;
    fs::write(path, bytes).with_context(|| format!("Writing {}", path.display()))?;
    info!(path = %path.display(), "wrote summary pdf");
    Ok(())
}
