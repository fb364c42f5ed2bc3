//! PDF report writer.
//!
//! Same body as the text report, set in Helvetica on A4 pages, one line
//! per field. Long submissions continue on further pages.

use printpdf::{BuiltinFont, Mm, PdfDocument};
use sepal_core::capability::{CapabilityError, ReportWriter};

use crate::report::report_lines;

const DOCUMENT_TITLE: &str = "Prediction report";
const LAYER_NAME: &str = "Report";

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfReportWriter;

impl PdfReportWriter {
    pub fn new() -> Self {
        Self
    }
}

fn pdf_error(err: impl std::fmt::Display) -> CapabilityError {
    CapabilityError::Unavailable(format!("PDF rendering failed: {err}"))
}

impl ReportWriter for PdfReportWriter {
    fn render(&self, entries: &[(String, String)], label: &str) -> Result<Vec<u8>, CapabilityError> {
        // A4 portrait, 20 mm margins, 7 mm line pitch.
        let (width, height) = (Mm(210.0), Mm(297.0));
        let (doc, page, layer) = PdfDocument::new(DOCUMENT_TITLE, width, height, LAYER_NAME);
        let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;

        let mut current = doc.get_page(page).get_layer(layer);
        let mut y = 277.0;
        for line in report_lines(entries, label) {
            if y < 20.0 {
                let (page, layer) = doc.add_page(width, height, LAYER_NAME);
                current = doc.get_page(page).get_layer(layer);
                y = 277.0;
            }
            current.use_text(line, 12.0, Mm(20.0), Mm(y), &font);
            y -= 7.0;
        }

        doc.save_to_bytes().map_err(pdf_error)
    }

    fn extension(&self) -> &'static str {
        "pdf"
    }
}
