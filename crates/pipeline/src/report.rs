//! Plain-text report writer.
//!
//! One `name = value` line per submitted field, in submission order,
//! followed by a `Predicted: <label>` line.

use std::fmt::Write as _;

use sepal_core::capability::{CapabilityError, ReportWriter};

#[derive(Debug, Clone, Copy, Default)]
pub struct TextReportWriter;

impl TextReportWriter {
    pub fn new() -> Self {
        Self
    }
}

/// Line breaks inside a value would split its line in two.
fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// The report body shared by every writer: one line per entry, then the
/// label.
pub(crate) fn report_lines(entries: &[(String, String)], label: &str) -> Vec<String> {
    entries
        .iter()
        .map(|(name, value)| format!("{} = {}", single_line(name), single_line(value)))
        .chain(std::iter::once(format!("Predicted: {}", single_line(label))))
        .collect()
}

impl ReportWriter for TextReportWriter {
    fn render(&self, entries: &[(String, String)], label: &str) -> Result<Vec<u8>, CapabilityError> {
        let mut out = String::new();
        for line in report_lines(entries, label) {
            // Writing into a String cannot fail.
            let _ = writeln!(out, "{line}");
        }
        Ok(out.into_bytes())
    }

    fn extension(&self) -> &'static str {
        "txt"
    }
}
