//! Rendering a [`StudyReport`].
//!
//! Text reports (terminal tables or JSON) go to stdout or a file; charts are
//! written as SVG files into the figures directory.

pub mod json;
pub mod svg;
pub mod terminal;

pub use json::JsonWriter;
pub use svg::SvgRenderer;
pub use terminal::TerminalWriter;

use std::fs;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::Path;

use crate::analysis::StudyReport;
use crate::errors::{AnalysisError, Result};

/// Something that turns a report into output.
pub trait ReportRenderer {
    fn render(&mut self, report: &StudyReport) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

/// Write the report to `output_file`, or to stdout when absent.
///
/// Terminal output is colored only when written to a terminal.
pub fn output_report(
    report: &StudyReport,
    format: OutputFormat,
    output_file: Option<&Path>,
) -> Result<()> {
    match output_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .map_err(|e| AnalysisError::io("Failed to create output directory", parent, e))?;
            }
            let file = fs::File::create(path)
                .map_err(|e| AnalysisError::io("Failed to create report file", path, e))?;
            let mut writer = BufWriter::new(file);
            render_to(&mut writer, report, format, false)?;
            writer
                .flush()
                .map_err(|e| AnalysisError::io("Failed to write report", path, e))?;
            log::info!("Report written to {}", path.display());
            Ok(())
        }
        None => {
            let stdout = io::stdout();
            let color = stdout.is_terminal();
            render_to(stdout.lock(), report, format, color)
        }
    }
}

fn render_to<W: Write>(
    writer: W,
    report: &StudyReport,
    format: OutputFormat,
    color: bool,
) -> Result<()> {
    match format {
        OutputFormat::Json => JsonWriter::new(writer).render(report),
        OutputFormat::Terminal => TerminalWriter::new(writer).with_color(color).render(report),
    }
}

pub(crate) fn write_error(e: io::Error) -> AnalysisError {
    AnalysisError::Render(format!("failed to write report: {e}"))
}
