use std::io::Write;

use super::{write_error, ReportRenderer};
use crate::analysis::StudyReport;
use crate::errors::Result;

/// Pretty-printed JSON of the full report.
pub struct JsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> ReportRenderer for JsonWriter<W> {
    fn render(&mut self, report: &StudyReport) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, report)?;
        writeln!(self.writer).map_err(write_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::terminal::tests::sample_report;

    #[test]
    fn test_json_contains_contrasts_and_provenance() {
        let mut buffer = Vec::new();
        JsonWriter::new(&mut buffer).render(&sample_report()).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["provenance"]["source"], "fitted");
        assert_eq!(value["baseline"], "none");
        assert_eq!(value["contrasts"][0]["quantity"], "mu");
        assert_eq!(value["contrasts"][0]["kind"], "baseline");
        assert_eq!(
            value["contrasts"][0]["comparisons"][0]["is_reference"],
            true
        );
        assert!(value["contrasts"][0]["comparisons"][0]["prob_positive"].is_null());
    }
}
