//! Human-readable report: run overview, final-trial estimates and contrast
//! tables.

use colored::*;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use std::io::Write;

use super::{write_error, ReportRenderer};
use crate::analysis::{
    Comparison, ContrastKind, ContrastSet, PosteriorSummary, StudyReport, REPORTED_QUANTITIES,
};
use crate::errors::Result;
use crate::posterior::Provenance;

pub struct TerminalWriter<W: Write> {
    writer: W,
    color: bool,
}

impl<W: Write> TerminalWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            color: false,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn heading(&self, text: &str) -> String {
        if self.color {
            text.bold().cyan().to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn write_overview(&mut self, report: &StudyReport) -> std::io::Result<()> {
        writeln!(self.writer, "{}", self.heading("Betaviz posterior summary"))?;
        writeln!(self.writer)?;
        writeln!(self.writer, "  Model:      {}", report.formula)?;
        writeln!(self.writer, "  Posterior:  {}", describe_provenance(&report.provenance))?;
        writeln!(self.writer, "  Draws:      {}", report.n_draws)?;
        writeln!(
            self.writer,
            "  Conditions: {} (reference {})",
            report.condition_levels.join(", "),
            report.reference_condition
        )?;
        let d = &report.derive;
        writeln!(
            self.writer,
            "  Rows:       {} retained of {} ({} excluded, {} adjusted at optimum, {} at zero)",
            d.retained_rows, d.input_rows, d.excluded_rows, d.adjusted_at_optimum, d.adjusted_at_zero
        )?;
        writeln!(self.writer)
    }

    fn write_final_trial(&mut self, report: &StudyReport) -> std::io::Result<()> {
        let trial = report
            .final_trial
            .first()
            .map(|r| r.trial_normalized)
            .unwrap_or(0.5);
        writeln!(
            self.writer,
            "{}",
            self.heading(&format!("Final trial estimates (trial_normalized = {trial})"))
        )?;

        let mut table = new_table();
        table.set_header(summary_header("Condition", &report.credible_levels, false));
        for row in &report.final_trial {
            for quantity in REPORTED_QUANTITIES {
                if let Some(summary) = row.get(quantity) {
                    let mut cells = vec![format!("{} ({})", row.condition, quantity)];
                    cells.extend(summary_cells(summary, &report.credible_levels));
                    table.add_row(cells);
                }
            }
        }
        writeln!(self.writer, "{table}")?;
        writeln!(self.writer)
    }

    fn write_contrast_set(&mut self, report: &StudyReport, set: &ContrastSet) -> std::io::Result<()> {
        let title = match (&set.kind, &set.reference) {
            (ContrastKind::Pairwise, _) | (_, None) => {
                format!("{} differences, all pairs", set.quantity)
            }
            (ContrastKind::Baseline, Some(r)) => {
                format!("{} differences against baseline '{r}'", set.quantity)
            }
            (ContrastKind::Best, Some(r)) => {
                format!("{} differences against best-performing '{r}'", set.quantity)
            }
        };
        writeln!(self.writer, "{}", self.heading(&title))?;

        let mut table = new_table();
        table.set_header(summary_header("Comparison", &report.credible_levels, true));
        for comparison in &set.comparisons {
            table.add_row(self.comparison_cells(comparison, &report.credible_levels));
        }
        writeln!(self.writer, "{table}")?;
        writeln!(self.writer)
    }

    fn comparison_cells(&self, comparison: &Comparison, levels: &[f64]) -> Vec<String> {
        let label = if comparison.is_reference {
            format!("{} {}", comparison.label(), self.dim("(reference)"))
        } else {
            self.signed_label(comparison)
        };
        let mut cells = vec![label];
        cells.extend(summary_cells(&comparison.summary, levels));
        cells.push(
            comparison
                .prob_positive
                .map(|p| format!("{p:.3}"))
                .unwrap_or_else(|| "-".to_string()),
        );
        cells
    }

    /// Label colored by whether the widest interval excludes zero.
    fn signed_label(&self, comparison: &Comparison) -> String {
        let label = comparison.label();
        if !self.color {
            return label;
        }
        match comparison.summary.outer() {
            Some(i) if i.lower > 0.0 => label.green().to_string(),
            Some(i) if i.upper < 0.0 => label.red().to_string(),
            _ => label,
        }
    }
}

impl<W: Write> ReportRenderer for TerminalWriter<W> {
    fn render(&mut self, report: &StudyReport) -> Result<()> {
        self.write_overview(report).map_err(write_error)?;
        self.write_final_trial(report).map_err(write_error)?;
        for set in &report.contrasts {
            self.write_contrast_set(report, set).map_err(write_error)?;
        }
        Ok(())
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn summary_header(first: &str, levels: &[f64], with_probability: bool) -> Vec<String> {
    let mut header = vec![first.to_string(), "Median".to_string()];
    header.extend(levels.iter().map(|l| format!("{}% CrI", percent(*l))));
    if with_probability {
        header.push("P(> 0)".to_string());
    }
    header
}

fn summary_cells(summary: &PosteriorSummary, levels: &[f64]) -> Vec<String> {
    let mut cells = vec![format!("{:.3}", summary.median)];
    cells.extend(levels.iter().map(|l| {
        summary
            .interval(*l)
            .map(|i| format!("[{:.3}, {:.3}]", i.lower, i.upper))
            .unwrap_or_else(|| "-".to_string())
    }));
    cells
}

fn percent(level: f64) -> String {
    let p = level * 100.0;
    if (p - p.round()).abs() < 1e-9 {
        format!("{}", p.round() as i64)
    } else {
        format!("{p:.1}")
    }
}

fn describe_provenance(provenance: &Provenance) -> String {
    match provenance {
        Provenance::Loaded { created_at } => format!("loaded from artifact fitted at {created_at}"),
        Provenance::Fitted { engine } => format!("fitted in this run with {engine}"),
        Provenance::StaleFallback { created_at, reason } => {
            format!("STALE artifact fitted at {created_at} (fit failed: {reason})")
        }
        Provenance::Imported { draws } => format!("imported from {}", draws.display()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::analysis::{contrast_sets, ConditionDraws, DrawSummarizer, Quantity, RowSummary};
    use crate::config::RandomEffectsMode;
    use crate::data::DeriveSummary;
    use std::collections::BTreeMap;

    /// Small report built from hand-written draws.
    pub(crate) fn sample_report() -> StudyReport {
        let summarizer = DrawSummarizer::new(&[0.5, 0.8, 0.95]).unwrap();
        let none = vec![0.40, 0.42, 0.38, 0.41, 0.39];
        let hops = vec![0.70, 0.66, 0.72, 0.69, 0.71];
        let draws = ConditionDraws::new(
            Quantity::Mean,
            vec![("hops".into(), hops.clone()), ("none".into(), none.clone())],
        )
        .unwrap();
        let contrasts = contrast_sets(&draws, "none", "hops", &summarizer).unwrap();

        let row = |condition: &str, values: &[f64]| RowSummary {
            condition: condition.to_string(),
            trial_normalized: 0.5,
            quantities: BTreeMap::from([(Quantity::Mean, summarizer.summarize(values).unwrap())]),
        };

        StudyReport {
            formula: "response_ratio_adjusted ~ vis * trial_normalized".into(),
            provenance: Provenance::Fitted {
                engine: "betaviz-fit".into(),
            },
            derive: DeriveSummary {
                input_rows: 12,
                excluded_rows: 2,
                retained_rows: 10,
                adjusted_at_optimum: 1,
                adjusted_at_zero: 0,
                max_trial: 39,
            },
            condition_levels: vec!["hops".into(), "none".into()],
            reference_condition: "hops".into(),
            credible_levels: summarizer.levels().to_vec(),
            random_effects: RandomEffectsMode::PopulationLevel,
            n_draws: 5,
            trajectory: vec![row("hops", &hops), row("none", &none)],
            final_trial: vec![row("hops", &hops), row("none", &none)],
            observed: Vec::new(),
            baseline: "none".into(),
            best: "hops".into(),
            contrasts,
        }
    }

    fn render(report: &StudyReport) -> String {
        let mut buffer = Vec::new();
        TerminalWriter::new(&mut buffer).render(report).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_overview_and_tables() {
        let text = render(&sample_report());
        assert!(text.contains("Betaviz posterior summary"));
        assert!(text.contains("fitted in this run with betaviz-fit"));
        assert!(text.contains("10 retained of 12"));
        assert!(text.contains("95% CrI"));
        assert!(text.contains("hops (mu)"));
        assert!(text.contains("mu differences against baseline 'none'"));
        assert!(text.contains("mu differences, all pairs"));
    }

    #[test]
    fn test_reference_row_marked_without_probability() {
        let text = render(&sample_report());
        let line = text
            .lines()
            .find(|l| l.contains("none - none"))
            .unwrap();
        assert!(line.contains("(reference)"));
        assert!(line.contains("0.000"));
    }

    #[test]
    fn test_plain_output_has_no_ansi_codes() {
        assert!(!render(&sample_report()).contains('\u{1b}'));
    }

    #[test]
    fn test_percent_labels() {
        assert_eq!(percent(0.95), "95");
        assert_eq!(percent(0.5), "50");
        assert_eq!(percent(0.975), "97.5");
    }
}
