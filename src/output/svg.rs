//! SVG charts of the posterior.
//!
//! - `trajectory_<q>.svg`: one panel per condition with nested credible
//!   bands, the posterior median and (for `mu`) observed means
//! - `final_<q>.svg`: per-condition median and interval bars at the final
//!   trial
//! - `contrast_<q>_<kind>.svg`: one row per comparison with a zero line
//!
//! Interval bands are drawn widest first so narrower bands sit on top.

use plotters::coord::Shift;
use plotters::prelude::*;
use std::error::Error;
use std::path::{Path, PathBuf};

use super::ReportRenderer;
use crate::analysis::{
    ContrastSet, PosteriorSummary, Quantity, RowSummary, StudyReport, REPORTED_QUANTITIES,
};
use crate::data::ObservedPoint;
use crate::errors::{AnalysisError, Result};

type DrawResult<T = ()> = std::result::Result<T, Box<dyn Error>>;

const PANEL_SIZE: (u32, u32) = (420, 360);
const CAPTION_FONT: (&str, u32) = ("sans-serif", 18);

/// Writes every chart for a report into one directory.
pub struct SvgRenderer {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl SvgRenderer {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            written: Vec::new(),
        }
    }

    /// Files written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn into_written(self) -> Vec<PathBuf> {
        self.written
    }

    fn chart<F>(&mut self, file_name: &str, draw: F) -> Result<()>
    where
        F: FnOnce(&Path) -> DrawResult,
    {
        let path = self.dir.join(file_name);
        log::debug!("Writing {}", path.display());
        draw(&path).map_err(|e| AnalysisError::Render(format!("{}: {e}", path.display())))?;
        self.written.push(path);
        Ok(())
    }
}

impl ReportRenderer for SvgRenderer {
    fn render(&mut self, report: &StudyReport) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| AnalysisError::io("Failed to create figures directory", &self.dir, e))?;

        for quantity in REPORTED_QUANTITIES {
            let observed: &[ObservedPoint] = match quantity {
                Quantity::Mean => &report.observed,
                _ => &[],
            };
            self.chart(&format!("trajectory_{quantity}.svg"), |path| {
                draw_trajectory(path, report, quantity, observed)
            })?;
            self.chart(&format!("final_{quantity}.svg"), |path| {
                draw_final(path, report, quantity)
            })?;
        }
        for set in &report.contrasts {
            self.chart(&format!("contrast_{}_{}.svg", set.quantity, set.kind), |path| {
                draw_contrast(path, set)
            })?;
        }
        Ok(())
    }
}

fn draw_trajectory(
    path: &Path,
    report: &StudyReport,
    quantity: Quantity,
    observed: &[ObservedPoint],
) -> DrawResult {
    let levels = &report.condition_levels;
    let (grid_rows, grid_cols) = panel_layout(levels.len());
    let size = (
        PANEL_SIZE.0 * grid_cols as u32,
        PANEL_SIZE.1 * grid_rows as u32,
    );
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let summaries: Vec<&PosteriorSummary> = report
        .trajectory
        .iter()
        .filter_map(|r| r.get(quantity))
        .collect();
    let x_range = trial_range(&report.trajectory);
    let y_range = value_range(
        summaries
            .iter()
            .flat_map(|s| s.outer().map(|i| [i.lower, i.upper]).unwrap_or([s.median; 2]))
            .chain(observed.iter().map(|o| o.mean_ratio)),
    );

    let panels = root.split_evenly((grid_rows, grid_cols));
    for (i, (level, panel)) in levels.iter().zip(panels.iter()).enumerate() {
        let rows: Vec<(f64, &PosteriorSummary)> = report
            .trajectory
            .iter()
            .filter(|r| &r.condition == level)
            .filter_map(|r| r.get(quantity).map(|s| (r.trial_normalized, s)))
            .collect();
        let points: Vec<(f64, f64)> = observed
            .iter()
            .filter(|o| &o.condition == level)
            .map(|o| (o.trial_normalized, o.mean_ratio))
            .collect();
        draw_trajectory_panel(
            panel,
            level,
            quantity,
            &rows,
            &points,
            x_range,
            y_range,
            Palette99::pick(i),
        )?;
    }

    root.present()?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn draw_trajectory_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    level: &str,
    quantity: Quantity,
    rows: &[(f64, &PosteriorSummary)],
    observed: &[(f64, f64)],
    x_range: (f64, f64),
    y_range: (f64, f64),
    color: PaletteColor<Palette99>,
) -> DrawResult {
    let mut chart = ChartBuilder::on(area)
        .caption(level, CAPTION_FONT)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

    chart
        .configure_mesh()
        .x_desc("trial_normalized")
        .y_desc(quantity.label())
        .draw()?;

    let band_count = rows.first().map(|(_, s)| s.intervals.len()).unwrap_or(0);
    for band in (0..band_count).rev() {
        let alpha = 0.15 + 0.2 * (band_count - 1 - band) as f64 / band_count as f64;
        let upper = rows
            .iter()
            .filter_map(|(t, s)| s.intervals.get(band).map(|i| (*t, i.upper)));
        let lower = rows
            .iter()
            .rev()
            .filter_map(|(t, s)| s.intervals.get(band).map(|i| (*t, i.lower)));
        chart.draw_series(std::iter::once(Polygon::new(
            upper.chain(lower).collect::<Vec<_>>(),
            color.mix(alpha).filled(),
        )))?;
    }

    chart.draw_series(LineSeries::new(
        rows.iter().map(|(t, s)| (*t, s.median)),
        color.stroke_width(2),
    ))?;
    chart.draw_series(
        observed
            .iter()
            .map(|&(t, y)| Circle::new((t, y), 3, BLACK.filled())),
    )?;
    Ok(())
}

fn draw_final(path: &Path, report: &StudyReport, quantity: Quantity) -> DrawResult {
    let labels: Vec<String> = report.final_trial.iter().map(|r| r.condition.clone()).collect();
    let summaries: Vec<&PosteriorSummary> = report
        .final_trial
        .iter()
        .filter_map(|r| r.get(quantity))
        .collect();
    draw_interval_chart(
        path,
        &format!("{} at the final trial", quantity.label()),
        &labels,
        &summaries,
        &[],
        false,
    )
}

fn draw_contrast(path: &Path, set: &ContrastSet) -> DrawResult {
    let labels: Vec<String> = set.comparisons.iter().map(|c| c.label()).collect();
    let summaries: Vec<&PosteriorSummary> = set.comparisons.iter().map(|c| &c.summary).collect();
    let references: Vec<bool> = set.comparisons.iter().map(|c| c.is_reference).collect();
    let caption = match &set.reference {
        Some(reference) => format!("{} difference vs {reference} ({})", set.quantity, set.kind),
        None => format!("{} pairwise differences", set.quantity),
    };
    draw_interval_chart(path, &caption, &labels, &summaries, &references, true)
}

/// Median dots with nested interval bars, one category per row.
fn draw_interval_chart(
    path: &Path,
    caption: &str,
    labels: &[String],
    summaries: &[&PosteriorSummary],
    references: &[bool],
    zero_line: bool,
) -> DrawResult {
    let n = summaries.len().max(1);
    let height = 120 + 48 * n as u32;
    let root = SVGBackend::new(path, (720, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut range = value_range(
        summaries
            .iter()
            .flat_map(|s| s.outer().map(|i| [i.lower, i.upper]).unwrap_or([s.median; 2])),
    );
    if zero_line {
        range = (range.0.min(0.0), range.1.max(0.0));
    }

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, CAPTION_FONT)
        .margin(12)
        .x_label_area_size(30)
        .y_label_area_size(150)
        .build_cartesian_2d(range.0..range.1, (0..n as i32).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n)
        .y_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => usize::try_from(*i)
                .ok()
                .and_then(|i| labels.get(i))
                .cloned()
                .unwrap_or_default(),
            SegmentValue::Last => String::new(),
        })
        .draw()?;

    if zero_line {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(0.0, SegmentValue::Exact(0)), (0.0, SegmentValue::Last)],
            BLACK.mix(0.4),
        )))?;
    }

    for (i, summary) in summaries.iter().enumerate() {
        let y = SegmentValue::CenterOf(i as i32);
        let is_reference = references.get(i).copied().unwrap_or(false);
        let count = summary.intervals.len() as u32;
        for (k, interval) in summary.intervals.iter().enumerate().rev() {
            let width = 2 + 3 * (count - 1 - k as u32);
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(interval.lower, y.clone()), (interval.upper, y.clone())],
                BLUE.mix(0.35 + 0.2 * k as f64 / count.max(1) as f64).stroke_width(width),
            )))?;
        }
        let marker = if is_reference {
            BLACK.stroke_width(2)
        } else {
            BLACK.filled()
        };
        chart.draw_series(std::iter::once(Circle::new((summary.median, y), 4, marker)))?;
    }

    root.present()?;
    Ok(())
}

fn panel_layout(panels: usize) -> (usize, usize) {
    let cols = panels.clamp(1, 3);
    (panels.max(1).div_ceil(cols), cols)
}

fn trial_range(rows: &[RowSummary]) -> (f64, f64) {
    let range = rows.iter().fold(None, |acc: Option<(f64, f64)>, r| {
        let t = r.trial_normalized;
        Some(acc.map_or((t, t), |(lo, hi)| (lo.min(t), hi.max(t))))
    });
    match range {
        Some((lo, hi)) if hi > lo => (lo, hi),
        Some((t, _)) => (t - 0.5, t + 0.5),
        None => (-0.5, 0.5),
    }
}

/// Padded range covering every finite value.
fn value_range(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((hi - lo) * 0.05).max(0.01);
    (lo - pad, hi + pad)
}
