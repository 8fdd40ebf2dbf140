//! Raw trial records and the delimited-file loader.

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

use crate::errors::{AnalysisError, Result};
use crate::observability::set_current_file;

/// Columns every input file must provide.
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "participant",
    "scenario",
    "vis",
    "arrival",
    "trial",
    "expected_payoff",
    "optimal_payoff",
    "mu",
    "sigma",
    "nu",
    "tau",
];

/// One row of the experiment: a participant's response on one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTrial {
    pub participant: String,
    pub scenario: String,
    pub vis: String,
    pub arrival: String,
    pub trial: u32,
    pub expected_payoff: f64,
    pub optimal_payoff: f64,
    pub mu: f64,
    pub sigma: f64,
    pub nu: f64,
    pub tau: f64,
}

/// Load raw trials from a CSV file.
pub fn load_trials(path: &Path) -> Result<Vec<RawTrial>> {
    let _file = set_current_file(path);
    let file = std::fs::File::open(path)
        .map_err(|e| AnalysisError::io("Failed to open trial data", path, e))?;
    let trials = read_trials(file, path)?;
    log::info!("Loaded {} trial records from {}", trials.len(), path.display());
    Ok(trials)
}

/// Read raw trials from any reader; `source` is used in error messages.
pub fn read_trials<R: Read>(reader: R, source: &Path) -> Result<Vec<RawTrial>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(|e| csv_error(source, &e))?.clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == **col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AnalysisError::MissingColumns {
            path: source.to_path_buf(),
            columns: missing,
        });
    }

    rdr.deserialize::<RawTrial>()
        .map(|row| row.map_err(|e| csv_error(source, &e)))
        .collect()
}

fn csv_error(source: &Path, error: &csv::Error) -> AnalysisError {
    AnalysisError::Csv {
        path: source.to_path_buf(),
        line: error.position().map(|p| p.line()),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const SOURCE: &str = "trials.csv";

    #[test]
    fn test_reads_rows_and_ignores_extra_columns() {
        let data = indoc! {"
            participant,scenario,vis,arrival,trial,expected_payoff,optimal_payoff,mu,sigma,nu,tau,extra
            p01,s1,bars,early,1,40,80,10,0.2,0.5,5,x
            p01,s1,bars,early,2,80,80,10,0.2,0.5,5,y
        "};
        let trials = read_trials(data.as_bytes(), Path::new(SOURCE)).unwrap();
        assert_eq!(trials.len(), 2);
        assert_eq!(trials[0].participant, "p01");
        assert_eq!(trials[1].trial, 2);
        assert_eq!(trials[1].expected_payoff, 80.0);
    }

    #[test]
    fn test_missing_columns_are_all_reported() {
        let data = indoc! {"
            participant,scenario,vis,trial,expected_payoff,optimal_payoff,mu,sigma,nu
            p01,s1,bars,1,40,80,10,0.2,0.5
        "};
        let err = read_trials(data.as_bytes(), Path::new(SOURCE)).unwrap_err();
        match err {
            AnalysisError::MissingColumns { columns, .. } => {
                assert_eq!(columns, vec!["arrival".to_string(), "tau".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_row_reports_line() {
        let data = indoc! {"
            participant,scenario,vis,arrival,trial,expected_payoff,optimal_payoff,mu,sigma,nu,tau
            p01,s1,bars,early,1,40,80,10,0.2,0.5,5
            p01,s1,bars,early,two,40,80,10,0.2,0.5,5
        "};
        let err = read_trials(data.as_bytes(), Path::new(SOURCE)).unwrap_err();
        match err {
            AnalysisError::Csv { line, .. } => assert_eq!(line, Some(3)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_trials(Path::new("/nonexistent/trials.csv")).unwrap_err();
        assert_eq!(err.category(), "I/O");
    }
}
