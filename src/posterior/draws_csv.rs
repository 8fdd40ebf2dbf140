use std::io::Read;
use std::path::Path;

use crate::errors::{AnalysisError, Result};

/// Bookkeeping columns of an `as_draws_df` export; they carry no parameter.
const BOOKKEEPING_COLUMNS: [&str; 3] = [".chain", ".iteration", ".draw"];

/// Read named draw columns from a CSV file.
pub fn read_draws_file(path: &Path) -> Result<Vec<(String, Vec<f64>)>> {
    let file = std::fs::File::open(path)
        .map_err(|e| AnalysisError::io("Failed to open posterior draws", path, e))?;
    read_draws(file, path)
}

/// Read named draw columns from CSV text. Lines starting with `#` are
/// skipped, as are the `.chain`, `.iteration` and `.draw` columns.
pub fn read_draws<R: Read>(reader: R, source: &Path) -> Result<Vec<(String, Vec<f64>)>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(|e| csv_error(source, &e))?.clone();
    let kept: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, name)| !BOOKKEEPING_COLUMNS.contains(name))
        .map(|(i, name)| (i, name.to_string()))
        .collect();
    if kept.is_empty() {
        return Err(AnalysisError::Csv {
            path: source.to_path_buf(),
            line: Some(1),
            message: "no parameter columns in header".into(),
        });
    }

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); kept.len()];
    for record in rdr.records() {
        let record = record.map_err(|e| csv_error(source, &e))?;
        let line = record.position().map(|p| p.line());
        for (column, (i, name)) in columns.iter_mut().zip(&kept) {
            let field = record.get(*i).unwrap_or_default();
            let value = field.parse::<f64>().map_err(|_| AnalysisError::Csv {
                path: source.to_path_buf(),
                line,
                message: format!("value '{field}' for parameter '{name}' is not a number"),
            })?;
            column.push(value);
        }
    }

    Ok(kept
        .into_iter()
        .map(|(_, name)| name)
        .zip(columns)
        .collect())
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

    #[test]
    fn test_reads_columns_skipping_bookkeeping_and_comments() {
        let text = indoc! {r#"
            # engine: betaviz-fit 1.0
            b_Intercept,b_phi_Intercept,"r_participant[p01,Intercept]",.chain,.iteration,.draw
            0.1,2.0,0.3,1,1,1
            0.2,2.5,-0.3,1,2,2
        "#};
        let columns = read_draws(text.as_bytes(), Path::new("draws.csv")).unwrap();
        let names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            ["b_Intercept", "b_phi_Intercept", "r_participant[p01,Intercept]"]
        );
        assert_eq!(columns[0].1, vec![0.1, 0.2]);
        assert_eq!(columns[2].1, vec![0.3, -0.3]);
    }

    #[test]
    fn test_non_numeric_value_reports_parameter() {
        let text = indoc! {"
            b_Intercept,b_phi_Intercept
            0.1,NA
        "};
        let err = read_draws(text.as_bytes(), Path::new("draws.csv")).unwrap_err();
        assert!(err.to_string().contains("'b_phi_Intercept'"));
    }
}
