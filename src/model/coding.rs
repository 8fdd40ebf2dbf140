use serde::{Deserialize, Serialize};

use crate::errors::AnalysisError;

/// Treatment coding of the condition factor.
///
/// Levels are kept in sorted order; the reference level has no coefficient
/// of its own and is absorbed into the intercept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionCoding {
    levels: Vec<String>,
    reference: String,
}

impl ConditionCoding {
    /// Build a coding from observed levels. Without an explicit reference
    /// the first level in sorted order is used.
    pub fn from_levels<I, S>(levels: I, reference: Option<&str>) -> Result<Self, AnalysisError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut levels: Vec<String> = levels.into_iter().map(Into::into).collect();
        levels.sort();
        levels.dedup();

        let reference = match reference {
            Some(r) if levels.iter().any(|l| l == r) => r.to_string(),
            Some(r) => {
                return Err(AnalysisError::config(format!(
                    "reference condition '{r}' is not among the observed levels: {}",
                    levels.join(", ")
                )))
            }
            None => levels
                .first()
                .cloned()
                .ok_or_else(|| AnalysisError::config("no condition levels observed"))?,
        };

        Ok(Self { levels, reference })
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn contains(&self, level: &str) -> bool {
        self.levels.iter().any(|l| l == level)
    }

    pub fn is_reference(&self, level: &str) -> bool {
        self.reference == level
    }

    /// Levels that carry their own coefficients.
    pub fn non_reference_levels(&self) -> impl Iterator<Item = &str> {
        self.levels
            .iter()
            .map(String::as_str)
            .filter(move |l| *l != self.reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reference_is_first_sorted() {
        let coding = ConditionCoding::from_levels(["hops", "bars", "none", "bars"], None).unwrap();
        assert_eq!(coding.levels(), ["bars", "hops", "none"]);
        assert_eq!(coding.reference(), "bars");
        assert_eq!(coding.non_reference_levels().collect::<Vec<_>>(), ["hops", "none"]);
    }

    #[test]
    fn test_explicit_reference() {
        let coding = ConditionCoding::from_levels(["hops", "none"], Some("none")).unwrap();
        assert!(coding.is_reference("none"));
        assert!(!coding.is_reference("hops"));
    }

    #[test]
    fn test_unknown_reference_rejected() {
        let err = ConditionCoding::from_levels(["hops"], Some("dots")).unwrap_err();
        assert!(err.to_string().contains("'dots'"));
    }

    #[test]
    fn test_empty_levels_rejected() {
        assert!(ConditionCoding::from_levels(Vec::<String>::new(), None).is_err());
    }
}
