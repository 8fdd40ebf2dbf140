//! Quantile functions of the four-parameter outcome distributions.
//!
//! Each trial describes its ground-truth outcome distribution with a
//! location (`mu`), scale (`sigma`), skewness (`nu`) and kurtosis (`tau`)
//! parameter. The quantiles reduce to normal and Student-t quantiles, which
//! come from `statrs`.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

/// Student-t degrees of freedom above which the normal limit is used.
const NORMAL_LIMIT_DF: f64 = 1e7;

/// Parameters of one outcome distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeParams {
    pub mu: f64,
    pub sigma: f64,
    pub nu: f64,
    pub tau: f64,
}

/// Supported four-parameter families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeFamily {
    /// Box-Cox t: median `mu`, coefficient of variation `sigma`, Box-Cox
    /// power `nu`, t degrees of freedom `tau`. Positive support.
    #[default]
    BoxCoxT,
    /// Johnson SU (original parameterization).
    JohnsonSu,
    /// Sinh-arcsinh (original parameterization).
    SinhArcsinh,
}

impl ShapeFamily {
    /// Value `x` with `P(X <= x) = p`.
    pub fn quantile(self, p: f64, params: ShapeParams) -> Result<f64, String> {
        if !(p > 0.0 && p < 1.0) {
            return Err(format!("probability must be in (0, 1), got {p}"));
        }
        check_params(self, params)?;

        let value = match self {
            Self::BoxCoxT => box_cox_t_quantile(p, params)?,
            Self::JohnsonSu => {
                let z = standard_normal()?.inverse_cdf(p);
                params.mu + params.sigma * ((z - params.nu) / params.tau).sinh()
            }
            Self::SinhArcsinh => {
                let z = standard_normal()?.inverse_cdf(p);
                params.mu + params.sigma * ((z.asinh() + params.nu) / params.tau).sinh()
            }
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(format!("quantile at p = {p} is not finite"))
        }
    }
}

fn check_params(family: ShapeFamily, params: ShapeParams) -> Result<(), String> {
    let ShapeParams { mu, sigma, nu, tau } = params;
    if ![mu, sigma, nu, tau].iter().all(|v| v.is_finite()) {
        return Err("shape parameters must be finite".into());
    }
    if sigma <= 0.0 {
        return Err(format!("sigma must be positive, got {sigma}"));
    }
    if tau <= 0.0 {
        return Err(format!("tau must be positive, got {tau}"));
    }
    if family == ShapeFamily::BoxCoxT && mu <= 0.0 {
        return Err(format!("mu must be positive for the Box-Cox t family, got {mu}"));
    }
    Ok(())
}

fn standard_normal() -> Result<Normal, String> {
    Normal::new(0.0, 1.0).map_err(|e| e.to_string())
}

/// Reference distribution of the Box-Cox t family.
enum Kernel {
    Normal(Normal),
    StudentsT(StudentsT),
}

impl Kernel {
    fn new(tau: f64) -> Result<Self, String> {
        if tau >= NORMAL_LIMIT_DF {
            standard_normal().map(Self::Normal)
        } else {
            StudentsT::new(0.0, 1.0, tau)
                .map(Self::StudentsT)
                .map_err(|e| e.to_string())
        }
    }

    fn cdf(&self, x: f64) -> f64 {
        match self {
            Self::Normal(d) => d.cdf(x),
            Self::StudentsT(d) => d.cdf(x),
        }
    }

    fn inverse_cdf(&self, p: f64) -> f64 {
        match self {
            Self::Normal(d) => d.inverse_cdf(p),
            Self::StudentsT(d) => d.inverse_cdf(p),
        }
    }
}

/// Box-Cox t quantile, truncated so the untransformed value stays positive.
fn box_cox_t_quantile(p: f64, params: ShapeParams) -> Result<f64, String> {
    let ShapeParams { mu, sigma, nu, tau } = params;
    let kernel = Kernel::new(tau)?;

    if nu == 0.0 {
        return Ok(mu * (sigma * kernel.inverse_cdf(p)).exp());
    }

    let bound = kernel.cdf(1.0 / (sigma * nu.abs()));
    let z = if nu < 0.0 {
        kernel.inverse_cdf(p * bound)
    } else {
        kernel.inverse_cdf(1.0 - (1.0 - p) * bound)
    };
    Ok(mu * (nu * sigma * z + 1.0).powf(1.0 / nu))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(mu: f64, sigma: f64, nu: f64, tau: f64) -> ShapeParams {
        ShapeParams { mu, sigma, nu, tau }
    }

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_box_cox_t_median_is_mu() {
        let value = ShapeFamily::BoxCoxT
            .quantile(0.5, params(20.0, 0.3, 0.0, 10.0))
            .unwrap();
        assert!(close(value, 20.0, 1e-9), "got {value}");
    }

    #[test]
    fn test_box_cox_t_log_normal_limit() {
        // nu = 0 with huge tau is log-normal: q(0.975) = mu * exp(sigma * 1.959964)
        let value = ShapeFamily::BoxCoxT
            .quantile(0.975, params(10.0, 0.5, 0.0, 1e9))
            .unwrap();
        let expected = 10.0 * (0.5f64 * 1.959_963_985).exp();
        assert!(close(value, expected, 1e-4), "got {value}, expected {expected}");
    }

    #[test]
    fn test_box_cox_t_nu_one_normal_limit() {
        // nu = 1 and large tau is a normal truncated far below zero:
        // q(p) ~= mu * (1 + sigma * z_p)
        let value = ShapeFamily::BoxCoxT
            .quantile(0.841_344_746, params(50.0, 0.1, 1.0, 1e9))
            .unwrap();
        assert!(close(value, 55.0, 1e-3), "got {value}");
    }

    #[test]
    fn test_johnson_su_symmetric_median() {
        let value = ShapeFamily::JohnsonSu
            .quantile(0.5, params(3.0, 2.0, 0.0, 1.5))
            .unwrap();
        assert!(close(value, 3.0, 1e-12));
    }

    #[test]
    fn test_sinh_arcsinh_normal_case() {
        // nu = 0, tau = 1 reduces to a normal with mean mu and sd sigma
        let value = ShapeFamily::SinhArcsinh
            .quantile(0.841_344_746, params(1.0, 2.0, 0.0, 1.0))
            .unwrap();
        assert!(close(value, 3.0, 1e-6), "got {value}");
    }

    #[test]
    fn test_quantiles_increase_with_p() {
        for family in [
            ShapeFamily::BoxCoxT,
            ShapeFamily::JohnsonSu,
            ShapeFamily::SinhArcsinh,
        ] {
            let p = params(30.0, 0.4, 0.6, 4.0);
            let low = family.quantile(0.15, p).unwrap();
            let mid = family.quantile(0.40, p).unwrap();
            let high = family.quantile(0.99, p).unwrap();
            assert!(low < mid && mid < high, "{family:?}: {low} {mid} {high}");
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let p = params(10.0, 0.2, 0.5, 5.0);
        assert!(ShapeFamily::BoxCoxT.quantile(0.0, p).is_err());
        assert!(ShapeFamily::BoxCoxT.quantile(1.0, p).is_err());
        assert!(ShapeFamily::BoxCoxT
            .quantile(0.5, params(10.0, -0.2, 0.5, 5.0))
            .is_err());
        assert!(ShapeFamily::BoxCoxT
            .quantile(0.5, params(-10.0, 0.2, 0.5, 5.0))
            .is_err());
        assert!(ShapeFamily::JohnsonSu
            .quantile(0.5, params(-10.0, 0.2, 0.5, 5.0))
            .is_ok());
    }
}
