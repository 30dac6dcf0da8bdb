//! Hedonic price regression.
//!
//! Fits `ln(price) ~ 1 + mileage + mileage² + age + market dummies` by
//! ordinary least squares. The quadratic mileage term lets depreciation
//! flatten out at high mileage. One market (the first in sorted order) is the
//! reference; every other market gets a 0/1 indicator whose coefficient β
//! translates into a price premium of `exp(β) − 1`.
//!
//! The design matrix is column-equilibrated before its SVD so that the
//! mileage² column (~1e10) does not swamp the rank test.

use crate::analysis::stats;
use crate::analysis::{FitResult, Unavailable};
use crate::domain::Listing;
use chrono::Datelike;
use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use std::collections::BTreeSet;

pub const MIN_OBSERVATIONS: usize = 10;
pub const MIN_MARKETS: usize = 2;

/// Relative singular value below which the design counts as rank deficient.
const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
    pub ci_low: f64,
    pub ci_high: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub n_obs: usize,
    pub df_model: usize,
    pub df_resid: usize,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    pub f_p_value: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub durbin_watson: f64,
    pub omnibus: f64,
    pub omnibus_p: f64,
    pub jarque_bera: f64,
    pub jarque_bera_p: f64,
    pub skew: f64,
    pub kurtosis: f64,
    pub condition_number: f64,
}

/// Price premium of one market over the reference market, in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketPremium {
    pub market: String,
    pub coefficient: f64,
    pub premium_pct: f64,
    pub ci_low_pct: f64,
    pub ci_high_pct: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HedonicModel {
    pub reference_market: String,
    /// Calendar year ages were measured from.
    pub reference_year: i32,
    pub coefficients: Vec<Coefficient>,
    pub diagnostics: Diagnostics,
    pub premiums: Vec<MarketPremium>,
}

impl HedonicModel {
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }

    pub fn premium(&self, market: &str) -> Option<&MarketPremium> {
        self.premiums.iter().find(|p| p.market == market)
    }
}

/// Fits the model with ages measured from the current calendar year.
pub fn fit_hedonic_model(listings: &[Listing]) -> FitResult<HedonicModel> {
    fit_hedonic_model_at(listings, chrono::Local::now().year())
}

pub fn fit_hedonic_model_at(listings: &[Listing], reference_year: i32) -> FitResult<HedonicModel> {
    if listings.len() < MIN_OBSERVATIONS {
        return Err(Unavailable::insufficient(format!(
            "hedonic model needs at least {MIN_OBSERVATIONS} listings, got {}",
            listings.len()
        )));
    }

    let markets: Vec<&str> = listings
        .iter()
        .map(|l| l.source.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if markets.len() < MIN_MARKETS {
        return Err(Unavailable::insufficient(format!(
            "hedonic model needs at least {MIN_MARKETS} markets, got {}",
            markets.len()
        )));
    }

    let reference = markets[0];
    let mut names: Vec<String> = ["intercept", "mileage", "mileage_sq", "age"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    names.extend(markets[1..].iter().map(|m| format!("market_{m}")));

    let n = listings.len();
    let p = names.len();
    let x = DMatrix::from_fn(n, p, |i, j| {
        let l = &listings[i];
        let mileage = l.mileage as f64;
        match j {
            0 => 1.0,
            1 => mileage,
            2 => mileage * mileage,
            3 => (reference_year - l.year) as f64,
            _ => {
                if l.source == markets[j - 3] {
                    1.0
                } else {
                    0.0
                }
            }
        }
    });
    let y = DVector::from_iterator(n, listings.iter().map(|l| (l.price as f64).ln()));

    let fit = ols(&x, &y).inspect_err(|reason| {
        tracing::warn!(%reason, n, markets = markets.len(), "could not fit hedonic model");
    })?;

    let (coefficients, diagnostics) = summarize(&names, &fit, &y);

    let premiums = coefficients[4..]
        .iter()
        .zip(&markets[1..])
        .map(|(c, market)| MarketPremium {
            market: market.to_string(),
            coefficient: c.estimate,
            premium_pct: log_to_pct(c.estimate),
            ci_low_pct: log_to_pct(c.ci_low),
            ci_high_pct: log_to_pct(c.ci_high),
            p_value: c.p_value,
        })
        .collect();

    tracing::debug!(
        n,
        reference_market = reference,
        r_squared = diagnostics.r_squared,
        "fitted hedonic model"
    );

    Ok(HedonicModel {
        reference_market: reference.to_string(),
        reference_year,
        coefficients,
        diagnostics,
        premiums,
    })
}

/// A log-space coefficient as a percentage change in price.
pub fn log_to_pct(beta: f64) -> f64 {
    (beta.exp() - 1.0) * 100.0
}

struct OlsFit {
    beta: DVector<f64>,
    /// (XᵀX)⁻¹
    xtx_inv: DMatrix<f64>,
    residuals: DVector<f64>,
    condition_number: f64,
}

fn ols(x: &DMatrix<f64>, y: &DVector<f64>) -> FitResult<OlsFit> {
    let (n, p) = x.shape();
    if n <= p {
        return Err(Unavailable::degenerate(format!(
            "{n} observations cannot identify {p} parameters"
        )));
    }

    let norms: Vec<f64> = x.column_iter().map(|c| c.norm()).collect();
    if let Some(j) = norms.iter().position(|v| *v == 0.0 || !v.is_finite()) {
        return Err(Unavailable::degenerate(format!(
            "design column {j} is empty or non-finite"
        )));
    }

    let mut scaled = x.clone();
    for (j, norm) in norms.iter().enumerate() {
        for v in scaled.column_mut(j).iter_mut() {
            *v /= norm;
        }
    }

    let svd = scaled.svd(true, true);
    let s = &svd.singular_values;
    let (s_max, s_min) = (s.max(), s.min());
    if !(s_min > s_max * RANK_TOLERANCE) {
        return Err(Unavailable::degenerate("design matrix is rank deficient"));
    }

    let u = svd
        .u
        .as_ref()
        .ok_or_else(|| Unavailable::degenerate("SVD did not produce U"))?;
    let v = svd
        .v_t
        .as_ref()
        .ok_or_else(|| Unavailable::degenerate("SVD did not produce Vᵀ"))?
        .transpose();

    let uty = u.transpose() * y;
    let rotated = DVector::from_iterator(p, uty.iter().zip(s.iter()).map(|(a, sv)| a / sv));
    let beta_scaled = &v * rotated;
    let beta = DVector::from_iterator(p, beta_scaled.iter().zip(&norms).map(|(b, c)| b / c));

    let inv_s2 = DMatrix::from_diagonal(&s.map(|sv| 1.0 / (sv * sv)));
    let cov_scaled = &v * inv_s2 * v.transpose();
    let xtx_inv = DMatrix::from_fn(p, p, |i, j| cov_scaled[(i, j)] / (norms[i] * norms[j]));

    let residuals = y - x * &beta;
    if residuals.iter().any(|r| !r.is_finite()) {
        return Err(Unavailable::degenerate("non-finite residuals"));
    }

    let raw = x.singular_values();
    let condition_number = raw.max() / raw.min();

    Ok(OlsFit {
        beta,
        xtx_inv,
        residuals,
        condition_number,
    })
}

fn summarize(names: &[String], fit: &OlsFit, y: &DVector<f64>) -> (Vec<Coefficient>, Diagnostics) {
    let n = y.len();
    let p = names.len();
    let nf = n as f64;
    let df_resid = n - p;
    let df_model = p - 1;

    let ssr = fit.residuals.norm_squared();
    let y_mean = y.mean();
    let tss: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let sigma2 = ssr / df_resid as f64;
    let t_crit = stats::t_quantile(0.975, df_resid as f64);

    let coefficients = names
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let estimate = fit.beta[j];
            let std_error = (sigma2 * fit.xtx_inv[(j, j)]).sqrt();
            let t_value = estimate / std_error;
            Coefficient {
                name: name.clone(),
                estimate,
                std_error,
                t_value,
                p_value: stats::t_two_sided_p(t_value, df_resid as f64),
                ci_low: estimate - t_crit * std_error,
                ci_high: estimate + t_crit * std_error,
            }
        })
        .collect();

    let r_squared = 1.0 - ssr / tss;
    let adj_r_squared = 1.0 - (nf - 1.0) / df_resid as f64 * (1.0 - r_squared);
    let f_statistic = ((tss - ssr) / df_model as f64) / sigma2;
    let f_p_value = stats::f_sf(f_statistic, df_model as f64, df_resid as f64);

    let log_likelihood = -nf / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (ssr / nf).ln() + 1.0);
    let aic = -2.0 * log_likelihood + 2.0 * p as f64;
    let bic = -2.0 * log_likelihood + p as f64 * nf.ln();

    let residuals: Vec<f64> = fit.residuals.iter().copied().collect();
    let durbin_watson = residuals
        .windows(2)
        .map(|w| (w[1] - w[0]).powi(2))
        .sum::<f64>()
        / ssr;

    let (skew, kurtosis) = stats::skew_kurtosis(&residuals).unwrap_or((f64::NAN, f64::NAN));
    let jarque_bera = nf / 6.0 * (skew.powi(2) + (kurtosis - 3.0).powi(2) / 4.0);
    let omnibus = skew_z(skew, nf).powi(2) + kurtosis_z(kurtosis, nf).powi(2);

    let diagnostics = Diagnostics {
        n_obs: n,
        df_model,
        df_resid,
        r_squared,
        adj_r_squared,
        f_statistic,
        f_p_value,
        log_likelihood,
        aic,
        bic,
        durbin_watson,
        omnibus,
        omnibus_p: stats::chi2_2_sf(omnibus),
        jarque_bera,
        jarque_bera_p: stats::chi2_2_sf(jarque_bera),
        skew,
        kurtosis,
        condition_number: fit.condition_number,
    };

    (coefficients, diagnostics)
}

/// D'Agostino's normal approximation for sample skewness.
fn skew_z(skew: f64, n: f64) -> f64 {
    let y = skew * ((n + 1.0) * (n + 3.0) / (6.0 * (n - 2.0))).sqrt();
    let beta2 = 3.0 * (n * n + 27.0 * n - 70.0) * (n + 1.0) * (n + 3.0)
        / ((n - 2.0) * (n + 5.0) * (n + 7.0) * (n + 9.0));
    let w2 = -1.0 + (2.0 * (beta2 - 1.0)).sqrt();
    let delta = 1.0 / (0.5 * w2.ln()).sqrt();
    let alpha = (2.0 / (w2 - 1.0)).sqrt();
    delta * (y / alpha).asinh()
}

/// Anscombe–Glynn normal approximation for sample (Pearson) kurtosis.
fn kurtosis_z(kurtosis: f64, n: f64) -> f64 {
    let expected = 3.0 * (n - 1.0) / (n + 1.0);
    let var = 24.0 * n * (n - 2.0) * (n - 3.0) / ((n + 1.0).powi(2) * (n + 3.0) * (n + 5.0));
    let x = (kurtosis - expected) / var.sqrt();
    let sqrt_beta1 = 6.0 * (n * n - 5.0 * n + 2.0) / ((n + 7.0) * (n + 9.0))
        * (6.0 * (n + 3.0) * (n + 5.0) / (n * (n - 2.0) * (n - 3.0))).sqrt();
    let a = 6.0 + 8.0 / sqrt_beta1 * (2.0 / sqrt_beta1 + (1.0 + 4.0 / sqrt_beta1.powi(2)).sqrt());
    let term1 = 1.0 - 2.0 / (9.0 * a);
    let denom = 1.0 + x * (2.0 / (a - 4.0)).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    let term2 = denom.signum() * ((1.0 - 2.0 / a) / denom.abs()).cbrt();
    (term1 - term2) / (2.0 / (9.0 * a)).sqrt()
}
