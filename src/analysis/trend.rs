// src/analysis/trend.rs

use crate::analysis::corridor::TrendPoint;
use crate::analysis::{stats, FitResult, Unavailable};
use crate::domain::Listing;
use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use std::collections::BTreeMap;

/// Groups smaller than this are not drawn with a trend at all.
pub const MIN_TREND_LISTINGS: usize = 3;
pub const TREND_GRID_POINTS: usize = 100;

/// Residual z-score beyond which a listing is an outlier.
pub const OUTLIER_Z: f64 = 3.0;
/// Residual z-score below which a (non-outlier) listing is a cheap candidate.
pub const CANDIDATE_Z: f64 = -1.5;

/// price ≈ intercept + per_1000_km · mileage/1000 + per_year · year
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearPriceModel {
    pub intercept: f64,
    pub per_1000_km: f64,
    pub per_year: f64,
}

impl LinearPriceModel {
    /// Least squares through the pseudo-inverse of the normal equations, so a
    /// group where every car has the same year still gets a (minimum-norm) fit.
    pub fn fit(listings: &[&Listing]) -> FitResult<Self> {
        let n = listings.len();
        if n < MIN_TREND_LISTINGS {
            return Err(Unavailable::insufficient(format!(
                "a linear trend needs at least {MIN_TREND_LISTINGS} listings, got {n}"
            )));
        }

        let x = DMatrix::from_fn(n, 3, |i, j| match j {
            0 => 1.0,
            1 => listings[i].mileage as f64 / 1000.0,
            _ => listings[i].year as f64,
        });
        let y = DVector::from_iterator(n, listings.iter().map(|l| l.price as f64));

        let xt = x.transpose();
        let xtx = &xt * &x;
        let eps = xtx.amax() * 1e-15;
        let pinv = xtx
            .pseudo_inverse(eps)
            .map_err(|e| Unavailable::degenerate(format!("pseudo-inverse failed: {e}")))?;
        let beta = pinv * (&xt * &y);

        if beta.iter().any(|b| !b.is_finite()) {
            return Err(Unavailable::degenerate("non-finite trend coefficients"));
        }

        Ok(Self {
            intercept: beta[0],
            per_1000_km: beta[1],
            per_year: beta[2],
        })
    }

    pub fn predict(&self, mileage: f64, year: f64) -> f64 {
        self.intercept + self.per_1000_km * (mileage / 1000.0) + self.per_year * year
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTrend {
    pub model: LinearPriceModel,
    /// The curve holds year fixed at the group's median.
    pub median_year: i32,
    pub curve: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTrendResult {
    pub comparison_group: String,
    pub listings: usize,
    #[serde(serialize_with = "crate::analysis::serialize_fit")]
    pub trend: FitResult<GroupTrend>,
}

/// Linear price trend per comparison group, sorted by group. Groups with
/// fewer than three listings are left out.
pub fn fit_group_trends(listings: &[Listing]) -> Vec<GroupTrendResult> {
    let mut groups: BTreeMap<String, Vec<&Listing>> = BTreeMap::new();
    for listing in listings {
        groups.entry(listing.comparison_group()).or_default().push(listing);
    }

    groups
        .into_iter()
        .filter(|(_, members)| members.len() >= MIN_TREND_LISTINGS)
        .map(|(comparison_group, members)| {
            let trend = group_trend(&members);
            if let Err(reason) = &trend {
                tracing::warn!(group = %comparison_group, %reason, "could not build trend");
            }
            GroupTrendResult {
                comparison_group,
                listings: members.len(),
                trend,
            }
        })
        .collect()
}

fn group_trend(members: &[&Listing]) -> FitResult<GroupTrend> {
    let model = LinearPriceModel::fit(members)?;

    let years: Vec<f64> = members.iter().map(|l| l.year as f64).collect();
    let median_year = stats::median(&years)
        .ok_or_else(|| Unavailable::insufficient("no years"))? as i32;

    let lo = members.iter().map(|l| l.mileage).min().unwrap_or(0) as f64;
    let hi = members.iter().map(|l| l.mileage).max().unwrap_or(0) as f64;
    let step = (hi - lo) / (TREND_GRID_POINTS - 1) as f64;

    let curve = (0..TREND_GRID_POINTS)
        .map(|i| {
            let mileage = lo + step * i as f64;
            TrendPoint {
                mileage,
                price: model.predict(mileage, median_year as f64),
            }
        })
        .collect();

    Ok(GroupTrend {
        model,
        median_year,
        curve,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DealCandidate {
    #[serde(flatten)]
    pub listing: Listing,
    pub predicted_price: f64,
    pub residual: f64,
    /// Robust z-score of the residual (median / MAD based).
    pub z_score: f64,
    pub is_outlier: bool,
}

/// Scores every listing against a linear price model fitted to the whole set.
pub fn score_listings(listings: &[Listing]) -> FitResult<Vec<DealCandidate>> {
    let refs: Vec<&Listing> = listings.iter().collect();
    let model = LinearPriceModel::fit(&refs)?;

    let predicted: Vec<f64> = listings
        .iter()
        .map(|l| model.predict(l.mileage as f64, l.year as f64))
        .collect();
    let residuals: Vec<f64> = listings
        .iter()
        .zip(&predicted)
        .map(|(l, p)| l.price as f64 - p)
        .collect();

    let center = stats::median(&residuals).ok_or_else(|| Unavailable::insufficient("no residuals"))?;
    let mad = stats::mad(&residuals).ok_or_else(|| Unavailable::insufficient("no residuals"))? + 1e-9;

    Ok(listings
        .iter()
        .zip(predicted.into_iter().zip(residuals))
        .map(|(listing, (predicted_price, residual))| {
            let z_score = (residual - center) / (1.4826 * mad);
            DealCandidate {
                listing: listing.clone(),
                predicted_price,
                residual,
                z_score,
                is_outlier: z_score.abs() > OUTLIER_Z,
            }
        })
        .collect())
}

/// Listings priced well below the trend but not extreme enough to be
/// suspicious, cheapest-relative-to-trend first.
pub fn find_deal_candidates(listings: &[Listing]) -> FitResult<Vec<DealCandidate>> {
    let mut candidates: Vec<DealCandidate> = score_listings(listings)?
        .into_iter()
        .filter(|c| c.z_score < CANDIDATE_Z && !c.is_outlier)
        .collect();
    candidates.sort_by(|a, b| a.z_score.total_cmp(&b.z_score));
    Ok(candidates)
}
