// src/analysis/corridor.rs

use crate::analysis::lowess::{lowess, LowessParams};
use crate::analysis::{stats, FitResult, Unavailable};
use crate::domain::Listing;
use serde::Serialize;
use std::collections::BTreeMap;

/// Global price bands drawn as horizontal lines across the mileage range.
/// Computed over every listing, not per source, so all markets share one
/// reference frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantileCorridor {
    pub p10: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
    pub mileage_min: i64,
    pub mileage_max: i64,
}

impl QuantileCorridor {
    /// 25th–75th percentile band.
    pub fn inner(&self) -> (f64, f64) {
        (self.p25, self.p75)
    }

    /// 10th–90th percentile band.
    pub fn outer(&self) -> (f64, f64) {
        (self.p10, self.p90)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub mileage: i64,
    pub price: i64,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub mileage: f64,
    pub price: f64,
}

/// Raw points and smoothed trend of a single market.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSeries {
    pub source: String,
    pub points: Vec<ScatterPoint>,
    #[serde(serialize_with = "crate::analysis::serialize_fit")]
    pub trend: FitResult<Vec<TrendPoint>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct QuantileView {
    pub corridor: Option<QuantileCorridor>,
    pub series: Vec<SourceSeries>,
}

/// Corridor bounds plus, per source (sorted), its scatter and LOWESS trend.
/// Sources with fewer than two listings get no trend.
pub fn build_quantile_smoothing_view(listings: &[Listing]) -> QuantileView {
    if listings.is_empty() {
        return QuantileView::default();
    }

    let corridor = corridor_bounds(listings);

    let mut by_source: BTreeMap<&str, Vec<&Listing>> = BTreeMap::new();
    for listing in listings {
        by_source.entry(listing.source.as_str()).or_default().push(listing);
    }

    let series = by_source
        .into_iter()
        .map(|(source, members)| {
            let trend = smooth_trend(&members);
            if let Err(reason) = &trend {
                tracing::debug!(source, %reason, "no trend line for source");
            }

            SourceSeries {
                source: source.to_string(),
                points: members
                    .iter()
                    .map(|l| ScatterPoint {
                        mileage: l.mileage,
                        price: l.price,
                        title: l.title.clone(),
                        url: l.url.clone(),
                    })
                    .collect(),
                trend,
            }
        })
        .collect();

    QuantileView { corridor, series }
}

fn corridor_bounds(listings: &[Listing]) -> Option<QuantileCorridor> {
    let prices: Vec<f64> = listings.iter().map(|l| l.price as f64).collect();
    let sorted = stats::sorted(&prices);

    Some(QuantileCorridor {
        p10: stats::quantile_sorted(&sorted, 0.10)?,
        p25: stats::quantile_sorted(&sorted, 0.25)?,
        p75: stats::quantile_sorted(&sorted, 0.75)?,
        p90: stats::quantile_sorted(&sorted, 0.90)?,
        mileage_min: listings.iter().map(|l| l.mileage).min()?,
        mileage_max: listings.iter().map(|l| l.mileage).max()?,
    })
}

fn smooth_trend(members: &[&Listing]) -> FitResult<Vec<TrendPoint>> {
    if members.len() < 2 {
        return Err(Unavailable::insufficient("a trend needs at least 2 listings"));
    }

    let points: Vec<(f64, f64)> = members
        .iter()
        .map(|l| (l.mileage as f64, l.price as f64))
        .collect();

    let curve = lowess(&points, LowessParams::default())?;
    Ok(curve
        .into_iter()
        .map(|(mileage, price)| TrendPoint { mileage, price })
        .collect())
}
