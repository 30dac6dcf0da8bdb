// src/analysis/price_stats.rs

use crate::analysis::stats;
use crate::domain::Listing;
use serde::Serialize;
use std::collections::BTreeMap;

/// Descriptive price statistics for one source, in EUR.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceStatistics {
    pub source: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; absent for a single listing.
    pub std: Option<f64>,
    pub p25: f64,
    pub p75: f64,
}

/// Per-source price statistics, sources in sorted order. All listings are
/// included as-is (no outlier removal).
pub fn compute_price_statistics(listings: &[Listing]) -> Vec<PriceStatistics> {
    let mut by_source: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for listing in listings {
        by_source
            .entry(listing.source.as_str())
            .or_default()
            .push(listing.price as f64);
    }

    by_source
        .into_iter()
        .filter_map(|(source, prices)| {
            let sorted = stats::sorted(&prices);
            Some(PriceStatistics {
                source: source.to_string(),
                count: prices.len(),
                mean: stats::mean(&prices)?,
                median: stats::quantile_sorted(&sorted, 0.5)?,
                std: stats::sample_std(&prices),
                p25: stats::quantile_sorted(&sorted, 0.25)?,
                p75: stats::quantile_sorted(&sorted, 0.75)?,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedianDifference {
    pub base_source: String,
    pub other_source: String,
    /// How much higher (positive) or lower the other source's median is, in percent.
    pub percent: f64,
}

/// Median gap between exactly two sources, the second relative to the first.
pub fn median_difference(stats: &[PriceStatistics]) -> Option<MedianDifference> {
    let [base, other] = stats else {
        return None;
    };
    if base.median <= 0.0 || other.median <= 0.0 {
        return None;
    }

    Some(MedianDifference {
        base_source: base.source.clone(),
        other_source: other.source.clone(),
        percent: (other.median - base.median) / base.median * 100.0,
    })
}
