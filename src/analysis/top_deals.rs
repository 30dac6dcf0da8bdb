// src/analysis/top_deals.rs

use crate::analysis::binning::bin_listings;
use crate::domain::Listing;
use serde::Serialize;
use std::collections::BTreeMap;

/// How many of the cheapest listings survive per (bin, comparison group).
pub const TOP_DEALS_PER_GROUP: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopDeal {
    pub mileage_bin: String,
    pub bin_index: usize,
    pub comparison_group: String,
    /// 1 = cheapest in its group.
    pub rank: usize,
    #[serde(flatten)]
    pub listing: Listing,
}

/// Keeps the cheapest listings of every (mileage bin, comparison group).
///
/// Equal prices keep their input order. Rows come out ordered by bin, then
/// comparison group, then rank; groups without listings emit nothing.
pub fn bin_and_select_top_deals(listings: &[Listing]) -> Vec<TopDeal> {
    let mut groups: BTreeMap<(usize, String), Vec<&Listing>> = BTreeMap::new();
    let mut labels: BTreeMap<usize, String> = BTreeMap::new();

    for (bin, listing) in bin_listings(listings) {
        labels.entry(bin.index).or_insert_with(|| bin.label());
        groups
            .entry((bin.index, listing.comparison_group()))
            .or_default()
            .push(listing);
    }

    let mut out = Vec::new();
    for ((bin_index, comparison_group), mut members) in groups {
        // stable: ties keep insertion order
        members.sort_by_key(|l| l.price);

        let label = labels.get(&bin_index).cloned().unwrap_or_default();
        for (i, listing) in members.into_iter().take(TOP_DEALS_PER_GROUP).enumerate() {
            out.push(TopDeal {
                mileage_bin: label.clone(),
                bin_index,
                comparison_group: comparison_group.clone(),
                rank: i + 1,
                listing: listing.clone(),
            });
        }
    }

    tracing::debug!(input = listings.len(), selected = out.len(), "selected top deals");
    out
}
