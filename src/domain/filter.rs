// src/domain/filter.rs

use crate::domain::listing::Listing;
use std::collections::HashMap;
use std::ops::RangeInclusive;

/// Narrows the combined listing set the way the dashboard sidebar does.
/// `None` for a criterion means "everything".
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ListingFilter {
    pub sources: Option<Vec<String>>,
    pub search_groups: Option<Vec<String>>,
    pub years: Option<RangeInclusive<i32>>,
    pub mileage: Option<RangeInclusive<i64>>,
}

impl ListingFilter {
    pub fn matches(&self, listing: &Listing) -> bool {
        if let Some(sources) = &self.sources {
            if !sources.iter().any(|s| *s == listing.source) {
                return false;
            }
        }
        if let Some(groups) = &self.search_groups {
            if !groups.iter().any(|g| *g == listing.search_group) {
                return false;
            }
        }
        if let Some(years) = &self.years {
            if !years.contains(&listing.year) {
                return false;
            }
        }
        if let Some(mileage) = &self.mileage {
            if !mileage.contains(&listing.mileage) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, listings: &[Listing]) -> Vec<Listing> {
        listings
            .iter()
            .filter(|l| self.matches(l))
            .cloned()
            .collect()
    }
}

/// Listings per source, most listings first (ties by name).
pub fn source_counts(listings: &[Listing]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for listing in listings {
        *counts.entry(listing.source.as_str()).or_default() += 1;
    }

    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(source, n)| (source.to_string(), n))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

/// Distinct search groups in sorted order.
pub fn search_groups(listings: &[Listing]) -> Vec<String> {
    let mut groups: Vec<String> = listings.iter().map(|l| l.search_group.clone()).collect();
    groups.sort();
    groups.dedup();
    groups
}

/// Listings of a single search group.
pub fn only_group(listings: &[Listing], search_group: &str) -> Vec<Listing> {
    listings
        .iter()
        .filter(|l| l.search_group == search_group)
        .cloned()
        .collect()
}
