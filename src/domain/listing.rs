// src/domain/listing.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_SEARCH_GROUP: &str = "Default";

/// Plausible ranges for cleaned values. Anything outside is a scraping error.
pub const MAX_PRICE_EUR: i64 = 100_000_000;
pub const MAX_MILEAGE_KM: i64 = 10_000_000;
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1886..=2100;

/// A cleaned, fully-typed listing, ready for analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub url: String,
    pub title: String,

    pub price: i64,   // EUR
    pub mileage: i64, // km
    pub year: i32,

    pub source: String,       // market, e.g. "mobile_de"
    pub search_group: String, // logical vehicle group, e.g. "Volvo XC60"
}

impl Listing {
    /// "{search_group} ({source})", the unit listings are compared by.
    pub fn comparison_group(&self) -> String {
        format!("{} ({})", self.search_group, self.source)
    }
}

// raw record
//  ├── url
//  ├── title
//  ├── price_eur     number or numeric string
//  ├── mileage_km    number or numeric string
//  ├── year          number or numeric string
//  └── search_group  optional

/// A record as written by the scrapers. Every field may be missing.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RawListing {
    pub url: Option<String>,
    pub title: Option<String>,
    pub price_eur: Option<Value>,
    pub mileage_km: Option<Value>,
    pub year: Option<Value>,
    pub search_group: Option<String>,
}

impl RawListing {
    /// Flattens and type-coerces a raw record into a `Listing`.
    ///
    /// Rejects records without a url, title, price, mileage or year, and
    /// records whose price is not positive, whose mileage is negative, or
    /// whose values fall outside the plausible ranges above. Numeric values
    /// are truncated toward zero.
    pub fn into_listing(self, source: &str) -> Result<Listing, String> {
        let url = self
            .url
            .filter(|s| !s.trim().is_empty())
            .ok_or("Missing or empty url")?;

        let title = self.title.ok_or("Missing title")?;

        let price = self
            .price_eur
            .as_ref()
            .and_then(coerce_number)
            .ok_or("Missing or non-numeric price")? as i64;

        let mileage = self
            .mileage_km
            .as_ref()
            .and_then(coerce_number)
            .ok_or("Missing or non-numeric mileage")? as i64;

        let year = self
            .year
            .as_ref()
            .and_then(coerce_number)
            .ok_or("Missing or non-numeric year")? as i32;

        if price <= 0 {
            return Err(format!("Non-positive price {price}"));
        }
        if price > MAX_PRICE_EUR {
            return Err(format!("Implausible price {price}"));
        }
        if mileage < 0 {
            return Err(format!("Negative mileage {mileage}"));
        }
        if mileage > MAX_MILEAGE_KM {
            return Err(format!("Implausible mileage {mileage}"));
        }
        if !YEAR_RANGE.contains(&year) {
            return Err(format!("Implausible year {year}"));
        }

        let search_group = self
            .search_group
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| DEFAULT_SEARCH_GROUP.to_string());

        Ok(Listing {
            url: url.trim().to_string(),
            title,
            price,
            mileage,
            year,
            source: source.to_string(),
            search_group,
        })
    }
}

/// Accepts JSON numbers and numeric strings ("12 500" and "12,500" included).
fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !c.is_whitespace() && *c != ',')
                .collect();
            cleaned.parse::<f64>().ok()?
        }
        _ => return None,
    };

    n.is_finite().then_some(n)
}

/// Cleans a batch of raw records for one source, dropping the incomplete ones.
pub fn clean_raw_listings(raw: Vec<RawListing>, source: &str) -> Vec<Listing> {
    let total = raw.len();
    let mut out = Vec::with_capacity(total);

    for record in raw {
        match record.into_listing(source) {
            Ok(listing) => out.push(listing),
            Err(reason) => tracing::debug!(source, %reason, "dropping raw listing"),
        }
    }

    if out.len() < total {
        tracing::info!(
            source,
            kept = out.len(),
            dropped = total - out.len(),
            "cleaned raw listings"
        );
    }

    out
}
