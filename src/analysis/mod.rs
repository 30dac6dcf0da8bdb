//! The analysis pipeline: every function takes an immutable slice of
//! listings and returns a fresh result. Nothing is memoized between calls.

pub mod binning;
pub mod corridor;
pub mod hedonic;
pub mod lowess;
pub mod price_stats;
pub mod stats;
pub mod top_deals;
pub mod trend;

use serde::Serialize;
use thiserror::Error;

pub use corridor::{build_quantile_smoothing_view, QuantileCorridor};
pub use hedonic::{fit_hedonic_model, HedonicModel};
pub use price_stats::{compute_price_statistics, median_difference, MedianDifference, PriceStatistics};
pub use top_deals::{bin_and_select_top_deals, TopDeal};
pub use trend::{find_deal_candidates, fit_group_trends};

/// Why a statistic could not be produced. Never fatal: callers render it as
/// an absent result and carry on.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Unavailable {
    #[error("insufficient data: {reason}")]
    InsufficientData { reason: String },

    #[error("degenerate fit: {reason}")]
    DegenerateFit { reason: String },
}

impl Unavailable {
    pub fn insufficient(reason: impl Into<String>) -> Self {
        Unavailable::InsufficientData {
            reason: reason.into(),
        }
    }

    pub fn degenerate(reason: impl Into<String>) -> Self {
        Unavailable::DegenerateFit {
            reason: reason.into(),
        }
    }
}

pub type FitResult<T> = Result<T, Unavailable>;

/// Serializes a `FitResult` as `{"status":"available","value":…}` or
/// `{"status":"unavailable","reason":…}`.
pub fn serialize_fit<T, S>(fit: &FitResult<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: serde::Serializer,
{
    use serde::ser::SerializeStruct;

    let mut state = serializer.serialize_struct("Fit", 2)?;
    match fit {
        Ok(value) => {
            state.serialize_field("status", "available")?;
            state.serialize_field("value", value)?;
        }
        Err(reason) => {
            state.serialize_field("status", "unavailable")?;
            state.serialize_field("reason", reason)?;
        }
    }
    state.end()
}
