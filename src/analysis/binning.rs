// src/analysis/binning.rs

use crate::domain::Listing;
use serde::Serialize;

/// Width of a mileage bucket, in km.
pub const MILEAGE_BIN_WIDTH: i64 = 50_000;

/// Half-open mileage interval `[lo, hi)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MileageBin {
    pub index: usize,
    pub lo: i64,
    pub hi: i64,
}

impl MileageBin {
    pub fn contains(&self, mileage: i64) -> bool {
        self.lo <= mileage && mileage < self.hi
    }

    /// e.g. "50–100 thousand km"
    pub fn label(&self) -> String {
        format!(
            "{}–{} thousand km",
            group_thousands(self.lo / 1000),
            group_thousands(self.hi / 1000)
        )
    }
}

/// Fixed-width partition of `[0, max_mileage + width)` derived from a listing set.
#[derive(Debug, Clone, PartialEq)]
pub struct MileageBinner {
    width: i64,
    count: usize,
}

impl MileageBinner {
    /// `None` for an empty listing set: there is nothing to bin.
    pub fn for_listings(listings: &[Listing]) -> Option<Self> {
        Self::with_width(listings, MILEAGE_BIN_WIDTH)
    }

    pub fn with_width(listings: &[Listing], width: i64) -> Option<Self> {
        let max = listings.iter().map(|l| l.mileage.max(0)).max()?;
        if width <= 0 {
            return None;
        }
        // ceil((max + W) / W), without overflowing near i64::MAX
        let whole = usize::try_from(max / width).ok()?;
        let count = whole.checked_add(1 + usize::from(max % width != 0))?;
        Some(Self { width, count })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn bins(&self) -> Vec<MileageBin> {
        (0..self.count).map(|i| self.bin_at(i)).collect()
    }

    /// Bin holding `mileage`, or `None` when it falls outside the partition.
    pub fn bin_for(&self, mileage: i64) -> Option<MileageBin> {
        if mileage < 0 {
            return None;
        }
        let index = (mileage / self.width) as usize;
        (index < self.count).then(|| self.bin_at(index))
    }

    fn bin_at(&self, index: usize) -> MileageBin {
        let lo = index as i64 * self.width;
        MileageBin {
            index,
            lo,
            hi: lo.saturating_add(self.width),
        }
    }
}

/// Labels each listing with its mileage bin. Empty input gives an empty result.
pub fn bin_listings(listings: &[Listing]) -> Vec<(MileageBin, &Listing)> {
    let Some(binner) = MileageBinner::for_listings(listings) else {
        return Vec::new();
    };

    listings
        .iter()
        .filter_map(|l| binner.bin_for(l.mileage).map(|bin| (bin, l)))
        .collect()
}

/// 1234567 -> "1,234,567"
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if n < 0 {
        out.insert(0, '-');
    }
    out
}
