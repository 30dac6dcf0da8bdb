pub mod filter;
pub mod listing;

pub use filter::{only_group, search_groups, source_counts, ListingFilter};
pub use listing::{clean_raw_listings, Listing, RawListing};
