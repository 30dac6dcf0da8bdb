pub mod connection;
pub mod listings;

pub use connection::{init_db, Database};
pub use listings::{count_listings, load_listings, reload_from_files};
