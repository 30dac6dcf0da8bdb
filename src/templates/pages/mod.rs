pub mod summary;

pub use summary::{summary_page, SummaryVm};
