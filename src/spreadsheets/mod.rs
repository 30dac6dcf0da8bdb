pub mod export_xlsx;

pub use export_xlsx::top_deals_workbook;
