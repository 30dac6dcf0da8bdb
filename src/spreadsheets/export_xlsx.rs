use crate::analysis::{PriceStatistics, TopDeal};
use crate::errors::ServerError;
use rust_xlsxwriter::{Workbook, Worksheet};

/// Builds a workbook with a "Top deals" sheet and, when given, a
/// "Price statistics" sheet. Returns the file bytes.
pub fn top_deals_workbook(
    deals: &[TopDeal],
    stats: Option<(&str, &[PriceStatistics])>,
) -> Result<Vec<u8>, ServerError> {
    let mut workbook = Workbook::new();

    let deals_sheet = workbook.add_worksheet();
    deals_sheet
        .set_name("Top deals")
        .map_err(|e| ServerError::XlsxError(format!("Failed to name sheet: {e}")))?;
    write_deals(deals_sheet, deals)?;

    if let Some((model, stats)) = stats {
        let stats_sheet = workbook.add_worksheet();
        stats_sheet
            .set_name("Price statistics")
            .map_err(|e| ServerError::XlsxError(format!("Failed to name sheet: {e}")))?;
        write_stats(stats_sheet, model, stats)?;
    }

    workbook
        .save_to_buffer()
        .map_err(|e| ServerError::XlsxError(format!("Failed to save workbook: {e}")))
}

fn write_deals(worksheet: &mut Worksheet, deals: &[TopDeal]) -> Result<(), ServerError> {
    let headers = [
        "Mileage bin",
        "Group",
        "Rank",
        "Title",
        "Price (EUR)",
        "Mileage (km)",
        "Year",
        "Source",
        "Link",
    ];

    for (col, header) in headers.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *header)
            .map_err(|e| {
                ServerError::XlsxError(format!("Failed to write header '{}': {}", header, e))
            })?;
    }

    for (i, deal) in deals.iter().enumerate() {
        let r = (i + 1) as u32;
        let l = &deal.listing;

        worksheet
            .write_string(r, 0, &deal.mileage_bin)
            .map_err(|e| ServerError::XlsxError(format!("Failed to write mileage bin: {}", e)))?;
        worksheet
            .write_string(r, 1, &deal.comparison_group)
            .map_err(|e| ServerError::XlsxError(format!("Failed to write group: {}", e)))?;
        worksheet
            .write_number(r, 2, deal.rank as f64)
            .map_err(|e| ServerError::XlsxError(format!("Failed to write rank: {}", e)))?;
        worksheet
            .write_string(r, 3, &l.title)
            .map_err(|e| ServerError::XlsxError(format!("Failed to write title: {}", e)))?;
        worksheet
            .write_number(r, 4, l.price as f64)
            .map_err(|e| ServerError::XlsxError(format!("Failed to write price: {}", e)))?;
        worksheet
            .write_number(r, 5, l.mileage as f64)
            .map_err(|e| ServerError::XlsxError(format!("Failed to write mileage: {}", e)))?;
        worksheet
            .write_number(r, 6, l.year as f64)
            .map_err(|e| ServerError::XlsxError(format!("Failed to write year: {}", e)))?;
        worksheet
            .write_string(r, 7, &l.source)
            .map_err(|e| ServerError::XlsxError(format!("Failed to write source: {}", e)))?;
        worksheet
            .write_string(r, 8, &l.url)
            .map_err(|e| ServerError::XlsxError(format!("Failed to write url: {}", e)))?;
    }

    Ok(())
}

fn write_stats(
    worksheet: &mut Worksheet,
    model: &str,
    stats: &[PriceStatistics],
) -> Result<(), ServerError> {
    worksheet
        .write_string(0, 0, format!("Price statistics for {model}"))
        .map_err(|e| ServerError::XlsxError(format!("Failed to write title: {e}")))?;

    let headers = ["Source", "Listings", "Mean", "Median", "Std", "25th percentile", "75th percentile"];
    for (col, header) in headers.iter().enumerate() {
        worksheet
            .write_string(1, col as u16, *header)
            .map_err(|e| ServerError::XlsxError(format!("Failed to write header: {e}")))?;
    }

    for (i, s) in stats.iter().enumerate() {
        let r = (i + 2) as u32;
        worksheet
            .write_string(r, 0, &s.source)
            .map_err(|e| ServerError::XlsxError(format!("source: {e}")))?;

        let numbers = [
            Some(s.count as f64),
            Some(s.mean.round()),
            Some(s.median.round()),
            s.std.map(f64::round),
            Some(s.p25.round()),
            Some(s.p75.round()),
        ];
        for (offset, value) in numbers.into_iter().enumerate() {
            if let Some(v) = value {
                worksheet
                    .write_number(r, (offset + 1) as u16, v)
                    .map_err(|e| ServerError::XlsxError(format!("statistic: {e}")))?;
            }
        }
    }

    Ok(())
}
