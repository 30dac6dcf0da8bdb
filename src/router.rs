use crate::analysis::{
    bin_and_select_top_deals, build_quantile_smoothing_view, compute_price_statistics,
    find_deal_candidates, fit_group_trends, fit_hedonic_model, median_difference, serialize_fit,
    FitResult,
};
use crate::cache::ListingCache;
use crate::config::Config;
use crate::db::{load_listings, reload_from_files, Database};
use crate::domain::{only_group, search_groups, source_counts, Listing, ListingFilter};
use crate::errors::ServerError;
use crate::responses::{html_response, json_response, xlsx_response, ResultResp};
use crate::spreadsheets::top_deals_workbook;
use crate::templates::pages::{summary_page, SummaryVm};
use astra::Request;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Everything a request handler needs. Shared by all server workers.
pub struct AppState {
    pub db: Database,
    pub cache: ListingCache,
    pub raw_data_files: Vec<PathBuf>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            db: Database::new(config.database_path.clone()),
            cache: ListingCache::new(config.cache_ttl),
            raw_data_files: config.raw_data_files.clone(),
        }
    }

    /// The combined listing set, served from cache while fresh.
    fn listings(&self) -> Result<std::sync::Arc<Vec<Listing>>, ServerError> {
        self.cache.get_or_load(|| load_listings(&self.db))
    }
}

pub fn handle(req: Request, state: &AppState) -> ResultResp {
    let method = req.method().as_str();
    let path = req.uri().path();
    let query = parse_query(&req);

    tracing::debug!(method, path, "request");

    match (method, path) {
        ("GET", "/") => summary(state, &query),
        ("GET", "/api/listings/summary") => {
            let listings = filtered(state, &query)?;
            json_response(&ListingSummary {
                total: listings.len(),
                sources: source_counts(&listings),
                search_groups: search_groups(&listings),
            })
        }
        ("GET", "/api/top-deals") => {
            let listings = filtered(state, &query)?;
            json_response(&bin_and_select_top_deals(&listings))
        }
        ("GET", "/api/stats") => {
            let listings = filtered(state, &query)?;
            let Some(group) = selected_group(&listings, &query) else {
                return json_response(&StatsResponse::default());
            };
            let stats = compute_price_statistics(&only_group(&listings, &group));
            json_response(&StatsResponse {
                median_difference: median_difference(&stats),
                model: Some(group),
                stats,
            })
        }
        ("GET", "/api/corridor") => {
            let listings = filtered(state, &query)?;
            json_response(&build_quantile_smoothing_view(&listings))
        }
        ("GET", "/api/hedonic") => {
            let listings = filtered(state, &query)?;
            json_response(&FitResponse(fit_hedonic_model(&listings)))
        }
        ("GET", "/api/trends") => {
            let listings = filtered(state, &query)?;
            json_response(&fit_group_trends(&listings))
        }
        ("GET", "/api/candidates") => {
            let listings = filtered(state, &query)?;
            json_response(&FitResponse(find_deal_candidates(&listings)))
        }
        ("GET", "/export/top-deals.xlsx") => {
            let listings = filtered(state, &query)?;
            let deals = bin_and_select_top_deals(&listings);
            let group = selected_group(&listings, &query);
            let stats = group
                .as_deref()
                .map(|g| compute_price_statistics(&only_group(&listings, g)));
            let buffer = top_deals_workbook(
                &deals,
                group.as_deref().zip(stats.as_deref()),
            )?;
            xlsx_response(buffer, "top_deals.xlsx")
        }
        ("POST", "/reload") => {
            let reports = reload_from_files(&state.db, state.raw_data_files.as_slice())?;
            state.cache.invalidate();
            tracing::info!(files = reports.len(), "listings reloaded from raw files");
            json_response(&reports)
        }
        _ => Err(ServerError::NotFound),
    }
}

#[derive(Serialize)]
struct ListingSummary {
    total: usize,
    sources: Vec<(String, usize)>,
    search_groups: Vec<String>,
}

#[derive(Serialize, Default)]
struct StatsResponse {
    model: Option<String>,
    stats: Vec<crate::analysis::PriceStatistics>,
    median_difference: Option<crate::analysis::MedianDifference>,
}

#[derive(Serialize)]
struct FitResponse<T: Serialize>(#[serde(serialize_with = "serialize_fit")] FitResult<T>);

fn summary(state: &AppState, query: &HashMap<String, Vec<String>>) -> ResultResp {
    let listings = filtered(state, query)?;
    let selected_group = selected_group(&listings, query);
    let price_stats = selected_group
        .as_deref()
        .map(|g| compute_price_statistics(&only_group(&listings, g)))
        .unwrap_or_default();

    let vm = SummaryVm {
        total: listings.len(),
        source_counts: source_counts(&listings),
        corridor: build_quantile_smoothing_view(&listings).corridor,
        top_deals: bin_and_select_top_deals(&listings),
        median_difference: median_difference(&price_stats),
        selected_group,
        price_stats,
        hedonic: fit_hedonic_model(&listings),
    };

    html_response(summary_page(&vm))
}

fn filtered(state: &AppState, query: &HashMap<String, Vec<String>>) -> Result<Vec<Listing>, ServerError> {
    let filter = filter_from_query(query)?;
    let listings = state.listings()?;
    Ok(filter.apply(&listings))
}

/// `?model=` when present among the filtered listings, else the first group.
fn selected_group(listings: &[Listing], query: &HashMap<String, Vec<String>>) -> Option<String> {
    let groups = search_groups(listings);
    match query.get("model").and_then(|v| v.first()) {
        Some(wanted) if groups.contains(wanted) => Some(wanted.clone()),
        _ => groups.into_iter().next(),
    }
}

/// `source` and `group` may repeat; ranges are inclusive and may be half-open.
pub fn filter_from_query(query: &HashMap<String, Vec<String>>) -> Result<ListingFilter, ServerError> {
    let list = |key: &str| query.get(key).filter(|v| !v.is_empty()).cloned();

    let years = range(query, "year_min", "year_max", i32::MIN, i32::MAX)?;
    let mileage = range(query, "km_min", "km_max", i64::MIN, i64::MAX)?;

    Ok(ListingFilter {
        sources: list("source"),
        search_groups: list("group"),
        years,
        mileage,
    })
}

fn range<T>(
    query: &HashMap<String, Vec<String>>,
    min_key: &str,
    max_key: &str,
    floor: T,
    ceil: T,
) -> Result<Option<std::ops::RangeInclusive<T>>, ServerError>
where
    T: std::str::FromStr + Copy,
{
    let parse = |key: &str| -> Result<Option<T>, ServerError> {
        match query.get(key).and_then(|v| v.first()) {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| ServerError::BadRequest(format!("{key} must be a number"))),
        }
    };

    match (parse(min_key)?, parse(max_key)?) {
        (None, None) => Ok(None),
        (lo, hi) => Ok(Some(lo.unwrap_or(floor)..=hi.unwrap_or(ceil))),
    }
}

fn parse_query(req: &astra::Request) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();

    if let Some(q) = req.uri().query() {
        for (k, v) in url::form_urlencoded::parse(q.as_bytes()) {
            map.entry(k.into_owned()).or_default().push(v.into_owned());
        }
    }

    map
}
