// src/tests/router_tests/api_tests.rs

use crate::cache::ListingCache;
use crate::db::listings::save_listings;
use crate::router::{handle, AppState};
use crate::tests::db_tests::write_raw_file;
use crate::tests::utils::{listing, make_db, two_market_listings};
use astra::{Body, Request, Response};
use serde_json::{json, Value};
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

pub fn make_state(prefix: &str, raw_data_files: Vec<PathBuf>) -> AppState {
    AppState {
        db: make_db(prefix),
        cache: ListingCache::new(Duration::from_secs(60)),
        raw_data_files,
    }
}

pub fn request(method: &str, uri: &str) -> Request {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn body_string(mut resp: Response) -> String {
    let mut body_bytes = Vec::new();
    resp.body_mut()
        .reader()
        .read_to_end(&mut body_bytes)
        .unwrap();
    String::from_utf8(body_bytes).unwrap()
}

fn get_json(state: &AppState, uri: &str) -> Value {
    let resp = handle(request("GET", uri), state).unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["Content-Type"], "application/json");
    serde_json::from_str(&body_string(resp)).unwrap()
}

fn seeded_state(prefix: &str) -> AppState {
    let state = make_state(prefix, Vec::new());
    let mut listings = two_market_listings(30, 0.2);
    listings.push(listing("mobile_de", "Audi Q5", 26_000, 40_000, 2019));
    save_listings(&state.db, &listings).unwrap();
    state
}

#[test]
fn listing_summary_respects_filters() {
    let state = seeded_state("api_summary");

    let all = get_json(&state, "/api/listings/summary");
    assert_eq!(all["total"], 61);
    assert_eq!(all["search_groups"], json!(["Audi Q5", "Volvo XC60"]));

    let only_de = get_json(&state, "/api/listings/summary?source=mobile_de&group=Volvo+XC60");
    assert_eq!(only_de["total"], 30);

    let both = get_json(&state, "/api/listings/summary?source=mobile_de&source=polovni_automobili&group=Audi%20Q5");
    assert_eq!(both["total"], 1);
}

#[test]
fn top_deals_endpoint() {
    let state = seeded_state("api_top_deals");
    let deals = get_json(&state, "/api/top-deals");
    let deals = deals.as_array().unwrap();

    assert!(!deals.is_empty());
    for d in deals {
        assert!(d["rank"].as_u64().unwrap() <= 2);
        assert!(d["url"].is_string());
        assert!(d["mileage_bin"].as_str().unwrap().ends_with("thousand km"));
    }
}

#[test]
fn stats_endpoint_picks_requested_model() {
    let state = seeded_state("api_stats");

    let stats = get_json(&state, "/api/stats?model=Volvo%20XC60");
    assert_eq!(stats["model"], "Volvo XC60");
    assert_eq!(stats["stats"].as_array().unwrap().len(), 2);
    assert!(stats["median_difference"]["percent"].as_f64().unwrap() < 0.0);

    // unknown models fall back to the first group
    let fallback = get_json(&state, "/api/stats?model=Trabant");
    assert_eq!(fallback["model"], "Audi Q5");
    assert!(fallback["median_difference"].is_null());
}

#[test]
fn hedonic_endpoint_reports_availability() {
    let state = seeded_state("api_hedonic");

    let fit = get_json(&state, "/api/hedonic?group=Volvo%20XC60");
    assert_eq!(fit["status"], "available");
    assert_eq!(fit["value"]["reference_market"], "mobile_de");

    let thin = get_json(&state, "/api/hedonic?group=Audi%20Q5");
    assert_eq!(thin["status"], "unavailable");
    assert_eq!(thin["reason"]["kind"], "insufficient_data");
}

#[test]
fn corridor_trends_and_candidates_respond() {
    let state = seeded_state("api_views");

    let corridor = get_json(&state, "/api/corridor");
    assert!(corridor["corridor"]["p25"].as_f64().unwrap() <= corridor["corridor"]["p75"].as_f64().unwrap());
    assert_eq!(corridor["series"].as_array().unwrap().len(), 2);

    let trends = get_json(&state, "/api/trends");
    assert_eq!(trends.as_array().unwrap().len(), 2);

    let candidates = get_json(&state, "/api/candidates");
    assert_eq!(candidates["status"], "available");
}

#[test]
fn empty_filter_result_is_not_an_error() {
    let state = seeded_state("api_empty");

    let deals = get_json(&state, "/api/top-deals?year_min=2030");
    assert_eq!(deals, json!([]));

    let corridor = get_json(&state, "/api/corridor?km_max=-1");
    assert!(corridor["corridor"].is_null());
}

#[test]
fn non_numeric_range_is_bad_request() {
    let state = seeded_state("api_bad_request");
    let Err(err) = handle(request("GET", "/api/top-deals?year_min=soon"), &state) else {
        panic!("expected a bad request");
    };
    assert_eq!(err.status(), 400);
}

#[test]
fn unknown_route_is_not_found() {
    let state = seeded_state("api_not_found");
    for uri in ["/nope", "/reload"] {
        let Err(err) = handle(request("GET", uri), &state) else {
            panic!("expected {uri} to be missing");
        };
        assert_eq!(err.status(), 404);
    }
}

#[test]
fn reload_imports_raw_files_and_refreshes_cache() {
    let path = write_raw_file(
        "mobile_de",
        json!([
            { "url": "https://m.de/1", "title": "XC60", "price_eur": 21000, "mileage_km": 70000, "year": 2018 },
            { "url": "https://m.de/2", "title": "XC60", "price_eur": 19000, "mileage_km": 95000, "year": 2017 }
        ]),
    );
    let state = make_state("api_reload", vec![path]);
    save_listings(&state.db, &[listing("stale", "Default", 1_000, 1, 2000)]).unwrap();

    // warm the cache with the stale row
    assert_eq!(get_json(&state, "/api/listings/summary")["total"], 1);

    let reports = {
        let resp = handle(request("POST", "/reload"), &state).unwrap();
        serde_json::from_str::<Value>(&body_string(resp)).unwrap()
    };
    assert_eq!(reports[0]["records_kept"], 2);

    let summary = get_json(&state, "/api/listings/summary");
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["sources"], json!([["mobile_de", 2]]));
}
