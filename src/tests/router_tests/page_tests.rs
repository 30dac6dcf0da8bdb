use crate::db::listings::save_listings;
use crate::router::handle;
use crate::tests::router_tests::api_tests::{body_string, make_state, request};
use crate::tests::utils::two_market_listings;

#[test]
fn summary_page_renders() {
    let state = make_state("page_summary", Vec::new());
    save_listings(&state.db, &two_market_listings(20, 0.15)).unwrap();

    let resp = handle(request("GET", "/?model=Volvo%20XC60"), &state).unwrap();
    assert_eq!(resp.status(), 200);

    let body = body_string(resp);
    assert!(body.contains("Car market comparison"));
    assert!(body.contains("Found <strong>40</strong> listings"));
    assert!(body.contains("Price statistics for Volvo XC60"));
    assert!(body.contains("Reference market: <strong>mobile_de</strong>"));
}

#[test]
fn summary_page_with_no_listings() {
    let state = make_state("page_empty", Vec::new());

    let body = body_string(handle(request("GET", "/"), &state).unwrap());
    assert!(body.contains("No listings match these filters."));
}

#[test]
fn error_page_carries_status() {
    let err = crate::errors::ServerError::BadRequest("year_min must be a number".into());
    let resp = crate::responses::html_error_response(err);
    assert_eq!(resp.status(), 400);
    assert!(body_string(resp).contains("year_min must be a number"));
}

#[test]
fn top_deals_export_is_a_workbook() {
    let state = make_state("page_export", Vec::new());
    save_listings(&state.db, &two_market_listings(10, 0.1)).unwrap();

    let resp = handle(request("GET", "/export/top-deals.xlsx"), &state).unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers()["Content-Type"]
        .to_str()
        .unwrap()
        .contains("spreadsheetml"));
    assert_eq!(
        resp.headers()["Content-Disposition"],
        "attachment; filename=\"top_deals.xlsx\""
    );

    // xlsx files are zip archives
    let mut resp = resp;
    let mut bytes = Vec::new();
    std::io::Read::read_to_end(&mut resp.body_mut().reader(), &mut bytes).unwrap();
    assert_eq!(&bytes[..2], b"PK");
}
