use crate::analysis::trend::{score_listings, LinearPriceModel, TREND_GRID_POINTS};
use crate::analysis::{find_deal_candidates, fit_group_trends, Unavailable};
use crate::domain::Listing;
use crate::tests::utils::listing;

fn line_price(mileage: i64, year: i32) -> f64 {
    40_000.0 - 60.0 * (mileage as f64 / 1000.0) + 800.0 * (year - 2015) as f64
}

fn line_listings(n: usize) -> Vec<Listing> {
    (0..n)
        .map(|i| {
            let mileage = 5_000 + ((i * 23_011) % 180_000) as i64;
            let year = 2010 + (i % 10) as i32;
            let mut l = listing("mobile_de", "Volvo XC60", line_price(mileage, year).round() as i64, mileage, year);
            l.url = format!("https://mobile_de.example/{i}");
            l
        })
        .collect()
}

#[test]
fn linear_model_recovers_exact_line() {
    let listings = line_listings(30);
    let refs: Vec<&Listing> = listings.iter().collect();
    let model = LinearPriceModel::fit(&refs).unwrap();

    assert!((model.per_1000_km - (-60.0)).abs() < 0.05);
    assert!((model.per_year - 800.0).abs() < 0.5);
    for l in &listings {
        let predicted = model.predict(l.mileage as f64, l.year as f64);
        assert!((predicted - l.price as f64).abs() < 5.0);
    }
}

#[test]
fn linear_model_needs_three_listings() {
    let listings = line_listings(2);
    let refs: Vec<&Listing> = listings.iter().collect();
    assert!(matches!(
        LinearPriceModel::fit(&refs),
        Err(Unavailable::InsufficientData { .. })
    ));
}

#[test]
fn same_year_group_still_gets_a_trend() {
    let listings: Vec<Listing> = (0..5)
        .map(|i| listing("mobile_de", "Default", 30_000 - i * 1_000, 20_000 + i * 20_000, 2019))
        .collect();
    let refs: Vec<&Listing> = listings.iter().collect();
    let model = LinearPriceModel::fit(&refs).unwrap();

    let p = model.predict(60_000.0, 2019.0);
    assert!((p - 28_000.0).abs() < 1.0);
}

#[test]
fn group_trends_skip_small_groups() {
    let mut listings = line_listings(12);
    listings.push(listing("polovni_automobili", "Volvo XC60", 18_000, 90_000, 2016));
    listings.push(listing("polovni_automobili", "Volvo XC60", 17_000, 95_000, 2016));

    let trends = fit_group_trends(&listings);
    assert_eq!(trends.len(), 1);

    let t = &trends[0];
    assert_eq!(t.comparison_group, "Volvo XC60 (mobile_de)");
    assert_eq!(t.listings, 12);

    let trend = t.trend.as_ref().unwrap();
    assert_eq!(trend.curve.len(), TREND_GRID_POINTS);
    let lo = listings[..12].iter().map(|l| l.mileage).min().unwrap() as f64;
    let hi = listings[..12].iter().map(|l| l.mileage).max().unwrap() as f64;
    assert!((trend.curve[0].mileage - lo).abs() < 1e-6);
    assert!((trend.curve[TREND_GRID_POINTS - 1].mileage - hi).abs() < 1e-6);
    assert!(trend.curve.windows(2).all(|w| w[0].mileage <= w[1].mileage));
}

fn noisy_listings() -> Vec<Listing> {
    let mut listings: Vec<Listing> = line_listings(40)
        .into_iter()
        .enumerate()
        .map(|(i, mut l)| {
            l.price += (500.0 * (i as f64 * 1.3).sin()).round() as i64;
            l
        })
        .collect();

    let mut bargain = listing("mobile_de", "Volvo XC60", 0, 80_000, 2016);
    bargain.price = (line_price(80_000, 2016) - 1_300.0).round() as i64;
    bargain.url = "https://mobile_de.example/bargain".into();
    listings.push(bargain);

    let mut suspicious = listing("mobile_de", "Volvo XC60", 0, 60_000, 2018);
    suspicious.price = (line_price(60_000, 2018) * 0.7).round() as i64;
    suspicious.url = "https://mobile_de.example/suspicious".into();
    listings.push(suspicious);

    listings
}

#[test]
fn gross_underpricing_is_flagged_as_outlier() {
    let scored = score_listings(&noisy_listings()).unwrap();
    let suspicious = scored
        .iter()
        .find(|c| c.listing.url.ends_with("/suspicious"))
        .unwrap();

    assert!(suspicious.is_outlier);
    assert!(suspicious.z_score < -3.0);
    assert!(suspicious.residual < 0.0);
}

#[test]
fn candidates_are_cheap_but_not_outliers() {
    let candidates = find_deal_candidates(&noisy_listings()).unwrap();

    assert!(candidates.iter().all(|c| c.z_score < -1.5 && !c.is_outlier));
    assert!(candidates.windows(2).all(|w| w[0].z_score <= w[1].z_score));
    assert!(candidates.iter().all(|c| !c.listing.url.ends_with("/suspicious")));
    assert!(candidates.iter().any(|c| c.listing.url.ends_with("/bargain")));
}

#[test]
fn candidates_need_enough_listings() {
    assert!(find_deal_candidates(&line_listings(2)).is_err());
}

#[test]
fn empty_input() {
    assert!(fit_group_trends(&[]).is_empty());
    assert!(matches!(
        find_deal_candidates(&[]),
        Err(Unavailable::InsufficientData { .. })
    ));
}
