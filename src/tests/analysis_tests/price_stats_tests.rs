use crate::analysis::{compute_price_statistics, median_difference};
use crate::tests::utils::listing;

#[test]
fn statistics_per_source() {
    let listings = vec![
        listing("mobile_de", "Default", 10_000, 1, 2015),
        listing("mobile_de", "Default", 20_000, 2, 2015),
        listing("mobile_de", "Default", 30_000, 3, 2015),
        listing("mobile_de", "Default", 40_000, 4, 2015),
        listing("polovni_automobili", "Default", 15_000, 5, 2015),
    ];

    let stats = compute_price_statistics(&listings);
    assert_eq!(stats.len(), 2);

    let de = &stats[0];
    assert_eq!(de.source, "mobile_de");
    assert_eq!(de.count, 4);
    assert!((de.mean - 25_000.0).abs() < 1e-9);
    assert!((de.median - 25_000.0).abs() < 1e-9);
    assert!((de.p25 - 17_500.0).abs() < 1e-9);
    assert!((de.p75 - 32_500.0).abs() < 1e-9);
    assert!((de.std.unwrap() - 12_909.944487358056).abs() < 1e-6);
    assert!(de.p25 <= de.median && de.median <= de.p75);

    let rs = &stats[1];
    assert_eq!(rs.count, 1);
    assert!(rs.std.is_none());
    assert_eq!(rs.median, 15_000.0);
}

#[test]
fn no_listings_no_statistics() {
    assert!(compute_price_statistics(&[]).is_empty());
    assert!(median_difference(&[]).is_none());
}

#[test]
fn median_difference_needs_two_sources() {
    let two = compute_price_statistics(&[
        listing("mobile_de", "Default", 24_000, 1, 2015),
        listing("polovni_automobili", "Default", 20_000, 2, 2015),
    ]);
    let diff = median_difference(&two).unwrap();
    assert_eq!(diff.base_source, "mobile_de");
    assert_eq!(diff.other_source, "polovni_automobili");
    assert!((diff.percent - (-16.666666666666664)).abs() < 1e-9);

    let one = compute_price_statistics(&[listing("mobile_de", "Default", 24_000, 1, 2015)]);
    assert!(median_difference(&one).is_none());
}

#[test]
fn statistics_are_idempotent() {
    let listings = crate::tests::utils::two_market_listings(25, 0.1);
    assert_eq!(compute_price_statistics(&listings), compute_price_statistics(&listings));
}
