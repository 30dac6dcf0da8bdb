// src/tests/analysis_tests/top_deals_tests.rs

use crate::analysis::binning::{bin_listings, MileageBinner};
use crate::analysis::bin_and_select_top_deals;
use crate::analysis::top_deals::TOP_DEALS_PER_GROUP;
use crate::tests::utils::listing;
use std::collections::HashMap;

#[test]
fn bins_are_contiguous_and_cover_the_max() {
    let listings = vec![
        listing("mobile_de", "Volvo XC60", 20_000, 0, 2018),
        listing("mobile_de", "Volvo XC60", 18_000, 100_000, 2017),
        listing("mobile_de", "Volvo XC60", 15_000, 149_999, 2016),
    ];

    let binner = MileageBinner::for_listings(&listings).unwrap();
    let bins = binner.bins();

    assert_eq!(binner.count(), 4);
    assert_eq!(bins.len(), 4);
    assert_eq!(bins[0].lo, 0);
    for pair in bins.windows(2) {
        assert_eq!(pair[0].hi, pair[1].lo);
    }
    assert!(bins.last().unwrap().contains(150_000));
    assert_eq!(binner.bin_for(100_000).unwrap().index, 2);
    assert_eq!(binner.bin_for(49_999).unwrap().index, 0);
}

#[test]
fn mileage_on_the_max_boundary_is_binned() {
    let listings = vec![
        listing("mobile_de", "Default", 10_000, 20_000, 2015),
        listing("mobile_de", "Default", 9_000, 100_000, 2014),
    ];

    let binned = bin_listings(&listings);
    assert_eq!(binned.len(), 2);
    assert_eq!(binned[1].0.index, 2);
    assert_eq!(binned[1].0.lo, 100_000);
}

#[test]
fn empty_input_gives_no_bins_or_deals() {
    assert!(MileageBinner::for_listings(&[]).is_none());
    assert!(bin_listings(&[]).is_empty());
    assert!(bin_and_select_top_deals(&[]).is_empty());
}

#[test]
fn keeps_two_cheapest_per_bin_and_group() {
    let listings = vec![
        listing("mobile_de", "Volvo XC60", 21_000, 10_000, 2019),
        listing("mobile_de", "Volvo XC60", 19_000, 20_000, 2019),
        listing("mobile_de", "Volvo XC60", 25_000, 30_000, 2020),
        listing("mobile_de", "Volvo XC60", 17_000, 40_000, 2018),
        listing("polovni_automobili", "Volvo XC60", 16_000, 15_000, 2018),
        listing("mobile_de", "Volvo XC60", 12_000, 60_000, 2016),
    ];

    let deals = bin_and_select_top_deals(&listings);

    let mut per_group: HashMap<(usize, String), Vec<i64>> = HashMap::new();
    for d in &deals {
        per_group
            .entry((d.bin_index, d.comparison_group.clone()))
            .or_default()
            .push(d.listing.price);
    }
    for prices in per_group.values() {
        assert!(prices.len() <= TOP_DEALS_PER_GROUP);
        assert!(prices.windows(2).all(|w| w[0] <= w[1]));
    }

    let first_bin_mobile = &per_group[&(0, "Volvo XC60 (mobile_de)".to_string())];
    assert_eq!(first_bin_mobile, &vec![17_000, 19_000]);

    let first_bin_polovni = &per_group[&(0, "Volvo XC60 (polovni_automobili)".to_string())];
    assert_eq!(first_bin_polovni, &vec![16_000]);

    assert_eq!(per_group[&(1, "Volvo XC60 (mobile_de)".to_string())], vec![12_000]);
    assert_eq!(deals.len(), 4);
}

#[test]
fn output_is_ordered_by_bin_group_rank() {
    let listings = vec![
        listing("polovni_automobili", "Audi Q5", 14_000, 70_000, 2015),
        listing("mobile_de", "Audi Q5", 22_000, 5_000, 2020),
        listing("mobile_de", "Audi Q5", 20_000, 7_000, 2020),
        listing("polovni_automobili", "Audi Q5", 21_000, 9_000, 2020),
    ];

    let deals = bin_and_select_top_deals(&listings);
    let keys: Vec<(usize, &str, usize)> = deals
        .iter()
        .map(|d| (d.bin_index, d.comparison_group.as_str(), d.rank))
        .collect();

    assert_eq!(
        keys,
        vec![
            (0, "Audi Q5 (mobile_de)", 1),
            (0, "Audi Q5 (mobile_de)", 2),
            (0, "Audi Q5 (polovni_automobili)", 1),
            (1, "Audi Q5 (polovni_automobili)", 1),
        ]
    );
    assert_eq!(deals[0].mileage_bin, "0–50 thousand km");
    assert_eq!(deals[3].mileage_bin, "50–100 thousand km");
}

#[test]
fn equal_prices_keep_input_order() {
    let mut a = listing("mobile_de", "Default", 10_000, 1_000, 2015);
    a.url = "https://mobile_de.example/a".into();
    let mut b = listing("mobile_de", "Default", 10_000, 2_000, 2015);
    b.url = "https://mobile_de.example/b".into();
    let mut c = listing("mobile_de", "Default", 10_000, 3_000, 2015);
    c.url = "https://mobile_de.example/c".into();

    let deals = bin_and_select_top_deals(&[a, b, c]);
    let urls: Vec<&str> = deals.iter().map(|d| d.listing.url.as_str()).collect();
    assert_eq!(urls, vec!["https://mobile_de.example/a", "https://mobile_de.example/b"]);
}

#[test]
fn selection_is_idempotent() {
    let listings = crate::tests::utils::two_market_listings(40, 0.1);
    assert_eq!(
        bin_and_select_top_deals(&listings),
        bin_and_select_top_deals(&listings)
    );
}

#[test]
fn selected_prices_never_exceed_the_rest_of_their_group() {
    let listings = crate::tests::utils::two_market_listings(50, 0.15);
    let deals = bin_and_select_top_deals(&listings);

    let binned = bin_listings(&listings);
    for deal in &deals {
        let worst_selected = deals
            .iter()
            .filter(|d| d.bin_index == deal.bin_index && d.comparison_group == deal.comparison_group)
            .map(|d| d.listing.price)
            .max()
            .unwrap();

        for (bin, l) in &binned {
            let selected = deals.iter().any(|d| d.listing.url == l.url);
            if bin.index == deal.bin_index && l.comparison_group() == deal.comparison_group && !selected {
                assert!(worst_selected <= l.price);
            }
        }
    }
}
