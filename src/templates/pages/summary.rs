use crate::analysis::{FitResult, HedonicModel, MedianDifference, PriceStatistics, QuantileCorridor, TopDeal};
use crate::templates::{card, desktop_layout, fit_note, money};
use maud::{html, Markup};

pub struct SummaryVm {
    pub total: usize,
    pub source_counts: Vec<(String, usize)>,
    pub corridor: Option<QuantileCorridor>,
    pub top_deals: Vec<TopDeal>,
    /// Search group the statistics below were computed for.
    pub selected_group: Option<String>,
    pub price_stats: Vec<PriceStatistics>,
    pub median_difference: Option<MedianDifference>,
    pub hedonic: FitResult<HedonicModel>,
}

pub fn summary_page(vm: &SummaryVm) -> Markup {
    desktop_layout(
        "Car market comparison",
        html! {
            main class="container" {
                h1 { "Car market comparison" }
                p { "Found " strong { (vm.total) } " listings for the current filters." }

                @if vm.total == 0 {
                    p { "No listings match these filters." }
                } @else {
                    p {
                        "Listings per source: "
                        @for (i, (source, count)) in vm.source_counts.iter().enumerate() {
                            @if i > 0 { ", " }
                            strong { (source) } ": " (count)
                        }
                    }

                    @if let Some(c) = &vm.corridor {
                        (card("Price corridor", html! {
                            p { "25–75%: " (money(c.p25)) " – " (money(c.p75)) }
                            p { "10–90%: " (money(c.p10)) " – " (money(c.p90)) }
                        }))
                    }

                    (card("Two cheapest listings per mileage range", deals_table(&vm.top_deals)))

                    @if let Some(group) = &vm.selected_group {
                        (card(&format!("Price statistics for {group}"), stats_table(&vm.price_stats, vm.median_difference.as_ref())))
                    }

                    (card("Market premium (hedonic model)", hedonic_section(&vm.hedonic)))
                }
            }
        },
    )
}

fn deals_table(deals: &[TopDeal]) -> Markup {
    html! {
        table class="deals_table" {
            thead {
                tr {
                    th { "#" } th { "Mileage" } th { "Group" } th { "Title" }
                    th { "Price" } th { "Km" } th { "Year" } th { "Link" }
                }
            }
            tbody {
                @for (i, d) in deals.iter().enumerate() {
                    tr {
                        td { (i + 1) }
                        td { (d.mileage_bin) }
                        td { (d.comparison_group) }
                        td { (d.listing.title) }
                        td { (money(d.listing.price as f64)) }
                        td { (d.listing.mileage) }
                        td { (d.listing.year) }
                        td { a href=(d.listing.url) target="_blank" { "Open ↗" } }
                    }
                }
            }
        }
    }
}

fn stats_table(stats: &[PriceStatistics], diff: Option<&MedianDifference>) -> Markup {
    html! {
        table {
            thead {
                tr {
                    th { "Source" } th { "Listings" } th { "Mean" } th { "Median" }
                    th { "Std" } th { "25th" } th { "75th" }
                }
            }
            tbody {
                @for s in stats {
                    tr {
                        td { (s.source) }
                        td { (s.count) }
                        td { (money(s.mean)) }
                        td { (money(s.median)) }
                        td { (s.std.map(money).unwrap_or_else(|| "–".to_string())) }
                        td { (money(s.p25)) }
                        td { (money(s.p75)) }
                    }
                }
            }
        }
        @match diff {
            Some(d) => p {
                strong { "Median difference (" (d.other_source) " vs " (d.base_source) "): " }
                (format!("{:+.2}%", d.percent))
            },
            None => p { "A median difference needs exactly two sources." },
        }
    }
}

fn hedonic_section(fit: &FitResult<HedonicModel>) -> Markup {
    match fit {
        Err(reason) => fit_note(reason),
        Ok(model) => html! {
            p { "Reference market: " strong { (model.reference_market) } }
            ul {
                @for p in &model.premiums {
                    li {
                        strong { (p.market) } ": "
                        (format!("{:+.1}%", p.premium_pct))
                        " (95% CI " (format!("{:+.1}%", p.ci_low_pct)) " to " (format!("{:+.1}%", p.ci_high_pct))
                        ", p = " (format!("{:.3}", p.p_value)) ")"
                    }
                }
            }
            p {
                "R² = " (format!("{:.3}", model.diagnostics.r_squared))
                ", n = " (model.diagnostics.n_obs)
            }
        },
    }
}
