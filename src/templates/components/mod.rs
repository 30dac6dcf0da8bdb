use crate::analysis::binning::group_thousands;
use crate::analysis::Unavailable;
use maud::{html, Markup};

pub fn card(title: &str, body: Markup) -> Markup {
    html! {
        section class="card" {
            h2 { (title) }
            div class="card-body" {
                (body)
            }
        }
    }
}

/// Shown in place of a statistic that could not be computed.
pub fn fit_note(reason: &Unavailable) -> Markup {
    html! {
        p class="unavailable" { "Not available: " (reason.to_string()) }
    }
}

/// 12345.6 -> "€12,346"
pub fn money(value: f64) -> String {
    if !value.is_finite() {
        return "–".to_string();
    }
    let rounded = value.round() as i64;
    let digits = group_thousands(rounded);
    match digits.strip_prefix('-') {
        Some(magnitude) => format!("-€{magnitude}"),
        None => format!("€{digits}"),
    }
}
