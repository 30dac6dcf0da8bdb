use crate::db::connection::{init_db, Database};
use crate::domain::Listing;
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns a fresh test database using the production schema
pub fn make_db(prefix: &str) -> Database {
    let path = temp_path(prefix, "sqlite");
    let db = Database::new(path.to_string_lossy().to_string());
    init_db(&db, "sql/schema.sql").expect("Failed to initialize DB");
    db
}

/// Unique path in the system temp dir
pub fn temp_path(prefix: &str, ext: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "{prefix}_{}_{:?}.{ext}",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos(),
        std::thread::current().id()
    ))
}

pub fn listing(source: &str, group: &str, price: i64, mileage: i64, year: i32) -> Listing {
    Listing {
        url: format!("https://{source}.example/{group}/{price}/{mileage}/{year}"),
        title: format!("{group} {year}"),
        price,
        mileage,
        year,
        source: source.to_string(),
        search_group: group.to_string(),
    }
}

/// Two markets where "mobile_de" is priced `premium` above "polovni_automobili"
/// at equal mileage and age. `n` listings per market, deterministic noise.
pub fn two_market_listings(n: usize, premium: f64) -> Vec<Listing> {
    let mut out = Vec::with_capacity(2 * n);
    for i in 0..n {
        let mileage = 10_000 + ((i * 37_013) % 190_000) as i64;
        let year = 2013 + (i % 8) as i32;
        let age = (2025 - year) as f64;
        let noise = 0.01 * ((i as f64) * 1.7).sin();

        let log_base = 20_000f64.ln() - 2.5e-6 * mileage as f64 - 0.06 * age + noise;
        for (k, (source, factor)) in [("polovni_automobili", 1.0), ("mobile_de", 1.0 + premium)]
            .into_iter()
            .enumerate()
        {
            // different noise per market so the two rows are not identical
            let jitter = 0.01 * ((i as f64) * 0.9 + k as f64).cos();
            let price = (log_base + jitter).exp() * factor;
            let mut l = listing(source, "Volvo XC60", price.round() as i64, mileage, year);
            l.url = format!("https://{source}.example/{i}");
            out.push(l);
        }
    }
    out
}
