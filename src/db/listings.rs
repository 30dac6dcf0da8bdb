use crate::db::connection::Database;
use crate::domain::{clean_raw_listings, Listing, RawListing};
use crate::errors::ServerError;
use chrono::Utc;
use rusqlite::params;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Outcome of importing one scraper output file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub source: String,
    pub file_path: String,
    pub records_seen: usize,
    pub records_kept: usize,
}

/// The source name of a raw file is its stem: "data/raw/mobile_de.json" -> "mobile_de".
pub fn source_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn read_raw_file(path: &Path) -> Result<Vec<RawListing>, ServerError> {
    let file = File::open(path)
        .map_err(|e| ServerError::ImportError(format!("{}: {e}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ServerError::ImportError(format!("{}: {e}", path.display())))
}

/// A raw file read and cleaned, not yet written.
struct PreparedImport {
    report: ImportReport,
    listings: Vec<Listing>,
}

fn prepare_import(path: &Path) -> Result<PreparedImport, ServerError> {
    let source = source_from_path(path).ok_or_else(|| {
        ServerError::ImportError(format!("Cannot derive source from {}", path.display()))
    })?;

    let raw = read_raw_file(path)?;
    let records_seen = raw.len();
    let listings = clean_raw_listings(raw, &source);

    Ok(PreparedImport {
        report: ImportReport {
            source,
            file_path: path.display().to_string(),
            records_seen,
            records_kept: listings.len(),
        },
        listings,
    })
}

/// Writes prepared imports in one transaction, optionally replacing the
/// whole store. Nothing is written when any statement fails.
fn commit_imports(
    db: &Database,
    imports: &[PreparedImport],
    replace: bool,
) -> Result<(), ServerError> {
    let now = Utc::now().naive_utc();

    db.with_conn(|conn: &mut rusqlite::Connection| -> Result<(), ServerError> {
        let tx = conn
            .transaction()
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        if replace {
            tx.execute("DELETE FROM listings", [])
                .map_err(|e| ServerError::DbError(e.to_string()))?;
        }

        for import in imports {
            upsert_listings(&tx, &import.listings, now)?;

            let report = &import.report;
            tx.execute(
                "INSERT INTO import_runs (source, file_path, imported_at, records_seen, records_kept) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    report.source,
                    report.file_path,
                    now,
                    report.records_seen as i64,
                    report.records_kept as i64
                ],
            )
            .map_err(|e| ServerError::DbError(e.to_string()))?;
        }

        tx.commit()
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        Ok(())
    })
}

/// Reads, cleans and upserts one raw file.
pub fn import_raw_file(db: &Database, path: &Path) -> Result<ImportReport, ServerError> {
    let import = prepare_import(path)?;
    commit_imports(db, std::slice::from_ref(&import), false)?;

    let report = import.report;
    tracing::info!(
        source = %report.source,
        seen = report.records_seen,
        kept = report.records_kept,
        "imported raw listings"
    );
    Ok(report)
}

/// Replaces the store with the contents of the given files. Missing files
/// are skipped with a warning; an unreadable file aborts the reload and
/// leaves the previous listings in place.
pub fn reload_from_files(db: &Database, paths: &[impl AsRef<Path>]) -> Result<Vec<ImportReport>, ServerError> {
    let mut imports = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "raw data file not found, skipping");
            continue;
        }
        imports.push(prepare_import(path).inspect_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "reload aborted");
        })?);
    }

    commit_imports(db, &imports, true)?;

    if imports.is_empty() {
        tracing::warn!("no raw data files were imported");
    }
    for import in &imports {
        tracing::info!(
            source = %import.report.source,
            seen = import.report.records_seen,
            kept = import.report.records_kept,
            "imported raw listings"
        );
    }
    Ok(imports.into_iter().map(|i| i.report).collect())
}

/// Upserts listings keyed by URL: a re-scraped listing replaces its earlier copy.
pub fn save_listings(db: &Database, listings: &[Listing]) -> Result<(), ServerError> {
    let now = Utc::now().naive_utc();

    db.with_conn(|conn: &mut rusqlite::Connection| -> Result<(), ServerError> {
        let tx = conn
            .transaction()
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        upsert_listings(&tx, listings, now)?;

        tx.commit()
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        Ok(())
    })
}

fn upsert_listings(
    tx: &rusqlite::Transaction<'_>,
    listings: &[Listing],
    now: chrono::NaiveDateTime,
) -> Result<(), ServerError> {
    for listing in listings {
        tx.execute(
            r#"
            INSERT INTO listings (
                url, title, price_eur, mileage_km, year,
                source, search_group, first_seen_at, last_seen_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                price_eur = excluded.price_eur,
                mileage_km = excluded.mileage_km,
                year = excluded.year,
                source = excluded.source,
                search_group = excluded.search_group,
                last_seen_at = excluded.last_seen_at
            "#,
            params![
                listing.url,
                listing.title,
                listing.price,
                listing.mileage,
                listing.year,
                listing.source,
                listing.search_group,
                now,
                now
            ],
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;
    }
    Ok(())
}

pub fn count_listings(db: &Database) -> Result<i64, ServerError> {
    db.with_conn(|conn| {
        conn.query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))
            .map_err(|e| ServerError::DbError(e.to_string()))
    })
}

/// Every stored listing, in a stable order.
pub fn load_listings(db: &Database) -> Result<Vec<Listing>, ServerError> {
    db.with_conn(|conn| {
        let mut stmt = conn
            .prepare(
                r#"
                SELECT
                    url,           -- 0
                    title,         -- 1
                    price_eur,     -- 2
                    mileage_km,    -- 3
                    year,          -- 4
                    source,        -- 5
                    search_group   -- 6
                FROM listings
                ORDER BY source, search_group, url
                "#,
            )
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(Listing {
                    url: row.get(0)?,
                    title: row.get(1)?,
                    price: row.get(2)?,
                    mileage: row.get(3)?,
                    year: row.get(4)?,
                    source: row.get(5)?,
                    search_group: row.get(6)?,
                })
            })
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| ServerError::DbError(e.to_string()))?);
        }

        Ok(results)
    })
}
