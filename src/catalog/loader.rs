//! One-time load of the ingredient catalog and default tags.

use std::path::Path;

use rusqlite::{params, Connection};
use thiserror::Error;

/// Catalog shipped with the binary, used when no file is given.
pub const BUNDLED_INGREDIENTS: &str = include_str!("../../data/ingredients.csv");

/// `(name, slug, checkbox_style)` of the tags every installation starts with.
pub const DEFAULT_TAGS: &[(&str, &str, &str)] = &[
    ("Breakfast", "breakfast", "orange"),
    ("Lunch", "lunch", "green"),
    ("Dinner", "dinner", "purple"),
];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub ingredients_added: usize,
    pub tags_added: usize,
}

fn unquote(field: &str) -> &str {
    let field = field.trim();
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(field)
        .trim()
}

/// Parse `name,unit` lines. The unit is everything after the last comma, so
/// names may themselves contain commas.
pub fn parse_ingredients(text: &str) -> Result<Vec<(String, String)>, CatalogError> {
    let mut rows = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let (name, unit) = line.rsplit_once(',').ok_or_else(|| CatalogError::Parse {
            line: idx + 1,
            reason: "expected `name,unit`".into(),
        })?;
        let (name, unit) = (unquote(name), unquote(unit));
        if name.is_empty() || unit.is_empty() {
            return Err(CatalogError::Parse {
                line: idx + 1,
                reason: "name and unit must not be empty".into(),
            });
        }
        rows.push((name.to_string(), unit.to_string()));
    }
    Ok(rows)
}

/// Get-or-create every ingredient and the default tags in one transaction.
/// Re-running adds nothing.
pub fn load(conn: &mut Connection, ingredients_csv: &str) -> Result<LoadReport, CatalogError> {
    let ingredients = parse_ingredients(ingredients_csv)?;
    let tx = conn.transaction()?;
    let mut report = LoadReport::default();

    {
        let mut insert = tx.prepare(
            "INSERT INTO ingredients (name, unit) VALUES (?1, ?2)
             ON CONFLICT(name, unit) DO NOTHING",
        )?;
        for (name, unit) in &ingredients {
            report.ingredients_added += insert.execute(params![name, unit])?;
        }

        let mut insert_tag = tx.prepare(
            "INSERT INTO tags (name, slug, checkbox_style) VALUES (?1, ?2, ?3)
             ON CONFLICT(slug) DO NOTHING",
        )?;
        for (name, slug, style) in DEFAULT_TAGS {
            report.tags_added += insert_tag.execute(params![name, slug, style])?;
        }
    }

    tx.commit()?;
    tracing::info!(
        ingredients = report.ingredients_added,
        tags = report.tags_added,
        "Catalog loaded"
    );
    Ok(report)
}

/// Load from `path`, or from the bundled catalog when `path` is `None`.
pub fn load_from(conn: &mut Connection, path: Option<&Path>) -> Result<LoadReport, CatalogError> {
    match path {
        Some(path) => {
            tracing::info!("Loading catalog from {}", path.display());
            let text = std::fs::read_to_string(path)?;
            load(conn, &text)
        }
        None => load(conn, BUNDLED_INGREDIENTS),
    }
}
