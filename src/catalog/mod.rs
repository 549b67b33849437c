//! Ingredient and tag reference data.

pub mod loader;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::db::models::{Ingredient, Tag};
use crate::error::AppResult;

/// Autocomplete entry, shaped for the recipe form script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientSuggestion {
    pub title: String,
    pub dimension: String,
}

fn ingredient_from_row(row: &Row<'_>) -> rusqlite::Result<Ingredient> {
    Ok(Ingredient {
        id: row.get(0)?,
        name: row.get(1)?,
        unit: row.get(2)?,
    })
}

fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        checkbox_style: row.get(3)?,
    })
}

/// Ingredients whose name starts with `query`, ignoring case. Whitespace
/// around the query is dropped before matching.
///
/// SQLite's `LIKE` only folds ASCII, so it narrows ASCII queries and the
/// final prefix test runs here on Unicode-lowercased names.
pub fn search_ingredients(
    conn: &Connection,
    query: &str,
) -> AppResult<Vec<IngredientSuggestion>> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(Vec::new());
    }

    let pattern = if needle.is_ascii() {
        format!("{}%", escape_like(&needle))
    } else {
        "%".to_string()
    };
    let mut stmt = conn.prepare(
        "SELECT id, name, unit FROM ingredients
         WHERE name LIKE ?1 ESCAPE '\\'
         ORDER BY name, unit",
    )?;
    let candidates = stmt
        .query_map(params![pattern], ingredient_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(candidates
        .into_iter()
        .filter(|i| i.name.to_lowercase().starts_with(&needle))
        .map(|i| IngredientSuggestion {
            title: i.name,
            dimension: i.unit,
        })
        .collect())
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// All catalog entries with exactly this name (one per unit).
pub fn ingredients_named(conn: &Connection, name: &str) -> AppResult<Vec<Ingredient>> {
    let mut stmt =
        conn.prepare("SELECT id, name, unit FROM ingredients WHERE name = ?1 ORDER BY unit")?;
    let found = stmt
        .query_map(params![name], ingredient_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(found)
}

pub fn all_tags(conn: &Connection) -> AppResult<Vec<Tag>> {
    let mut stmt = conn.prepare("SELECT id, name, slug, checkbox_style FROM tags ORDER BY id")?;
    let tags = stmt
        .query_map([], tag_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

pub fn tag_by_slug(conn: &Connection, slug: &str) -> AppResult<Option<Tag>> {
    Ok(conn
        .query_row(
            "SELECT id, name, slug, checkbox_style FROM tags WHERE slug = ?1",
            params![slug],
            tag_from_row,
        )
        .optional()?)
}

/// Tags attached to a recipe, in tag order.
pub fn recipe_tags(conn: &Connection, recipe_id: i64) -> AppResult<Vec<Tag>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name, t.slug, t.checkbox_style
         FROM tags t
         JOIN recipe_tags rt ON rt.tag_id = t.id
         WHERE rt.recipe_id = ?1
         ORDER BY t.id",
    )?;
    let tags = stmt
        .query_map(params![recipe_id], tag_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn seed(conn: &Connection) {
        conn.execute_batch(
            "INSERT INTO ingredients (name, unit) VALUES
                ('Salt', 'g'), ('salt', 'pinch'), ('Sugar', 'g'), ('Яблоко', 'шт');
             INSERT INTO tags (name, slug, checkbox_style) VALUES
                ('Breakfast', 'breakfast', 'orange'), ('Lunch', 'lunch', 'green');",
        )
        .unwrap();
    }

    #[test]
    fn search_is_case_insensitive_prefix_match() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);

        let found = search_ingredients(&conn, "sa").unwrap();
        let titles: Vec<_> = found.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Salt", "salt"]);
        assert_eq!(found[1].dimension, "pinch");

        assert!(search_ingredients(&conn, "alt").unwrap().is_empty());
    }

    #[test]
    fn search_folds_non_ascii_case() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);

        let found = search_ingredients(&conn, "ябл").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Яблоко");
    }

    #[test]
    fn wildcards_in_query_are_literal() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);

        assert!(search_ingredients(&conn, "s_").unwrap().is_empty());
        assert!(search_ingredients(&conn, "%").unwrap().is_empty());
        assert_eq!(search_ingredients(&conn, " su ").unwrap()[0].title, "Sugar");
    }

    #[test]
    fn undecodable_row_is_an_error() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);
        conn.execute(
            "INSERT INTO ingredients (name, unit) VALUES (X'53616c7479', 'g')",
            [],
        )
        .unwrap();

        assert!(search_ingredients(&conn, "sa").is_err());
    }

    #[test]
    fn empty_query_returns_nothing() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);

        assert!(search_ingredients(&conn, "   ").unwrap().is_empty());
    }

    #[test]
    fn ingredients_named_is_exact() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);

        assert_eq!(ingredients_named(&conn, "Salt").unwrap().len(), 1);
        assert_eq!(ingredients_named(&conn, "salt").unwrap()[0].unit, "pinch");
        assert!(ingredients_named(&conn, "Sal").unwrap().is_empty());
    }

    #[test]
    fn tags_lookup() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);

        assert_eq!(all_tags(&conn).unwrap().len(), 2);
        assert_eq!(
            tag_by_slug(&conn, "lunch").unwrap().map(|t| t.name),
            Some("Lunch".to_string())
        );
        assert!(tag_by_slug(&conn, "dinner").unwrap().is_none());
    }
}
