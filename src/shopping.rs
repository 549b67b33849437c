//! Shopping list: every ingredient of every recipe the user put in their
//! purchases, summed per ingredient and unit.

use std::fmt::Write as _;

use rusqlite::{params, Connection};

use crate::db::models::Recipe;
use crate::error::AppResult;
use crate::recipes::repository::{recipe_from_row, RECIPE_COLUMNS};

pub const REPORT_FILENAME: &str = "purchaselist.txt";
pub const REPORT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub name: String,
    pub unit: String,
    pub total: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ShoppingList {
    pub recipes: Vec<Recipe>,
    pub items: Vec<ShoppingItem>,
}

/// Recipes in the user's shopping list, by name.
pub fn purchased_recipes(conn: &Connection, user_id: i64) -> AppResult<Vec<Recipe>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM recipes r
         JOIN purchases p ON p.recipe_id = r.id
         WHERE p.user_id = ?1
         ORDER BY r.name, r.id",
        RECIPE_COLUMNS
    ))?;
    let recipes = stmt
        .query_map(params![user_id], recipe_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(recipes)
}

/// Quantities summed per `(ingredient name, unit)` across all purchased
/// recipes, sorted by name. Rows without an ingredient name are skipped.
pub fn aggregate(conn: &Connection, user_id: i64) -> AppResult<Vec<ShoppingItem>> {
    let mut stmt = conn.prepare(
        "SELECT i.name, i.unit, SUM(a.quantity)
         FROM purchases p
         JOIN amounts a ON a.recipe_id = p.recipe_id
         JOIN ingredients i ON i.id = a.ingredient_id
         WHERE p.user_id = ?1
           AND i.name IS NOT NULL
           AND TRIM(i.name) <> ''
         GROUP BY i.name, i.unit
         ORDER BY i.name, i.unit",
    )?;
    let items = stmt
        .query_map(params![user_id], |row| {
            Ok(ShoppingItem {
                name: row.get(0)?,
                unit: row.get(1)?,
                total: row.get::<_, i64>(2)?.max(0) as u64,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

/// Both sections of the list, read inside one transaction so they describe
/// the same set of purchases.
pub fn build(conn: &Connection, user_id: i64) -> AppResult<ShoppingList> {
    let tx = conn.unchecked_transaction()?;
    let list = read_list(&tx, user_id)?;
    tx.commit()?;
    Ok(list)
}

fn read_list(conn: &Connection, user_id: i64) -> AppResult<ShoppingList> {
    Ok(ShoppingList {
        recipes: purchased_recipes(conn, user_id)?,
        items: aggregate(conn, user_id)?,
    })
}

impl ShoppingList {
    /// Plain-text report served as the downloadable list.
    pub fn render(&self) -> String {
        let mut out = String::from("Shopping list\n");

        out.push_str("Recipes:\n");
        for recipe in &self.recipes {
            let _ = writeln!(out, "- {}", recipe.name);
        }

        out.push('\n');

        out.push_str("Ingredients:\n");
        for item in &self.items {
            let _ = writeln!(out, "- {} ({}): {}", item.name, item.unit, item.total);
        }
        out
    }
}
