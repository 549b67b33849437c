use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

use crate::db::models::{Amount, Recipe};
use crate::error::{AppError, AppResult};
use crate::recipes::form::{RecipeInput, ValidRecipe};

pub(crate) const RECIPE_COLUMNS: &str =
    "r.id, r.author_id, r.name, r.description, r.cook_time, r.slug, r.image, r.pub_date";

pub(crate) fn recipe_from_row(row: &Row<'_>) -> rusqlite::Result<Recipe> {
    Ok(Recipe {
        id: row.get(0)?,
        author_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        cook_time: row.get(4)?,
        slug: row.get(5)?,
        image: row.get(6)?,
        pub_date: row.get(7)?,
    })
}

pub fn get_recipe(conn: &Connection, id: i64) -> AppResult<Option<Recipe>> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM recipes r WHERE r.id = ?1", RECIPE_COLUMNS),
            params![id],
            recipe_from_row,
        )
        .optional()?)
}

pub fn require_recipe(conn: &Connection, id: i64) -> AppResult<Recipe> {
    get_recipe(conn, id)?.ok_or(AppError::NotFound)
}

/// Ingredient lines of a recipe, by ingredient name.
pub fn recipe_amounts(conn: &Connection, recipe_id: i64) -> AppResult<Vec<Amount>> {
    let mut stmt = conn.prepare(
        "SELECT i.id, i.name, i.unit, a.quantity
         FROM amounts a
         JOIN ingredients i ON i.id = a.ingredient_id
         WHERE a.recipe_id = ?1
         ORDER BY i.name, i.unit",
    )?;
    let amounts = stmt
        .query_map(params![recipe_id], |row| {
            Ok(Amount {
                ingredient_id: row.get(0)?,
                name: row.get(1)?,
                unit: row.get(2)?,
                quantity: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(amounts)
}

/// The one authorization rule for recipe mutations: only the author may
/// change a recipe. Anyone else is told the recipe does not exist.
pub fn ensure_owner(recipe: &Recipe, actor_id: i64) -> AppResult<()> {
    if recipe.author_id == actor_id {
        Ok(())
    } else {
        tracing::warn!(
            recipe_id = recipe.id,
            actor_id,
            "Rejected change to a recipe owned by someone else"
        );
        Err(AppError::NotFound)
    }
}

fn write_children(tx: &Transaction<'_>, recipe_id: i64, valid: &ValidRecipe) -> AppResult<()> {
    let mut amount = tx.prepare(
        "INSERT INTO amounts (recipe_id, ingredient_id, quantity) VALUES (?1, ?2, ?3)",
    )?;
    for (ingredient_id, quantity) in &valid.amounts {
        amount.execute(params![recipe_id, ingredient_id, quantity])?;
    }

    let mut tag = tx.prepare("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?1, ?2)")?;
    for tag_id in &valid.tag_ids {
        tag.execute(params![recipe_id, tag_id])?;
    }
    Ok(())
}

/// Validate and store a new recipe with its ingredients and tags.
pub fn create_recipe(
    conn: &mut Connection,
    author_id: i64,
    input: &RecipeInput,
) -> AppResult<Recipe> {
    let valid = input.validate(conn)?;

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO recipes (author_id, name, description, cook_time, slug, image)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            author_id,
            valid.name,
            valid.description,
            valid.cook_time,
            valid.slug,
            valid.image
        ],
    )?;
    let recipe_id = tx.last_insert_rowid();
    write_children(&tx, recipe_id, &valid)?;
    tx.commit()?;

    tracing::info!(recipe_id, author_id, "Recipe created");
    require_recipe(conn, recipe_id)
}

/// Replace a recipe's fields, ingredients and tags. Prior ingredient lines
/// and tag links are dropped, never merged.
///
/// The lookup, ownership check and writes share one immediate transaction,
/// so a recipe deleted by another request is reported as not found.
pub fn update_recipe(
    conn: &mut Connection,
    actor_id: i64,
    recipe_id: i64,
    input: &RecipeInput,
) -> AppResult<Recipe> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let recipe = require_recipe(&tx, recipe_id)?;
    ensure_owner(&recipe, actor_id)?;
    let valid = input.validate(&tx)?;

    let updated = tx.execute(
        "UPDATE recipes
         SET name = ?2, description = ?3, cook_time = ?4, slug = ?5,
             image = COALESCE(?6, image)
         WHERE id = ?1",
        params![
            recipe_id,
            valid.name,
            valid.description,
            valid.cook_time,
            valid.slug,
            valid.image
        ],
    )?;
    if updated == 0 {
        return Err(AppError::NotFound);
    }
    tx.execute("DELETE FROM amounts WHERE recipe_id = ?1", params![recipe_id])?;
    tx.execute(
        "DELETE FROM recipe_tags WHERE recipe_id = ?1",
        params![recipe_id],
    )?;
    write_children(&tx, recipe_id, &valid)?;
    let recipe = require_recipe(&tx, recipe_id)?;
    tx.commit()?;

    tracing::info!(recipe_id, "Recipe updated");
    Ok(recipe)
}

pub fn delete_recipe(conn: &Connection, actor_id: i64, recipe_id: i64) -> AppResult<()> {
    let recipe = require_recipe(conn, recipe_id)?;
    ensure_owner(&recipe, actor_id)?;
    let deleted = conn.execute(
        "DELETE FROM recipes WHERE id = ?1 AND author_id = ?2",
        params![recipe_id, actor_id],
    )?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }
    tracing::info!(recipe_id, "Recipe deleted");
    Ok(())
}
