//! Recipe input as it arrives from the client, and its validation against
//! the catalog.

use std::collections::HashSet;

use rusqlite::Connection;
use serde::Deserialize;

use crate::catalog;
use crate::error::{AppResult, ValidationErrors};

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 1000;
const MAX_SLUG_LEN: usize = 50;

/// One `(ingredient, quantity)` pair. `unit` only needs to be given when the
/// catalog holds the same name under several units.
///
/// `name` and `unit` are trimmed, then matched exactly (case included)
/// against the catalog, whose loader stores trimmed values.
#[derive(Debug, Clone, Deserialize)]
pub struct IngredientLine {
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeInput {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub cook_time: Option<i64>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<IngredientLine>,
}

/// A recipe whose every reference has been resolved to a catalog id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRecipe {
    pub name: String,
    pub description: String,
    pub cook_time: Option<u32>,
    pub image: Option<String>,
    pub slug: String,
    pub tag_ids: Vec<i64>,
    /// `(ingredient_id, quantity)`
    pub amounts: Vec<(i64, u32)>,
}

impl RecipeInput {
    /// Check every field and resolve names to ids. All problems are
    /// reported together, keyed by field.
    pub fn validate(&self, conn: &Connection) -> AppResult<ValidRecipe> {
        let mut errors = ValidationErrors::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", "Name is required");
        } else if name.chars().count() > MAX_NAME_LEN {
            errors.add(
                "name",
                format!("Name must be at most {} characters", MAX_NAME_LEN),
            );
        }

        let description = self.description.trim();
        if description.is_empty() {
            errors.add("description", "Description is required");
        } else if description.chars().count() > MAX_DESCRIPTION_LEN {
            errors.add(
                "description",
                format!(
                    "Description must be at most {} characters",
                    MAX_DESCRIPTION_LEN
                ),
            );
        }

        let cook_time = match self.cook_time {
            None => None,
            Some(minutes) => match u32::try_from(minutes) {
                Ok(m) if m >= 1 => Some(m),
                _ => {
                    errors.add("cook_time", "Cooking time must be at least 1 minute");
                    None
                }
            },
        };

        let mut tag_ids = Vec::new();
        for slug in &self.tags {
            let slug = slug.trim();
            match catalog::tag_by_slug(conn, slug)? {
                Some(tag) if !tag_ids.contains(&tag.id) => tag_ids.push(tag.id),
                Some(_) => {}
                None => errors.add("tags", format!("Unknown tag \"{}\"", slug)),
            }
        }

        let amounts = self.resolve_ingredients(conn, &mut errors)?;

        errors.into_result()?;
        Ok(ValidRecipe {
            name: name.to_string(),
            description: description.to_string(),
            cook_time,
            image: self
                .image
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            slug: slugify(name),
            tag_ids,
            amounts,
        })
    }

    fn resolve_ingredients(
        &self,
        conn: &Connection,
        errors: &mut ValidationErrors,
    ) -> AppResult<Vec<(i64, u32)>> {
        if self.ingredients.is_empty() {
            errors.add("ingredients", "At least one ingredient is required");
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let mut amounts = Vec::with_capacity(self.ingredients.len());
        for line in &self.ingredients {
            let name = line.name.trim();

            let quantity = match u32::try_from(line.quantity) {
                Ok(q) if q >= 1 => Some(q),
                _ => {
                    errors.add(
                        "ingredients",
                        format!("Quantity of \"{}\" must be a positive number", name),
                    );
                    None
                }
            };

            let mut candidates = catalog::ingredients_named(conn, name)?;
            if let Some(unit) = line.unit.as_deref().map(str::trim) {
                candidates.retain(|i| i.unit == unit);
            }
            let ingredient = match candidates.as_slice() {
                [only] => only,
                [] => {
                    errors.add("ingredients", format!("Unknown ingredient \"{}\"", name));
                    continue;
                }
                _ => {
                    errors.add(
                        "ingredients",
                        format!("Ingredient \"{}\" needs a unit", name),
                    );
                    continue;
                }
            };

            if !seen.insert(ingredient.id) {
                errors.add(
                    "ingredients",
                    format!("Ingredient \"{}\" is listed twice", name),
                );
                continue;
            }
            if let Some(quantity) = quantity {
                amounts.push((ingredient.id, quantity));
            }
        }
        Ok(amounts)
    }
}

/// Lowercase, alphanumerics kept, every other run collapsed to one `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    let slug: String = slug.chars().take(MAX_SLUG_LEN).collect();
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "recipe".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::error::AppError;

    fn seed(conn: &Connection) {
        conn.execute_batch(
            "INSERT INTO ingredients (id, name, unit) VALUES
                (1, 'Salt', 'g'), (2, 'Salt', 'pinch'), (3, 'Flour', 'g');
             INSERT INTO tags (id, name, slug, checkbox_style) VALUES
                (1, 'Breakfast', 'breakfast', 'orange');",
        )
        .unwrap();
    }

    fn line(name: &str, unit: Option<&str>, quantity: i64) -> IngredientLine {
        IngredientLine {
            name: name.to_string(),
            unit: unit.map(str::to_string),
            quantity,
        }
    }

    fn input(ingredients: Vec<IngredientLine>) -> RecipeInput {
        RecipeInput {
            name: "  Pancakes  ".into(),
            description: "Mix and fry".into(),
            cook_time: Some(20),
            image: None,
            tags: vec!["breakfast".into()],
            ingredients,
        }
    }

    fn errors_of(result: AppResult<ValidRecipe>) -> ValidationErrors {
        match result {
            Err(AppError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn names_match_exactly_after_trimming() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);

        let valid = input(vec![line("  Flour ", None, 200), line("Salt", Some(" g "), 2)])
            .validate(&conn)
            .unwrap();
        assert_eq!(valid.amounts, vec![(3, 200), (1, 2)]);

        let errors = errors_of(input(vec![line("flour", None, 1)]).validate(&conn));
        assert!(errors.get("ingredients").is_some());
    }

    #[test]
    fn valid_input_resolves_ids() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);

        let valid = input(vec![line("Flour", None, 200), line("Salt", Some("g"), 2)])
            .validate(&conn)
            .unwrap();
        assert_eq!(valid.name, "Pancakes");
        assert_eq!(valid.slug, "pancakes");
        assert_eq!(valid.cook_time, Some(20));
        assert_eq!(valid.tag_ids, vec![1]);
        assert_eq!(valid.amounts, vec![(3, 200), (1, 2)]);
    }

    #[test]
    fn missing_ingredients_is_an_error() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);

        let errors = errors_of(input(vec![]).validate(&conn));
        assert_eq!(
            errors.get("ingredients"),
            Some(&["At least one ingredient is required".to_string()][..])
        );
    }

    #[test]
    fn unknown_and_ambiguous_ingredients_are_errors() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);

        let errors = errors_of(
            input(vec![line("Sugar", None, 1), line("Salt", None, 1)]).validate(&conn),
        );
        let messages = errors.get("ingredients").unwrap();
        assert!(messages.iter().any(|m| m.contains("Unknown ingredient \"Sugar\"")));
        assert!(messages.iter().any(|m| m.contains("needs a unit")));
    }

    #[test]
    fn name_match_is_exact() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);

        let errors = errors_of(input(vec![line("flour", None, 1)]).validate(&conn));
        assert!(errors.get("ingredients").is_some());
    }

    #[test]
    fn bad_quantities_duplicates_and_fields_are_collected() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);

        let mut bad = input(vec![line("Flour", None, 0), line("Flour", None, 5)]);
        bad.name = " ".into();
        bad.cook_time = Some(0);
        bad.tags = vec!["brunch".into()];
        let errors = errors_of(bad.validate(&conn));

        assert!(errors.get("name").is_some());
        assert!(errors.get("cook_time").is_some());
        assert!(errors.get("tags").is_some());
        let messages = errors.get("ingredients").unwrap();
        assert!(messages.iter().any(|m| m.contains("positive")));
        assert!(messages.iter().any(|m| m.contains("listed twice")));
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Grandma's  Apple Pie!"), "grandma-s-apple-pie");
        assert_eq!(slugify("  --  "), "recipe");
        assert_eq!(slugify("Борщ по-домашнему"), "борщ-по-домашнему");
        assert_eq!(slugify(&"a".repeat(80)).len(), 50);
    }
}
