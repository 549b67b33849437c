//! Recipe listings: tag filtering and fixed-size pagination.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

use crate::db::models::Recipe;
use crate::error::{AppError, AppResult};
use crate::recipes::repository::{recipe_from_row, RECIPE_COLUMNS};

pub const PAGE_SIZE: u32 = 6;

/// Tag slugs selected through the `tag` and `filters` query parameters.
/// Both keys may repeat and a value may hold several comma-separated slugs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    slugs: Vec<String>,
}

impl TagFilter {
    pub fn new<I, S>(slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::default();
        for slug in slugs {
            filter.push(slug.as_ref());
        }
        filter
    }

    pub fn from_query(query: Option<&str>) -> Self {
        let mut filter = Self::default();
        let Some(query) = query else {
            return filter;
        };
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if key == "tag" || key == "filters" {
                filter.push(&value);
            }
        }
        filter
    }

    fn push(&mut self, value: &str) {
        for slug in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if !self.slugs.iter().any(|s| s == slug) {
                self.slugs.push(slug.to_string());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }

    pub fn slugs(&self) -> &[String] {
        &self.slugs
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.slugs.iter().any(|s| s == slug)
    }

    /// Query string with `slug` switched on or off, for the tag buttons.
    pub fn toggled_query(&self, slug: &str) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for s in &self.slugs {
            if s != slug {
                serializer.append_pair("tag", s);
            }
        }
        if !self.contains(slug) {
            serializer.append_pair("tag", slug);
        }
        serializer.finish()
    }

    /// Query string for another page with the same tags selected.
    pub fn page_query(&self, page: u32) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for s in &self.slugs {
            serializer.append_pair("tag", s);
        }
        serializer.append_pair("page", &page.to_string());
        serializer.finish()
    }
}

/// Requested page number from `?page=`. Missing means the first page;
/// anything that is not a positive integer is a not-found.
pub fn page_from_query(query: Option<&str>) -> AppResult<u32> {
    let raw = query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(key, _)| key == "page")
            .map(|(_, value)| value.into_owned())
    });
    match raw {
        None => Ok(1),
        Some(value) => match value.trim().parse::<u32>() {
            Ok(page) if page >= 1 => Ok(page),
            _ => Err(AppError::NotFound),
        },
    }
}

/// Which recipes a listing starts from, before tag filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeScope {
    All,
    Author(i64),
    FavoritesOf(i64),
}

#[derive(Debug, Clone)]
pub struct RecipePage {
    pub recipes: Vec<Recipe>,
    pub number: u32,
    pub num_pages: u32,
    pub total: u32,
}

impl RecipePage {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }
}

/// `WHERE` clause and its parameters for a scope plus a tag filter. The tag
/// condition is an `IN` subquery, so a recipe matching several selected tags
/// still appears once.
fn conditions(scope: RecipeScope, filter: &TagFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    match scope {
        RecipeScope::All => {}
        RecipeScope::Author(author_id) => {
            clauses.push("r.author_id = ?".to_string());
            values.push(Value::Integer(author_id));
        }
        RecipeScope::FavoritesOf(user_id) => {
            clauses.push(
                "r.id IN (SELECT f.recipe_id FROM favorites f WHERE f.user_id = ?)".to_string(),
            );
            values.push(Value::Integer(user_id));
        }
    }

    if !filter.is_empty() {
        let placeholders = vec!["?"; filter.slugs().len()].join(", ");
        clauses.push(format!(
            "r.id IN (SELECT rt.recipe_id FROM recipe_tags rt
                      JOIN tags t ON t.id = rt.tag_id
                      WHERE t.slug IN ({}))",
            placeholders
        ));
        values.extend(filter.slugs().iter().cloned().map(Value::Text));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    (where_sql, values)
}

/// One page of a listing, newest first.
pub fn list_recipes(
    conn: &Connection,
    scope: RecipeScope,
    filter: &TagFilter,
    page: u32,
) -> AppResult<RecipePage> {
    let (where_sql, mut values) = conditions(scope, filter);

    let total: u32 = conn.query_row(
        &format!("SELECT COUNT(*) FROM recipes r {}", where_sql),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;
    let num_pages = total.div_ceil(PAGE_SIZE).max(1);
    if page == 0 || page > num_pages {
        return Err(AppError::NotFound);
    }

    values.push(Value::Integer(i64::from(PAGE_SIZE)));
    values.push(Value::Integer(i64::from((page - 1) * PAGE_SIZE)));
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM recipes r {} ORDER BY r.pub_date DESC, r.id DESC LIMIT ? OFFSET ?",
        RECIPE_COLUMNS, where_sql
    ))?;
    let recipes = stmt
        .query_map(params_from_iter(values.iter()), recipe_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RecipePage {
        recipes,
        number: page,
        num_pages,
        total,
    })
}

/// The `limit` newest recipes of an author.
pub fn latest_by_author(conn: &Connection, author_id: i64, limit: u32) -> AppResult<Vec<Recipe>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM recipes r WHERE r.author_id = ?1
         ORDER BY r.pub_date DESC, r.id DESC LIMIT ?2",
        RECIPE_COLUMNS
    ))?;
    let recipes = stmt
        .query_map(params![author_id, limit], recipe_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(recipes)
}

pub fn count_by_author(conn: &Connection, author_id: i64) -> AppResult<u32> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM recipes WHERE author_id = ?1",
        params![author_id],
        |row| row.get(0),
    )?)
}
