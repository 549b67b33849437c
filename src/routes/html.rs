use std::collections::HashMap;

use askama::Template;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Datelike;
use rusqlite::Connection;

use crate::auth::accounts;
use crate::catalog;
use crate::db::models::{Recipe, Tag};
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::recipes::{RecipePage, TagFilter};
use crate::relations::{self, Relation};

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// Header and footer data shared by every page.
pub struct Nav {
    pub logged_in: bool,
    pub username: String,
    pub purchase_count: u32,
    pub year: i32,
}

impl Nav {
    pub fn for_viewer(conn: &Connection, viewer: &MaybeUser) -> AppResult<Self> {
        let (logged_in, username, purchase_count) = match &viewer.0 {
            Some(user) => (
                true,
                user.username.clone(),
                relations::count(conn, Relation::Purchase, user.id)?,
            ),
            None => (false, String::new(), 0),
        };
        Ok(Self {
            logged_in,
            username,
            purchase_count,
            year: chrono::Local::now().year(),
        })
    }
}

pub struct TagBadge {
    pub name: String,
    pub style: String,
}

impl From<&Tag> for TagBadge {
    fn from(tag: &Tag) -> Self {
        Self {
            name: tag.name.clone(),
            style: tag.checkbox_style.clone(),
        }
    }
}

/// Filter button. `query` is the query string with this tag toggled.
pub struct TagButton {
    pub name: String,
    pub style: String,
    pub active: bool,
    pub query: String,
}

pub fn tag_buttons(conn: &Connection, filter: &TagFilter) -> AppResult<Vec<TagButton>> {
    Ok(catalog::all_tags(conn)?
        .into_iter()
        .map(|tag| TagButton {
            active: filter.contains(&tag.slug),
            query: filter.toggled_query(&tag.slug),
            name: tag.name,
            style: tag.checkbox_style,
        })
        .collect())
}

pub struct RecipeCard {
    pub id: i64,
    pub name: String,
    pub author_id: i64,
    pub author_name: String,
    /// Minutes, empty when unknown.
    pub cook_time: String,
    pub tags: Vec<TagBadge>,
    pub is_favorite: bool,
    pub in_purchases: bool,
}

/// Cards for `recipes` as seen by `viewer_id`.
pub fn recipe_cards(
    conn: &Connection,
    recipes: &[Recipe],
    viewer_id: Option<i64>,
) -> AppResult<Vec<RecipeCard>> {
    let mut authors: HashMap<i64, String> = HashMap::new();
    let mut cards = Vec::with_capacity(recipes.len());

    for recipe in recipes {
        if !authors.contains_key(&recipe.author_id) {
            let name = accounts::get_user(conn, recipe.author_id)?
                .map(|u| u.display_name().to_string())
                .unwrap_or_default();
            authors.insert(recipe.author_id, name);
        }

        let (is_favorite, in_purchases) = match viewer_id {
            Some(user_id) => (
                relations::contains(conn, Relation::Favorite, user_id, recipe.id)?,
                relations::contains(conn, Relation::Purchase, user_id, recipe.id)?,
            ),
            None => (false, false),
        };

        cards.push(RecipeCard {
            id: recipe.id,
            name: recipe.name.clone(),
            author_id: recipe.author_id,
            author_name: authors
                .get(&recipe.author_id)
                .cloned()
                .unwrap_or_default(),
            cook_time: cook_time_text(recipe.cook_time),
            tags: catalog::recipe_tags(conn, recipe.id)?
                .iter()
                .map(TagBadge::from)
                .collect(),
            is_favorite,
            in_purchases,
        });
    }
    Ok(cards)
}

pub fn cook_time_text(cook_time: Option<u32>) -> String {
    cook_time.map(|m| m.to_string()).unwrap_or_default()
}

/// Plain recipe link used in compact lists.
pub struct RecipeLink {
    pub id: i64,
    pub name: String,
    pub cook_time: String,
}

impl From<&Recipe> for RecipeLink {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.clone(),
            cook_time: cook_time_text(recipe.cook_time),
        }
    }
}

pub struct Pager {
    pub number: u32,
    pub num_pages: u32,
    pub has_prev: bool,
    pub prev_query: String,
    pub has_next: bool,
    pub next_query: String,
}

impl Pager {
    pub fn new(page: &RecipePage, filter: &TagFilter) -> Self {
        Self {
            number: page.number,
            num_pages: page.num_pages,
            has_prev: page.has_previous(),
            prev_query: filter.page_query(page.number.saturating_sub(1).max(1)),
            has_next: page.has_next(),
            next_query: filter.page_query(page.number + 1),
        }
    }
}

/// Follow button on author and recipe pages.
pub struct SubscribeButton {
    pub visible: bool,
    pub author_id: i64,
    pub following: bool,
}

impl SubscribeButton {
    /// Shown to signed-in users looking at someone else's work.
    pub fn new(conn: &Connection, viewer_id: Option<i64>, author_id: i64) -> AppResult<Self> {
        let (visible, following) = match viewer_id {
            Some(user_id) if user_id != author_id => (
                true,
                relations::contains(conn, Relation::Follow, user_id, author_id)?,
            ),
            _ => (false, false),
        };
        Ok(Self {
            visible,
            author_id,
            following,
        })
    }
}
