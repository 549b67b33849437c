//! JSON endpoints used by the page scripts: favorite, purchase and
//! subscription toggles plus ingredient autocomplete.

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::accounts;
use crate::catalog::{self, IngredientSuggestion};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::recipes;
use crate::relations::{self, Relation};
use crate::state::AppState;

/// Target id as sent by the scripts: a JSON number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TargetId {
    Int(i64),
    Str(String),
}

impl TargetId {
    pub fn value(&self) -> AppResult<i64> {
        match self {
            TargetId::Int(id) => Ok(*id),
            TargetId::Str(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AppError::BadRequest(format!("Invalid id: {}", raw))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub id: TargetId,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct IngredientQuery {
    #[serde(default)]
    pub query: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/favorites", post(add_favorite))
        .route("/api/favorites/{recipe_id}", delete(remove_favorite))
        .route("/api/purchases", post(add_purchase))
        .route("/api/purchases/{recipe_id}", delete(remove_purchase))
        .route("/api/subscriptions", post(add_subscription))
        .route("/api/subscriptions/{author_id}", delete(remove_subscription))
        .route("/api/ingredients", get(ingredients))
}

fn require_author(conn: &rusqlite::Connection, author_id: i64) -> AppResult<()> {
    accounts::get_user(conn, author_id)?
        .map(|_| ())
        .ok_or(AppError::NotFound)
}

async fn add_favorite(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ToggleRequest>,
) -> AppResult<Json<ToggleResponse>> {
    let recipe_id = req.id.value()?;
    let conn = state.db.get()?;
    recipes::require_recipe(&conn, recipe_id)?;
    let success = relations::add(&conn, Relation::Favorite, user.id, recipe_id)?;
    Ok(Json(ToggleResponse { success }))
}

async fn remove_favorite(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(recipe_id): Path<i64>,
) -> AppResult<Json<ToggleResponse>> {
    let conn = state.db.get()?;
    recipes::require_recipe(&conn, recipe_id)?;
    let success = relations::remove(&conn, Relation::Favorite, user.id, recipe_id)?;
    Ok(Json(ToggleResponse { success }))
}

async fn add_purchase(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ToggleRequest>,
) -> AppResult<Json<ToggleResponse>> {
    let recipe_id = req.id.value()?;
    let conn = state.db.get()?;
    recipes::require_recipe(&conn, recipe_id)?;
    let success = relations::add(&conn, Relation::Purchase, user.id, recipe_id)?;
    Ok(Json(ToggleResponse { success }))
}

/// Removing a purchase never looks the recipe up.
async fn remove_purchase(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(recipe_id): Path<i64>,
) -> AppResult<Json<ToggleResponse>> {
    let conn = state.db.get()?;
    let success = relations::remove(&conn, Relation::Purchase, user.id, recipe_id)?;
    Ok(Json(ToggleResponse { success }))
}

async fn add_subscription(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ToggleRequest>,
) -> AppResult<Json<ToggleResponse>> {
    let author_id = req.id.value()?;
    let conn = state.db.get()?;
    require_author(&conn, author_id)?;
    let success = relations::add(&conn, Relation::Follow, user.id, author_id)?;
    Ok(Json(ToggleResponse { success }))
}

async fn remove_subscription(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(author_id): Path<i64>,
) -> AppResult<Json<ToggleResponse>> {
    let conn = state.db.get()?;
    require_author(&conn, author_id)?;
    let success = relations::remove(&conn, Relation::Follow, user.id, author_id)?;
    Ok(Json(ToggleResponse { success }))
}

/// GET /api/ingredients?query=: autocomplete for the recipe form
async fn ingredients(
    State(state): State<AppState>,
    Query(params): Query<IngredientQuery>,
) -> AppResult<Json<Vec<IngredientSuggestion>>> {
    let conn = state.db.get()?;
    let query = params.query.unwrap_or_default();
    Ok(Json(catalog::search_ingredients(&conn, &query)?))
}
