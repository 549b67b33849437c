use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{post, put};
use axum::{Json, Router};
use serde::Serialize;

use crate::db::models::Recipe;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::recipes::{self, RecipeInput};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RecipeCreated {
    pub id: i64,
    pub slug: String,
}

impl From<Recipe> for RecipeCreated {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id,
            slug: recipe.slug,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/recipes", post(create))
        .route("/api/recipes/{id}", put(update).delete(remove))
}

/// POST /api/recipes
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<RecipeInput>,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;
    let recipe = recipes::create_recipe(&mut conn, user.id, &input)?;
    Ok((StatusCode::CREATED, Json(RecipeCreated::from(recipe))).into_response())
}

/// PUT /api/recipes/{id}: full replacement, author only
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(recipe_id): Path<i64>,
    Json(input): Json<RecipeInput>,
) -> AppResult<Json<RecipeCreated>> {
    let mut conn = state.db.get()?;
    let recipe = recipes::update_recipe(&mut conn, user.id, recipe_id, &input)?;
    Ok(Json(RecipeCreated::from(recipe)))
}

/// DELETE /api/recipes/{id}: author only
async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(recipe_id): Path<i64>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    recipes::delete_recipe(&conn, user.id, recipe_id)?;
    Ok(StatusCode::NO_CONTENT)
}
