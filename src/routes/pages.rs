use askama::Template;
use axum::extract::{Path, RawQuery, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::auth::accounts;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::recipes::listing::{count_by_author, latest_by_author, page_from_query};
use crate::recipes::{self, list_recipes, RecipeScope, TagFilter};
use crate::relations;
use crate::routes::html::{
    recipe_cards, tag_buttons, Html, Nav, Pager, RecipeCard, RecipeLink, SubscribeButton,
    TagButton,
};
use crate::state::AppState;

/// Recipes shown per author on the subscriptions page.
const AUTHOR_PREVIEW: u32 = 3;

#[derive(Template)]
#[template(path = "pages/recipes.html")]
pub struct RecipeListTemplate {
    pub nav: Nav,
    pub heading: String,
    pub base_path: String,
    pub tags: Vec<TagButton>,
    pub recipes: Vec<RecipeCard>,
    pub pager: Pager,
    pub subscribe: SubscribeButton,
}

#[derive(Template)]
#[template(path = "pages/recipe.html")]
pub struct RecipeTemplate {
    pub nav: Nav,
    pub recipe: RecipeCard,
    pub description: String,
    pub image: String,
    pub ingredients: Vec<crate::db::models::Amount>,
    pub can_edit: bool,
    pub subscribe: SubscribeButton,
}

pub struct AuthorCard {
    pub id: i64,
    pub name: String,
    pub recipes: Vec<RecipeLink>,
    /// Recipes beyond the preview.
    pub more: u32,
}

#[derive(Template)]
#[template(path = "pages/subscriptions.html")]
pub struct SubscriptionsTemplate {
    pub nav: Nav,
    pub authors: Vec<AuthorCard>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/recipes/{id}", get(recipe_detail))
        .route("/authors/{id}", get(author_page))
        .route("/favorites", get(favorites))
        .route("/subscriptions", get(subscriptions))
}

fn listing(
    state: &AppState,
    viewer: &MaybeUser,
    query: Option<&str>,
    scope: RecipeScope,
    heading: String,
    base_path: String,
) -> AppResult<Response> {
    let filter = TagFilter::from_query(query);
    let page_number = page_from_query(query)?;

    let conn = state.db.get()?;
    let page = list_recipes(&conn, scope, &filter, page_number)?;

    let subscribe = match scope {
        RecipeScope::Author(author_id) => SubscribeButton::new(&conn, viewer.id(), author_id)?,
        _ => SubscribeButton {
            visible: false,
            author_id: 0,
            following: false,
        },
    };

    Ok(Html(RecipeListTemplate {
        nav: Nav::for_viewer(&conn, viewer)?,
        heading,
        base_path,
        tags: tag_buttons(&conn, &filter)?,
        recipes: recipe_cards(&conn, &page.recipes, viewer.id())?,
        pager: Pager::new(&page, &filter),
        subscribe,
    })
    .into_response())
}

/// GET /: every recipe, newest first
async fn index(
    State(state): State<AppState>,
    viewer: MaybeUser,
    RawQuery(query): RawQuery,
) -> AppResult<Response> {
    listing(
        &state,
        &viewer,
        query.as_deref(),
        RecipeScope::All,
        "Recipes".to_string(),
        "/".to_string(),
    )
}

/// GET /authors/{id}: one author's recipes
async fn author_page(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(author_id): Path<i64>,
    RawQuery(query): RawQuery,
) -> AppResult<Response> {
    let author = {
        let conn = state.db.get()?;
        accounts::get_user(&conn, author_id)?.ok_or(AppError::NotFound)?
    };
    listing(
        &state,
        &viewer,
        query.as_deref(),
        RecipeScope::Author(author_id),
        author.display_name().to_string(),
        format!("/authors/{}", author_id),
    )
}

/// GET /favorites: the viewer's favorite recipes
async fn favorites(
    State(state): State<AppState>,
    user: CurrentUser,
    RawQuery(query): RawQuery,
) -> AppResult<Response> {
    let scope = RecipeScope::FavoritesOf(user.id);
    listing(
        &state,
        &MaybeUser(Some(user)),
        query.as_deref(),
        scope,
        "Favorites".to_string(),
        "/favorites".to_string(),
    )
}

/// GET /recipes/{id}
async fn recipe_detail(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(recipe_id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let recipe = recipes::require_recipe(&conn, recipe_id)?;
    let card = recipe_cards(&conn, std::slice::from_ref(&recipe), viewer.id())?
        .pop()
        .ok_or(AppError::NotFound)?;

    Ok(Html(RecipeTemplate {
        nav: Nav::for_viewer(&conn, &viewer)?,
        ingredients: recipes::recipe_amounts(&conn, recipe.id)?,
        can_edit: viewer.id() == Some(recipe.author_id),
        subscribe: SubscribeButton::new(&conn, viewer.id(), recipe.author_id)?,
        description: recipe.description,
        image: recipe.image.unwrap_or_default(),
        recipe: card,
    })
    .into_response())
}

/// GET /subscriptions: followed authors with their latest recipes
async fn subscriptions(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    let conn = state.db.get()?;

    let mut authors = Vec::new();
    for author in relations::followed_authors(&conn, user.id)? {
        let latest = latest_by_author(&conn, author.id, AUTHOR_PREVIEW)?;
        let total = count_by_author(&conn, author.id)?;
        authors.push(AuthorCard {
            id: author.id,
            name: author.display_name().to_string(),
            more: total.saturating_sub(latest.len() as u32),
            recipes: latest.iter().map(RecipeLink::from).collect(),
        });
    }

    let viewer = MaybeUser(Some(user));
    Ok(Html(SubscriptionsTemplate {
        nav: Nav::for_viewer(&conn, &viewer)?,
        authors,
    })
    .into_response())
}
