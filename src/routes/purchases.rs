use askama::Template;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::error::AppResult;
use crate::extractors::{CurrentUser, MaybeUser};
use crate::routes::html::{Html, Nav, RecipeLink};
use crate::shopping::{self, REPORT_CONTENT_TYPE, REPORT_FILENAME};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/purchases.html")]
pub struct PurchasesTemplate {
    pub nav: Nav,
    pub recipes: Vec<RecipeLink>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/purchases", get(purchases_page))
        .route("/purchases/download", get(download))
}

/// GET /purchases: recipes in the shopping list
async fn purchases_page(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    let conn = state.db.get()?;
    let recipes = shopping::purchased_recipes(&conn, user.id)?;
    let viewer = MaybeUser(Some(user));

    Ok(Html(PurchasesTemplate {
        nav: Nav::for_viewer(&conn, &viewer)?,
        recipes: recipes.iter().map(RecipeLink::from).collect(),
    })
    .into_response())
}

/// GET /purchases/download: aggregated shopping list as a text attachment
async fn download(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    let list = {
        let conn = state.db.get()?;
        shopping::build(&conn, user.id)?
    };
    tracing::info!(
        user_id = user.id,
        recipes = list.recipes.len(),
        items = list.items.len(),
        "Shopping list downloaded"
    );

    Ok((
        [
            (header::CONTENT_TYPE, REPORT_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", REPORT_FILENAME),
            ),
        ],
        list.render(),
    )
        .into_response())
}
