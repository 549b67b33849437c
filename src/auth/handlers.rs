use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::accounts::{self, NewAccount};
use crate::auth::session;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::cookie_value;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AccountResponse {
    pub id: i64,
    pub username: String,
}

impl From<User> for AccountResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", name)
}

fn signed_in(state: &AppState, status: StatusCode, user: User) -> AppResult<Response> {
    let conn = state.db.get()?;
    let token = session::create_session(&conn, user.id, state.config.auth.session_hours)?;
    let cookie = session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );

    Ok((
        status,
        [(header::SET_COOKIE, cookie)],
        Json(AccountResponse::from(user)),
    )
        .into_response())
}

/// POST /auth/signup: create an account and sign it in
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> AppResult<Response> {
    let user = {
        let conn = state.db.get()?;
        accounts::create_user(
            &conn,
            &NewAccount {
                username: &req.username,
                email: &req.email,
                first_name: &req.first_name,
                password: &req.password,
            },
            state.config.auth.bcrypt_cost,
        )?
    };

    signed_in(&state, StatusCode::CREATED, user)
}

/// POST /auth/login: verify the password and start a session
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Response> {
    let user = {
        let conn = state.db.get()?;
        accounts::authenticate(&conn, &req.username, &req.password)?
    };

    match user {
        Some(user) => {
            tracing::info!(user_id = user.id, "Login succeeded");
            signed_in(&state, StatusCode::OK, user)
        }
        None => {
            tracing::warn!(username = %req.username, "Login failed");
            Err(AppError::Unauthorized)
        }
    }
}

/// POST /auth/logout: delete session and redirect
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let cookie_name = &state.config.auth.cookie_name;
    if let Some(token) = cookie_value(&headers, cookie_name) {
        let conn = state.db.get()?;
        if let Err(e) = session::delete_session(&conn, token) {
            tracing::warn!("Failed to delete session: {}", e);
        }
    }

    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, "/".to_string()),
            (header::SET_COOKIE, clear_session_cookie(cookie_name)),
        ],
        "",
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_http_only_with_max_age() {
        let cookie = session_cookie("foodgram_session", "abc", 2);
        assert_eq!(
            cookie,
            "foodgram_session=abc; HttpOnly; SameSite=Strict; Path=/; Max-Age=7200"
        );
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        assert!(clear_session_cookie("foodgram_session").ends_with("Max-Age=0"));
    }
}
