use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db;
use crate::db::models::User;
use crate::error::{AppError, AppResult, ValidationErrors};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Account fields supplied at signup.
#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub password: &'a str,
}

impl NewAccount<'_> {
    fn validate(&self) -> AppResult<()> {
        let mut errors = ValidationErrors::new();
        let username = self.username.trim();
        if username.is_empty() {
            errors.add("username", "Username is required");
        } else if username.chars().count() > 150 {
            errors.add("username", "Username must be at most 150 characters");
        }
        if !self.email.contains('@') {
            errors.add("email", "Enter a valid email address");
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
            );
        }
        errors.into_result()
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Create an account with a bcrypt hash of the password.
pub fn create_user(conn: &Connection, account: &NewAccount<'_>, cost: u32) -> AppResult<User> {
    account.validate()?;
    let hash = bcrypt::hash(account.password, cost)?;

    let inserted = conn.execute(
        "INSERT INTO users (username, email, first_name, password_hash) VALUES (?1, ?2, ?3, ?4)",
        params![
            account.username.trim(),
            account.email.trim(),
            account.first_name.trim(),
            hash
        ],
    );
    match inserted {
        Ok(_) => {}
        Err(e) if db::is_unique_violation(&e) => {
            return Err(AppError::Conflict("Username is already taken".into()));
        }
        Err(e) => return Err(e.into()),
    }

    let id = conn.last_insert_rowid();
    tracing::info!(user_id = id, username = account.username.trim(), "Account created");
    get_user(conn, id)?.ok_or_else(|| AppError::Internal("Created user vanished".into()))
}

pub fn get_user(conn: &Connection, id: i64) -> AppResult<Option<User>> {
    Ok(conn
        .query_row(
            "SELECT id, username, email, first_name, created_at FROM users WHERE id = ?1",
            params![id],
            user_from_row,
        )
        .optional()?)
}

/// Check a username/password pair. `None` covers both an unknown user and a
/// wrong password.
pub fn authenticate(conn: &Connection, username: &str, password: &str) -> AppResult<Option<User>> {
    let found: Option<(String, User)> = conn
        .query_row(
            "SELECT password_hash, id, username, email, first_name, created_at
             FROM users WHERE username = ?1",
            params![username.trim()],
            |row| {
                Ok((
                    row.get(0)?,
                    User {
                        id: row.get(1)?,
                        username: row.get(2)?,
                        email: row.get(3)?,
                        first_name: row.get(4)?,
                        created_at: row.get(5)?,
                    },
                ))
            },
        )
        .optional()?;

    let Some((hash, user)) = found else {
        return Ok(None);
    };
    if bcrypt::verify(password, &hash)? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}
