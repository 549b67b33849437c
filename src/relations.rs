//! Favorite, purchase and follow toggles.
//!
//! Each relation is a set of `(user, target)` pairs kept unique by the
//! schema. Adding inserts with `ON CONFLICT DO NOTHING` and reports whether a
//! row was created; removing reports whether a row was deleted. Two racing
//! identical requests therefore end with one row, one `true` and one
//! `false`.

use rusqlite::{params, Connection};

use crate::db;
use crate::db::models::User;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// user -> recipe bookmark
    Favorite,
    /// user -> recipe in the shopping list
    Purchase,
    /// user -> author subscription
    Follow,
}

impl Relation {
    fn table(self) -> &'static str {
        match self {
            Relation::Favorite => "favorites",
            Relation::Purchase => "purchases",
            Relation::Follow => "follows",
        }
    }

    fn target_column(self) -> &'static str {
        match self {
            Relation::Favorite | Relation::Purchase => "recipe_id",
            Relation::Follow => "author_id",
        }
    }
}

/// Put `(user_id, target_id)` in the relation. `Ok(true)` when this call
/// created the row, `Ok(false)` when it was already there or the pair is a
/// self-follow.
pub fn add(
    conn: &Connection,
    relation: Relation,
    user_id: i64,
    target_id: i64,
) -> AppResult<bool> {
    if relation == Relation::Follow && user_id == target_id {
        tracing::debug!(user_id, "Ignoring self-follow");
        return Ok(false);
    }

    let sql = format!(
        "INSERT INTO {table} (user_id, {col}) VALUES (?1, ?2)
         ON CONFLICT(user_id, {col}) DO NOTHING",
        table = relation.table(),
        col = relation.target_column()
    );
    match conn.execute(&sql, params![user_id, target_id]) {
        Ok(inserted) => {
            tracing::debug!(?relation, user_id, target_id, inserted, "Relation add");
            Ok(inserted > 0)
        }
        Err(e) if db::is_unique_violation(&e) => Ok(false),
        Err(e) if db::is_foreign_key_violation(&e) => Err(AppError::NotFound),
        Err(e) => Err(e.into()),
    }
}

/// Take `(user_id, target_id)` out of the relation. `Ok(true)` when a row
/// was deleted.
pub fn remove(
    conn: &Connection,
    relation: Relation,
    user_id: i64,
    target_id: i64,
) -> AppResult<bool> {
    let sql = format!(
        "DELETE FROM {} WHERE user_id = ?1 AND {} = ?2",
        relation.table(),
        relation.target_column()
    );
    let deleted = conn.execute(&sql, params![user_id, target_id])?;
    tracing::debug!(?relation, user_id, target_id, deleted, "Relation remove");
    Ok(deleted > 0)
}

pub fn contains(
    conn: &Connection,
    relation: Relation,
    user_id: i64,
    target_id: i64,
) -> AppResult<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE user_id = ?1 AND {} = ?2)",
        relation.table(),
        relation.target_column()
    );
    Ok(conn.query_row(&sql, params![user_id, target_id], |row| row.get(0))?)
}

/// Number of pairs the user has in the relation.
pub fn count(conn: &Connection, relation: Relation, user_id: i64) -> AppResult<u32> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE user_id = ?1", relation.table());
    Ok(conn.query_row(&sql, params![user_id], |row| row.get(0))?)
}

/// Authors the user follows, by display name.
pub fn followed_authors(conn: &Connection, user_id: i64) -> AppResult<Vec<User>> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.username, u.email, u.first_name, u.created_at
         FROM follows f
         JOIN users u ON u.id = f.author_id
         WHERE f.user_id = ?1
         ORDER BY u.username",
    )?;
    let authors = stmt
        .query_map(params![user_id], |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                first_name: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(authors)
}
