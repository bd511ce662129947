//! Database operations for the `users` table.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::page::{Page, Paginated, Pagination};
use crate::DbError;

/// A row from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// `user` or `admin`; enforced by a CHECK constraint.
    pub role: String,
    pub is_active: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const USER_COLUMNS: &str =
    "id, username, email, role, is_active, first_name, last_name, created_at, updated_at";

/// # Errors
///
/// Returns [`DbError::NotFound`] if no user has the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_user(pool: &PgPool, id: i64) -> Result<UserRow, DbError> {
    sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// One page of users, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn list_users(pool: &PgPool, page: Page) -> Result<Paginated<UserRow>, DbError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    let items = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT $1 OFFSET $2"
    ))
    .bind(page.per_page)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;
    Ok(Paginated {
        items,
        pagination: Pagination::new(page, total),
    })
}

/// Email addresses of active users with the given role.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_user_emails(pool: &PgPool, role: &str) -> Result<Vec<String>, DbError> {
    let emails = sqlx::query_scalar::<_, String>(
        "SELECT email FROM users WHERE role = $1 AND is_active = true ORDER BY id",
    )
    .bind(role)
    .fetch_all(pool)
    .await?;
    Ok(emails)
}
