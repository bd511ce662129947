//! Database operations for the `assemblies` table.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::DbError;

const DUPLICATE_NAME: &str = "Assembly name already exists";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from `assemblies`, joined with the creator's username.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct AssemblyRow {
    pub id: i64,
    pub name: String,
    pub remarks: Option<String>,
    pub is_active: bool,
    pub created_by_id: i64,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAssembly<'a> {
    pub name: &'a str,
    pub remarks: Option<&'a str>,
    pub created_by_id: i64,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct AssemblyUpdate {
    pub name: Option<String>,
    pub remarks: Option<String>,
}

const ASSEMBLY_SELECT: &str = "SELECT a.id, a.name, a.remarks, a.is_active, a.created_by_id, \
            u.username AS created_by, a.created_at, a.updated_at \
     FROM assemblies a \
     LEFT JOIN users u ON u.id = a.created_by_id";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Active assemblies ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_assemblies(pool: &PgPool) -> Result<Vec<AssemblyRow>, DbError> {
    let rows = sqlx::query_as::<_, AssemblyRow>(&format!(
        "{ASSEMBLY_SELECT} WHERE a.is_active = true ORDER BY a.name"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetches an assembly by id, active or not.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_assembly(pool: &PgPool, id: i64) -> Result<AssemblyRow, DbError> {
    sqlx::query_as::<_, AssemblyRow>(&format!("{ASSEMBLY_SELECT} WHERE a.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_assembly_by_name(
    pool: &PgPool,
    name: &str,
) -> Result<Option<AssemblyRow>, DbError> {
    let row = sqlx::query_as::<_, AssemblyRow>(&format!("{ASSEMBLY_SELECT} WHERE a.name = $1"))
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::Duplicate`] if the name is taken, or [`DbError::Sqlx`]
/// if the insert fails.
pub async fn create_assembly(pool: &PgPool, new: &NewAssembly<'_>) -> Result<AssemblyRow, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO assemblies (name, remarks, created_by_id) \
         VALUES ($1, $2, $3) \
         RETURNING id",
    )
    .bind(new.name)
    .bind(new.remarks)
    .bind(new.created_by_id)
    .fetch_one(pool)
    .await
    .map_err(|e| DbError::unique_or(e, DUPLICATE_NAME))?;

    get_assembly(pool, id).await
}

/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown id, [`DbError::Duplicate`] if
/// the new name is taken, or [`DbError::Sqlx`] if the update fails.
pub async fn update_assembly(
    pool: &PgPool,
    id: i64,
    update: &AssemblyUpdate,
) -> Result<AssemblyRow, DbError> {
    let result = sqlx::query(
        "UPDATE assemblies \
         SET name = COALESCE($1, name), remarks = COALESCE($2, remarks), updated_at = NOW() \
         WHERE id = $3",
    )
    .bind(update.name.as_deref())
    .bind(update.remarks.as_deref())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| DbError::unique_or(e, DUPLICATE_NAME))?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    get_assembly(pool, id).await
}

/// Soft delete: the row stays for scheduled posts that reference it.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown id, or [`DbError::Sqlx`] if
/// the update fails.
pub async fn deactivate_assembly(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE assemblies SET is_active = false, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Returns the assembly with `name`, creating it first if needed. The flag is
/// `true` when a row was inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert or fetch fails.
pub async fn ensure_assembly(
    pool: &PgPool,
    new: &NewAssembly<'_>,
) -> Result<(AssemblyRow, bool), DbError> {
    let inserted: Option<i64> = sqlx::query_scalar(
        "INSERT INTO assemblies (name, remarks, created_by_id) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (name) DO NOTHING \
         RETURNING id",
    )
    .bind(new.name)
    .bind(new.remarks)
    .bind(new.created_by_id)
    .fetch_optional(pool)
    .await?;

    let row = get_assembly_by_name(pool, new.name)
        .await?
        .ok_or(DbError::NotFound)?;
    Ok((row, inserted.is_some()))
}
