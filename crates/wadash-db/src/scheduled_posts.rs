//! Database operations for `scheduled_posts` and `scheduled_post_groups`.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use wadash_core::PostStatus;

use crate::page::{Page, Paginated, Pagination};
use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from `scheduled_posts`, joined with its assembly and creator.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ScheduledPostRow {
    pub id: i64,
    pub title: String,
    pub message_text: Option<String>,
    pub audio_file: Option<String>,
    pub video_file: Option<String>,
    pub image_file: Option<String>,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub is_sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub status: String,
    pub admin_notes: Option<String>,
    pub completion_file: Option<String>,
    pub created_by_id: i64,
    pub created_by_username: Option<String>,
    pub created_by_email: Option<String>,
    pub assembly_id: i64,
    pub assembly_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from `scheduled_post_groups`.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PostGroupRow {
    pub id: i64,
    pub post_id: i64,
    pub group_name: String,
    pub assembly_name: String,
}

#[derive(Debug, Clone)]
pub struct NewScheduledPost<'a> {
    pub title: &'a str,
    pub message_text: Option<&'a str>,
    pub audio_file: Option<&'a str>,
    pub video_file: Option<&'a str>,
    pub image_file: Option<&'a str>,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub created_by_id: i64,
    pub assembly_id: i64,
    pub assembly_name: &'a str,
    pub groups: &'a [String],
}

/// Admin listing filters; `None` disables a filter.
#[derive(Debug, Clone, Default)]
pub struct PostFilters {
    pub status: Option<PostStatus>,
    pub assembly: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: PostStatus,
    /// Blank notes leave the stored notes unchanged.
    pub admin_notes: Option<String>,
    pub completion_file: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub running: i64,
    pub completed: i64,
    pub failed: i64,
    pub cancelled: i64,
}

const POST_SELECT: &str = "SELECT p.id, p.title, p.message_text, p.audio_file, p.video_file, \
            p.image_file, p.scheduled_date, p.scheduled_time, p.is_sent, p.sent_at, p.status, \
            p.admin_notes, p.completion_file, p.created_by_id, \
            u.username AS created_by_username, u.email AS created_by_email, \
            p.assembly_id, a.name AS assembly_name, p.created_at, p.updated_at \
     FROM scheduled_posts p \
     LEFT JOIN users u ON u.id = p.created_by_id \
     LEFT JOIN assemblies a ON a.id = p.assembly_id";

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts a post and its target groups in one transaction and returns the
/// new post id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; nothing is written then.
pub async fn create_scheduled_post(
    pool: &PgPool,
    new: &NewScheduledPost<'_>,
) -> Result<i64, DbError> {
    let mut tx = pool.begin().await?;

    let post_id: i64 = sqlx::query_scalar(
        "INSERT INTO scheduled_posts \
             (title, message_text, audio_file, video_file, image_file, \
              scheduled_date, scheduled_time, created_by_id, assembly_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING id",
    )
    .bind(new.title)
    .bind(new.message_text)
    .bind(new.audio_file)
    .bind(new.video_file)
    .bind(new.image_file)
    .bind(new.scheduled_date)
    .bind(new.scheduled_time)
    .bind(new.created_by_id)
    .bind(new.assembly_id)
    .fetch_one(&mut *tx)
    .await?;

    for group in new.groups {
        sqlx::query(
            "INSERT INTO scheduled_post_groups (post_id, group_name, assembly_name) \
             VALUES ($1, $2, $3)",
        )
        .bind(post_id)
        .bind(group)
        .bind(new.assembly_name)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(post_id)
}

/// Sets the status, and for `completed` also `is_sent` and `sent_at`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown id, or [`DbError::Sqlx`] if
/// the update fails.
pub async fn update_post_status(
    pool: &PgPool,
    id: i64,
    update: &StatusUpdate,
) -> Result<ScheduledPostRow, DbError> {
    let completed = update.status == PostStatus::Completed;
    let notes = update
        .admin_notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let result = sqlx::query(
        "UPDATE scheduled_posts \
         SET status = $1, \
             admin_notes = COALESCE($2, admin_notes), \
             completion_file = COALESCE($3, completion_file), \
             is_sent = CASE WHEN $4 THEN true ELSE is_sent END, \
             sent_at = CASE WHEN $4 THEN NOW() ELSE sent_at END, \
             updated_at = NOW() \
         WHERE id = $5",
    )
    .bind(update.status.as_str())
    .bind(notes)
    .bind(update.completion_file.as_deref())
    .bind(completed)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    get_scheduled_post(pool, id).await
}

/// Deletes a post; its target groups go with it.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown id, or [`DbError::Sqlx`] if
/// the delete fails.
pub async fn delete_scheduled_post(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM scheduled_posts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown id, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_scheduled_post(pool: &PgPool, id: i64) -> Result<ScheduledPostRow, DbError> {
    sqlx::query_as::<_, ScheduledPostRow>(&format!("{POST_SELECT} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Posts created by one user, latest schedule first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn list_scheduled_posts_for_user(
    pool: &PgPool,
    user_id: i64,
    page: Page,
) -> Result<Paginated<ScheduledPostRow>, DbError> {
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM scheduled_posts WHERE created_by_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

    let items = sqlx::query_as::<_, ScheduledPostRow>(&format!(
        "{POST_SELECT} WHERE p.created_by_id = $1 \
         ORDER BY p.scheduled_date DESC, p.scheduled_time DESC, p.id DESC \
         LIMIT $2 OFFSET $3"
    ))
    .bind(user_id)
    .bind(page.per_page)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok(Paginated {
        items,
        pagination: Pagination::new(page, total),
    })
}

/// Every user's posts, newest first, with optional status, assembly name and
/// scheduled-date filters.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn admin_list_scheduled_posts(
    pool: &PgPool,
    filters: &PostFilters,
    page: Page,
) -> Result<Paginated<ScheduledPostRow>, DbError> {
    const FILTER: &str = "($1::text IS NULL OR p.status = $1) \
           AND ($2::text IS NULL OR a.name = $2) \
           AND ($3::date IS NULL OR p.scheduled_date = $3)";

    let status = filters.status.map(PostStatus::as_str);

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM scheduled_posts p \
         LEFT JOIN assemblies a ON a.id = p.assembly_id \
         WHERE {FILTER}"
    ))
    .bind(status)
    .bind(filters.assembly.as_deref())
    .bind(filters.date)
    .fetch_one(pool)
    .await?;

    let items = sqlx::query_as::<_, ScheduledPostRow>(&format!(
        "{POST_SELECT} WHERE {FILTER} \
         ORDER BY p.created_at DESC, p.id DESC \
         LIMIT $4 OFFSET $5"
    ))
    .bind(status)
    .bind(filters.assembly.as_deref())
    .bind(filters.date)
    .bind(page.per_page)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok(Paginated {
        items,
        pagination: Pagination::new(page, total),
    })
}

/// Post counts per status; statuses with no posts report zero.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn post_status_counts(pool: &PgPool) -> Result<StatusCounts, DbError> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM scheduled_posts GROUP BY status")
            .fetch_all(pool)
            .await?;
    Ok(fold_status_counts(&rows))
}

fn fold_status_counts(rows: &[(String, i64)]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for (status, n) in rows {
        match status.parse::<PostStatus>() {
            Ok(PostStatus::Pending) => counts.pending += n,
            Ok(PostStatus::Running) => counts.running += n,
            Ok(PostStatus::Completed) => counts.completed += n,
            Ok(PostStatus::Failed) => counts.failed += n,
            Ok(PostStatus::Cancelled) => counts.cancelled += n,
            Err(_) => {}
        }
        counts.total += n;
    }
    counts
}

/// Target groups for a batch of posts, in insertion order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_post_groups(
    pool: &PgPool,
    post_ids: &[i64],
) -> Result<Vec<PostGroupRow>, DbError> {
    if post_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, PostGroupRow>(
        "SELECT id, post_id, group_name, assembly_name \
         FROM scheduled_post_groups \
         WHERE post_id = ANY($1) \
         ORDER BY post_id, id",
    )
    .bind(post_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_counts_fill_missing_statuses() {
        let counts = fold_status_counts(&[("pending".to_string(), 3), ("failed".to_string(), 1)]);
        assert_eq!(
            counts,
            StatusCounts {
                total: 4,
                pending: 3,
                failed: 1,
                ..StatusCounts::default()
            }
        );
    }
}
