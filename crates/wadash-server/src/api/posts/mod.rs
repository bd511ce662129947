//! Scheduled-post handlers.
//!
//! - `POST   /api/scheduled-posts`                      - create (multipart)
//! - `GET    /api/scheduled-posts`                      - caller's posts
//! - `GET    /api/scheduled-posts/{id}`                 - one post (owner or admin)
//! - `PUT    /api/scheduled-posts/{id}/status`          - status change (JSON or multipart)
//! - `DELETE /api/scheduled-posts/{id}`                 - delete (owner or admin)
//! - `GET    /api/scheduled-posts/{id}/completion-file` - completion report download
//! - `GET    /api/admin/scheduled-posts`                - all posts, filtered
//! - `GET    /api/admin/scheduled-posts/stats`          - counts per status
//! - `GET    /api/admin/download-file/{id}/{file_type}` - attachment download

mod create;
mod files;
mod list;
mod status;

pub(super) use create::create_post;
pub(super) use files::{admin_download_media, download_completion_file};
pub(super) use list::{admin_list_posts, admin_post_stats, get_post, list_own_posts};
pub(super) use status::{delete_post, update_status};

use serde::Serialize;
use wadash_db::{PostGroupRow, ScheduledPostRow};
use wadash_notify::PostNotice;

use super::{map_db_error, map_lookup_error, ApiError};

const POST_NOT_FOUND: &str = "Post not found";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
pub(super) struct TargetGroup {
    pub group_name: String,
    pub assembly_name: String,
}

/// A post row with its target groups.
#[derive(Debug, Serialize)]
pub(super) struct PostView {
    #[serde(flatten)]
    pub post: ScheduledPostRow,
    pub target_groups: Vec<TargetGroup>,
}

impl PostView {
    fn new(post: ScheduledPostRow, groups: &[PostGroupRow]) -> Self {
        let target_groups = groups
            .iter()
            .filter(|g| g.post_id == post.id)
            .map(|g| TargetGroup {
                group_name: g.group_name.clone(),
                assembly_name: g.assembly_name.clone(),
            })
            .collect();
        Self {
            post,
            target_groups,
        }
    }
}

async fn load_post(
    pool: &sqlx::PgPool,
    request_id: &str,
    id: i64,
) -> Result<ScheduledPostRow, ApiError> {
    wadash_db::get_scheduled_post(pool, id)
        .await
        .map_err(|e| map_lookup_error(request_id, &e, POST_NOT_FOUND))
}

/// Attaches target groups to each row with one batch query.
async fn with_groups(
    pool: &sqlx::PgPool,
    request_id: &str,
    posts: Vec<ScheduledPostRow>,
) -> Result<Vec<PostView>, ApiError> {
    let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    let groups = wadash_db::list_post_groups(pool, &ids)
        .await
        .map_err(|e| map_db_error(request_id, &e))?;
    Ok(posts
        .into_iter()
        .map(|post| PostView::new(post, &groups))
        .collect())
}

/// Email-facing summary of a post.
fn notice(post: &ScheduledPostRow, group_count: usize) -> PostNotice {
    let media = [
        (post.image_file.is_some(), "Image"),
        (post.audio_file.is_some(), "Audio"),
        (post.video_file.is_some(), "Video"),
    ]
    .into_iter()
    .filter_map(|(present, label)| present.then_some(label))
    .collect();

    PostNotice {
        post_id: post.id,
        title: post.title.clone(),
        assembly_name: post
            .assembly_name
            .clone()
            .unwrap_or_else(|| "N/A".to_string()),
        scheduled_date: post.scheduled_date.format("%Y-%m-%d").to_string(),
        scheduled_time: post.scheduled_time.format("%H:%M").to_string(),
        group_count,
        message: post.message_text.clone().unwrap_or_default(),
        media,
        username: post
            .created_by_username
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        user_email: post.created_by_email.clone().unwrap_or_default(),
        completed_at: post
            .sent_at
            .map(|at| at.format(DATETIME_FORMAT).to_string()),
        admin_notes: post.admin_notes.clone(),
    }
}

#[cfg(test)]
pub(super) mod fixtures {
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
    use wadash_db::ScheduledPostRow;

    pub(crate) fn post_row() -> ScheduledPostRow {
        let at = Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).single().expect("time");
        ScheduledPostRow {
            id: 42,
            title: "Road works update".to_string(),
            message_text: Some("Work starts Monday".to_string()),
            audio_file: None,
            video_file: Some("North/scheduled_content/video/clip.mp4".to_string()),
            image_file: Some("North/scheduled_content/image/poster.png".to_string()),
            scheduled_date: NaiveDate::from_ymd_opt(2025, 1, 20).expect("date"),
            scheduled_time: NaiveTime::from_hms_opt(18, 5, 0).expect("time"),
            is_sent: false,
            sent_at: None,
            status: "pending".to_string(),
            admin_notes: None,
            completion_file: None,
            created_by_id: 7,
            created_by_username: Some("field".to_string()),
            created_by_email: Some("field@example.org".to_string()),
            assembly_id: 3,
            assembly_name: Some("North".to_string()),
            created_at: at,
            updated_at: at,
        }
    }
}
