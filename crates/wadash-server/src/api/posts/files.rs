use axum::{
    extract::{Path, State},
    response::Response,
    Extension,
};
use wadash_core::MediaKind;
use wadash_db::ScheduledPostRow;

use crate::api::download::{attachment, media_content_type, read_stored, OCTET_STREAM};
use crate::api::{ensure_admin, ApiError, AppState};
use crate::middleware::{Principal, RequestId};

use super::load_post;

fn media_path(post: &ScheduledPostRow, kind: MediaKind) -> Option<&str> {
    match kind {
        MediaKind::Image => post.image_file.as_deref(),
        MediaKind::Audio => post.audio_file.as_deref(),
        MediaKind::Video => post.video_file.as_deref(),
    }
}

/// GET /api/admin/download-file/{id}/{file_type}
pub(in crate::api) async fn admin_download_media(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path((id, file_type)): Path<(i64, String)>,
) -> Result<Response, ApiError> {
    let rid = &req_id.0;
    ensure_admin(rid, principal)?;
    let post = load_post(&state.pool, rid, id).await?;

    let missing = format!("No {file_type} file found for this post");
    let relative = file_type
        .parse::<MediaKind>()
        .ok()
        .and_then(|kind| media_path(&post, kind))
        .ok_or_else(|| ApiError::new(rid, "not_found", missing))?;

    let (file_name, bytes) =
        read_stored(rid, &state.data, relative, "File not found on server").await?;
    Ok(attachment(&file_name, media_content_type(&file_name), bytes))
}

/// GET /api/scheduled-posts/{id}/completion-file
pub(in crate::api) async fn download_completion_file(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let rid = &req_id.0;
    let post = load_post(&state.pool, rid, id).await?;
    if !principal.may_act_on(post.created_by_id) {
        return Err(ApiError::new(
            rid,
            "forbidden",
            "You can only download completion files for your own posts",
        ));
    }
    let Some(relative) = post.completion_file.as_deref() else {
        return Err(ApiError::new(rid, "not_found", "No completion file found for this post"));
    };

    let (file_name, bytes) =
        read_stored(rid, &state.data, relative, "Completion file not found on server").await?;
    Ok(attachment(&file_name, OCTET_STREAM, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::posts::fixtures::post_row;

    #[test]
    fn media_slots_map_to_columns() {
        let post = post_row();
        assert_eq!(
            media_path(&post, MediaKind::Image),
            Some("North/scheduled_content/image/poster.png")
        );
        assert_eq!(media_path(&post, MediaKind::Audio), None);
    }
}
