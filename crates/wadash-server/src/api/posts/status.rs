use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::header::CONTENT_TYPE,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use wadash_analytics::uploads;
use wadash_core::PostStatus;
use wadash_db::StatusUpdate;
use wadash_notify::DeletedBy;

use crate::api::form::{FormData, UploadedFile};
use crate::api::{
    map_db_error, map_lookup_error, message, run_blocking, spawn_notification, ApiError,
    ApiResponse, AppState, MessageBody,
};
use crate::middleware::{Principal, RequestId};

use super::{load_post, with_groups, PostView, POST_NOT_FOUND};

#[derive(Debug, Default, Deserialize)]
struct StatusBody {
    #[serde(default)]
    status: String,
    #[serde(default)]
    admin_notes: String,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct StatusChanged {
    pub message: String,
    pub post: PostView,
}

/// Status change input from either body encoding.
#[derive(Debug)]
struct StatusInput {
    status: String,
    admin_notes: String,
    completion_file: Option<UploadedFile>,
}

async fn read_input(request_id: &str, request: Request) -> Result<StatusInput, ApiError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if is_multipart {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ApiError::new(request_id, "bad_request", e.body_text()))?;
        let mut form = FormData::read(request_id, multipart).await?;
        Ok(StatusInput {
            status: form.text("status").to_string(),
            admin_notes: form.text("admin_notes").to_string(),
            completion_file: form.take_file("completion_file"),
        })
    } else {
        let Json(body) = Json::<StatusBody>::from_request(request, &())
            .await
            .map_err(|e| ApiError::new(request_id, "bad_request", e.body_text()))?;
        Ok(StatusInput {
            status: body.status.trim().to_string(),
            admin_notes: body.admin_notes.trim().to_string(),
            completion_file: None,
        })
    }
}

fn parse_status(request_id: &str, raw: &str) -> Result<PostStatus, ApiError> {
    raw.parse::<PostStatus>().map_err(|_| {
        let valid: Vec<&str> = PostStatus::ALL.iter().map(|s| s.as_str()).collect();
        ApiError::new(
            request_id,
            "validation_error",
            format!("Invalid status. Must be one of: {}", valid.join(", ")),
        )
    })
}

/// PUT /api/scheduled-posts/{id}/status
pub(in crate::api) async fn update_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<ApiResponse<StatusChanged>>, ApiError> {
    let rid = &req_id.0;
    let post = load_post(&state.pool, rid, id).await?;
    if !principal.may_act_on(post.created_by_id) {
        return Err(ApiError::new(rid, "forbidden", "You can only update your own posts"));
    }

    let input = read_input(rid, request).await?;
    let status = parse_status(rid, &input.status)?;

    // Completion files only count when the post is being marked completed.
    let completion_file = match (status, input.completion_file) {
        (PostStatus::Completed, Some(file)) => {
            let Some(assembly) = post.assembly_name.clone() else {
                return Err(ApiError::new(rid, "not_found", "Assembly not found for this post"));
            };
            let data = state.data.clone();
            let stored = run_blocking(rid, move || {
                uploads::store_completion_file(&data, &assembly, &file.file_name, &file.bytes)
            })
            .await?;
            Some(stored.relative)
        }
        _ => None,
    };

    let updated = wadash_db::update_post_status(
        &state.pool,
        id,
        &StatusUpdate {
            status,
            admin_notes: Some(input.admin_notes),
            completion_file,
        },
    )
    .await
    .map_err(|e| map_lookup_error(rid, &e, POST_NOT_FOUND))?;

    tracing::info!(post_id = id, status = status.as_str(), user_id = principal.user_id, "post status updated");

    let mut views = with_groups(&state.pool, rid, vec![updated]).await?;
    let Some(view) = views.pop() else {
        return Err(ApiError::internal(rid));
    };
    let notice = super::notice(&view.post, view.target_groups.len());
    spawn_notification(&state.notifier, "post_status_changed", move |n| {
        n.status_changed(&notice, status)
    });

    Ok(ApiResponse::ok(StatusChanged {
        message: format!("Post status updated to {status}"),
        post: view,
    }))
}

/// DELETE /api/scheduled-posts/{id}
pub(in crate::api) async fn delete_post(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MessageBody>>, ApiError> {
    let rid = &req_id.0;
    let post = load_post(&state.pool, rid, id).await?;
    if !principal.may_act_on(post.created_by_id) {
        return Err(ApiError::new(rid, "forbidden", "You can only delete your own posts"));
    }

    let groups = wadash_db::list_post_groups(&state.pool, &[id])
        .await
        .map_err(|e| map_db_error(rid, &e))?;
    wadash_db::delete_scheduled_post(&state.pool, id)
        .await
        .map_err(|e| map_lookup_error(rid, &e, POST_NOT_FOUND))?;

    tracing::info!(post_id = id, user_id = principal.user_id, "scheduled post deleted");

    let notice = super::notice(&post, groups.len());
    let by = if principal.is_admin() {
        DeletedBy::Admin
    } else {
        DeletedBy::Owner
    };
    spawn_notification(&state.notifier, "post_deleted", move |n| {
        n.post_deleted(&notice, by)
    });

    Ok(message("Post deleted successfully"))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;
    use crate::api::test_support::{multipart_request, Part};

    #[test]
    fn status_must_be_known() {
        let err = parse_status("req-1", "sent").unwrap_err();
        assert_eq!(
            err.message,
            "Invalid status. Must be one of: pending, running, completed, failed, cancelled"
        );
        assert_eq!(parse_status("req-1", "running").ok(), Some(PostStatus::Running));
    }

    #[tokio::test]
    async fn json_status_body_is_trimmed() {
        let request = Request::builder()
            .method("PUT")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"status": " failed ", "admin_notes": " relay down "}"#))
            .expect("request");

        let input = read_input("req-1", request).await.expect("input");

        assert_eq!(input.status, "failed");
        assert_eq!(input.admin_notes, "relay down");
        assert!(input.completion_file.is_none());
    }

    #[tokio::test]
    async fn multipart_status_carries_completion_file() {
        let request = multipart_request(
            "/",
            "PUT",
            &[
                Part::Text("status", "completed"),
                Part::File("completion_file", "report.xlsx", b"PK"),
            ],
        );

        let input = read_input("req-1", request).await.expect("input");

        assert_eq!(input.status, "completed");
        assert_eq!(input.admin_notes, "");
        assert_eq!(
            input.completion_file.map(|f| f.file_name),
            Some("report.xlsx".to_string())
        );
    }
}
