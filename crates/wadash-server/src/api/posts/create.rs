use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use wadash_analytics::uploads;
use wadash_core::MediaKind;
use wadash_db::NewScheduledPost;

use crate::api::form::FormData;
use crate::api::{
    map_db_error, map_lookup_error, run_blocking, spawn_notification, ApiError, ApiResponse,
    AppState,
};
use crate::middleware::{Principal, RequestId};

#[derive(Debug, Serialize)]
pub(in crate::api) struct PostCreated {
    pub message: &'static str,
    pub post_id: i64,
}

/// Validated text fields of the create form.
#[derive(Debug, PartialEq, Eq)]
struct PostForm {
    title: String,
    message_text: String,
    scheduled_date: NaiveDate,
    scheduled_time: NaiveTime,
    assembly_id: i64,
    groups: Vec<String>,
}

fn parse_form(request_id: &str, form: &FormData) -> Result<PostForm, ApiError> {
    let title = form.text("title");
    let date = form.text("scheduled_date");
    let time = form.text("scheduled_time");
    let assembly_id = form.text("assembly_id");
    let groups = form.texts("selected_groups[]");
    if title.is_empty()
        || date.is_empty()
        || time.is_empty()
        || assembly_id.is_empty()
        || groups.is_empty()
    {
        return Err(ApiError::new(request_id, "validation_error", "Missing required fields"));
    }

    let invalid = || ApiError::new(request_id, "validation_error", "Invalid date or time format");
    let scheduled_date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid())?;
    let scheduled_time = NaiveTime::parse_from_str(time, "%H:%M").map_err(|_| invalid())?;
    let assembly_id = assembly_id
        .parse::<i64>()
        .map_err(|_| ApiError::new(request_id, "not_found", "Assembly not found"))?;

    Ok(PostForm {
        title: title.to_string(),
        message_text: form.text("message_text").to_string(),
        scheduled_date,
        scheduled_time,
        assembly_id,
        groups,
    })
}

/// Stored relative paths of the image, audio and video attachments.
#[derive(Debug, Default)]
struct MediaPaths {
    image: Option<String>,
    audio: Option<String>,
    video: Option<String>,
}

/// POST /api/scheduled-posts
pub(in crate::api) async fn create_post(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<PostCreated>>, ApiError> {
    let rid = &req_id.0;
    let mut form = FormData::read(rid, multipart).await?;
    let fields = parse_form(rid, &form)?;

    let assembly = wadash_db::get_assembly(&state.pool, fields.assembly_id)
        .await
        .map_err(|e| map_lookup_error(rid, &e, "Assembly not found"))?;

    let attachments: Vec<(MediaKind, String, Vec<u8>)> = MediaKind::ALL
        .into_iter()
        .filter_map(|kind| {
            form.take_file(kind.form_field())
                .map(|file| (kind, file.file_name, file.bytes))
        })
        .collect();
    let data = state.data.clone();
    let assembly_name = assembly.name.clone();
    let media = run_blocking(rid, move || {
        let mut paths = MediaPaths::default();
        for (kind, name, bytes) in attachments {
            let stored = uploads::store_post_media(&data, &assembly_name, kind, &name, &bytes)?;
            let slot = match kind {
                MediaKind::Image => &mut paths.image,
                MediaKind::Audio => &mut paths.audio,
                MediaKind::Video => &mut paths.video,
            };
            *slot = Some(stored.relative);
        }
        Ok(paths)
    })
    .await?;

    let message_text = Some(fields.message_text.as_str()).filter(|m| !m.is_empty());
    let post_id = wadash_db::create_scheduled_post(
        &state.pool,
        &NewScheduledPost {
            title: &fields.title,
            message_text,
            audio_file: media.audio.as_deref(),
            video_file: media.video.as_deref(),
            image_file: media.image.as_deref(),
            scheduled_date: fields.scheduled_date,
            scheduled_time: fields.scheduled_time,
            created_by_id: principal.user_id,
            assembly_id: assembly.id,
            assembly_name: &assembly.name,
            groups: &fields.groups,
        },
    )
    .await
    .map_err(|e| map_db_error(rid, &e))?;

    tracing::info!(
        post_id,
        assembly = %assembly.name,
        groups = fields.groups.len(),
        user_id = principal.user_id,
        "scheduled post created"
    );

    match wadash_db::get_scheduled_post(&state.pool, post_id).await {
        Ok(row) => {
            let notice = super::notice(&row, fields.groups.len());
            spawn_notification(&state.notifier, "post_created", move |n| {
                n.post_created(&notice)
            });
        }
        Err(e) => tracing::warn!(post_id, error = %e, "skipping post notifications"),
    }

    Ok(ApiResponse::ok(PostCreated {
        message: "Scheduled post created successfully",
        post_id,
    }))
}
