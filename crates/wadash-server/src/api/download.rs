//! Attachment responses for spreadsheet exports and stored files.

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use wadash_analytics::DataRoot;

use super::ApiError;

pub(super) const OCTET_STREAM: &str = "application/octet-stream";

/// `attachment` disposition with an ASCII fallback name and the exact name
/// percent-encoded in `filename*`.
pub(super) fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let encoded = utf8_percent_encode(file_name, NON_ALPHANUMERIC);
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

pub(super) fn attachment(file_name: &str, content_type: &str, bytes: Vec<u8>) -> Response {
    let disposition = HeaderValue::from_str(&content_disposition(file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    let content_type =
        HeaderValue::from_str(content_type).unwrap_or_else(|_| HeaderValue::from_static(OCTET_STREAM));
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

/// Best-effort type for a stored media file.
pub(super) fn media_content_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "ogg" | "opus" => "audio/ogg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "pdf" => "application/pdf",
        _ => OCTET_STREAM,
    }
}

/// Reads a file whose root-relative path was stored in the database.
pub(super) async fn read_stored(
    request_id: &str,
    data: &DataRoot,
    relative: &str,
    missing: &str,
) -> Result<(String, Vec<u8>), ApiError> {
    let path = data.resolve_stored(relative).map_err(|e| {
        tracing::warn!(relative, error = %e, "stored path rejected");
        ApiError::new(request_id, "not_found", missing)
    })?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download")
        .to_string();
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok((file_name, bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "stored file missing on disk");
            Err(ApiError::new(request_id, "not_found", missing))
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to read stored file");
            Err(ApiError::internal(request_id))
        }
    }
}
