//! Admin multipart uploads of group rosters and daily report files.

use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use serde::Serialize;
use wadash_analytics::uploads::{self, StoredFile};
use wadash_core::FolderType;
use wadash_db::NewAssembly;

use crate::middleware::{Principal, RequestId};

use super::form::{FormData, UploadedFile};
use super::{ensure_admin, map_db_error, run_blocking, ApiError, ApiResponse, AppState};

const FILES_FIELD: &str = "files[]";

#[derive(Debug, Serialize)]
pub(super) struct UploadBody {
    pub message: String,
    pub files_saved: Vec<String>,
    pub assembly_id: i64,
    pub target_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_date: Option<String>,
}

/// Uploaded files with their client names reduced to a safe base name.
fn named_files(
    request_id: &str,
    files: Vec<UploadedFile>,
) -> Result<Vec<(String, Vec<u8>)>, ApiError> {
    if files.is_empty() {
        return Err(ApiError::new(request_id, "validation_error", "No files were uploaded"));
    }
    files
        .into_iter()
        .map(|file| {
            uploads::client_file_name(&file.file_name)
                .map(|name| (name, file.bytes))
                .map_err(|_| {
                    ApiError::new(
                        request_id,
                        "validation_error",
                        format!("Invalid file name: {}", file.file_name),
                    )
                })
        })
        .collect()
}

async fn ensure_assembly(
    state: &AppState,
    request_id: &str,
    principal: Principal,
    name: &str,
    remarks: &str,
) -> Result<i64, ApiError> {
    let (assembly, created) = wadash_db::ensure_assembly(
        &state.pool,
        &NewAssembly {
            name,
            remarks: Some(remarks),
            created_by_id: principal.user_id,
        },
    )
    .await
    .map_err(|e| map_db_error(request_id, &e))?;
    if created {
        tracing::info!(assembly_id = assembly.id, name, "assembly created by upload");
    }
    Ok(assembly.id)
}

fn saved_names(stored: Vec<StoredFile>) -> Vec<String> {
    stored.into_iter().map(|f| f.file_name).collect()
}

/// POST /api/upload-groups
pub(super) async fn upload_groups(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<UploadBody>>, ApiError> {
    let rid = &req_id.0;
    ensure_admin(rid, principal)?;
    let mut form = FormData::read(rid, multipart).await?;

    let assembly_name = form.text("assembly_name").to_string();
    if assembly_name.is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "Missing required field: assembly_name",
        ));
    }
    let files = named_files(rid, form.take_files(FILES_FIELD))?;
    // Reject an unusable assembly name before it reaches the database.
    let groups_dir = state
        .data
        .groups_dir(&assembly_name)
        .map_err(|e| super::map_analytics_error(rid, &e))?;

    let assembly_id =
        ensure_assembly(&state, rid, principal, &assembly_name, "Created via group upload").await?;

    let data = state.data.clone();
    let stored = run_blocking(rid, move || {
        files
            .iter()
            .map(|(name, bytes)| uploads::store(&data, &groups_dir, name, bytes))
            .collect::<Result<Vec<_>, _>>()
    })
    .await?;

    let files_saved = saved_names(stored);
    tracing::info!(assembly = %assembly_name, files = files_saved.len(), "group files uploaded");
    Ok(ApiResponse::ok(UploadBody {
        message: format!(
            "Successfully uploaded {} files to {assembly_name}/groups/",
            files_saved.len()
        ),
        files_saved,
        assembly_id,
        target_path: format!("{assembly_name}/groups/"),
        selected_date: None,
        folder_date: None,
    }))
}

/// POST /api/upload-reports
pub(super) async fn upload_reports(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<UploadBody>>, ApiError> {
    let rid = &req_id.0;
    ensure_admin(rid, principal)?;
    let mut form = FormData::read(rid, multipart).await?;

    let assembly_name = form.text("assembly_name").to_string();
    let target_date = form.text("target_date").to_string();
    let folder_type = form.text("folder_type").to_string();
    if assembly_name.is_empty() || target_date.is_empty() || folder_type.is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "Missing required fields: assembly_name, target_date, folder_type",
        ));
    }
    let folder: FolderType = folder_type.parse().map_err(|_| {
        let valid: Vec<&str> = FolderType::ALL.iter().map(|f| f.as_str()).collect();
        ApiError::new(
            rid,
            "validation_error",
            format!("Invalid folder type. Must be one of: {}", valid.join(", ")),
        )
    })?;
    let files = named_files(rid, form.take_files(FILES_FIELD))?;
    let names: Vec<String> = files.iter().map(|(name, _)| name.clone()).collect();
    let target = uploads::report_target(&state.data, &assembly_name, &target_date, folder, &names)
        .map_err(|e| super::map_analytics_error(rid, &e))?;

    let remarks = format!("Created via report upload on {target_date}");
    let assembly_id = ensure_assembly(&state, rid, principal, &assembly_name, &remarks).await?;

    let data = state.data.clone();
    let dir = target.dir.clone();
    let stored = run_blocking(rid, move || {
        files
            .iter()
            .map(|(name, bytes)| uploads::store(&data, &dir, name, bytes))
            .collect::<Result<Vec<_>, _>>()
    })
    .await?;

    let files_saved = saved_names(stored);
    tracing::info!(
        assembly = %assembly_name,
        folder_date = %target.folder_date,
        folder = folder.as_str(),
        files = files_saved.len(),
        "report files uploaded"
    );
    Ok(ApiResponse::ok(UploadBody {
        message: format!(
            "Successfully uploaded {} files to {} (1 day back from selected date: {target_date})",
            files_saved.len(),
            target.display_path
        ),
        files_saved,
        assembly_id,
        target_path: target.display_path,
        selected_date: Some(target_date),
        folder_date: Some(target.folder_date),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::test_support::{app, app_with, multipart_request, send, Part};
    use crate::middleware::AuthState;

    #[tokio::test]
    async fn group_upload_needs_an_assembly() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let request = multipart_request(
            "/api/upload-groups",
            "POST",
            &[Part::File("files[]", "Ward 1.xlsx", b"x")],
        );

        let (status, json) = send(app(tmp.path()), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Missing required field: assembly_name");
    }

    #[tokio::test]
    async fn group_upload_needs_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let request = multipart_request(
            "/api/upload-groups",
            "POST",
            &[
                Part::Text("assembly_name", "North"),
                Part::File("files[]", "", b""),
            ],
        );

        let (status, json) = send(app(tmp.path()), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "No files were uploaded");
    }

    #[tokio::test]
    async fn report_upload_rejects_unknown_folder_type() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let request = multipart_request(
            "/api/upload-reports",
            "POST",
            &[
                Part::Text("assembly_name", "North"),
                Part::Text("target_date", "2025-01-16"),
                Part::Text("folder_type", "documents"),
                Part::File("files[]", "Ward 1.json", b"[]"),
            ],
        );

        let (status, json) = send(app(tmp.path()), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json["message"],
            "Invalid folder type. Must be one of: messages, images, audio, video, urls"
        );
    }

    #[tokio::test]
    async fn report_upload_rejects_non_json_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let request = multipart_request(
            "/api/upload-reports",
            "POST",
            &[
                Part::Text("assembly_name", "North"),
                Part::Text("target_date", "2025-01-16"),
                Part::Text("folder_type", "messages"),
                Part::File("files[]", "Ward 1.csv", b"a,b"),
            ],
        );

        let (status, json) = send(app(tmp.path()), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "File Ward 1.csv is not a JSON file");
        assert!(!tmp.path().join("North").exists());
    }

    #[tokio::test]
    async fn oversized_upload_is_413() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let big = vec![b'x'; 2 * 1024 * 1024];
        let request = multipart_request(
            "/api/upload-groups",
            "POST",
            &[
                Part::Text("assembly_name", "North"),
                Part::File("files[]", "big.xlsx", &big),
            ],
        );

        let (status, json) = send(app(tmp.path()), request).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["code"], "payload_too_large");
    }

    #[tokio::test]
    async fn uploads_are_admin_only() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let auth = AuthState::parse("user:7:field", None, false).expect("auth");
        let mut request = multipart_request(
            "/api/upload-groups",
            "POST",
            &[Part::Text("assembly_name", "North")],
        );
        request
            .headers_mut()
            .insert("authorization", "Bearer field".parse().expect("header"));

        let (status, _) = send(app_with(tmp.path(), auth), request).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
