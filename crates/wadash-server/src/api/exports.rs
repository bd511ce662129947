//! Spreadsheet downloads of the common-members and sentiment rankings.

use axum::{extract::State, response::Response, Extension, Json};
use wadash_analytics::export::{build_report, ExportKind, XLSX_CONTENT_TYPE};

use crate::middleware::RequestId;

use super::analytics::SelectionBody;
use super::download::attachment;
use super::{run_blocking, ApiError, AppState};

async fn export(
    state: AppState,
    req_id: &RequestId,
    body: SelectionBody,
    kind: ExportKind,
) -> Result<Response, ApiError> {
    let rid = &req_id.0;
    let request = body.into_request(rid)?;
    let today = chrono::Local::now().date_naive();

    let data = state.data.clone();
    let (file_name, bytes) = run_blocking(rid, move || {
        let (report, scan) = build_report(&data, &request, kind, today)?;
        if scan.files_failed > 0 {
            tracing::warn!(
                export = kind.as_str(),
                files_failed = scan.files_failed,
                "export built from a partial scan"
            );
        }
        Ok((report.file_name.clone(), report.to_xlsx()?))
    })
    .await?;

    tracing::info!(export = kind.as_str(), file_name, "spreadsheet export generated");
    Ok(attachment(&file_name, XLSX_CONTENT_TYPE, bytes))
}

/// POST /api/export-common-members-excel
pub(super) async fn export_common_members(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SelectionBody>,
) -> Result<Response, ApiError> {
    export(state, &req_id, body, ExportKind::CommonMembers).await
}

/// POST /api/export-positive-users-excel
pub(super) async fn export_positive_users(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SelectionBody>,
) -> Result<Response, ApiError> {
    export(state, &req_id, body, ExportKind::PositiveUsers).await
}

/// POST /api/export-negative-users-excel
pub(super) async fn export_negative_users(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SelectionBody>,
) -> Result<Response, ApiError> {
    export(state, &req_id, body, ExportKind::NegativeUsers).await
}

#[cfg(test)]
mod tests {
    use std::fs;

    use axum::body::to_bytes;
    use axum::http::{header, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::api::test_support::{app, post_json, send};

    fn fixture() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = tmp.path().join("North/2025-01-15/messages");
        fs::create_dir_all(&dir).expect("mkdir");
        let messages = json!([
            {"sender": {"name": "Asha", "phoneNumber": "9100"}, "messageContent": "a",
             "predicted_sentiment": "Positive"},
            {"sender": {"name": "Asha", "phoneNumber": "9100"}, "messageContent": "b",
             "predicted_sentiment": "Negative"},
        ]);
        fs::write(dir.join("Ward 1.json"), messages.to_string()).expect("write");
        tmp
    }

    #[tokio::test]
    async fn positive_export_is_an_xlsx_attachment() {
        let tmp = fixture();
        let body = json!({"assemblies": ["North"], "startDate": "2025-01-15"});

        let response = app(tmp.path())
            .oneshot(post_json("/api/export-positive-users-excel", &body))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers().clone();
        assert_eq!(
            headers[header::CONTENT_TYPE],
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().expect("ascii");
        assert!(disposition.starts_with("attachment; filename=\"most_positive_users_"));
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert!(bytes.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn export_validates_assemblies_then_start_date() {
        let tmp = fixture();

        let (status, json) = send(
            app(tmp.path()),
            post_json("/api/export-common-members-excel", &json!({"startDate": "2025-01-15"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Please select at least one assembly");

        let (status, json) = send(
            app(tmp.path()),
            post_json("/api/export-negative-users-excel", &json!({"assemblies": ["North"]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Start date is required");
    }
}
