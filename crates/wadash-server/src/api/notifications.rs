//! Admin-triggered test and welcome emails.

use axum::{
    body::Bytes,
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::middleware::{Principal, RequestId};

use super::{ensure_admin, map_lookup_error, message, ApiError, ApiResponse, AppState, MessageBody};

#[derive(Debug, Default, Deserialize)]
struct TestEmailBody {
    email: Option<String>,
}

/// Picks the explicit address, falling back to the configured admin.
fn test_recipient(body: &[u8], admin_email: Option<&str>) -> Option<String> {
    let explicit = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        serde_json::from_slice::<TestEmailBody>(body)
            .ok()
            .and_then(|b| b.email)
    };
    explicit
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .or_else(|| admin_email.map(str::to_string))
}

/// Sends one message on the blocking pool; failures become a 500 with `failure`.
async fn deliver<F>(request_id: &str, failure: &'static str, send: F) -> Result<(), ApiError>
where
    F: FnOnce() -> Result<(), wadash_notify::NotifyError> + Send + 'static,
{
    match tokio::task::spawn_blocking(send).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "email delivery failed");
            Err(ApiError::new(request_id, "delivery_failed", failure))
        }
        Err(e) => {
            tracing::error!(error = %e, "email task failed");
            Err(ApiError::internal(request_id))
        }
    }
}

/// POST /api/send-test-email
pub(super) async fn send_test_email(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    body: Bytes,
) -> Result<Json<ApiResponse<MessageBody>>, ApiError> {
    let rid = &req_id.0;
    ensure_admin(rid, principal)?;
    let Some(to) = test_recipient(&body, state.notifier.admin_email()) else {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "No recipient email given and no admin email configured",
        ));
    };

    let notifier = state.notifier.clone();
    deliver(rid, "Failed to send test email", move || notifier.send_test(&to)).await?;
    Ok(message("Test email sent successfully!"))
}

/// POST /api/send-welcome-email/{id}
pub(super) async fn send_welcome_email(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<MessageBody>>, ApiError> {
    let rid = &req_id.0;
    ensure_admin(rid, principal)?;
    let user = wadash_db::get_user(&state.pool, user_id)
        .await
        .map_err(|e| map_lookup_error(rid, &e, "User not found"))?;

    let notifier = state.notifier.clone();
    let (to, username) = (user.email.clone(), user.username);
    deliver(rid, "Failed to send welcome email", move || {
        notifier.send_welcome(&to, &username)
    })
    .await?;
    Ok(message(format!(
        "Welcome email sent successfully to {}",
        user.email
    )))
}
