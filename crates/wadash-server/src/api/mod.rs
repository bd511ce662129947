mod analytics;
mod assemblies;
mod download;
mod exports;
mod form;
mod notifications;
mod posts;
mod uploads;
mod users;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use wadash_analytics::{AnalyticsError, DataRoot, ScanReport};
use wadash_core::AppConfig;
use wadash_notify::{DeliveryReport, Notifier};

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, Principal, RateLimitState,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub data: DataRoot,
    pub notifier: Arc<Notifier>,
    pub config: Arc<AppConfig>,
}

// ---------------------------------------------------------------------------
// Response envelopes
// ---------------------------------------------------------------------------

/// `{"success": true, ...fields of T}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[derive(Debug, Serialize)]
pub(super) struct MessageBody {
    pub message: String,
}

pub(super) fn message(text: impl Into<String>) -> Json<ApiResponse<MessageBody>> {
    ApiResponse::ok(MessageBody {
        message: text.into(),
    })
}

/// Aggregation output plus the files the scan could not read.
#[derive(Debug, Serialize)]
pub(super) struct AnalysisBody<T: Serialize> {
    pub results: T,
    pub scan: ScanReport,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub code: String,
    pub message: String,
    pub request_id: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            code: code.into(),
            message: message.into(),
            request_id: request_id.into(),
        }
    }

    pub(super) fn internal(request_id: impl Into<String>) -> Self {
        Self::new(request_id, "internal_error", "internal server error")
    }

    fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "not_found" => StatusCode::NOT_FOUND,
            "conflict" => StatusCode::CONFLICT,
            "payload_too_large" => StatusCode::PAYLOAD_TOO_LARGE,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

pub(super) fn map_db_error(request_id: &str, error: &wadash_db::DbError) -> ApiError {
    match error {
        wadash_db::DbError::Duplicate(message) => {
            ApiError::new(request_id, "validation_error", message.clone())
        }
        wadash_db::DbError::NotFound => ApiError::new(request_id, "not_found", "record not found"),
        _ => {
            tracing::error!(error = %error, "database query failed");
            ApiError::internal(request_id)
        }
    }
}

/// Like [`map_db_error`] with a caller-specific not-found message.
pub(super) fn map_lookup_error(
    request_id: &str,
    error: &wadash_db::DbError,
    not_found: &str,
) -> ApiError {
    if matches!(error, wadash_db::DbError::NotFound) {
        ApiError::new(request_id, "not_found", not_found)
    } else {
        map_db_error(request_id, error)
    }
}

pub(super) fn map_analytics_error(request_id: &str, error: &AnalyticsError) -> ApiError {
    match error {
        AnalyticsError::Validation(message) => {
            ApiError::new(request_id, "validation_error", message.clone())
        }
        AnalyticsError::NotFound(message) => ApiError::new(request_id, "not_found", message.clone()),
        _ => {
            tracing::error!(error = %error, "analytics request failed");
            ApiError::internal(request_id)
        }
    }
}

pub(super) fn ensure_admin(request_id: &str, principal: Principal) -> Result<(), ApiError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(ApiError::new(request_id, "forbidden", "forbidden"))
    }
}

// ---------------------------------------------------------------------------
// Background work
// ---------------------------------------------------------------------------

/// Runs filesystem work on the blocking pool.
pub(super) async fn run_blocking<T, F>(request_id: &str, work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, AnalyticsError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result.map_err(|e| map_analytics_error(request_id, &e)),
        Err(e) => {
            tracing::error!(error = %e, "blocking task failed");
            Err(ApiError::internal(request_id))
        }
    }
}

/// Sends notifications without holding up the response.
pub(super) fn spawn_notification<F>(notifier: &Arc<Notifier>, event: &'static str, send: F)
where
    F: FnOnce(&Notifier) -> DeliveryReport + Send + 'static,
{
    let notifier = Arc::clone(notifier);
    tokio::task::spawn_blocking(move || {
        let report = send(&notifier);
        if report.failed > 0 {
            tracing::warn!(event, sent = report.sent, failed = report.failed, "some notifications failed");
        } else {
            tracing::info!(event, sent = report.sent, "notifications sent");
        }
    });
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([header::CONTENT_DISPOSITION])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        // analytics
        .route("/api/search-messages", post(analytics::search_messages))
        .route(
            "/api/group-sender-analysis",
            post(analytics::group_sender_analysis),
        )
        .route(
            "/api/common-members-analysis",
            post(analytics::common_members_analysis),
        )
        .route("/api/group-details", post(analytics::group_details))
        .route(
            "/api/member-details/{phone}",
            post(analytics::member_details),
        )
        .route("/api/analyze-json-files", post(analytics::analyze_json_files))
        .route(
            "/api/get-assembly-dates/{assembly}",
            get(analytics::assembly_dates),
        )
        .route(
            "/api/get-assembly-messages/{assembly}",
            get(analytics::assembly_messages),
        )
        .route(
            "/api/export-common-members-excel",
            post(exports::export_common_members),
        )
        .route(
            "/api/export-positive-users-excel",
            post(exports::export_positive_users),
        )
        .route(
            "/api/export-negative-users-excel",
            post(exports::export_negative_users),
        )
        // assemblies and rosters
        .route(
            "/api/assemblies",
            get(assemblies::list_assemblies).post(assemblies::create_assembly),
        )
        .route(
            "/api/assemblies/{id}",
            get(assemblies::get_assembly)
                .put(assemblies::update_assembly)
                .delete(assemblies::delete_assembly),
        )
        .route(
            "/api/assemblies-with-groups",
            get(assemblies::assemblies_with_groups),
        )
        .route("/api/assembly-groups", post(assemblies::assembly_groups))
        .route("/api/dashboard-stats", get(assemblies::dashboard_stats))
        .route(
            "/api/accurate-dashboard-stats",
            get(assemblies::accurate_dashboard_stats),
        )
        // uploads
        .route("/api/upload-groups", post(uploads::upload_groups))
        .route("/api/upload-reports", post(uploads::upload_reports))
        // scheduled posts
        .route(
            "/api/scheduled-posts",
            get(posts::list_own_posts).post(posts::create_post),
        )
        .route(
            "/api/scheduled-posts/{id}",
            get(posts::get_post).delete(posts::delete_post),
        )
        .route(
            "/api/scheduled-posts/{id}/status",
            put(posts::update_status),
        )
        .route(
            "/api/scheduled-posts/{id}/completion-file",
            get(posts::download_completion_file),
        )
        .route("/api/admin/scheduled-posts", get(posts::admin_list_posts))
        .route(
            "/api/admin/scheduled-posts/stats",
            get(posts::admin_post_stats),
        )
        .route(
            "/api/admin/download-file/{id}/{file_type}",
            get(posts::admin_download_media),
        )
        // users and mail
        .route("/api/users", get(users::list_users))
        .route("/api/users/{id}", get(users::get_user))
        .route(
            "/api/send-test-email",
            post(notifications::send_test_email),
        )
        .route(
            "/api/send-welcome-email/{id}",
            post(notifications::send_welcome_email),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match wadash_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            ApiResponse::ok(HealthData {
                status: "ok",
                database: "ok",
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    success: false,
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                }),
            )
        }
    }
}
