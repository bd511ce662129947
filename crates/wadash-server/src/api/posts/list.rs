use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use wadash_core::PostStatus;
use wadash_db::{Page, Pagination, PostFilters, StatusCounts};

use crate::api::{ensure_admin, map_db_error, ApiError, ApiResponse, AppState};
use crate::middleware::{Principal, RequestId};

use super::{load_post, with_groups, PostView};

#[derive(Debug, Deserialize)]
pub(in crate::api) struct OwnPostsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(in crate::api) struct AdminPostsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<String>,
    pub assembly: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct PostList {
    pub posts: Vec<PostView>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct PostBody {
    pub post: PostView,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct StatsBody {
    pub stats: StatusCounts,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Blank filters are ignored; a malformed status or date is a 400.
fn admin_filters(request_id: &str, query: &AdminPostsQuery) -> Result<PostFilters, ApiError> {
    let status = non_blank(query.status.as_deref())
        .map(str::parse::<PostStatus>)
        .transpose()
        .map_err(|e| ApiError::new(request_id, "validation_error", e.to_string()))?;
    let date = non_blank(query.date.as_deref())
        .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
        .transpose()
        .map_err(|_| {
            ApiError::new(request_id, "validation_error", "Invalid date format. Use YYYY-MM-DD")
        })?;
    Ok(PostFilters {
        status,
        assembly: non_blank(query.assembly.as_deref()).map(str::to_string),
        date,
    })
}

/// GET /api/scheduled-posts
pub(in crate::api) async fn list_own_posts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<OwnPostsQuery>,
) -> Result<Json<ApiResponse<PostList>>, ApiError> {
    let rid = &req_id.0;
    let page = wadash_db::list_scheduled_posts_for_user(
        &state.pool,
        principal.user_id,
        Page::new(query.page, query.per_page),
    )
    .await
    .map_err(|e| map_db_error(rid, &e))?;

    Ok(ApiResponse::ok(PostList {
        posts: with_groups(&state.pool, rid, page.items).await?,
        pagination: page.pagination,
    }))
}

/// GET /api/scheduled-posts/{id}
pub(in crate::api) async fn get_post(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<PostBody>>, ApiError> {
    let rid = &req_id.0;
    let post = load_post(&state.pool, rid, id).await?;
    if !principal.may_act_on(post.created_by_id) {
        return Err(ApiError::new(rid, "forbidden", "You can only view your own posts"));
    }
    let mut views = with_groups(&state.pool, rid, vec![post]).await?;
    let Some(post) = views.pop() else {
        return Err(ApiError::internal(rid));
    };
    Ok(ApiResponse::ok(PostBody { post }))
}

/// GET /api/admin/scheduled-posts
pub(in crate::api) async fn admin_list_posts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<AdminPostsQuery>,
) -> Result<Json<ApiResponse<PostList>>, ApiError> {
    let rid = &req_id.0;
    ensure_admin(rid, principal)?;
    let filters = admin_filters(rid, &query)?;
    let page = wadash_db::admin_list_scheduled_posts(
        &state.pool,
        &filters,
        Page::new(query.page, query.per_page),
    )
    .await
    .map_err(|e| map_db_error(rid, &e))?;

    Ok(ApiResponse::ok(PostList {
        posts: with_groups(&state.pool, rid, page.items).await?,
        pagination: page.pagination,
    }))
}

/// GET /api/admin/scheduled-posts/stats
pub(in crate::api) async fn admin_post_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<StatsBody>>, ApiError> {
    let rid = &req_id.0;
    ensure_admin(rid, principal)?;
    let stats = wadash_db::post_status_counts(&state.pool)
        .await
        .map_err(|e| map_db_error(rid, &e))?;
    Ok(ApiResponse::ok(StatsBody { stats }))
}
