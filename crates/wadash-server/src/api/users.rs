//! Admin user listing.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use wadash_db::{Page, Pagination, UserRow};

use crate::middleware::{Principal, RequestId};

use super::{ensure_admin, map_db_error, map_lookup_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageQuery {
    pub(super) fn page(&self) -> Page {
        Page::new(self.page, self.per_page)
    }
}

#[derive(Debug, Serialize)]
pub(super) struct UserList {
    pub users: Vec<UserRow>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub(super) struct UserBody {
    pub user: UserRow,
}

/// GET /api/users
pub(super) async fn list_users(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<UserList>>, ApiError> {
    ensure_admin(&req_id.0, principal)?;
    let page = wadash_db::list_users(&state.pool, query.page())
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;
    Ok(ApiResponse::ok(UserList {
        users: page.items,
        pagination: page.pagination,
    }))
}

/// GET /api/users/{id}
pub(super) async fn get_user(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<UserBody>>, ApiError> {
    ensure_admin(&req_id.0, principal)?;
    let user = wadash_db::get_user(&state.pool, id)
        .await
        .map_err(|e| map_lookup_error(&req_id.0, &e, "User not found"))?;
    Ok(ApiResponse::ok(UserBody { user }))
}
