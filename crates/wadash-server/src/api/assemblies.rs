//! Assembly CRUD plus the roster views built from each assembly's `groups/` folder.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use wadash_analytics::roster::{self, AssemblyGroups, DashboardStats, PhoneCounting};
use wadash_db::{AssemblyRow, AssemblyUpdate, NewAssembly};

use crate::middleware::{Principal, RequestId};

use super::{
    ensure_admin, map_db_error, map_lookup_error, message, run_blocking, ApiError, ApiResponse,
    AppState, MessageBody,
};

const ASSEMBLY_NOT_FOUND: &str = "Assembly not found";

#[derive(Debug, Deserialize)]
pub(super) struct CreateAssemblyBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub remarks: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateAssemblyBody {
    pub name: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AssemblyGroupsBody {
    #[serde(default)]
    pub assembly: String,
}

#[derive(Debug, Serialize)]
pub(super) struct AssemblySummary {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub(super) struct AssemblyList<T: Serialize> {
    pub assemblies: Vec<T>,
}

#[derive(Debug, Serialize)]
pub(super) struct AssemblyBody {
    pub assembly: AssemblyRow,
}

#[derive(Debug, Serialize)]
pub(super) struct AssemblyChanged {
    pub message: &'static str,
    pub assembly: AssemblyRow,
}

#[derive(Debug, Serialize)]
pub(super) struct AssemblyFiles {
    pub id: i64,
    pub name: String,
    pub excel_files: Vec<String>,
    pub total_files: usize,
}

#[derive(Debug, Serialize)]
pub(super) struct StatsBody {
    pub stats: DashboardStats,
}

/// GET /api/assemblies
pub(super) async fn list_assemblies(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<AssemblyList<AssemblySummary>>>, ApiError> {
    let rows = wadash_db::list_active_assemblies(&state.pool)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;
    let assemblies = rows
        .into_iter()
        .map(|row| AssemblySummary {
            id: row.id,
            name: row.name,
        })
        .collect();
    Ok(ApiResponse::ok(AssemblyList { assemblies }))
}

/// POST /api/assemblies
pub(super) async fn create_assembly(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateAssemblyBody>,
) -> Result<Json<ApiResponse<AssemblyChanged>>, ApiError> {
    let rid = &req_id.0;
    ensure_admin(rid, principal)?;
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::new(rid, "validation_error", "Assembly name is required"));
    }
    let remarks = body.remarks.trim();

    let assembly = wadash_db::create_assembly(
        &state.pool,
        &NewAssembly {
            name,
            remarks: Some(remarks),
            created_by_id: principal.user_id,
        },
    )
    .await
    .map_err(|e| map_db_error(rid, &e))?;

    tracing::info!(assembly_id = assembly.id, name = %assembly.name, "assembly created");
    Ok(ApiResponse::ok(AssemblyChanged {
        message: "Assembly created successfully",
        assembly,
    }))
}

/// GET /api/assemblies/{id}
pub(super) async fn get_assembly(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<AssemblyBody>>, ApiError> {
    let assembly = wadash_db::get_assembly(&state.pool, id)
        .await
        .map_err(|e| map_lookup_error(&req_id.0, &e, ASSEMBLY_NOT_FOUND))?;
    Ok(ApiResponse::ok(AssemblyBody { assembly }))
}

/// PUT /api/assemblies/{id}
pub(super) async fn update_assembly(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateAssemblyBody>,
) -> Result<Json<ApiResponse<AssemblyChanged>>, ApiError> {
    let rid = &req_id.0;
    ensure_admin(rid, principal)?;
    let name = body.name.map(|n| n.trim().to_string());
    if name.as_deref().is_some_and(str::is_empty) {
        return Err(ApiError::new(rid, "validation_error", "Assembly name is required"));
    }
    let update = AssemblyUpdate {
        name,
        remarks: body.remarks.map(|r| r.trim().to_string()),
    };

    let assembly = wadash_db::update_assembly(&state.pool, id, &update)
        .await
        .map_err(|e| map_lookup_error(rid, &e, ASSEMBLY_NOT_FOUND))?;

    Ok(ApiResponse::ok(AssemblyChanged {
        message: "Assembly updated successfully",
        assembly,
    }))
}

/// DELETE /api/assemblies/{id}
pub(super) async fn delete_assembly(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MessageBody>>, ApiError> {
    let rid = &req_id.0;
    ensure_admin(rid, principal)?;
    wadash_db::deactivate_assembly(&state.pool, id)
        .await
        .map_err(|e| map_lookup_error(rid, &e, ASSEMBLY_NOT_FOUND))?;

    tracing::info!(assembly_id = id, "assembly deactivated");
    Ok(message("Assembly deleted successfully"))
}

/// GET /api/assemblies-with-groups
pub(super) async fn assemblies_with_groups(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<AssemblyList<AssemblyFiles>>>, ApiError> {
    let rid = &req_id.0;
    let rows = wadash_db::list_active_assemblies(&state.pool)
        .await
        .map_err(|e| map_db_error(rid, &e))?;

    let data = state.data.clone();
    let assemblies = run_blocking(rid, move || {
        Ok(rows
            .into_iter()
            .map(|row| {
                let excel_files = roster::group_files(&data, &row.name).unwrap_or_else(|e| {
                    tracing::warn!(assembly = %row.name, error = %e, "cannot list group files");
                    Vec::new()
                });
                AssemblyFiles {
                    id: row.id,
                    name: row.name,
                    total_files: excel_files.len(),
                    excel_files,
                }
            })
            .collect())
    })
    .await?;
    Ok(ApiResponse::ok(AssemblyList { assemblies }))
}

/// POST /api/assembly-groups
pub(super) async fn assembly_groups(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<AssemblyGroupsBody>,
) -> Result<Json<ApiResponse<AssemblyGroups>>, ApiError> {
    let data = state.data.clone();
    let groups =
        run_blocking(&req_id.0, move || roster::assembly_groups(&data, &body.assembly)).await?;
    Ok(ApiResponse::ok(groups))
}

async fn stats(state: &AppState, request_id: &str, counting: PhoneCounting) -> Result<StatsBody, ApiError> {
    let data = state.data.clone();
    let stats = run_blocking(request_id, move || Ok(roster::dashboard_stats(&data, counting))).await?;
    Ok(StatsBody { stats })
}

/// GET /api/dashboard-stats
pub(super) async fn dashboard_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<StatsBody>>, ApiError> {
    Ok(ApiResponse::ok(stats(&state, &req_id.0, PhoneCounting::Exact).await?))
}

/// GET /api/accurate-dashboard-stats
pub(super) async fn accurate_dashboard_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<StatsBody>>, ApiError> {
    Ok(ApiResponse::ok(
        stats(&state, &req_id.0, PhoneCounting::Estimated).await?,
    ))
}
