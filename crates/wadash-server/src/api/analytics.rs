//! Directory-scan analytics handlers.
//!
//! Every multi-assembly endpoint takes the same selection body
//! (`assemblies`, `startDate`, `endDate`, `sentiment`) and answers with
//! `{"success": true, "results": ..., "scan": ...}`.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use wadash_analytics::aggregate::{
    self, AssemblyMessages, AssemblyMessagesReducer, CommonMembers, CommonMembersReducer,
    GroupDetails, GroupSenderReducer, GroupSenderResults, JsonOverview, MemberDetails,
    MemberDetailsReducer, SearchReducer, SearchResults,
};
use wadash_analytics::{
    resolver, AnalysisRequest, DataRoot, DateWindow, GroupReducer, MessageFilter, PayloadPolicy,
    Scan, ScanReport, SearchField, SearchQuery,
};
use wadash_core::SentimentFilter;

use crate::middleware::RequestId;

use super::{
    map_analytics_error, run_blocking, AnalysisBody, ApiError, ApiResponse, AppState,
};

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SelectionBody {
    #[serde(default)]
    pub assemblies: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sentiment: Option<String>,
}

impl SelectionBody {
    pub(super) fn into_request(self, request_id: &str) -> Result<AnalysisRequest, ApiError> {
        AnalysisRequest::new(
            self.assemblies,
            self.start_date.as_deref(),
            self.end_date.as_deref(),
            self.sentiment.as_deref(),
        )
        .map_err(|e| map_analytics_error(request_id, &e))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SearchBody {
    pub search_term: Option<String>,
    pub search_field: Option<String>,
    pub label: Option<String>,
    #[serde(flatten)]
    pub selection: SelectionBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GroupDetailsBody {
    pub group_name: Option<String>,
    pub assembly: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct JsonFilesBody {
    #[serde(default)]
    pub assemblies: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sentiment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AssemblyMessagesQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sentiment: Option<String>,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct ResultsBody<T: Serialize> {
    pub results: T,
}

#[derive(Debug, Serialize)]
pub(super) struct AssemblyDatesBody {
    pub assembly_name: String,
    pub available_dates: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct AssemblyMessagesBody {
    pub assembly_name: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub sentiment: String,
    #[serde(flatten)]
    pub listing: AssemblyMessages,
    pub scan: ScanReport,
}

type Analysis<T> = Json<ApiResponse<AnalysisBody<T>>>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Runs one reducer over the selection and returns it with the scan report.
pub(super) fn scan_into<R: GroupReducer>(
    data: &DataRoot,
    request: &AnalysisRequest,
    policy: PayloadPolicy,
    mut reducer: R,
) -> Result<(R, ScanReport), wadash_analytics::AnalyticsError> {
    let report = Scan::new(data, &request.assemblies, &request.window, policy).run(&mut reducer)?;
    if report.files_failed > 0 {
        tracing::warn!(
            files_scanned = report.files_scanned,
            files_failed = report.files_failed,
            "scan finished with unreadable files"
        );
    }
    Ok((reducer, report))
}

fn analysis<T: Serialize>(results: T, scan: ScanReport) -> Analysis<T> {
    ApiResponse::ok(AnalysisBody { results, scan })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/search-messages
pub(super) async fn search_messages(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SearchBody>,
) -> Result<Analysis<SearchResults>, ApiError> {
    let rid = &req_id.0;
    let field = SearchField::parse(body.search_field.as_deref());
    let query = SearchQuery::new(body.search_term.as_deref(), field)
        .map_err(|e| map_analytics_error(rid, &e))?;
    let request = body.selection.into_request(rid)?;
    let filter = MessageFilter {
        label: MessageFilter::label_selector(body.label.as_deref()),
        sentiment: request.sentiment.clone(),
        search: Some(query),
    };

    let data = state.data.clone();
    let (reducer, scan) = run_blocking(rid, move || {
        scan_into(&data, &request, PayloadPolicy::ListOnly, SearchReducer::new(filter))
    })
    .await?;
    Ok(analysis(reducer.finish(), scan))
}

/// POST /api/group-sender-analysis
pub(super) async fn group_sender_analysis(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SelectionBody>,
) -> Result<Analysis<GroupSenderResults>, ApiError> {
    let rid = &req_id.0;
    let request = body.into_request(rid)?;

    let data = state.data.clone();
    let (reducer, scan) = run_blocking(rid, move || {
        let reducer = GroupSenderReducer::new(request.sentiment.clone());
        scan_into(&data, &request, PayloadPolicy::ListOnly, reducer)
    })
    .await?;
    Ok(analysis(reducer.finish(), scan))
}

/// POST /api/common-members-analysis
pub(super) async fn common_members_analysis(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SelectionBody>,
) -> Result<Analysis<CommonMembers>, ApiError> {
    let rid = &req_id.0;
    let request = body.into_request(rid)?;

    let data = state.data.clone();
    let (reducer, scan) = run_blocking(rid, move || {
        let reducer = CommonMembersReducer::new(request.sentiment.clone());
        scan_into(&data, &request, PayloadPolicy::ListOnly, reducer)
    })
    .await?;
    Ok(analysis(reducer.finish(), scan))
}

/// POST /api/group-details
pub(super) async fn group_details(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<GroupDetailsBody>,
) -> Result<Json<ApiResponse<ResultsBody<GroupDetails>>>, ApiError> {
    let data = state.data.clone();
    let results = run_blocking(&req_id.0, move || {
        aggregate::group_details(
            &data,
            body.assembly.as_deref(),
            body.date.as_deref(),
            body.group_name.as_deref(),
        )
    })
    .await?;
    Ok(ApiResponse::ok(ResultsBody { results }))
}

/// POST /api/member-details/{phone}
pub(super) async fn member_details(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(phone): Path<String>,
    Json(body): Json<SelectionBody>,
) -> Result<Analysis<MemberDetails>, ApiError> {
    let rid = &req_id.0;
    let request = body.into_request(rid)?;

    let data = state.data.clone();
    let (reducer, scan) = run_blocking(rid, move || {
        scan_into(
            &data,
            &request,
            PayloadPolicy::ListOnly,
            MemberDetailsReducer::new(phone),
        )
    })
    .await?;
    Ok(analysis(reducer.finish(), scan))
}

/// POST /api/analyze-json-files
pub(super) async fn analyze_json_files(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<JsonFilesBody>,
) -> Result<Analysis<JsonOverview>, ApiError> {
    let rid = &req_id.0;
    let request = AnalysisRequest::new(
        body.assemblies,
        body.start_date.as_deref(),
        body.end_date.as_deref(),
        body.sentiment.as_deref(),
    )
    .map_err(|e| map_analytics_error(rid, &e))?;

    let data = state.data.clone();
    let (results, scan) =
        run_blocking(rid, move || aggregate::json_overview(&data, &request)).await?;
    Ok(analysis(results, scan))
}

/// GET /api/get-assembly-dates/{assembly}
pub(super) async fn assembly_dates(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(assembly): Path<String>,
) -> Result<Json<ApiResponse<AssemblyDatesBody>>, ApiError> {
    let data = state.data.clone();
    let name = assembly.clone();
    let available_dates =
        run_blocking(&req_id.0, move || resolver::available_dates(&data, &name)).await?;
    Ok(ApiResponse::ok(AssemblyDatesBody {
        assembly_name: assembly,
        available_dates,
    }))
}

/// GET /api/get-assembly-messages/{assembly}
pub(super) async fn assembly_messages(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(assembly): Path<String>,
    Query(query): Query<AssemblyMessagesQuery>,
) -> Result<Json<ApiResponse<AssemblyMessagesBody>>, ApiError> {
    let rid = &req_id.0;
    let window = DateWindow::parse(query.start_date.as_deref(), query.end_date.as_deref())
        .map_err(|e| map_analytics_error(rid, &e))?;
    let sentiment = SentimentFilter::parse(query.sentiment.as_deref());

    let data = state.data.clone();
    let name = assembly.clone();
    let (listing, scan) = run_blocking(rid, move || {
        data.existing_assembly_dir(&name)?;
        let assemblies = vec![name];
        let mut reducer = AssemblyMessagesReducer::new(&data, sentiment);
        let scan = Scan::new(&data, &assemblies, &window, PayloadPolicy::ListOrObject)
            .run(&mut reducer)?;
        Ok((reducer.finish(), scan))
    })
    .await?;

    Ok(ApiResponse::ok(AssemblyMessagesBody {
        assembly_name: assembly,
        start_date: query.start_date.unwrap_or_default(),
        end_date: query.end_date.filter(|d| !d.trim().is_empty()),
        sentiment: query.sentiment.unwrap_or_else(|| "all".to_string()),
        listing,
        scan,
    }))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path as FsPath;

    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use crate::api::test_support::{app, get, post_json, send};

    fn message(name: &str, phone: &str, text: &str, sentiment: &str, ts: &str) -> Value {
        json!({
            "messageContent": text,
            "messageType": "text",
            "timestamp": ts,
            "sender": {"name": name, "phoneNumber": phone},
            "predicted_sentiment": sentiment,
            "predicted_label": "general",
        })
    }

    fn write_group(root: &FsPath, date: &str, group: &str, messages: &[Value]) {
        let dir = root.join("North").join(date).join("messages");
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(
            dir.join(format!("{group}.json")),
            serde_json::to_vec(messages).expect("json"),
        )
        .expect("write");
    }

    fn fixture() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_group(
            tmp.path(),
            "2025-01-15",
            "Ward 1",
            &[
                message("Asha", "9100", "road repair", "Positive", "2025-01-15T09:00:00"),
                message("Asha", "9100", "thanks", "Positive", "2025-01-15T10:00:00"),
                message("Ravi", "9200", "road broken", "Negative", "2025-01-15T11:00:00"),
            ],
        );
        write_group(
            tmp.path(),
            "2025-01-15",
            "Ward 2",
            &[
                message("Asha", "9100", "new road", "Positive", "2025-01-15T12:00:00"),
                message("Asha", "9100", "water issue", "Negative", "2025-01-15T13:00:00"),
                message("Meena", "9300", "road update", "Neutral", "2025-01-15T14:00:00"),
                message("Meena", "9300", "closed", "Neutral", "2025-01-15T15:00:00"),
                message("Ravi", "9200", "road again", "Negative", "2025-01-15T16:00:00"),
            ],
        );
        write_group(
            tmp.path(),
            "2025-01-16",
            "Ward 1",
            &[message("Ravi", "9200", "road", "Negative", "2025-01-16T09:00:00")],
        );
        tmp
    }

    #[tokio::test]
    async fn search_returns_results_and_scan_report() {
        let tmp = fixture();
        let body = json!({
            "searchTerm": "road",
            "assemblies": ["North"],
            "startDate": "2025-01-15",
        });

        let (status, json) = send(app(tmp.path()), post_json("/api/search-messages", &body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["results"]["total_messages"], 5);
        assert_eq!(json["results"]["total_groups"], 2);
        assert_eq!(json["scan"]["files_failed"], 0);
    }

    #[tokio::test]
    async fn search_checks_term_before_selection() {
        let tmp = fixture();
        let body = json!({"assemblies": []});

        let (status, json) = send(app(tmp.path()), post_json("/api/search-messages", &body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Search term is required");
    }

    #[tokio::test]
    async fn missing_assembly_selection_is_rejected() {
        let tmp = fixture();
        let body = json!({"assemblies": [], "startDate": "2025-01-15"});

        let (status, json) = send(
            app(tmp.path()),
            post_json("/api/common-members-analysis", &body),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Please select at least one assembly");
    }

    #[tokio::test]
    async fn reversed_range_is_rejected() {
        let tmp = fixture();
        let body = json!({
            "assemblies": ["North"],
            "startDate": "2025-01-16",
            "endDate": "2025-01-15",
        });

        let (status, json) = send(
            app(tmp.path()),
            post_json("/api/group-sender-analysis", &body),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "End date must be after start date");
    }

    #[tokio::test]
    async fn common_members_over_http() {
        let tmp = fixture();
        let body = json!({"assemblies": ["North"], "startDate": "2025-01-15"});

        let (status, json) = send(
            app(tmp.path()),
            post_json("/api/common-members-analysis", &body),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["results"]["total_common_members"], 2);
        assert_eq!(json["results"]["common_members"][0]["groups_count"], 2);
    }

    #[tokio::test]
    async fn group_details_reports_missing_file() {
        let tmp = fixture();
        let body = json!({"groupName": "Ward 9", "assembly": "North", "date": "2025-01-15"});

        let (status, json) = send(app(tmp.path()), post_json("/api/group-details", &body)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Group file not found");
    }

    #[tokio::test]
    async fn group_details_rejects_traversal() {
        let tmp = fixture();
        let body = json!({"groupName": "../../secret", "assembly": "North", "date": "2025-01-15"});

        let (status, _) = send(app(tmp.path()), post_json("/api/group-details", &body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn member_details_buckets_by_sentiment() {
        let tmp = fixture();
        let body = json!({"assemblies": ["North"], "startDate": "2025-01-15"});

        let (status, json) = send(
            app(tmp.path()),
            post_json("/api/member-details/9100", &body),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["results"]["member_info"]["total_messages"], 4);
        assert_eq!(
            json["results"]["messages_by_sentiment"]["Positive"]
                .as_array()
                .map(Vec::len),
            Some(3)
        );
    }

    #[tokio::test]
    async fn assembly_dates_lists_folders_or_404() {
        let tmp = fixture();

        let (status, json) = send(app(tmp.path()), get("/api/get-assembly-dates/North")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["available_dates"], json!(["2025-01-15", "2025-01-16"]));

        let (status, json) = send(app(tmp.path()), get("/api/get-assembly-dates/South")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Assembly not found");
    }

    #[tokio::test]
    async fn assembly_messages_filters_by_sentiment() {
        let tmp = fixture();

        let (status, json) = send(
            app(tmp.path()),
            get("/api/get-assembly-messages/North?start_date=2025-01-15&end_date=2025-01-16&sentiment=negative"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total_messages"], 4);
        assert_eq!(json["groups"]["Ward 1"]["count"], 2);
        assert_eq!(
            json["messages"][0]["file_path"],
            "North/2025-01-15/messages/Ward 1.json"
        );
    }

    #[tokio::test]
    async fn assembly_messages_requires_start_date() {
        let tmp = fixture();

        let (status, json) = send(app(tmp.path()), get("/api/get-assembly-messages/North")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Start date is required");
    }

    #[tokio::test]
    async fn analyze_json_files_uses_snake_case_dates() {
        let tmp = fixture();
        let body = json!({
            "assemblies": ["North"],
            "start_date": "2025-01-15",
            "end_date": "2025-01-16",
        });

        let (status, json) = send(app(tmp.path()), post_json("/api/analyze-json-files", &body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["results"]["total_json_files"], 3);
    }
}
