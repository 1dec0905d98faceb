//! # API REST
//!
//! REST API implementation for LIMS result entry and reception.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI documentation served as JSON
//! - REST-specific concerns (JSON serialization, CORS, API key header, status codes)
//!
//! Uses `api-shared` for request/response bodies and `lims-core` for every decision.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;

use api_shared::{
    validate_api_key, AcceptSampleReq, AcceptSampleRes, AcknowledgeReq, AuditListRes, AuthError,
    ClassifyReq, ClassifyRes, CreateResultSetReq, DecisionRes, EnterValueReq, ErrorRes,
    FlagSummaryView, GroupView, HealthRes, HealthService, ListResultSetsRes, ParameterView,
    PatientView, RejectSampleReq, ResultSetView, SampleListRes, SampleView, SubmitReq, SubmitRes,
    UpdateNotesReq,
};
use lims_core::audit::FanoutAuditSink;
use lims_core::fixtures::{demo_result_set, demo_sample, demo_worklist};
use lims_core::sample::{Priority, SampleStatus};
use lims_core::{
    AuditSink, CoreConfig, LimsError, MemoryAuditSink, NonEmptyText, ReceptionService,
    ReferenceRange, ResultEntryService, ResultSet, ResultSetStore, SampleRejection, SampleStore,
    TracingAuditSink, VerificationChecklist, WorklistFilter, WorklistQuery,
};

/// Application state for the REST API server
///
/// Services are cheap to clone; the store and audit trail behind them are shared.
#[derive(Clone)]
pub struct AppState {
    service: ResultEntryService,
    reception: ReceptionService,
    audit: MemoryAuditSink,
    api_key: Option<Arc<str>>,
}

impl AppState {
    /// Build state with empty stores. Audit events go to `tracing` and to an in-memory trail
    /// served by `GET /audit`.
    pub fn new(cfg: Arc<CoreConfig>, api_key: Option<String>) -> Self {
        let audit = MemoryAuditSink::new();
        let sink: Arc<dyn AuditSink> = Arc::new(FanoutAuditSink::new(vec![
            Arc::new(TracingAuditSink),
            Arc::new(audit.clone()),
        ]));

        Self {
            service: ResultEntryService::new(cfg.clone(), ResultSetStore::new(), sink.clone()),
            reception: ReceptionService::new(cfg, SampleStore::new(), sink),
            audit,
            api_key: api_key.filter(|k| !k.is_empty()).map(Arc::from),
        }
    }

    /// Load the demo result set, the reception sample and the bench worklist.
    pub fn seed_demo(&self) -> Result<(), LimsError> {
        let set = self.service.create(demo_result_set()?)?;
        tracing::info!(sample_id = %set.sample_id(), "seeded demo result set");

        self.reception.register(demo_sample()?)?;
        let worklist = demo_worklist()?;
        let count = worklist.len() + 1;
        for sample in worklist {
            self.reception.register(sample)?;
        }
        tracing::info!(count, "seeded demo samples");
        Ok(())
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_result_sets,
        create_result_set,
        get_result_set,
        enter_value,
        update_notes,
        acknowledge_critical,
        evaluate_result_set,
        submit_result_set,
        classify_value,
        list_audit,
        list_samples,
        get_sample,
        accept_sample,
        reject_sample,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        DecisionRes,
        ParameterView,
        GroupView,
        FlagSummaryView,
        ResultSetView,
        ListResultSetsRes,
        CreateResultSetReq,
        api_shared::CreateGroupReq,
        api_shared::CreateParameterReq,
        EnterValueReq,
        UpdateNotesReq,
        AcknowledgeReq,
        SubmitReq,
        SubmitRes,
        ClassifyReq,
        ClassifyRes,
        AcceptSampleReq,
        AcceptSampleRes,
        RejectSampleReq,
        AuditListRes,
        PatientView,
        SampleView,
        SampleListRes,
    ))
)]
pub struct ApiDoc;

/// Build the REST router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/result-sets", get(list_result_sets).post(create_result_set))
        .route("/result-sets/:id", get(get_result_set))
        .route("/result-sets/:id/parameters/:param_id", put(enter_value))
        .route("/result-sets/:id/notes", put(update_notes))
        .route("/result-sets/:id/acknowledgement", put(acknowledge_critical))
        .route("/result-sets/:id/evaluation", get(evaluate_result_set))
        .route("/result-sets/:id/submit", post(submit_result_set))
        .route("/classify", post(classify_value))
        .route("/audit", get(list_audit))
        .route("/samples", get(list_samples))
        .route("/samples/:sample_id", get(get_sample))
        .route("/reception/:sample_id/accept", post(accept_sample))
        .route("/reception/:sample_id/reject", post(reject_sample))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Error mapping
// ============================================================================

type ApiError = (StatusCode, Json<ErrorRes>);
type ApiResult<T> = Result<T, ApiError>;

fn error_body(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorRes {
            error: error.to_string(),
            decision: None,
        }),
    )
}

fn lims_error(err: LimsError) -> ApiError {
    let status = match &err {
        LimsError::NotFound(_) | LimsError::UnknownParameter(_) => StatusCode::NOT_FOUND,
        LimsError::VersionConflict { .. }
        | LimsError::AlreadySubmitted(_)
        | LimsError::ParameterNotEditable(_)
        | LimsError::InvalidTransition { .. } => StatusCode::CONFLICT,
        LimsError::SubmissionRejected(_) | LimsError::AcceptanceRejected(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LimsError::InvalidInput(_)
        | LimsError::Text(_)
        | LimsError::UnknownCheck(_)
        | LimsError::Document { .. } => StatusCode::BAD_REQUEST,
        LimsError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("request failed: {:?}", err);
    } else {
        tracing::debug!(status = status.as_u16(), "request refused: {}", err);
    }

    let decision = match &err {
        LimsError::SubmissionRejected(decision) => Some(DecisionRes::from(decision.clone())),
        _ => None,
    };
    (
        status,
        Json(ErrorRes {
            error: err.to_string(),
            decision,
        }),
    )
}

fn require_api_key(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let provided = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    validate_api_key(state.api_key.as_deref(), provided).map_err(|e: AuthError| {
        tracing::warn!("rejected request: {}", e);
        error_body(StatusCode::UNAUTHORIZED, e)
    })
}

fn operator(raw: &str) -> ApiResult<NonEmptyText> {
    NonEmptyText::new(raw)
        .map_err(|_| error_body(StatusCode::BAD_REQUEST, "operator cannot be empty"))
}

fn view(set: &ResultSet) -> Json<ResultSetView> {
    Json(ResultSetView::from(set))
}

// ============================================================================
// Handlers
// ============================================================================

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/result-sets",
    responses(
        (status = 200, description = "All result sets ordered by sample id", body = ListResultSetsRes)
    )
)]
#[axum::debug_handler]
async fn list_result_sets(State(state): State<AppState>) -> Json<ListResultSetsRes> {
    let result_sets = state
        .service
        .list()
        .iter()
        .map(ResultSetView::from)
        .collect();
    Json(ListResultSetsRes { result_sets })
}

#[utoipa::path(
    post,
    path = "/result-sets",
    request_body = CreateResultSetReq,
    responses(
        (status = 201, description = "Draft result set created", body = ResultSetView),
        (status = 400, description = "Invalid parameters, reference ranges, or a duplicate sample", body = ErrorRes),
        (status = 401, description = "Missing or invalid API key", body = ErrorRes)
    )
)]
/// Create a draft result set from upstream order data
///
/// Parameters arrive with reference ranges and, optionally, instrument values. Flags are
/// derived in the response and never accepted from the client.
#[axum::debug_handler]
async fn create_result_set(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateResultSetReq>,
) -> ApiResult<(StatusCode, Json<ResultSetView>)> {
    require_api_key(&state, &headers)?;
    let set = ResultSet::try_from(req).map_err(lims_error)?;
    let created = state.service.create(set).map_err(lims_error)?;
    Ok((StatusCode::CREATED, view(&created)))
}

#[utoipa::path(
    get,
    path = "/result-sets/{id}",
    params(("id" = String, Path, description = "Sample id")),
    responses(
        (status = 200, description = "Result set with derived flags", body = ResultSetView),
        (status = 404, description = "No result set for the sample", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_result_set(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<ResultSetView>> {
    let set = state.service.get(&id).map_err(lims_error)?;
    Ok(view(&set))
}

#[utoipa::path(
    put,
    path = "/result-sets/{id}/parameters/{param_id}",
    params(
        ("id" = String, Path, description = "Sample id"),
        ("param_id" = String, Path, description = "Parameter id")
    ),
    request_body = EnterValueReq,
    responses(
        (status = 200, description = "Value stored; flags re-derived", body = ResultSetView),
        (status = 404, description = "Unknown sample or parameter", body = ErrorRes),
        (status = 409, description = "Stale version, read-only parameter or submitted set", body = ErrorRes)
    )
)]
/// Enter or replace the raw value of one parameter
///
/// Any text is stored as entered; values that do not parse as numbers simply carry no flag.
#[axum::debug_handler]
async fn enter_value(
    State(state): State<AppState>,
    AxumPath((id, param_id)): AxumPath<(String, String)>,
    headers: HeaderMap,
    Json(req): Json<EnterValueReq>,
) -> ApiResult<Json<ResultSetView>> {
    require_api_key(&state, &headers)?;
    let operator = operator(&req.operator)?;
    let set = state
        .service
        .enter_value(&id, req.version, &operator, &param_id, &req.result)
        .map_err(lims_error)?;
    Ok(view(&set))
}

#[utoipa::path(
    put,
    path = "/result-sets/{id}/notes",
    params(("id" = String, Path, description = "Sample id")),
    request_body = UpdateNotesReq,
    responses(
        (status = 200, description = "Notes stored", body = ResultSetView),
        (status = 404, description = "No result set for the sample", body = ErrorRes),
        (status = 409, description = "Stale version or submitted set", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn update_notes(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
    Json(req): Json<UpdateNotesReq>,
) -> ApiResult<Json<ResultSetView>> {
    require_api_key(&state, &headers)?;
    let operator = operator(&req.operator)?;
    let set = state
        .service
        .set_notes(&id, req.version, &operator, &req.notes)
        .map_err(lims_error)?;
    Ok(view(&set))
}

#[utoipa::path(
    put,
    path = "/result-sets/{id}/acknowledgement",
    params(("id" = String, Path, description = "Sample id")),
    request_body = AcknowledgeReq,
    responses(
        (status = 200, description = "Acknowledgement stored", body = ResultSetView),
        (status = 404, description = "No result set for the sample", body = ErrorRes),
        (status = 409, description = "Stale version or submitted set", body = ErrorRes)
    )
)]
/// Set or clear the critical-value acknowledgement
///
/// Acknowledging a set with no critical values is allowed and has no effect on the gate.
#[axum::debug_handler]
async fn acknowledge_critical(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
    Json(req): Json<AcknowledgeReq>,
) -> ApiResult<Json<ResultSetView>> {
    require_api_key(&state, &headers)?;
    let operator = operator(&req.operator)?;
    let set = state
        .service
        .set_critical_acknowledged(&id, req.version, &operator, req.acknowledged)
        .map_err(lims_error)?;
    Ok(view(&set))
}

#[utoipa::path(
    get,
    path = "/result-sets/{id}/evaluation",
    params(("id" = String, Path, description = "Sample id")),
    responses(
        (status = 200, description = "Current gate decision", body = DecisionRes),
        (status = 404, description = "No result set for the sample", body = ErrorRes)
    )
)]
/// Evaluate the submission gate without submitting
#[axum::debug_handler]
async fn evaluate_result_set(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<DecisionRes>> {
    let decision = state.service.evaluate(&id).map_err(lims_error)?;
    Ok(Json(decision.into()))
}

#[utoipa::path(
    post,
    path = "/result-sets/{id}/submit",
    params(("id" = String, Path, description = "Sample id")),
    request_body = SubmitReq,
    responses(
        (status = 200, description = "Result set submitted", body = SubmitRes),
        (status = 404, description = "No result set for the sample", body = ErrorRes),
        (status = 409, description = "Stale version or already submitted", body = ErrorRes),
        (status = 422, description = "Gate refused; body carries the decision", body = ErrorRes)
    )
)]
/// Submit a result set for verification
///
/// The gate is re-evaluated against the stored set. A refusal leaves the set unchanged.
#[axum::debug_handler]
async fn submit_result_set(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
    Json(req): Json<SubmitReq>,
) -> ApiResult<Json<SubmitRes>> {
    require_api_key(&state, &headers)?;
    let operator = operator(&req.operator)?;
    let (set, decision) = state
        .service
        .submit(&id, req.version, &operator)
        .map_err(lims_error)?;
    Ok(Json(SubmitRes {
        decision: decision.into(),
        result_set: ResultSetView::from(&set),
    }))
}

#[utoipa::path(
    post,
    path = "/classify",
    request_body = ClassifyReq,
    responses(
        (status = 200, description = "Flag for the value", body = ClassifyRes),
        (status = 400, description = "Invalid reference range", body = ErrorRes)
    )
)]
/// Classify a single value against a reference range
#[axum::debug_handler]
async fn classify_value(Json(req): Json<ClassifyReq>) -> ApiResult<Json<ClassifyRes>> {
    let range =
        ReferenceRange::new(req.reference_low, req.reference_high).map_err(lims_error)?;
    if !req.value.is_finite() {
        return Err(error_body(StatusCode::BAD_REQUEST, "value must be finite"));
    }
    let flag = range.classify(req.value);
    let (critical_low, critical_high) = range.critical_bounds();
    Ok(Json(ClassifyRes {
        flag,
        critical: flag.is_critical(),
        critical_low,
        critical_high,
    }))
}

#[derive(Debug, Deserialize)]
struct AuditQuery {
    sample_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/audit",
    params(("sample_id" = Option<String>, Query, description = "Only events for this sample")),
    responses(
        (status = 200, description = "Audit events, oldest first", body = AuditListRes)
    )
)]
#[axum::debug_handler]
async fn list_audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Json<AuditListRes> {
    let events = match query.sample_id {
        Some(sample_id) => state.audit.events_for(&sample_id),
        None => state.audit.events(),
    };
    Json(AuditListRes { events })
}

#[derive(Debug, Deserialize)]
struct SampleQuery {
    search: Option<String>,
    department: Option<String>,
    test_type: Option<String>,
    priority: Option<Priority>,
    status: Option<SampleStatus>,
    page: Option<usize>,
    page_size: Option<usize>,
}

impl SampleQuery {
    fn into_worklist(self) -> WorklistQuery {
        let filter = WorklistFilter {
            search: self.search.filter(|s| !s.trim().is_empty()),
            department: self.department.filter(|s| !s.trim().is_empty()),
            test_type: self.test_type.filter(|s| !s.trim().is_empty()),
            priority: self.priority,
            status: self.status,
        };
        let mut query = WorklistQuery::new(filter).with_page(self.page.unwrap_or(1));
        if let Some(page_size) = self.page_size {
            query = query.with_page_size(page_size);
        }
        query
    }
}

#[utoipa::path(
    get,
    path = "/samples",
    params(
        ("search" = Option<String>, Query, description = "Patient name or PID, sample id or order id; case-insensitive"),
        ("department" = Option<String>, Query, description = "Bench department"),
        ("test_type" = Option<String>, Query, description = "Substring of the test type"),
        ("priority" = Option<String>, Query, description = "STAT, URGENT or NORMAL"),
        ("status" = Option<String>, Query, description = "Sample status, e.g. RECEIVED_AT_LAB"),
        ("page" = Option<usize>, Query, description = "1-based page, clamped to the last page"),
        ("page_size" = Option<usize>, Query, description = "Samples per page, default 8")
    ),
    responses(
        (status = 200, description = "One page of matching samples in registration order", body = SampleListRes),
        (status = 400, description = "Unrecognised priority, status or page", body = ErrorRes)
    )
)]
/// Sample worklist
///
/// Filters combine; an empty result still reports one page.
#[axum::debug_handler]
async fn list_samples(
    State(state): State<AppState>,
    Query(query): Query<SampleQuery>,
) -> Json<SampleListRes> {
    Json(state.reception.worklist(&query.into_worklist()).into())
}

#[utoipa::path(
    get,
    path = "/samples/{sample_id}",
    params(("sample_id" = String, Path, description = "Sample barcode")),
    responses(
        (status = 200, description = "Sample with its current status", body = SampleView),
        (status = 404, description = "Sample not registered", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_sample(
    State(state): State<AppState>,
    AxumPath(sample_id): AxumPath<String>,
) -> ApiResult<Json<SampleView>> {
    let sample = state.reception.get(&sample_id).map_err(lims_error)?;
    Ok(Json(SampleView::from(&sample)))
}

#[utoipa::path(
    post,
    path = "/reception/{sample_id}/accept",
    params(("sample_id" = String, Path, description = "Sample barcode")),
    request_body = AcceptSampleReq,
    responses(
        (status = 200, description = "Sample accepted", body = AcceptSampleRes),
        (status = 400, description = "Unknown verification check", body = ErrorRes),
        (status = 404, description = "Sample not registered", body = ErrorRes),
        (status = 409, description = "Sample can no longer be accepted", body = ErrorRes),
        (status = 422, description = "A required check is outstanding", body = ErrorRes)
    )
)]
/// Accept a sample at reception
///
/// `checked` lists the standard checks that passed. Every required check must be present.
#[axum::debug_handler]
async fn accept_sample(
    State(state): State<AppState>,
    AxumPath(sample_id): AxumPath<String>,
    headers: HeaderMap,
    Json(req): Json<AcceptSampleReq>,
) -> ApiResult<Json<AcceptSampleRes>> {
    require_api_key(&state, &headers)?;
    let operator = operator(&req.operator)?;
    let sample_id = NonEmptyText::new(&sample_id).map_err(|e| lims_error(e.into()))?;

    let mut checklist = VerificationChecklist::standard();
    for id in &req.checked {
        checklist.set_checked(id, true).map_err(lims_error)?;
    }

    let sample = state
        .reception
        .accept(&sample_id, &checklist, &operator)
        .map_err(lims_error)?;
    Ok(Json(AcceptSampleRes::new(
        lims_core::evaluate_acceptance(&checklist),
        &sample,
    )))
}

#[utoipa::path(
    post,
    path = "/reception/{sample_id}/reject",
    params(("sample_id" = String, Path, description = "Sample barcode")),
    request_body = RejectSampleReq,
    responses(
        (status = 204, description = "Rejection recorded"),
        (status = 400, description = "Missing comments for an Other rejection", body = ErrorRes),
        (status = 404, description = "Sample not registered", body = ErrorRes),
        (status = 409, description = "Sample is past reception", body = ErrorRes)
    )
)]
/// Reject a sample at reception with a categorised reason
///
/// Only samples that have not yet been accepted can be rejected.
#[axum::debug_handler]
async fn reject_sample(
    State(state): State<AppState>,
    AxumPath(sample_id): AxumPath<String>,
    headers: HeaderMap,
    Json(req): Json<RejectSampleReq>,
) -> ApiResult<StatusCode> {
    require_api_key(&state, &headers)?;
    let operator = operator(&req.operator)?;
    let sample_id = NonEmptyText::new(&sample_id).map_err(|e| lims_error(e.into()))?;

    let rejection = SampleRejection::new(
        sample_id,
        req.category,
        req.comments,
        req.notify_phlebotomy,
        req.request_recollection,
    )
    .map_err(lims_error)?;
    state
        .reception
        .reject(&rejection, &operator)
        .map_err(lims_error)?;
    Ok(StatusCode::NO_CONTENT)
}
