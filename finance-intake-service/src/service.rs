use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, Request, StatusCode, header},
    middleware::{Next, from_fn},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use page_flow::{ExecutionStatus, FlowError, FlowRunner, InMemorySessionStorage, SessionStorage};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, error, info};
use uuid::Uuid;

use crate::{
    advisory::{AdvisoryClient, AdvisoryRelay, GroqAdvisoryClient},
    config::Config,
    export::{PDF_MEDIA_TYPE, PdfRenderer, REPORT_FILENAME, ReportDocument},
    models::{Category, ChatTurn, IntakeFlow, IntakeSession, Page, PageInput},
    workflow::create_flow_runner,
};

type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<T, ApiError>;

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "session_id": id
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

fn flow_error(session_id: &str, e: FlowError) -> ApiError {
    match e {
        FlowError::SessionNotFound(_) => not_found_error("Session not found", session_id),
        FlowError::UnsupportedInput { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": e.to_string(), "session_id": session_id })),
        ),
        e => {
            error!(session_id = %session_id, error = %e, "Flow step failed");
            internal_error("Failed to process input", &e.to_string())
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub flow_runner: FlowRunner<IntakeFlow>,
    pub renderer: Arc<PdfRenderer>,
}

impl AppState {
    pub fn new(
        advisor: Arc<dyn AdvisoryClient>,
        session_storage: Arc<dyn SessionStorage<IntakeFlow>>,
        renderer: PdfRenderer,
    ) -> anyhow::Result<Self> {
        let flow_runner = create_flow_runner(AdvisoryRelay::new(advisor), session_storage)?;
        Ok(Self {
            flow_runner,
            renderer: Arc::new(renderer),
        })
    }
}

pub fn create_app(config: &Config) -> anyhow::Result<Router> {
    let session_storage: Arc<dyn SessionStorage<IntakeFlow>> = match config.session_ttl {
        Some(ttl) => {
            info!(ttl_secs = ttl.num_seconds(), "Using in-memory session storage with expiry");
            Arc::new(InMemorySessionStorage::with_ttl(ttl))
        }
        None => {
            info!("Using in-memory session storage without expiry");
            Arc::new(InMemorySessionStorage::new())
        }
    };

    let advisor = Arc::new(GroqAdvisoryClient::new(config.groq_api_key.clone()));
    let renderer = PdfRenderer::load(config.report_font_path.as_deref());

    let state = AppState::new(advisor, session_storage, renderer)?;
    Ok(build_router(state))
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/sessions", post(create_session))
        .route("/sessions/{session_id}", get(get_session))
        .route("/sessions/{session_id}/input", post(submit_input))
        .route("/sessions/{session_id}/report.pdf", get(download_report))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(correlation_id_middleware))
        .with_state(app_state)
}

/// Middleware to add correlation ID to all requests
async fn correlation_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Everything a view layer needs to draw the current page.
#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub page: Page,
    pub selected_categories: Vec<Category>,
    pub category_data: Value,
    pub chat_history: Vec<ChatTurn>,
    pub warning: Option<String>,
    pub status_message: Option<String>,
    pub download_url: Option<String>,
}

fn download_url(session_id: &str, page: Page) -> Option<String> {
    (page == Page::Download).then(|| format!("/sessions/{session_id}/report.pdf"))
}

impl From<&IntakeSession> for SessionSnapshot {
    fn from(session: &IntakeSession) -> Self {
        Self {
            session_id: session.id.clone(),
            page: session.page,
            selected_categories: session.data.selected_categories.clone(),
            category_data: session.data.category_view(),
            chat_history: session.data.chat_history.clone(),
            warning: session.warning.clone(),
            status_message: session.status_message.clone(),
            download_url: download_url(&session.id, session.page),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InputResponse {
    pub session_id: String,
    pub page: Page,
    pub response: Option<String>,
    pub warning: Option<String>,
    pub status: String,
    pub download_url: Option<String>,
}

fn validate_session_id(session_id: &str) -> Result<(), ApiError> {
    if Uuid::parse_str(session_id).is_err() {
        return Err(bad_request_error("Invalid session ID format"));
    }
    Ok(())
}

async fn load_session(state: &AppState, session_id: &str) -> ApiResult<IntakeSession> {
    validate_session_id(session_id)?;
    state
        .flow_runner
        .load(session_id)
        .await
        .map_err(|e| flow_error(session_id, e))
}

async fn create_session(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let session_id = Uuid::new_v4().to_string();
    info!(session_id = %session_id, "Creating new session");

    let session = state
        .flow_runner
        .start(session_id.clone())
        .await
        .map_err(|e| {
            error!(session_id = %session_id, error = %e, "Failed to create session");
            internal_error("Failed to create session", &e.to_string())
        })?;

    Ok((StatusCode::CREATED, Json(SessionSnapshot::from(&session))))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionSnapshot>> {
    info!(session_id = %session_id, "Getting session");
    let session = load_session(&state, &session_id).await?;
    Ok(Json(SessionSnapshot::from(&session)))
}

async fn submit_input(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(input): Json<PageInput>,
) -> ApiResult<Json<InputResponse>> {
    info!(session_id = %session_id, input = input.kind(), "Processing input");
    validate_session_id(&session_id)?;

    let result = state
        .flow_runner
        .run(&session_id, input)
        .await
        .map_err(|e| flow_error(&session_id, e))?;

    info!(
        session_id = %session_id,
        page = ?result.page,
        status = ?result.status,
        "Input processed"
    );

    let status = match result.status {
        ExecutionStatus::WaitingForInput => "waiting_for_input",
        ExecutionStatus::Completed => "completed",
    };

    Ok(Json(InputResponse {
        download_url: download_url(&session_id, result.page),
        session_id,
        page: result.page,
        response: result.response,
        warning: result.warning,
        status: status.to_string(),
    }))
}

async fn download_report(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Response> {
    let session = load_session(&state, &session_id).await?;
    if session.page != Page::Download {
        return Err((
            StatusCode::CONFLICT,
            Json(json!({
                "error": "Report is available on the download page only",
                "session_id": session_id,
                "page": session.page
            })),
        ));
    }

    let document = ReportDocument::from_data(&session.data);
    let renderer = state.renderer.clone();
    let bytes = tokio::task::spawn_blocking(move || renderer.render(&document))
        .await
        .map_err(|e| internal_error("Report rendering panicked", &e.to_string()))?
        .map_err(|e| {
            error!(session_id = %session_id, error = %e, "Failed to render report");
            internal_error("Failed to render report", &e.to_string())
        })?;

    info!(session_id = %session_id, bytes = bytes.len(), "Serving report");
    Ok((
        [
            (header::CONTENT_TYPE, PDF_MEDIA_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{REPORT_FILENAME}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
