use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use finance_intake_service::{
    AppState,
    advisory::AdvisoryClient,
    build_router,
    export::{PdfRenderer, ReportFont},
    models::ChatTurn,
};
use page_flow::InMemorySessionStorage;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

/// Echoes questions back; a question containing "fail" makes the call fail.
struct EchoAdvisor;

#[async_trait]
impl AdvisoryClient for EchoAdvisor {
    async fn complete(&self, _system: &str, history: &[ChatTurn]) -> anyhow::Result<String> {
        let question = &history.last().expect("question present").content;
        if question.contains("fail") {
            anyhow::bail!("upstream unavailable");
        }
        Ok(format!("답변: {question}"))
    }
}

fn app() -> Router {
    let state = AppState::new(
        Arc::new(EchoAdvisor),
        Arc::new(InMemorySessionStorage::new()),
        PdfRenderer::new(ReportFont::Builtin),
    )
    .unwrap();
    build_router(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn create_session(app: &Router) -> String {
    let (status, body) = send(app, "POST", "/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["page"], "CHECKLIST");
    body["session_id"].as_str().unwrap().to_string()
}

async fn input(app: &Router, session_id: &str, input: Value) -> (StatusCode, Value) {
    send(app, "POST", &format!("/sessions/{session_id}/input"), Some(input)).await
}

async fn confirm(app: &Router, session_id: &str) -> Value {
    let (status, body) = input(app, session_id, json!({ "type": "confirm" })).await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_checklist_requires_selection() {
    let app = app();
    let id = create_session(&app).await;

    let body = confirm(&app, &id).await;
    assert_eq!(body["page"], "CHECKLIST");
    assert_eq!(body["warning"], "최소 하나의 항목을 선택해주세요.");

    let (status, _) = input(
        &app,
        &id,
        json!({ "type": "select_categories", "categories": ["세금 관리"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let body = confirm(&app, &id).await;
    assert_eq!(body["page"], "INPUT_FORM");
    assert!(body["warning"].is_null());
}

#[tokio::test]
async fn test_input_form_requires_data() {
    let app = app();
    let id = create_session(&app).await;
    input(&app, &id, json!({ "type": "select_categories", "categories": ["tax"] })).await;
    confirm(&app, &id).await;

    let body = confirm(&app, &id).await;
    assert_eq!(body["page"], "INPUT_FORM");
    assert_eq!(body["warning"], "모든 선택 항목에 대해 데이터를 입력해주세요.");

    input(
        &app,
        &id,
        json!({
            "type": "update_form",
            "records": [{ "category": "세금 관리", "annual_income": 5000, "tax_rate": 20 }]
        }),
    )
    .await;
    let body = confirm(&app, &id).await;
    assert_eq!(body["page"], "REPORT");

    let (_, snapshot) = send(&app, "GET", &format!("/sessions/{id}"), None).await;
    assert_eq!(
        snapshot["category_data"],
        json!({ "세금 관리": { "연소득": 5000, "세율": 20 } })
    );
}

#[tokio::test]
async fn test_full_session_and_download() {
    let app = app();
    let id = create_session(&app).await;

    input(&app, &id, json!({ "type": "select_categories", "categories": ["투자 관리"] })).await;
    confirm(&app, &id).await;
    input(
        &app,
        &id,
        json!({
            "type": "update_form",
            "records": [{
                "category": "investment",
                "ticker_name": "ABC",
                "share_count": 10,
                "price_per_share": 5.5
            }]
        }),
    )
    .await;
    confirm(&app, &id).await;

    let (_, body) = input(&app, &id, json!({ "type": "view" })).await;
    let summary = body["response"].as_str().unwrap();
    assert!(summary.contains("## 투자 관리"));
    assert!(summary.contains("ABC") && summary.contains("10") && summary.contains("5.5"));

    let body = confirm(&app, &id).await;
    assert_eq!(body["page"], "CHAT");

    let (_, body) = input(&app, &id, json!({ "type": "ask", "message": "전망은?" })).await;
    assert_eq!(body["response"], "답변: 전망은?");
    let (_, body) = input(&app, &id, json!({ "type": "ask", "message": "fail please" })).await;
    assert!(body["response"].as_str().unwrap().contains("upstream unavailable"));

    let (_, snapshot) = send(&app, "GET", &format!("/sessions/{id}"), None).await;
    assert_eq!(snapshot["chat_history"].as_array().unwrap().len(), 4);
    assert_eq!(snapshot["chat_history"][3]["role"], "assistant");

    let report_uri = format!("/sessions/{id}/report.pdf");
    let (status, _) = send(&app, "GET", &report_uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let body = confirm(&app, &id).await;
    assert_eq!(body["page"], "DOWNLOAD");
    assert_eq!(body["download_url"], report_uri.as_str());

    let (_, body) = input(&app, &id, json!({ "type": "view" })).await;
    assert_eq!(body["status"], "completed");

    let request = Request::builder()
        .uri(&report_uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"final_report.pdf\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_unsupported_input_is_rejected() {
    let app = app();
    let id = create_session(&app).await;

    let (status, _) = input(&app, &id, json!({ "type": "ask", "message": "hi" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, snapshot) = send(&app, "GET", &format!("/sessions/{id}"), None).await;
    assert_eq!(snapshot["page"], "CHECKLIST");
    assert!(snapshot["chat_history"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_and_malformed_sessions() {
    let app = app();

    let (status, _) = send(&app, "GET", "/sessions/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = "00000000-0000-4000-8000-000000000000";
    let (status, body) = send(&app, "GET", &format!("/sessions/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["session_id"], missing);

    let (status, _) = input(&app, missing, json!({ "type": "confirm" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_negative_values_are_not_accepted() {
    let app = app();
    let id = create_session(&app).await;
    input(&app, &id, json!({ "type": "select_categories", "categories": ["tax"] })).await;
    confirm(&app, &id).await;

    let (status, _) = input(
        &app,
        &id,
        json!({
            "type": "update_form",
            "records": [{ "category": "tax", "annual_income": -1, "tax_rate": 20 }]
        }),
    )
    .await;
    assert!(status.is_client_error());

    let (_, snapshot) = send(&app, "GET", &format!("/sessions/{id}"), None).await;
    assert_eq!(snapshot["category_data"], json!({}));
}
