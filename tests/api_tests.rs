use axum::http::StatusCode;
use axum_test::TestServer;
use netescola::{
    api::{create_router, AppState},
    channel_search::{ChannelDirectory, ChannelSearchClient},
    content_generator::ContentGenerator,
    llm_service::{AiContext, LLMService},
    local_store::{LocalStore, NotificationFlags, ReportLog},
    rate_limiter::{RateGate, RateLimitConfig},
    retry::RetryPolicy,
    roster::Roster,
    video_validator::VideoValidator,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn create_test_server() -> TestServer {
    let store = LocalStore::in_memory();
    let gate = RateGate::new(RateLimitConfig {
        max_concurrent: 1,
        min_interval: Duration::ZERO,
        poll_interval: Duration::from_millis(1),
    });
    let llm = LLMService::from_backends(Vec::new(), vec!["gemini-2.5-flash".to_string()]);
    let generator = ContentGenerator::new(AiContext::new(llm, gate, RetryPolicy::default()));
    let channel = ChannelSearchClient::new(
        None,
        ChannelDirectory {
            medio: "UC_MEDIO".to_string(),
            fundamental: "UC_FUNDAMENTAL".to_string(),
        },
        30,
    );
    let validator = VideoValidator::new(ReportLog::new(store.clone()), None);

    let state = AppState::new(
        Arc::new(Roster::builtin().clone()),
        generator,
        channel,
        validator,
        NotificationFlags::new(store),
    );
    TestServer::new(create_router(state)).unwrap()
}

async fn login(server: &TestServer, registration: &str) -> String {
    let response = server
        .post("/api/login")
        .json(&json!({ "registration": registration, "password": registration }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["data"]["sessionId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_api_health() {
    let server = create_test_server();

    let response = server.get("/api/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["aiConfigured"], false);
    assert_eq!(body["data"]["youtubeConfigured"], false);
}

#[tokio::test]
async fn test_api_login_rules() {
    let server = create_test_server();

    let response = server
        .post("/api/login")
        .json(&json!({ "matricula": "20231001", "senha": "20231001" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["student"]["name"], "Ana Beatriz Souza");
    assert_eq!(body["data"]["view"], "dashboard");

    let response = server
        .post("/api/login")
        .json(&json!({ "registration": "20231001", "password": "wrong" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["success"], false);

    let response = server
        .post("/api/login")
        .json(&json!({ "registration": "", "password": "" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_api_analysis_flow_and_summary_fallback() {
    let server = create_test_server();
    let session = login(&server, "20231001").await;

    let response = server
        .post(&format!("/api/sessions/{}/analysis", session))
        .json(&json!({ "bimester": 1 }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["step"], "report");
    assert_eq!(body["data"]["weakSubjects"], json!(["Matemática", "Física"]));
    assert_eq!(body["data"]["hasLowGrades"], true);

    let response = server.get(&format!("/api/sessions/{}/summary", session)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["status"], "ready");
    assert_eq!(body["data"]["fallback"], true);
    let text = body["data"]["text"].as_str().unwrap();
    assert!(text.contains("Ana"));
    assert!(text.contains("Matemática"));

    // A second analysis needs a trip back to selection first
    let response = server
        .post(&format!("/api/sessions/{}/analysis", session))
        .json(&json!({ "bimester": 2 }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let response = server.post(&format!("/api/sessions/{}/back", session)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"], "selection");

    let response = server.get(&format!("/api/sessions/{}/summary", session)).await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_api_invalid_bimester_is_rejected() {
    let server = create_test_server();
    let session = login(&server, "20241003").await;

    let response = server
        .post(&format!("/api/sessions/{}/analysis", session))
        .json(&json!({ "bimester": 5 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_api_recommendations_require_reinforcement_step() {
    let server = create_test_server();
    let session = login(&server, "20231001").await;

    let response = server
        .post(&format!("/api/sessions/{}/recommendations", session))
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    server
        .post(&format!("/api/sessions/{}/analysis", session))
        .json(&json!({ "bimester": 1 }))
        .await
        .assert_status_ok();
    server
        .post(&format!("/api/sessions/{}/reinforcement", session))
        .await
        .assert_status_ok();

    let response = server
        .post(&format!("/api/sessions/{}/recommendations", session))
        .json(&json!({}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["mode"], "automatic");
    let videos = body["data"]["videos"].as_array().unwrap();
    assert!(!videos.is_empty());
    assert!(videos.iter().all(|v| v["justification"].is_string()));
}

#[tokio::test]
async fn test_api_quiz_unavailable_without_ai() {
    let server = create_test_server();
    let session = login(&server, "20231001").await;

    let response = server
        .post(&format!("/api/sessions/{}/quiz", session))
        .json(&json!({ "videoId": "gt3_qui_termoquimica", "difficulty": "Iniciante" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["status"], "unavailable");
    assert_eq!(body["data"]["video_id"], "gt3_qui_termoquimica");

    let response = server.get(&format!("/api/sessions/{}/quiz", session)).await;
    let body: Value = response.json();
    assert_eq!(body["data"]["status"], "unavailable");

    let response = server
        .post(&format!("/api/sessions/{}/quiz", session))
        .json(&json!({ "videoId": "does_not_exist", "difficulty": "Avançado" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_justification_uses_template_without_ai() {
    let server = create_test_server();
    let session = login(&server, "20231001").await;

    server
        .post(&format!("/api/sessions/{}/analysis", session))
        .json(&json!({ "bimester": 1 }))
        .await
        .assert_status_ok();

    let response = server
        .post(&format!("/api/sessions/{}/justification", session))
        .json(&json!({ "videoId": "gt3_bio_genetica_conceitos" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["fallback"], true);
    assert!(body["data"]["justification"].is_string());
}

#[tokio::test]
async fn test_api_comparison() {
    let server = create_test_server();
    let session = login(&server, "20241002").await;

    let response = server
        .get(&format!("/api/sessions/{}/comparison?first=1&second=2", session))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let subjects = body["data"]["subjects"].as_array().unwrap();
    let geography = subjects.iter().find(|s| s["subject"] == "Geografia").unwrap();
    assert_eq!(geography["secondBimester"], 0.0);
}

#[tokio::test]
async fn test_api_report_then_validate() {
    let server = create_test_server();

    let response = server
        .post("/api/videos/validate")
        .json(&json!({ "videoIds": ["gt3_qui_termoquimica"] }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"][0]["playable"], true);

    server
        .post("/api/videos/gt3_qui_termoquimica/report")
        .json(&json!({ "issueType": "not_loading", "userId": "20231001" }))
        .await
        .assert_status_ok();

    let response = server
        .post("/api/videos/validate")
        .json(&json!({ "videoIds": ["gt3_qui_termoquimica"] }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["data"][0]["playable"], false);
    assert_eq!(body["data"][0]["error"], "reported as unavailable");

    let response = server.get("/api/reports").await;
    let body: Value = response.json();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["byIssueType"]["not_loading"], 1);

    server.delete("/api/reports").await.assert_status_ok();
    let response = server
        .post("/api/videos/validate")
        .json(&json!({ "videoIds": ["gt3_qui_termoquimica"] }))
        .await;
    let body: Value = response.json();
    assert_eq!(body["data"][0]["playable"], true);
}

#[tokio::test]
async fn test_api_validate_keeps_request_order() {
    let server = create_test_server();

    let response = server
        .post("/api/videos/validate")
        .json(&json!({
            "videoIds": ["gt3_qui_velocidade", "gt3_hist_1", "gt3_qui_termoquimica"]
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let checks = body["data"].as_array().unwrap();
    let ids: Vec<&str> = checks.iter().map(|c| c["videoId"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["gt3_qui_velocidade", "gt3_hist_1", "gt3_qui_termoquimica"]);
    assert!(checks.iter().all(|c| c["playable"] == true));
}

#[tokio::test]
async fn test_api_validate_rejects_empty_and_unknown() {
    let server = create_test_server();

    server
        .post("/api/videos/validate")
        .json(&json!({}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post("/api/videos/validate")
        .json(&json!({ "videoIds": ["missing"] }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_subjects_and_notifications() {
    let server = create_test_server();

    let response = server
        .get("/api/subjects")
        .add_query_param("grade", "9º Ano EF")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["channel"].as_array().unwrap().len(), 10);
    assert!(!body["data"]["catalog"].as_array().unwrap().is_empty());

    server
        .get("/api/subjects")
        .add_query_param("grade", "8º Ano EF")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = server.post("/api/notifications/welcome/seen").await;
    let body: Value = response.json();
    assert_eq!(body["data"]["firstTime"], true);

    let response = server.post("/api/notifications/welcome/seen").await;
    let body: Value = response.json();
    assert_eq!(body["data"]["firstTime"], false);

    let response = server.get("/api/notifications/welcome").await;
    let body: Value = response.json();
    assert_eq!(body["data"]["seen"], true);
}

#[tokio::test]
async fn test_api_logout_ends_session() {
    let server = create_test_server();
    let session = login(&server, "20241003").await;

    let response = server
        .post("/api/logout")
        .json(&json!({ "sessionId": session }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"], "home");

    server
        .get(&format!("/api/sessions/{}/quiz", session))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
