use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use live_exam_back::{config::AppConfig, routes, state::AppState};

fn app() -> Router {
    app_with(AppConfig::default())
}

fn app_with(config: AppConfig) -> Router {
    routes::router(AppState::new(config))
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    host_token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = host_token {
        builder = builder.header("x-host-token", token);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn quiz() -> Value {
    json!({
        "title": "Capitals",
        "questions": [
            {
                "text": "Capital of France?",
                "options": [
                    {"text": "Lyon"},
                    {"text": "Paris", "is_correct": true},
                    {"text": "Nice"}
                ],
                "time_limit_seconds": 30
            },
            {
                "text": "Capital of Italy?",
                "options": [
                    {"text": "Rome", "is_correct": true},
                    {"text": "Milan"}
                ]
            }
        ]
    })
}

async fn create(app: &Router) -> (String, String) {
    let (status, body) = call(app, "POST", "/live/sessions", None, Some(quiz())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["total_questions"], 2);
    (
        body["code"].as_str().unwrap().to_string(),
        body["host_token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn full_session_over_rest() {
    let app = app();
    let (code, token) = create(&app).await;

    let (status, joined) = call(
        &app,
        "POST",
        &format!("/live/{code}/join"),
        None,
        Some(json!({"nickname": "  Ada   Lovelace "})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined["nickname"], "Ada Lovelace");
    assert_eq!(joined["redirect"], format!("/live/{code}/lobby"));
    assert_eq!(joined["rejoined"], false);

    let (status, body) = call(
        &app,
        "POST",
        &format!("/live/{code}/start"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (status, state) = call(&app, "GET", &format!("/live/{code}/state"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["state"], "question");
    assert_eq!(state["question_index"], 1);
    assert_eq!(state["players_count"], 1);
    assert_eq!(state["question"]["options"].as_array().unwrap().len(), 3);
    assert!(!state.to_string().contains("is_correct"));
    assert!(state["remaining_ms"].as_u64().unwrap() <= 30_000);

    let (status, late) = call(
        &app,
        "POST",
        &format!("/live/{code}/join"),
        None,
        Some(json!({"nickname": "Late"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(late["ok"], false);

    let (status, _) = call(
        &app,
        "POST",
        &format!("/live/{code}/end_question"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, revealed) = call(&app, "GET", &format!("/live/{code}/state"), None, None).await;
    assert_eq!(revealed["state"], "reveal");
    assert_eq!(revealed["correct_option_ids"], json!([2]));

    let (status, _) = call(
        &app,
        "POST",
        &format!("/live/{code}/next_question"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(
        &app,
        "POST",
        &format!("/live/{code}/end_question"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, done) = call(
        &app,
        "POST",
        &format!("/live/{code}/next_question"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["ok"], true);

    let (_, finished) = call(&app, "GET", &format!("/live/{code}/state"), None, None).await;
    assert_eq!(finished["state"], "finished");
    assert_eq!(finished["finish_reason"], "completed");
    assert_eq!(finished["top"][0]["nickname"], "Ada Lovelace");
    assert_eq!(finished["top"][0]["score"], 0);

    let (status, _) = call(&app, "DELETE", &format!("/live/{code}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, "GET", &format!("/live/{code}/state"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_transition_is_conflict_and_keeps_state() {
    let app = app();
    let (code, token) = create(&app).await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/live/{code}/next_question"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["ok"], false);
    assert!(body["message"].as_str().unwrap().contains("invalid transition"));

    let (_, state) = call(&app, "GET", &format!("/live/{code}/state"), None, None).await;
    assert_eq!(state["state"], "lobby");
    assert_eq!(state["version"], 0);

    let (status, _) = call(&app, "DELETE", &format!("/live/{code}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn host_routes_require_the_host_token() {
    let app = app();
    let (code, _) = create(&app).await;

    let (status, body) = call(&app, "POST", &format!("/live/{code}/start"), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["ok"], false);

    let (status, _) = call(
        &app,
        "POST",
        &format!("/live/{code}/start"),
        Some("not-the-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &app,
        "POST",
        "/live/ZZZZZZ/start",
        Some("not-the-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn start_accepts_a_question_count() {
    let app = app();
    let (code, token) = create(&app).await;

    let (status, _) = call(
        &app,
        "POST",
        &format!("/live/{code}/start"),
        Some(&token),
        Some(json!({"question_count": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "POST",
        &format!("/live/{code}/start"),
        Some(&token),
        Some(json!({"question_count": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, state) = call(&app, "GET", &format!("/live/{code}/state"), None, None).await;
    assert_eq!(state["total_questions"], 1);
}

#[tokio::test]
async fn invalid_payloads_are_rejected() {
    let app = app();

    let (status, body) = call(
        &app,
        "POST",
        "/live/sessions",
        None,
        Some(json!({"questions": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);

    let (status, _) = call(
        &app,
        "POST",
        "/live/sessions",
        None,
        Some(json!({"questions": [{"text": "q", "options": [{"text": "a"}, {"text": "b"}]}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (code, _) = create(&app).await;
    let (status, _) = call(
        &app,
        "POST",
        &format!("/live/{code}/join"),
        None,
        Some(json!({"nickname": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, "GET", "/healthcheck", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn null_time_limit_overrides_the_configured_default() {
    let config = AppConfig::from_json_str(r#"{"default_time_limit_seconds": 20}"#).unwrap();
    let app = app_with(config);

    let options = json!([{"text": "yes", "is_correct": true}, {"text": "no"}]);
    let (status, created) = call(
        &app,
        "POST",
        "/live/sessions",
        None,
        Some(json!({
            "questions": [
                {"text": "untimed", "options": options, "time_limit_seconds": null},
                {"text": "default", "options": options}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let code = created["code"].as_str().unwrap().to_string();
    let token = created["host_token"].as_str().unwrap().to_string();

    call(&app, "POST", &format!("/live/{code}/start"), Some(&token), None).await;
    let (_, untimed) = call(&app, "GET", &format!("/live/{code}/state"), None, None).await;
    assert_eq!(untimed["question"]["text"], "untimed");
    assert!(untimed["question"]["ends_at"].is_null());
    assert!(untimed["remaining_ms"].is_null());

    call(&app, "POST", &format!("/live/{code}/end_question"), Some(&token), None).await;
    call(&app, "POST", &format!("/live/{code}/next_question"), Some(&token), None).await;
    let (_, timed) = call(&app, "GET", &format!("/live/{code}/state"), None, None).await;
    assert_eq!(timed["question"]["text"], "default");
    assert!(timed["question"]["ends_at"].is_string());
    assert!(timed["remaining_ms"].as_u64().unwrap() <= 20_000);
}

#[tokio::test]
async fn out_of_range_time_limits_are_rejected() {
    let app = app();
    for seconds in [0, 3601] {
        let (status, body) = call(
            &app,
            "POST",
            "/live/sessions",
            None,
            Some(json!({"questions": [{
                "text": "q",
                "options": [{"text": "a", "is_correct": true}, {"text": "b"}],
                "time_limit_seconds": seconds
            }]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "limit {seconds}");
        assert_eq!(body["ok"], false);
    }
}
