use axum::http::StatusCode;
use axum_test::TestServer;
use nutrilog::constants::SESSION_COOKIE;
use nutrilog::gemini::GeminiClient;
use nutrilog::web_server::{router, AppState};
use serde_json::{json, Value};
use std::path::PathBuf;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/gemini-pro:generateContent";

const CURRY_ANSWER: &str = "\
カレーライス（1人前）の栄養成分の目安です。
- エネルギー: 約750kcal
- たんぱく質: 約18.5g
- 脂質: 約22g
- 糖質: 約110g
- カリウム: 約520mg";

fn test_server(gemini: &MockServer, api_key: Option<&str>) -> TestServer {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let client = GeminiClient::new(gemini.uri(), "gemini-pro");
    let state = AppState::new(root.join("templates"), client, api_key.map(str::to_string));
    TestServer::new(router(state, root.join("static"))).unwrap()
}

async fn mount_answer(gemini: &MockServer, status: u16, body: Value) {
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(gemini)
        .await;
}

fn answer(text: &str) -> Value {
    json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
}

#[tokio::test]
async fn test_page_asks_for_credential_when_none_configured() {
    let gemini = MockServer::start().await;
    let server = test_server(&gemini, None);

    let response = server.get("/").await;
    response.assert_status_ok();
    let body = response.text();
    assert!(body.contains("APIキーを入力してください。"));
    assert!(!body.contains("action=\"/analyze\""));
}

#[tokio::test]
async fn test_submitted_credential_unlocks_analysis() {
    let gemini = MockServer::start().await;
    mount_answer(&gemini, 200, answer(CURRY_ANSWER)).await;
    let server = test_server(&gemini, None);

    let first = server.get("/").await;
    let cookie = first.cookie(SESSION_COOKIE);

    server
        .post("/credential")
        .add_cookie(cookie.clone())
        .form(&[("api_key", "test-key")])
        .await
        .assert_status(StatusCode::SEE_OTHER);

    let page = server.get("/").add_cookie(cookie.clone()).await;
    assert!(page.text().contains("action=\"/analyze\""));

    let analysed = server
        .post("/analyze")
        .add_cookie(cookie)
        .form(&[("dish", "カレーライス")])
        .await;
    analysed.assert_status_ok();
    assert!(analysed.text().contains("約750kcal"));
}

#[tokio::test]
async fn test_analyze_add_and_summarise() {
    let gemini = MockServer::start().await;
    mount_answer(&gemini, 200, answer(CURRY_ANSWER)).await;
    let server = test_server(&gemini, Some("test-key"));

    let analysed = server.post("/analyze").form(&[("dish", "カレーライス")]).await;
    analysed.assert_status_ok();
    let cookie = analysed.cookie(SESSION_COOKIE);
    let body = analysed.text();
    assert!(body.contains("AI解析結果"));
    assert!(body.contains("action=\"/history\""));

    let added = server.post("/history").add_cookie(cookie.clone()).await;
    added.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(added.header("location"), "/?added=1");

    let page = server.get("/?added=1").add_cookie(cookie.clone()).await;
    let body = page.text();
    assert!(body.contains("食事履歴に追加しました！"));
    assert!(body.contains("摂取量のグラフ"));
    assert!(body.contains("摂取量と目標量の比較グラフ"));

    let summary: Value = server.get("/api/summary").add_cookie(cookie).await.json();
    assert_eq!(summary["history"].as_array().unwrap().len(), 1);
    assert_eq!(summary["history"][0]["dish"], "カレーライス");
    assert_eq!(summary["totals"]["エネルギー"], 750.0);
    assert_eq!(summary["totals"]["たんぱく質"], 18.5);
    assert_eq!(summary["totals"]["カリウム"], 520.0);
    assert_eq!(summary["target"]["カリウム"], 3500.0);
    assert_eq!(summary["comparison"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_add_is_hidden_and_refused_when_nothing_parsed() {
    let gemini = MockServer::start().await;
    mount_answer(&gemini, 200, answer("その料理についてはわかりません。")).await;
    let server = test_server(&gemini, Some("test-key"));

    let analysed = server.post("/analyze").form(&[("dish", "謎の料理")]).await;
    analysed.assert_status_ok();
    let cookie = analysed.cookie(SESSION_COOKIE);
    assert!(!analysed.text().contains("action=\"/history\""));

    server
        .post("/history")
        .add_cookie(cookie.clone())
        .await
        .assert_status(StatusCode::CONFLICT);

    let summary: Value = server.get("/api/summary").add_cookie(cookie).await.json();
    assert!(summary["history"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_model_failure_is_bad_gateway() {
    let gemini = MockServer::start().await;
    mount_answer(&gemini, 403, json!({ "error": { "message": "API key not valid" } })).await;
    let server = test_server(&gemini, Some("test-key"));

    let response = server.post("/analyze").form(&[("dish", "カレーライス")]).await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    assert!(response.text().contains("AIによる解析に失敗しました"));
}

#[tokio::test]
async fn test_failed_analysis_withdraws_previous_add_action() {
    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(body_string_contains("カレーライス"))
        .respond_with(ResponseTemplate::new(200).set_body_json(answer(CURRY_ANSWER)))
        .mount(&gemini)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(body_string_contains("ラーメン"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&gemini)
        .await;
    let server = test_server(&gemini, Some("test-key"));

    let curry = server.post("/analyze").form(&[("dish", "カレーライス")]).await;
    curry.assert_status_ok();
    let cookie = curry.cookie(SESSION_COOKIE);

    let ramen = server
        .post("/analyze")
        .add_cookie(cookie.clone())
        .form(&[("dish", "ラーメン")])
        .await;
    ramen.assert_status(StatusCode::BAD_GATEWAY);
    let body = ramen.text();
    assert!(!body.contains("action=\"/history\""));
    assert!(!body.contains("約750kcal"));

    server
        .post("/history")
        .add_cookie(cookie.clone())
        .await
        .assert_status(StatusCode::CONFLICT);

    let summary: Value = server.get("/api/summary").add_cookie(cookie).await.json();
    assert!(summary["history"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_sessions_do_not_share_history() {
    let gemini = MockServer::start().await;
    mount_answer(&gemini, 200, answer(CURRY_ANSWER)).await;
    let server = test_server(&gemini, Some("test-key"));

    let analysed = server.post("/analyze").form(&[("dish", "カレーライス")]).await;
    let cookie = analysed.cookie(SESSION_COOKIE);
    server.post("/history").add_cookie(cookie).await;

    // no cookie: a fresh session
    let summary: Value = server.get("/api/summary").await.json();
    assert!(summary["history"].as_array().unwrap().is_empty());
    assert_eq!(summary["totals"]["エネルギー"], 0.0);
}

#[tokio::test]
async fn test_static_missing_file_is_not_found() {
    let gemini = MockServer::start().await;
    let server = test_server(&gemini, None);

    server
        .get("/static/missing.css")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server.get("/static/style.css").await.assert_status_ok();
}

#[tokio::test]
async fn test_templates_directory_is_configurable() {
    let gemini = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("index.html"),
        "custom page: {{ title }} / {% if has_credential %}ready{% else %}locked{% endif %}",
    )
    .unwrap();

    let client = GeminiClient::new(gemini.uri(), "gemini-pro");
    let state = AppState::new(dir.path().to_path_buf(), client, None);
    let server = TestServer::new(router(state, dir.path().join("static"))).unwrap();

    let body = server.get("/").await.text();
    assert_eq!(body, "custom page: AI栄養解析＆献立提案アプリ / locked");
}
