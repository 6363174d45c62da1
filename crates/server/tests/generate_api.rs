//! End-to-end tests of the HTTP surface with a mocked inference endpoint.

use actix_web::{http::StatusCode, test, web, App};
use deck_core::LayoutTable;
use deck_pptx::{fixture, DeckInspector, DeckSummary, Template};
use deck_server::config::ApiConfig;
use deck_server::{app_config, AppConfig, AppState};
use serde_json::{json, Value};
use std::io::Cursor;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const UPSTREAM_PATH: &str = "/v1/run";
const LAYOUT_COUNT: usize = 11;

struct TestEnv {
    dir: TempDir,
    upstream: MockServer,
}

impl TestEnv {
    async fn new(with_template: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        if with_template {
            std::fs::write(
                dir.path().join("template.pptx"),
                fixture::minimal_template(LAYOUT_COUNT),
            )
            .unwrap();
        }
        std::fs::create_dir_all(dir.path().join("output")).unwrap();
        std::fs::create_dir_all(dir.path().join("static")).unwrap();
        std::fs::write(
            dir.path().join("static/index.html"),
            "<html><body>Deck generator</body></html>",
        )
        .unwrap();

        Self {
            dir,
            upstream: MockServer::start().await,
        }
    }

    fn config(&self) -> AppConfig {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            api: ApiConfig {
                url: format!("{}{}", self.upstream.uri(), UPSTREAM_PATH),
                token: "test-token".to_string(),
                user_id: "12345".to_string(),
                timeout: Duration::from_secs(5),
            },
            template_path: self.dir.path().join("template.pptx"),
            output_dir: self.dir.path().join("output"),
            static_dir: self.dir.path().join("static"),
            layouts: LayoutTable::default(),
        }
    }

    async fn respond_with_outline(&self, outline: &str) {
        Mock::given(method("POST"))
            .and(path(UPSTREAM_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"outputs": {"out-1": outline}})),
            )
            .expect(1)
            .mount(&self.upstream)
            .await;
    }

    fn output_files(&self) -> Vec<std::path::PathBuf> {
        std::fs::read_dir(self.dir.path().join("output"))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }
}

macro_rules! init_app {
    ($env:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new($env.config()).unwrap()))
                .configure(app_config),
        )
        .await
    };
}

fn generate_request(body: Value) -> test::TestRequest {
    test::TestRequest::post().uri("/generate").set_json(body)
}

fn inspect(body: &[u8]) -> DeckSummary {
    DeckInspector::new()
        .inspect(Cursor::new(body.to_vec()))
        .unwrap()
}

fn layout_index(part: &str) -> Option<usize> {
    Template::from_bytes(fixture::minimal_template(LAYOUT_COUNT))
        .unwrap()
        .layout_index_of(part)
}

#[actix_web::test]
async fn test_missing_text_is_rejected_without_calling_upstream() {
    let env = TestEnv::new(true).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&env.upstream)
        .await;
    let app = init_app!(env);

    let resp = test::call_service(&app, generate_request(json!({"prompt": "hi"})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"error": "Missing 'text' field in request payload"}));
    assert!(env.upstream.received_requests().await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_null_text_is_rejected() {
    let env = TestEnv::new(true).await;
    let app = init_app!(env);

    let resp = test::call_service(&app, generate_request(json!({"text": null})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(env.upstream.received_requests().await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_malformed_body_is_bad_request() {
    let env = TestEnv::new(true).await;
    let app = init_app!(env);

    let req = test::TestRequest::post()
        .uri("/generate")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request payload"));
}

#[actix_web::test]
async fn test_upstream_failure_reports_status_code() {
    let env = TestEnv::new(true).await;
    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&env.upstream)
        .await;
    let app = init_app!(env);

    let resp = test::call_service(
        &app,
        generate_request(json!({"text": "quarterly update"})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("503"), "{}", message);
    assert!(env.output_files().is_empty());
}

#[actix_web::test]
async fn test_client_error_upstream_is_also_500() {
    let env = TestEnv::new(true).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&env.upstream)
        .await;
    let app = init_app!(env);

    let resp = test::call_service(&app, generate_request(json!({"text": "x"})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "API request failed with status code 401");
}

#[actix_web::test]
async fn test_quarterly_update_scenario() {
    let env = TestEnv::new(true).await;
    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({"user_id": "12345", "in-0": "quarterly update"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "outputs": {
                "out-1": "{\"slides\":[{\"layout\":\"title\",\"content\":{\"placeholder 0\":\"Q3 Update\"}}]}"
            }
        })))
        .expect(1)
        .mount(&env.upstream)
        .await;
    let app = init_app!(env);

    let resp = test::call_service(
        &app,
        generate_request(json!({"text": "quarterly update"})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/vnd.openxmlformats-officedocument.presentationml.presentation"
    );

    let disposition = resp
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment"), "{}", disposition);
    assert!(disposition.contains("presentation.pptx"), "{}", disposition);
    assert_eq!(resp.headers().get("x-deck-warning-count").unwrap(), "0");
    assert!(resp.headers().get("x-deck-warnings").is_none());
    assert!(resp.headers().get("x-request-id").is_some());

    let body = test::read_body(resp).await;
    let deck = inspect(&body);
    assert_eq!(deck.slides.len(), 1);
    assert_eq!(layout_index(&deck.slides[0].layout_part), Some(0));
    assert_eq!(deck.slides[0].text_of(0), Some("Q3 Update"));

    assert!(env.output_files().is_empty());
}

#[actix_web::test]
async fn test_output_dir_does_not_grow_across_requests() {
    let env = TestEnv::new(true).await;
    Mock::given(method("POST"))
        .and(path(UPSTREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "outputs": {"out-1": "{\"slides\":[{\"layout\":\"title\"}]}"}
        })))
        .expect(5)
        .mount(&env.upstream)
        .await;
    let app = init_app!(env);

    let mut request_ids = std::collections::HashSet::new();
    for _ in 0..5 {
        let resp = test::call_service(&app, generate_request(json!({"text": "x"})).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        request_ids.insert(resp.headers().get("x-request-id").unwrap().to_str().unwrap().to_string());
        assert_eq!(inspect(&test::read_body(resp).await).slides.len(), 1);
    }

    assert_eq!(request_ids.len(), 5);
    assert!(env.output_files().is_empty());
}

#[actix_web::test]
async fn test_fenced_outline_matches_plain() {
    let outline = r#"{"slides":[{"layout":"Agenda","content":{"placeholder 0":"Agenda","placeholder 1":"Intro\nNumbers\nNext steps"}}]}"#;

    let mut decks = Vec::new();
    for raw in [outline.to_string(), format!("```json\n{}\n```", outline)] {
        let env = TestEnv::new(true).await;
        env.respond_with_outline(&raw).await;
        let app = init_app!(env);

        let resp = test::call_service(&app, generate_request(json!({"text": "plan"})).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        decks.push(inspect(&test::read_body(resp).await));
    }

    let (plain, fenced) = (&decks[0], &decks[1]);
    assert_eq!(plain.slides.len(), 1);
    assert_eq!(
        plain.slides[0].placeholders,
        fenced.slides[0].placeholders
    );
    assert_eq!(layout_index(&fenced.slides[0].layout_part), Some(7));
    assert_eq!(fenced.slides[0].text_of(1), Some("Intro\nNumbers\nNext steps"));
}

#[actix_web::test]
async fn test_unknown_layout_falls_back_with_warning() {
    let env = TestEnv::new(true).await;
    env.respond_with_outline(
        r#"{"slides":[{"layout":"Mystery","content":{"placeholder 0":"Hello"}},{"layout":"subtitle","content":{"title":"no index"}}]}"#,
    )
    .await;
    let app = init_app!(env);

    let resp = test::call_service(&app, generate_request(json!({"text": "x"})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("x-deck-warning-count").unwrap(), "2");

    let warnings: Value = serde_json::from_str(
        resp.headers()
            .get("x-deck-warnings")
            .unwrap()
            .to_str()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(warnings[0]["slide"], 1);
    assert_eq!(warnings[1]["slide"], 2);

    let deck = inspect(&test::read_body(resp).await);
    assert_eq!(deck.slides.len(), 2);
    assert_eq!(layout_index(&deck.slides[0].layout_part), Some(0));
    assert_eq!(deck.slides[0].text_of(0), Some("Hello"));
    assert_eq!(layout_index(&deck.slides[1].layout_part), Some(1));
}

#[actix_web::test]
async fn test_missing_template_is_server_error() {
    let env = TestEnv::new(false).await;
    env.respond_with_outline(r#"{"slides":[]}"#).await;
    let app = init_app!(env);

    let resp = test::call_service(&app, generate_request(json!({"text": "x"})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("Template file"), "{}", message);
    assert!(message.ends_with("does not exist."), "{}", message);
}

#[actix_web::test]
async fn test_missing_output_key_is_server_error() {
    let env = TestEnv::new(true).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"outputs": {}})))
        .mount(&env.upstream)
        .await;
    let app = init_app!(env);

    let resp = test::call_service(&app, generate_request(json!({"text": "x"})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "'out-1' key not found in the API response.");
}

#[actix_web::test]
async fn test_unparseable_outline_is_server_error() {
    let env = TestEnv::new(true).await;
    env.respond_with_outline("Sorry, I can't help with that.").await;
    let app = init_app!(env);

    let resp = test::call_service(&app, generate_request(json!({"text": "x"})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Error parsing API response"));
}

#[actix_web::test]
async fn test_missing_landing_page_is_not_found() {
    let env = TestEnv::new(true).await;
    std::fs::remove_file(env.dir.path().join("static/index.html")).unwrap();
    let app = init_app!(env);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_index_serves_landing_page() {
    let env = TestEnv::new(true).await;
    let app = init_app!(env);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = test::read_body(resp).await;
    assert!(String::from_utf8_lossy(&body).contains("Deck generator"));
}
