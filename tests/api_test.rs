use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use poem::http::{Method, StatusCode};
use poem::test::{TestClient, TestResponse};
use psychro_chart_generator::core::engine::ChartEngine;
use psychro_chart_generator::core::error::ChartError;
use psychro_chart_generator::core::probe::DependencyProbe;
use psychro_chart_generator::core::psychrochart::PsychroChart;
use psychro_chart_generator::core::renderer::ChartRenderer;
use psychro_chart_generator::settings::Config;
use psychro_chart_generator::{AppState, init_openapi_route};
use serde_json::{Value, json};

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

struct BrokenRenderer;

impl ChartRenderer for BrokenRenderer {
    fn render_png(&self, _chart: &PsychroChart, _title: &str) -> Result<Vec<u8>, ChartError> {
        Err(ChartError::RenderFailure("backend unavailable".to_string()))
    }
}

fn client_with(app_state: AppState) -> TestClient<impl poem::Endpoint> {
    let app = init_openapi_route(Arc::new(app_state), &Config::default());
    TestClient::new(app)
}

fn client() -> TestClient<impl poem::Endpoint> {
    client_with(AppState::default())
}

async fn body_json(resp: TestResponse) -> Value {
    let body = resp.0.into_body().into_string().await.unwrap();
    serde_json::from_str(&body).unwrap()
}

fn assert_png(body: &Value) {
    let encoded = body["image_base64"].as_str().unwrap();
    assert!(!encoded.is_empty());
    let png = general_purpose::STANDARD.decode(encoded).unwrap();
    assert_eq!(&png[..8], &PNG_MAGIC);
}

#[tokio::test]
async fn chart_without_body_uses_defaults() {
    let cli = client();

    let resp = cli.post("/api/generate_psychro_chart").send().await;
    resp.assert_status_is_ok();

    let body = body_json(resp).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["chart_format"], "png");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    assert_eq!(
        body["parameters"],
        json!({"temp_min": 0, "temp_max": 40, "title": "Psychrometric Chart"})
    );
    assert_png(&body);
}

#[tokio::test]
async fn empty_object_matches_missing_body() {
    let cli = client();

    let without = body_json(cli.post("/api/generate_psychro_chart").send().await).await;
    let with_empty = body_json(
        cli.post("/api/generate_psychro_chart")
            .content_type("application/json")
            .body("{}")
            .send()
            .await,
    )
    .await;

    let keys = |v: &Value| {
        let mut keys: Vec<String> = v.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    };
    assert_eq!(keys(&without), keys(&with_empty));
    assert_eq!(without["parameters"], with_empty["parameters"]);
    assert_eq!(with_empty["status"], "success");
}

#[tokio::test]
async fn parameters_are_echoed_exactly() {
    let cli = client();

    let resp = cli
        .post("/api/generate_psychro_chart")
        .content_type("application/json")
        .body_json(&json!({"temp_min": 5, "temp_max": 35, "title": "Room A"}))
        .send()
        .await;
    resp.assert_status_is_ok();

    let body = body_json(resp).await;
    assert_eq!(
        body["parameters"],
        json!({"temp_min": 5, "temp_max": 35, "title": "Room A"})
    );
    assert_png(&body);
}

#[tokio::test]
async fn malformed_json_falls_back_to_defaults() {
    let cli = client();

    let resp = cli
        .post("/api/generate_psychro_chart")
        .content_type("application/json")
        .body("{\"temp_min\": 5,")
        .send()
        .await;
    resp.assert_status_is_ok();

    let body = body_json(resp).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["parameters"]["temp_min"], json!(0));
    assert_eq!(body["parameters"]["temp_max"], json!(40));
}

#[tokio::test]
async fn get_is_accepted_and_unicode_titles_survive() {
    let cli = client();

    let resp = cli
        .get("/api/generate_psychro_chart")
        .body_json(&json!({"temp_min": -10, "temp_max": 30.5, "title": "心理测量图 °C"}))
        .send()
        .await;
    resp.assert_status_is_ok();

    let body = body_json(resp).await;
    assert_eq!(body["parameters"]["temp_max"], json!(30.5));
    assert_eq!(body["parameters"]["title"], "心理测量图 °C");
}

#[tokio::test]
async fn inverted_range_is_an_error_envelope() {
    let cli = client();

    let resp = cli
        .post("/api/generate_psychro_chart")
        .body_json(&json!({"temp_min": 40, "temp_max": 0}))
        .send()
        .await;
    resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(resp).await;
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("temp_min"));
    assert!(body.get("image_base64").is_none());
    assert!(body.get("parameters").is_none());
}

#[tokio::test]
async fn wrong_field_type_is_an_error_envelope() {
    let cli = client();

    let resp = cli
        .post("/api/generate_psychro_chart")
        .body_json(&json!({"temp_min": "zero"}))
        .send()
        .await;
    resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(resp).await;
    assert_eq!(
        body,
        json!({"status": "error", "message": "invalid input: temp_min must be a number, got string"})
    );
}

#[tokio::test]
async fn title_of_any_type_is_echoed_as_sent() {
    let cli = client();

    let resp = cli
        .post("/api/generate_psychro_chart")
        .body_json(&json!({"title": 42, "temp_min": true, "temp_max": 30}))
        .send()
        .await;
    resp.assert_status_is_ok();

    let body = body_json(resp).await;
    assert_eq!(
        body["parameters"],
        json!({"temp_min": true, "temp_max": 30, "title": 42})
    );
    assert_png(&body);
}

#[tokio::test]
async fn non_object_json_body_is_an_error_envelope() {
    let cli = client();

    for raw in ["[1, 2]", "null", "17"] {
        let resp = cli
            .post("/api/generate_psychro_chart")
            .content_type("application/json")
            .body(raw)
            .send()
            .await;
        resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(resp).await;
        assert_eq!(body["status"], "error", "body {}", raw);
        assert!(body["message"].as_str().unwrap().contains("must be a JSON object"));
        assert!(body.get("image_base64").is_none());
    }
}

#[tokio::test]
async fn render_failure_returns_500_without_image() {
    let cli = client_with(AppState {
        engine: Arc::new(ChartEngine::with_renderer(Arc::new(BrokenRenderer))),
        probe: Arc::new(DependencyProbe::default()),
    });

    let resp = cli.post("/api/generate_psychro_chart").send().await;
    resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(resp).await;
    assert_eq!(
        body,
        json!({"status": "error", "message": "render failure: backend unavailable"})
    );
}

#[tokio::test]
async fn dependency_probe_reports_three_components() {
    let cli = client();

    for method in [Method::GET, Method::POST] {
        let resp = cli
            .request(method, "/api/http_trigger")
            .body("ignored")
            .send()
            .await;
        resp.assert_status_is_ok();

        let body = body_json(resp).await;
        let results = body.as_object().unwrap();
        let mut names: Vec<&str> = results.keys().map(String::as_str).collect();
        names.sort();
        assert_eq!(names, vec!["plotters", "psychrochart", "psychrolib"]);

        for (name, status) in results {
            let status = status.as_str().unwrap();
            assert!(
                status == "OK" || status.starts_with("ERROR: "),
                "{} reported {}",
                name,
                status
            );
        }
    }
}

#[tokio::test]
async fn health_is_invariant_across_requests() {
    let cli = client();
    let expected = json!({"status": "healthy", "service": "psychro-chart-generator"});

    for method in [Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
        let resp = cli
            .request(method.clone(), "/api/health")
            .query("probe", &"1")
            .body("{\"anything\": true}")
            .send()
            .await;
        resp.assert_status_is_ok();
        assert_eq!(body_json(resp).await, expected, "method {}", method);
    }

    let resp = cli.get("/api/health").send().await;
    resp.assert_status_is_ok();
    assert_eq!(body_json(resp).await, expected);
}

#[tokio::test]
async fn openapi_document_lists_every_endpoint() {
    let cli = client();

    let resp = cli.get("/openapi.json").send().await;
    resp.assert_status_is_ok();

    let body = body_json(resp).await;
    let paths = body["paths"].as_object().unwrap();
    for path in ["/generate_psychro_chart", "/http_trigger", "/health"] {
        assert!(paths.contains_key(path), "missing {}", path);
    }
}
