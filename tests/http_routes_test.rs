mod common;

use axum::http::StatusCode;
use serde_json::json;

use vision_scraper_service::executor::Row;

use common::{Call, Harness, get, send};

const SHOW_CONSTRAINT_CYPHER: &str = r#"
        SHOW CONSTRAINTS
        YIELD name
        WHERE name = $name
        RETURN name
    "#;

#[tokio::test]
async fn health_is_ok() {
    let h = Harness::new();
    let (status, v) = send(h.app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v, json!({ "status": "ok" }));
}

#[tokio::test]
async fn health_neo4j_reports_missing_product_constraint_as_degraded() {
    let h = Harness::new();
    let (status, v) = send(h.app(), get("/health/neo4j")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["neo4j"], json!("connected"));
    assert_eq!(v["schema"]["status"], json!("degraded"));
    assert_eq!(v["schema"]["product_source_url_unique"], json!(false));
    assert!(
        h.graph
            .calls
            .lock()
            .unwrap()
            .iter()
            .any(|c| matches!(c, Call::Healthcheck))
    );
}

#[tokio::test]
async fn health_neo4j_reports_product_constraint_when_present() {
    let h = Harness::new();
    h.graph.canned.lock().unwrap().insert(
        SHOW_CONSTRAINT_CYPHER.trim().to_string(),
        vec![Row::from([(
            "name".to_string(),
            json!("product_source_url_unique"),
        )])],
    );

    let (status, v) = send(h.app(), get("/health/neo4j")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["schema"]["status"], json!("ok"));
}

#[tokio::test]
async fn init_schema_executes_schema_queries() {
    let h = Harness::new();
    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/v1/maintenance/init-schema")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, v) = send(h.app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["success"], json!(true));
    assert_eq!(v["executed"], json!(["schema/product_source_url_unique"]));

    let calls = h.graph.calls.lock().unwrap();
    assert!(calls.iter().any(|c| matches!(
        c,
        Call::Run { cypher } if cypher.contains("REQUIRE p.source_url IS UNIQUE")
    )));
}

#[tokio::test]
async fn product_lookup_requires_source_url() {
    let h = Harness::new();
    let (status, _) = send(h.app(), get("/api/v1/products")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
