use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tracing::error;

use crate::{
    AppState, extraction::ExtractionError, graph_store::PersistenceError, queries::QueryError,
};

const PRODUCT_CONSTRAINT: &str = "product_source_url_unique";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/neo4j", get(health_neo4j))
        .route("/v1/maintenance/init-schema", post(init_schema))
        .route("/api/v1/extract", post(crate::api::extract::extract))
        .route("/api/v1/products", get(crate::api::products::get_product))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn health_neo4j(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state
        .executor
        .healthcheck()
        .await
        .map_err(AppError::neo4j)?;

    let schema = schema_summary(&state).await;
    Ok(Json(json!({
        "status": "ok",
        "neo4j": "connected",
        "schema": schema
    })))
}

/// Upserts are only race-free with the uniqueness constraint in place, so surface it.
async fn schema_summary(state: &AppState) -> Value {
    let cypher = r#"
        SHOW CONSTRAINTS
        YIELD name
        WHERE name = $name
        RETURN name
    "#;

    match state
        .executor
        .read_rows(
            cypher,
            HashMap::from([("name".to_string(), json!(PRODUCT_CONSTRAINT))]),
            &["name"],
            1,
        )
        .await
    {
        Ok(rows) => {
            let present = !rows.is_empty();
            json!({
                "status": if present { "ok" } else { "degraded" },
                "product_source_url_unique": present
            })
        }
        Err(e) => json!({
            "status": "unknown",
            "error": e.to_string()
        }),
    }
}

async fn init_schema(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let mut executed: Vec<String> = Vec::new();
    let mut failed: Vec<Value> = Vec::new();

    for key in state.queries.schema_keys() {
        let cypher = state.queries.get(&key).map_err(AppError::query)?;
        match state.executor.run(cypher, HashMap::new()).await {
            Ok(()) => executed.push(key),
            Err(e) => failed.push(json!({
                "key": key,
                "error": e.to_string()
            })),
        }
    }

    let ok = failed.is_empty();
    Ok(Json(json!({
        "status": if ok { "ok" } else { "partial" },
        "success": ok,
        "executed": executed,
        "failed": failed,
        "total": executed.len() + failed.len()
    })))
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }

    pub fn not_found(message: String) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message,
        }
    }

    pub fn extraction(err: ExtractionError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("error processing page: {err}"),
        }
    }

    pub fn persistence(err: PersistenceError) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: err.to_string(),
        }
    }

    pub fn query(err: QueryError) -> Self {
        match err {
            QueryError::NotFound(_) => Self::not_found(err.to_string()),
            _ => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: err.to_string(),
            },
        }
    }

    pub fn neo4j(err: crate::neo4j::Neo4jError) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("request_failed: {}", self.message);
        }
        let body = Json(json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}
