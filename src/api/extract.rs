use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    AppState,
    domain::{ExtractedRecord, PageType},
    http::AppError,
};

/// Reported until the detector's scores are aggregated into a page-level confidence.
pub const PLACEHOLDER_CONFIDENCE: f64 = 0.92;

#[derive(Debug, Default, Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "type")]
    pub page_type: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("URL is required")]
    MissingUrl,
    #[error("Page type ('type') is required (e.g., 'product', 'article')")]
    MissingPageType,
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::bad_request(err.to_string())
    }
}

impl ExtractRequest {
    /// The url is passed on verbatim; only blank values are rejected.
    pub fn validate(self) -> Result<(String, PageType), ValidationError> {
        let url = self
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or(ValidationError::MissingUrl)?;
        let page_type = self
            .page_type
            .as_deref()
            .unwrap_or("")
            .parse::<PageType>()
            .map_err(|_| ValidationError::MissingPageType)?;
        Ok((url, page_type))
    }
}

#[derive(Debug, Serialize)]
pub struct ResponseMetadata {
    pub confidence: f64,
    pub source: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ProductBody {
    pub name: String,
    pub price: String,
    pub currency: String,
    pub images: Vec<String>,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct ArticleBody {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractPayload {
    Product(ProductBody),
    Article(ArticleBody),
    Data(ExtractedRecord),
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    #[serde(flatten)]
    pub payload: ExtractPayload,
    pub metadata: ResponseMetadata,
}

impl ExtractResponse {
    pub fn new(record: ExtractedRecord, generated_at: DateTime<Utc>) -> Self {
        let metadata = ResponseMetadata {
            confidence: PLACEHOLDER_CONFIDENCE,
            source: record.source_url().to_string(),
            timestamp: generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        };
        let page_type = record.page_type().clone();
        let payload = match page_type {
            PageType::Product => ExtractPayload::Product(ProductBody {
                name: record.name,
                price: record.price,
                currency: record.currency,
                images: record.images,
                attributes: record.attributes,
            }),
            PageType::Article => ExtractPayload::Article(ArticleBody {
                title: record.title,
                text: record.text,
            }),
            PageType::Other(_) => ExtractPayload::Data(record),
        };
        Self { payload, metadata }
    }
}

/// Validation and extraction errors fail the request. A failed product upsert does not:
/// it is logged and the extracted record is still returned.
pub async fn extract(
    State(state): State<AppState>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractResponse>, AppError> {
    let Json(req) = payload
        .map_err(|e| AppError::bad_request(format!("Error decoding request body: {e}")))?;
    let (url, page_type) = req.validate()?;

    let record = state
        .extractor
        .extract(&url, &page_type)
        .await
        .map_err(AppError::extraction)?;

    if record.is_product() && state.cfg.persistence_enabled {
        if let Err(e) = state.products.upsert_product(&record).await {
            tracing::warn!(
                source_url = %record.source_url(),
                error = %e,
                "product upsert failed; returning extraction result anyway"
            );
        }
    }

    Ok(Json(ExtractResponse::new(record, Utc::now())))
}
