use std::{collections::BTreeMap, future::Future, time::Duration};

use async_trait::async_trait;

use crate::{
    domain::{DetectionElement, ExtractedRecord, PageType},
    extraction::{ExtractionError, ExtractionStrategy, Stage, collaborators::Collaborators},
};

pub const PRODUCT_TITLE: &str = "product_title";

/// Field values used until price/currency parsing and image/attribute extraction read
/// them from the page itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionalFields {
    pub name: String,
    pub price: String,
    pub currency: String,
    pub images: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub title: String,
    pub text: String,
}

impl Default for ProvisionalFields {
    fn default() -> Self {
        Self {
            name: "Dummy Product Name".to_string(),
            price: "19.99".to_string(),
            currency: "USD".to_string(),
            images: Vec::new(),
            attributes: BTreeMap::new(),
            title: "Dummy Article Title".to_string(),
            text: String::new(),
        }
    }
}

impl ProvisionalFields {
    fn apply(&self, record: &mut ExtractedRecord) {
        match record.page_type() {
            PageType::Product => {
                record.name = self.name.clone();
                record.price = self.price.clone();
                record.currency = self.currency.clone();
                record.images = self.images.clone();
                record.attributes = self.attributes.clone();
            }
            PageType::Article => {
                record.title = self.title.clone();
                record.text = self.text.clone();
            }
            PageType::Other(_) => {}
        }
    }
}

/// Render, detect, read text, then assemble. Every collaborator call is bounded by
/// `call_timeout`.
pub struct PipelineExtractor {
    collaborators: Collaborators,
    provisional: ProvisionalFields,
    call_timeout: Duration,
}

impl PipelineExtractor {
    pub fn new(collaborators: Collaborators, call_timeout: Duration) -> Self {
        Self {
            collaborators,
            provisional: ProvisionalFields::default(),
            call_timeout,
        }
    }

    pub fn with_provisional(mut self, provisional: ProvisionalFields) -> Self {
        self.provisional = provisional;
        self
    }

    async fn bounded<T, F>(&self, stage: Stage, fut: F) -> Result<T, ExtractionError>
    where
        F: Future<Output = Result<T, ExtractionError>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(r) => r,
            Err(_) => Err(ExtractionError::Timeout {
                stage,
                after: self.call_timeout,
            }),
        }
    }

    async fn resolve_text(
        &self,
        screenshot_path: &str,
        mut detections: Vec<DetectionElement>,
    ) -> Result<Vec<DetectionElement>, ExtractionError> {
        for d in detections.iter_mut() {
            // Blank text from any source counts as unread.
            d.text = d.text.take().filter(|t| !t.trim().is_empty());
            if d.text.is_some() {
                continue;
            }
            let text = self
                .bounded(
                    Stage::Ocr,
                    self.collaborators.ocr.read_region(screenshot_path, d),
                )
                .await?;
            d.text = text.filter(|t| !t.trim().is_empty());
        }
        Ok(detections)
    }
}

/// First `product_title` region with text names the product. Price text stays on its
/// element; parsing it into price/currency is not done yet.
fn apply_detected_text(record: &mut ExtractedRecord, detections: &[DetectionElement]) {
    if !record.is_product() {
        return;
    }
    let title = detections
        .iter()
        .filter(|d| d.element_type == PRODUCT_TITLE)
        .filter_map(|d| d.text.as_deref())
        .map(str::trim)
        .find(|t| !t.is_empty());
    if let Some(title) = title {
        record.name = title.to_string();
    }
}

#[async_trait]
impl ExtractionStrategy for PipelineExtractor {
    async fn extract(
        &self,
        url: &str,
        page_type: &PageType,
    ) -> Result<ExtractedRecord, ExtractionError> {
        let mut record = ExtractedRecord::new(url, page_type.clone())?;

        let page = self
            .bounded(Stage::Render, self.collaborators.renderer.render(url))
            .await?;
        if page.html.trim().is_empty() {
            return Err(ExtractionError::malformed(Stage::Render, "empty html"));
        }

        let detections = self
            .bounded(
                Stage::Detect,
                self.collaborators.detector.detect(&page.screenshot_path),
            )
            .await?;
        if let Some(bad) = detections.iter().position(|d| !d.is_well_formed()) {
            return Err(ExtractionError::malformed(
                Stage::Detect,
                format!("detection #{bad} has an invalid type, box or confidence"),
            ));
        }
        let detections = self.resolve_text(&page.screenshot_path, detections).await?;
        tracing::debug!(url, detections = detections.len(), "detections resolved");

        self.provisional.apply(&mut record);
        apply_detected_text(&mut record, &detections);
        record.detected_elements = detections;
        Ok(record)
    }
}
