//! Stand-ins for the rendering, vision and OCR services. They return canned output so the
//! pipeline, its data model and persistence can run end to end without those backends.

use async_trait::async_trait;

use crate::{
    domain::{BoundingBox, DetectionElement},
    extraction::{
        ExtractionError,
        collaborators::{Detector, Ocr, RenderedPage, Renderer},
    },
};

/// Element types the vision model is trained to report.
pub const TARGET_ELEMENTS: [&str; 5] = [
    "product_title",
    "price",
    "product_image",
    "buy_button",
    "specs_table",
];

const SCREENSHOT_PATH: &str = "screenshot.png";

const PAGE_HTML: &str = "<html><body><h1>Dummy Product</h1><p class='price'>$19.99</p></body></html>";

pub struct SimulatedRenderer;

#[async_trait]
impl Renderer for SimulatedRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage, ExtractionError> {
        tracing::debug!(url, "simulated render");
        Ok(RenderedPage {
            html: PAGE_HTML.to_string(),
            screenshot_path: SCREENSHOT_PATH.to_string(),
        })
    }
}

pub struct SimulatedDetector;

#[async_trait]
impl Detector for SimulatedDetector {
    async fn detect(&self, screenshot_path: &str) -> Result<Vec<DetectionElement>, ExtractionError> {
        tracing::debug!(screenshot_path, "simulated detection");
        let canned = [
            ("product_title", BoundingBox::new(10.0, 10.0, 200.0, 50.0), 0.9),
            ("price", BoundingBox::new(10.0, 60.0, 100.0, 30.0), 0.85),
            ("product_image", BoundingBox::new(10.0, 100.0, 300.0, 200.0), 0.95),
            ("buy_button", BoundingBox::new(220.0, 10.0, 150.0, 40.0), 0.88),
        ];
        Ok(canned
            .into_iter()
            .filter(|(t, _, _)| TARGET_ELEMENTS.contains(t))
            .map(|(t, bbox, confidence)| DetectionElement {
                element_type: t.to_string(),
                bbox,
                confidence,
                text: None,
            })
            .collect())
    }
}

pub struct SimulatedOcr;

#[async_trait]
impl Ocr for SimulatedOcr {
    async fn read_region(
        &self,
        _screenshot_path: &str,
        region: &DetectionElement,
    ) -> Result<Option<String>, ExtractionError> {
        Ok(match region.element_type.as_str() {
            "product_title" => Some("Dummy Product Title from CV".to_string()),
            "price" => Some("$19.99 from CV".to_string()),
            _ => None,
        })
    }
}
