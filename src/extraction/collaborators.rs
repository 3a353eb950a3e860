use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    domain::DetectionElement,
    extraction::{
        ExtractionError,
        remote::{HttpDetector, HttpOcr, HttpRenderer, RemoteClient},
        simulated::{SimulatedDetector, SimulatedOcr, SimulatedRenderer},
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedPage {
    pub html: String,
    /// Opaque reference handed to the detector and OCR; a file path for the stock renderer.
    pub screenshot_path: String,
}

#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<RenderedPage, ExtractionError>;
}

/// Returned detections carry no text; the OCR stage fills it in.
#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, screenshot_path: &str) -> Result<Vec<DetectionElement>, ExtractionError>;
}

#[async_trait]
pub trait Ocr: Send + Sync {
    /// `Ok(None)` means the region holds no readable text.
    async fn read_region(
        &self,
        screenshot_path: &str,
        region: &DetectionElement,
    ) -> Result<Option<String>, ExtractionError>;
}

#[derive(Clone)]
pub struct Collaborators {
    pub renderer: Arc<dyn Renderer>,
    pub detector: Arc<dyn Detector>,
    pub ocr: Arc<dyn Ocr>,
}

impl Collaborators {
    pub fn simulated() -> Self {
        Self {
            renderer: Arc::new(SimulatedRenderer),
            detector: Arc::new(SimulatedDetector),
            ocr: Arc::new(SimulatedOcr),
        }
    }

    /// HTTP-backed stages where a base URL is configured, simulated ones elsewhere.
    pub fn from_config(cfg: &Config) -> Result<Self, ExtractionError> {
        let mut out = Self::simulated();
        let endpoints = [&cfg.renderer_url, &cfg.detector_url, &cfg.ocr_url];
        if endpoints.iter().all(|u| u.is_none()) {
            return Ok(out);
        }

        let client = RemoteClient::new(cfg.collaborator_timeout)?;
        if let Some(base) = &cfg.renderer_url {
            out.renderer = Arc::new(HttpRenderer::new(client.clone(), base));
        }
        if let Some(base) = &cfg.detector_url {
            out.detector = Arc::new(HttpDetector::new(client.clone(), base));
        }
        if let Some(base) = &cfg.ocr_url {
            out.ocr = Arc::new(HttpOcr::new(client, base));
        }
        Ok(out)
    }
}
