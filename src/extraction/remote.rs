use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    domain::{BoundingBox, DetectionElement},
    extraction::{
        ExtractionError, Stage,
        collaborators::{Detector, Ocr, RenderedPage, Renderer},
    },
};

/// Shared JSON-over-HTTP client for the collaborator services. One pool, one timeout.
#[derive(Clone)]
pub struct RemoteClient {
    client: Client,
    timeout: Duration,
}

impl RemoteClient {
    pub fn new(timeout: Duration) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::ClientSetup(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        stage: Stage,
        url: String,
        body: &B,
    ) -> Result<T, ExtractionError> {
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(stage, e))?;
        if !resp.status().is_success() {
            return Err(ExtractionError::collaborator(
                stage,
                format!("{url} returned {}", resp.status()),
            ));
        }
        resp.json::<T>()
            .await
            .map_err(|e| ExtractionError::malformed(stage, e.to_string()))
    }

    fn transport_error(&self, stage: Stage, err: reqwest::Error) -> ExtractionError {
        if err.is_timeout() {
            ExtractionError::Timeout {
                stage,
                after: self.timeout,
            }
        } else {
            ExtractionError::collaborator(stage, err)
        }
    }
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{path}", base.trim_end_matches('/'))
}

#[derive(Serialize)]
struct RenderRequest<'a> {
    url: &'a str,
}

pub struct HttpRenderer {
    client: RemoteClient,
    url: String,
}

impl HttpRenderer {
    pub fn new(client: RemoteClient, base: &str) -> Self {
        Self {
            client,
            url: endpoint(base, "render"),
        }
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage, ExtractionError> {
        self.client
            .post_json(Stage::Render, self.url.clone(), &RenderRequest { url })
            .await
    }
}

#[derive(Serialize)]
struct DetectRequest<'a> {
    screenshot_path: &'a str,
}

#[derive(Deserialize)]
struct DetectResponse {
    #[serde(default)]
    detections: Vec<DetectionElement>,
}

pub struct HttpDetector {
    client: RemoteClient,
    url: String,
}

impl HttpDetector {
    pub fn new(client: RemoteClient, base: &str) -> Self {
        Self {
            client,
            url: endpoint(base, "detect"),
        }
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn detect(&self, screenshot_path: &str) -> Result<Vec<DetectionElement>, ExtractionError> {
        let resp: DetectResponse = self
            .client
            .post_json(
                Stage::Detect,
                self.url.clone(),
                &DetectRequest { screenshot_path },
            )
            .await?;
        Ok(resp.detections)
    }
}

#[derive(Serialize)]
struct OcrRequest<'a> {
    screenshot_path: &'a str,
    bbox: BoundingBox,
}

#[derive(Deserialize)]
struct OcrResponse {
    text: Option<String>,
}

pub struct HttpOcr {
    client: RemoteClient,
    url: String,
}

impl HttpOcr {
    pub fn new(client: RemoteClient, base: &str) -> Self {
        Self {
            client,
            url: endpoint(base, "ocr"),
        }
    }
}

#[async_trait]
impl Ocr for HttpOcr {
    async fn read_region(
        &self,
        screenshot_path: &str,
        region: &DetectionElement,
    ) -> Result<Option<String>, ExtractionError> {
        let resp: OcrResponse = self
            .client
            .post_json(
                Stage::Ocr,
                self.url.clone(),
                &OcrRequest {
                    screenshot_path,
                    bbox: region.bbox,
                },
            )
            .await?;
        Ok(resp.text)
    }
}

#[cfg(test)]
mod tests {
    use super::endpoint;

    #[test]
    fn endpoint_joins_without_double_slash() {
        assert_eq!(endpoint("http://cv:9000/", "detect"), "http://cv:9000/detect");
        assert_eq!(endpoint("http://cv:9000", "ocr"), "http://cv:9000/ocr");
    }
}
