pub mod collaborators;
pub mod pipeline;
pub mod remote;
pub mod simulated;

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ExtractedRecord, PageType, RecordError};

pub use collaborators::{Collaborators, Detector, Ocr, RenderedPage, Renderer};
pub use pipeline::{PipelineExtractor, ProvisionalFields};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Render,
    Detect,
    Ocr,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Render => "render",
            Stage::Detect => "detect",
            Stage::Ocr => "ocr",
        })
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid record: {0}")]
    Record(#[from] RecordError),
    #[error("{stage} collaborator failed: {message}")]
    Collaborator { stage: Stage, message: String },
    #[error("{stage} collaborator returned malformed output: {reason}")]
    Malformed { stage: Stage, reason: String },
    #[error("{stage} collaborator timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },
    #[error("collaborator client could not be built: {0}")]
    ClientSetup(String),
}

impl ExtractionError {
    pub fn collaborator(stage: Stage, message: impl fmt::Display) -> Self {
        Self::Collaborator {
            stage,
            message: message.to_string(),
        }
    }

    pub fn malformed(stage: Stage, reason: impl Into<String>) -> Self {
        Self::Malformed {
            stage,
            reason: reason.into(),
        }
    }
}

/// Turns `(url, page type)` into a complete record, or fails without a partial one.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    async fn extract(
        &self,
        url: &str,
        page_type: &PageType,
    ) -> Result<ExtractedRecord, ExtractionError>;
}

pub type DynExtractor = Arc<dyn ExtractionStrategy>;
