use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("source url must be non-empty")]
    EmptySourceUrl,
    #[error("page type must be non-empty")]
    EmptyPageType,
}

/// Page-type hint supplied by the caller. `product` and `article` select a field group;
/// any other non-empty tag passes through untouched and populates neither.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PageType {
    Product,
    Article,
    Other(String),
}

impl PageType {
    pub fn as_str(&self) -> &str {
        match self {
            PageType::Product => "product",
            PageType::Article => "article",
            PageType::Other(tag) => tag,
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageType {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(RecordError::EmptyPageType);
        }
        // Tags are matched exactly; any other spelling is carried through as-is.
        Ok(match s {
            "product" => PageType::Product,
            "article" => PageType::Article,
            other => PageType::Other(other.to_string()),
        })
    }
}

impl TryFrom<String> for PageType {
    type Error = RecordError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PageType> for String {
    fn from(value: PageType) -> Self {
        value.as_str().to_string()
    }
}

/// `(x, y, width, height)` in screenshot pixels. Serialized as a 4-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width >= 0.0
            && self.height >= 0.0
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([x, y, width, height]: [f64; 4]) -> Self {
        Self::new(x, y, width, height)
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionElement {
    pub element_type: String,
    pub bbox: BoundingBox,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl DetectionElement {
    pub fn is_well_formed(&self) -> bool {
        !self.element_type.trim().is_empty()
            && self.bbox.is_well_formed()
            && (0.0..=1.0).contains(&self.confidence)
    }
}

/// Normalized output of one extraction. Both field groups always exist; the page type
/// says which one carries meaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedRecord {
    source_url: String,
    page_type: PageType,
    pub name: String,
    pub price: String,
    pub currency: String,
    pub images: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub title: String,
    pub text: String,
    pub detected_elements: Vec<DetectionElement>,
}

impl ExtractedRecord {
    pub fn new(source_url: impl Into<String>, page_type: PageType) -> Result<Self, RecordError> {
        let source_url = source_url.into();
        if source_url.is_empty() {
            return Err(RecordError::EmptySourceUrl);
        }
        Ok(Self {
            source_url,
            page_type,
            name: String::new(),
            price: String::new(),
            currency: String::new(),
            images: Vec::new(),
            attributes: BTreeMap::new(),
            title: String::new(),
            text: String::new(),
            detected_elements: Vec::new(),
        })
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn page_type(&self) -> &PageType {
        &self.page_type
    }

    pub fn is_product(&self) -> bool {
        self.page_type == PageType::Product
    }
}
