pub mod record;

pub use record::{BoundingBox, DetectionElement, ExtractedRecord, PageType, RecordError};
