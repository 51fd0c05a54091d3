//! HTTP handlers, one module per resource. Response structs mirror the JSON the dashboard consumes.

pub mod attendance;
pub mod curriculum;
pub mod media;
pub mod observation;
pub mod plan;
pub mod progress;
pub mod relation;
pub mod student;

use crate::domain::{Image, NamedRef};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Image sizes handed to imgproxy.
pub const THUMBNAIL_SMALL: u32 = 80;
pub const THUMBNAIL_LARGE: u32 = 400;

#[derive(Serialize, Debug)]
pub struct NamedRefResponse {
    pub id: Uuid,
    pub name: String,
}

impl From<NamedRef> for NamedRefResponse {
    fn from(r: NamedRef) -> Self {
        NamedRefResponse { id: r.id, name: r.name }
    }
}

/// Image attached to another record.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub id: Uuid,
    pub thumbnail_url: String,
    pub original_url: String,
}

impl ImageRef {
    pub fn new(image: &Image, imgproxy: &crate::imgproxy::ImgProxy) -> Self {
        ImageRef {
            id: image.id,
            thumbnail_url: imgproxy.thumbnail_url(&image.object_key, THUMBNAIL_SMALL, THUMBNAIL_SMALL),
            original_url: imgproxy.original_url(&image.object_key),
        }
    }
}

/// RFC 3339 timestamp from a query parameter; blank counts as absent.
pub fn parse_time(name: &str, raw: Option<&String>) -> Result<Option<DateTime<Utc>>, AppError> {
    match raw.map(|s| s.trim()).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| AppError::malformed(format!("{} needs to be in ISO format", name), e)),
    }
}
