//! Student images (multipart upload, list) and videos.

use super::THUMBNAIL_LARGE;
use crate::domain::{Image, ImageUpload, Video};
use crate::error::AppError;
use crate::extractors::PathIds;
use crate::imgproxy::ImgProxy;
use crate::response::created;
use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Multipart field holding the uploaded file.
pub const IMAGE_FIELD: &str = "image";
/// Appended to video thumbnails so the CDN crops them square.
pub const VIDEO_THUMBNAIL_PARAMS: &str = "?height=400&width=400&fit_mode=smartcrop";

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub id: Uuid,
    pub original_url: String,
    pub thumbnail_url: String,
    pub created_at: DateTime<Utc>,
}

impl ImageResponse {
    fn new(image: &Image, imgproxy: &ImgProxy) -> Self {
        ImageResponse {
            id: image.id,
            original_url: imgproxy.original_url(&image.object_key),
            thumbnail_url: imgproxy.thumbnail_url(&image.object_key, THUMBNAIL_LARGE, THUMBNAIL_LARGE),
            created_at: image.created_at,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    pub id: Uuid,
    pub playback_url: String,
    pub thumbnail_url: String,
    pub original_thumbnail_url: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Video> for VideoResponse {
    fn from(video: Video) -> Self {
        VideoResponse {
            id: video.id,
            playback_url: video.playback_url,
            thumbnail_url: format!("{}{}", video.thumbnail_url, VIDEO_THUMBNAIL_PARAMS),
            original_thumbnail_url: video.thumbnail_url,
            status: video.status,
            created_at: video.created_at,
        }
    }
}

pub async fn post_image(
    State(state): State<AppState>,
    PathIds(student_id): PathIds<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::malformed("failed to parse multipart body", e))?;
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::malformed("failed to parse multipart body", e))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::malformed("failed to read image", e))?;
        upload = Some(ImageUpload {
            file_name,
            content_type,
            data: data.to_vec(),
        });
        break;
    }
    let upload = upload.ok_or_else(|| AppError::bad_request("image field is required"))?;

    let image = state
        .students
        .create_image(student_id, upload)
        .await
        .map_err(|e| AppError::internal("Failed storing image", e))?;
    tracing::debug!(%student_id, image_id = %image.id, "image uploaded");
    Ok(created(ImageResponse::new(&image, &state.imgproxy)))
}

pub async fn get_images(
    State(state): State<AppState>,
    PathIds(student_id): PathIds<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let images = state
        .students
        .find_student_images(student_id)
        .await
        .map_err(|e| AppError::internal("Failed querying images", e))?;
    Ok(Json(
        images
            .iter()
            .map(|i| ImageResponse::new(i, &state.imgproxy))
            .collect::<Vec<_>>(),
    ))
}

pub async fn get_videos(
    State(state): State<AppState>,
    PathIds(student_id): PathIds<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let videos = state
        .students
        .find_student_videos(student_id)
        .await
        .map_err(|e| AppError::internal("Failed querying videos", e))?;
    Ok(Json(videos.into_iter().map(VideoResponse::from).collect::<Vec<_>>()))
}
