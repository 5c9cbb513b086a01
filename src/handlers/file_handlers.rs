//! HTTP handlers under `/api/files`.
//!
//! Uploads are read from the multipart field `file`, handed to
//! `ImageStorageService`, and answered with the presigned URL of the stored
//! object. Every failure renders through `AppError`.

use crate::{
    errors::AppError,
    services::{
        animal_service::AnimalError,
        image_storage_service::{ObjectPresence, UploadedFile},
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::PathRejection,
    },
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::instrument;

/// Name of the multipart field carrying the upload.
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub image_url: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ExistsResponse {
    pub key: String,
    pub exists: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlResponse {
    pub image_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
enum FileFieldError {
    #[error("invalid multipart body: {0}")]
    Rejected(MultipartRejection),
    #[error("invalid multipart body: {0}")]
    Malformed(MultipartError),
    #[error("missing multipart field `file`")]
    Missing,
}

/// Pull the first `file` field out of the request, buffering its bytes.
async fn read_file_field(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadedFile, FileFieldError> {
    let mut multipart = multipart.map_err(FileFieldError::Rejected)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(FileFieldError::Malformed)?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(FileFieldError::Malformed)?;
        return Ok(UploadedFile {
            file_name,
            content_type,
            data,
        });
    }

    Err(FileFieldError::Missing)
}

/// POST `/api/files/upload` — store one file and return its URL.
#[instrument(skip_all)]
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let failed =
        |e: &dyn fmt::Display| AppError::bad_request(format!("Failed to upload file: {e}"));

    let file = read_file_field(multipart).await.map_err(|e| failed(&e))?;
    let stored = state.images.upload_image(file).await.map_err(|e| failed(&e))?;

    Ok(Json(UploadResponse {
        image_url: stored.url.url,
        message: "File uploaded successfully".into(),
    }))
}

/// POST `/api/files/upload-animal-image/{animal_id}` — store one file and
/// attach it to the animal.
///
/// The object is stored before the animal is looked up, so an unknown id
/// leaves the upload behind in the bucket.
#[instrument(skip(state, multipart))]
pub async fn upload_animal_image(
    State(state): State<AppState>,
    animal_id: Result<Path<i64>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let failed = |e: &dyn fmt::Display| {
        AppError::bad_request(format!("Failed to upload animal image: {e}"))
    };

    let Path(animal_id) = animal_id.map_err(|e| failed(&e))?;
    let file = read_file_field(multipart).await.map_err(|e| failed(&e))?;
    let stored = state.images.upload_image(file).await.map_err(|e| failed(&e))?;

    match state.animals.attach_image(animal_id, &stored).await {
        Ok(_) => Ok(Json(UploadResponse {
            image_url: stored.url.url,
            message: "Animal image uploaded successfully".into(),
        })),
        Err(AnimalError::NotFound(_)) => Err(AppError::animal_not_found()),
        Err(e) => Err(failed(&e)),
    }
}

/// DELETE `/api/files/delete/{filename}` — remove an object from the bucket.
///
/// Animal rows pointing at the key are left as they are unless
/// `reject_referenced_deletes` is set, in which case the delete is refused.
#[instrument(skip(state))]
pub async fn delete_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let failed =
        |e: &dyn fmt::Display| AppError::bad_request(format!("Failed to delete file: {e}"));

    if state.reject_referenced_deletes {
        let holder = state
            .animals
            .find_by_image_key(&filename)
            .await
            .map_err(|e| failed(&e))?;
        if let Some(animal) = holder {
            return Err(AppError::conflict(format!(
                "Failed to delete file: still referenced by animal {}",
                animal.id
            )));
        }
    }

    state
        .images
        .delete_image(&filename)
        .await
        .map_err(|e| failed(&e))?;

    Ok(Json(MessageResponse {
        message: "File deleted successfully".into(),
    }))
}

/// GET `/api/files/exists/{filename}` — check the bucket for a key.
pub async fn file_exists(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<ExistsResponse>, AppError> {
    let exists = match state.images.image_exists(&filename).await {
        ObjectPresence::Found => true,
        ObjectPresence::NotFound => false,
        ObjectPresence::Unavailable(reason) => {
            return Err(AppError::unavailable(format!(
                "Failed to check file: {reason}"
            )));
        }
    };

    Ok(Json(ExistsResponse {
        key: filename,
        exists,
    }))
}

/// GET `/api/files/url/{filename}` — sign a fresh URL for a key.
pub async fn file_url(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<UrlResponse>, AppError> {
    let signed = state
        .images
        .generate_public_url(&filename)
        .await
        .map_err(|e| AppError::bad_request(format!("Failed to generate URL: {e}")))?;

    Ok(Json(UrlResponse {
        image_url: signed.url,
        expires_at: signed.expires_at,
    }))
}
