//! HTTP handlers under `/api/animals`. Every animal returned here has its
//! image URL resolved.

use crate::{
    errors::AppError,
    models::animal::{Animal, NewAnimal},
    state::AppState,
};
use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};

fn animal_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    path.map(|Path(id)| id)
        .map_err(|e| AppError::bad_request(format!("Invalid animal id: {e}")))
}

/// GET `/api/animals`
pub async fn list_animals(State(state): State<AppState>) -> Result<Json<Vec<Animal>>, AppError> {
    Ok(Json(state.animals.list_animals_with_resolved_urls().await?))
}

/// POST `/api/animals` — `image` may be an object key or an `http(s)` URL.
pub async fn create_animal(
    State(state): State<AppState>,
    payload: Result<Json<NewAnimal>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;
    let created = state.animals.create_animal(&payload).await?;
    let resolved = state.animals.resolve_url(created).await?;
    Ok((StatusCode::CREATED, Json(resolved)))
}

/// GET `/api/animals/{id}`
pub async fn get_animal(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Animal>, AppError> {
    let animal = state.animals.get_animal(animal_id(id)?).await?;
    Ok(Json(state.animals.resolve_url(animal).await?))
}

/// DELETE `/api/animals/{id}` — the image object, if any, stays in the bucket.
pub async fn delete_animal(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    state.animals.delete_animal(animal_id(id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
