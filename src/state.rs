//! Shared state handed to every handler.

use crate::services::{animal_service::AnimalService, image_storage_service::ImageStorageService};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Shared SQLite pool, also used directly by the readiness check.
    pub db: Arc<SqlitePool>,
    pub images: ImageStorageService,
    pub animals: AnimalService,
    /// Refuse `DELETE /api/files/delete/{key}` while an animal uses the key.
    pub reject_referenced_deletes: bool,
}
