//! AnimalRepository — CRUD over the `animals` table.

use crate::models::animal::{Animal, ImageRef, NewAnimal};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

const ANIMAL_COLUMNS: &str =
    "id, name, species, image_key, image_url, image_url_expires_at";

#[derive(Clone)]
pub struct AnimalRepository {
    db: Arc<SqlitePool>,
}

impl AnimalRepository {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub async fn find_all(&self) -> sqlx::Result<Vec<Animal>> {
        sqlx::query_as::<_, Animal>(&format!(
            "SELECT {ANIMAL_COLUMNS} FROM animals ORDER BY id ASC"
        ))
        .fetch_all(&*self.db)
        .await
    }

    pub async fn find_by_id(&self, id: i64) -> sqlx::Result<Option<Animal>> {
        sqlx::query_as::<_, Animal>(&format!(
            "SELECT {ANIMAL_COLUMNS} FROM animals WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await
    }

    /// First animal (lowest id) whose image is stored under `key`.
    pub async fn find_by_image_key(&self, key: &str) -> sqlx::Result<Option<Animal>> {
        sqlx::query_as::<_, Animal>(&format!(
            "SELECT {ANIMAL_COLUMNS} FROM animals WHERE image_key = ? ORDER BY id ASC LIMIT 1"
        ))
        .bind(key)
        .fetch_optional(&*self.db)
        .await
    }

    /// Insert a new row; the id is assigned by SQLite.
    pub async fn insert(&self, animal: &NewAnimal) -> sqlx::Result<Animal> {
        let (image_key, image_url) = match animal.image.as_deref().map(ImageRef::parse) {
            Some(ImageRef::Key(key)) => (Some(key), None),
            Some(ImageRef::External(url)) => (None, Some(url)),
            None => (None, None),
        };

        sqlx::query_as::<_, Animal>(&format!(
            "INSERT INTO animals (name, species, image_key, image_url, image_url_expires_at)
             VALUES (?, ?, ?, ?, NULL)
             RETURNING {ANIMAL_COLUMNS}"
        ))
        .bind(&animal.name)
        .bind(&animal.species)
        .bind(image_key)
        .bind(image_url)
        .fetch_one(&*self.db)
        .await
    }

    /// Overwrite every mutable column. Returns `false` if the id is gone.
    pub async fn update(&self, animal: &Animal) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "UPDATE animals
             SET name = ?, species = ?, image_key = ?, image_url = ?, image_url_expires_at = ?
             WHERE id = ?",
        )
        .bind(&animal.name)
        .bind(&animal.species)
        .bind(&animal.image_key)
        .bind(&animal.image_url)
        .bind(animal.image_url_expires_at)
        .bind(animal.id)
        .execute(&*self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Persist a freshly signed URL without touching the other columns.
    pub async fn update_image_url(
        &self,
        id: i64,
        url: &str,
        expires_at: DateTime<Utc>,
    ) -> sqlx::Result<()> {
        sqlx::query("UPDATE animals SET image_url = ?, image_url_expires_at = ? WHERE id = ?")
            .bind(url)
            .bind(expires_at)
            .bind(id)
            .execute(&*self.db)
            .await?;
        Ok(())
    }

    /// Returns `false` if no row had this id.
    pub async fn delete_by_id(&self, id: i64) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM animals WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
