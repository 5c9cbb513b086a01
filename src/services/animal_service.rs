//! AnimalService — animal record lifecycle plus the read-time URL policy.
//!
//! Records store the object key of their image. Every read path that hands an
//! animal to a client goes through [`AnimalService::resolve_url`], which turns
//! the key into a presigned URL according to the configured [`UrlPolicy`].

use crate::{
    models::animal::{Animal, NewAnimal},
    services::{
        animal_repository::AnimalRepository,
        image_storage_service::{ImageStorageError, ImageStorageService, StoredImage},
    },
};
use chrono::Utc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum AnimalError {
    #[error("animal {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Image(#[from] ImageStorageError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type AnimalResult<T> = Result<T, AnimalError>;

/// How a stored image key becomes a URL on read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UrlPolicy {
    /// Sign on every read; the signed URL is never written back.
    AlwaysResign,
    /// Keep handing out the stored URL until it is within `refresh_margin` of
    /// expiring, then sign a new one and persist it.
    ReuseUntilExpiry { refresh_margin: Duration },
}

#[derive(Clone)]
pub struct AnimalService {
    repo: AnimalRepository,
    images: ImageStorageService,
    policy: UrlPolicy,
}

impl AnimalService {
    pub fn new(repo: AnimalRepository, images: ImageStorageService, policy: UrlPolicy) -> Self {
        Self {
            repo,
            images,
            policy,
        }
    }

    pub async fn list_animals(&self) -> AnimalResult<Vec<Animal>> {
        Ok(self.repo.find_all().await?)
    }

    pub async fn get_animal(&self, id: i64) -> AnimalResult<Animal> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(AnimalError::NotFound(id))
    }

    pub async fn create_animal(&self, animal: &NewAnimal) -> AnimalResult<Animal> {
        let created = self.repo.insert(animal).await?;
        info!("Created animal {} ({})", created.id, created.name);
        Ok(created)
    }

    /// Persist every field of an existing record.
    pub async fn save_animal(&self, animal: &Animal) -> AnimalResult<Animal> {
        if !self.repo.update(animal).await? {
            return Err(AnimalError::NotFound(animal.id));
        }
        Ok(animal.clone())
    }

    pub async fn delete_animal(&self, id: i64) -> AnimalResult<()> {
        if !self.repo.delete_by_id(id).await? {
            return Err(AnimalError::NotFound(id));
        }
        info!("Deleted animal {}", id);
        Ok(())
    }

    pub async fn find_by_image_key(&self, key: &str) -> AnimalResult<Option<Animal>> {
        Ok(self.repo.find_by_image_key(key).await?)
    }

    /// Point animal `id` at a freshly uploaded image, caching the URL the
    /// upload produced.
    pub async fn attach_image(&self, id: i64, image: &StoredImage) -> AnimalResult<Animal> {
        let mut animal = self.get_animal(id).await?;
        animal.image_key = Some(image.key.clone());
        animal.image_url = Some(image.url.url.clone());
        animal.image_url_expires_at = Some(image.url.expires_at);
        self.save_animal(&animal).await
    }

    pub async fn list_animals_with_resolved_urls(&self) -> AnimalResult<Vec<Animal>> {
        let animals = self.repo.find_all().await?;
        let mut resolved = Vec::with_capacity(animals.len());
        for animal in animals {
            resolved.push(self.resolve_url(animal).await?);
        }
        Ok(resolved)
    }

    /// Make `animal.image_url` usable.
    ///
    /// Records without an image key are returned untouched, including ones
    /// carrying an external URL.
    pub async fn resolve_url(&self, mut animal: Animal) -> AnimalResult<Animal> {
        let Some(key) = animal.image_key.clone() else {
            return Ok(animal);
        };

        if let UrlPolicy::ReuseUntilExpiry { refresh_margin } = self.policy {
            if animal.has_fresh_url(Utc::now(), refresh_margin) {
                debug!("Reusing cached URL for animal {}", animal.id);
                return Ok(animal);
            }
        }

        let signed = self.images.generate_public_url(&key).await?;

        if matches!(self.policy, UrlPolicy::ReuseUntilExpiry { .. }) {
            self.repo
                .update_image_url(animal.id, &signed.url, signed.expires_at)
                .await?;
            debug!("Stored refreshed URL for animal {}", animal.id);
        }

        animal.image_url = Some(signed.url);
        animal.image_url_expires_at = Some(signed.expires_at);
        Ok(animal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db,
        services::{
            image_storage_service::{DEFAULT_URL_EXPIRY, UploadedFile},
            object_store::MemoryObjectStore,
        },
    };
    use bytes::Bytes;
    use std::sync::Arc;

    const HOUR: Duration = Duration::from_secs(3600);

    async fn service(
        policy: UrlPolicy,
    ) -> (Arc<MemoryObjectStore>, AnimalRepository, AnimalService) {
        let pool = Arc::new(db::memory_pool().await.unwrap());
        let store = Arc::new(MemoryObjectStore::new());
        let images = ImageStorageService::new(store.clone(), "pets-images", DEFAULT_URL_EXPIRY);
        let repo = AnimalRepository::new(pool);
        let svc = AnimalService::new(repo.clone(), images, policy);
        (store, repo, svc)
    }

    fn new_animal(name: &str, image: Option<&str>) -> NewAnimal {
        NewAnimal {
            name: name.into(),
            species: "cat".into(),
            image: image.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn get_unknown_animal_is_not_found() {
        let (_, _, svc) = service(UrlPolicy::AlwaysResign).await;

        let err = svc.get_animal(999).await.unwrap_err();

        assert!(matches!(err, AnimalError::NotFound(999)));
    }

    #[tokio::test]
    async fn create_splits_key_from_external_url() {
        let (_, _, svc) = service(UrlPolicy::AlwaysResign).await;

        let keyed = svc.create_animal(&new_animal("Milo", Some("abc.png"))).await.unwrap();
        let linked = svc
            .create_animal(&new_animal("Luna", Some("https://cdn.example.com/luna.jpg")))
            .await
            .unwrap();

        assert_eq!(keyed.image_key.as_deref(), Some("abc.png"));
        assert_eq!(keyed.image_url, None);
        assert_eq!(linked.image_key, None);
        assert_eq!(linked.image_url.as_deref(), Some("https://cdn.example.com/luna.jpg"));
        assert_ne!(keyed.id, linked.id);
    }

    #[tokio::test]
    async fn resolve_leaves_external_url_unchanged() {
        let (_, _, svc) = service(UrlPolicy::AlwaysResign).await;
        let animal = svc
            .create_animal(&new_animal("Luna", Some("http://example.com/luna.jpg")))
            .await
            .unwrap();

        let resolved = svc.resolve_url(animal.clone()).await.unwrap();

        assert_eq!(resolved, animal);
    }

    #[tokio::test]
    async fn resolve_signs_bare_key_without_persisting() {
        let (_, repo, svc) = service(UrlPolicy::AlwaysResign).await;
        let animal = svc.create_animal(&new_animal("Milo", Some("abc.png"))).await.unwrap();

        let first = svc.resolve_url(animal.clone()).await.unwrap();
        let second = svc.resolve_url(animal.clone()).await.unwrap();

        let url = first.image_url.clone().unwrap();
        assert!(url.starts_with("http"));
        assert!(url.contains("abc.png"));
        assert_ne!(first.image_url, second.image_url);

        let stored = repo.find_by_id(animal.id).await.unwrap().unwrap();
        assert_eq!(stored.image_url, None);
        assert_eq!(stored.image_url_expires_at, None);
    }

    #[tokio::test]
    async fn reuse_policy_persists_and_reuses_url() {
        let policy = UrlPolicy::ReuseUntilExpiry { refresh_margin: HOUR };
        let (_, repo, svc) = service(policy).await;
        let animal = svc.create_animal(&new_animal("Milo", Some("abc.png"))).await.unwrap();

        let first = svc.resolve_url(animal.clone()).await.unwrap();
        let stored = repo.find_by_id(animal.id).await.unwrap().unwrap();
        assert_eq!(stored.image_url, first.image_url);

        let second = svc.resolve_url(stored).await.unwrap();
        assert_eq!(second.image_url, first.image_url);
    }

    #[tokio::test]
    async fn reuse_policy_resigns_near_expiry() {
        let policy = UrlPolicy::ReuseUntilExpiry { refresh_margin: HOUR };
        let (_, _, svc) = service(policy).await;
        let mut animal = svc.create_animal(&new_animal("Milo", Some("abc.png"))).await.unwrap();
        animal.image_url = Some("http://memory.test/pets-images/abc.png?old".into());
        animal.image_url_expires_at = Some(Utc::now() + Duration::from_secs(60));
        let animal = svc.save_animal(&animal).await.unwrap();

        let resolved = svc.resolve_url(animal).await.unwrap();

        assert_ne!(
            resolved.image_url.as_deref(),
            Some("http://memory.test/pets-images/abc.png?old")
        );
        assert!(resolved.image_url_expires_at.unwrap() > Utc::now() + HOUR);
    }

    #[tokio::test]
    async fn list_resolves_every_record() {
        let (_, _, svc) = service(UrlPolicy::AlwaysResign).await;
        svc.create_animal(&new_animal("Milo", Some("a.png"))).await.unwrap();
        svc.create_animal(&new_animal("Rex", None)).await.unwrap();
        svc.create_animal(&new_animal("Luna", Some("https://cdn.example.com/l.jpg")))
            .await
            .unwrap();

        let animals = svc.list_animals_with_resolved_urls().await.unwrap();

        assert_eq!(animals.len(), 3);
        assert!(animals[0].image_url.as_deref().unwrap().contains("a.png"));
        assert_eq!(animals[1].image_url, None);
        assert_eq!(animals[2].image_url.as_deref(), Some("https://cdn.example.com/l.jpg"));
    }

    #[tokio::test]
    async fn resolve_surfaces_signing_failure() {
        let (store, _, svc) = service(UrlPolicy::AlwaysResign).await;
        let animal = svc.create_animal(&new_animal("Milo", Some("abc.png"))).await.unwrap();
        store.set_unavailable(true);

        let err = svc.resolve_url(animal).await.unwrap_err();

        assert!(matches!(err, AnimalError::Image(ImageStorageError::Presign(_))));
    }

    #[tokio::test]
    async fn attach_image_records_key_and_url() {
        let (store, repo, svc) = service(UrlPolicy::AlwaysResign).await;
        let images = ImageStorageService::new(store.clone(), "pets-images", DEFAULT_URL_EXPIRY);
        let animal = svc.create_animal(&new_animal("Milo", None)).await.unwrap();
        let stored = images
            .upload_image(UploadedFile {
                file_name: "milo.png".into(),
                content_type: Some("image/png".into()),
                data: Bytes::from_static(b"png"),
            })
            .await
            .unwrap();

        svc.attach_image(animal.id, &stored).await.unwrap();

        let saved = repo.find_by_id(animal.id).await.unwrap().unwrap();
        assert_eq!(saved.image_key.as_deref(), Some(stored.key.as_str()));
        assert_eq!(saved.image_url.as_deref(), Some(stored.url.url.as_str()));
        let found = svc.find_by_image_key(&stored.key).await.unwrap().unwrap();
        assert_eq!(found.id, animal.id);
    }

    #[tokio::test]
    async fn save_and_delete_unknown_ids_are_not_found() {
        let (_, _, svc) = service(UrlPolicy::AlwaysResign).await;
        let mut animal = svc.create_animal(&new_animal("Milo", None)).await.unwrap();
        svc.delete_animal(animal.id).await.unwrap();

        animal.name = "Ghost".into();
        assert!(matches!(
            svc.save_animal(&animal).await.unwrap_err(),
            AnimalError::NotFound(_)
        ));
        assert!(matches!(
            svc.delete_animal(animal.id).await.unwrap_err(),
            AnimalError::NotFound(_)
        ));
    }
}
