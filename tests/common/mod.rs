#![allow(dead_code)]

use animal_images::{
    db,
    models::animal::{Animal, NewAnimal},
    routes::routes::app,
    services::{
        animal_repository::AnimalRepository,
        animal_service::{AnimalService, UrlPolicy},
        image_storage_service::{DEFAULT_URL_EXPIRY, ImageStorageService},
        object_store::MemoryObjectStore,
    },
    state::AppState,
};
use axum::{
    Router,
    body::Body,
    http::{Request, header},
    response::Response,
};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

pub const BUCKET: &str = "pets-images";
const BOUNDARY: &str = "animal-images-test-boundary";

pub struct TestContext {
    pub router: Router,
    pub store: Arc<MemoryObjectStore>,
    pub state: AppState,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_options(UrlPolicy::AlwaysResign, false).await
    }

    pub async fn with_options(policy: UrlPolicy, reject_referenced_deletes: bool) -> Self {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();

        let pool = Arc::new(db::memory_pool().await.expect("in-memory sqlite"));
        let store = Arc::new(MemoryObjectStore::new());
        let images = ImageStorageService::new(store.clone(), BUCKET, DEFAULT_URL_EXPIRY);
        let animals =
            AnimalService::new(AnimalRepository::new(pool.clone()), images.clone(), policy);
        let state = AppState {
            db: pool,
            images,
            animals,
            reject_referenced_deletes,
        };

        Self {
            router: app(state.clone(), 10 * 1024 * 1024),
            store,
            state,
        }
    }

    pub async fn create_animal(&self, name: &str, image: Option<&str>) -> Animal {
        self.state
            .animals
            .create_animal(&NewAnimal {
                name: name.into(),
                species: "cat".into(),
                image: image.map(str::to_string),
            })
            .await
            .expect("create animal")
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn upload(
        &self,
        uri: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body("file", file_name, content_type, data)))
            .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str) -> Response {
        self.send(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, payload: serde_json::Value) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
    }
}

/// One-field multipart body using the shared test boundary.
pub fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}
