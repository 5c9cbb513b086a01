//! Defines routes for file and animal operations.
//!
//! ## Structure
//! - **File endpoints** (`/api/files`)
//!   - `POST   /upload` — store one multipart `file`, return its URL
//!   - `POST   /upload-animal-image/{animal_id}` — store and attach to an animal
//!   - `DELETE /delete/{filename}` — remove an object
//!   - `GET    /exists/{filename}` — existence check
//!   - `GET    /url/{filename}` — sign a fresh URL
//!
//! - **Animal endpoints** (`/api/animals`)
//!   - `GET    /` — list, URLs resolved
//!   - `POST   /` — create
//!   - `GET    /{id}` — fetch one, URL resolved
//!   - `DELETE /{id}` — delete
//!
//! - **Health**: `GET /healthz`, `GET /readyz`

use crate::{
    handlers::{
        animal_handlers::{create_animal, delete_animal, get_animal, list_animals},
        file_handlers::{delete_file, file_exists, file_url, upload_animal_image, upload_file},
        health_handlers::{healthz, readyz},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Build the router for all API routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    let files = Router::new()
        .route("/upload", post(upload_file))
        .route("/upload-animal-image/{animal_id}", post(upload_animal_image))
        .route("/delete/{filename}", delete(delete_file))
        .route("/exists/{filename}", get(file_exists))
        .route("/url/{filename}", get(file_url));

    let animals = Router::new()
        .route("/", get(list_animals).post(create_animal))
        .route("/{id}", get(get_animal).delete(delete_animal));

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .nest("/api/files", files)
        .nest("/api/animals", animals)
}

/// The full application: routes, state, body limit, CORS and request tracing.
pub fn app(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes()
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
