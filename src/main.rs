use animal_images::{
    config, db,
    routes::routes::app,
    services::{
        animal_repository::AnimalRepository,
        animal_service::AnimalService,
        image_storage_service::ImageStorageService,
        object_store::{ObjectStore, S3ObjectStore},
    },
    state::AppState,
};
use anyhow::Result;
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting animal-images with config: {:?}", cfg);

    // --- Initialize SQLite connection ---
    let pool = Arc::new(db::connect(&cfg.database_url).await?);

    // --- Handle migration mode ---
    if migrate {
        db::run_migrations(&pool).await?;
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Initialize services ---
    let store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::connect(&cfg.s3).await);
    let images = ImageStorageService::new(store, cfg.bucket.clone(), cfg.url_expiry);
    let animals = AnimalService::new(
        AnimalRepository::new(pool.clone()),
        images.clone(),
        cfg.url_policy,
    );
    let state = AppState {
        db: pool,
        images,
        animals,
        reject_referenced_deletes: cfg.reject_referenced_deletes,
    };

    // --- Build router ---
    let app = app(state, cfg.max_upload_bytes);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
