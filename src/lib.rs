//! Animal records with images kept in an S3-compatible object store.
//!
//! `ImageStorageService` owns the bucket side (keys, uploads, presigned
//! URLs), `AnimalService` owns the SQLite side and resolves each animal's
//! image key into a URL on read. `routes::routes::app` wires both behind axum.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
