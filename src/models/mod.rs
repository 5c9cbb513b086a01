//! Core data models for the animal image service.
//!
//! Rows map to database tables via `sqlx::FromRow` and serialize as JSON via
//! `serde`.

pub mod animal;
