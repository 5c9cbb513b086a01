pub mod animal_repository;
pub mod animal_service;
pub mod image_storage_service;
pub mod object_store;
