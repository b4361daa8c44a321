// Application layer - Use cases and repository traits
pub mod dashboard_service;
pub mod ingestion_service;
pub mod sample_store;
