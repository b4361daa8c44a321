// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod event_stream;
pub mod http_response;
pub mod json_mapper;
pub mod jsonl_store;
pub mod serial_source;
pub mod simulation;
