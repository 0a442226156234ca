pub mod collection_codec;
pub mod config;
pub mod credential_store;
pub mod error;
pub mod state_repository;
pub mod suggestion_client;
