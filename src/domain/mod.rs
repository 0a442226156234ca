pub mod aggregation;
pub mod date_range;
pub mod error;
pub mod id_allocator;
pub mod import_validator;
pub mod models;
