/// Database model definitions.
pub mod models;
/// Room snapshot persistence backends.
pub mod snapshot_store;
/// Storage abstraction layer for database operations.
pub mod storage;
