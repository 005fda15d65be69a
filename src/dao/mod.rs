/// Result archive abstraction and its in-memory backend.
pub mod archive;
/// Archived result model definitions.
pub mod models;
/// Storage error types shared by archive backends.
pub mod storage;
