//! Library crate for live-exam-back, exposing modules for binaries and integration tests.

pub mod config;
/// Result archive and its persisted models.
pub mod dao;
/// Wire types shared by the HTTP, socket and SSE surfaces.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// Axum routers.
pub mod routes;
/// Operations behind the routes and sockets.
pub mod services;
/// Authoritative in-memory session state.
pub mod state;
