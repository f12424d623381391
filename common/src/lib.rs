//! Shared building blocks for the metadata service.
//!
//! Configuration, error taxonomy, response envelope, request/response models
//! and HTTP middleware live here so the service crate only carries handlers
//! and database logic.

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
