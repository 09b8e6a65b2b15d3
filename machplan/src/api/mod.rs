//! HTTP API: request/response models and axum handlers, one module per resource.

pub mod extractors;
pub mod handlers;
pub mod models;
