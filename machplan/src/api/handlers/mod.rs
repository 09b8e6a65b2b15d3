//! HTTP request handlers for all API endpoints.
//!
//! Each handler authenticates through the [`CurrentUser`](crate::api::models::users::CurrentUser)
//! extractor and scopes every query to that user.
//!
//! # Handler Modules
//!
//! - [`analyses`]: drawing upload and the persisted analysis pipeline
//! - [`analyze`]: direct model calls (structured analysis, PDF report, connectivity test)
//! - [`cutting_parameters`], [`machines`], [`tools`]: shop inventory CRUD
//! - [`drawings`]: download and early removal of stored drawings
//! - [`extraction`]: PDF text extraction
//! - [`presets`]: named analysis presets under `/my/models`
//! - [`log`], [`models_stub`]: diagnostics and the legacy `/models` route (unauthenticated)

pub mod analyses;
pub mod analyze;
pub mod cutting_parameters;
pub mod drawings;
pub mod extraction;
pub mod log;
pub mod machines;
pub mod models_stub;
pub mod presets;
pub mod tools;
pub mod upload;
