//! Archiva API Library
//!
//! The HTTP surface of the ingestion pipeline: bearer-token authentication, the
//! ingestion endpoint and the orchestrator behind it, asset lookup, admin
//! endpoints for reconciliation and legacy id migration, and health probes.

mod api_doc;
mod handlers;

pub mod auth;
pub mod error;
pub mod services;
pub mod setup;
pub mod state;

pub use api_doc::ApiDoc;
pub use error::{ErrorResponse, HttpAppError};
pub use services::{IngestOutcome, IngestionService};
pub use state::AppState;
