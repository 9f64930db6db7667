//! Bearer-token authentication for the ingestion and admin endpoints

pub mod middleware;

pub use middleware::{auth_middleware, AuthState};
