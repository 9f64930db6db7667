pub mod admin;
pub mod assets;
pub mod health;
pub mod ingest;
