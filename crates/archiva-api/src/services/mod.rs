pub mod ingestion;

pub use ingestion::{IngestOutcome, IngestionService};
