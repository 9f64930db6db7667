//! Catalog id allocation and the content-hash dedup pre-check.

mod allocator;
mod dedup;

pub use allocator::{AllocationError, CatalogAllocator, Claim};
pub use dedup::{DedupGate, DedupOutcome};
