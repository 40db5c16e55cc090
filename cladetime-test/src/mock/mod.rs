//! Mock implementations for testing
//!
//! Provides mock versions of the remote and classifier collaborators.

mod classifier;
mod fetcher;
mod store;

pub use classifier::MockClassifier;
pub use fetcher::MockFetcher;
pub use store::MockVersionedStore;
