//! Remote data access for Cladetime
//!
//! Resolves which version of a versioned object was current at a point in
//! time, recovers pipeline metadata from the archive series, and performs
//! the blocking HTTP requests both need.

pub mod archive;
pub mod http;
pub mod resilience;
pub mod store;

pub use archive::ArchiveResolver;
pub use http::{Fetcher, HttpResponse, ReqwestFetcher};
pub use resilience::{with_retry, RetryPolicy};
pub use store::{resolve_version, S3VersionedStore, VersionedStore};
