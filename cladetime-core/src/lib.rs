//! Core utilities and types shared across all Cladetime crates

pub mod config;
pub mod error;
pub mod system;
pub mod types;

// Re-export commonly used types
pub use config::{load_config, save_config, Config, DatePolicy};
pub use error::{CladetimeError, CladetimeResult};

pub use types::{
    normalize_as_of, version_url, AsOf, DateField, DateRule, DateWarning, ObjectVersion,
    PipelineMetadata, Provenance, ResolvedVersion,
};

pub use system::{
    cladetime_cache_dir, cladetime_home, default_assignment_output, Clock, FixedClock,
    SystemClock,
};

/// Version information for the Cladetime project
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
