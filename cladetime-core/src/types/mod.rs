/// Core types shared across all Cladetime crates
pub mod dates;
pub mod metadata;
pub mod provenance;
pub mod version;

pub use dates::{normalize_as_of, AsOf, DateField, DateRule, DateWarning};
pub use metadata::{PipelineMetadata, SARS_COV_2_FULL_NAME};
pub use provenance::Provenance;
pub use version::{version_url, ObjectVersion, ResolvedVersion};
