//! External clade classification tools
//!
//! The Nextclade CLI is run through a container runtime. Everything else
//! in Cladetime talks to it through the `CladeClassifier` trait so the
//! pipeline can be exercised without Docker.

pub mod nextclade;
pub mod traits;

pub use nextclade::{read_bundle_json, DockerNextclade};
pub use traits::{CladeClassifier, DatasetRequest};
