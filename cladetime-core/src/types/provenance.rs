//! Clade assignment provenance

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What went into a clade assignment run. Field names are stable and
/// serialized verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub sequences_to_assign: usize,
    pub sequences_assigned: usize,
    pub sequence_as_of: DateTime<Utc>,
    pub tree_as_of: DateTime<Utc>,
    pub nextclade_dataset_version: String,
    pub nextclade_dataset_name: String,
    pub nextclade_version_num: String,
    pub assignment_as_of: DateTime<Utc>,
}
