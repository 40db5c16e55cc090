//! Cladetime: time-travel access to Nextstrain SARS-CoV-2 data
//!
//! A [`CladeTime`] pins two dates: the sequence snapshot and the reference
//! tree snapshot. From those it resolves the exact historical versions of
//! the sequence file, the sequence metadata and the pipeline metadata, and
//! can assign Nextstrain clades to a subset of sequences using the
//! Nextclade dataset that was current at the tree date.

pub mod assign;
pub mod metadata;
pub mod pipeline;
pub mod providers;
pub mod scratch;
pub mod table;
pub mod temporal;
pub mod tree;

pub use assign::{AssignmentWarning, Clade};
pub use metadata::{clade_counts, filter_collection_dates, filter_sequence_metadata, StateFormat};
pub use pipeline::MetadataSource;
pub use providers::Providers;
pub use table::{LazyTable, TableEngine};
pub use temporal::CladeTime;
pub use tree::Tree;

pub use cladetime_core::{
    load_config, AsOf, CladetimeError, CladetimeResult, Config, DatePolicy, DateWarning, PipelineMetadata,
    Provenance,
};
