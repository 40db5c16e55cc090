//! Sequence file handling for Cladetime

pub mod compression;
pub mod formats;

pub use compression::{decompress_file, Codec};
pub use formats::{filter_fasta, filter_sequence_file, read_fasta_ids, FilterStats};
