pub mod fasta;

pub use fasta::{filter_fasta, filter_sequence_file, header_id, read_fasta_ids, FilterStats};
