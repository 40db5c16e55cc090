use cladetime_core::CladetimeResult;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::compression::Codec;

/// Counts from a filtering pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub records_seen: usize,
    pub records_kept: usize,
}

/// Record ID from a header line: the text after `>` up to the first whitespace
pub fn header_id(line: &str) -> Option<&str> {
    line.strip_prefix('>')?.split_whitespace().next()
}

/// Copy only the records whose ID is in `ids`, line by line.
/// Nothing but the current line is held in memory.
pub fn filter_fasta<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    ids: &HashSet<String>,
) -> CladetimeResult<FilterStats> {
    let mut stats = FilterStats::default();
    let mut keep = false;

    for line in reader.lines() {
        let line = line?;
        if line.starts_with('>') {
            stats.records_seen += 1;
            keep = header_id(&line).is_some_and(|id| ids.contains(id));
            if keep {
                stats.records_kept += 1;
            }
        }
        if keep {
            writeln!(writer, "{}", line)?;
        }
    }

    Ok(stats)
}

/// Filter a sequence file, compressed or not, into a plain FASTA file
pub fn filter_sequence_file(src: &Path, dest: &Path, ids: &HashSet<String>) -> CladetimeResult<FilterStats> {
    let codec = Codec::from_path(src)?;
    let reader = codec.open(src)?;
    let mut writer = BufWriter::new(File::create(dest)?);

    let stats = filter_fasta(reader, &mut writer, ids)?;
    writer.flush()?;

    info!(
        src = %src.display(),
        dest = %dest.display(),
        seen = stats.records_seen,
        kept = stats.records_kept,
        "Filtered sequences"
    );
    Ok(stats)
}

/// IDs of every record in a plain FASTA file, in file order
pub fn read_fasta_ids(path: &Path) -> CladetimeResult<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut ids = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if let Some(id) = header_id(&line) {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}
