//! Test fixtures and data generators

use std::io::Write;

/// Nextstrain-style metadata with a stale clade column and one extra field
/// outside the standard set
pub const SAMPLE_METADATA_TSV: &str = "strain\tdate\tcountry\tdivision\thost\tclade_nextstrain\tQC_overall_status\n\
X/1\t2024-01-02\tUSA\tUtah\tHomo sapiens\t23A\tgood\n\
X/2\t2024-01-03\tUSA\tMassachusetts\tHomo sapiens\t23B\tgood\n\
X/3\t2024-01-03\tUSA\tMassachusetts\tHomo sapiens\t\tbad\n";

/// FASTA text for `(id, sequence)` pairs
pub fn fasta(records: &[(&str, &str)]) -> String {
    records
        .iter()
        .map(|(id, seq)| format!(">{}\n{}\n", id, seq))
        .collect()
}

pub fn xz_bytes(data: &[u8]) -> Vec<u8> {
    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
    encoder.write_all(data).expect("xz encode");
    encoder.finish().expect("xz finish")
}

pub fn zstd_bytes(data: &[u8]) -> Vec<u8> {
    zstd::encode_all(data, 3).expect("zstd encode")
}

/// The pipeline metadata document Nextstrain publishes next to its data
pub fn pipeline_metadata_json(dataset_version: &str, nextclade_version_num: &str) -> serde_json::Value {
    serde_json::json!({
        "schema_version": "v1",
        "nextclade_version": format!("nextclade {}", nextclade_version_num),
        "nextclade_dataset_name": "SARS-CoV-2",
        "nextclade_dataset_version": dataset_version,
        "nextclade_version_num": nextclade_version_num,
    })
}

/// A modeled-clades archive document carrying pipeline metadata
pub fn archive_document(dataset_version: &str, nextclade_version_num: &str) -> serde_json::Value {
    serde_json::json!({
        "clades": ["24A", "24B", "24C", "recombinant"],
        "meta": {
            "created_at": "2024-11-04T03:00:00Z",
            "ncov": pipeline_metadata_json(dataset_version, nextclade_version_num),
        }
    })
}
