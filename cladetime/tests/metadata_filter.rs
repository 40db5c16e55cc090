mod common;

use cladetime::{clade_counts, filter_sequence_metadata, StateFormat};
use common::*;
use pretty_assertions::assert_eq;

#[test]
fn test_filter_downloaded_metadata() {
    let world = World::new();
    let ct = world.clade_time(Some("2025-10-15"), None).unwrap();
    let metadata = ct.sequence_metadata().unwrap();

    let filtered = filter_sequence_metadata(
        &metadata,
        Some(&["strain", "clade_nextstrain", "country", "date", "division", "host"]),
        StateFormat::Name,
    )
    .unwrap();
    assert_eq!(filtered.count().unwrap(), 3);

    let counts = clade_counts(&filtered).unwrap();
    assert_eq!(
        counts.string_values("location").unwrap(),
        vec![
            Some("Massachusetts".to_string()),
            Some("Massachusetts".to_string()),
            Some("Utah".to_string())
        ]
    );
    let mut clades: Vec<String> = counts
        .string_values("clade")
        .unwrap()
        .into_iter()
        .flatten()
        .filter(|c| !c.is_empty())
        .collect();
    clades.sort();
    assert_eq!(clades, vec!["23A", "23B"]);
}
