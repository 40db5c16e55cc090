use cladetime_core::{CladetimeError, CladetimeResult};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Parse one JSON member of a dataset bundle
pub fn read_bundle_json(bundle: &Path, member: &str) -> CladetimeResult<serde_json::Value> {
    let file = File::open(bundle)?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| {
        CladetimeError::UnsupportedFormat(format!("{} is not a zip archive: {}", bundle.display(), e))
    })?;

    let entry = archive.by_name(member).map_err(|e| {
        CladetimeError::TreeNotAvailable(format!("{} has no {}: {}", bundle.display(), member, e))
    })?;

    Ok(serde_json::from_reader(BufReader::new(entry))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn write_bundle(path: &Path, members: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, body) in members {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_reads_tree_member() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("nextclade_sars-cov-2_v1.zip");
        write_bundle(
            &bundle,
            &[
                ("pathogen.json", r#"{"schemaVersion": "3.0.0"}"#),
                ("tree.json", r#"{"version": "v2", "tree": {"name": "root"}}"#),
            ],
        );

        let tree = read_bundle_json(&bundle, "tree.json").unwrap();
        assert_eq!(tree["tree"]["name"], "root");
    }

    #[test]
    fn test_missing_member() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("bundle.zip");
        write_bundle(&bundle, &[("pathogen.json", "{}")]);

        let err = read_bundle_json(&bundle, "tree.json").unwrap_err();
        assert!(matches!(err, CladetimeError::TreeNotAvailable(_)));
    }

    #[test]
    fn test_not_a_zip() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("bundle.zip");
        std::fs::write(&bundle, b"plain text").unwrap();

        let err = read_bundle_json(&bundle, "tree.json").unwrap_err();
        assert!(matches!(err, CladetimeError::UnsupportedFormat(_)));
    }
}
