//! Codecs for the compressed files Nextstrain publishes
//!
//! The codec is chosen by file extension. URLs are accepted too; any query
//! string (such as `?versionId=...`) is ignored. Uncompressed `.tsv` and
//! `.fasta` files pass through unchanged.

use cladetime_core::{CladetimeError, CladetimeResult};
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Xz,
    Zstd,
    Plain,
}

impl Codec {
    /// Pick a codec from a path or URL
    pub fn from_name(name: &str) -> CladetimeResult<Self> {
        let without_query = name.split(['?', '#']).next().unwrap_or(name);
        let file_name = without_query.rsplit('/').next().unwrap_or(without_query);
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "xz" => Ok(Codec::Xz),
            "zst" => Ok(Codec::Zstd),
            "tsv" | "fasta" | "fa" => Ok(Codec::Plain),
            _ => Err(CladetimeError::UnsupportedFormat(format!(
                "{} (expected a .xz, .zst, .tsv or .fasta file)",
                file_name
            ))),
        }
    }

    pub fn from_path(path: &Path) -> CladetimeResult<Self> {
        Self::from_name(&path.to_string_lossy())
    }

    /// `stem` with this codec's suffix appended; plain files keep the stem
    pub fn file_name(&self, stem: &str) -> String {
        match self {
            Codec::Xz => format!("{}.xz", stem),
            Codec::Zstd => format!("{}.zst", stem),
            Codec::Plain => stem.to_string(),
        }
    }

    /// Wrap a compressed stream in a buffered decoder
    pub fn decoder<'a, R: Read + 'a>(&self, reader: R) -> CladetimeResult<Box<dyn BufRead + 'a>> {
        Ok(match self {
            Codec::Xz => Box::new(BufReader::new(xz2::read::XzDecoder::new_multi_decoder(reader))),
            Codec::Zstd => Box::new(BufReader::new(zstd::stream::read::Decoder::new(reader)?)),
            Codec::Plain => Box::new(BufReader::new(reader)),
        })
    }

    /// Open a compressed file for line-oriented reading
    pub fn open(&self, path: &Path) -> CladetimeResult<Box<dyn BufRead>> {
        let file = File::open(path)?;
        self.decoder(BufReader::new(file))
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Codec::Xz => "xz",
            Codec::Zstd => "zst",
            Codec::Plain => "plain",
        };
        write!(f, "{}", name)
    }
}

/// Decompress `src` into `dest`, returning the decompressed size
pub fn decompress_file(src: &Path, dest: &Path) -> CladetimeResult<u64> {
    let codec = Codec::from_path(src)?;
    let mut reader = codec.open(src)?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(dest)?);
    let bytes = io::copy(&mut reader, &mut writer)?;
    writer.flush()?;

    debug!(src = %src.display(), dest = %dest.display(), bytes, codec = %codec, "Decompressed");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("sequences.fasta.xz", Codec::Xz ; "xz file")]
    #[test_case("metadata.tsv.zst", Codec::Zstd ; "zst file")]
    #[test_case("https://nextstrain-data.s3.amazonaws.com/files/ncov/open/sequences.fasta.xz?versionId=a.b", Codec::Xz ; "versioned url")]
    #[test_case("/tmp/METADATA.TSV.ZST", Codec::Zstd ; "upper case")]
    #[test_case("https://example.org/files/ncov/open/metadata.tsv?versionId=1", Codec::Plain ; "plain tsv url")]
    #[test_case("sequences.fasta", Codec::Plain ; "plain fasta")]
    fn test_codec_from_name(name: &str, expected: Codec) {
        assert_eq!(Codec::from_name(name).unwrap(), expected);
    }

    #[test_case("sequences.fasta.gz" ; "gzip")]
    #[test_case("metadata.tsv.bz2" ; "bzip2")]
    #[test_case("https://example.org/sequences?format=xz" ; "no extension")]
    fn test_codec_rejects(name: &str) {
        assert!(matches!(
            Codec::from_name(name),
            Err(CladetimeError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_decompress_every_codec() {
        let dir = tempfile::tempdir().unwrap();
        let text = b"strain\tdate\nX/1\t2024-01-02\n";

        let zst = dir.path().join("metadata.tsv.zst");
        std::fs::write(&zst, zstd::encode_all(&text[..], 3).unwrap()).unwrap();

        let xz = dir.path().join("metadata.tsv.xz");
        let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
        encoder.write_all(text).unwrap();
        std::fs::write(&xz, encoder.finish().unwrap()).unwrap();

        let plain = dir.path().join("metadata_plain.tsv");
        std::fs::write(&plain, text).unwrap();

        for src in [zst, xz, plain] {
            let dest = dir.path().join("out").join("metadata.tsv");
            let bytes = decompress_file(&src, &dest).unwrap();
            assert_eq!(bytes, text.len() as u64);
            assert_eq!(std::fs::read(&dest).unwrap(), text);
        }
    }

    #[test]
    fn test_file_name_suffix() {
        assert_eq!(Codec::Xz.file_name("sequences.fasta"), "sequences.fasta.xz");
        assert_eq!(Codec::Zstd.file_name("metadata.tsv"), "metadata.tsv.zst");
        assert_eq!(Codec::Plain.file_name("metadata.tsv"), "metadata.tsv");
    }
}
