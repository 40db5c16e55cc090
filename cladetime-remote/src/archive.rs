//! Archive fallback for pipeline metadata
//!
//! The primary bucket only keeps recent versions of the pipeline metadata
//! file. An append-only series of date-named JSON documents keeps a copy of
//! the same record under `meta.ncov`, published roughly weekly.

use chrono::{DateTime, Days, NaiveDate, Utc};
use cladetime_core::config::ArchiveConfig;
use cladetime_core::{CladetimeError, CladetimeResult, PipelineMetadata};
use tracing::{debug, info};

use crate::http::Fetcher;

#[derive(Debug, Clone)]
pub struct ArchiveResolver {
    base_url: String,
    start_date: NaiveDate,
    lookback_days: u32,
}

impl ArchiveResolver {
    pub fn new(base_url: impl Into<String>, start: DateTime<Utc>, lookback_days: u32) -> Self {
        Self {
            base_url: base_url.into(),
            start_date: start.date_naive(),
            lookback_days,
        }
    }

    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self::new(config.base_url.clone(), config.start_date, config.lookback_days)
    }

    /// URL of the document published on `date`
    pub fn document_url(&self, date: NaiveDate) -> String {
        format!(
            "{}/{}.json",
            self.base_url.trim_end_matches('/'),
            date.format("%Y-%m-%d")
        )
    }

    /// Dates to probe for `as_of`, newest first
    pub fn probe_dates(&self, as_of: DateTime<Utc>) -> Vec<NaiveDate> {
        let newest = as_of.date_naive();
        (0..=self.lookback_days)
            .filter_map(|offset| newest.checked_sub_days(Days::new(u64::from(offset))))
            .take_while(|date| *date >= self.start_date)
            .collect()
    }

    /// Metadata from the newest archive document at or before `as_of`,
    /// searching back at most `lookback_days`
    pub fn resolve(&self, fetcher: &dyn Fetcher, as_of: DateTime<Utc>) -> CladetimeResult<PipelineMetadata> {
        if as_of.date_naive() < self.start_date {
            return Err(CladetimeError::ArchiveNotApplicable {
                as_of,
                start: self.start_date.and_time(chrono::NaiveTime::MIN).and_utc(),
            });
        }

        for date in self.probe_dates(as_of) {
            let url = self.document_url(date);
            let response = fetcher.get(&url)?;

            if response.is_not_found() {
                debug!(%date, "No archive published");
                continue;
            }
            if !response.is_success() {
                return Err(CladetimeError::Network(format!(
                    "Archive request {} returned status: {}",
                    url, response.status
                )));
            }

            let document: serde_json::Value = response.json()?;
            let metadata = extract_pipeline_metadata(&document)
                .map_err(|reason| CladetimeError::MalformedArchive(format!("{}: {}", url, reason)))?;

            info!(%as_of, archive_date = %date, "Pipeline metadata resolved from archive");
            return Ok(metadata);
        }

        Err(CladetimeError::ArchiveNotFound {
            as_of,
            lookback_days: self.lookback_days,
        })
    }
}

fn extract_pipeline_metadata(document: &serde_json::Value) -> Result<PipelineMetadata, String> {
    let record = document
        .get("meta")
        .and_then(|meta| meta.get("ncov"))
        .ok_or_else(|| "missing meta.ncov record".to_string())?;

    if !record.is_object() {
        return Err("meta.ncov is not an object".to_string());
    }

    let metadata: PipelineMetadata =
        serde_json::from_value(record.clone()).map_err(|e| format!("unreadable meta.ncov: {}", e))?;
    let metadata = metadata.normalized();

    if !metadata.is_complete() {
        return Err(format!("incomplete meta.ncov record: {}", metadata));
    }
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn resolver() -> ArchiveResolver {
        ArchiveResolver::new(
            "https://example.org/modeled-clades/",
            Utc.with_ymd_and_hms(2024, 10, 9, 0, 0, 0).unwrap(),
            30,
        )
    }

    #[test]
    fn test_document_url() {
        let date = NaiveDate::from_ymd_opt(2024, 11, 4).unwrap();
        assert_eq!(
            resolver().document_url(date),
            "https://example.org/modeled-clades/2024-11-04.json"
        );
    }

    #[test]
    fn test_probe_window_is_bounded() {
        let as_of = Utc.with_ymd_and_hms(2025, 3, 1, 23, 59, 59).unwrap();
        let dates = resolver().probe_dates(as_of);
        assert_eq!(dates.len(), 31);
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(dates[30], NaiveDate::from_ymd_opt(2025, 1, 30).unwrap());
    }

    #[test]
    fn test_probe_window_stops_at_series_start() {
        let as_of = Utc.with_ymd_and_hms(2024, 10, 12, 12, 0, 0).unwrap();
        let dates = resolver().probe_dates(as_of);
        assert_eq!(dates.len(), 4);
        assert_eq!(dates.last(), Some(&NaiveDate::from_ymd_opt(2024, 10, 9).unwrap()));
    }

    #[test]
    fn test_extract_requires_meta_ncov() {
        let good = json!({
            "clades": ["24A", "24B"],
            "meta": {"ncov": {
                "nextclade_dataset_name": "SARS-CoV-2",
                "nextclade_dataset_version": "2024-10-17--16-48-48Z",
                "nextclade_version": "nextclade 3.9.1",
                "nextclade_version_num": "3.9.1"
            }}
        });
        let metadata = extract_pipeline_metadata(&good).unwrap();
        assert_eq!(metadata.nextclade_version_num, "3.9.1");
        assert_eq!(metadata.nextclade_dataset_name_full, "nextstrain/sars-cov-2/wuhan-hu-1/orfs");

        assert!(extract_pipeline_metadata(&json!({"clades": []})).is_err());
        assert!(extract_pipeline_metadata(&json!({"meta": {"ncov": "text"}})).is_err());
        assert!(extract_pipeline_metadata(&json!({"meta": {"ncov": {"nextclade_dataset_name": "SARS-CoV-2"}}})).is_err());
    }
}
