//! Collaborators a `CladeTime` talks to

use cladetime_core::{Clock, CladetimeResult, Config, SystemClock};
use cladetime_remote::store::s3::DEFAULT_REGION;
use cladetime_remote::{Fetcher, ReqwestFetcher, S3VersionedStore, VersionedStore};
use cladetime_tools::{CladeClassifier, DockerNextclade};
use std::sync::Arc;

#[derive(Clone)]
pub struct Providers {
    pub store: Arc<dyn VersionedStore>,
    pub fetcher: Arc<dyn Fetcher>,
    pub classifier: Arc<dyn CladeClassifier>,
    pub clock: Arc<dyn Clock>,
}

impl Providers {
    pub fn new(
        store: Arc<dyn VersionedStore>,
        fetcher: Arc<dyn Fetcher>,
        classifier: Arc<dyn CladeClassifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            fetcher,
            classifier,
            clock,
        }
    }

    /// Anonymous S3, reqwest, Nextclade in Docker and the system clock
    pub fn live(config: &Config) -> CladetimeResult<Self> {
        Ok(Self {
            store: Arc::new(S3VersionedStore::new(DEFAULT_REGION)?),
            fetcher: Arc::new(ReqwestFetcher::new(&config.http)?),
            classifier: Arc::new(DockerNextclade::from_config(&config.nextclade)),
            clock: Arc::new(SystemClock),
        })
    }
}
