//! Data source selection: local directory or remote base URL

#[cfg(feature = "http")]
use parcel_locator_lib::HttpFetcher;
use parcel_locator_lib::{FeatureCollection, FileFetcher, ResourceFetcher, Result};

use crate::settings::Settings;

/// The fetcher chosen from the `--data` setting
#[derive(Debug, Clone)]
pub enum DataSource {
    File(FileFetcher),
    #[cfg(feature = "http")]
    Http(HttpFetcher),
}

impl DataSource {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if settings.is_remote() {
            #[cfg(feature = "http")]
            {
                tracing::info!("Reading map data from {}", settings.data);
                return HttpFetcher::with_timeout(&settings.data, settings.timeout)
                    .map(DataSource::Http);
            }
            #[cfg(not(feature = "http"))]
            {
                return Err(parcel_locator_lib::LookupError::DataUnavailable {
                    path: settings.data.clone(),
                    reason: "built without the `http` feature".to_string(),
                });
            }
        }
        tracing::info!("Reading map data from directory {}", settings.data);
        Ok(DataSource::File(FileFetcher::new(&settings.data)))
    }
}

impl ResourceFetcher for DataSource {
    async fn fetch_json(&self, path: &str) -> Result<FeatureCollection> {
        match self {
            DataSource::File(fetcher) => fetcher.fetch_json(path).await,
            #[cfg(feature = "http")]
            DataSource::Http(fetcher) => fetcher.fetch_json(path).await,
        }
    }
}
