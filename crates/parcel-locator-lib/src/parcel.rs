//! ParcelStore - second level of the lookup
//!
//! Parcel collections are fetched per region on first use and kept for the rest
//! of the session. Each region has its own [`OnceCell`], which doubles as the
//! pending-request marker: concurrent lookups in a region that is still being
//! fetched wait for that fetch instead of starting another one. A failed fetch
//! leaves the cell empty, so the next lookup tries again.

use crate::{Config, PolygonFeature, ResourceFetcher, Result, geometry};
use dashmap::DashMap;
use geo::Point;
use std::sync::Arc;
use tokio::sync::OnceCell;

type ParcelCollection = Arc<Vec<PolygonFeature>>;

/// Per-region lazy cache of parcel collections
pub struct ParcelStore<F> {
    fetcher: F,
    config: Config,
    collections: DashMap<String, Arc<OnceCell<ParcelCollection>>>,
}

impl<F: ResourceFetcher> ParcelStore<F> {
    /// Create an empty store fetching through `fetcher`
    pub fn new(fetcher: F, config: Config) -> Self {
        Self {
            fetcher,
            config,
            collections: DashMap::new(),
        }
    }

    #[inline]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Number of regions whose parcels are cached
    pub fn cached_regions(&self) -> usize {
        self.collections
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    /// Whether the parcels of `region_code` are cached
    pub fn is_cached(&self, region_code: &str) -> bool {
        self.collections
            .get(region_code)
            .is_some_and(|cell| cell.initialized())
    }

    /// Find the parcel of `region_code` containing `point`.
    ///
    /// Fetches the region's collection on first use. Returns `Ok(None)` when no
    /// parcel matches and [`LookupError::DataUnavailable`] when the collection
    /// could not be fetched.
    pub async fn locate(
        &self,
        region_code: &str,
        point: Point<f64>,
    ) -> Result<Option<PolygonFeature>> {
        let parcels = self.collection(region_code).await?;

        profiling::scope!("ParcelStore::scan");
        Ok(parcels
            .iter()
            .find(|parcel| geometry::contains(point, parcel))
            .cloned())
    }

    /// The cached collection of `region_code`, fetching it if needed
    pub async fn collection(&self, region_code: &str) -> Result<ParcelCollection> {
        // Clone the cell out so the map shard is not locked across the await
        let cell = self
            .collections
            .entry(region_code.to_string())
            .or_default()
            .clone();

        if let Some(parcels) = cell.get() {
            tracing::debug!("Parcels of region {region_code} served from cache");
            return Ok(parcels.clone());
        }

        cell.get_or_try_init(|| self.fetch_collection(region_code))
            .await
            .cloned()
    }

    async fn fetch_collection(&self, region_code: &str) -> Result<ParcelCollection> {
        let path = self.config.parcel_path(region_code);
        tracing::debug!("Fetching parcels of region {region_code} from {path}");

        let collection = self.fetcher.fetch_json(&path).await.inspect_err(|e| {
            tracing::warn!("Parcels of region {region_code} unavailable: {e}");
        })?;

        let code_property = self.config.parcel_code_property.as_deref();
        let parcels = collection.decode_polygons(|index, raw| {
            raw.id_code()
                .or_else(|| code_property.and_then(|key| raw.property_code(key)))
                .or_else(|| Some(format!("{region_code}#{index}")))
        });

        tracing::info!("Cached {} parcels of region {region_code}", parcels.len());
        Ok(Arc::new(parcels))
    }
}
