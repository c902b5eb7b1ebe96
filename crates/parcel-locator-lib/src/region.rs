//! RegionCache - first level of the lookup
//!
//! Holds the administrative boundary polygons, loaded once per session. Until
//! the load succeeds every query answers [`RegionLookup::NotReady`] instead of
//! failing.

use crate::{FeatureCollection, LookupError, PolygonFeature, ResourceFetcher, Result, geometry};
use geo::Point;
use tokio::sync::OnceCell;

/// Default region property holding the region code
const DEFAULT_CODE_PROPERTY: &str = "MaXa";

/// Outcome of a region lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionLookup {
    /// The point lies in the region with this code
    Found(String),
    /// Regions are loaded but none contains the point
    NotFound,
    /// Region boundaries have not been loaded (yet)
    NotReady,
}

/// Session-lifetime set of region boundaries
#[derive(Debug)]
pub struct RegionCache {
    /// Regions in load order; empty until the first successful load
    regions: OnceCell<Vec<PolygonFeature>>,
    code_property: String,
}

impl Default for RegionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionCache {
    /// Create an empty cache reading codes from the `MaXa` property
    pub fn new() -> Self {
        Self::with_code_property(DEFAULT_CODE_PROPERTY)
    }

    /// Create an empty cache reading codes from `code_property`
    pub fn with_code_property(code_property: impl Into<String>) -> Self {
        Self {
            regions: OnceCell::new(),
            code_property: code_property.into(),
        }
    }

    /// Create a cache that is ready with the given regions
    pub fn from_features(regions: Vec<PolygonFeature>) -> Self {
        Self {
            regions: OnceCell::new_with(Some(regions)),
            code_property: DEFAULT_CODE_PROPERTY.to_string(),
        }
    }

    /// Fetch and decode the region boundaries.
    ///
    /// Only the first successful load has an effect. On failure the cache stays
    /// empty and the error is returned, so a later call can retry.
    pub async fn load<F: ResourceFetcher>(&self, fetcher: &F, path: &str) -> Result<()> {
        let regions = self
            .regions
            .get_or_try_init(|| async {
                let collection = fetcher.fetch_json(path).await?;
                Ok::<_, LookupError>(self.decode(&collection))
            })
            .await
            .inspect_err(|e| tracing::error!("Failed to load region boundaries: {e}"))?;

        tracing::info!("{} region boundaries ready", regions.len());
        Ok(())
    }

    fn decode(&self, collection: &FeatureCollection) -> Vec<PolygonFeature> {
        let code_property = self.code_property.as_str();
        collection.decode_polygons(|_, raw| raw.property_code(code_property))
    }

    /// Whether the boundaries have been loaded
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.regions.initialized()
    }

    /// Number of loaded regions
    #[inline]
    pub fn len(&self) -> usize {
        self.regions.get().map_or(0, Vec::len)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the region containing `point`.
    ///
    /// Regions are scanned in load order and the first match wins, so
    /// overlapping boundaries resolve to the earlier region.
    pub fn locate(&self, point: Point<f64>) -> RegionLookup {
        profiling::scope!("RegionCache::locate");

        let Some(regions) = self.regions.get() else {
            return RegionLookup::NotReady;
        };
        regions
            .iter()
            .find(|region| geometry::contains(point, region))
            .map_or(RegionLookup::NotFound, |region| {
                RegionLookup::Found(region.code().to_string())
            })
    }

    /// Look up a loaded region by code
    pub fn region(&self, code: &str) -> Option<&PolygonFeature> {
        self.regions.get()?.iter().find(|r| r.code() == code)
    }
}
