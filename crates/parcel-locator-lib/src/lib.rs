//! Parcel Locator Library - Region and Parcel Resolution for Map Clicks
//!
//! This library resolves a clicked map coordinate to the administrative region
//! containing it and then to the land parcel inside that region. The resolved
//! parcel is highlighted through an external renderer and each boundary edge is
//! annotated with its length, kept in place while the map pans and zooms.
//!
//! # Architecture
//!
//! - **[`geometry`]**: Point-in-polygon, edge extraction, haversine length and midpoint
//! - **[`RegionCache`]**: Always-loaded region boundaries (first level of the lookup)
//! - **[`ParcelStore`]**: Lazily fetched, per-region parcel collections (second level)
//! - **[`SelectionController`]**: Click orchestration, last-click-wins, single active selection
//! - **[`HighlightPresenter`]**: Overlay geometry and edge label lifecycle
//!
//! The renderer, the label surface and the data source are injected through the
//! traits in [`surface`] and [`fetch`], so the whole engine runs without a real map.

mod config;
mod feature;
pub mod fetch;
pub mod geometry;
mod parcel;
mod presenter;
mod region;
mod selection;
pub mod surface;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Public API exports
pub use config::{AttributeKeys, Config};
pub use feature::{FeatureCollection, ParcelInfo, PolygonFeature, RawFeature};
#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
pub use fetch::{FileFetcher, ResourceFetcher};
pub use geometry::{Edge, EdgeLabel};
pub use parcel::ParcelStore;
pub use presenter::HighlightPresenter;
pub use region::{RegionCache, RegionLookup};
pub use selection::{
    ClickOutcome, ControllerState, PendingClick, Selection, SelectionController,
};
pub use surface::{LabelHandle, LabelSurface, Notice, ScreenPoint, TileRenderer, ViewSubscription};

/// Error types for lookups and data loading
#[derive(Debug, Clone, thiserror::Error)]
pub enum LookupError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Data unavailable at {path}: {reason}")]
    DataUnavailable { path: String, reason: String },
}

impl LookupError {
    pub(crate) fn unavailable(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        LookupError::DataUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LookupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that all public types are accessible
        let _: fn() -> Config = Config::default;
        let _: fn() -> RegionCache = RegionCache::new;
    }

    #[test]
    fn test_error_display() {
        let err = LookupError::unavailable("geojson/1.geojson", "HTTP 404");
        assert_eq!(
            err.to_string(),
            "Data unavailable at geojson/1.geojson: HTTP 404"
        );
    }
}
