//! Contracts with the map renderer and the UI surface
//!
//! The engine draws nothing itself. A [`TileRenderer`] owns the map (overlay
//! sources, projection, view-change events) and a [`LabelSurface`] owns the
//! floating label elements, the parcel info panel and user notices.

use crate::ParcelInfo;
use geo::{MultiPolygon, Point};
use std::fmt;

/// A position in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Opaque id of a label element created by a [`LabelSurface`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelHandle(pub u64);

/// Opaque id of a view-change subscription issued by a [`TileRenderer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewSubscription(pub u64);

/// The map the highlight is drawn on
pub trait TileRenderer: Send {
    /// Create an overlay source with its initial geometry
    fn add_overlay_source(&mut self, id: &str, geometry: &MultiPolygon<f64>);

    /// Replace the geometry of an existing overlay source
    fn set_overlay_data(&mut self, id: &str, geometry: &MultiPolygon<f64>);

    /// Project a lon/lat point to screen pixels under the current view
    fn project_to_screen(&self, point: Point<f64>) -> ScreenPoint;

    /// Start delivering view-change (pan/zoom) notifications
    fn subscribe_view_changed(&mut self) -> ViewSubscription;

    /// Stop delivering notifications for `subscription`
    fn unsubscribe_view_changed(&mut self, subscription: ViewSubscription);
}

/// The UI layer: edge labels, the parcel info panel and notices
pub trait LabelSurface: Send {
    fn create_label(&mut self) -> LabelHandle;

    fn position_label(&mut self, handle: LabelHandle, position: ScreenPoint, text: &str);

    fn destroy_label(&mut self, handle: LabelHandle);

    /// Show the attributes of the selected parcel
    fn render_attributes(&mut self, info: &ParcelInfo);

    /// Tell the user about a lookup outcome that produced no selection
    fn show_notice(&mut self, notice: &Notice);
}

/// User-visible lookup outcomes other than a successful selection
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Region boundaries are still loading (or failed to load)
    BoundariesNotReady,
    /// The click is outside every region
    OutsideCoverage,
    /// The region has no parcel at the click
    ParcelNotFound { region_code: String },
    /// The region's parcels could not be fetched; the next click retries
    DataUnavailable { region_code: String, reason: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::BoundariesNotReady => {
                write!(f, "Boundary data is not ready yet. Please try again later.")
            }
            Notice::OutsideCoverage => write!(f, "Could not determine the ward/commune."),
            Notice::ParcelNotFound { region_code } => {
                write!(f, "No land parcel found here (region {region_code}).")
            }
            Notice::DataUnavailable {
                region_code,
                reason,
            } => write!(
                f,
                "Parcel data for region {region_code} is unavailable ({reason}). Please try again."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_display() {
        assert_eq!(
            Notice::ParcelNotFound {
                region_code: "20194".to_string()
            }
            .to_string(),
            "No land parcel found here (region 20194)."
        );
        assert!(Notice::BoundariesNotReady.to_string().contains("not ready"));
    }
}
