//! Terminal implementations of the map renderer and the label surface
//!
//! The "map" is a Web Mercator viewport that exists only as numbers: overlay
//! changes, label placements, the info panel and notices are printed as lines.

use geo::{BoundingRect, MultiPolygon, Point};
use parcel_locator_lib::{
    LabelHandle, LabelSurface, Notice, ParcelInfo, ScreenPoint, TileRenderer, ViewSubscription,
    utils::{mercator_meters_per_pixel, mercator_to_wgs84, wgs84_to_mercator},
};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

/// Zoom range accepted by [`ConsoleRenderer::set_zoom`]
pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 22.0;

fn emit(out: &mut impl Write, line: std::fmt::Arguments<'_>) {
    if let Err(e) = writeln!(out, "{line}") {
        tracing::warn!("Failed to write output: {e}");
    }
}

/// Web Mercator viewport printing overlay changes
pub struct ConsoleRenderer<W> {
    /// View center in Web Mercator meters
    center: Point<f64>,
    zoom: f64,
    viewport: (f32, f32),
    overlays: BTreeMap<String, usize>,
    subscriptions: BTreeSet<ViewSubscription>,
    next_subscription: u64,
    out: W,
}

impl<W: Write + Send> ConsoleRenderer<W> {
    pub fn new(center_lon_lat: (f64, f64), zoom: f64, viewport: (u32, u32), out: W) -> Self {
        Self {
            center: wgs84_to_mercator(center_lon_lat.1, center_lon_lat.0),
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            viewport: (viewport.0 as f32, viewport.1 as f32),
            overlays: BTreeMap::new(),
            subscriptions: BTreeSet::new(),
            next_subscription: 0,
            out,
        }
    }

    /// Move the view so the content shifts by `(dx, dy)` pixels
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let mpp = mercator_meters_per_pixel(self.zoom);
        self.center = Point::new(self.center.x() - dx * mpp, self.center.y() + dy * mpp);
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// View center as `(lon, lat)`
    pub fn center(&self) -> (f64, f64) {
        let (lat, lon) = mercator_to_wgs84(self.center.x(), self.center.y());
        (lon, lat)
    }

    /// Whether anyone listens for view changes
    pub fn has_view_listeners(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    #[cfg(test)]
    pub fn out(&self) -> &W {
        &self.out
    }

    fn describe(&mut self, verb: &str, id: &str, geometry: &MultiPolygon<f64>) {
        self.overlays.insert(id.to_string(), geometry.0.len());
        match geometry.bounding_rect() {
            Some(rect) => emit(
                &mut self.out,
                format_args!(
                    "overlay {id} {verb}: {} polygon(s) within ({:.6}, {:.6})..({:.6}, {:.6})",
                    geometry.0.len(),
                    rect.min().x,
                    rect.min().y,
                    rect.max().x,
                    rect.max().y
                ),
            ),
            None => emit(&mut self.out, format_args!("overlay {id} cleared")),
        }
    }
}

impl<W: Write + Send> TileRenderer for ConsoleRenderer<W> {
    fn add_overlay_source(&mut self, id: &str, geometry: &MultiPolygon<f64>) {
        self.describe("added", id, geometry);
    }

    fn set_overlay_data(&mut self, id: &str, geometry: &MultiPolygon<f64>) {
        if !self.overlays.contains_key(id) {
            tracing::warn!("Overlay {id} updated before it was added");
        }
        self.describe("updated", id, geometry);
    }

    fn project_to_screen(&self, point: Point<f64>) -> ScreenPoint {
        let mpp = mercator_meters_per_pixel(self.zoom);
        let m = wgs84_to_mercator(point.y(), point.x());
        ScreenPoint::new(
            ((m.x() - self.center.x()) / mpp) as f32 + self.viewport.0 / 2.0,
            ((self.center.y() - m.y()) / mpp) as f32 + self.viewport.1 / 2.0,
        )
    }

    fn subscribe_view_changed(&mut self) -> ViewSubscription {
        self.next_subscription += 1;
        let subscription = ViewSubscription(self.next_subscription);
        self.subscriptions.insert(subscription);
        subscription
    }

    fn unsubscribe_view_changed(&mut self, subscription: ViewSubscription) {
        self.subscriptions.remove(&subscription);
    }
}

/// Prints label placements, the info panel and notices
pub struct ConsoleSurface<W> {
    live: BTreeSet<LabelHandle>,
    next_label: u64,
    out: W,
}

impl<W: Write + Send> ConsoleSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            live: BTreeSet::new(),
            next_label: 0,
            out,
        }
    }

    pub fn live_labels(&self) -> usize {
        self.live.len()
    }

    #[cfg(test)]
    pub fn out(&self) -> &W {
        &self.out
    }
}

impl<W: Write + Send> LabelSurface for ConsoleSurface<W> {
    fn create_label(&mut self) -> LabelHandle {
        self.next_label += 1;
        let handle = LabelHandle(self.next_label);
        self.live.insert(handle);
        handle
    }

    fn position_label(&mut self, handle: LabelHandle, position: ScreenPoint, text: &str) {
        emit(
            &mut self.out,
            format_args!(
                "label #{} at ({:.1}, {:.1}): {text} m",
                handle.0, position.x, position.y
            ),
        );
    }

    fn destroy_label(&mut self, handle: LabelHandle) {
        self.live.remove(&handle);
    }

    fn render_attributes(&mut self, info: &ParcelInfo) {
        for (label, value) in info.fields() {
            emit(&mut self.out, format_args!("  {label:<11} {value}"));
        }
    }

    fn show_notice(&mut self, notice: &Notice) {
        emit(&mut self.out, format_args!("! {notice}"));
    }
}
