//! Shared fixtures and test doubles
//!
//! Two square regions side by side: R1 spans lon 108.0..108.1 and R2 spans
//! 108.1..108.2, both over lat 16.0..16.1. R1 has a 3x3 grid of small parcels
//! (P1..P9) near its center, R2 has two parcels without ids.

use crate::{
    FeatureCollection, LabelHandle, LabelSurface, LookupError, Notice, ParcelInfo, PolygonFeature,
    ResourceFetcher, Result, ScreenPoint, Selection, TileRenderer, ViewSubscription,
};
use geo::{MultiPolygon, Point, Rect, coord};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub const REGION_PATH: &str = "ranhgioi.geojson";

/// Decodable parcels in R1's collection (the rest are malformed)
pub const R1_VALID_PARCELS: usize = 9;

const GRID_ORIGIN: (f64, f64) = (108.05, 16.05);
const CELL: f64 = 0.001;

pub fn parcel_path(region_code: &str) -> String {
    format!("geojson/{region_code}.geojson")
}

pub fn point_in_r1() -> Point<f64> {
    Point::new(108.02, 16.08)
}

/// In R1, away from every parcel
pub fn point_in_r1_without_parcel() -> Point<f64> {
    Point::new(108.02, 16.02)
}

pub fn point_in_p7() -> Point<f64> {
    Point::new(108.0505, 16.0525)
}

/// Inside the first parcel of R2
pub fn point_in_r2_parcel() -> Point<f64> {
    Point::new(108.1505, 16.0505)
}

pub fn point_outside() -> Point<f64> {
    Point::new(110.0, 20.0)
}

pub fn rectangle(code: &str, min: (f64, f64), max: (f64, f64)) -> PolygonFeature {
    let rect = Rect::new(coord! { x: min.0, y: min.1 }, coord! { x: max.0, y: max.1 });
    PolygonFeature::new(code, MultiPolygon::new(vec![rect.to_polygon()]), Map::new()).unwrap()
}

fn rect_ring(min: (f64, f64), max: (f64, f64)) -> Value {
    json!([[
        [min.0, min.1],
        [max.0, min.1],
        [max.0, max.1],
        [min.0, max.1],
        [min.0, min.1]
    ]])
}

fn regions() -> Value {
    json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "MaXa": "R1", "TenXa": "Ward one" },
                "geometry": { "type": "Polygon", "coordinates": rect_ring((108.0, 16.0), (108.1, 16.1)) }
            },
            {
                "type": "Feature",
                "properties": { "MaXa": "R2", "TenXa": "Ward two" },
                "geometry": { "type": "Polygon", "coordinates": rect_ring((108.1, 16.0), (108.2, 16.1)) }
            }
        ]
    })
}

/// Parcel `k` (1..=9) of the R1 grid, numbered row by row from the origin
fn grid_parcel(k: usize) -> Value {
    let row = ((k - 1) / 3) as f64;
    let col = ((k - 1) % 3) as f64;
    let (x0, y0) = (GRID_ORIGIN.0 + col * CELL, GRID_ORIGIN.1 + row * CELL);
    let (x1, y1) = (x0 + CELL, y0 + CELL);

    // P7 has an extra vertex a third of a meter above its corner
    let coordinates = if k == 7 {
        json!([[[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0 + 0.000003], [x0, y0]]])
    } else {
        rect_ring((x0, y0), (x1, y1))
    };

    json!({
        "type": "Feature",
        "id": format!("P{k}"),
        "properties": {
            "SoHieuToBanDo": "12",
            "SoThuTuThua": k,
            "DienTich": 110.5,
            "DiaChi": format!("{k} Test street")
        },
        "geometry": { "type": "Polygon", "coordinates": coordinates }
    })
}

fn r1_parcels() -> Value {
    let mut features: Vec<Value> = (1..=9).map(grid_parcel).collect();
    features.insert(3, Value::Null);
    features.push(json!({ "type": "Feature", "id": "P10", "properties": {} }));
    json!({ "type": "FeatureCollection", "features": features })
}

fn r2_parcels() -> Value {
    json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "SoThuTuThua": 15 },
                "geometry": { "type": "Polygon", "coordinates": rect_ring((108.150, 16.050), (108.151, 16.051)) }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Polygon", "coordinates": rect_ring((108.152, 16.050), (108.153, 16.051)) }
            }
        ]
    })
}

/// The selection a click on P7 produces with the default config
pub fn selection_p7() -> Selection {
    let collection: FeatureCollection = serde_json::from_value(r1_parcels()).unwrap();
    let p7 = collection
        .decode_polygons(|_, raw| raw.id_code())
        .into_iter()
        .find(|parcel| parcel.code() == "P7")
        .unwrap();
    Selection::new("R1", p7, 1.0).unwrap()
}

#[derive(Default)]
struct MockState {
    counts: HashMap<String, usize>,
    failures: HashMap<String, usize>,
    delays: HashMap<String, Duration>,
}

/// In-memory fetcher with scripted failures and delays
#[derive(Default)]
pub struct MockFetcher {
    resources: HashMap<String, Value>,
    state: Mutex<MockState>,
}

impl MockFetcher {
    pub fn with_fixtures() -> Self {
        let mut resources = HashMap::new();
        resources.insert(REGION_PATH.to_string(), regions());
        resources.insert(parcel_path("R1"), r1_parcels());
        resources.insert(parcel_path("R2"), r2_parcels());
        Self {
            resources,
            state: Mutex::default(),
        }
    }

    /// Make the next `times` fetches of `path` fail
    pub fn fail_next(&self, path: &str, times: usize) {
        self.lock().failures.insert(path.to_string(), times);
    }

    pub fn set_delay(&self, path: &str, delay: Duration) {
        self.lock().delays.insert(path.to_string(), delay);
    }

    /// Fetches of `path` so far, failed ones included
    pub fn fetch_count(&self, path: &str) -> usize {
        self.lock().counts.get(path).copied().unwrap_or(0)
    }

    /// Fetches of anything but the region collection
    pub fn total_parcel_fetches(&self) -> usize {
        self.lock()
            .counts
            .iter()
            .filter(|(path, _)| path.as_str() != REGION_PATH)
            .map(|(_, count)| count)
            .sum()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResourceFetcher for MockFetcher {
    async fn fetch_json(&self, path: &str) -> Result<FeatureCollection> {
        let (delay, fail) = {
            let mut state = self.lock();
            *state.counts.entry(path.to_string()).or_default() += 1;
            let fail = match state.failures.get_mut(path) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            };
            (state.delays.get(path).copied(), fail)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(LookupError::unavailable(path, "scripted failure"));
        }

        let value = self
            .resources
            .get(path)
            .cloned()
            .ok_or_else(|| LookupError::unavailable(path, "HTTP 404"))?;
        serde_json::from_value(value).map_err(|e| LookupError::unavailable(path, e))
    }
}

/// Renderer double: a fixed linear projection that can be panned
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    overlays: HashMap<String, MultiPolygon<f64>>,
    pub add_calls: usize,
    pub set_calls: usize,
    pub subscriptions: HashSet<ViewSubscription>,
    next_subscription: u64,
    offset: (f32, f32),
}

impl RecordingRenderer {
    pub fn overlay(&self, id: &str) -> Option<&MultiPolygon<f64>> {
        self.overlays.get(id)
    }

    /// Move the view by whole pixels
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.offset.0 += dx;
        self.offset.1 += dy;
    }
}

impl TileRenderer for RecordingRenderer {
    fn add_overlay_source(&mut self, id: &str, geometry: &MultiPolygon<f64>) {
        self.add_calls += 1;
        self.overlays.insert(id.to_string(), geometry.clone());
    }

    fn set_overlay_data(&mut self, id: &str, geometry: &MultiPolygon<f64>) {
        assert!(self.overlays.contains_key(id), "overlay {id} was never added");
        self.set_calls += 1;
        self.overlays.insert(id.to_string(), geometry.clone());
    }

    fn project_to_screen(&self, point: Point<f64>) -> ScreenPoint {
        let x = ((point.x() - 108.0) * 100_000.0) as f32;
        let y = ((16.1 - point.y()) * 100_000.0) as f32;
        ScreenPoint::new(x + self.offset.0, y + self.offset.1)
    }

    fn subscribe_view_changed(&mut self) -> ViewSubscription {
        self.next_subscription += 1;
        let subscription = ViewSubscription(self.next_subscription);
        self.subscriptions.insert(subscription);
        subscription
    }

    fn unsubscribe_view_changed(&mut self, subscription: ViewSubscription) {
        assert!(self.subscriptions.remove(&subscription), "unknown subscription");
    }
}

/// Surface double recording labels, attributes and notices
#[derive(Debug, Default)]
pub struct RecordingSurface {
    labels: BTreeMap<LabelHandle, Option<(ScreenPoint, String)>>,
    next_label: u64,
    pub destroyed: usize,
    pub attributes: Vec<ParcelInfo>,
    pub notices: Vec<Notice>,
}

impl RecordingSurface {
    pub fn live_labels(&self) -> usize {
        self.labels.len()
    }

    /// Positioned labels in creation order
    pub fn positions(&self) -> Vec<(ScreenPoint, String)> {
        self.labels.values().flatten().cloned().collect()
    }
}

impl LabelSurface for RecordingSurface {
    fn create_label(&mut self) -> LabelHandle {
        self.next_label += 1;
        let handle = LabelHandle(self.next_label);
        self.labels.insert(handle, None);
        handle
    }

    fn position_label(&mut self, handle: LabelHandle, position: ScreenPoint, text: &str) {
        let label = self.labels.get_mut(&handle).expect("label was destroyed");
        *label = Some((position, text.to_string()));
    }

    fn destroy_label(&mut self, handle: LabelHandle) {
        assert!(self.labels.remove(&handle).is_some(), "label destroyed twice");
        self.destroyed += 1;
    }

    fn render_attributes(&mut self, info: &ParcelInfo) {
        self.attributes.push(info.clone());
    }

    fn show_notice(&mut self, notice: &Notice) {
        self.notices.push(notice.clone());
    }
}
