//! GeoJSON feature decoding
//!
//! Collections are decoded leniently: every feature is converted on its own, so a
//! single malformed feature (missing geometry, broken ring, wrong coordinate
//! shape) is dropped without failing the rest of the collection.

use crate::{AttributeKeys, LookupError, Result, utils};
use geo::{BoundingRect, Coord, LineString, MultiPolygon, Polygon, Rect};
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::{Map, Value};

/// A GeoJSON `FeatureCollection` with features kept undecoded
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Value>,
}

/// A single GeoJSON feature, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFeature {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub geometry: Option<RawGeometry>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

/// Polygonal GeoJSON geometries; anything else is unsupported
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum RawGeometry {
    Polygon {
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Vec<f64>>>>,
    },
    #[serde(other)]
    Unsupported,
}

/// A validated polygon feature with a stable code and its attributes
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonFeature {
    code: String,
    geometry: MultiPolygon<f64>,
    /// Precomputed bounding box in degrees, used to reject far points quickly
    bounds: Rect<f64>,
    properties: Map<String, Value>,
}

/// Attribute panel contents of a parcel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParcelInfo {
    pub sheet_number: Option<String>,
    pub parcel_number: Option<String>,
    pub area_m2: Option<f64>,
    pub land_use: Option<String>,
    pub address: Option<String>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl FeatureCollection {
    /// Decode all features into polygon features, keeping input order.
    ///
    /// `code_of` chooses the code of each feature from its position and raw
    /// data; features it returns `None` for are skipped.
    pub fn decode_polygons<F>(&self, code_of: F) -> Vec<PolygonFeature>
    where
        F: Fn(usize, &RawFeature) -> Option<String> + Sync,
    {
        profiling::scope!("FeatureCollection::decode_polygons");

        let decoded: Vec<PolygonFeature> = self
            .features
            .par_iter()
            .enumerate()
            .filter_map(|(index, value)| {
                let raw = match RawFeature::deserialize(value) {
                    Ok(raw) => raw,
                    Err(e) => {
                        tracing::warn!("Skipping undecodable feature #{index}: {e}");
                        return None;
                    }
                };
                let Some(code) = code_of(index, &raw) else {
                    tracing::warn!("Skipping feature #{index} without a code");
                    return None;
                };
                match PolygonFeature::from_raw(raw, code) {
                    Ok(feature) => Some(feature),
                    Err(e) => {
                        tracing::warn!("Skipping feature #{index}: {e}");
                        None
                    }
                }
            })
            .collect();

        if decoded.len() < self.features.len() {
            tracing::debug!(
                "Decoded {} of {} features",
                decoded.len(),
                self.features.len()
            );
        }
        decoded
    }
}

impl RawFeature {
    /// Read a property as a code-like string (strings as-is, numbers stringified)
    pub fn property_code(&self, key: &str) -> Option<String> {
        self.properties
            .as_ref()
            .and_then(|props| props.get(key))
            .and_then(value_to_code)
    }

    /// The feature-level `id`, if it is a string or a number
    pub fn id_code(&self) -> Option<String> {
        self.id.as_ref().and_then(value_to_code)
    }
}

impl PolygonFeature {
    /// Create a feature from already-built geometry
    pub fn new(
        code: impl Into<String>,
        geometry: MultiPolygon<f64>,
        properties: Map<String, Value>,
    ) -> Result<Self> {
        if geometry.0.is_empty() {
            return Err(LookupError::InvalidGeometry("no polygons".to_string()));
        }
        for polygon in &geometry.0 {
            // A closed ring needs three distinct vertices plus the closing one
            if polygon.exterior().0.len() < 4 {
                return Err(LookupError::InvalidGeometry(format!(
                    "exterior ring has {} vertices",
                    polygon.exterior().0.len()
                )));
            }
            if polygon.interiors().iter().any(|ring| ring.0.len() < 4) {
                return Err(LookupError::InvalidGeometry(
                    "degenerate interior ring".to_string(),
                ));
            }
        }
        let bounds = geometry
            .bounding_rect()
            .ok_or_else(|| LookupError::InvalidGeometry("empty bounds".to_string()))?;

        Ok(Self {
            code: code.into(),
            geometry,
            bounds,
            properties,
        })
    }

    /// Validate a raw GeoJSON feature
    pub fn from_raw(raw: RawFeature, code: String) -> Result<Self> {
        let geometry = match raw.geometry {
            None => return Err(LookupError::InvalidGeometry("missing geometry".to_string())),
            Some(RawGeometry::Unsupported) => {
                return Err(LookupError::InvalidGeometry(
                    "geometry is not polygonal".to_string(),
                ));
            }
            Some(RawGeometry::Polygon { coordinates }) => {
                MultiPolygon::new(vec![polygon_from_rings(&coordinates)?])
            }
            Some(RawGeometry::MultiPolygon { coordinates }) => MultiPolygon::new(
                coordinates
                    .iter()
                    .map(|rings| polygon_from_rings(rings))
                    .collect::<Result<Vec<_>>>()?,
            ),
        };
        Self::new(code, geometry, raw.properties.unwrap_or_default())
    }

    #[inline]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[inline]
    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    #[inline]
    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    #[inline]
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Read a property as display text. Blank strings, nulls, zero and
    /// `false` count as absent.
    pub fn property_text(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(true) => Some(true.to_string()),
            _ => None,
        }
    }

    /// Read a numeric property; numeric strings are accepted
    pub fn property_number(&self, key: &str) -> Option<f64> {
        match self.properties.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl ParcelInfo {
    /// Shown in place of a missing attribute
    pub const PLACEHOLDER: &'static str = "---";

    /// Extract the info panel attributes from a parcel
    pub fn from_feature(feature: &PolygonFeature, keys: &AttributeKeys) -> Self {
        Self {
            sheet_number: feature.property_text(&keys.sheet_number),
            parcel_number: feature.property_text(&keys.parcel_number),
            // A zero area is as good as missing
            area_m2: feature
                .property_number(&keys.area)
                .filter(|area| *area != 0.0 && area.is_finite()),
            land_use: feature.property_text(&keys.land_use),
            address: feature.property_text(&keys.address),
        }
    }

    /// Labeled display rows, with placeholders for missing values
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let text = |value: &Option<String>| {
            value
                .clone()
                .unwrap_or_else(|| Self::PLACEHOLDER.to_string())
        };
        vec![
            ("Sheet no.", text(&self.sheet_number)),
            ("Parcel no.", text(&self.parcel_number)),
            (
                "Area",
                self.area_m2
                    .map(|area| format!("{} m²", utils::format_decimal_with_commas(area)))
                    .unwrap_or_else(|| Self::PLACEHOLDER.to_string()),
            ),
            ("Land use", text(&self.land_use)),
            ("Address", text(&self.address)),
        ]
    }
}

fn value_to_code(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| ring_from_positions(ring));
    let exterior = rings
        .next()
        .ok_or_else(|| LookupError::InvalidGeometry("polygon without rings".to_string()))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    // Polygon::new closes open rings
    Ok(Polygon::new(exterior, interiors))
}

fn ring_from_positions(positions: &[Vec<f64>]) -> Result<LineString<f64>> {
    positions
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
            _ => Err(LookupError::InvalidGeometry(format!(
                "bad position {position:?}"
            ))),
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}
