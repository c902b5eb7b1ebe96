//! Lookup configuration: resource paths, code properties and label settings

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Placeholder written into `{code}` of the parcel path template
const CODE_PLACEHOLDER: &str = "{code}";

/// Configuration for the region/parcel lookup
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Path of the region boundary collection, relative to the data root.
    /// Default: `ranhgioi.geojson`
    pub region_path: String,
    /// Path template of a region's parcel collection. `{code}` is replaced
    /// by the region code.
    /// Default: `geojson/{code}.geojson`
    pub parcel_path_template: String,
    /// Region property holding the region code (default `MaXa`)
    pub region_code_property: String,
    /// Parcel property used as parcel code when the feature has no `id`
    pub parcel_code_property: Option<String>,
    /// Edges shorter than this (meters) are not labeled
    pub min_label_length_m: f64,
    /// Overlay source id handed to the renderer
    pub overlay_id: String,
    /// Property names shown in the parcel info panel
    pub attribute_keys: AttributeKeys,
}

/// Property names of the parcel attributes shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AttributeKeys {
    pub sheet_number: String,
    pub parcel_number: String,
    pub area: String,
    pub land_use: String,
    pub address: String,
}

impl Default for AttributeKeys {
    fn default() -> Self {
        Self {
            sheet_number: "SoHieuToBanDo".to_string(),
            parcel_number: "SoThuTuThua".to_string(),
            area: "DienTich".to_string(),
            land_use: "KyHieuMucDichSuDung".to_string(),
            address: "DiaChi".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region_path: "ranhgioi.geojson".to_string(),
            parcel_path_template: format!("geojson/{CODE_PLACEHOLDER}.geojson"),
            region_code_property: "MaXa".to_string(),
            parcel_code_property: None,
            min_label_length_m: 1.0,
            overlay_id: "highlight".to_string(),
            attribute_keys: AttributeKeys::default(),
        }
    }
}

impl Config {
    /// Resolve the parcel collection path for a region code
    pub fn parcel_path(&self, region_code: &str) -> String {
        self.parcel_path_template
            .replace(CODE_PLACEHOLDER, region_code)
    }
}
