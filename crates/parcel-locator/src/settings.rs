use clap::Parser;
use parcel_locator_lib::{AttributeKeys, Config};

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Parcel Locator - Resolve map clicks to administrative regions and land parcels
pub struct Settings {
    /// Data root: a local directory or an http(s) base URL
    #[clap(short, long, env = "PARCEL_DATA", default_value = ".")]
    pub data: String,

    /// Region boundary collection, relative to the data root
    #[clap(long, default_value = "ranhgioi.geojson")]
    pub region_path: String,

    /// Parcel collection path template; `{code}` is replaced by the region code
    #[clap(long, default_value = "geojson/{code}.geojson")]
    pub parcel_path_template: String,

    /// Region property holding the region code
    #[clap(long, default_value = "MaXa")]
    pub region_code_property: String,

    /// Parcel property used as code when a parcel has no feature id
    #[clap(long)]
    pub parcel_code_property: Option<String>,

    /// Edges shorter than this many meters get no length label
    #[clap(long, default_value = "1.0")]
    pub min_label_length: f64,

    /// HTTP request timeout in seconds
    #[clap(long, default_value = "30")]
    pub timeout: u64,

    /// Initial map center as `lon,lat`
    #[clap(long, default_value = "108.2022,16.0544", value_parser = parse_lon_lat)]
    pub center: (f64, f64),

    /// Initial zoom level
    #[clap(short, long, default_value = "18")]
    pub zoom: f64,

    /// Viewport width in pixels
    #[clap(long, default_value = "1280")]
    pub viewport_width: u32,

    /// Viewport height in pixels
    #[clap(long, default_value = "800")]
    pub viewport_height: u32,
}

impl Settings {
    /// Parse the command line, exiting with usage on error
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    /// Lookup configuration for the library
    pub fn to_config(&self) -> Config {
        Config {
            region_path: self.region_path.clone(),
            parcel_path_template: self.parcel_path_template.clone(),
            region_code_property: self.region_code_property.clone(),
            parcel_code_property: self.parcel_code_property.clone(),
            min_label_length_m: self.min_label_length,
            attribute_keys: AttributeKeys::default(),
            ..Config::default()
        }
    }

    /// Whether the data root is a remote URL
    pub fn is_remote(&self) -> bool {
        self.data.starts_with("http://") || self.data.starts_with("https://")
    }
}

fn parse_lon_lat(s: &str) -> Result<(f64, f64), String> {
    let (lon, lat) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `lon,lat`, got `{s}`"))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("bad longitude: {e}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {e}"))?;
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err(format!("`{s}` is not a valid lon/lat pair"));
    }
    Ok((lon, lat))
}
