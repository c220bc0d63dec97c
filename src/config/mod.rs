use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub mod error;
pub use error::ConfigError;

/// Default dataset: the NERSC THREDDS Arctic 1 km ocean-color product this
/// analysis was built around. Any OPeNDAP URL or local NetCDF path with the
/// same variable layout works.
pub const DEFAULT_DATASET: &str = "https://thredds.nersc.no/thredds/dodsC/sios_infranor_oceancolor/arctic_1km_oceancolor/2022/08/20220831_cmems_arctic1km_cmems_oceancolour.nc";

const DEFAULT_VARIABLE: &str = "CHL";
const DEFAULT_TIME_INDEX: usize = 0;
const DEFAULT_MIXED_LAYER_DEPTH_M: f64 = 20.0;
const DEFAULT_PIXEL_AREA_KM2: f64 = 1.0;
const DEFAULT_OUTPUT: &str = "chlorophyll_map.png";

/// Analysis parameters. Every field has a documented default so the tool
/// runs without a config file; the science assumptions (mixed layer depth,
/// per-pixel area) stay explicit and overridable.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    dataset: String,
    variable: String,
    time_index: usize,
    mixed_layer_depth_m: f64,
    pixel_area_km2: f64,
    output: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            dataset: DEFAULT_DATASET.to_string(),
            variable: DEFAULT_VARIABLE.to_string(),
            time_index: DEFAULT_TIME_INDEX,
            mixed_layer_depth_m: DEFAULT_MIXED_LAYER_DEPTH_M,
            pixel_area_km2: DEFAULT_PIXEL_AREA_KM2,
            output: DEFAULT_OUTPUT.to_string(),
        }
    }
}

// This function deserializes an AnalysisConfig from a deserializer, filling
// in defaults for absent fields and rejecting non-positive science
// parameters.
impl<'de> Deserialize<'de> for AnalysisConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ConfigHelper {
            dataset: Option<String>,
            variable: Option<String>,
            time_index: Option<usize>,
            mixed_layer_depth_m: Option<f64>,
            pixel_area_km2: Option<f64>,
            output: Option<String>,
        }

        let helper = ConfigHelper::deserialize(deserializer)?;
        let defaults = AnalysisConfig::default();

        let mixed_layer_depth_m = helper
            .mixed_layer_depth_m
            .unwrap_or(defaults.mixed_layer_depth_m);
        if !mixed_layer_depth_m.is_finite() || mixed_layer_depth_m <= 0.0 {
            return Err(D::Error::custom(ConfigError::MixedLayerDepth));
        }

        let pixel_area_km2 = helper.pixel_area_km2.unwrap_or(defaults.pixel_area_km2);
        if !pixel_area_km2.is_finite() || pixel_area_km2 <= 0.0 {
            return Err(D::Error::custom(ConfigError::PixelArea));
        }

        Ok(AnalysisConfig {
            dataset: helper.dataset.unwrap_or(defaults.dataset),
            variable: helper.variable.unwrap_or(defaults.variable),
            time_index: helper.time_index.unwrap_or(defaults.time_index),
            mixed_layer_depth_m,
            pixel_area_km2,
            output: helper.output.unwrap_or(defaults.output),
        })
    }
}

impl AnalysisConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<AnalysisConfig, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: AnalysisConfig =
            serde_json::from_reader(reader).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Loads the config file when it exists, otherwise the documented
    /// defaults. A present-but-invalid file is still an error.
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<AnalysisConfig, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn time_index(&self) -> usize {
        self.time_index
    }

    pub fn mixed_layer_depth_m(&self) -> f64 {
        self.mixed_layer_depth_m
    }

    pub fn pixel_area_km2(&self) -> f64 {
        self.pixel_area_km2
    }

    pub fn output(&self) -> &str {
        &self.output
    }
}
