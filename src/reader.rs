//! Chlorophyll slice loading from NetCDF datasets (local files or OPeNDAP
//! URLs, which libnetcdf resolves transparently when built with DAP).

use crate::config::AnalysisConfig;
use crate::grid::{Grid, MaskedField};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::fmt;

/// Fill value assumed when the chlorophyll variable carries no _FillValue
/// attribute.
pub const DEFAULT_FILL_VALUE: f32 = -999.0;

#[derive(Debug)]
pub enum ReadError {
    Open {
        location: String,
        source: netcdf::Error,
    },
    MissingVariable(String),
    Rank {
        variable: String,
        expected: usize,
        found: usize,
    },
    TimeIndexOutOfRange {
        index: usize,
        steps: usize,
    },
    AxisMismatch {
        axis: &'static str,
        axis_len: usize,
        field_len: usize,
    },
    Read {
        variable: String,
        source: netcdf::Error,
    },
    Shape(String),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Open { location, source } => {
                write!(f, "Failed to open dataset {}: {}", location, source)
            }
            ReadError::MissingVariable(name) => {
                write!(f, "Dataset is missing required variable '{}'", name)
            }
            ReadError::Rank {
                variable,
                expected,
                found,
            } => write!(
                f,
                "Variable '{}' has {} dimensions, expected {} [time, lat, lon]",
                variable, found, expected
            ),
            ReadError::TimeIndexOutOfRange { index, steps } => write!(
                f,
                "Time index {} out of range: dataset has {} time steps",
                index, steps
            ),
            ReadError::AxisMismatch {
                axis,
                axis_len,
                field_len,
            } => write!(
                f,
                "Axis '{}' has {} points but the field spans {}",
                axis, axis_len, field_len
            ),
            ReadError::Read { variable, source } => {
                write!(f, "Failed to read variable '{}': {}", variable, source)
            }
            ReadError::Shape(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ReadError {}

/// One time step of the chlorophyll product: geographic axes, the masked
/// concentration field, and the decoded acquisition time when the dataset
/// declares a recognizable epoch.
#[derive(Debug)]
pub struct ChlSlice {
    pub grid: Grid,
    pub field: MaskedField,
    pub fill_value: f32,
    pub timestamp: Option<DateTime<Utc>>,
}

pub fn load_chlorophyll(config: &AnalysisConfig) -> Result<ChlSlice, ReadError> {
    // Handle is scoped to this call; Drop releases it on every exit path.
    let file = netcdf::open(config.dataset()).map_err(|e| ReadError::Open {
        location: config.dataset().to_string(),
        source: e,
    })?;

    let lat = read_axis(&file, "latitude")?;
    let lon = read_axis(&file, "longitude")?;

    let time_var = file
        .variable("time")
        .ok_or_else(|| ReadError::MissingVariable("time".to_string()))?;
    let time_steps: usize = time_var.dimensions().iter().map(|d| d.len()).product();
    if config.time_index() >= time_steps {
        return Err(ReadError::TimeIndexOutOfRange {
            index: config.time_index(),
            steps: time_steps,
        });
    }
    let timestamp = decode_time(&time_var, config.time_index());

    let chl = file
        .variable(config.variable())
        .ok_or_else(|| ReadError::MissingVariable(config.variable().to_string()))?;

    let dims = chl.dimensions();
    if dims.len() != 3 {
        return Err(ReadError::Rank {
            variable: config.variable().to_string(),
            expected: 3,
            found: dims.len(),
        });
    }

    let nlat = dims[1].len();
    let nlon = dims[2].len();
    if nlat != lat.len() {
        return Err(ReadError::AxisMismatch {
            axis: "latitude",
            axis_len: lat.len(),
            field_len: nlat,
        });
    }
    if nlon != lon.len() {
        return Err(ReadError::AxisMismatch {
            axis: "longitude",
            axis_len: lon.len(),
            field_len: nlon,
        });
    }

    let values: Vec<f32> = chl
        .get_values((config.time_index(), .., ..))
        .map_err(|e| ReadError::Read {
            variable: config.variable().to_string(),
            source: e,
        })?;

    let fill_value = get_f32_attr(&chl, "_FillValue").unwrap_or(DEFAULT_FILL_VALUE);
    let field = MaskedField::new(values, nlon, nlat)
        .map_err(ReadError::Shape)?
        .mask_where(fill_value);

    Ok(ChlSlice {
        grid: Grid::new(lat, lon),
        field,
        fill_value,
        timestamp,
    })
}

fn read_axis(file: &netcdf::File, name: &str) -> Result<Vec<f64>, ReadError> {
    let var = file
        .variable(name)
        .ok_or_else(|| ReadError::MissingVariable(name.to_string()))?;

    var.get_values(..).map_err(|e| ReadError::Read {
        variable: name.to_string(),
        source: e,
    })
}

fn decode_time(var: &netcdf::Variable, index: usize) -> Option<DateTime<Utc>> {
    let units = get_str_attr(var, "units")?;
    let raw: Vec<f64> = var.get_values(index..index + 1).ok()?;

    decode_cf_timestamp(&units, *raw.first()?)
}

/// Decodes a CF "unit since epoch" time value. Unrecognized unit strings
/// yield None rather than an error; the timestamp is informational only.
fn decode_cf_timestamp(units: &str, value: f64) -> Option<DateTime<Utc>> {
    let (unit, origin) = units.split_once(" since ")?;

    let seconds_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
        "minutes" | "minute" | "mins" | "min" => 60.0,
        "hours" | "hour" | "hrs" | "hr" | "h" => 3600.0,
        "days" | "day" | "d" => 86400.0,
        _ => return None,
    };

    let origin = origin.trim().trim_end_matches(" UTC").trim();
    let epoch = NaiveDateTime::parse_from_str(origin, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(origin, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(origin, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    let seconds = value * seconds_per_unit;
    if !seconds.is_finite() || seconds.abs() > 1.0e14 {
        return None;
    }

    let offset = Duration::try_milliseconds((seconds * 1000.0) as i64)?;
    let datetime = epoch.checked_add_signed(offset)?;

    Some(Utc.from_utc_datetime(&datetime))
}

fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

// Helper to get an f32 attribute using TryInto
fn get_f32_attr(var: &netcdf::Variable, name: &str) -> Option<f32> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f32::try_from(attr_value).ok()
}

fn get_str_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use std::path::Path;
    use tempfile::tempdir;

    fn test_config(dataset: &Path, time_index: usize) -> AnalysisConfig {
        let json = format!(
            r#"{{ "dataset": {:?}, "time_index": {} }}"#,
            dataset.to_str().unwrap(),
            time_index
        );
        serde_json::from_str(&json).unwrap()
    }

    fn write_dataset(path: &Path, chl: &[f32], fill_value: Option<f32>) {
        let mut file = netcdf::create(path).unwrap();

        file.add_dimension("time", 2).unwrap();
        file.add_dimension("latitude", 2).unwrap();
        file.add_dimension("longitude", 2).unwrap();

        {
            let mut lat = file.add_variable::<f64>("latitude", &["latitude"]).unwrap();
            lat.put_values(&[78.0, 78.5], ..).unwrap();
        }

        {
            let mut lon = file
                .add_variable::<f64>("longitude", &["longitude"])
                .unwrap();
            lon.put_values(&[15.0, 15.5], ..).unwrap();
        }

        {
            let mut time = file.add_variable::<f64>("time", &["time"]).unwrap();
            time.put_attribute("units", "seconds since 2022-08-31 12:00:00")
                .unwrap();
            time.put_values(&[0.0, 86400.0], ..).unwrap();
        }

        {
            let mut var = file
                .add_variable::<f32>("CHL", &["time", "latitude", "longitude"])
                .unwrap();
            if let Some(fill) = fill_value {
                var.set_fill_value(fill).unwrap();
            }
            var.put_values(chl, ..).unwrap();
        }
    }

    #[test]
    fn test_load_masks_fill_and_nan_but_not_negatives() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chl.nc");
        // Step 0 holds the interesting values; step 1 is all fill
        write_dataset(
            &path,
            &[1.0, -2.0, f32::NAN, 3.0, -999.0, -999.0, -999.0, -999.0],
            Some(-999.0),
        );

        let slice = load_chlorophyll(&test_config(&path, 0)).unwrap();

        assert_eq!(slice.grid.lat(), [78.0, 78.5]);
        assert_eq!(slice.grid.lon(), [15.0, 15.5]);
        assert_eq!(slice.fill_value, -999.0);

        assert!(!slice.field.is_masked(0, 0));
        assert_eq!(slice.field.value(0, 1), -2.0);
        assert!(!slice.field.is_masked(0, 1));
        assert!(slice.field.is_masked(1, 0));
        assert!(!slice.field.is_masked(1, 1));

        let timestamp = slice.timestamp.unwrap();
        assert_eq!(timestamp, Utc.with_ymd_and_hms(2022, 8, 31, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_load_second_time_step_is_fully_masked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chl.nc");
        write_dataset(
            &path,
            &[1.0, -2.0, f32::NAN, 3.0, -999.0, -999.0, -999.0, -999.0],
            Some(-999.0),
        );

        let slice = load_chlorophyll(&test_config(&path, 1)).unwrap();

        assert_eq!(slice.field.unmasked_count(), 0);
    }

    #[test]
    fn test_load_uses_default_fill_value_when_attribute_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chl.nc");
        write_dataset(&path, &[1.0, -999.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0], None);

        let slice = load_chlorophyll(&test_config(&path, 0)).unwrap();

        assert_eq!(slice.fill_value, DEFAULT_FILL_VALUE);
        assert!(slice.field.is_masked(0, 1));
        assert_eq!(slice.field.unmasked_count(), 3);
    }

    #[test]
    fn test_load_rejects_out_of_range_time_index() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chl.nc");
        write_dataset(&path, &[0.0; 8], Some(-999.0));

        let err = load_chlorophyll(&test_config(&path, 5)).unwrap_err();

        match err {
            ReadError::TimeIndexOutOfRange { index: 5, steps: 2 } => {}
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_load_reports_missing_variable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.nc");
        {
            let mut file = netcdf::create(&path).unwrap();
            file.add_dimension("latitude", 1).unwrap();
            let mut lat = file.add_variable::<f64>("latitude", &["latitude"]).unwrap();
            lat.put_values(&[70.0], ..).unwrap();
        }

        let err = load_chlorophyll(&test_config(&path, 0)).unwrap_err();

        match err {
            ReadError::MissingVariable(name) => assert_eq!(name, "longitude"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_load_fails_on_unreachable_location() {
        let config = test_config(Path::new("./no/such/dataset.nc"), 0);
        assert!(matches!(
            load_chlorophyll(&config),
            Err(ReadError::Open { .. })
        ));
    }

    #[test]
    fn test_decode_cf_timestamp_seconds() {
        let decoded = decode_cf_timestamp("seconds since 1970-01-01 00:00:00", 86400.0).unwrap();
        assert_eq!(decoded, Utc.with_ymd_and_hms(1970, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_decode_cf_timestamp_days_with_date_only_epoch() {
        let decoded = decode_cf_timestamp("days since 2000-01-01", 31.5).unwrap();
        assert_eq!(decoded, Utc.with_ymd_and_hms(2000, 2, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_decode_cf_timestamp_rejects_unknown_units() {
        assert!(decode_cf_timestamp("fortnights since 2000-01-01", 1.0).is_none());
        assert!(decode_cf_timestamp("no epoch here", 1.0).is_none());
    }
}
