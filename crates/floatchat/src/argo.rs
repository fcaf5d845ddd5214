//! NetCDF metadata extraction for ARGO float files
//!
//! Pulls the handful of summary fields the assistant works from (WMO id,
//! project name, temporal range, geographic bounding box) and renders
//! them into the fixed-format text blocks used by the similarity index
//! and by upload session context.

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, NaiveDate};
use std::io::Write;
use std::path::Path;

/// JULD values at or above this are fill markers, not dates.
const JULD_FILL_THRESHOLD: f64 = 500_000.0;

/// Summary fields extracted from a single float file. The range fields
/// are pre-formatted strings because they only ever feed text templates.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatMetadata {
  pub wmo_id: i64,
  pub project_name: String,
  pub date_range: String,
  pub latitude_range: String,
  pub longitude_range: String,
}

impl FloatMetadata {
  /// Render the document stored in the similarity index for this float.
  pub fn information_document(&self) -> String {
    format!(
      "--- ARGO Float Information Document ---\n\
       WMO ID: {}\n\
       Project Name: {}\n\
       Data Collection Period: {}\n\
       Geographic Area of Operation: Latitude Range [{}], Longitude Range [{}]\n\
       Available Parameters: Temperature, Salinity, Pressure.",
      self.wmo_id, self.project_name, self.date_range, self.latitude_range, self.longitude_range
    )
  }

  /// Render the session context block returned to upload clients. The
  /// client resends this verbatim on subsequent chat turns.
  pub fn session_context(&self) -> String {
    format!(
      "--- User Uploaded File Context ---\n\
       WMO ID: {}\n\
       Project Name: {}\n\
       Data Collection Period: {}\n\
       Geographic Area: Latitude [{}], Longitude [{}]",
      self.wmo_id, self.project_name, self.date_range, self.latitude_range, self.longitude_range
    )
  }
}

/// Extract float metadata from a NetCDF file on disk.
pub fn extract_metadata(path: &Path) -> Result<FloatMetadata> {
  let file =
    netcdf::open(path).with_context(|| format!("failed to open {}", path.display()))?;
  extract_from_file(&file)
}

/// Extract float metadata from uploaded NetCDF bytes.
///
/// libnetcdf only opens by path, so the bytes are spooled through a
/// scratch file that is deleted when the handle drops. Nothing is
/// persisted and no path escapes this function.
pub fn extract_metadata_from_bytes(bytes: &[u8]) -> Result<FloatMetadata> {
  let mut scratch =
    tempfile::NamedTempFile::new().context("failed to create scratch file")?;
  scratch.write_all(bytes).context("failed to spool uploaded bytes")?;
  extract_metadata(scratch.path())
}

fn extract_from_file(file: &netcdf::File) -> Result<FloatMetadata> {
  let wmo_id = read_wmo_id(file)?;
  let project_name = read_project_name(file);

  let juld: Vec<f64> = read_finite_values(file, "JULD")?
    .into_iter()
    .filter(|&v| v < JULD_FILL_THRESHOLD)
    .collect();
  if juld.is_empty() {
    return Err(anyhow!("JULD contains no usable timestamps"));
  }
  let (first, last) = bounds(&juld);
  let date_range = format!("{} to {}", juld_to_date(first)?, juld_to_date(last)?);

  let (min_lat, max_lat) = bounds(&read_finite_values(file, "LATITUDE")?);
  let (min_lon, max_lon) = bounds(&read_finite_values(file, "LONGITUDE")?);

  Ok(FloatMetadata {
    wmo_id,
    project_name,
    date_range,
    latitude_range: format!("{min_lat:.2} to {max_lat:.2}"),
    longitude_range: format!("{min_lon:.2} to {max_lon:.2}"),
  })
}

/// PLATFORM_NUMBER is a character array in archived ARGO files but plain
/// numeric in some exports; accept both and take the first profile.
fn read_wmo_id(file: &netcdf::File) -> Result<i64> {
  let var = file
    .variable("PLATFORM_NUMBER")
    .ok_or_else(|| anyhow!("variable 'PLATFORM_NUMBER' not found"))?;

  if let Ok(values) = var.get_values::<i64, _>(..) {
    if let Some(&first) = values.iter().find(|&&v| v != 0) {
      return Ok(first);
    }
  }

  let raw: Vec<u8> = var.get_values(..).context("failed to read PLATFORM_NUMBER")?;
  let digits: String = raw
    .iter()
    .map(|&b| b as char)
    .skip_while(|c| !c.is_ascii_digit())
    .take_while(|c| c.is_ascii_digit())
    .collect();
  digits
    .parse()
    .map_err(|_| anyhow!("PLATFORM_NUMBER does not contain a numeric WMO id"))
}

fn read_project_name(file: &netcdf::File) -> String {
  match file.attribute("PROJECT_NAME").and_then(|attr| attr.value().ok()) {
    Some(netcdf::AttributeValue::Str(s)) => s.trim().to_string(),
    Some(netcdf::AttributeValue::Strs(v)) if !v.is_empty() => v[0].trim().to_string(),
    _ => "N/A".to_string(),
  }
}

fn read_finite_values(file: &netcdf::File, name: &str) -> Result<Vec<f64>> {
  let var =
    file.variable(name).ok_or_else(|| anyhow!("variable '{name}' not found"))?;
  let fill = fill_value(&var);
  let values: Vec<f64> =
    var.get_values(..).with_context(|| format!("failed to read {name}"))?;

  let finite: Vec<f64> = values
    .into_iter()
    .filter(|v| v.is_finite())
    .filter(|v| fill != Some(*v))
    .collect();
  if finite.is_empty() {
    return Err(anyhow!("variable '{name}' has no usable values"));
  }
  Ok(finite)
}

/// The variable's declared `_FillValue`, if any. Fill markers are
/// finite numbers (99999.0 for Argo positions), so they must be masked
/// before taking bounds.
fn fill_value(var: &netcdf::Variable) -> Option<f64> {
  match var.attribute("_FillValue")?.value().ok()? {
    netcdf::AttributeValue::Double(v) => Some(v),
    netcdf::AttributeValue::Float(v) => Some(v as f64),
    netcdf::AttributeValue::Doubles(v) => v.first().copied(),
    netcdf::AttributeValue::Floats(v) => v.first().map(|&f| f as f64),
    _ => None,
  }
}

fn bounds(values: &[f64]) -> (f64, f64) {
  values
    .iter()
    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Convert a JULD day offset (days since 1950-01-01) to `YYYY-MM-DD`.
fn juld_to_date(days: f64) -> Result<String> {
  let epoch =
    NaiveDate::from_ymd_opt(1950, 1, 1).ok_or_else(|| anyhow!("invalid ARGO epoch"))?;
  let date = epoch
    .checked_add_signed(Duration::days(days.floor() as i64))
    .ok_or_else(|| anyhow!("JULD value {days} is out of range"))?;
  Ok(date.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn write_test_float(path: &Path, wmo_id: i64) {
    let mut file = netcdf::create(path).unwrap();
    file.add_attribute("PROJECT_NAME", "ARGO TEST  ").unwrap();
    file.add_dimension("N_PROF", 4).unwrap();

    let mut juld = file.add_variable::<f64>("JULD", &["N_PROF"]).unwrap();
    juld.put_values(&[20000.0, 20010.5, 999_999.0, 20005.0], ..).unwrap();

    // Missing positions carry the declared fill marker, like real
    // archive files.
    let mut lat = file.add_variable::<f64>("LATITUDE", &["N_PROF"]).unwrap();
    lat.put_attribute("_FillValue", 99999.0f64).unwrap();
    lat.put_values(&[-12.345, -10.0, -11.5, 99999.0], ..).unwrap();

    let mut lon = file.add_variable::<f64>("LONGITUDE", &["N_PROF"]).unwrap();
    lon.put_attribute("_FillValue", 99999.0f64).unwrap();
    lon.put_values(&[67.891, 70.25, 68.0, 99999.0], ..).unwrap();

    let mut platform = file.add_variable::<i64>("PLATFORM_NUMBER", &["N_PROF"]).unwrap();
    platform.put_values(&[wmo_id, wmo_id, wmo_id, wmo_id], ..).unwrap();
  }

  #[test]
  fn extracts_metadata_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("float.nc");
    write_test_float(&path, 1900121);

    let metadata = extract_metadata(&path).unwrap();
    assert_eq!(metadata.wmo_id, 1900121);
    assert_eq!(metadata.project_name, "ARGO TEST");
    // 20000 days after 1950-01-01 is 2004-10-04; the fill value is ignored
    assert_eq!(metadata.date_range, "2004-10-04 to 2004-10-14");
    // The 99999.0 fill entries never reach the bounding box.
    assert_eq!(metadata.latitude_range, "-12.35 to -10.00");
    assert_eq!(metadata.longitude_range, "67.89 to 70.25");
  }

  #[test]
  fn renders_information_document() {
    let metadata = FloatMetadata {
      wmo_id: 1900121,
      project_name: "ARGO INDIA".to_string(),
      date_range: "2004-10-04 to 2004-10-14".to_string(),
      latitude_range: "-12.35 to -10.00".to_string(),
      longitude_range: "67.89 to 70.25".to_string(),
    };

    let document = metadata.information_document();
    assert!(document.starts_with("--- ARGO Float Information Document ---\n"));
    assert!(document.contains("WMO ID: 1900121\n"));
    assert!(document.contains("Project Name: ARGO INDIA\n"));
    assert!(document.contains("Data Collection Period: 2004-10-04 to 2004-10-14\n"));
    assert!(document.contains(
      "Geographic Area of Operation: Latitude Range [-12.35 to -10.00], Longitude Range [67.89 to 70.25]\n"
    ));
    assert!(document.ends_with("Available Parameters: Temperature, Salinity, Pressure."));
  }

  #[test]
  fn renders_session_context() {
    let metadata = FloatMetadata {
      wmo_id: 2902746,
      project_name: "INCOIS".to_string(),
      date_range: "2018-01-01 to 2019-06-30".to_string(),
      latitude_range: "5.00 to 15.00".to_string(),
      longitude_range: "80.00 to 90.00".to_string(),
    };

    let context = metadata.session_context();
    assert!(context.starts_with("--- User Uploaded File Context ---\n"));
    assert!(context.contains("WMO ID: 2902746\n"));
    assert!(context.ends_with("Geographic Area: Latitude [5.00 to 15.00], Longitude [80.00 to 90.00]"));
  }

  #[test]
  fn juld_epoch_is_1950() {
    assert_eq!(juld_to_date(0.0).unwrap(), "1950-01-01");
    assert_eq!(juld_to_date(365.0).unwrap(), "1951-01-01");
  }

  #[test]
  fn rejects_non_netcdf_bytes() {
    let err = extract_metadata_from_bytes(b"this is not a netcdf file").unwrap_err();
    assert!(err.to_string().contains("failed to open"));
  }

  #[test]
  fn missing_variable_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.nc");
    {
      let mut file = netcdf::create(&path).unwrap();
      file.add_dimension("N_PROF", 1).unwrap();
    }

    let err = extract_metadata(&path).unwrap_err();
    assert!(err.to_string().contains("PLATFORM_NUMBER"));
  }
}
