//! Offline ingestion of NetCDF float files into the similarity index
//!
//! Scans a directory for `.nc` files, extracts metadata from each,
//! embeds the rendered information document, and appends it to the
//! index. Unreadable files are logged and skipped; one bad file never
//! aborts the run.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::argo;
use crate::server::services::embeddings;
use crate::server::services::index::FloatIndexService;

/// A float's rendered information document, ready to embed and store.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatDocument {
  pub source: String,
  pub wmo_id: i64,
  pub document: String,
}

/// Ingest every readable `.nc` file under `data_dir` into the index at
/// `index_dir`. An empty or missing data directory leaves the index
/// untouched.
pub async fn run(data_dir: &Path, index_dir: PathBuf) -> Result<()> {
  if !data_dir.is_dir() {
    warn!("data directory {} does not exist; nothing to ingest", data_dir.display());
    return Ok(());
  }

  let documents = collect_documents(data_dir)?;
  if documents.is_empty() {
    warn!("no readable float files found; leaving the index untouched");
    return Ok(());
  }

  let index = FloatIndexService::new(index_dir).await?;
  for document in &documents {
    let embedding = embeddings::create_embedding(&document.document).await?;
    index.store_document(document, &embedding).await?;
    info!("ingested float {} from {}", document.wmo_id, document.source);
  }

  let total = index.count_documents().await?;
  info!("ingestion complete: {} documents in the index", total);
  Ok(())
}

/// Extract a document from every readable `.nc` file in `data_dir`.
/// Files that fail extraction are logged and skipped.
pub fn collect_documents(data_dir: &Path) -> Result<Vec<FloatDocument>> {
  let mut documents = Vec::new();
  for path in netcdf_files(data_dir)? {
    match argo::extract_metadata(&path) {
      Ok(metadata) => documents.push(FloatDocument {
        source: file_name(&path),
        wmo_id: metadata.wmo_id,
        document: metadata.information_document(),
      }),
      Err(e) => warn!("skipping {}: {e:#}", path.display()),
    }
  }
  Ok(documents)
}

/// Sorted `.nc` paths directly under `data_dir`.
fn netcdf_files(data_dir: &Path) -> Result<Vec<PathBuf>> {
  let entries = std::fs::read_dir(data_dir)
    .with_context(|| format!("failed to read {}", data_dir.display()))?;

  let mut paths: Vec<PathBuf> = entries
    .filter_map(|entry| entry.ok())
    .map(|entry| entry.path())
    .filter(|path| path.extension().is_some_and(|ext| ext == "nc"))
    .collect();
  paths.sort();
  Ok(paths)
}

fn file_name(path: &Path) -> String {
  path
    .file_name()
    .map(|name| name.to_string_lossy().to_string())
    .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn write_test_float(path: &Path, wmo_id: i64) {
    let mut file = netcdf::create(path).unwrap();
    file.add_attribute("PROJECT_NAME", "ARGO TEST").unwrap();
    file.add_dimension("N_PROF", 2).unwrap();

    let mut juld = file.add_variable::<f64>("JULD", &["N_PROF"]).unwrap();
    juld.put_values(&[20000.0, 20010.5], ..).unwrap();

    let mut lat = file.add_variable::<f64>("LATITUDE", &["N_PROF"]).unwrap();
    lat.put_values(&[-12.345, -10.0], ..).unwrap();

    let mut lon = file.add_variable::<f64>("LONGITUDE", &["N_PROF"]).unwrap();
    lon.put_values(&[67.891, 70.25], ..).unwrap();

    let mut platform = file.add_variable::<i64>("PLATFORM_NUMBER", &["N_PROF"]).unwrap();
    platform.put_values(&[wmo_id, wmo_id], ..).unwrap();
  }

  #[test]
  fn collects_documents_and_skips_unreadable_files() {
    let dir = TempDir::new().unwrap();
    write_test_float(&dir.path().join("a.nc"), 1900121);
    write_test_float(&dir.path().join("b.nc"), 2902746);
    std::fs::write(dir.path().join("broken.nc"), b"not netcdf").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

    let documents = collect_documents(dir.path()).unwrap();
    assert_eq!(documents.len(), 2);
    // Sorted by file name.
    assert_eq!(documents[0].source, "a.nc");
    assert_eq!(documents[0].wmo_id, 1900121);
    assert!(documents[0].document.contains("WMO ID: 1900121"));
    assert_eq!(documents[1].source, "b.nc");
  }

  #[test]
  fn empty_directory_yields_no_documents() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("broken.nc"), b"not netcdf").unwrap();

    let documents = collect_documents(dir.path()).unwrap();
    assert!(documents.is_empty());
  }

  #[tokio::test]
  async fn missing_data_directory_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    let index_dir = dir.path().join("index");

    run(&missing, index_dir.clone()).await.unwrap();
    assert!(!index_dir.exists());
  }
}
