//! Persistence of catalogs keyed by template filename.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{LayoutCatalog, LayoutDescriptor};

const SIDECAR_SUFFIX: &str = ".schema.json";

/// A catalog as persisted, stamped with the template it describes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredCatalog {
    pub filename: String,
    /// Unix seconds of the last write.
    #[serde(default)]
    pub saved_at: u64,
    #[serde(flatten)]
    pub catalog: LayoutCatalog,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StoredSummary {
    pub filename: String,
    pub saved_at: u64,
    pub total_layouts: usize,
    pub template_exists: bool,
}

/// Key → catalog document store with last-write-wins semantics. Callers
/// serialize writers for the same key.
pub trait CatalogStore {
    fn load(&self, key: &str) -> Result<Option<StoredCatalog>, Error>;
    fn save(&self, key: &str, catalog: &LayoutCatalog) -> Result<StoredCatalog, Error>;
    /// Replace only the layout list of an existing record.
    fn update_layouts(
        &self,
        key: &str,
        layouts: Vec<LayoutDescriptor>,
    ) -> Result<Option<StoredCatalog>, Error>;
    /// Every stored record, newest first.
    fn list(&self) -> Result<Vec<StoredSummary>, Error>;
}

/// One `<stem>.schema.json` file per template, next to the templates.
#[derive(Clone, Debug)]
pub struct SidecarStore {
    dir: PathBuf,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl SidecarStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Sidecar path for a template filename. Only the final path component
    /// of `key` is used.
    pub fn sidecar_path(&self, key: &str) -> PathBuf {
        let stem = Path::new(key)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.dir.join(format!("{stem}{SIDECAR_SUFFIX}"))
    }

    fn write(&self, key: &str, record: &StoredCatalog) -> Result<(), Error> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.sidecar_path(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(record)?)?;
        std::fs::rename(&tmp, &path)?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }
}

impl CatalogStore for SidecarStore {
    fn load(&self, key: &str) -> Result<Option<StoredCatalog>, Error> {
        let path = self.sidecar_path(key);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&data)?))
    }

    fn save(&self, key: &str, catalog: &LayoutCatalog) -> Result<StoredCatalog, Error> {
        let filename = Path::new(key)
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| key.to_string());
        let record = StoredCatalog {
            filename,
            saved_at: now_secs(),
            catalog: catalog.clone(),
        };
        self.write(key, &record)?;
        Ok(record)
    }

    fn update_layouts(
        &self,
        key: &str,
        layouts: Vec<LayoutDescriptor>,
    ) -> Result<Option<StoredCatalog>, Error> {
        let Some(mut record) = self.load(key)? else {
            return Ok(None);
        };
        record.catalog.layouts = layouts;
        record.saved_at = now_secs();
        self.write(key, &record)?;
        Ok(Some(record))
    }

    fn list(&self) -> Result<Vec<StoredSummary>, Error> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_sidecar = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(SIDECAR_SUFFIX));
            if !is_sidecar {
                continue;
            }
            let record: StoredCatalog = match std::fs::read(&path)
                .map_err(Error::from)
                .and_then(|data| serde_json::from_slice(&data).map_err(Error::from))
            {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("Skipping unreadable catalog {}: {e}", path.display());
                    continue;
                }
            };
            records.push(StoredSummary {
                template_exists: self.dir.join(&record.filename).is_file(),
                total_layouts: record.catalog.layouts.len(),
                filename: record.filename,
                saved_at: record.saved_at,
            });
        }
        records.sort_by(|a, b| {
            b.saved_at
                .cmp(&a.saved_at)
                .then_with(|| a.filename.cmp(&b.filename))
        });
        Ok(records)
    }
}
