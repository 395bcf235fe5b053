//! Brand kit store
//!
//! A brand kit is a named bundle of colours, fonts, an optional logo and
//! an optional watermark. Kits live in a single JSON object keyed by name.

use crate::error::{BrandKitError, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_FONT: &str = "Inter";

/// Maximum edit distance for "did you mean" suggestions
const SUGGESTION_DISTANCE: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrandKit {
    pub colors: Colors,
    pub fonts: Fonts,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub watermark: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Colors {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fonts {
    #[serde(default = "default_font")]
    pub headline: String,
    #[serde(default = "default_font")]
    pub body: String,
}

fn default_font() -> String {
    DEFAULT_FONT.to_string()
}

impl Default for Fonts {
    fn default() -> Self {
        Self {
            headline: default_font(),
            body: default_font(),
        }
    }
}

impl BrandKit {
    /// Create a kit with the three colours and default fonts
    pub fn new(
        primary: impl Into<String>,
        secondary: impl Into<String>,
        accent: impl Into<String>,
    ) -> Self {
        Self {
            colors: Colors {
                primary: primary.into(),
                secondary: secondary.into(),
                accent: accent.into(),
            },
            fonts: Fonts::default(),
            logo: None,
            watermark: None,
        }
    }

    pub fn with_fonts(mut self, headline: impl Into<String>, body: impl Into<String>) -> Self {
        self.fonts = Fonts {
            headline: headline.into(),
            body: body.into(),
        };
        self
    }

    pub fn with_logo(mut self, logo: Option<String>) -> Self {
        self.logo = logo;
        self
    }

    pub fn with_watermark(mut self, watermark: Option<String>) -> Self {
        self.watermark = watermark;
        self
    }
}

/// JSON-file-backed collection of brand kits
#[derive(Debug, Clone)]
pub struct BrandKitStore {
    path: PathBuf,
    kits: BTreeMap<String, BrandKit>,
}

impl BrandKitStore {
    /// Load the store, returns an empty store if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        let kits = if path.exists() {
            let contents = fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
            serde_json::from_str(&contents).map_err(|e| {
                Error::BrandKit(BrandKitError::CorruptedStore {
                    path: path.display().to_string(),
                    details: e.to_string(),
                })
            })?
        } else {
            BTreeMap::new()
        };

        debug!("Loaded {} brand kits from {}", kits.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            kits,
        })
    }

    /// Save the store atomically: write to temp file, then rename
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::create_dir(parent, e))?;
        }

        let contents = serde_json::to_string_pretty(&self.kits)
            .map_err(|e| Error::parse("brand kit store", e))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, contents).map_err(|e| Error::write(&temp_path, e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| Error::write(&self.path, e))?;
        Ok(())
    }

    /// Insert or overwrite a kit, then persist
    pub fn create(&mut self, name: &str, kit: BrandKit) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BrandKitError::InvalidName(name.to_string()).into());
        }

        if self.kits.insert(name.to_string(), kit).is_some() {
            info!("Overwriting brand kit '{}'", name);
        }
        self.save()
    }

    pub fn get(&self, name: &str) -> Result<&BrandKit> {
        self.kits.get(name).ok_or_else(|| self.not_found(name))
    }

    /// Kits in name order
    pub fn list(&self) -> Vec<(&str, &BrandKit)> {
        self.kits.iter().map(|(name, kit)| (name.as_str(), kit)).collect()
    }

    /// Remove a kit, then persist
    pub fn delete(&mut self, name: &str) -> Result<BrandKit> {
        let kit = self.kits.remove(name).ok_or_else(|| self.not_found(name))?;
        self.save()?;
        Ok(kit)
    }

    pub fn is_empty(&self) -> bool {
        self.kits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.kits.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn not_found(&self, name: &str) -> Error {
        Error::BrandKit(BrandKitError::NotFound {
            name: name.to_string(),
            suggestion: self.closest(name),
        })
    }

    fn closest(&self, name: &str) -> Option<String> {
        self.kits
            .keys()
            .map(|candidate| (edit_distance::edit_distance(name, candidate), candidate))
            .filter(|(distance, _)| *distance <= SUGGESTION_DISTANCE)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, candidate)| candidate.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(tmp: &TempDir) -> BrandKitStore {
        BrandKitStore::load(&tmp.path().join("brand_kits.json")).unwrap()
    }

    #[test]
    fn test_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = store_in(&tmp);
        assert!(store.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_create_writes_expected_json() {
        let tmp = TempDir::new().unwrap();
        let mut store = store_in(&tmp);

        store
            .create("acme", BrandKit::new("#112233", "#445566", "#778899"))
            .unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["acme"]["colors"]["primary"], "#112233");
        assert_eq!(json["acme"]["fonts"]["headline"], "Inter");
        assert_eq!(json["acme"]["fonts"]["body"], "Inter");
        assert!(json["acme"]["logo"].is_null());
        assert!(json["acme"]["watermark"].is_null());
        assert!(raw.contains("\n  \"acme\""));
    }

    #[test]
    fn test_create_overwrites() {
        let tmp = TempDir::new().unwrap();
        let mut store = store_in(&tmp);
        store.create("acme", BrandKit::new("#000", "#111", "#222")).unwrap();
        store.create("acme", BrandKit::new("#fff", "#eee", "#ddd")).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("acme").unwrap().colors.primary, "#fff");
    }

    #[test]
    fn test_blank_name_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut store = store_in(&tmp);
        let err = store.create("   ", BrandKit::new("#000", "#111", "#222")).unwrap_err();
        assert!(matches!(err, Error::BrandKit(BrandKitError::InvalidName(_))));
    }

    #[test]
    fn test_delete_unknown_suggests_closest() {
        let tmp = TempDir::new().unwrap();
        let mut store = store_in(&tmp);
        store.create("acme-co", BrandKit::new("#000", "#111", "#222")).unwrap();
        store.create("zenith", BrandKit::new("#000", "#111", "#222")).unwrap();

        let err = store.delete("acme").unwrap_err();
        match err {
            Error::BrandKit(BrandKitError::NotFound { suggestion, .. }) => {
                assert_eq!(suggestion.as_deref(), Some("acme-co"));
            }
            other => panic!("unexpected error: {}", other),
        }

        let err = store.delete("completely-different").unwrap_err();
        assert!(matches!(
            err,
            Error::BrandKit(BrandKitError::NotFound { suggestion: None, .. })
        ));
    }

    #[test]
    fn test_corrupted_store() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("brand_kits.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let err = BrandKitStore::load(&path).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_builder_helpers() {
        let kit = BrandKit::new("#1", "#2", "#3")
            .with_fonts("Poppins", "Lato")
            .with_logo(Some("logo.png".to_string()))
            .with_watermark(Some("ACME".to_string()));
        assert_eq!(kit.fonts.headline, "Poppins");
        assert_eq!(kit.fonts.body, "Lato");
        assert_eq!(kit.logo.as_deref(), Some("logo.png"));
        assert_eq!(kit.watermark.as_deref(), Some("ACME"));
    }
}
