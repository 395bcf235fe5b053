//! Proposal evidence store: case studies, staff bios, certifications

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

pub type EvidenceItem = Map<String, Value>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EvidenceStore {
    #[serde(default)]
    pub case_studies: Vec<EvidenceItem>,
    #[serde(default)]
    pub bios: Vec<EvidenceItem>,
    #[serde(default)]
    pub certs: Vec<EvidenceItem>,
}

impl EvidenceStore {
    /// Load every `*.json` file under `dir`, routing by file stem
    ///
    /// `case_studies*.json`, `bios*.json` and `certs*.json` feed their
    /// collections; other files are ignored. A missing directory is empty.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut store = Self::default();
        if !dir.exists() {
            return Ok(store);
        }

        for entry in WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            let target = if stem.starts_with("case_studies") {
                &mut store.case_studies
            } else if stem.starts_with("bios") {
                &mut store.bios
            } else if stem.starts_with("certs") {
                &mut store.certs
            } else {
                continue;
            };

            let contents = fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
            let items: Vec<EvidenceItem> = serde_json::from_str(&contents)
                .map_err(|e| Error::parse(path.display().to_string(), e))?;
            debug!("Loaded {} evidence items from {}", items.len(), path.display());
            target.extend(items);
        }

        Ok(store)
    }

    /// Items whose every filtered field contains the filter value, case-insensitively
    pub fn get(&self, filters: &BTreeMap<String, String>) -> EvidenceStore {
        let pick = |items: &[EvidenceItem]| -> Vec<EvidenceItem> {
            items
                .iter()
                .filter(|item| matches_filters(item, filters))
                .cloned()
                .collect()
        };

        EvidenceStore {
            case_studies: pick(&self.case_studies),
            bios: pick(&self.bios),
            certs: pick(&self.certs),
        }
    }

    pub fn len(&self) -> usize {
        self.case_studies.len() + self.bios.len() + self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn matches_filters(item: &EvidenceItem, filters: &BTreeMap<String, String>) -> bool {
    filters.iter().all(|(key, wanted)| {
        let actual = match item.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        actual.to_lowercase().contains(&wanted.to_lowercase())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn item(value: Value) -> EvidenceItem {
        value.as_object().unwrap().clone()
    }

    fn filters(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_filter_case_insensitive_substring() {
        let store = EvidenceStore {
            certs: vec![
                item(json!({"type": "SOC2", "scope": "Type I", "date": "2025-09-01"})),
                item(json!({"type": "ISO 27001", "scope": "Full"})),
            ],
            ..Default::default()
        };

        let hits = store.get(&filters(&[("type", "soc")]));
        assert_eq!(hits.certs.len(), 1);
        assert_eq!(hits.certs[0]["scope"], "Type I");
    }

    #[test]
    fn test_every_filter_must_match() {
        let store = EvidenceStore {
            bios: vec![
                item(json!({"name": "Ada", "role": "Architect"})),
                item(json!({"name": "Alan", "role": "Analyst"})),
            ],
            ..Default::default()
        };
        let hits = store.get(&filters(&[("name", "a"), ("role", "arch")]));
        assert_eq!(hits.bios.len(), 1);
        assert_eq!(hits.bios[0]["name"], "Ada");
    }

    #[test]
    fn test_missing_key_only_matches_empty_filter() {
        let store = EvidenceStore {
            case_studies: vec![item(json!({"title": "Portal rebuild"}))],
            ..Default::default()
        };
        assert!(store.get(&filters(&[("client", "state")])).is_empty());
        assert_eq!(store.get(&filters(&[("client", "")])).len(), 1);
    }

    #[test]
    fn test_no_filters_returns_everything() {
        let store = EvidenceStore {
            case_studies: vec![item(json!({"year": 2024}))],
            bios: vec![item(json!({"name": "Grace"}))],
            ..Default::default()
        };
        assert_eq!(store.get(&BTreeMap::new()).len(), 2);
        assert_eq!(store.get(&filters(&[("year", "202")])).case_studies.len(), 1);
    }

    #[test]
    fn test_load_routes_files_by_stem() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("certs.json"), r#"[{"type": "SOC2"}]"#).unwrap();
        fs::write(tmp.path().join("bios.json"), r#"[{"name": "Ada"}, {"name": "Bo"}]"#).unwrap();
        fs::write(tmp.path().join("notes.json"), r#"{"ignored": true}"#).unwrap();

        let store = EvidenceStore::load(tmp.path()).unwrap();
        assert_eq!(store.certs.len(), 1);
        assert_eq!(store.bios.len(), 2);
        assert!(store.case_studies.is_empty());
    }

    #[test]
    fn test_load_missing_dir_is_empty() {
        let store = EvidenceStore::load(Path::new("/nonexistent/evidence")).unwrap();
        assert!(store.is_empty());
    }
}
