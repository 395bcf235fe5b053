//! RFP ingestion
//!
//! Input is plain text with pages separated by form feeds, the layout
//! `pdftotext` produces.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

const PAGE_BREAK: char = '\x0c';

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RfpDocument {
    /// Page texts in order
    pub sections: Vec<String>,
    /// Full text, pages joined by newlines
    pub instructions: String,
    /// Evaluation factors text; not split out yet
    pub eval_factors: String,
    /// 1-based page number to character count
    pub page_map: BTreeMap<usize, usize>,
}

impl RfpDocument {
    pub fn from_text(text: &str) -> Self {
        let mut sections: Vec<String> = text.split(PAGE_BREAK).map(str::to_string).collect();
        // a trailing form feed terminates the last page rather than opening a new one
        if sections.len() > 1 && sections.last().is_some_and(|p| p.trim().is_empty()) {
            sections.pop();
        }

        let page_map = sections
            .iter()
            .enumerate()
            .map(|(i, page)| (i + 1, page.chars().count()))
            .collect();

        Self {
            instructions: sections.join("\n"),
            eval_factors: String::new(),
            page_map,
            sections,
        }
    }

    pub fn page_count(&self) -> usize {
        self.sections.len()
    }
}

/// Read an RFP text file
pub fn ingest(path: &Path) -> Result<RfpDocument> {
    let text = fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
    let doc = RfpDocument::from_text(&text);
    debug!("Ingested {} ({} pages)", path.display(), doc.page_count());
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_pages() {
        let doc = RfpDocument::from_text("page one\x0cpage two has more\x0c");
        assert_eq!(doc.sections, vec!["page one", "page two has more"]);
        assert_eq!(doc.instructions, "page one\npage two has more");
        assert_eq!(doc.page_map.get(&1), Some(&8));
        assert_eq!(doc.page_map.get(&2), Some(&17));
        assert_eq!(doc.eval_factors, "");
    }

    #[test]
    fn test_single_page() {
        let doc = RfpDocument::from_text("no breaks here");
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.instructions, "no breaks here");
    }

    #[test]
    fn test_empty_text_is_one_empty_page() {
        let doc = RfpDocument::from_text("");
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.page_map.get(&1), Some(&0));
    }

    #[test]
    fn test_ingest_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("rfp.txt");
        fs::write(&path, "A\x0cB\x0cC").unwrap();
        let doc = ingest(&path).unwrap();
        assert_eq!(doc.page_count(), 3);
    }

    #[test]
    fn test_ingest_missing_file() {
        let err = ingest(Path::new("/nonexistent/rfp.txt")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
