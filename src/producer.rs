//! Proposal deliverables bundle
//!
//! Writes `deliverables.json` (section titles, matrix file name, annexes)
//! and the compliance matrix CSV side by side.

use crate::error::{Error, Result};
use crate::requirements::{compliance_matrix_csv, Requirement};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const BUNDLE_FILE: &str = "deliverables.json";
pub const MATRIX_FILE: &str = "compliance_matrix.csv";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deliverables {
    pub sections: Vec<String>,
    pub matrix: String,
    pub annexes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageResult {
    pub bundle: PathBuf,
    pub matrix: PathBuf,
}

pub fn package(
    out_dir: &Path,
    sections: &[String],
    requirements: &[Requirement],
    annexes: &[String],
) -> Result<PackageResult> {
    fs::create_dir_all(out_dir).map_err(|e| Error::create_dir(out_dir, e))?;

    let bundle = Deliverables {
        sections: sections.to_vec(),
        matrix: MATRIX_FILE.to_string(),
        annexes: annexes.to_vec(),
    };
    let bundle_path = out_dir.join(BUNDLE_FILE);
    let json = serde_json::to_string_pretty(&bundle).map_err(|e| Error::parse(BUNDLE_FILE, e))?;
    fs::write(&bundle_path, json).map_err(|e| Error::write(&bundle_path, e))?;

    let matrix_path = out_dir.join(MATRIX_FILE);
    fs::write(&matrix_path, compliance_matrix_csv(requirements))
        .map_err(|e| Error::write(&matrix_path, e))?;

    info!(
        "Packaged {} sections and {} requirements into {}",
        sections.len(),
        requirements.len(),
        out_dir.display()
    );

    Ok(PackageResult {
        bundle: bundle_path,
        matrix: matrix_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::extract;
    use tempfile::TempDir;

    #[test]
    fn test_package_writes_bundle_and_matrix() {
        let tmp = TempDir::new().unwrap();
        let reqs = extract("Vendors shall attend. Staff will travel.");
        let result = package(
            tmp.path(),
            &["Technical Approach".to_string(), "Pricing".to_string()],
            &reqs,
            &["annex-a.pdf".to_string()],
        )
        .unwrap();

        let bundle: Deliverables =
            serde_json::from_str(&fs::read_to_string(&result.bundle).unwrap()).unwrap();
        assert_eq!(bundle.sections, vec!["Technical Approach", "Pricing"]);
        assert_eq!(bundle.matrix, "compliance_matrix.csv");
        assert_eq!(bundle.annexes, vec!["annex-a.pdf"]);

        let csv = fs::read_to_string(&result.matrix).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.contains("REQ-0002,should"));
    }
}
