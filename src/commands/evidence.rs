use super::parse_filters;
use crate::evidence::EvidenceStore;
use anyhow::{Context, Result};
use std::path::Path;

pub fn search_command(dir: &Path, filters: &[String]) -> Result<()> {
    let store = EvidenceStore::load(dir)
        .with_context(|| format!("Failed to load evidence from {}", dir.display()))?;
    let filters = parse_filters(filters)?;
    let found = store.get(&filters);

    println!("{}", serde_json::to_string_pretty(&found)?);
    eprintln!(
        "{} case studies, {} bios, {} certifications",
        found.case_studies.len(),
        found.bios.len(),
        found.certs.len()
    );
    Ok(())
}
