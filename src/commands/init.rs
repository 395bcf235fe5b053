use crate::config::{Config, CONFIG_FILE};
use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;

/// Credential and environment files that must never be committed
const IGNORED: &[&str] = &["token.json", "gmail_token.json", ".env"];

pub fn init_command() -> Result<()> {
    let config_path = Path::new(CONFIG_FILE);

    if config_path.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first if you want to reinitialize.",
            CONFIG_FILE
        );
    }

    let config = Config::default();
    let dirs = [
        config.images_dir(),
        config.presentations_dir(),
        config.diagrams_dir(),
        config.paths.memory.clone(),
        config.paths.evidence.clone(),
    ];
    for dir in &dirs {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {} directory", dir.display()))?;
        println!("  Created {}/", dir.display());
    }

    fs::write(config_path, config.to_toml()?)
        .with_context(|| format!("Failed to create {}", CONFIG_FILE))?;
    println!("  Created {}", CONFIG_FILE);

    update_gitignore(Path::new(".gitignore"))?;

    println!("\n{} Workspace initialized!", "✓".green());
    println!("Set OPENAI_API_KEY (and PINECONE_API_KEY for retrieval) in .env to get started.");

    Ok(())
}

fn update_gitignore(path: &Path) -> Result<()> {
    let existing = if path.exists() {
        fs::read_to_string(path).context("Failed to read .gitignore")?
    } else {
        String::new()
    };

    let missing: Vec<&str> = IGNORED
        .iter()
        .copied()
        .filter(|entry| !existing.lines().any(|line| line.trim() == *entry))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    let mut content = existing;
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    for entry in &missing {
        content.push_str(entry);
        content.push('\n');
    }
    fs::write(path, content).context("Failed to update .gitignore")?;
    println!("  Added {} to .gitignore", missing.join(", "));
    Ok(())
}
