use super::spinner;
use crate::config::Config;
use crate::google;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

/// Create the Drive folder layout and print the stored ids
pub async fn setup_command(config: &Config) -> Result<()> {
    let mut drive = google::drive_client(config).context("Failed to set up Drive client")?;

    let pb = spinner("Creating Drive folders...");
    let result = drive.ensure_folders().await.cloned();
    pb.finish_and_clear();
    let folders = result.context("Failed to create Drive folders")?;

    println!(
        "{} Drive folders ready (root {})",
        "✓".green(),
        folders.root_folder_id.as_deref().unwrap_or("-")
    );
    for (folder_type, id) in &folders.folders {
        println!("  {:<14} {}", folder_type, id.as_deref().unwrap_or("-"));
    }
    println!("Saved to {}", config.drive_config_path().display());
    Ok(())
}

pub async fn upload_command(
    config: &Config,
    path: &Path,
    folder: &str,
    description: Option<&str>,
) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    let mut drive = google::drive_client(config).context("Failed to set up Drive client")?;

    let pb = spinner(&format!("Uploading {}...", path.display()));
    let result = drive.upload(path, folder, description).await;
    pb.finish_and_clear();
    let uploaded = result.context("Drive upload failed")?;

    println!("{} Uploaded {}", "✓".green(), uploaded.file_name);
    println!("  {}", uploaded.web_view_link);
    Ok(())
}
