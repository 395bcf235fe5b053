use super::spinner;
use crate::config::Config;
use crate::google::{self, UploadResult};
use crate::image::{AspectRatio, ImageClient, ImageRequest};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

pub async fn image_command(
    config: &Config,
    prompt: String,
    filename: String,
    aspect_ratio: &str,
    upload: Option<&str>,
) -> Result<()> {
    let client = ImageClient::from_config(config)?;
    let request = ImageRequest {
        prompt,
        aspect_ratio: AspectRatio::parse_lenient(aspect_ratio),
        filename,
    };

    let pb = spinner(&format!("Generating {} image...", request.aspect_ratio));
    let result = client.generate(&request).await;
    pb.finish_and_clear();
    let mut image = result.context("Image generation failed")?;

    if let Some(folder) = upload {
        let pb = spinner(&format!("Uploading to Drive ({})...", folder));
        let uploaded = upload_image(config, &image.image_path, folder).await;
        pb.finish_and_clear();
        image.google_drive_url = Some(uploaded.context("Drive upload failed")?.web_view_link);
    }

    println!("{}", serde_json::to_string_pretty(&image)?);
    println!(
        "{} Image saved to {} (~${:.2})",
        "✓".green(),
        image.image_path.display(),
        image.cost_usd
    );
    Ok(())
}

async fn upload_image(config: &Config, path: &Path, folder: &str) -> crate::Result<UploadResult> {
    let mut drive = google::drive_client(config)?;
    drive.upload(path, folder, None).await
}
