use crate::brand_kit::{BrandKit, BrandKitStore};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

pub struct CreateArgs {
    pub name: String,
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub headline_font: String,
    pub body_font: String,
    pub logo: Option<String>,
    pub watermark: Option<String>,
}

pub fn create_command(store_path: &Path, args: CreateArgs) -> Result<()> {
    let mut store = BrandKitStore::load(store_path).context("Failed to load brand kits")?;
    let kit = BrandKit::new(args.primary, args.secondary, args.accent)
        .with_fonts(args.headline_font, args.body_font)
        .with_logo(args.logo)
        .with_watermark(args.watermark);

    store.create(&args.name, kit)?;
    println!(
        "{} Brand kit '{}' saved to {}",
        "✓".green(),
        args.name.trim(),
        store.path().display()
    );
    Ok(())
}

pub fn list_command(store_path: &Path, json: bool) -> Result<()> {
    let store = BrandKitStore::load(store_path).context("Failed to load brand kits")?;

    if json {
        let kits: serde_json::Map<String, serde_json::Value> = store
            .list()
            .into_iter()
            .map(|(name, kit)| Ok((name.to_string(), serde_json::to_value(kit)?)))
            .collect::<Result<_, serde_json::Error>>()?;
        println!("{}", serde_json::to_string_pretty(&kits)?);
        return Ok(());
    }

    if store.is_empty() {
        println!("No brand kits found. Create one with 'ckit brand-kit create'.");
        return Ok(());
    }

    println!("Brand kits ({})", store.len());
    for (name, kit) in store.list() {
        println!();
        println!("  {}", name.bold());
        println!(
            "    colors: primary {}  secondary {}  accent {}",
            kit.colors.primary, kit.colors.secondary, kit.colors.accent
        );
        println!("    fonts:  {} / {}", kit.fonts.headline, kit.fonts.body);
        if let Some(logo) = &kit.logo {
            println!("    logo:   {}", logo);
        }
        if let Some(mark) = &kit.watermark {
            println!("    watermark: {}", mark);
        }
    }
    Ok(())
}

pub fn delete_command(store_path: &Path, name: &str) -> Result<()> {
    let mut store = BrandKitStore::load(store_path).context("Failed to load brand kits")?;
    store.delete(name)?;
    println!("{} Brand kit '{}' deleted", "✓".green(), name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(name: &str) -> CreateArgs {
        CreateArgs {
            name: name.to_string(),
            primary: "#0A2540".to_string(),
            secondary: "#FFFFFF".to_string(),
            accent: "#635BFF".to_string(),
            headline_font: "Poppins".to_string(),
            body_font: "Inter".to_string(),
            logo: None,
            watermark: Some("CONFIDENTIAL".to_string()),
        }
    }

    #[test]
    fn test_create_then_delete() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("brand_kits.json");

        create_command(&path, args("acme")).unwrap();
        let store = BrandKitStore::load(&path).unwrap();
        assert_eq!(store.get("acme").unwrap().fonts.headline, "Poppins");
        list_command(&path, true).unwrap();

        delete_command(&path, "acme").unwrap();
        assert!(BrandKitStore::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_delete_unknown_suggests() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("brand_kits.json");
        create_command(&path, args("acme")).unwrap();

        let err = delete_command(&path, "acne").unwrap_err();
        assert!(err.to_string().contains("acme"));
    }
}
