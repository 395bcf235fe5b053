use crate::brand_kit::BrandKitStore;
use crate::slides::{self, Deck};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

pub fn deck_command(
    deck_path: &Path,
    output_dir: &Path,
    store_path: &Path,
    brand_kit: Option<&str>,
) -> Result<()> {
    let deck = Deck::from_json(deck_path)
        .with_context(|| format!("Failed to load deck from {}", deck_path.display()))?;

    let store;
    let kit = match brand_kit {
        Some(name) => {
            store = BrandKitStore::load(store_path).context("Failed to load brand kits")?;
            Some(store.get(name)?)
        }
        None => None,
    };

    let path = slides::write_deck(&deck, output_dir, kit)?;
    println!(
        "{} Presentation with {} slides written to {}",
        "✓".green(),
        deck.slides.len() + 1,
        path.display()
    );
    Ok(())
}
