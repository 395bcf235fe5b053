use crate::brand_kit::BrandKitStore;
use crate::diagram::{self, DiagramOptions, Theme};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::warn;

pub struct DiagramArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub title: String,
    pub theme: String,
    pub background: Option<String>,
    pub template: Option<PathBuf>,
    pub brand_kit: Option<String>,
}

pub fn diagram_command(store_path: &Path, args: DiagramArgs) -> Result<()> {
    let mermaid = diagram::read_mermaid(&args.input)?;
    let template = diagram::read_template(args.template.as_deref())?;

    let background = match (args.background, args.brand_kit.as_deref()) {
        (Some(color), _) => color,
        (None, Some(name)) => {
            let store = BrandKitStore::load(store_path).context("Failed to load brand kits")?;
            store.get(name)?.colors.primary.clone()
        }
        (None, None) => diagram::DEFAULT_BACKGROUND.to_string(),
    };

    let options = DiagramOptions {
        title: args.title,
        theme: Theme::parse_lenient(&args.theme),
        background,
    };
    let html = diagram::render(&template, &mermaid, &options);

    let leftover = diagram::unresolved_placeholders(&html);
    if !leftover.is_empty() {
        warn!("Template placeholders left unresolved: {}", leftover.join(", "));
    }

    diagram::write_html(&args.output, &html)?;
    println!("{} Diagram written to {}", "✓".green(), args.output.display());
    println!("  Open it in a browser to pan, zoom and export.");
    Ok(())
}
