pub mod brand_kit;
pub mod deck;
pub mod diagram;
pub mod drive;
pub mod email;
pub mod evidence;
pub mod image;
pub mod init;
pub mod rfp;

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

/// Create a spinner-style progress bar
pub(crate) fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Parse repeated `key=value` arguments into a filter map
pub(crate) fn parse_filters(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut filters = BTreeMap::new();
    for pair in pairs {
        match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                filters.insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => bail!("Invalid filter '{}', expected key=value", pair),
        }
    }
    Ok(filters)
}
