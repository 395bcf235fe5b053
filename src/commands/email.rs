use super::spinner;
use crate::config::Config;
use crate::google::{self, DeliveryStatus, EmailMessage};
use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

pub struct EmailArgs {
    pub subject: String,
    pub body_file: PathBuf,
    pub attachments: Vec<PathBuf>,
    pub plain: bool,
}

impl EmailArgs {
    fn message(&self, to: &str) -> Result<EmailMessage> {
        let body = read_body(&self.body_file)?;
        let message = EmailMessage::new(to, self.subject.clone(), body)
            .with_attachments(self.attachments.clone());
        Ok(if self.plain { message.plain() } else { message })
    }
}

fn read_body(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read body from {}", path.display()))
}

/// Split a comma-separated recipient list, dropping blanks
pub fn split_recipients(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn send_command(config: &Config, to: &str, args: &EmailArgs, draft: bool) -> Result<()> {
    let message = args.message(to)?;
    let mailer = google::mailer(config).context("Failed to set up Gmail")?;

    if draft {
        let url = mailer.draft(&message).await.context("Failed to create draft")?;
        println!("{} Draft created for {}", "✓".green(), to);
        println!("  {}", url);
        return Ok(());
    }

    let id = mailer.send(&message).await.context("Failed to send email")?;
    println!("{} Sent to {} (id {})", "✓".green(), to, id);
    println!("  {} sends left today", mailer.remaining_today()?);
    Ok(())
}

pub async fn campaign_command(config: &Config, to: &str, args: &EmailArgs) -> Result<()> {
    let recipients = split_recipients(to);
    if recipients.is_empty() {
        anyhow::bail!("No recipients given");
    }
    let template = args.message("")?;
    let mailer = google::mailer(config).context("Failed to set up Gmail")?;

    let pb = spinner(&format!(
        "Sending to {} recipients ({}s apart)...",
        recipients.len(),
        config.google.campaign_delay_secs
    ));
    let results = mailer.campaign(&recipients, &template).await;
    pb.finish_and_clear();
    let results = results.context("Campaign failed")?;

    let mut sent = 0;
    for delivery in &results {
        let mark = match delivery.status {
            DeliveryStatus::Sent => {
                sent += 1;
                "sent".green()
            }
            DeliveryStatus::Failed => "failed".red(),
            DeliveryStatus::Skipped => "skipped".yellow(),
        };
        match &delivery.error {
            Some(err) => println!("  {:<8} {}  {}", mark, delivery.recipient, err.dimmed()),
            None => println!("  {:<8} {}", mark, delivery.recipient),
        }
    }
    println!("\n{}/{} sent", sent, results.len());
    Ok(())
}
