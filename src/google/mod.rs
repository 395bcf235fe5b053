//! Google Drive and Gmail integrations
//!
//! Both services authenticate with a cached OAuth token (see [`auth`]).
//! Drive and Gmail use separate token files so their scopes stay apart.

pub mod auth;
pub mod drive;
pub mod gmail;

pub use auth::{TokenCache, TokenManager};
pub use drive::{DriveClient, FolderConfig, UploadResult};
pub use gmail::{Delivery, DeliveryStatus, EmailMessage, GmailApi, MailTransport, Mailer};

use crate::config::Config;
use crate::error::Result;
use crate::http::{self, RetryPolicy};
use std::time::Duration;

/// Drive client using the configured token cache and folder config
pub fn drive_client(config: &Config) -> Result<DriveClient> {
    let client = http::client(&config.http)?;
    let retry = RetryPolicy::from(&config.http);
    let tokens = TokenManager::load(&config.google.token_path, client.clone(), retry.clone())?;
    DriveClient::new(client, tokens, &config.drive_config_path(), retry)
}

/// Gmail mailer with the configured daily limit and campaign delay
pub fn mailer(config: &Config) -> Result<Mailer<GmailApi>> {
    let client = http::client(&config.http)?;
    let retry = RetryPolicy::from(&config.http);
    let tokens = TokenManager::load(&config.google.gmail_token_path, client.clone(), retry.clone())?;
    Ok(Mailer::new(
        GmailApi::new(client, tokens, retry),
        &config.sent_count_path(),
        config.google.max_emails_per_day,
        Duration::from_secs(config.google.campaign_delay_secs),
    ))
}
