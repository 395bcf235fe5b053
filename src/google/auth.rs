//! OAuth token cache with refresh
//!
//! The consent flow happens elsewhere; this module only reads an existing
//! cache, refreshes the access token when it is about to expire, and
//! writes the refreshed token back.

use crate::error::{ApiError, Error, Result};
use crate::http::{self, RetryPolicy};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

const SERVICE: &str = "google-oauth";
const EXPIRY_SKEW_SECS: i64 = 60;

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenCache {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenCache {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Api(ApiError::MissingCredential {
                service: "google".to_string(),
                hint: format!(
                    "token cache {} not found; authorize once and save the token there",
                    path.display()
                ),
            }));
        }
        let contents = fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
        serde_json::from_str(&contents).map_err(|e| Error::parse(path.display().to_string(), e))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::parse(path.display().to_string(), e))?;
        fs::write(path, json).map_err(|e| Error::write(path, e))
    }

    /// Valid when there is no recorded expiry or it lies beyond the skew window
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expiry) => expiry - Duration::seconds(EXPIRY_SKEW_SECS) > now,
            None => true,
        }
    }

    pub(crate) fn apply_refresh(&mut self, response: RefreshResponse, now: DateTime<Utc>) {
        self.access_token = response.access_token;
        self.expires_at = response.expires_in.map(|secs| now + Duration::seconds(secs));
        if let Some(refresh) = response.refresh_token {
            self.refresh_token = Some(refresh);
        }
    }
}

/// Hands out access tokens, refreshing the cache on demand
pub struct TokenManager {
    path: PathBuf,
    cache: Mutex<TokenCache>,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl TokenManager {
    pub fn load(path: &Path, client: reqwest::Client, retry: RetryPolicy) -> Result<Self> {
        let cache = TokenCache::load(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            cache: Mutex::new(cache),
            client,
            retry,
        })
    }

    pub async fn access_token(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;
        if cache.is_valid_at(Utc::now()) {
            return Ok(cache.access_token.clone());
        }

        debug!("Access token in {} expired, refreshing", self.path.display());
        let (refresh_token, client_id, client_secret) = match (
            cache.refresh_token.clone(),
            cache.client_id.clone(),
            cache.client_secret.clone(),
        ) {
            (Some(r), Some(id), Some(secret)) => (r, id, secret),
            _ => {
                return Err(Error::Api(ApiError::MissingCredential {
                    service: "google".to_string(),
                    hint: format!(
                        "token in {} expired and cannot be refreshed (needs refresh_token, client_id, client_secret)",
                        self.path.display()
                    ),
                }))
            }
        };

        let token_uri = cache.token_uri.clone();
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
        ];
        let client = &self.client;
        let token_uri = token_uri.as_str();
        let params = &params;
        let response: RefreshResponse = http::with_retry(SERVICE, &self.retry, move || async move {
            let response = client
                .post(token_uri)
                .form(params)
                .send()
                .await
                .map_err(|e| http::transport_error(SERVICE, e))?;
            http::json_body(SERVICE, response).await
        })
        .await?;

        cache.apply_refresh(response, Utc::now());
        cache.save(&self.path)?;
        info!("Refreshed access token in {}", self.path.display());
        Ok(cache.access_token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache(expires_at: Option<DateTime<Utc>>) -> TokenCache {
        TokenCache {
            access_token: "ya29.old".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            expires_at,
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            token_uri: default_token_uri(),
        }
    }

    #[test]
    fn test_validity_window() {
        let now = Utc::now();
        assert!(cache(None).is_valid_at(now));
        assert!(cache(Some(now + Duration::seconds(600))).is_valid_at(now));
        assert!(!cache(Some(now + Duration::seconds(30))).is_valid_at(now));
        assert!(!cache(Some(now - Duration::seconds(1))).is_valid_at(now));
    }

    #[test]
    fn test_apply_refresh_keeps_refresh_token() {
        let now = Utc::now();
        let mut token = cache(Some(now));
        token.apply_refresh(
            RefreshResponse {
                access_token: "ya29.new".to_string(),
                expires_in: Some(3599),
                refresh_token: None,
            },
            now,
        );
        assert_eq!(token.access_token, "ya29.new");
        assert_eq!(token.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(token.expires_at, Some(now + Duration::seconds(3599)));
    }

    #[test]
    fn test_missing_cache_is_credential_error() {
        let err = TokenCache::load(Path::new("/nonexistent/token.json")).unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::MissingCredential { .. })));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("token.json");
        let token = cache(None);
        token.save(&path).unwrap();
        assert_eq!(TokenCache::load(&path).unwrap(), token);
    }

    #[test]
    fn test_minimal_cache_defaults_token_uri() {
        let token: TokenCache = serde_json::from_str(r#"{"access_token": "abc"}"#).unwrap();
        assert_eq!(token.token_uri, "https://oauth2.googleapis.com/token");
        assert!(token.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_valid_token_needs_no_network() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("token.json");
        cache(None).save(&path).unwrap();

        let manager = TokenManager::load(&path, reqwest::Client::new(), RetryPolicy::default()).unwrap();
        assert_eq!(manager.access_token().await.unwrap(), "ya29.old");
    }

    #[tokio::test]
    async fn test_expired_without_refresh_token() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("token.json");
        let mut token = cache(Some(Utc::now() - Duration::seconds(10)));
        token.refresh_token = None;
        token.save(&path).unwrap();

        let manager = TokenManager::load(&path, reqwest::Client::new(), RetryPolicy::default()).unwrap();
        let err = manager.access_token().await.unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::MissingCredential { .. })));
    }
}
