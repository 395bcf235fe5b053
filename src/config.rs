use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "campaign-kit.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub rag: RagConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_brand_kits")]
    pub brand_kits: PathBuf,
    #[serde(default = "default_outputs")]
    pub outputs: PathBuf,
    #[serde(default = "default_memory")]
    pub memory: PathBuf,
    #[serde(default = "default_evidence")]
    pub evidence: PathBuf,
}

fn default_brand_kits() -> PathBuf {
    PathBuf::from("brand_kits.json")
}

fn default_outputs() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_memory() -> PathBuf {
    PathBuf::from("memory")
}

fn default_evidence() -> PathBuf {
    PathBuf::from("evidence")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            brand_kits: default_brand_kits(),
            outputs: default_outputs(),
            memory: default_memory(),
            evidence: default_evidence(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_base")]
    pub base_url: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_openai_base() -> String {
    "https://api.openai.com".to_string()
}

fn default_image_model() -> String {
    "gpt-image-1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base(),
            image_model: default_image_model(),
            embedding_model: default_embedding_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
    #[serde(default = "default_gmail_token_path")]
    pub gmail_token_path: PathBuf,
    #[serde(default = "default_max_emails")]
    pub max_emails_per_day: u32,
    #[serde(default = "default_campaign_delay")]
    pub campaign_delay_secs: u64,
}

fn default_token_path() -> PathBuf {
    PathBuf::from("token.json")
}

fn default_gmail_token_path() -> PathBuf {
    PathBuf::from("gmail_token.json")
}

fn default_max_emails() -> u32 {
    500
}

fn default_campaign_delay() -> u64 {
    7
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            token_path: default_token_path(),
            gmail_token_path: default_gmail_token_path(),
            max_emails_per_day: default_max_emails(),
            campaign_delay_secs: default_campaign_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_index() -> String {
    "proposal_kb".to_string()
}

fn default_top_k() -> usize {
    5
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            index: default_index(),
            host: None,
            top_k: default_top_k(),
        }
    }
}

impl Config {
    /// Load config from file, returns defaults if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
        toml::from_str(&contents).map_err(|e| Error::parse(CONFIG_FILE, e))
    }

    /// Load `campaign-kit.toml` from the working directory, then apply env overrides
    pub fn load_default() -> Result<Self> {
        let mut config = Self::load(Path::new(CONFIG_FILE))?;
        config.apply_env();
        Ok(config)
    }

    /// Environment wins over the file for index and model selection
    pub fn apply_env(&mut self) {
        if let Ok(index) = std::env::var("PINECONE_INDEX") {
            self.rag.index = index;
        }
        if let Ok(host) = std::env::var("PINECONE_HOST") {
            self.rag.host = Some(host);
        }
        if let Ok(model) = std::env::var("EMBEDDINGS_MODEL") {
            self.openai.embedding_model = model;
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::parse(CONFIG_FILE, e))
    }

    pub fn images_dir(&self) -> PathBuf {
        self.paths.outputs.join("images")
    }

    pub fn presentations_dir(&self) -> PathBuf {
        self.paths.outputs.join("presentations")
    }

    pub fn diagrams_dir(&self) -> PathBuf {
        self.paths.outputs.join("diagrams")
    }

    pub fn drive_config_path(&self) -> PathBuf {
        self.paths.memory.join("google_drive_config.json")
    }

    pub fn sent_count_path(&self) -> PathBuf {
        self.paths.memory.join("gmail_sent_count.json")
    }
}

/// Read an API key from the environment, treating empty values as unset
pub fn api_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.http.timeout_secs, 60);
        assert_eq!(config.http.max_retries, 3);
        assert_eq!(config.google.max_emails_per_day, 500);
        assert_eq!(config.google.campaign_delay_secs, 7);
        assert_eq!(config.rag.top_k, 5);
        assert_eq!(config.openai.image_model, "gpt-image-1");
        assert_eq!(config.images_dir(), PathBuf::from("outputs/images"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "[google]\nmax_emails_per_day = 20\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.google.max_emails_per_day, 20);
        assert_eq!(config.google.campaign_delay_secs, 7);
        assert_eq!(config.paths.brand_kits, PathBuf::from("brand_kits.json"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load(Path::new("/nonexistent/campaign-kit.toml")).unwrap();
        assert_eq!(config.http.max_retries, 3);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "[http\ntimeout_secs = ").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_round_trip_toml() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.rag.index, "proposal_kb");
    }
}
