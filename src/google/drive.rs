//! Drive uploads into a fixed folder layout
//!
//! Content lands under a single root folder with one subfolder per
//! content type. Folder ids are remembered in a small JSON file so each
//! folder is created only once.

use super::auth::TokenManager;
use crate::error::{Error, Result};
use crate::http::{self, RetryPolicy};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SERVICE: &str = "google-drive";
const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart&fields=id,webViewLink";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

pub const ROOT_FOLDER_NAME: &str = "Marketing Content - AI Generated";

pub const FOLDER_TYPES: [&str; 7] = [
    "blog_posts",
    "social_posts",
    "images",
    "videos",
    "pdfs",
    "presentations",
    "emails",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FolderConfig {
    #[serde(default)]
    pub root_folder_id: Option<String>,
    #[serde(default = "default_folders")]
    pub folders: BTreeMap<String, Option<String>>,
}

fn default_folders() -> BTreeMap<String, Option<String>> {
    FOLDER_TYPES.iter().map(|t| (t.to_string(), None)).collect()
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            root_folder_id: None,
            folders: default_folders(),
        }
    }
}

impl FolderConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
        let mut config: Self = serde_json::from_str(&contents)
            .map_err(|e| Error::parse(path.display().to_string(), e))?;
        for folder_type in FOLDER_TYPES {
            config.folders.entry(folder_type.to_string()).or_insert(None);
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| Error::create_dir(parent, e))?;
            }
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::parse(path.display().to_string(), e))?;
        fs::write(path, json).map_err(|e| Error::write(path, e))
    }

    pub fn folder_id(&self, folder_type: &str) -> Result<Option<&str>> {
        match self.folders.get(folder_type) {
            Some(id) => Ok(id.as_deref()),
            None => Err(unknown_folder(folder_type)),
        }
    }

    /// Remember the root folder id and write the file immediately
    pub fn record_root(&mut self, path: &Path, id: &str) -> Result<()> {
        self.root_folder_id = Some(id.to_string());
        self.save(path)
    }

    /// Remember one subfolder id and write the file immediately
    pub fn record(&mut self, path: &Path, folder_type: &str, id: &str) -> Result<()> {
        self.folders
            .insert(folder_type.to_string(), Some(id.to_string()));
        self.save(path)
    }

    /// Folder types that still need a folder
    pub fn missing(&self) -> Vec<String> {
        self.folders
            .iter()
            .filter(|(_, id)| id.is_none())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

fn unknown_folder(folder_type: &str) -> Error {
    Error::InvalidArgument(format!(
        "unknown folder type '{}' (expected one of: {})",
        folder_type,
        FOLDER_TYPES.join(", ")
    ))
}

/// `blog_posts` -> `Blog Posts`
pub fn display_name(folder_type: &str) -> String {
    folder_type
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Guess a MIME type from the file extension
pub fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "pdf" => "application/pdf",
        "html" | "htm" => "text/html",
        "md" => "text/markdown",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Build a `multipart/related` body: JSON metadata part then the file
pub fn multipart_related(
    metadata: &serde_json::Value,
    content_type: &str,
    content: &[u8],
    boundary: &str,
) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 512);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadResult {
    pub file_id: String,
    pub file_name: String,
    pub folder_type: String,
    pub web_view_link: String,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
    #[serde(default, rename = "webViewLink")]
    web_view_link: Option<String>,
}

pub struct DriveClient {
    client: reqwest::Client,
    tokens: TokenManager,
    config_path: PathBuf,
    folders: FolderConfig,
    retry: RetryPolicy,
}

impl DriveClient {
    pub fn new(
        client: reqwest::Client,
        tokens: TokenManager,
        config_path: &Path,
        retry: RetryPolicy,
    ) -> Result<Self> {
        Ok(Self {
            client,
            tokens,
            folders: FolderConfig::load(config_path)?,
            config_path: config_path.to_path_buf(),
            retry,
        })
    }

    pub fn folders(&self) -> &FolderConfig {
        &self.folders
    }

    /// Create the root folder and any missing subfolders, persisting each
    /// id as soon as it is created
    pub async fn ensure_folders(&mut self) -> Result<&FolderConfig> {
        let root = match self.folders.root_folder_id.clone() {
            Some(id) => id,
            None => {
                let id = self.create_folder(ROOT_FOLDER_NAME, None).await?;
                info!("Created Drive folder '{}' ({})", ROOT_FOLDER_NAME, id);
                self.folders.record_root(&self.config_path, &id)?;
                id
            }
        };

        for folder_type in self.folders.missing() {
            let name = display_name(&folder_type);
            let id = self.create_folder(&name, Some(&root)).await?;
            info!("Created Drive folder '{}' ({})", name, id);
            self.folders.record(&self.config_path, &folder_type, &id)?;
        }

        Ok(&self.folders)
    }

    /// Upload `path` into the folder for `folder_type` and share it read-only
    pub async fn upload(
        &mut self,
        path: &Path,
        folder_type: &str,
        description: Option<&str>,
    ) -> Result<UploadResult> {
        if self.folders.folder_id(folder_type)?.is_none() {
            self.ensure_folders().await?;
        }
        let folder_id = self
            .folders
            .folder_id(folder_type)?
            .map(str::to_string)
            .ok_or_else(|| unknown_folder(folder_type))?;

        let content = fs::read(path).map_err(|e| Error::read(path, e))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let mut metadata = json!({ "name": file_name, "parents": [folder_id] });
        if let Some(text) = description {
            metadata["description"] = json!(text);
        }

        let boundary = format!("campaign_kit_{}", chrono::Utc::now().timestamp_millis());
        let body = multipart_related(&metadata, mime_type(path), &content, &boundary);
        debug!("Uploading {} ({} bytes) to {}", file_name, content.len(), folder_type);

        let token = self.tokens.access_token().await?;
        let client = &self.client;
        let token = token.as_str();
        let body = &body;
        let boundary = boundary.as_str();
        let retry = self.retry.side_effecting();
        let created: CreatedFile = http::with_retry(SERVICE, &retry, move || async move {
            let response = client
                .post(UPLOAD_URL)
                .bearer_auth(token)
                .header(
                    reqwest::header::CONTENT_TYPE,
                    format!("multipart/related; boundary={}", boundary),
                )
                .body(body.clone())
                .send()
                .await
                .map_err(|e| http::transport_error(SERVICE, e))?;
            http::json_body(SERVICE, response).await
        })
        .await?;

        self.share(&created.id).await?;
        let web_view_link = created
            .web_view_link
            .unwrap_or_else(|| format!("https://drive.google.com/file/d/{}/view", created.id));
        info!("Uploaded {} to Drive: {}", file_name, web_view_link);

        Ok(UploadResult {
            file_id: created.id,
            file_name,
            folder_type: folder_type.to_string(),
            web_view_link,
        })
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<String> {
        let mut metadata = json!({ "name": name, "mimeType": FOLDER_MIME });
        if let Some(parent) = parent {
            metadata["parents"] = json!([parent]);
        }

        let token = self.tokens.access_token().await?;
        let client = &self.client;
        let token = token.as_str();
        let metadata = &metadata;
        let retry = self.retry.side_effecting();
        let created: CreatedFile = http::with_retry(SERVICE, &retry, move || async move {
            let response = client
                .post(format!("{}?fields=id", FILES_URL))
                .bearer_auth(token)
                .json(metadata)
                .send()
                .await
                .map_err(|e| http::transport_error(SERVICE, e))?;
            http::json_body(SERVICE, response).await
        })
        .await?;
        Ok(created.id)
    }

    async fn share(&self, file_id: &str) -> Result<()> {
        let token = self.tokens.access_token().await?;
        let client = &self.client;
        let token = token.as_str();
        let url = format!("{}/{}/permissions", FILES_URL, file_id);
        let url = url.as_str();
        http::with_retry(SERVICE, &self.retry, move || async move {
            let response = client
                .post(url)
                .bearer_auth(token)
                .json(&json!({ "type": "anyone", "role": "reader" }))
                .send()
                .await
                .map_err(|e| http::transport_error(SERVICE, e))?;
            http::check_status(SERVICE, response).await.map(|_| ())
        })
        .await
    }
}
