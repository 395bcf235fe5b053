//! Image generation through the hosted images endpoint
//!
//! The service returns either base64 image data or a URL; both end up as
//! a PNG under the output directory.

use crate::config::{api_key, Config};
use crate::error::{ApiError, Error, Result};
use crate::http::{self, RetryPolicy};
use crate::slides::checked_stem;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

const SERVICE: &str = "openai-images";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "2:3")]
    Portrait,
    #[serde(rename = "3:2")]
    Landscape,
}

impl AspectRatio {
    pub fn size(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1024x1024",
            AspectRatio::Portrait => "1024x1536",
            AspectRatio::Landscape => "1536x1024",
        }
    }

    /// List price per image in USD
    pub fn cost_usd(&self) -> f64 {
        match self {
            AspectRatio::Square => 0.04,
            AspectRatio::Portrait | AspectRatio::Landscape => 0.06,
        }
    }

    /// Parse `1:1`, `2:3` or `3:2`; anything else is square with a warning
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            warn!("Unknown aspect ratio '{}'. Using 1:1.", value);
            AspectRatio::Square
        })
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "1:1" => Ok(AspectRatio::Square),
            "2:3" => Ok(AspectRatio::Portrait),
            "3:2" => Ok(AspectRatio::Landscape),
            other => Err(format!("unsupported aspect ratio: {}", other)),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectRatio::Square => f.write_str("1:1"),
            AspectRatio::Portrait => f.write_str("2:3"),
            AspectRatio::Landscape => f.write_str("3:2"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    /// File stem; `.png` is appended
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageResult {
    pub status: String,
    pub model: String,
    pub image_path: PathBuf,
    pub image_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_drive_url: Option<String>,
    pub prompt: String,
    pub size: String,
    pub aspect_ratio: String,
    pub cost_usd: f64,
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    n: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerationResponse {
    #[serde(default)]
    pub data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeneratedImage {
    #[serde(default)]
    pub b64_json: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Where the image bytes come from
#[derive(Debug, PartialEq)]
pub(crate) enum Payload {
    Inline(Vec<u8>),
    Remote(String),
}

pub struct ImageClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    output_dir: PathBuf,
    retry: RetryPolicy,
}

impl ImageClient {
    /// Build from config; requires `OPENAI_API_KEY`
    pub fn from_config(config: &Config) -> Result<Self> {
        let key = api_key("OPENAI_API_KEY").ok_or_else(|| {
            Error::Api(ApiError::MissingCredential {
                service: SERVICE.to_string(),
                hint: "OPENAI_API_KEY not found in environment variables".to_string(),
            })
        })?;
        Ok(Self {
            client: http::client(&config.http)?,
            api_key: key,
            base_url: config.openai.base_url.trim_end_matches('/').to_string(),
            model: config.openai.image_model.clone(),
            output_dir: config.images_dir(),
            retry: RetryPolicy::from(&config.http),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn generate(&self, request: &ImageRequest) -> Result<ImageResult> {
        checked_stem(&request.filename)?;
        let size = request.aspect_ratio.size();
        debug!("Generating {} image with {}", size, self.model);

        let prompt = request.prompt.as_str();
        let retry = self.retry.side_effecting();
        let response =
            http::with_retry(SERVICE, &retry, move || self.generate_once(prompt, size)).await?;
        let (bytes, source) = match decode_payload(response)? {
            Payload::Inline(bytes) => (bytes, "base64".to_string()),
            Payload::Remote(url) => (self.download(&url).await?, url),
        };

        let image_path = save_png(&self.output_dir, &request.filename, &bytes)?;
        info!("Image saved to {} ({} bytes)", image_path.display(), bytes.len());

        Ok(ImageResult {
            status: "success".to_string(),
            model: self.model.clone(),
            image_path,
            image_source: source,
            google_drive_url: None,
            prompt: request.prompt.clone(),
            size: size.to_string(),
            aspect_ratio: request.aspect_ratio.to_string(),
            cost_usd: request.aspect_ratio.cost_usd(),
        })
    }

    async fn generate_once(&self, prompt: &str, size: &str) -> Result<GenerationResponse> {
        let response = self
            .client
            .post(format!("{}/v1/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&GenerationRequest {
                model: &self.model,
                prompt,
                size,
                n: 1,
            })
            .send()
            .await
            .map_err(|e| http::transport_error(SERVICE, e))?;
        http::json_body(SERVICE, response).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Downloading generated image from {}", url);
        http::with_retry(SERVICE, &self.retry, move || async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| http::transport_error(SERVICE, e))?;
            let response = http::check_status(SERVICE, response).await?;
            let bytes = response
                .bytes()
                .await
                .map_err(|e| http::transport_error(SERVICE, e))?;
            Ok(bytes.to_vec())
        })
        .await
    }
}

pub(crate) fn decode_payload(response: GenerationResponse) -> Result<Payload> {
    let image = response.data.into_iter().next().ok_or_else(|| invalid("no image in response"))?;

    match (image.b64_json, image.url) {
        (Some(b64), _) if !b64.is_empty() => STANDARD
            .decode(b64.as_bytes())
            .map(Payload::Inline)
            .map_err(|e| invalid(&format!("invalid base64 image data: {}", e))),
        (_, Some(url)) => Ok(Payload::Remote(url)),
        _ => Err(invalid("image has neither b64_json nor url")),
    }
}

/// Write `<dir>/<stem>.png`, creating `dir`
pub fn save_png(dir: &Path, stem: &str, bytes: &[u8]) -> Result<PathBuf> {
    let stem = checked_stem(stem.strip_suffix(".png").unwrap_or(stem))?;
    fs::create_dir_all(dir).map_err(|e| Error::create_dir(dir, e))?;
    let path = dir.join(format!("{}.png", stem));
    fs::write(&path, bytes).map_err(|e| Error::write(&path, e))?;
    Ok(path)
}

fn invalid(details: &str) -> Error {
    Error::Api(ApiError::InvalidResponse {
        service: SERVICE.to_string(),
        details: details.to_string(),
    })
}
