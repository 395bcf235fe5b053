//! MCP (Model Context Protocol) server over stdio
//!
//! Exposes requirement extraction, diagrams, brand kits, images, Drive,
//! email and evidence lookup as tools for an agent. Tool failures come
//! back as error results so one bad call never takes the server down.

use crate::brand_kit::BrandKitStore;
use crate::config::Config;
use crate::diagram::{self, DiagramOptions, Theme};
use crate::error::Result as KitResult;
use crate::evidence::EvidenceStore;
use crate::google::{self, EmailMessage, UploadResult};
use crate::image::{AspectRatio, ImageClient, ImageRequest, ImageResult};
use crate::requirements;
use crate::slides::{checked_stem, safe_filename};
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ErrorData, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExtractRequirementsParams {
    /// Full RFP text
    pub text: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RenderDiagramParams {
    /// Mermaid source, optionally wrapped in a ```mermaid fence
    pub mermaid_code: String,
    pub title: Option<String>,
    /// default, forest, dark, neutral or base
    pub theme: Option<String>,
    /// CSS background colour
    pub background: Option<String>,
    /// Output file stem; derived from the title when absent
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateImageParams {
    pub prompt: String,
    /// Output file stem
    pub filename: String,
    /// 1:1, 2:3 or 3:2
    pub aspect_ratio: Option<String>,
    /// Drive folder type to upload the result into
    pub upload_folder: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UploadParams {
    pub file_path: String,
    /// blog_posts, social_posts, images, videos, pdfs, presentations or emails
    pub folder_type: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SendEmailParams {
    pub to: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Send as plain text instead of HTML
    #[serde(default)]
    pub plain: bool,
    /// Create a draft instead of sending
    #[serde(default)]
    pub draft: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchEvidenceParams {
    /// Field name to case-insensitive substring; every filter must match
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct SendOutcome {
    status: &'static str,
    to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    draft_url: Option<String>,
}

#[derive(Clone)]
pub struct CampaignKitServer {
    config: Arc<Config>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl CampaignKitServer {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Extract shall/must/will obligations from RFP text as requirements")]
    async fn extract_requirements(
        &self,
        Parameters(params): Parameters<ExtractRequirementsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(json_result(Ok(requirements::extract(&params.text))))
    }

    #[tool(description = "Render Mermaid code to an interactive HTML diagram and return its path")]
    async fn render_diagram(
        &self,
        Parameters(params): Parameters<RenderDiagramParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let result = (|| -> KitResult<PathBuf> {
            let options = DiagramOptions {
                title: params.title.unwrap_or_else(|| diagram::DEFAULT_TITLE.to_string()),
                theme: params
                    .theme
                    .as_deref()
                    .map(Theme::parse_lenient)
                    .unwrap_or_default(),
                background: params
                    .background
                    .unwrap_or_else(|| diagram::DEFAULT_BACKGROUND.to_string()),
            };
            let stem = match params.filename.as_deref() {
                Some(name) => {
                    checked_stem(name.strip_suffix(".html").unwrap_or(name))?.to_string()
                }
                None => safe_filename(&options.title, "diagram"),
            };
            let html = diagram::render(
                diagram::BUILTIN_TEMPLATE,
                &diagram::strip_code_fence(&params.mermaid_code),
                &options,
            );
            let path = self.config.diagrams_dir().join(format!("{}.html", stem));
            diagram::write_html(&path, &html)?;
            Ok(path)
        })();
        Ok(json_result(result))
    }

    #[tool(description = "List saved brand kits")]
    async fn list_brand_kits(&self) -> Result<CallToolResult, ErrorData> {
        let result = BrandKitStore::load(&self.config.paths.brand_kits).map(|store| {
            store
                .list()
                .into_iter()
                .map(|(name, kit)| (name.to_string(), kit.clone()))
                .collect::<BTreeMap<_, _>>()
        });
        Ok(json_result(result))
    }

    #[tool(description = "Generate an image from a prompt, optionally uploading it to Drive")]
    async fn generate_image(
        &self,
        Parameters(params): Parameters<GenerateImageParams>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(json_result(self.run_generate_image(params).await))
    }

    #[tool(description = "Upload a local file to the campaign Drive folder for its content type")]
    async fn upload_to_drive(
        &self,
        Parameters(params): Parameters<UploadParams>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(json_result(self.run_upload(params).await))
    }

    #[tool(description = "Send an email (or create a draft) through Gmail")]
    async fn send_email(
        &self,
        Parameters(params): Parameters<SendEmailParams>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(json_result(self.run_send_email(params).await))
    }

    #[tool(description = "Filter case studies, bios and certifications by field substrings")]
    async fn search_evidence(
        &self,
        Parameters(params): Parameters<SearchEvidenceParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let result =
            EvidenceStore::load(&self.config.paths.evidence).map(|store| store.get(&params.filters));
        Ok(json_result(result))
    }
}

impl CampaignKitServer {
    async fn run_generate_image(&self, params: GenerateImageParams) -> KitResult<ImageResult> {
        let client = ImageClient::from_config(&self.config)?;
        let request = ImageRequest {
            prompt: params.prompt,
            aspect_ratio: params
                .aspect_ratio
                .as_deref()
                .map(AspectRatio::parse_lenient)
                .unwrap_or_default(),
            filename: params.filename,
        };
        let mut image = client.generate(&request).await?;
        if let Some(folder) = params.upload_folder.as_deref() {
            let mut drive = google::drive_client(&self.config)?;
            let uploaded = drive.upload(&image.image_path, folder, None).await?;
            image.google_drive_url = Some(uploaded.web_view_link);
        }
        Ok(image)
    }

    async fn run_upload(&self, params: UploadParams) -> KitResult<UploadResult> {
        let mut drive = google::drive_client(&self.config)?;
        drive
            .upload(
                &PathBuf::from(&params.file_path),
                &params.folder_type,
                params.description.as_deref(),
            )
            .await
    }

    async fn run_send_email(&self, params: SendEmailParams) -> KitResult<SendOutcome> {
        let mailer = google::mailer(&self.config)?;
        let mut message = EmailMessage::new(&params.to, params.subject, params.body)
            .with_attachments(params.attachments.iter().map(PathBuf::from).collect());
        if params.plain {
            message = message.plain();
        }

        if params.draft {
            let url = mailer.draft(&message).await?;
            Ok(SendOutcome {
                status: "draft",
                to: params.to,
                message_id: None,
                draft_url: Some(url),
            })
        } else {
            let id = mailer.send(&message).await?;
            Ok(SendOutcome {
                status: "sent",
                to: params.to,
                message_id: Some(id),
                draft_url: None,
            })
        }
    }
}

#[tool_handler]
impl ServerHandler for CampaignKitServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Campaign and proposal toolkit. Extract RFP requirements, render diagrams, \
                 generate images, upload to Drive, send email and look up evidence."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Success as pretty JSON, failure as an error result carrying the message
fn json_result<T: Serialize>(result: KitResult<T>) -> CallToolResult {
    match result {
        Ok(value) => {
            let json = serde_json::to_string_pretty(&value).unwrap_or_default();
            CallToolResult::success(vec![Content::text(json)])
        }
        Err(e) => {
            warn!("Tool call failed: {}", e);
            CallToolResult::error(vec![Content::text(format!("Error: {}", e))])
        }
    }
}

/// Serve tools on stdin/stdout until the client disconnects
pub async fn serve(config: Config) -> anyhow::Result<()> {
    info!("Starting MCP server on stdio");
    let service = CampaignKitServer::new(config)
        .serve(rmcp::transport::stdio())
        .await?;
    let reason = service.waiting().await?;
    info!("MCP server stopped: {:?}", reason);
    Ok(())
}
