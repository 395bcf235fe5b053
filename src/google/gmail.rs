//! Gmail sending with a persisted daily quota
//!
//! Messages are assembled as `multipart/mixed` MIME and handed to a
//! [`MailTransport`] as URL-safe base64. [`Mailer`] owns the daily send
//! counter and the pacing between campaign sends.

use super::auth::TokenManager;
use crate::error::{ApiError, Error, Result};
use crate::http::{self, RetryPolicy};
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const SERVICE: &str = "gmail";
const API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const LINE_WIDTH: usize = 76;

/// An outgoing message before MIME encoding
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<PathBuf>,
    pub html: bool,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            attachments: Vec::new(),
            html: true,
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<PathBuf>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn plain(mut self) -> Self {
        self.html = false;
        self
    }

    /// Same message addressed to someone else
    pub fn to_recipient(&self, to: &str) -> Self {
        Self {
            to: to.to_string(),
            ..self.clone()
        }
    }
}

/// Build the MIME text. Attachments that cannot be read are skipped.
///
/// Line breaks in the recipient or subject are rejected; they would end
/// the header and start a new one.
pub fn build_mime(message: &EmailMessage, boundary: &str) -> Result<String> {
    check_header("recipient", &message.to)?;
    check_header("subject", &message.subject)?;

    let mut out = String::new();
    out.push_str(&format!("To: {}\r\n", message.to));
    out.push_str(&format!("Subject: {}\r\n", encode_header(&message.subject)));
    out.push_str("MIME-Version: 1.0\r\n");
    out.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{}\"\r\n\r\n",
        boundary
    ));

    let subtype = if message.html { "html" } else { "plain" };
    out.push_str(&format!("--{}\r\n", boundary));
    out.push_str(&format!("Content-Type: text/{}; charset=\"utf-8\"\r\n", subtype));
    out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
    out.push_str(&wrap_base64(message.body.as_bytes()));

    for path in &message.attachments {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping attachment {}: {}", path.display(), e);
                continue;
            }
        };
        let name: String = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("attachment")
            .chars()
            .map(|c| if matches!(c, '"' | '\r' | '\n') { '_' } else { c })
            .collect();
        out.push_str(&format!("--{}\r\n", boundary));
        out.push_str("Content-Type: application/octet-stream\r\n");
        out.push_str("Content-Transfer-Encoding: base64\r\n");
        out.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{}\"\r\n\r\n",
            name
        ));
        out.push_str(&wrap_base64(&bytes));
    }

    out.push_str(&format!("--{}--\r\n", boundary));
    Ok(out)
}

fn check_header(field: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(Error::InvalidArgument(format!(
            "email {} must be a single line",
            field
        )));
    }
    Ok(())
}

/// URL-safe base64 of the MIME text, as the `raw` field expects
pub fn encode_raw(mime: &str) -> String {
    URL_SAFE.encode(mime.as_bytes())
}

fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

fn wrap_base64(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / LINE_WIDTH * 2 + 2);
    for chunk in encoded.as_bytes().chunks(LINE_WIDTH) {
        // base64 output is ASCII
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        out.push_str("\r\n");
    }
    if encoded.is_empty() {
        out.push_str("\r\n");
    }
    out
}

/// Per-day count of sent messages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentCounter {
    pub date: NaiveDate,
    pub count: u32,
}

impl SentCounter {
    /// Load the counter for `today`; a stale or missing file starts at zero
    pub fn load(path: &Path, today: NaiveDate) -> Result<Self> {
        let fresh = Self {
            date: today,
            count: 0,
        };
        if !path.exists() {
            return Ok(fresh);
        }
        let contents = fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
        let counter: Self = serde_json::from_str(&contents)
            .map_err(|e| Error::parse(path.display().to_string(), e))?;
        if counter.date == today {
            Ok(counter)
        } else {
            debug!("Sent counter from {} reset for {}", counter.date, today);
            Ok(fresh)
        }
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

    pub fn remaining(&self, limit: u32) -> u32 {
        limit.saturating_sub(self.count)
    }
}

/// Delivery backend for encoded messages
#[async_trait::async_trait]
pub trait MailTransport: Send + Sync {
    /// Send and return the message id
    async fn send_raw(&self, raw: &str) -> Result<String>;

    /// Store as a draft and return the draft id
    async fn draft_raw(&self, raw: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

pub struct GmailApi {
    client: reqwest::Client,
    tokens: TokenManager,
    retry: RetryPolicy,
}

impl GmailApi {
    pub fn new(client: reqwest::Client, tokens: TokenManager, retry: RetryPolicy) -> Self {
        Self {
            client,
            tokens,
            retry,
        }
    }

    async fn post(&self, url: &str, payload: &serde_json::Value) -> Result<String> {
        let token = self.tokens.access_token().await?;
        let client = &self.client;
        let token = token.as_str();
        let retry = self.retry.side_effecting();
        let created: IdResponse = http::with_retry(SERVICE, &retry, move || async move {
            let response = client
                .post(url)
                .bearer_auth(token)
                .json(payload)
                .send()
                .await
                .map_err(|e| http::transport_error(SERVICE, e))?;
            http::json_body(SERVICE, response).await
        })
        .await?;
        Ok(created.id)
    }
}

#[async_trait::async_trait]
impl MailTransport for GmailApi {
    async fn send_raw(&self, raw: &str) -> Result<String> {
        self.post(&format!("{}/messages/send", API_BASE), &json!({ "raw": raw }))
            .await
    }

    async fn draft_raw(&self, raw: &str) -> Result<String> {
        self.post(
            &format!("{}/drafts", API_BASE),
            &json!({ "message": { "raw": raw } }),
        )
        .await
    }
}

pub fn draft_url(draft_id: &str) -> String {
    format!("https://mail.google.com/mail/u/0/#drafts/{}", draft_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Delivery {
    pub recipient: String,
    pub status: DeliveryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Sends through a transport while enforcing the daily limit
pub struct Mailer<T: MailTransport> {
    transport: T,
    counter_path: PathBuf,
    daily_limit: u32,
    delay: Duration,
}

impl<T: MailTransport> Mailer<T> {
    pub fn new(transport: T, counter_path: &Path, daily_limit: u32, delay: Duration) -> Self {
        Self {
            transport,
            counter_path: counter_path.to_path_buf(),
            daily_limit,
            delay,
        }
    }

    fn counter(&self) -> Result<SentCounter> {
        SentCounter::load(&self.counter_path, Local::now().date_naive())
    }

    pub fn remaining_today(&self) -> Result<u32> {
        Ok(self.counter()?.remaining(self.daily_limit))
    }

    /// Send one message, returning its id
    pub async fn send(&self, message: &EmailMessage) -> Result<String> {
        let mut counter = self.counter()?;
        if counter.remaining(self.daily_limit) == 0 {
            return Err(Error::Api(ApiError::QuotaExhausted {
                service: SERVICE.to_string(),
                limit: self.daily_limit,
            }));
        }

        let raw = encode_raw(&build_mime(message, &new_boundary())?);
        let id = self.transport.send_raw(&raw).await?;
        counter.count += 1;
        counter.save(&self.counter_path)?;
        info!(
            "Sent email to {} ({}/{} today)",
            message.to, counter.count, self.daily_limit
        );
        Ok(id)
    }

    /// Create a draft and return a link to it. Drafts do not count against the limit.
    pub async fn draft(&self, message: &EmailMessage) -> Result<String> {
        let raw = encode_raw(&build_mime(message, &new_boundary())?);
        let id = self.transport.draft_raw(&raw).await?;
        info!("Created draft for {}", message.to);
        Ok(draft_url(&id))
    }

    /// Send `template` to each recipient in order, pausing between sends
    pub async fn campaign(
        &self,
        recipients: &[String],
        template: &EmailMessage,
    ) -> Result<Vec<Delivery>> {
        let mut results = Vec::with_capacity(recipients.len());

        for (i, recipient) in recipients.iter().enumerate() {
            if self.remaining_today()? == 0 {
                warn!("Daily limit of {} reached, skipping {}", self.daily_limit, recipient);
                results.push(Delivery {
                    recipient: recipient.clone(),
                    status: DeliveryStatus::Skipped,
                    message_id: None,
                    error: Some("daily limit reached".to_string()),
                });
                continue;
            }

            let delivery = match self.send(&template.to_recipient(recipient)).await {
                Ok(id) => Delivery {
                    recipient: recipient.clone(),
                    status: DeliveryStatus::Sent,
                    message_id: Some(id),
                    error: None,
                },
                Err(e) => {
                    warn!("Failed to send to {}: {}", recipient, e);
                    Delivery {
                        recipient: recipient.clone(),
                        status: DeliveryStatus::Failed,
                        message_id: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            let sent = delivery.status == DeliveryStatus::Sent;
            results.push(delivery);

            if sent && i + 1 < recipients.len() && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        Ok(results)
    }
}

fn new_boundary() -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("===============campaign_kit_{}==", nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MockTransport {
        sent: Mutex<Vec<String>>,
        fail_for: Option<String>,
    }

    #[async_trait::async_trait]
    impl MailTransport for MockTransport {
        async fn send_raw(&self, raw: &str) -> Result<String> {
            let mime = String::from_utf8(URL_SAFE.decode(raw).unwrap()).unwrap();
            if let Some(bad) = &self.fail_for {
                if mime.contains(&format!("To: {}\r\n", bad)) {
                    return Err(Error::Api(ApiError::Rejected {
                        service: SERVICE.to_string(),
                        status: 400,
                        details: "invalid recipient".to_string(),
                    }));
                }
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push(mime);
            Ok(format!("msg-{}", sent.len()))
        }

        async fn draft_raw(&self, _raw: &str) -> Result<String> {
            Ok("r-123".to_string())
        }
    }

    fn mailer(tmp: &TempDir, limit: u32, transport: MockTransport) -> Mailer<MockTransport> {
        Mailer::new(
            transport,
            &tmp.path().join("memory").join("gmail_sent_count.json"),
            limit,
            Duration::ZERO,
        )
    }

    #[test]
    fn test_build_mime_html_body() {
        let message = EmailMessage::new("a@example.com", "Launch", "<h1>Hi</h1>");
        let mime = build_mime(&message, "B").unwrap();
        assert!(mime.contains("To: a@example.com\r\n"));
        assert!(mime.contains("Subject: Launch\r\n"));
        assert!(mime.contains("multipart/mixed; boundary=\"B\""));
        assert!(mime.contains("Content-Type: text/html; charset=\"utf-8\""));
        assert!(mime.contains(&STANDARD.encode("<h1>Hi</h1>")));
        assert!(mime.ends_with("--B--\r\n"));
    }

    #[test]
    fn test_build_mime_plain_and_unicode_subject() {
        let message = EmailMessage::new("a@example.com", "Café", "hello").plain();
        let mime = build_mime(&message, "B").unwrap();
        assert!(mime.contains("Content-Type: text/plain"));
        assert!(mime.contains("Subject: =?UTF-8?B?"));
    }

    #[test]
    fn test_missing_attachment_skipped() {
        let tmp = TempDir::new().unwrap();
        let present = tmp.path().join("brief.txt");
        fs::write(&present, "attached").unwrap();
        let message = EmailMessage::new("a@example.com", "s", "b")
            .with_attachments(vec![present, tmp.path().join("gone.pdf")]);

        let mime = build_mime(&message, "B").unwrap();
        assert!(mime.contains("filename=\"brief.txt\""));
        assert!(!mime.contains("gone.pdf"));
        assert!(mime.contains(&STANDARD.encode("attached")));
    }

    #[test]
    fn test_header_line_breaks_rejected() {
        let message = EmailMessage::new("a@example.com", "Hello\r\nBcc: attacker@evil.test", "b");
        let err = build_mime(&message, "B").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let message = EmailMessage::new("a@example.com\nBcc: x@evil.test", "Hello", "b");
        assert!(build_mime(&message, "B").is_err());
    }

    #[tokio::test]
    async fn test_send_with_injected_subject_never_reaches_transport() {
        let tmp = TempDir::new().unwrap();
        let mailer = mailer(&tmp, 5, MockTransport::default());
        let message = EmailMessage::new("a@example.com", "Hi\nBcc: attacker@evil.test", "b");

        assert!(mailer.send(&message).await.is_err());
        assert!(mailer.draft(&message).await.is_err());
        assert!(mailer.transport.sent.lock().unwrap().is_empty());
        assert_eq!(mailer.remaining_today().unwrap(), 5);
    }

    #[test]
    fn test_encode_raw_is_url_safe() {
        let raw = encode_raw("Subject: ??>>\r\n\r\n\u{ff}\u{fe}");
        assert!(!raw.contains('+'));
        assert!(!raw.contains('/'));
        assert_eq!(
            String::from_utf8(URL_SAFE.decode(&raw).unwrap()).unwrap(),
            "Subject: ??>>\r\n\r\n\u{ff}\u{fe}"
        );
    }

    #[test]
    fn test_counter_resets_on_new_day() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("count.json");
        let day1 = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

        SentCounter { date: day1, count: 42 }.save(&path).unwrap();
        assert_eq!(SentCounter::load(&path, day1).unwrap().count, 42);
        assert_eq!(SentCounter::load(&path, day2).unwrap().count, 0);
        assert_eq!(SentCounter { date: day1, count: 42 }.remaining(40), 0);
    }

    #[tokio::test]
    async fn test_send_counts_and_enforces_limit() {
        let tmp = TempDir::new().unwrap();
        let mailer = mailer(&tmp, 1, MockTransport::default());
        let message = EmailMessage::new("a@example.com", "s", "b");

        assert_eq!(mailer.send(&message).await.unwrap(), "msg-1");
        assert_eq!(mailer.remaining_today().unwrap(), 0);

        let err = mailer.send(&message).await.unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::QuotaExhausted { limit: 1, .. })));
    }

    #[tokio::test]
    async fn test_draft_link() {
        let tmp = TempDir::new().unwrap();
        let mailer = mailer(&tmp, 5, MockTransport::default());
        let link = mailer
            .draft(&EmailMessage::new("a@example.com", "s", "b"))
            .await
            .unwrap();
        assert_eq!(link, "https://mail.google.com/mail/u/0/#drafts/r-123");
        assert_eq!(mailer.remaining_today().unwrap(), 5);
    }

    #[tokio::test]
    async fn test_campaign_statuses() {
        let tmp = TempDir::new().unwrap();
        let transport = MockTransport {
            fail_for: Some("bad@example.com".to_string()),
            ..Default::default()
        };
        let mailer = mailer(&tmp, 2, transport);
        let recipients: Vec<String> = ["a@example.com", "bad@example.com", "b@example.com", "c@example.com"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let results = mailer
            .campaign(&recipients, &EmailMessage::new("", "Offer", "Hello"))
            .await
            .unwrap();

        let statuses: Vec<DeliveryStatus> = results.iter().map(|d| d.status).collect();
        assert_eq!(
            statuses,
            vec![
                DeliveryStatus::Sent,
                DeliveryStatus::Failed,
                DeliveryStatus::Sent,
                DeliveryStatus::Skipped
            ]
        );
        assert!(results[1].error.as_deref().unwrap().contains("invalid recipient"));
        assert_eq!(results[2].message_id.as_deref(), Some("msg-2"));
    }

    #[test]
    fn test_delivery_serializes_lowercase() {
        let delivery = Delivery {
            recipient: "a@example.com".to_string(),
            status: DeliveryStatus::Skipped,
            message_id: None,
            error: None,
        };
        let value = serde_json::to_value(&delivery).unwrap();
        assert_eq!(value, json!({"recipient": "a@example.com", "status": "skipped"}));
    }
}
