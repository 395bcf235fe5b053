//! Error types for campaign-kit
//!
//! One variant per failure domain:
//! - Brand kit store operations (lookup, persistence, validation)
//! - Template rendering (diagram and deck HTML)
//! - Deck descriptions (loading, validation)
//! - Hosted API calls (image, embeddings, vector index, drive, mail)
//! - File I/O (reading, writing, directories)
//! - Parsing of JSON/TOML payloads

use std::fmt;
use std::io;

/// Result type alias for campaign-kit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for campaign-kit
#[derive(Debug)]
pub enum Error {
    /// Brand kit store errors
    BrandKit(BrandKitError),
    /// Template rendering errors
    Template(TemplateError),
    /// Slide deck errors
    Deck(DeckError),
    /// Hosted API errors
    Api(ApiError),
    /// I/O errors
    Io(IoError),
    /// Malformed JSON or TOML payloads
    Parse { what: String, details: String },
    /// Caller supplied a value outside the accepted set
    InvalidArgument(String),
}

/// Brand kit store errors
#[derive(Debug)]
pub enum BrandKitError {
    /// No kit with this name; carries the closest existing name if any
    NotFound { name: String, suggestion: Option<String> },
    /// Kit name is empty or whitespace
    InvalidName(String),
    /// Store file exists but is not a valid kit mapping
    CorruptedStore { path: String, details: String },
}

/// Template rendering errors
#[derive(Debug)]
pub enum TemplateError {
    /// Template file does not exist
    NotFound(String),
    /// Diagram source file does not exist
    SourceNotFound(String),
}

/// Slide deck errors
#[derive(Debug)]
pub enum DeckError {
    /// Deck has no title
    MissingTitle,
    /// An image slide does not reference an image
    MissingImage { slide: usize },
}

/// Hosted API errors
#[derive(Debug)]
pub enum ApiError {
    /// HTTP request failed after it may have reached the server (timeout, reset)
    RequestFailed { service: String, source: String },
    /// Connection could not be established; the request never left
    ConnectFailed { service: String, source: String },
    /// Server refused the request as malformed (4xx other than 401/403/408/429)
    Rejected { service: String, status: u16, details: String },
    /// Response body could not be interpreted
    InvalidResponse { service: String, details: String },
    /// Rate limit exceeded (429 response)
    RateLimitExceeded { service: String, retry_after: Option<u64> },
    /// Credentials rejected (401/403)
    AuthenticationFailed(String),
    /// Service reported itself unavailable (5xx)
    ServiceUnavailable(String),
    /// API key or token cache not configured
    MissingCredential { service: String, hint: String },
    /// Caller-side limit reached before any request was made
    QuotaExhausted { service: String, limit: u32 },
}

/// File I/O errors
#[derive(Debug)]
pub enum IoError {
    /// Failed to read file
    FileReadFailed { path: String, source: io::Error },
    /// Failed to write file
    FileWriteFailed { path: String, source: io::Error },
    /// Failed to create directory
    DirectoryCreateFailed { path: String, source: io::Error },
    /// Other I/O error
    Other(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BrandKit(e) => write!(f, "Brand kit error: {}", e),
            Error::Template(e) => write!(f, "Template error: {}", e),
            Error::Deck(e) => write!(f, "Deck error: {}", e),
            Error::Api(e) => write!(f, "API error: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Parse { what, details } => {
                write!(f, "Parse error: invalid {}: {}", what, details)
            }
            Error::InvalidArgument(details) => write!(f, "Invalid argument: {}", details),
        }
    }
}

impl fmt::Display for BrandKitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrandKitError::NotFound { name, suggestion } => match suggestion {
                Some(close) => write!(
                    f,
                    "Brand kit '{}' not found (did you mean '{}'?)",
                    name, close
                ),
                None => write!(f, "Brand kit '{}' not found", name),
            },
            BrandKitError::InvalidName(name) => {
                write!(f, "Invalid brand kit name: '{}'", name)
            }
            BrandKitError::CorruptedStore { path, details } => {
                write!(f, "Brand kit store {} is corrupted: {}", path, details)
            }
        }
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::NotFound(path) => write!(f, "Template not found at {}", path),
            TemplateError::SourceNotFound(path) => {
                write!(f, "Mermaid file not found: {}", path)
            }
        }
    }
}

impl fmt::Display for DeckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeckError::MissingTitle => write!(f, "Deck has no title"),
            DeckError::MissingImage { slide } => {
                write!(f, "Slide {} requires an image path", slide)
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::RequestFailed { service, source } => {
                write!(f, "Request to {} failed: {}", service, source)
            }
            ApiError::ConnectFailed { service, source } => {
                write!(f, "Could not connect to {}: {}", service, source)
            }
            ApiError::Rejected {
                service,
                status,
                details,
            } => write!(f, "{} rejected the request (HTTP {}): {}", service, status, details),
            ApiError::InvalidResponse { service, details } => {
                write!(f, "Invalid response from {}: {}", service, details)
            }
            ApiError::RateLimitExceeded {
                service,
                retry_after,
            } => match retry_after {
                Some(seconds) => write!(
                    f,
                    "Rate limit exceeded for {} (retry after {} seconds)",
                    service, seconds
                ),
                None => write!(f, "Rate limit exceeded for {}", service),
            },
            ApiError::AuthenticationFailed(service) => {
                write!(f, "Authentication failed for {}", service)
            }
            ApiError::ServiceUnavailable(service) => {
                write!(f, "Service unavailable: {}", service)
            }
            ApiError::MissingCredential { service, hint } => {
                write!(f, "Missing credentials for {}: {}", service, hint)
            }
            ApiError::QuotaExhausted { service, limit } => {
                write!(f, "Daily {} limit reached ({})", service, limit)
            }
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::FileReadFailed { path, source } => {
                write!(f, "Failed to read {}: {}", path, source)
            }
            IoError::FileWriteFailed { path, source } => {
                write!(f, "Failed to write {}: {}", path, source)
            }
            IoError::DirectoryCreateFailed { path, source } => {
                write!(f, "Failed to create directory {}: {}", path, source)
            }
            IoError::Other(source) => write!(f, "{}", source),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(IoError::FileReadFailed { source, .. })
            | Error::Io(IoError::FileWriteFailed { source, .. })
            | Error::Io(IoError::DirectoryCreateFailed { source, .. })
            | Error::Io(IoError::Other(source)) => Some(source),
            _ => None,
        }
    }
}

impl std::error::Error for BrandKitError {}
impl std::error::Error for TemplateError {}
impl std::error::Error for DeckError {}
impl std::error::Error for ApiError {}
impl std::error::Error for IoError {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(IoError::Other(err))
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        Error::Api(err)
    }
}

impl From<BrandKitError> for Error {
    fn from(err: BrandKitError) -> Self {
        Error::BrandKit(err)
    }
}

impl Error {
    /// Wrap a read failure with the offending path
    pub fn read(path: &std::path::Path, source: io::Error) -> Self {
        Error::Io(IoError::FileReadFailed {
            path: path.display().to_string(),
            source,
        })
    }

    /// Wrap a write failure with the offending path
    pub fn write(path: &std::path::Path, source: io::Error) -> Self {
        Error::Io(IoError::FileWriteFailed {
            path: path.display().to_string(),
            source,
        })
    }

    /// Wrap a directory creation failure with the offending path
    pub fn create_dir(path: &std::path::Path, source: io::Error) -> Self {
        Error::Io(IoError::DirectoryCreateFailed {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn parse(what: impl Into<String>, details: impl fmt::Display) -> Self {
        Error::Parse {
            what: what.into(),
            details: details.to_string(),
        }
    }

    /// Check if error is retryable (network issues, rate limits, outages)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Api(ApiError::RequestFailed { .. })
                | Error::Api(ApiError::ConnectFailed { .. })
                | Error::Api(ApiError::RateLimitExceeded { .. })
                | Error::Api(ApiError::ServiceUnavailable(_))
        )
    }

    /// Check if the server cannot have acted on the request, so a
    /// non-idempotent call (send, upload, create) may be repeated
    pub fn is_safe_to_resend(&self) -> bool {
        matches!(
            self,
            Error::Api(ApiError::ConnectFailed { .. })
                | Error::Api(ApiError::RateLimitExceeded { .. })
        )
    }

    /// Check if error is fatal (bad credentials, corrupted store)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::BrandKit(BrandKitError::CorruptedStore { .. })
                | Error::Api(ApiError::AuthenticationFailed(_))
                | Error::Api(ApiError::MissingCredential { .. })
        )
    }

    /// Server-suggested wait before the next attempt, if any
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Error::Api(ApiError::RateLimitExceeded { retry_after, .. }) => *retry_after,
            _ => None,
        }
    }

    /// Get formatted context string for logging
    pub fn context(&self) -> String {
        match self {
            Error::BrandKit(e) => format!("brand-kit: {}", e),
            Error::Template(e) => format!("template: {}", e),
            Error::Deck(e) => format!("deck: {}", e),
            Error::Api(e) => format!("api: {}", e),
            Error::Io(e) => format!("io: {}", e),
            Error::Parse { what, details } => format!("parse: {}: {}", what, details),
            Error::InvalidArgument(details) => format!("argument: {}", details),
        }
    }
}
