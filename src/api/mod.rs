//! Access to the Battwheels OS journal-entry endpoints.
//!
//! The `Backend` trait is the seam between command handlers and the server. `HttpBackend` talks
//! to a real deployment; `TestBackend` keeps everything in memory (persisted to a file) so that the
//! whole app can run top-to-bottom without a server.

mod context;
mod http;
mod test_backend;

pub use context::RequestContext;
pub(crate) use test_backend::TestBackend;

use crate::model::{AccountLedger, CreateJournalEntry, DateRange};
use crate::{Config, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// When this environment variable is set and non-empty the in-memory backend is used.
pub const TEST_MODE_ENV: &str = "BATTWHEELS_IN_TEST_MODE";

/// The header carrying the organization every request is made for.
pub const ORGANIZATION_HEADER: &str = "X-Organization-ID";

/// Operations the app needs from the Battwheels OS backend.
#[async_trait::async_trait]
pub trait Backend {
    /// `POST /api/journal-entries`
    async fn create_journal_entry(
        &mut self,
        ctx: &RequestContext,
        entry: &CreateJournalEntry,
    ) -> Result<CreatedEntry>;

    /// `GET /api/journal-entries/accounts/{account_id}/ledger`
    async fn account_ledger(
        &mut self,
        ctx: &RequestContext,
        account_id: &str,
        range: &DateRange,
    ) -> Result<AccountLedger>;

    /// Downloads an export file. The bytes are returned exactly as the server sent them.
    async fn export(
        &mut self,
        ctx: &RequestContext,
        format: ExportFormat,
        range: &DateRange,
    ) -> Result<Vec<u8>>;
}

/// Which backend implementation to use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Talk to the server at `api_url`.
    #[default]
    Http,
    /// Use the in-memory backend.
    Testing,
}

impl Mode {
    /// `Mode::Testing` when `BATTWHEELS_IN_TEST_MODE` is set and non-empty, otherwise `Mode::Http`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Testing,
            _ => Mode::Http,
        }
    }
}

/// Creates the backend for `mode`.
pub async fn backend(config: &Config, mode: Mode) -> Result<Box<dyn Backend + Send>> {
    debug!("Using the {mode:?} backend");
    match mode {
        Mode::Http => Ok(Box::new(http::HttpBackend::new(config.api_url().clone())?)),
        Mode::Testing => Ok(Box::new(
            TestBackend::load(config.test_backend_path()).await?,
        )),
    }
}

/// The export files the backend can produce.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma-separated journal lines.
    Csv,
    /// Tally voucher import XML.
    Tally,
}

serde_plain::derive_display_from_serialize!(ExportFormat);
serde_plain::derive_fromstr_from_deserialize!(ExportFormat);

impl ExportFormat {
    /// The last path segment of the export endpoint.
    pub fn endpoint(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tally => "tally-xml",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tally => "xml",
        }
    }
}

/// The parts of a successful create response that are worth showing.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedEntry {
    #[serde(
        default,
        alias = "id",
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub entry_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub reference_number: Option<String>,
}

/// Errors that come back from a backend call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never got a response.
    #[error("Network error, try again")]
    Network(#[source] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    /// The server answered 2xx but with a non-zero `code`.
    #[error("{message}")]
    Rejected { code: Option<i64>, message: String },

    /// A 2xx body that is not what was expected.
    #[error("Unable to decode the response")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    /// The text a user should see: `detail` or `message` from the server when it sent one.
    pub fn message(&self) -> String {
        match self {
            ApiError::Network(_) => "Network error, try again".to_string(),
            ApiError::Status { message, .. } | ApiError::Rejected { message, .. } => {
                message.clone()
            }
            ApiError::Decode(_) => "Unable to decode the response".to_string(),
        }
    }
}

/// Picks `detail` (a string, or any other JSON rendered as text) over `message` from an error
/// body.
pub(crate) fn envelope_message(body: &Value) -> Option<String> {
    let detail = match body.get("detail") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };
    detail.or_else(|| {
        body.get("message")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    })
}

/// Checks the `code` of a 2xx body. Anything but `0`, including a missing code, is a rejection.
pub(crate) fn check_code(body: &Value) -> std::result::Result<(), ApiError> {
    let code = body.get("code").and_then(Value::as_i64);
    if code == Some(0) {
        return Ok(());
    }
    let message = envelope_message(body).unwrap_or_else(|| match code {
        Some(code) => format!("The request was rejected with code {code}"),
        None => "The response did not include a code".to_string(),
    });
    Err(ApiError::Rejected { code, message })
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
