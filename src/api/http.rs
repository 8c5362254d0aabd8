//! Implements the `Backend` trait over HTTP using `reqwest`.

use crate::api::{
    check_code, envelope_message, ApiError, Backend, CreatedEntry, ExportFormat, RequestContext,
    ORGANIZATION_HEADER,
};
use crate::model::{AccountLedger, CreateJournalEntry, DateRange};
use crate::Result;
use anyhow::{anyhow, Context};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

const TIMEOUT: Duration = Duration::from_secs(30);
const JOURNAL_ENTRIES: [&str; 2] = ["api", "journal-entries"];

/// Talks to a Battwheels OS deployment at `base`.
pub(super) struct HttpBackend {
    client: reqwest::Client,
    base: Url,
}

impl HttpBackend {
    pub(super) fn new(base: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(TIMEOUT)
            .build()
            .context("Unable to create the HTTP client")?;
        Ok(Self { client, base })
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("The API URL '{}' cannot have a path", self.base))?
            .pop_if_empty()
            .extend(JOURNAL_ENTRIES)
            .extend(segments);
        Ok(url)
    }

    /// Adds the auth and organization headers, sends, and reads the whole body.
    async fn send(
        &self,
        ctx: &RequestContext,
        request: RequestBuilder,
    ) -> std::result::Result<(StatusCode, Vec<u8>), ApiError> {
        let response = request
            .bearer_auth(ctx.token())
            .header(ORGANIZATION_HEADER, ctx.organization_id())
            .send()
            .await
            .map_err(ApiError::Network)?;
        let status = response.status();
        let body = response.bytes().await.map_err(ApiError::Network)?;
        debug!("Received HTTP {} with {} bytes", status.as_u16(), body.len());
        Ok((status, body.to_vec()))
    }

    /// Sends a request whose response is a `{code, ...}` JSON object and decodes it as `T`.
    async fn send_json<T>(
        &self,
        ctx: &RequestContext,
        request: RequestBuilder,
    ) -> std::result::Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let (status, body) = self.send(ctx, request).await?;
        check_status(status, &body)?;
        let value: Value = serde_json::from_slice(&body).map_err(ApiError::Decode)?;
        check_code(&value)?;
        serde_json::from_value(value).map_err(ApiError::Decode)
    }
}

/// Turns a non-2xx response into `ApiError::Status`.
fn check_status(status: StatusCode, body: &[u8]) -> std::result::Result<(), ApiError> {
    if status.is_success() {
        return Ok(());
    }
    let message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| envelope_message(&value))
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn create_journal_entry(
        &mut self,
        ctx: &RequestContext,
        entry: &CreateJournalEntry,
    ) -> Result<CreatedEntry> {
        let url = self.endpoint(&[])?;
        trace!("POST {url}");
        let request = self.client.post(url).json(entry);
        Ok(self.send_json(ctx, request).await?)
    }

    async fn account_ledger(
        &mut self,
        ctx: &RequestContext,
        account_id: &str,
        range: &DateRange,
    ) -> Result<AccountLedger> {
        let mut url = self.endpoint(&["accounts", account_id, "ledger"])?;
        url.query_pairs_mut()
            .append_pair("start_date", &range.start_param())
            .append_pair("end_date", &range.end_param());
        trace!("GET {url}");
        let request = self.client.get(url);
        Ok(self.send_json(ctx, request).await?)
    }

    async fn export(
        &mut self,
        ctx: &RequestContext,
        format: ExportFormat,
        range: &DateRange,
    ) -> Result<Vec<u8>> {
        let mut url = self.endpoint(&["export", format.endpoint()])?;
        url.query_pairs_mut()
            .append_pair("date_from", &range.start_param())
            .append_pair("date_to", &range.end_param());
        trace!("GET {url}");
        let request = self.client.get(url);
        let (status, body) = self.send(ctx, request).await?;
        check_status(status, &body)?;
        Ok(body)
    }
}
