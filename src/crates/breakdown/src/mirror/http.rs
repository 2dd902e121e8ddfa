//! HTTP mirror sink
//!
//! POSTs the complete row set as JSON to a spreadsheet bridge endpoint:
//! `{"headers": [...], "rows": [[...], ...]}`. Any non-2xx response counts as
//! a failed sync.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{MirrorError, MirrorSink};

#[derive(Serialize)]
struct ReplaceAllBody<'a> {
    headers: &'a [&'a str],
    rows: &'a [Vec<String>],
}

/// Mirror sink posting rows to an HTTP endpoint
#[derive(Clone)]
pub struct HttpMirrorSink {
    endpoint: String,
    token: Option<String>,
    client: Client,
}

impl HttpMirrorSink {
    /// Create a new sink
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, MirrorError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            token,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MirrorSink for HttpMirrorSink {
    async fn replace_all(&self, headers: &[&str], rows: &[Vec<String>]) -> Result<(), MirrorError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&ReplaceAllBody { headers, rows });
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MirrorError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
