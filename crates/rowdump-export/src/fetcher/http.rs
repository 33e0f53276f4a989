//! HTTP page fetcher for offset/limit list endpoints
//!
//! Speaks the json-server convention by default:
//! `GET /users?_start=400&_limit=200` returns a JSON array of row objects and
//! the `X-Total-Count` header carries the size of the whole collection.

use super::PageFetcher;
use crate::config::{ExportConfig, DEFAULT_LIMIT_PARAM, DEFAULT_OFFSET_PARAM, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::error::Result;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use rowdump_common::{Record, RowdumpError};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument};

/// Response header holding the collection size
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Fetches pages from a REST list endpoint
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
    url: String,
    offset_param: String,
    limit_param: String,
}

impl HttpPageFetcher {
    /// Create a fetcher for `url` with the default request timeout
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self::with_client(client, url))
    }

    /// Create a fetcher from the HTTP settings of an export configuration
    pub fn from_config(config: &ExportConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self::with_client(client, config.source_url.clone())
            .with_paging_params(config.offset_param.clone(), config.limit_param.clone()))
    }

    /// Use an existing client
    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            offset_param: DEFAULT_OFFSET_PARAM.to_string(),
            limit_param: DEFAULT_LIMIT_PARAM.to_string(),
        }
    }

    /// Rename the offset and limit query parameters
    pub fn with_paging_params(
        mut self,
        offset_param: impl Into<String>,
        limit_param: impl Into<String>,
    ) -> Self {
        self.offset_param = offset_param.into();
        self.limit_param = limit_param.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Read the collection size from `X-Total-Count` of a one-row request
    ///
    /// Returns `None` when the server does not send the header.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn probe_total(&self) -> Result<Option<u64>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[(self.offset_param.as_str(), 0u64), (self.limit_param.as_str(), 1u64)])
            .send()
            .await?
            .error_for_status()?;

        let Some(header) = response.headers().get(TOTAL_COUNT_HEADER) else {
            debug!("Server did not report a total count");
            return Ok(None);
        };

        let total = header
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| {
                RowdumpError::parse(format!("invalid {} header: {:?}", TOTAL_COUNT_HEADER, header))
            })?;

        debug!(total, "Server reported total count");
        Ok(Some(total))
    }

    /// Copy the raw response body of `GET url` into `writer`
    ///
    /// `on_progress(written, content_length)` is called after every chunk.
    /// Returns the number of bytes written.
    pub async fn stream_to<W>(
        &self,
        writer: &mut W,
        mut on_progress: impl FnMut(u64, Option<u64>),
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let response = self.client.get(&self.url).send().await?.error_for_status()?;
        let content_length = response.content_length();

        let mut written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
            on_progress(written, content_length);
        }
        writer.flush().await?;

        debug!(url = %self.url, bytes = written, "Streamed response body");
        Ok(written)
    }

    async fn get_records(&self, query: &[(&str, u64)]) -> Result<Vec<Record>> {
        let response = self
            .client
            .get(&self.url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;

        let rows: Vec<serde_json::Value> = response.json().await?;
        let records = rows
            .into_iter()
            .map(Record::from_value)
            .collect::<rowdump_common::Result<Vec<_>>>()?;

        Ok(records)
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self, offset: u64, limit: u64) -> Result<Vec<Record>> {
        let records = self
            .get_records(&[(self.offset_param.as_str(), offset), (self.limit_param.as_str(), limit)])
            .await?;

        debug!(records = records.len(), "Fetched page");
        Ok(records)
    }

    async fn total_count(&self) -> Result<Option<u64>> {
        self.probe_total().await
    }

    async fn fetch_all(&self) -> Result<Vec<Record>> {
        let records = self.get_records(&[]).await?;
        debug!(url = %self.url, records = records.len(), "Fetched whole dataset");
        Ok(records)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::ExportError;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn users_url(server: &MockServer) -> String {
        format!("{}/users", server.uri())
    }

    #[tokio::test]
    async fn test_fetch_sends_offset_and_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(query_param("_start", "400"))
            .and(query_param("_limit", "200"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 400, "name": "User 400"},
                {"id": 401, "name": "User 401"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(users_url(&server)).unwrap();
        let records = fetcher.fetch(400, 200).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].field_text("id"), "400");
        assert_eq!(records[1].keys().collect::<Vec<_>>(), vec!["id", "name"]);
    }

    #[tokio::test]
    async fn test_custom_paging_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("offset", "0"))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(users_url(&server))
            .unwrap()
            .with_paging_params("offset", "limit");
        assert!(fetcher.fetch(0, 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_a_fetch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(users_url(&server)).unwrap();
        let err = fetcher.fetch(0, 10).await.unwrap_err();
        assert!(matches!(err, ExportError::Http(_)));
    }

    #[tokio::test]
    async fn test_non_object_rows_are_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2, 3])))
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(users_url(&server)).unwrap();
        let err = fetcher.fetch(0, 3).await.unwrap_err();
        assert!(matches!(err, ExportError::Common(RowdumpError::Parse(_))));
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(users_url(&server)).unwrap();
        assert!(fetcher.fetch(0, 3).await.is_err());
    }

    #[tokio::test]
    async fn test_probe_total_reads_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("_start", "0"))
            .and(query_param("_limit", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-Total-Count", "1000")
                    .set_body_json(json!([{"id": 0}])),
            )
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(users_url(&server)).unwrap();
        assert_eq!(fetcher.probe_total().await.unwrap(), Some(1000));
        assert_eq!(fetcher.total_count().await.unwrap(), Some(1000));
    }

    #[tokio::test]
    async fn test_probe_total_without_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(users_url(&server)).unwrap();
        assert_eq!(fetcher.probe_total().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fetch_all_sends_no_paging_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(query_param_is_missing("_start"))
            .and(query_param_is_missing("_limit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(users_url(&server)).unwrap();
        assert_eq!(fetcher.fetch_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stream_to_copies_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("id,name\n1,a\n2,b"))
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(users_url(&server)).unwrap();
        let mut body = Vec::new();
        let mut last_progress = 0;
        let written = fetcher
            .stream_to(&mut body, |done, _| last_progress = done)
            .await
            .unwrap();

        assert_eq!(written, 15);
        assert_eq!(last_progress, 15);
        assert_eq!(String::from_utf8(body).unwrap(), "id,name\n1,a\n2,b");
    }
}
