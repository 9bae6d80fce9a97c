//! Fixture for the search index.

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, header};

use common::config::ElasticConfig;

use crate::error::FixtureError;

use super::{Fixture, read_file};

pub const DEFAULT_PORT: u16 = 9200;

/// Index settings used for every index the fixture creates.
const INDEX_SETTINGS: &str =
    r#"{"settings":{"index":{"number_of_shards":1,"number_of_replicas":1}}}"#;

/// Seeds a search index over its HTTP API.
///
/// `load` creates the index (when a mapping file is given) and bulk-loads
/// documents (when a data file is given, pre-formatted in the bulk-API
/// line format), followed by an explicit refresh so the documents are
/// searchable immediately. `unload` deletes the whole index. Every
/// response other than HTTP 200 raises [`FixtureError::UnexpectedStatus`]
/// with the status and body; there is no retry.
pub struct ElasticFixture {
    host: String,
    port: u16,
    index: String,
    doc_type: String,
    mapping_file: Option<PathBuf>,
    data_file: Option<PathBuf>,
    client: Client,
}

impl ElasticFixture {
    pub fn new(host: impl Into<String>, index: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            index: index.into(),
            doc_type: doc_type.into(),
            mapping_file: None,
            data_file: None,
            client: Client::new(),
        }
    }

    pub fn from_config(
        config: &ElasticConfig,
        index: impl Into<String>,
        doc_type: impl Into<String>,
    ) -> Self {
        Self::new(config.host.clone(), index, doc_type).with_port(config.port)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Mapping definition file; its presence makes `load` create the
    /// index first.
    pub fn with_mapping(mut self, path: impl Into<PathBuf>) -> Self {
        self.mapping_file = Some(path.into());
        self
    }

    /// Bulk-data file in the bulk-API line format.
    pub fn with_data(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = Some(path.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}:{}{}", self.host, self.port, path)
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<(String, &'static str)>,
    ) -> Result<(), FixtureError> {
        let mut request = self.client.request(method, self.url(path));
        if let Some((body, content_type)) = body {
            request = request.header(header::CONTENT_TYPE, content_type).body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(FixtureError::UnexpectedStatus {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Fixture for ElasticFixture {
    async fn load(&self) -> Result<(), FixtureError> {
        if let Some(mapping_file) = &self.mapping_file {
            self.request(
                Method::PUT,
                &format!("/{}", self.index),
                Some((INDEX_SETTINGS.to_string(), "application/json")),
            )
            .await?;

            let mapping = read_file(mapping_file).await?;
            self.request(
                Method::PUT,
                &format!("/{}/_mapping/{}", self.index, self.doc_type),
                Some((mapping, "application/json")),
            )
            .await?;
        }

        if let Some(data_file) = &self.data_file {
            let data = read_file(data_file).await?;
            self.request(
                Method::POST,
                "/_bulk",
                Some((data, "application/x-ndjson")),
            )
            .await?;
            self.request(Method::POST, "/_refresh", None).await?;
        }

        Ok(())
    }

    async fn unload(&self) -> Result<(), FixtureError> {
        self.request(Method::DELETE, &format!("/{}", self.index), None)
            .await
    }
}
