//! Thin REST client for an OpenSearch-compatible cluster

use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;

use crate::config::ClusterConfig;
use crate::error::{SearchError, SearchResult};

pub struct ClusterClient {
    http: reqwest::Client,
    base: Url,
    username: Option<String>,
    password: Option<String>,
}

impl ClusterClient {
    pub fn new(config: &ClusterConfig) -> SearchResult<Self> {
        let raw = config
            .url
            .as_deref()
            .ok_or_else(|| SearchError::Configuration("cluster.url is not set".to_string()))?;
        let base = Url::parse(raw)
            .map_err(|e| SearchError::Configuration(format!("invalid cluster url {:?}: {}", raw, e)))?;
        if base.cannot_be_a_base() {
            return Err(SearchError::Configuration(format!("invalid cluster url {:?}", raw)));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| SearchError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn url(&self, segments: &[&str]) -> SearchResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SearchError::Configuration(format!("invalid cluster url {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_ref()),
            None => builder,
        }
    }

    pub async fn index_exists(&self, index: &str) -> SearchResult<bool> {
        let resp = self.request(Method::HEAD, self.url(&[index])?).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            s => Err(SearchError::Indexing(format!("HEAD {} returned {}", index, s))),
        }
    }

    /// Create an index. An index that already exists counts as created.
    pub async fn create_index(&self, index: &str, body: &Value) -> SearchResult<()> {
        let resp = self
            .request(Method::PUT, self.url(&[index])?)
            .json(body)
            .send()
            .await?;
        if resp.status().is_success() {
            tracing::info!("Created index {}", index);
            return Ok(());
        }
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if text.contains("resource_already_exists_exception") {
            tracing::debug!("Index {} already exists", index);
            return Ok(());
        }
        Err(SearchError::Configuration(format!(
            "failed to create index {}: {} {}",
            index, status, text
        )))
    }

    /// Delete an index. A missing index is not an error.
    pub async fn delete_index(&self, index: &str) -> SearchResult<()> {
        let resp = self.request(Method::DELETE, self.url(&[index])?).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        expect_success(resp, SearchError::Indexing).await?;
        Ok(())
    }

    pub async fn get_mapping(&self, index: &str) -> SearchResult<Value> {
        let resp = self
            .request(Method::GET, self.url(&[index, "_mapping"])?)
            .send()
            .await?;
        Ok(expect_success(resp, SearchError::Configuration).await?.json().await?)
    }

    pub async fn put_pipeline(&self, name: &str, body: &Value) -> SearchResult<()> {
        let resp = self
            .request(Method::PUT, self.url(&["_search", "pipeline", name])?)
            .json(body)
            .send()
            .await?;
        expect_success(resp, SearchError::Configuration).await?;
        Ok(())
    }

    pub async fn put_document(&self, index: &str, id: &str, body: &Value, refresh: bool) -> SearchResult<()> {
        let mut url = self.url(&[index, "_doc", id])?;
        if refresh {
            url.query_pairs_mut().append_pair("refresh", "true");
        }
        let resp = self.request(Method::PUT, url).json(body).send().await?;
        expect_success(resp, SearchError::Indexing).await?;
        Ok(())
    }

    /// The document's `_source`, or `None` when it (or its index) is missing
    pub async fn get_document(&self, index: &str, id: &str) -> SearchResult<Option<Value>> {
        let resp = self
            .request(Method::GET, self.url(&[index, "_doc", id])?)
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: Value = expect_success(resp, SearchError::Query).await?.json().await?;
        Ok(body.get("_source").cloned())
    }

    /// Returns whether the document existed
    pub async fn delete_document(&self, index: &str, id: &str, refresh: bool) -> SearchResult<bool> {
        let mut url = self.url(&[index, "_doc", id])?;
        if refresh {
            url.query_pairs_mut().append_pair("refresh", "true");
        }
        let resp = self.request(Method::DELETE, url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        expect_success(resp, SearchError::Indexing).await?;
        Ok(true)
    }

    pub async fn search(&self, index: &str, body: &Value, pipeline: Option<&str>) -> SearchResult<Value> {
        let mut url = self.url(&[index, "_search"])?;
        if let Some(pipeline) = pipeline {
            url.query_pairs_mut().append_pair("search_pipeline", pipeline);
        }
        let resp = self.request(Method::POST, url).json(body).send().await?;
        Ok(expect_success(resp, SearchError::Query).await?.json().await?)
    }

    /// Documents in an index; zero when the index does not exist
    pub async fn count(&self, index: &str) -> SearchResult<usize> {
        let resp = self
            .request(Method::GET, self.url(&[index, "_count"])?)
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(0);
        }
        let body: Value = expect_success(resp, SearchError::Query).await?.json().await?;
        Ok(body.get("count").and_then(Value::as_u64).unwrap_or(0) as usize)
    }
}

/// Turn a non-2xx response into the given error kind, body included
async fn expect_success(resp: Response, kind: fn(String) -> SearchError) -> SearchResult<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let url = resp.url().path().to_string();
    let text = resp.text().await.unwrap_or_default();
    Err(kind(format!("{} returned {}: {}", url, status, text)))
}
