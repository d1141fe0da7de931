//! Pinecone data-plane client. The single point of entry for vector index traffic.
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{Metadata, Namespace, QueryMatch, VectorRecord, VectorStore, VectorStoreError};

const API_VERSION: &str = "2024-07";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id: &'a str,
    set_metadata: &'a Metadata,
    namespace: &'a str,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    namespace: &'a str,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    ids: [&'a str; 1],
    namespace: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, VectorRecord>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct PineconeError {
    message: String,
}

/// HTTP client for one Pinecone index host.
#[derive(Clone)]
pub struct PineconeClient {
    client: Client,
    host: String,
    api_key: String,
}

impl PineconeClient {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Result<Self, VectorStoreError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            host: normalize_host(&host.into()),
            api_key: api_key.into(),
        })
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.host, path)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, VectorStoreError> {
        let response = self
            .request(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await?;
        read_json(response).await
    }
}

#[async_trait]
impl VectorStore for PineconeClient {
    async fn fetch(
        &self,
        namespace: Namespace,
        ids: &[String],
    ) -> Result<HashMap<String, VectorRecord>, VectorStoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", id.as_str())).collect();
        query.push(("namespace", namespace.as_str()));

        let response = self
            .request(self.client.get(self.url("vectors/fetch")))
            .query(&query)
            .send()
            .await?;
        let body: FetchResponse = read_json(response).await?;

        debug!(
            "Fetched {} of {} vectors from namespace {namespace}",
            body.vectors.len(),
            ids.len()
        );
        Ok(body.vectors)
    }

    async fn update(
        &self,
        namespace: Namespace,
        id: &str,
        metadata: Metadata,
    ) -> Result<(), VectorStoreError> {
        let _: Value = self
            .post(
                "vectors/update",
                &UpdateRequest {
                    id,
                    set_metadata: &metadata,
                    namespace: namespace.as_str(),
                },
            )
            .await?;
        Ok(())
    }

    async fn upsert(
        &self,
        namespace: Namespace,
        records: Vec<VectorRecord>,
    ) -> Result<(), VectorStoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let _: Value = self
            .post(
                "vectors/upsert",
                &UpsertRequest {
                    vectors: &records,
                    namespace: namespace.as_str(),
                },
            )
            .await?;
        debug!("Upserted {} vectors into namespace {namespace}", records.len());
        Ok(())
    }

    async fn delete_one(&self, namespace: Namespace, id: &str) -> Result<(), VectorStoreError> {
        let _: Value = self
            .post(
                "vectors/delete",
                &DeleteRequest {
                    ids: [id],
                    namespace: namespace.as_str(),
                },
            )
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        namespace: Namespace,
        vector: &[f32],
        top_k: usize,
        filter: Option<Value>,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>, VectorStoreError> {
        let body: QueryResponse = self
            .post(
                "query",
                &QueryRequest {
                    namespace: namespace.as_str(),
                    vector,
                    top_k,
                    filter,
                    include_metadata,
                    include_values: false,
                },
            )
            .await?;
        Ok(body.matches)
    }
}

/// Pinecone answers `{}` for update/delete, so an empty body is parsed as an empty object.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, VectorStoreError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<PineconeError>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        return Err(VectorStoreError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
    Ok(serde_json::from_str(body)?)
}

/// Accepts hosts with or without scheme and strips trailing slashes.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}
