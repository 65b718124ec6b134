//! Weaviate hybrid search over the GraphQL API.

use super::{GuestFilter, Retriever, SearchHit};
use crate::config::RetrievalSettings;
use crate::embedding::Embedder;
use crate::error::{PodqueryError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Client for a Weaviate cluster.
pub struct WeaviateClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    openai_api_key: Option<String>,
    alpha: f32,
    limit: usize,
    query_properties: Vec<String>,
    return_properties: Vec<String>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl WeaviateClient {
    /// Create a client from retrieval settings.
    pub fn new(settings: &RetrievalSettings) -> Result<Self> {
        let endpoint = settings.endpoint.clone().ok_or_else(|| {
            PodqueryError::Config(
                "Weaviate endpoint not set. Set WEAVIATE_ENDPOINT or retrieval.endpoint".to_string(),
            )
        })?;
        let parsed = url::Url::parse(&endpoint)
            .map_err(|e| PodqueryError::Config(format!("Invalid Weaviate endpoint {}: {}", endpoint, e)))?;

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| PodqueryError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: parsed.as_str().trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            openai_api_key: None,
            alpha: settings.alpha,
            limit: settings.limit,
            query_properties: settings.query_properties.clone(),
            return_properties: settings.return_properties.clone(),
            embedder: None,
        })
    }

    /// Forward an OpenAI key so server-side vectorizer modules can embed the query.
    pub fn with_openai_key(mut self, key: Option<String>) -> Self {
        self.openai_api_key = key;
        self
    }

    /// Embed queries client-side and send the vector with the hybrid query.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    fn graphql_url(&self) -> String {
        format!("{}/v1/graphql", self.endpoint)
    }
}

#[async_trait]
impl Retriever for WeaviateClient {
    #[instrument(skip(self, filter))]
    async fn hybrid_search(
        &self,
        query: &str,
        collection: &str,
        filter: &GuestFilter,
    ) -> Result<Vec<SearchHit>> {
        if let Some(guest) = filter.guest() {
            info!("Guest filter '{}' is not applied to retrieval", guest);
        }

        let vector = match &self.embedder {
            Some(embedder) => Some(embedder.embed(query).await?),
            None => None,
        };

        let graphql = build_hybrid_query(
            collection,
            query,
            self.alpha,
            vector.as_deref(),
            &self.query_properties,
            &self.return_properties,
            self.limit,
        )?;
        debug!("Weaviate query: {}", graphql);

        let mut request = self
            .http
            .post(self.graphql_url())
            .json(&serde_json::json!({ "query": graphql }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        if let Some(key) = &self.openai_api_key {
            request = request.header("X-OpenAI-Api-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PodqueryError::Retrieval(format!("Failed to reach Weaviate: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PodqueryError::Retrieval(format!(
                "Weaviate returned {}: {}",
                status, body
            )));
        }

        let body: GraphQlResponse = response.json().await.map_err(|e| {
            PodqueryError::Retrieval(format!("Failed to parse Weaviate response: {}", e))
        })?;

        let hits = parse_hits(body, collection)?;
        info!("Hybrid search returned {} hits", hits.len());
        Ok(hits)
    }
}

fn is_identifier(pattern: &str, name: &str) -> Result<bool> {
    let pattern = Regex::new(pattern)
        .map_err(|e| PodqueryError::Retrieval(format!("Invalid identifier pattern: {}", e)))?;
    Ok(pattern.is_match(name))
}

/// Collection names are spliced into GraphQL and must be valid class identifiers.
fn validate_collection(collection: &str) -> Result<()> {
    if is_identifier(r"^[A-Z][_0-9A-Za-z]*$", collection)? {
        Ok(())
    } else {
        Err(PodqueryError::Retrieval(format!(
            "Invalid collection name: {:?}",
            collection
        )))
    }
}

fn validate_property(property: &str) -> Result<()> {
    if is_identifier(r"^[_A-Za-z][_0-9A-Za-z]*$", property)? {
        Ok(())
    } else {
        Err(PodqueryError::Retrieval(format!(
            "Invalid property name: {:?}",
            property
        )))
    }
}

/// Build the GraphQL `Get` query using the `hybrid` operator.
pub(crate) fn build_hybrid_query(
    collection: &str,
    query: &str,
    alpha: f32,
    vector: Option<&[f32]>,
    query_properties: &[String],
    return_properties: &[String],
    limit: usize,
) -> Result<String> {
    validate_collection(collection)?;
    for property in query_properties.iter().chain(return_properties) {
        validate_property(property)?;
    }

    // JSON string literals are valid GraphQL string literals.
    let query_literal = serde_json::to_string(query)?;

    let mut hybrid = format!("query: {}, alpha: {}", query_literal, alpha);
    if !query_properties.is_empty() {
        let props = query_properties
            .iter()
            .map(|p| format!("\"{}\"", p))
            .collect::<Vec<_>>()
            .join(", ");
        hybrid.push_str(&format!(", properties: [{}]", props));
    }
    if let Some(vector) = vector {
        let values = vector
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        hybrid.push_str(&format!(", vector: [{}]", values));
    }

    Ok(format!(
        "{{ Get {{ {}(hybrid: {{ {} }}, limit: {}) {{ {} _additional {{ score }} }} }} }}",
        collection,
        hybrid,
        limit,
        return_properties.join(" ")
    ))
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

fn parse_hits(body: GraphQlResponse, collection: &str) -> Result<Vec<SearchHit>> {
    if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
        let messages = errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(PodqueryError::Retrieval(format!("Weaviate query failed: {}", messages)));
    }

    let objects = body
        .data
        .as_ref()
        .and_then(|d| d.get("Get"))
        .and_then(|g| g.get(collection))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            PodqueryError::Retrieval(format!("Response has no results for collection {}", collection))
        })?;

    objects
        .iter()
        .map(|obj| {
            obj.as_object()
                .ok_or_else(|| PodqueryError::Retrieval("Hit is not an object".to_string()))
                .and_then(hit_from_object)
        })
        .collect()
}

fn hit_from_object(obj: &Map<String, Value>) -> Result<SearchHit> {
    let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

    let content = text("content")
        .ok_or_else(|| PodqueryError::Retrieval("Hit is missing its content".to_string()))?;

    let length = match obj.get("length") {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .unwrap_or(0),
        _ => 0,
    };

    let score = obj
        .get("_additional")
        .and_then(|a| a.get("score"))
        .and_then(|s| match s {
            Value::String(s) => s.parse::<f32>().ok(),
            Value::Number(n) => n.as_f64().map(|f| f as f32),
            _ => None,
        })
        .unwrap_or_else(|| {
            warn!("Hit without a parseable score; using 0");
            0.0
        });

    Ok(SearchHit {
        content,
        title: text("title").unwrap_or_default(),
        guest: text("guest").unwrap_or_default(),
        episode_url: text("episode_url").unwrap_or_default(),
        thumbnail_url: text("thumbnail_url").unwrap_or_default(),
        length,
        score,
        doc_id: text("doc_id"),
        video_id: text("video_id"),
        episode_num: obj
            .get("episode_num")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok()),
        summary: text("summary"),
    })
}
