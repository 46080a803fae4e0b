//! In-process fake of the cluster REST surface the clustered backend uses.
//!
//! Scoring is naive token overlap, which is enough to check filtering,
//! bucketing and document bookkeeping without a real cluster.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use switchboard_search::{EmbeddingProvider, SearchError, SearchResult};

#[derive(Default)]
struct Index {
    mappings: Value,
    docs: BTreeMap<String, Value>,
}

/// A search request as the fake saw it
#[derive(Debug, Clone)]
pub struct RecordedSearch {
    pub index: String,
    pub query_string: String,
    pub body: Value,
}

#[derive(Default)]
pub struct ClusterState {
    indices: Mutex<HashMap<String, Index>>,
    pipelines: Mutex<HashMap<String, Value>>,
    searches: Mutex<Vec<RecordedSearch>>,
    failing: AtomicBool,
}

pub struct FakeCluster {
    pub url: String,
    state: Arc<ClusterState>,
}

impl FakeCluster {
    pub async fn start() -> Self {
        let state = Arc::new(ClusterState::default());
        let router = Router::new().fallback(handle).with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    /// Answer every request with a 500
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    pub fn create_index(&self, name: &str, mappings: Value) {
        self.state.indices.lock().unwrap().insert(
            name.to_string(),
            Index {
                mappings,
                docs: BTreeMap::new(),
            },
        );
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.state.indices.lock().unwrap().contains_key(name)
    }

    pub fn mapping(&self, name: &str) -> Option<Value> {
        self.state
            .indices
            .lock()
            .unwrap()
            .get(name)
            .map(|i| i.mappings.clone())
    }

    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        self.state
            .indices
            .lock()
            .unwrap()
            .get(index)
            .and_then(|i| i.docs.get(id).cloned())
    }

    pub fn remove_document(&self, index: &str, id: &str) {
        if let Some(i) = self.state.indices.lock().unwrap().get_mut(index) {
            i.docs.remove(id);
        }
    }

    pub fn doc_count(&self, index: &str) -> usize {
        self.state
            .indices
            .lock()
            .unwrap()
            .get(index)
            .map_or(0, |i| i.docs.len())
    }

    pub fn pipeline(&self, name: &str) -> Option<Value> {
        self.state.pipelines.lock().unwrap().get(name).cloned()
    }

    pub fn searches(&self) -> Vec<RecordedSearch> {
        self.state.searches.lock().unwrap().clone()
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
        .map(str::to_lowercase)
        .collect()
}

fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

async fn handle(State(state): State<Arc<ClusterState>>, method: Method, uri: Uri, body: Bytes) -> Response {
    if state.failing.load(Ordering::SeqCst) {
        return reply(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "injected failure"}));
    }

    let segments: Vec<String> = uri
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .map(percent_decode)
        .collect();
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let query_string = uri.query().unwrap_or("").to_string();

    let mut indices = state.indices.lock().unwrap();
    match (method.as_str(), segments.as_slice()) {
        ("PUT", ["_search", "pipeline", name]) => {
            state.pipelines.lock().unwrap().insert(name.to_string(), body);
            reply(StatusCode::OK, json!({"acknowledged": true}))
        }
        ("HEAD", [index]) => {
            let status = if indices.contains_key(*index) {
                StatusCode::OK
            } else {
                StatusCode::NOT_FOUND
            };
            status.into_response()
        }
        ("PUT", [index]) => {
            if indices.contains_key(*index) {
                return reply(
                    StatusCode::BAD_REQUEST,
                    json!({"error": {"type": "resource_already_exists_exception"}, "status": 400}),
                );
            }
            indices.insert(
                index.to_string(),
                Index {
                    mappings: body.get("mappings").cloned().unwrap_or(Value::Null),
                    docs: BTreeMap::new(),
                },
            );
            reply(StatusCode::OK, json!({"acknowledged": true, "index": index}))
        }
        ("DELETE", [index]) => match indices.remove(*index) {
            Some(_) => reply(StatusCode::OK, json!({"acknowledged": true})),
            None => reply(StatusCode::NOT_FOUND, json!({"error": {"type": "index_not_found_exception"}})),
        },
        ("GET", [index, "_mapping"]) => match indices.get(*index) {
            Some(i) => {
                let mut response = serde_json::Map::new();
                response.insert(index.to_string(), json!({ "mappings": i.mappings }));
                reply(StatusCode::OK, Value::Object(response))
            }
            None => reply(StatusCode::NOT_FOUND, json!({"error": {"type": "index_not_found_exception"}})),
        },
        ("GET", [index, "_count"]) => match indices.get(*index) {
            Some(i) => reply(StatusCode::OK, json!({"count": i.docs.len()})),
            None => reply(StatusCode::NOT_FOUND, json!({"error": {"type": "index_not_found_exception"}})),
        },
        ("PUT", [index, "_doc", id]) => {
            let entry = indices.entry(index.to_string()).or_default();
            let created = entry.docs.insert(id.to_string(), body).is_none();
            let (status, result) = if created {
                (StatusCode::CREATED, "created")
            } else {
                (StatusCode::OK, "updated")
            };
            reply(status, json!({"_id": id, "result": result}))
        }
        ("GET", [index, "_doc", id]) => match indices.get(*index).and_then(|i| i.docs.get(*id)) {
            Some(doc) => reply(StatusCode::OK, json!({"_id": id, "found": true, "_source": doc})),
            None => reply(StatusCode::NOT_FOUND, json!({"_id": id, "found": false})),
        },
        ("DELETE", [index, "_doc", id]) => match indices.get_mut(*index).and_then(|i| i.docs.remove(*id)) {
            Some(_) => reply(StatusCode::OK, json!({"_id": id, "result": "deleted"})),
            None => reply(StatusCode::NOT_FOUND, json!({"_id": id, "result": "not_found"})),
        },
        ("POST", [index, "_search"]) | ("GET", [index, "_search"]) => {
            state.searches.lock().unwrap().push(RecordedSearch {
                index: index.to_string(),
                query_string,
                body: body.clone(),
            });
            match indices.get(*index) {
                Some(i) => reply(StatusCode::OK, search(i, &body)),
                None => reply(StatusCode::NOT_FOUND, json!({"error": {"type": "index_not_found_exception"}})),
            }
        }
        _ => reply(StatusCode::BAD_REQUEST, json!({"error": "unsupported by fake cluster"})),
    }
}

fn push_term(terms: &mut Vec<(String, Value)>, term: &Value) {
    if let Some((field, value)) = term.as_object().and_then(|o| o.iter().next()) {
        terms.push((field.clone(), value.clone()));
    }
}

/// Term filters and optional free text of a bool, term or hybrid query
fn parse_query(query: &Value) -> (Option<String>, Vec<(String, Value)>) {
    let query = query.pointer("/hybrid/queries/0").unwrap_or(query);
    let mut terms = Vec::new();

    if let Some(term) = query.get("term") {
        push_term(&mut terms, term);
        return (None, terms);
    }

    let text = query
        .pointer("/bool/must/0/multi_match/query")
        .and_then(Value::as_str)
        .map(str::to_string);
    if let Some(filters) = query.pointer("/bool/filter").and_then(Value::as_array) {
        for filter in filters {
            if let Some(term) = filter.get("term") {
                push_term(&mut terms, term);
            }
        }
    }
    (text, terms)
}

fn matches_term(doc: &Value, field: &str, expected: &Value) -> bool {
    match doc.get(field) {
        Some(Value::Array(items)) => items.contains(expected),
        Some(actual) => actual == expected,
        None => false,
    }
}

fn search(index: &Index, body: &Value) -> Value {
    let (text, terms) = parse_query(body.get("query").unwrap_or(&Value::Null));
    let size = body.get("size").and_then(Value::as_u64).unwrap_or(10) as usize;
    let query_tokens = text.as_deref().map(tokens);

    let mut hits: Vec<(f64, &String, &Value)> = index
        .docs
        .iter()
        .filter(|(_, doc)| terms.iter().all(|(f, v)| matches_term(doc, f, v)))
        .filter_map(|(id, doc)| {
            let Some(query_tokens) = &query_tokens else {
                return Some((1.0, id, doc));
            };
            let searchable = ["name", "description", "text_for_embedding"]
                .iter()
                .filter_map(|f| doc.get(*f).and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(" ");
            let mut doc_tokens = tokens(&searchable);
            if let Some(tags) = doc.get("tags").and_then(Value::as_array) {
                doc_tokens.extend(tags.iter().filter_map(Value::as_str).map(str::to_lowercase));
            }
            let overlap = query_tokens.intersection(&doc_tokens).count();
            (overlap > 0).then_some((overlap as f64, id, doc))
        })
        .collect();

    hits.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap().then_with(|| a.1.cmp(b.1)));
    hits.truncate(size);

    let hits: Vec<Value> = hits
        .into_iter()
        .map(|(score, id, doc)| {
            let mut source = doc.clone();
            if let Some(obj) = source.as_object_mut() {
                obj.remove("embedding");
            }
            json!({"_id": id, "_score": score, "_source": source})
        })
        .collect();
    json!({"hits": {"total": {"value": hits.len()}, "hits": hits}})
}

/// Provider whose every call fails
pub struct FailingEmbedder {
    pub dimension: usize,
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn encode(&self, _texts: &[String]) -> SearchResult<Vec<Vec<f32>>> {
        Err(SearchError::Embedding("embedding service unavailable".to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}
