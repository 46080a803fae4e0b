//! Request bodies and response parsing for the cluster REST API

use serde_json::{json, Value};
use switchboard_core::{EntityType, SearchRequest};

use crate::config::ClusterConfig;
use crate::document::IndexDocument;
use crate::error::{SearchError, SearchResult};
use crate::ranking::ScoredDocument;

/// Fields searched by the keyword sub-query, with boosts
pub const KEYWORD_FIELDS: [&str; 4] = ["name^3", "tags^2.5", "description^2", "text_for_embedding"];

/// Search pipeline that normalizes and fuses the hybrid sub-query scores
pub fn pipeline_body(config: &ClusterConfig) -> Value {
    json!({
        "description": "Switchboard hybrid search: min-max normalized keyword and vector scores",
        "phase_results_processors": [{
            "normalization-processor": {
                "normalization": { "technique": "min_max" },
                "combination": {
                    "technique": "arithmetic_mean",
                    "parameters": {
                        "weights": [config.keyword_weight, config.vector_weight]
                    }
                }
            }
        }]
    })
}

/// Settings and mapping for a servers, agents or skills index
pub fn entity_index_body(dimension: usize) -> Value {
    json!({
        "settings": {
            "index": {
                "knn": true,
                "number_of_shards": 1,
                "number_of_replicas": 0
            }
        },
        "mappings": {
            "properties": {
                "entity_type": { "type": "keyword" },
                "path": { "type": "keyword" },
                "name": { "type": "text", "fields": { "raw": { "type": "keyword" } } },
                "description": { "type": "text" },
                "tags": { "type": "keyword" },
                "is_enabled": { "type": "boolean" },
                "text_for_embedding": { "type": "text" },
                "embedding": {
                    "type": "knn_vector",
                    "dimension": dimension,
                    "method": {
                        "name": "hnsw",
                        "space_type": "cosinesimil",
                        "engine": "lucene"
                    }
                },
                "nested_summaries": {
                    "type": "nested",
                    "properties": {
                        "name": { "type": "text" },
                        "description": { "type": "text" }
                    }
                },
                "metadata": { "type": "object", "enabled": false },
                "indexed_at": { "type": "date" }
            }
        }
    })
}

/// Settings and mapping for the scopes index
pub fn scopes_index_body() -> Value {
    json!({
        "settings": {
            "index": { "number_of_shards": 1, "number_of_replicas": 0 }
        },
        "mappings": {
            "properties": {
                "doc_type": { "type": "keyword" },
                "group_name": { "type": "keyword" },
                "description": { "type": "text" },
                "server_access": { "type": "object", "enabled": false },
                "group_mappings": { "type": "keyword" },
                "ui_permissions": { "type": "object", "enabled": false },
                "updated_at": { "type": "date" }
            }
        }
    })
}

fn filters(request: &SearchRequest, entity_type: EntityType) -> Vec<Value> {
    let mut filters = vec![json!({ "term": { "entity_type": entity_type.as_str() } })];
    if request.enabled_only {
        filters.push(json!({ "term": { "is_enabled": true } }));
    }
    filters
}

fn keyword_query(request: &SearchRequest, filters: &[Value]) -> Value {
    json!({
        "bool": {
            "must": [{
                "multi_match": {
                    "query": request.query.trim(),
                    "type": "best_fields",
                    "fields": KEYWORD_FIELDS
                }
            }],
            "filter": filters
        }
    })
}

/// Query for one entity type.
///
/// With a query vector this is a `hybrid` query whose sub-scores the search
/// pipeline fuses; without one it is the keyword sub-query alone. Filters
/// apply to both sub-queries.
pub fn entity_search_body(request: &SearchRequest, entity_type: EntityType, vector: Option<&[f32]>) -> Value {
    let size = request.over_fetch();
    let filters = filters(request, entity_type);
    let keyword = keyword_query(request, &filters);

    let query = match vector {
        Some(vector) => json!({
            "hybrid": {
                "queries": [
                    keyword,
                    {
                        "knn": {
                            "embedding": {
                                "vector": vector,
                                "k": size,
                                "filter": { "bool": { "filter": filters } }
                            }
                        }
                    }
                ]
            }
        }),
        None => keyword,
    };

    json!({
        "size": size,
        "_source": { "excludes": ["embedding"] },
        "query": query
    })
}

/// All `group_mapping` documents, one per group
pub fn group_mapping_query(limit: usize) -> Value {
    json!({
        "size": limit,
        "query": { "term": { "doc_type": "group_mapping" } }
    })
}

/// `_source` bodies of a search response's hits
pub fn hit_sources(response: &Value) -> SearchResult<Vec<(Value, f32)>> {
    let hits = response
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .ok_or_else(|| SearchError::Query("search response has no hits array".to_string()))?;

    Ok(hits
        .iter()
        .filter_map(|hit| {
            let source = hit.get("_source")?.clone();
            let score = hit.get("_score").and_then(Value::as_f64).unwrap_or(0.0) as f32;
            Some((source, score))
        })
        .collect())
}

pub fn parse_entity_hits(response: &Value) -> SearchResult<Vec<ScoredDocument>> {
    hit_sources(response)?
        .into_iter()
        .map(|(source, score)| {
            let document: IndexDocument = serde_json::from_value(source)?;
            Ok(ScoredDocument { document, score })
        })
        .collect()
}

/// Vector dimension declared by a `GET /<index>/_mapping` response
pub fn mapped_dimension(mapping: &Value) -> Option<usize> {
    let embedding = mapping
        .as_object()?
        .values()
        .next()?
        .pointer("/mappings/properties/embedding")?;
    if embedding.get("type")?.as_str()? != "knn_vector" {
        return None;
    }
    embedding.get("dimension")?.as_u64().map(|d| d as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_weights() {
        let body = pipeline_body(&ClusterConfig::default());
        let processor = &body["phase_results_processors"][0]["normalization-processor"];
        assert_eq!(processor["normalization"]["technique"], "min_max");
        assert_eq!(processor["combination"]["technique"], "arithmetic_mean");
        let weights = processor["combination"]["parameters"]["weights"].as_array().unwrap();
        assert!((weights[0].as_f64().unwrap() - 0.4).abs() < 1e-6);
        assert!((weights[1].as_f64().unwrap() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_hybrid_body_shape() {
        let request = SearchRequest::new("weather").with_max_results(5).enabled_only(true);
        let body = entity_search_body(&request, EntityType::Server, Some(&[0.1, 0.2]));

        assert_eq!(body["size"], 10);
        assert_eq!(body["_source"]["excludes"][0], "embedding");

        let queries = body["query"]["hybrid"]["queries"].as_array().unwrap();
        assert_eq!(queries.len(), 2);

        let keyword = &queries[0]["bool"];
        assert_eq!(keyword["must"][0]["multi_match"]["type"], "best_fields");
        assert_eq!(keyword["must"][0]["multi_match"]["fields"][0], "name^3");
        assert_eq!(keyword["filter"][0]["term"]["entity_type"], "server");
        assert_eq!(keyword["filter"][1]["term"]["is_enabled"], true);

        let knn = &queries[1]["knn"]["embedding"];
        assert_eq!(knn["k"], 10);
        assert_eq!(knn["filter"]["bool"]["filter"], keyword["filter"]);
    }

    #[test]
    fn test_keyword_only_body() {
        let body = entity_search_body(&SearchRequest::new("weather"), EntityType::Agent, None);
        assert!(body["query"].get("hybrid").is_none());
        assert_eq!(body["query"]["bool"]["filter"][0]["term"]["entity_type"], "agent");
        assert_eq!(body["query"]["bool"]["filter"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_entity_mapping_dimension() {
        let body = entity_index_body(768);
        assert_eq!(body["settings"]["index"]["knn"], true);
        let mapping = json!({ "switchboard-servers-default": body });
        assert_eq!(mapped_dimension(&mapping), Some(768));
        assert_eq!(mapped_dimension(&json!({})), None);

        // Dynamically mapped float arrays are not vectors
        let dynamic = json!({ "idx": { "mappings": { "properties": { "embedding": { "type": "float" } } } } });
        assert_eq!(mapped_dimension(&dynamic), None);
    }

    #[test]
    fn test_parse_hits() {
        let response = json!({
            "hits": { "hits": [{
                "_id": "weather",
                "_score": 0.75,
                "_source": {
                    "entity_type": "server",
                    "path": "/weather",
                    "name": "Weather",
                    "is_enabled": true,
                    "text_for_embedding": "Weather",
                    "indexed_at": "2024-01-01T00:00:00Z"
                }
            }]}
        });
        let hits = parse_entity_hits(&response).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.path, "/weather");
        assert_eq!(hits[0].score, 0.75);

        assert!(parse_entity_hits(&json!({"error": "boom"})).is_err());
    }
}
