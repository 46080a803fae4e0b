//! Result bucketing, tool synthesis and vector scoring shared by both backends

use std::cmp::Ordering;
use std::collections::HashSet;

use switchboard_core::{tokenize, EntityHit, EntityType, SearchRequest, SearchResults, ToolHit};

use crate::document::IndexDocument;

/// A candidate document with its fused or vector score
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: IndexDocument,
    pub score: f32,
}

/// Compute cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

fn by_score_desc(a: &ScoredDocument, b: &ScoredDocument) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.document.path.cmp(&b.document.path))
}

/// Tools of a server document that share a token with the query.
/// Each inherits the parent's score.
pub fn matching_tools(document: &IndexDocument, query_tokens: &HashSet<String>, score: f32) -> Vec<ToolHit> {
    if document.entity_type != EntityType::Server || query_tokens.is_empty() {
        return Vec::new();
    }
    document
        .nested_summaries
        .iter()
        .filter(|tool| {
            tokenize(&tool.name)
                .into_iter()
                .chain(tokenize(&tool.description))
                .any(|t| query_tokens.contains(&t))
        })
        .map(|tool| ToolHit {
            tool_name: tool.name.clone(),
            server_path: document.path.clone(),
            server_name: document.name.clone(),
            description: tool.description.clone(),
            relevance_score: score,
        })
        .collect()
}

/// Split candidates into per-type buckets, each sorted by descending score
/// and truncated to the request limit independently.
///
/// Candidates are expected to be pre-filtered by type and visibility.
pub fn assemble_results(request: &SearchRequest, mut candidates: Vec<ScoredDocument>) -> SearchResults {
    let limit = request.limit();
    let query_tokens: HashSet<String> = request.tokens().into_iter().collect();
    candidates.sort_by(by_score_desc);

    let mut results = SearchResults::empty();
    for candidate in candidates {
        let ScoredDocument { document, score } = candidate;
        if !request.wants(document.entity_type) {
            continue;
        }

        let tools = matching_tools(&document, &query_tokens, score);
        results.tools.extend(tools.iter().cloned());

        let bucket = results.bucket_mut(document.entity_type);
        if bucket.len() >= limit {
            continue;
        }
        bucket.push(EntityHit {
            entity_type: document.entity_type,
            path: document.path,
            name: document.name,
            description: document.description,
            tags: document.tags,
            is_enabled: document.is_enabled,
            relevance_score: score,
            matching_tools: tools,
        });
    }

    results.tools.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.server_path.cmp(&b.server_path))
            .then_with(|| a.tool_name.cmp(&b.tool_name))
    });
    results.tools.truncate(limit);
    results
}
