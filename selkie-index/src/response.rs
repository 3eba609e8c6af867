//! Decoding of backend query replies into normalised search results.
//!
//! The backend has shipped two envelope shapes for the same payload: a
//! top-level `documents` array, and the same array nested under
//! `results.documents`. Both are accepted; when both are present the
//! top-level one wins. Snippets are picked from the first non-empty of
//! `snippet`, `text`, and `description`.

use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// One ranked hit returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    results: Nested,
}

#[derive(Debug, Default, Deserialize)]
struct Nested {
    #[serde(default)]
    documents: Vec<Document>,
}

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    description: String,
}

/// Decode a raw reply body. `limit == 0` means no truncation.
///
/// Unknown fields are ignored and missing fields default to empty, so a
/// backend growing its payload never breaks decoding; genuinely
/// malformed bytes surface as [`IndexError::Parse`].
pub fn parse_results(body: &[u8], limit: usize) -> Result<Vec<SearchResult>, IndexError> {
    let envelope: Envelope = serde_json::from_slice(body)
        .map_err(|e| IndexError::Parse(format!("decode search response: {e}")))?;

    let documents = if envelope.documents.is_empty() {
        envelope.results.documents
    } else {
        envelope.documents
    };

    let mut results: Vec<SearchResult> = documents
        .into_iter()
        .map(|doc| {
            let snippet = [doc.snippet, doc.text, doc.description]
                .into_iter()
                .find(|candidate| !candidate.is_empty())
                .unwrap_or_default();
            SearchResult {
                title: doc.title,
                url: doc.url,
                snippet,
            }
        })
        .collect();
    if limit > 0 && results.len() > limit {
        results.truncate(limit);
    }
    Ok(results)
}
