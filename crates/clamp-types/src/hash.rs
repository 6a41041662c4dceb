//! Deterministic content addressing for commits.
//!
//! A commit hash is the blake3 digest of the canonical JSON encoding of the
//! document batch together with the group and message. Embedding vectors are
//! excluded from the encoding: they are float data that may be regenerated
//! with different precision across runs while representing the same logical
//! content, and must not perturb the address. `serde_json`'s map type keeps
//! keys sorted, which makes the encoding independent of field order.

use serde_json::{Map, Value};

use crate::{ClampError, ClampResult, Document};

/// Compute the content address for a batch of documents.
///
/// Pure: identical inputs (ignoring vectors) always produce the same
/// 64-char lowercase hex digest.
pub fn commit_hash(documents: &[Document], group: &str, message: &str) -> ClampResult<String> {
    let canonical_docs: Vec<Value> = documents.iter().map(canonical_document).collect();
    let canonical = serde_json::json!({
        "documents": canonical_docs,
        "group": group,
        "message": message,
    });
    let bytes = serde_json::to_vec(&canonical)
        .map_err(|e| ClampError::Serialization(e.to_string()))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Document content as hashed: payload plus id, vector dropped.
fn canonical_document(doc: &Document) -> Value {
    let mut fields: Map<String, Value> = doc.payload.clone();
    if let Some(id) = &doc.id {
        fields.insert("id".to_string(), Value::from(id));
    }
    Value::Object(fields)
}
