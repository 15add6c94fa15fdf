use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::error::CouchDaoError;
use crate::dao::models::MatchEntity;

/// Prefix of every match document id.
pub const MATCH_PREFIX: &str = "match::";
/// Upper bound appended to a prefix for `_all_docs` range queries.
pub const END_SUFFIX: &str = "\u{ffff}";

/// `_all_docs` response body.
#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    /// One row per document in the requested range.
    pub rows: Vec<AllDocsRow>,
}

/// Row of an `_all_docs?include_docs=true` response.
#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    /// Document body, absent for deleted documents.
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Revision-only view of a document, used before overwriting it.
#[derive(Debug, Deserialize)]
pub struct RevisionProbe {
    /// Current revision.
    #[serde(rename = "_rev")]
    pub rev: String,
    /// Version of the stored snapshot.
    #[serde(default)]
    pub version: u64,
}

/// `match::<uuid>` document; the entity id lives in `_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchMatchDocument {
    /// Document id, `match::<uuid>`.
    #[serde(rename = "_id")]
    pub id: String,
    /// Revision to overwrite, absent on first write.
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Match fields, stored at the top level of the document.
    #[serde(flatten)]
    pub body: MatchEntity,
}

impl CouchMatchDocument {
    /// Wrap `entity` for writing over revision `rev`.
    pub fn from_entity(entity: MatchEntity, rev: Option<String>) -> Self {
        Self {
            id: match_doc_id(entity.id),
            rev,
            body: entity,
        }
    }

    /// Unwrap the entity, checking that `_id` and the body agree.
    pub fn into_entity(self) -> Result<MatchEntity, CouchDaoError> {
        let parsed = parse_match_doc_id(&self.id)?;
        if parsed != self.body.id {
            return Err(CouchDaoError::InvalidDocId { doc_id: self.id });
        }
        Ok(self.body)
    }
}

/// Document id of a match.
pub fn match_doc_id(id: Uuid) -> String {
    format!("{MATCH_PREFIX}{id}")
}

fn parse_match_doc_id(doc_id: &str) -> Result<Uuid, CouchDaoError> {
    doc_id
        .strip_prefix(MATCH_PREFIX)
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| CouchDaoError::InvalidDocId {
            doc_id: doc_id.to_owned(),
        })
}
