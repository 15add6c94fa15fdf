use reqwest::StatusCode;
use thiserror::Error;

pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures of the CouchDB match store. `action` names the store operation
/// that was in flight (`"load match"`, `"list matches"`, ...).
#[derive(Debug, Error)]
pub enum CouchDaoError {
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The database could neither be read nor created.
    #[error("CouchDB database `{database}` is unreachable")]
    Unreachable {
        database: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("CouchDB request failed during {action}")]
    Request {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("CouchDB answered {status} during {action}")]
    UnexpectedStatus {
        action: &'static str,
        status: StatusCode,
    },
    #[error("unreadable CouchDB response during {action}")]
    DecodeBody {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// A listed document is not a match snapshot.
    #[error("malformed match document in `_all_docs`")]
    MalformedMatch {
        #[source]
        source: serde_json::Error,
    },
    /// A match document id does not carry a UUID.
    #[error("invalid document ID `{doc_id}`")]
    InvalidDocId { doc_id: String },
}
