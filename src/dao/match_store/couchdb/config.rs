use std::env;

use super::error::{CouchDaoError, CouchResult};

const DEFAULT_DATABASE: &str = "courtside_matches";

/// Where and how to reach the CouchDB match database.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server URL, without the database path.
    pub base_url: String,
    /// Database holding the match documents.
    pub database: String,
    /// Basic-auth username and password.
    pub credentials: Option<(String, String)>,
}

impl CouchConfig {
    /// Anonymous access to `database` on `base_url`.
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            database: database.into(),
            credentials: None,
        }
    }

    /// Read `COUCH_BASE_URL` (required), `COUCH_DB` and the optional
    /// `COUCH_USERNAME`/`COUCH_PASSWORD` pair.
    pub fn from_env() -> CouchResult<Self> {
        let base_url = env::var("COUCH_BASE_URL").map_err(|_| CouchDaoError::MissingEnvVar {
            var: "COUCH_BASE_URL",
        })?;
        let database = env::var("COUCH_DB")
            .ok()
            .filter(|db| !db.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_owned());

        let credentials = env::var("COUCH_USERNAME")
            .ok()
            .zip(env::var("COUCH_PASSWORD").ok());

        Ok(Self {
            credentials,
            ..Self::new(base_url, database)
        })
    }
}
