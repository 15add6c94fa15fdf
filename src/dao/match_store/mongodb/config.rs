use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::debug;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DATABASE: &str = "courtside";
const PING_ATTEMPTS: u32 = 5;
const FIRST_PING_BACKOFF: Duration = Duration::from_millis(250);
const MAX_PING_BACKOFF: Duration = Duration::from_secs(5);

/// Parsed connection settings for the match database.
#[derive(Clone)]
pub struct MongoConfig {
    /// Driver options parsed from the connection URI.
    pub options: ClientOptions,
    /// Database holding the match collection.
    pub database_name: String,
}

impl MongoConfig {
    /// Parse `uri`, falling back to the default database name.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let database_name = db_name.unwrap_or(DEFAULT_DATABASE).to_owned();
        let options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;

        Ok(Self {
            options,
            database_name,
        })
    }

    /// Read `MONGO_URI` (required) and `MONGO_DB` (optional).
    pub async fn from_env() -> MongoResult<Self> {
        let uri = std::env::var("MONGO_URI")
            .map_err(|_| MongoDaoError::MissingEnvVar { var: "MONGO_URI" })?;
        let db = std::env::var("MONGO_DB").ok();
        Self::from_uri(&uri, db.as_deref()).await
    }

    /// Open a fresh client and return the database once it answers a ping.
    pub async fn open(&self) -> MongoResult<Database> {
        let client = Client::with_options(self.options.clone())
            .map_err(|source| MongoDaoError::ClientConstruction { source })?;
        let database = client.database(&self.database_name);

        let mut attempt = 1;
        let mut backoff = FIRST_PING_BACKOFF;
        loop {
            match database.run_command(doc! { "ping": 1 }).await {
                Ok(_) => return Ok(database),
                Err(source) if attempt >= PING_ATTEMPTS => {
                    return Err(MongoDaoError::InitialPing {
                        attempts: attempt,
                        source,
                    });
                }
                Err(_) => {
                    debug!(attempt, backoff_ms = backoff.as_millis() as u64, "MongoDB not ready yet");
                    sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_PING_BACKOFF);
                    attempt += 1;
                }
            }
        }
    }
}
