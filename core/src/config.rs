use std::env;

use tracing::{error, info};

use crate::error::Error;

/// Environment configuration, read once in `main` before the service loop
/// starts. A missing required variable aborts the invocation there.
#[derive(Debug, Clone)]
pub struct Config {
    /// The single table holding every record type.
    pub table_name: String,
    /// Global secondary index keyed by email.
    pub index_name: String,
    /// Fixed identity pair substituted for API test-harness requests. Only
    /// required the moment such a request arrives.
    pub postman_identity_id: Option<String>,
    pub postman_userpool_sub: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Ok(Config {
            table_name: require_var("TABLE_NAME")?,
            index_name: require_var("INDEX_NAME")?,
            postman_identity_id: env::var("POSTMAN_IDENTITY_ID").ok(),
            postman_userpool_sub: env::var("POSTMAN_USERPOOL_SUB").ok(),
        })
    }
}

fn require_var(name: &str) -> Result<String, Error> {
    match env::var(name) {
        Ok(value) => {
            info!("{} environment variable value: {}", name, value);
            Ok(value)
        }
        Err(_) => {
            error!("{} environment variable not set correctly.", name);
            Err(Error::Configuration(format!(
                "{name} environment variable not set correctly."
            )))
        }
    }
}
