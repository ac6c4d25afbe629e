use crate::error::{AppError, Result};

pub const DRAWS_COLLECTION: &str = "ee_rounds";
pub const STREAMS_COLLECTION: &str = "oinp_rounds";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub log_level: String,
    /// Collection holding federal draw documents (DRAWS_COLLECTION)
    pub draws_collection: String,
    /// Collection holding provincial stream documents (STREAMS_COLLECTION)
    pub streams_collection: String,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| {
                AppError::Config("DATABASE_URL must be set to a Postgres instance".to_string())
            })?,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            draws_collection: std::env::var("DRAWS_COLLECTION")
                .unwrap_or_else(|_| DRAWS_COLLECTION.to_string()),
            streams_collection: std::env::var("STREAMS_COLLECTION")
                .unwrap_or_else(|_| STREAMS_COLLECTION.to_string()),
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse::<u32>()
                .map_err(|_| {
                    AppError::Config("DB_MAX_CONNECTIONS must be a positive integer".to_string())
                })?,
        })
    }
}
