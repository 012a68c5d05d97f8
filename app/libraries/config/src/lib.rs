use app_error::AppError;
use app_log::LogLevel;
use dotenv::dotenv;
use log::*;
use serde::{Deserialize, Serialize};
use std::{env, fs, io::Read};

/// Which backend customer sessions are opened against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageKind {
    /// PostgreSQL; the URL comes from `DATABASE_URL`.
    Postgres,
    /// In-process tables, lost on restart.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub backend_bind: String, // 0.0.0.0:9000
    pub log_level: LogLevel,  // Debug, Info, Warn, Error, Trace
    pub storage: StorageKind, // Postgres, Memory
    #[serde(default = "default_pg_connection")]
    pub pg_connection: u32,
    #[serde(default = "default_asset_path")]
    pub asset_path: String, // app/assets
}

fn default_pg_connection() -> u32 {
    5
}

fn default_asset_path() -> String {
    "app/assets".to_owned()
}

impl AppConfig {
    /// Loads the JSON file named by the `APP_CONFIG` env variable (`.env` is
    /// honoured).
    pub fn new() -> Result<Self, AppError> {
        dotenv().ok();
        let config_file_path = env::var("APP_CONFIG").map_err(|e| {
            debug!("{}", &e);
            AppError::config(format!(
                "Cannot locate config file; please set APP_CONFIG env variable! {e}"
            ))
        })?;
        Self::from_file(&config_file_path)
    }

    pub fn from_file(path: &str) -> Result<Self, AppError> {
        let config_file = fs::File::open(path).map_err(|e| {
            debug!("{}", &e);
            AppError::config(format!("Cannot read config file {path}! {e}"))
        })?;
        Self::from_reader(config_file)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, AppError> {
        serde_json::from_reader(reader).map_err(|e| {
            debug!("{}", &e);
            AppError::config(format!("Cannot parse json! {e}"))
        })
    }

    /// PostgreSQL connection string; only read when `storage` is `Postgres`.
    pub fn database_url() -> Result<String, AppError> {
        env::var("DATABASE_URL").map_err(|e| {
            debug!("{}", e);
            AppError::config("Cannot locate DATABASE_URL env variable")
        })
    }
}
