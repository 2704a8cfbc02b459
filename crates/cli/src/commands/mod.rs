//! Command implementations.

pub mod boutiques;
pub mod catalog;

use std::time::Duration;

use thiserror::Error;

use maison_core::catalog::UnknownSortKey;
use maison_core::product::DraftError;
use maison_core::types::EmailError;
use maison_storefront::config::{ConfigError, SupabaseConfig};
use maison_storefront::supabase::{DataClient, SupabaseError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Supabase request failed: {0}")]
    Supabase(#[from] SupabaseError),

    #[error(transparent)]
    SortKey(#[from] UnknownSortKey),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid product {name:?}: {source}")]
    InvalidProduct { name: String, source: DraftError },

    #[error("Invalid boutique {0:?}: needs a name and valid coordinates")]
    InvalidBoutique(String),
}

/// Catalog cache lifetime for one-shot commands.
const CLI_CACHE_TTL: Duration = Duration::from_secs(60);

/// Project configuration from the environment (and `.env`).
fn supabase_config() -> Result<SupabaseConfig, CliError> {
    dotenvy::dotenv().ok();
    Ok(SupabaseConfig::from_env()?)
}

fn data_client(config: &SupabaseConfig) -> DataClient {
    DataClient::new(config, CLI_CACHE_TTL)
}
