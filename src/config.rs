//! Runtime configuration.
//!
//! Values come from command-line flags, falling back to environment variables
//! (a `.env` file is loaded first by `main`).

use clap::Args;
use thiserror::Error;

use crate::api_connection::endpoints::{DEFAULT_MODEL, OPENROUTER_BASE_URL};
use crate::api_connection::{OpenRouterModel, Provider};
use crate::data_store::RestDataStore;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} is required when no fixture is given")]
    MissingSetting(&'static str),
    #[error("{name} must be an http(s) URL, got '{value}'")]
    InvalidUrl { name: &'static str, value: String },
    #[error("model name must not be empty")]
    EmptyModel,
}

#[derive(Args, Debug, Clone)]
pub struct ServiceConfig {
    /// Name of the environment variable holding the OpenRouter API key
    #[arg(long, env = "MEAL_PLANNER_API_KEY_VAR", default_value = "OPENROUTER_API_KEY")]
    pub api_key_env_var: String,

    /// Model used for generation
    #[arg(long, env = "MEAL_PLANNER_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// OpenRouter API base URL
    #[arg(long, env = "OPENROUTER_BASE_URL", default_value = OPENROUTER_BASE_URL)]
    pub openrouter_base_url: String,

    /// Base URL of the data service
    #[arg(long, env = "DATA_STORE_URL")]
    pub data_store_url: Option<String>,

    /// Project API key for the data service
    #[arg(long, env = "DATA_STORE_API_KEY", hide_env_values = true)]
    pub data_store_api_key: Option<String>,

    /// Signed-in user's access token for the data service
    #[arg(long, env = "DATA_STORE_ACCESS_TOKEN", hide_env_values = true)]
    pub data_store_access_token: Option<String>,

    /// Log level for this crate when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

fn check_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidUrl {
            name,
            value: value.to_string(),
        })
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        check_url("OPENROUTER_BASE_URL", &self.openrouter_base_url)?;
        if let Some(url) = &self.data_store_url {
            check_url("DATA_STORE_URL", url)?;
        }
        Ok(())
    }

    pub fn language_model(&self) -> OpenRouterModel {
        let provider =
            Provider::openrouter(&self.api_key_env_var).with_base_url(&self.openrouter_base_url);
        OpenRouterModel::new(provider, &self.model)
    }

    pub fn rest_data_store(&self) -> Result<RestDataStore, ConfigError> {
        let url = self
            .data_store_url
            .as_deref()
            .ok_or(ConfigError::MissingSetting("DATA_STORE_URL"))?;
        let api_key = self
            .data_store_api_key
            .as_deref()
            .ok_or(ConfigError::MissingSetting("DATA_STORE_API_KEY"))?;
        let token = self
            .data_store_access_token
            .as_deref()
            .ok_or(ConfigError::MissingSetting("DATA_STORE_ACCESS_TOKEN"))?;
        Ok(RestDataStore::new(url, api_key, token))
    }
}
