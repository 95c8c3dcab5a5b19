use std::{env, io};

use secrecy::SecretString;
use serde::Serialize;
use tracing::debug;

use crate::density::DEFAULT_GRID_SIZE;

const DEFAULT_TELEMETRY_BUFFER_MAX_BYTES: u64 = 5 * 1024 * 1024;
const DEFAULT_TELEMETRY_BUFFER_MAX_FILES: usize = 5;
const DEFAULT_PAGE_SIZE: usize = 20;
const DEFAULT_MODEL_NAME: &str = "gemini-2.5-flash";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultLanguage {
    Vi,
    En,
}

impl ResultLanguage {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "vi" => Some(ResultLanguage::Vi),
            "en" => Some(ResultLanguage::En),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            ResultLanguage::Vi => "vi",
            ResultLanguage::En => "en",
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub density_grid_size: usize,
    pub search_page_size: usize,
    pub search_language: ResultLanguage,
    pub model_name: String,
    pub model_api_key: Option<SecretString>,
    pub telemetry_enabled_by_default: bool,
    pub telemetry_batch_size: usize,
    pub telemetry_buffer_max_bytes: u64,
    pub telemetry_buffer_max_files: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct PublicAppConfig {
    pub density_grid_size: usize,
    pub search_page_size: usize,
    pub search_language: ResultLanguage,
    pub model_name: String,
    pub has_model_api_key: bool,
    pub telemetry_enabled_by_default: bool,
    pub telemetry_batch_size: usize,
    pub telemetry_buffer_max_bytes: u64,
    pub telemetry_buffer_max_files: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        load_dotenv_if_applicable();
        Self {
            density_grid_size: parse_usize("DENSITY_GRID_SIZE", DEFAULT_GRID_SIZE).max(1),
            search_page_size: parse_usize("SEARCH_PAGE_SIZE", DEFAULT_PAGE_SIZE).max(1),
            search_language: env::var("SEARCH_LANGUAGE")
                .ok()
                .and_then(|v| ResultLanguage::parse(&v))
                .unwrap_or(ResultLanguage::Vi),
            model_name: env::var("MODEL_NAME")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            model_api_key: env::var("GEMINI_API_KEY")
                .or_else(|_| env::var("API_KEY"))
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from),
            telemetry_enabled_by_default: parse_bool("TELEMETRY_ENABLED", true),
            telemetry_batch_size: parse_usize("TELEMETRY_BATCH_SIZE", 25).max(1),
            telemetry_buffer_max_bytes: parse_u64(
                "TELEMETRY_BUFFER_MAX_BYTES",
                DEFAULT_TELEMETRY_BUFFER_MAX_BYTES,
            ),
            telemetry_buffer_max_files: parse_usize(
                "TELEMETRY_BUFFER_MAX_FILES",
                DEFAULT_TELEMETRY_BUFFER_MAX_FILES,
            )
            .max(1),
        }
    }

    pub fn public_profile(&self) -> PublicAppConfig {
        PublicAppConfig {
            density_grid_size: self.density_grid_size,
            search_page_size: self.search_page_size,
            search_language: self.search_language,
            model_name: self.model_name.clone(),
            has_model_api_key: self.model_api_key.is_some(),
            telemetry_enabled_by_default: self.telemetry_enabled_by_default,
            telemetry_batch_size: self.telemetry_batch_size,
            telemetry_buffer_max_bytes: self.telemetry_buffer_max_bytes,
            telemetry_buffer_max_files: self.telemetry_buffer_max_files,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            density_grid_size: DEFAULT_GRID_SIZE,
            search_page_size: DEFAULT_PAGE_SIZE,
            search_language: ResultLanguage::Vi,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            model_api_key: None,
            telemetry_enabled_by_default: true,
            telemetry_batch_size: 25,
            telemetry_buffer_max_bytes: DEFAULT_TELEMETRY_BUFFER_MAX_BYTES,
            telemetry_buffer_max_files: DEFAULT_TELEMETRY_BUFFER_MAX_FILES,
        }
    }
}

fn load_dotenv_if_applicable() {
    if !should_load_dotenv() {
        debug!("skipping .env load outside dev mode");
        return;
    }

    if let Err(err) = dotenvy::dotenv() {
        match &err {
            dotenvy::Error::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {}
            _ => debug!(?err, "unable to load .env file"),
        }
    }
}

fn should_load_dotenv() -> bool {
    cfg!(debug_assertions) || parse_bool("ALLOW_DOTENV", false)
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(default)
}

fn parse_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}
