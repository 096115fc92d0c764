use std::env;
use std::fs;
use std::path::Path;

use reqwest::Url;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/client.json";
pub const SERVER_URL_ENV: &str = "TEXTBOOK_SERVER_URL";
pub const BOOKS_API_URL_ENV: &str = "TEXTBOOK_BOOKS_API_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Marketplace backend, e.g. `http://localhost:8080`.
    pub server_url: String,
    /// Explicit socket endpoint; derived from `server_url` when absent.
    pub ws_url: Option<String>,
    pub books_api_url: String,
    pub poll_interval_secs: u64,
    /// Per-request limit for backend and Google Books calls.
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            ws_url: None,
            books_api_url: "https://www.googleapis.com/books/v1/volumes".to_string(),
            poll_interval_secs: 30,
            request_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// `ws://host/ws` for `http://host`, `wss://` for `https://`. Anything
    /// else is returned unchanged and later rejected by the transport.
    pub fn ws_endpoint(&self) -> String {
        if let Some(ws_url) = &self.ws_url {
            return ws_url.clone();
        }

        let Ok(mut url) = Url::parse(&self.server_url) else {
            return self.server_url.clone();
        };
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            _ => return url.to_string(),
        };
        if url.set_scheme(scheme).is_err() {
            return url.to_string();
        }
        let path = format!("{}/ws", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.to_string()
    }

    fn apply_env(&mut self) {
        if let Ok(server_url) = env::var(SERVER_URL_ENV) {
            self.server_url = server_url;
        }
        if let Ok(books_api_url) = env::var(BOOKS_API_URL_ENV) {
            self.books_api_url = books_api_url;
        }
    }
}

/// Read the JSON config at `path`, falling back to defaults, then apply
/// environment overrides.
pub fn load_config(path: &str) -> AppConfig {
    let mut config = read_config_file(Path::new(path));
    config.apply_env();
    config
}

fn read_config_file(path: &Path) -> AppConfig {
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}
