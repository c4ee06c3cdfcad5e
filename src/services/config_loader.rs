use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct ViewerSettings {
    #[serde(default = "default_code_font_size")]
    pub code_font_size: f32,
    #[serde(default = "default_wrap_lines")]
    pub wrap_lines: bool,
    #[serde(default = "default_team_columns")]
    pub team_columns: usize,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            code_font_size: default_code_font_size(),
            wrap_lines: default_wrap_lines(),
            team_columns: default_team_columns(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SessionSettings {
    /// Access token to sign in with on startup.
    #[serde(default)]
    pub token: Option<String>,
    /// Role used when the token carries no `role` claim.
    #[serde(default)]
    pub role: String,
    /// Expiry used when the token carries no `exp` claim.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// League to open right after sign-in.
    #[serde(default)]
    pub league_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub viewer: ViewerSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_seconds: default_request_timeout_seconds(),
            user_agent: default_user_agent(),
            session: SessionSettings::default(),
            viewer: ViewerSettings::default(),
        }
    }
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_code_font_size() -> f32 {
    14.0
}

fn default_wrap_lines() -> bool {
    true
}

fn default_team_columns() -> usize {
    2
}

pub fn parse_app_config(raw: &str) -> Result<AppConfig, String> {
    let mut config = toml::from_str::<AppConfig>(raw).map_err(|err| err.to_string())?;
    config.api_base_url = config.api_base_url.trim().trim_end_matches('/').to_string();
    if config.api_base_url.is_empty() {
        return Err("api_base_url must not be empty".to_string());
    }
    config.viewer.team_columns = config.viewer.team_columns.max(1);
    Ok(config)
}

/// Missing file means defaults; an unreadable or invalid file is an error.
pub fn load_app_config(config_path: &Path) -> Result<AppConfig, String> {
    if !config_path.exists() {
        info!(
            "{} not found, using defaults",
            config_path.display()
        );
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(config_path).map_err(|err| {
        format!(
            "Failed to read config at {}: {}",
            config_path.display(),
            err
        )
    })?;

    let config = parse_app_config(&raw).map_err(|err| {
        format!(
            "Failed to parse config at {}: {}",
            config_path.display(),
            err
        )
    })?;
    info!("Loaded config from {}", config_path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_app_config("").unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.request_timeout_seconds, 30);
        assert!(config.session.token.is_none());
        assert!(config.session.role.is_empty());
        assert_eq!(config.viewer.team_columns, 2);
        assert!(config.viewer.wrap_lines);
    }

    #[test]
    fn session_and_viewer_sections_are_read() {
        let raw = r#"
            api_base_url = "https://agents.example.org/api/"

            [session]
            token = "abc"
            role = "institution"
            expires_at = "2030-01-01T00:00:00Z"
            league_id = "7"

            [viewer]
            code_font_size = 16.0
            team_columns = 0
        "#;
        let config = parse_app_config(raw).unwrap();
        assert_eq!(config.api_base_url, "https://agents.example.org/api");
        assert_eq!(config.session.token.as_deref(), Some("abc"));
        assert_eq!(config.session.role, "institution");
        assert_eq!(config.session.expires_at.unwrap().to_rfc3339(), "2030-01-01T00:00:00+00:00");
        assert_eq!(config.session.league_id.as_deref(), Some("7"));
        assert_eq!(config.viewer.code_font_size, 16.0);
        assert_eq!(config.viewer.team_columns, 1);
    }

    #[test]
    fn blank_base_url_is_rejected() {
        assert!(parse_app_config(r#"api_base_url = "  ""#).is_err());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(parse_app_config("api_base_url = ").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("league-submissions-missing-config.toml");
        let config = load_app_config(&path).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8000");
    }
}
