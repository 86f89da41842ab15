/// Application configuration
///
/// Resolved once at startup from the environment and the platform's
/// standard directories:
/// - Linux: ~/.local/share/conversor/settings.db
/// - macOS: ~/Library/Application Support/conversor/settings.db
/// - Windows: %APPDATA%\conversor\settings.db
use std::path::PathBuf;

/// Environment variable holding the relay base URL
pub const BACKEND_ENDPOINT_VAR: &str = "CONVERSOR_BACKEND_ENDPOINT";

/// Relay used when the variable is unset
pub const DEFAULT_BACKEND_ENDPOINT: &str = "http://localhost:3000";

const APP_DIR: &str = "conversor";
const DB_FILE: &str = "settings.db";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Base URL of the relay that fetches remote SVGs on our behalf
    pub backend_endpoint: String,
    /// Directory holding the settings database
    pub data_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::resolve(std::env::var(BACKEND_ENDPOINT_VAR).ok(), default_data_dir())
    }

    fn resolve(endpoint: Option<String>, data_dir: PathBuf) -> Self {
        let backend_endpoint = endpoint
            .map(|e| e.trim().trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_ENDPOINT.to_string());

        Self {
            backend_endpoint,
            data_dir,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }
}

fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir);
    path.push(APP_DIR);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_defaults_and_trims() {
        let dir = PathBuf::from("/tmp/x");
        assert_eq!(
            AppConfig::resolve(None, dir.clone()).backend_endpoint,
            DEFAULT_BACKEND_ENDPOINT
        );
        assert_eq!(
            AppConfig::resolve(Some("  ".into()), dir.clone()).backend_endpoint,
            DEFAULT_BACKEND_ENDPOINT
        );
        let config = AppConfig::resolve(Some("https://relay.example/".into()), dir);
        assert_eq!(config.backend_endpoint, "https://relay.example");
        assert_eq!(config.db_path(), PathBuf::from("/tmp/x/settings.db"));
    }
}
