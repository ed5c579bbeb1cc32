use http::StatusCode;
use serde::Deserialize;
use tracing::{Level, warn};

/// Server settings, usually read from the application's JSON config.
///
/// Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Lets a `POST` request pick its routing method through the `_method` query field.
    pub allow_method_spoofing: bool,
    /// Secret of the default url signer.
    pub app_key: Option<String>,
    /// Status of redirects issued by brisk routes.
    pub redirect_status: u16,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { allow_method_spoofing: false, app_key: None, redirect_status: 302, log_level: "info".to_owned() }
    }
}

impl ServerConfig {
    /// # Errors
    ///
    /// Fails when `json` is not a valid config document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The configured log level, `INFO` when it cannot be parsed.
    pub fn level(&self) -> Level {
        self.log_level.parse().unwrap_or_else(|_| {
            warn!(log_level = %self.log_level, "unknown log level, using info");
            Level::INFO
        })
    }

    /// The configured redirect status, `302 Found` unless it is a redirection status.
    pub fn redirect_status(&self) -> StatusCode {
        match StatusCode::from_u16(self.redirect_status) {
            Ok(status) if status.is_redirection() => status,
            _ => {
                warn!(redirect_status = self.redirect_status, "not a redirection status, using 302");
                StatusCode::FOUND
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_json("{}").unwrap();
        assert!(!config.allow_method_spoofing);
        assert!(config.app_key.is_none());
        assert_eq!(config.redirect_status(), StatusCode::FOUND);
        assert_eq!(config.level(), Level::INFO);
    }

    #[test]
    fn test_from_json() {
        let config = ServerConfig::from_json(
            r#"{"allow_method_spoofing": true, "app_key": "secret", "redirect_status": 301, "log_level": "debug"}"#,
        )
        .unwrap();
        assert!(config.allow_method_spoofing);
        assert_eq!(config.app_key.as_deref(), Some("secret"));
        assert_eq!(config.redirect_status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(config.level(), Level::DEBUG);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ServerConfig { redirect_status: 200, log_level: "loud".to_owned(), ..ServerConfig::default() };
        assert_eq!(config.redirect_status(), StatusCode::FOUND);
        assert_eq!(config.level(), Level::INFO);
    }
}
