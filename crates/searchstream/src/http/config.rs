use std::time::Duration;

use crate::errors::ClientError;

/// Configuration for the HTTP search backend.
#[derive(Clone, Debug)]
pub struct HttpBackendConfig {
    /// Base URL of the search service.
    pub base_url: String,
    /// Optional bearer token for protected deployments.
    pub api_token: Option<String>,
    /// Default HTTP timeout for non-streaming requests.
    pub timeout: Duration,
}

impl HttpBackendConfig {
    /// Creates a config with sensible defaults and a provided base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            timeout: Duration::from_secs(120),
        }
    }

    /// Builds a config from `SEARCHSTREAM_API_URL` and (optionally)
    /// `SEARCHSTREAM_API_TOKEN`.
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url = std::env::var("SEARCHSTREAM_API_URL").unwrap_or_default();
        if base_url.trim().is_empty() {
            return Err(ClientError::Config(
                "missing SEARCHSTREAM_API_URL for the HTTP backend".into(),
            ));
        }
        let mut config = Self::new(base_url);
        if let Ok(token) = std::env::var("SEARCHSTREAM_API_TOKEN")
            && !token.trim().is_empty()
        {
            config.api_token = Some(token);
        }
        Ok(config)
    }

    /// Sets the bearer token sent with every request.
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Overrides the default HTTP timeout for non-streaming requests.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_duplicate_slashes() {
        let config = HttpBackendConfig::new("https://api.example.org/");
        assert_eq!(
            config.endpoint("/search/one"),
            "https://api.example.org/search/one"
        );
        assert_eq!(config.endpoint("search"), "https://api.example.org/search");
    }
}
