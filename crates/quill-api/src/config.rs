use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_STATE_DIR: &str = "./.quill";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    Number { var: &'static str, value: String },
}

/// Runtime settings for the client, read from `QUILL_*` environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub state_dir: PathBuf,
    pub request_timeout: Duration,
    /// Hover time before the liker tooltip is fetched.
    pub tooltip_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            state_dir: DEFAULT_STATE_DIR.into(),
            request_timeout: Duration::from_secs(15),
            tooltip_delay: Duration::from_millis(500),
            poll_interval: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let number = |var: &'static str| -> Result<Option<u64>, ConfigError> {
            match lookup(var) {
                None => Ok(None),
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| ConfigError::Number { var, value }),
            }
        };

        Ok(Self {
            api_url: lookup("QUILL_API_URL").unwrap_or(defaults.api_url),
            state_dir: lookup("QUILL_STATE_DIR").map(PathBuf::from).unwrap_or(defaults.state_dir),
            request_timeout: number("QUILL_HTTP_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            tooltip_delay: number("QUILL_TOOLTIP_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.tooltip_delay),
            poll_interval: number("QUILL_POLL_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_environment_yields_defaults() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.tooltip_delay, Duration::from_millis(500));
    }

    #[test]
    fn overrides_are_applied() {
        let vars: HashMap<&str, &str> = [
            ("QUILL_API_URL", "http://blog.internal:9000"),
            ("QUILL_TOOLTIP_DELAY_MS", "250"),
            ("QUILL_POLL_INTERVAL_SECS", "5"),
        ]
        .into_iter()
        .collect();
        let config = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.api_url, "http://blog.internal:9000");
        assert_eq!(config.tooltip_delay, Duration::from_millis(250));
        assert_eq!(config.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn bad_number_is_an_error() {
        let err = ClientConfig::from_lookup(|k| (k == "QUILL_HTTP_TIMEOUT_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("QUILL_HTTP_TIMEOUT_SECS"));
    }
}
