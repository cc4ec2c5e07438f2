use std::env;
use std::time::Duration;

/// Model used when `OLLAMA_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "llama3";

/// Ollama's stock listen address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Hard stop on the model call so a request never hangs.
pub const LLM_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierConfig {
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: LLM_TIMEOUT,
        }
    }
}

impl ClassifierConfig {
    /// Reads `OLLAMA_MODEL` and `OLLAMA_HOST` from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, falling back to the
    /// defaults for missing or blank values. The deadline is not overridable
    /// from the environment.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();
        Self {
            model: non_blank("OLLAMA_MODEL").unwrap_or(defaults.model),
            base_url: non_blank("OLLAMA_HOST").unwrap_or(defaults.base_url),
            timeout: defaults.timeout,
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
