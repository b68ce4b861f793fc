use std::env;

use tracing::info;

/// One generation backend descriptor. The engine receives an ordered list
/// of these built once at startup; it never reads the environment itself.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub name: &'static str,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Generation backends (all OpenAI-compatible chat endpoints)
    pub generation_enabled: bool,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    pub deepseek_api_key: Option<String>,
    pub deepseek_model: String,
    pub openrouter_api_key: Option<String>,
    pub openrouter_model: Option<String>,

    // Headline index
    pub newsdata_api_key: Option<String>,

    // Regional defaults for the filtered query pass
    pub default_country: String,
    pub default_language: String,
    /// Country calling code prefixed to bare 10-digit phone numbers.
    pub phone_country_prefix: String,

    // Consent links
    pub site_base_url: String,

    // Outbound workflow hook
    pub workflow_hook_enabled: bool,
    pub workflow_hook_url: Option<String>,
    pub workflow_hook_secret: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            generation_enabled: flag_env("CONTENT_GENERATION_ENABLED", true),
            openai_api_key: optional_env("OPENAI_API_KEY"),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            groq_api_key: optional_env("GROQ_API_KEY"),
            groq_model: env::var("GROQ_MODEL")
                .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string()),
            deepseek_api_key: optional_env("DEEPSEEK_API_KEY"),
            deepseek_model: env::var("DEEPSEEK_MODEL")
                .unwrap_or_else(|_| "deepseek-chat".to_string()),
            openrouter_api_key: optional_env("OPENROUTER_API_KEY"),
            openrouter_model: optional_env("OPENROUTER_MODEL"),
            newsdata_api_key: optional_env("NEWSDATA_API_KEY"),
            default_country: env::var("DEFAULT_COUNTRY").unwrap_or_else(|_| "co".to_string()),
            default_language: env::var("DEFAULT_LANGUAGE").unwrap_or_else(|_| "es".to_string()),
            phone_country_prefix: env::var("PHONE_COUNTRY_PREFIX")
                .unwrap_or_else(|_| "57".to_string()),
            site_base_url: required_env("SITE_BASE_URL"),
            workflow_hook_enabled: flag_env("WORKFLOW_HOOK_ENABLED", false),
            workflow_hook_url: optional_env("WORKFLOW_HOOK_URL"),
            workflow_hook_secret: optional_env("WORKFLOW_HOOK_SECRET"),
        }
    }

    /// Ordered backend registry: primary first, then the alternates.
    /// A backend is included only when its API key is present; OpenRouter
    /// additionally requires an explicit model name.
    pub fn generation_backends(&self) -> Vec<BackendConfig> {
        let mut backends = Vec::new();

        if let Some(key) = &self.openai_api_key {
            backends.push(BackendConfig {
                name: "openai",
                base_url: "https://api.openai.com/v1".to_string(),
                api_key: key.clone(),
                model: self.openai_model.clone(),
            });
        }
        if let Some(key) = &self.groq_api_key {
            backends.push(BackendConfig {
                name: "groq",
                base_url: "https://api.groq.com/openai/v1".to_string(),
                api_key: key.clone(),
                model: self.groq_model.clone(),
            });
        }
        if let Some(key) = &self.deepseek_api_key {
            backends.push(BackendConfig {
                name: "deepseek",
                base_url: "https://api.deepseek.com/v1".to_string(),
                api_key: key.clone(),
                model: self.deepseek_model.clone(),
            });
        }
        if let (Some(key), Some(model)) = (&self.openrouter_api_key, &self.openrouter_model) {
            backends.push(BackendConfig {
                name: "openrouter",
                base_url: "https://openrouter.ai/api/v1".to_string(),
                api_key: key.clone(),
                model: model.clone(),
            });
        }

        backends
    }

    /// Log which integrations are configured without echoing any secret.
    pub fn log_redacted(&self) {
        let backends: Vec<&str> = self
            .generation_backends()
            .iter()
            .map(|b| b.name)
            .collect();
        info!(
            generation_enabled = self.generation_enabled,
            backends = ?backends,
            headline_index = self.newsdata_api_key.is_some(),
            workflow_hook = self.workflow_hook_enabled && self.workflow_hook_url.is_some(),
            default_country = %self.default_country,
            default_language = %self.default_language,
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn flag_env(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}
