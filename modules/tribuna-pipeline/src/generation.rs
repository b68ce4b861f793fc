use serde::de::DeserializeOwned;
use tracing::{info, warn};

use ai_client::{CompletionBackend, HttpBackend};
use tribuna_common::{Config, TribunaError};

/// Fixed low temperature for deterministic structured output.
const GENERATION_TEMPERATURE: f32 = 0.2;

/// Ordered-fallback completion engine. Tries each configured backend once,
/// in registry order, until one returns parseable JSON. No per-backend
/// retries and no backoff: generation is interactively triggered, so a
/// human retries at the orchestration layer if needed.
pub struct GenerationEngine {
    enabled: bool,
    backends: Vec<Box<dyn CompletionBackend>>,
}

impl GenerationEngine {
    pub fn new(enabled: bool, backends: Vec<Box<dyn CompletionBackend>>) -> Self {
        Self { enabled, backends }
    }

    /// Build the engine from the startup config's backend registry.
    pub fn from_config(config: &Config) -> Self {
        let backends: Vec<Box<dyn CompletionBackend>> = config
            .generation_backends()
            .into_iter()
            .map(|b| Box::new(HttpBackend::new(b)) as Box<dyn CompletionBackend>)
            .collect();
        Self::new(config.generation_enabled, backends)
    }

    /// Run one generation request. Fails with a distinct reason for
    /// "intentionally off" vs "misconfigured"; issues zero network calls in
    /// either case. Never partially succeeds.
    pub async fn generate<T: DeserializeOwned>(
        &self,
        task: &str,
        system: &str,
        user: &str,
    ) -> Result<T, TribunaError> {
        if !self.enabled {
            return Err(TribunaError::GenerationDisabled);
        }
        if self.backends.is_empty() {
            return Err(TribunaError::GenerationNotConfigured);
        }

        for backend in &self.backends {
            let content = match backend.complete(system, user, GENERATION_TEMPERATURE).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(task, backend = backend.name(), error = %e, "Backend failed, trying next");
                    continue;
                }
            };

            match serde_json::from_str::<T>(&content) {
                Ok(parsed) => {
                    info!(task, backend = backend.name(), "Generation succeeded");
                    return Ok(parsed);
                }
                Err(e) => {
                    warn!(task, backend = backend.name(), error = %e, "Unparseable JSON, trying next");
                }
            }
        }

        warn!(task, backends = self.backends.len(), "All generation backends exhausted");
        Err(TribunaError::GenerationUpstreamError)
    }
}
