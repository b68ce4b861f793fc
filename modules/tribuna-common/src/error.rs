use thiserror::Error;

/// Failure taxonomy for the editorial pipeline. Every variant maps to a
/// stable machine-readable reason string via [`TribunaError::reason`].
/// Variants never carry secrets (API keys, invite tokens, hook secrets).
#[derive(Error, Debug)]
pub enum TribunaError {
    #[error("source arbitration exhausted both query passes")]
    NoSourceFound,

    #[error("content generation is disabled by feature flag")]
    GenerationDisabled,

    #[error("no generation backend is configured")]
    GenerationNotConfigured,

    #[error("all generation backends exhausted")]
    GenerationUpstreamError,

    #[error("no license-compatible image available")]
    ImageUnavailable,

    #[error("invite is past its expiry window")]
    InviteExpired,

    #[error("invite has already been consumed")]
    InviteAlreadyUsed,

    #[error("no invite matches the presented token")]
    InviteNotFound,

    #[error("destination is not an eligible publish target")]
    DestinationNotEligible,

    #[error("workflow hook is not configured")]
    WorkflowNotConfigured,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl TribunaError {
    /// Stable reason string reported to callers and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            TribunaError::NoSourceFound => "no_source_found",
            TribunaError::GenerationDisabled => "generation_disabled",
            TribunaError::GenerationNotConfigured => "generation_not_configured",
            TribunaError::GenerationUpstreamError => "generation_upstream_error",
            TribunaError::ImageUnavailable => "image_unavailable",
            TribunaError::InviteExpired => "invite_expired",
            TribunaError::InviteAlreadyUsed => "invite_already_used",
            TribunaError::InviteNotFound => "invite_not_found",
            TribunaError::DestinationNotEligible => "destination_not_eligible",
            TribunaError::WorkflowNotConfigured => "workflow_not_configured",
            TribunaError::Config(_) => "config_error",
            TribunaError::Store(_) => "store_error",
            TribunaError::Anyhow(_) => "internal_error",
        }
    }
}
