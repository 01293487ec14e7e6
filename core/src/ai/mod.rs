pub mod client;
pub mod providers;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use thiserror::Error;

use crate::chunker::Chunk;
use crate::prompt::{build_prompt, DocumentFormat};

pub use client::ProviderClient;

pub const PROHIBITED_CONTENT: &str = "PROHIBITED_CONTENT";

#[derive(Debug, Error)]
pub enum TranslationError {
    /// Missing key, model or document. Raised before any request is sent.
    #[error("{0}")]
    Configuration(String),
    #[error("{provider} API error {status}: {body}")]
    ProviderHttp {
        provider: ProviderId,
        status: u16,
        body: String,
    },
    #[error("Translation failed: API response is invalid or incomplete. ({message})")]
    InvalidResponse { provider: ProviderId, message: String },
    #[error("{}", blocked_message(.reason))]
    ContentBlocked { reason: String },
    #[error("{provider} request failed: {message}")]
    Network { provider: ProviderId, message: String },
}

impl TranslationError {
    pub fn code(&self) -> &'static str {
        match self {
            TranslationError::Configuration(_) => "CONFIGURATION",
            TranslationError::ProviderHttp { .. } => "PROVIDER_HTTP",
            TranslationError::InvalidResponse { .. } => "INVALID_RESPONSE",
            TranslationError::ContentBlocked { .. } => "CONTENT_BLOCKED",
            TranslationError::Network { .. } => "NETWORK_ERROR",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TranslationError::ProviderHttp { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn blocked_message(reason: &str) -> String {
    if reason == PROHIBITED_CONTENT {
        "Translation failed: Content may violate usage policy. Please try with different text."
            .to_string()
    } else {
        format!("Translation failed: the provider blocked this content ({reason}).")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    #[default]
    Google,
    OpenRouter,
    Cerebras,
}

impl ProviderId {
    pub const ALL: [ProviderId; 3] = [ProviderId::Google, ProviderId::OpenRouter, ProviderId::Cerebras];

    /// Identifier used in settings keys and metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Google => "google",
            ProviderId::OpenRouter => "openrouter",
            ProviderId::Cerebras => "cerebras",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProviderId::Google => "Google",
            ProviderId::OpenRouter => "OpenRouter",
            ProviderId::Cerebras => "Cerebras",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl TryFrom<&str> for ProviderId {
    type Error = UnknownProvider;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "google" | "gemini" => Ok(ProviderId::Google),
            "openrouter" => Ok(ProviderId::OpenRouter),
            "cerebras" => Ok(ProviderId::Cerebras),
            _ => Err(UnknownProvider(value.to_string())),
        }
    }
}

impl FromStr for ProviderId {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderId::try_from(s)
    }
}

/// One provider call, built fresh for every chunk. Carries everything the
/// prompt and the HTTP body are made from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequest {
    pub provider: ProviderId,
    pub model: String,
    pub api_key: String,
    pub source_lang: String,
    pub target_lang: String,
    pub instruction: Option<String>,
    /// Upper-cased file extension shown to the model.
    pub content_type: String,
    pub format: DocumentFormat,
    pub content: String,
}

impl ProviderRequest {
    pub fn prompt(&self) -> String {
        build_prompt(
            &self.content,
            &self.source_lang,
            &self.target_lang,
            self.instruction.as_deref(),
            &self.content_type,
            self.format,
        )
    }

    pub fn body(&self, prompt: &str) -> serde_json::Value {
        providers::build_body(self.provider, &self.model, prompt)
    }
}

pub type TranslateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, TranslationError>> + Send + 'a>>;

/// Translates one chunk at a time. The orchestrator awaits each call before
/// starting the next.
pub trait Translator: Send + Sync {
    fn name(&self) -> &'static str;

    fn translate_chunk<'a>(&'a self, chunk: &'a Chunk) -> TranslateFuture<'a>;
}
