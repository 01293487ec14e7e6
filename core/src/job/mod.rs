pub mod events;
pub mod runner;

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::ai::{ProviderClient, ProviderId, TranslationError};
use crate::document::Document;
use crate::prompt::PromptContext;

pub use events::{
    ActivityLog, ChannelSink, ChunkErrorEntry, LogEntry, LogSink, NullSink, ProgressEvent,
    ProgressSink, Tee,
};
pub use runner::{run_chunks, ChunkFailure, RunOptions, RunOutcome};

/// Lifecycle of a single translation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
    FailedChunk,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Cancelled | RunState::FailedChunk
        )
    }
}

/// Cooperative cancellation flag, checked between chunks only.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Everything needed to build the per-chunk translator for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub provider: ProviderId,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub source_lang: String,
    pub target_lang: String,
    pub instruction: String,
    pub request_timeout: Option<Duration>,
}

impl RunSettings {
    pub fn build_client(&self, document: &Document) -> Result<ProviderClient, TranslationError> {
        let prompt = PromptContext::new(document.file_name(), &self.source_lang, &self.target_lang)
            .with_instruction(Some(self.instruction.clone()));

        ProviderClient::new(
            self.provider,
            self.api_key.as_deref(),
            self.model.as_deref(),
            prompt,
        )?
        .with_timeout(self.request_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());

        handle.cancel();
        assert!(token.is_cancelled());

        token.reset();
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn run_settings_require_credentials() {
        let settings = RunSettings {
            provider: ProviderId::OpenRouter,
            api_key: Some("key".into()),
            model: None,
            source_lang: "en".into(),
            target_lang: "de".into(),
            instruction: crate::prompt::DEFAULT_INSTRUCTION.into(),
            request_timeout: None,
        };
        let document = Document::new("a.txt", "hello");
        let error = settings.build_client(&document).unwrap_err();
        assert_eq!(error.code(), "CONFIGURATION");
    }

    #[test]
    fn terminal_states() {
        assert!(!RunState::Idle.is_terminal());
        assert!(!RunState::Running.is_terminal());
        assert!(RunState::FailedChunk.is_terminal());
    }
}
