/// Configuration for the document translator
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::ai::ProviderId;
use crate::chunker::{ChunkPlan, MergeMode, DEFAULT_MAX_LINES, DEFAULT_OVERLAP};
use crate::job::RunSettings;
use crate::prompt::resolve_instruction;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[source] std::io::Error),
    #[error("Failed to write config file: {0}")]
    Write(#[source] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkingOptions {
    pub auto: bool,
    pub max_lines: usize,
    pub overlap: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            auto: true,
            max_lines: DEFAULT_MAX_LINES,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslationOptions {
    pub provider: ProviderId,
    pub source_lang: String,
    pub target_lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    pub use_default_instruction: bool,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            provider: ProviderId::Google,
            source_lang: "auto".into(),
            target_lang: "en".into(),
            instruction: None,
            use_default_instruction: true,
        }
    }
}

impl TranslationOptions {
    /// Instruction text that goes into the prompt.
    pub fn instruction_text(&self) -> String {
        resolve_instruction(self.instruction.as_deref(), self.use_default_instruction)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeOptions {
    pub mode: MergeMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkOptions {
    /// Per-request timeout. Unset means requests may wait indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl NetworkOptions {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatorConfig {
    #[serde(default)]
    pub chunking: ChunkingOptions,
    #[serde(default)]
    pub translation: TranslationOptions,
    #[serde(default)]
    pub merge: MergeOptions,
    #[serde(default)]
    pub network: NetworkOptions,
}

impl TranslatorConfig {
    pub fn chunk_plan(&self) -> ChunkPlan {
        if self.chunking.auto {
            ChunkPlan::auto()
        } else {
            ChunkPlan::manual(self.chunking.max_lines, self.chunking.overlap)
        }
    }

    /// Combines this config with stored credentials into per-run settings.
    pub fn run_settings(&self, api_key: Option<String>, model: Option<String>) -> RunSettings {
        RunSettings {
            provider: self.translation.provider,
            api_key,
            model,
            source_lang: self.translation.source_lang.clone(),
            target_lang: self.translation.target_lang.clone(),
            instruction: self.translation.instruction_text(),
            request_timeout: self.network.request_timeout(),
        }
    }

    /// Load configuration from a file. `.yaml`/`.yml` is parsed as YAML,
    /// everything else as JSON.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(ConfigError::Read)?;
        if is_yaml(path) {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// Save configuration, picking the format from the extension.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = if is_yaml(path) {
            self.to_yaml()?
        } else {
            self.to_json()?
        };
        fs::write(path, content).map_err(ConfigError::Write)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}
