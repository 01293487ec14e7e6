use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};

use crate::ai::{TranslationError, Translator};
use crate::chunker::{estimate, split, Chunk, ChunkEstimate, ChunkPlan, MergeMode};
use crate::config::TranslatorConfig;
use crate::document::Document;
use crate::export::{write_bundle, write_translated_file, BundleInfo, ExportError, ExportResult};
use crate::job::{
    run_chunks, ActivityLog, CancelToken, ProgressSink, RunOptions, RunOutcome, RunSettings, Tee,
};

/// One loaded document and the state of its latest translation run.
#[derive(Debug, Default)]
pub struct TranslationSession {
    document: Option<Document>,
    plan: ChunkPlan,
    merge_mode: MergeMode,
    chunks: Vec<Chunk>,
    outcome: Option<RunOutcome>,
    cancel: CancelToken,
    activity: Arc<ActivityLog>,
}

impl TranslationSession {
    pub fn new(plan: ChunkPlan, merge_mode: MergeMode) -> Self {
        Self {
            plan,
            merge_mode,
            ..Self::default()
        }
    }

    pub fn from_config(config: &TranslatorConfig) -> Self {
        Self::new(config.chunk_plan(), config.merge.mode)
    }

    pub fn load_document(&mut self, document: Document) {
        self.activity.push(format!(
            "File loaded: {} ({} lines)",
            document.file_name(),
            document.line_count()
        ));
        info!(
            "loaded {} ({} lines, {:.1} KB)",
            document.file_name(),
            document.line_count(),
            document.size_kb()
        );
        self.document = Some(document);
        self.chunks.clear();
        self.outcome = None;
    }

    pub fn reset(&mut self) {
        self.document = None;
        self.chunks.clear();
        self.outcome = None;
        self.cancel.reset();
        self.activity.clear();
        self.activity.push("All progress cleared. Ready for new file.");
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn plan(&self) -> ChunkPlan {
        self.plan
    }

    pub fn set_plan(&mut self, plan: ChunkPlan) {
        self.plan = plan;
    }

    pub fn set_merge_mode(&mut self, merge_mode: MergeMode) {
        self.merge_mode = merge_mode;
    }

    pub fn estimate(&self) -> Option<ChunkEstimate> {
        self.document
            .as_ref()
            .map(|document| estimate(document.line_count(), &self.plan))
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.stop_handle().stop();
    }

    /// Detached handle for stopping the run from another task, e.g. a signal
    /// listener, while `translate` holds the session.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            cancel: self.cancel.clone(),
            activity: Arc::clone(&self.activity),
        }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    pub fn translated_text(&self) -> Option<&str> {
        self.outcome.as_ref().and_then(|outcome| outcome.merged.as_deref())
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// Splits the loaded document and runs every chunk through `translator`.
    pub async fn translate(
        &mut self,
        translator: &dyn Translator,
        sink: &dyn ProgressSink,
    ) -> Result<&RunOutcome, TranslationError> {
        let document = match &self.document {
            Some(document) => document,
            None => return Err(self.configuration_error("Please upload a file first.")),
        };

        let lines = document.lines();
        let (_, overlap) = self.plan.effective(lines.len());
        self.chunks = split(&lines, &self.plan);
        self.outcome = None;
        self.cancel.reset();

        let options = RunOptions {
            merge_mode: self.merge_mode,
            overlap,
        };
        let tee = Tee::new(self.activity.as_ref(), sink);
        let outcome = run_chunks(&self.chunks, translator, &self.cancel, &tee, options).await;

        Ok(self.outcome.insert(outcome))
    }

    /// Builds the provider client from `settings` and translates. Missing
    /// credentials are logged and returned before any request is made.
    pub async fn translate_with_settings(
        &mut self,
        settings: &RunSettings,
        sink: &dyn ProgressSink,
    ) -> Result<&RunOutcome, TranslationError> {
        let document = match &self.document {
            Some(document) => document,
            None => return Err(self.configuration_error("Please upload a file first.")),
        };

        let client = match settings.build_client(document) {
            Ok(client) => client,
            Err(error) => {
                warn!("cannot start translation: {}", error);
                self.activity.push(error.to_string());
                return Err(error);
            }
        };

        self.translate(&client, sink).await
    }

    pub fn save_translation(&self, dir: &Path, target_lang: &str) -> ExportResult<PathBuf> {
        let document = self.document.as_ref().ok_or(ExportError::NoDocument)?;
        let text = self.translated_text().ok_or(ExportError::NoResults)?;
        write_translated_file(dir, document.file_name(), target_lang, text)
    }

    pub fn save_bundle(&self, dir: &Path, info: &BundleInfo<'_>) -> ExportResult<PathBuf> {
        let text = self.translated_text().ok_or(ExportError::NoResults)?;
        write_bundle(dir, self.document.as_ref(), text, info)
    }

    fn configuration_error(&self, message: &str) -> TranslationError {
        self.activity.push(message);
        TranslationError::Configuration(message.to_string())
    }
}

/// Raises the session's cancel flag and records the request in its activity
/// log. The run stops before the next chunk.
#[derive(Debug, Clone)]
pub struct StopHandle {
    cancel: CancelToken,
    activity: Arc<ActivityLog>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.cancel.cancel();
        self.activity.push("Translation process requested to stop.");
    }
}
