use log::{info, warn};
use uuid::Uuid;

use super::events::{ChunkErrorEntry, ProgressEvent, ProgressSink};
use super::{CancelToken, RunState};
use crate::ai::{TranslationError, Translator};
use crate::chunker::{merge_with, Chunk, MergeMode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub merge_mode: MergeMode,
    /// Effective overlap the chunks were split with.
    pub overlap: usize,
}

#[derive(Debug)]
pub struct ChunkFailure {
    pub index: usize,
    pub error: TranslationError,
}

impl ChunkFailure {
    pub fn to_entry(&self) -> ChunkErrorEntry {
        ChunkErrorEntry {
            chunk_index: self.index,
            message: self.error.to_string(),
            code: self.error.code().to_string(),
            status: self.error.status(),
        }
    }
}

/// Result of one run. `results[i]` is `Some` only for chunks that were
/// translated successfully; everything after a failure or cancel stays `None`.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: String,
    pub state: RunState,
    pub results: Vec<Option<String>>,
    pub failure: Option<ChunkFailure>,
    pub merged: Option<String>,
}

impl RunOutcome {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn completed(&self) -> usize {
        self.results.iter().filter(|result| result.is_some()).count()
    }

    /// Successful non-empty results in chunk order.
    pub fn successful(&self) -> Vec<&str> {
        self.results
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|text| !text.is_empty())
            .collect()
    }
}

/// Translates `chunks` strictly one after another.
///
/// The cancel flag is checked before each chunk starts; a request already in
/// flight is allowed to finish. The first failing chunk ends the run and no
/// later chunk is attempted.
pub async fn run_chunks(
    chunks: &[Chunk],
    translator: &dyn Translator,
    cancel: &CancelToken,
    sink: &dyn ProgressSink,
    options: RunOptions,
) -> RunOutcome {
    let run_id = Uuid::new_v4().to_string();
    let total = chunks.len();
    let mut results: Vec<Option<String>> = vec![None; total];
    let mut failure = None;
    let mut state = RunState::Running;
    let mut completed = 0usize;

    info!(
        "run {} started: {} chunks via {}",
        run_id,
        total,
        translator.name()
    );
    sink.emit(
        &ProgressEvent::new(&run_id, RunState::Running)
            .with_progress(0, total)
            .with_log("Starting translation process..."),
    );

    for (position, chunk) in chunks.iter().enumerate() {
        if cancel.is_cancelled() {
            state = RunState::Cancelled;
            info!("run {} cancelled before chunk {}", run_id, position + 1);
            sink.emit(
                &ProgressEvent::new(&run_id, RunState::Cancelled)
                    .with_progress(completed, total)
                    .with_chunk(position)
                    .cancel_requested()
                    .with_log("Cancelled by user."),
            );
            break;
        }

        sink.emit(
            &ProgressEvent::new(&run_id, RunState::Running)
                .with_progress(completed, total)
                .with_chunk(position)
                .with_log(format!("Translating chunk {}/{}...", position + 1, total)),
        );

        match translator.translate_chunk(chunk).await {
            Ok(text) => {
                results[position] = Some(text);
                completed += 1;
                sink.emit(
                    &ProgressEvent::new(&run_id, RunState::Running)
                        .with_progress(completed, total)
                        .with_chunk(position),
                );
            }
            Err(error) => {
                warn!("run {} chunk {} failed: {}", run_id, position + 1, error);
                let chunk_failure = ChunkFailure {
                    index: position,
                    error,
                };
                sink.emit(
                    &ProgressEvent::new(&run_id, RunState::FailedChunk)
                        .with_progress(completed, total)
                        .with_chunk(position)
                        .with_error(chunk_failure.to_entry())
                        .with_log(format!(
                            "Error on chunk {}: {}",
                            position + 1,
                            chunk_failure.error
                        )),
                );
                failure = Some(chunk_failure);
                state = RunState::FailedChunk;
                break;
            }
        }
    }

    if state == RunState::Running {
        state = RunState::Completed;
    }

    let mut outcome = RunOutcome {
        run_id,
        state,
        results,
        failure,
        merged: None,
    };

    // Results form a prefix; empty entries stay in so the merge can tell
    // which chunk each text came from.
    let translated: Vec<&str> = outcome.results.iter().flatten().map(String::as_str).collect();
    let merged = if outcome.successful().is_empty() {
        None
    } else {
        Some(merge_with(&translated, options.merge_mode, options.overlap))
    };
    let summary = if merged.is_some() {
        "Translation completed."
    } else {
        "No translation results to display."
    };
    outcome.merged = merged;

    info!(
        "run {} finished as {:?}: {}/{} chunks",
        outcome.run_id, outcome.state, completed, total
    );
    sink.emit(
        &ProgressEvent::new(&outcome.run_id, outcome.state)
            .with_progress(completed, total)
            .with_log(summary),
    );

    outcome
}
