pub mod ai;
pub mod chunker;
pub mod config;
pub mod document;
pub mod export;
pub mod job;
pub mod prompt;
pub mod session;
pub mod store;
pub mod time;

pub use ai::{
    ProviderClient, ProviderId, ProviderRequest, TranslateFuture, TranslationError, Translator,
};
pub use chunker::{estimate, merge, merge_with, split, Chunk, ChunkEstimate, ChunkPlan, MergeMode};
pub use config::{ConfigError, TranslatorConfig};
pub use document::{Document, DocumentError};
pub use export::{
    open_output_folder, resolve_language, translated_file_name, write_bundle,
    write_translated_file, BundleInfo, BundleMetadata, ExportError,
};
pub use job::{
    run_chunks, ActivityLog, CancelToken, ChannelSink, LogSink, ProgressEvent, ProgressSink,
    RunOutcome, RunSettings, RunState,
};
pub use prompt::{DocumentFormat, PromptContext, DEFAULT_INSTRUCTION};
pub use session::{StopHandle, TranslationSession};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, ProviderSettings};
