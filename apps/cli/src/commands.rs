use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use doc_translator_core::export::{open_output_folder, resolve_language, BundleInfo};
use doc_translator_core::job::{LogSink, RunState};
use doc_translator_core::store::{JsonFileStore, KeyValueStore, ProviderSettings};
use doc_translator_core::{Document, MergeMode, ProviderId, TranslationSession, TranslatorConfig};
use log::{info, warn};

use crate::{ChunkingArgs, TranslateArgs};

pub fn load_config(path: Option<&Path>) -> Result<TranslatorConfig> {
    match path {
        Some(path) => TranslatorConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(TranslatorConfig::default()),
    }
}

pub fn open_store(path: Option<PathBuf>) -> JsonFileStore {
    match path {
        Some(path) => JsonFileStore::new(path),
        None => JsonFileStore::open_default(),
    }
}

pub fn init_config(config: &TranslatorConfig, path: &Path) -> Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    config
        .to_file(path)
        .with_context(|| format!("writing config {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn apply_chunking(config: &mut TranslatorConfig, chunking: &ChunkingArgs) {
    if chunking.max_lines.is_none() && chunking.overlap.is_none() {
        return;
    }
    config.chunking.auto = false;
    if let Some(max_lines) = chunking.max_lines {
        config.chunking.max_lines = max_lines;
    }
    if let Some(overlap) = chunking.overlap {
        config.chunking.overlap = overlap;
    }
}

fn apply_translate_args(config: &mut TranslatorConfig, args: &TranslateArgs) {
    apply_chunking(config, &args.chunking);

    let translation = &mut config.translation;
    if let Some(provider) = args.provider {
        translation.provider = provider;
    }
    if let Some(source) = &args.source {
        translation.source_lang = source.clone();
    }
    translation.source_lang =
        resolve_language(&translation.source_lang, args.custom_source.as_deref());
    if let Some(target) = &args.target {
        translation.target_lang = target.clone();
    }
    translation.target_lang =
        resolve_language(&translation.target_lang, args.custom_target.as_deref());
    if let Some(instruction) = &args.instruction {
        translation.instruction = Some(instruction.clone());
        translation.use_default_instruction = false;
    }

    if args.trim_overlap {
        config.merge.mode = MergeMode::TrimOverlap;
    }
    if args.timeout.is_some() {
        config.network.request_timeout_secs = args.timeout;
    }
}

pub fn estimate(mut config: TranslatorConfig, file: &Path, chunking: &ChunkingArgs) -> Result<()> {
    apply_chunking(&mut config, chunking);
    let document = Document::from_path(file)
        .with_context(|| format!("reading {}", file.display()))?;

    let mut session = TranslationSession::from_config(&config);
    session.load_document(document);

    if let Some(estimate) = session.estimate() {
        println!(
            "{} lines, {}",
            session.document().map(Document::line_count).unwrap_or(0),
            estimate.summary()
        );
    }
    Ok(())
}

pub async fn translate(
    mut config: TranslatorConfig,
    store: &dyn KeyValueStore,
    args: TranslateArgs,
) -> Result<()> {
    apply_translate_args(&mut config, &args);

    let document = Document::from_path(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;

    let provider = config.translation.provider;
    let stored = ProviderSettings::load(store, provider);
    let settings = config.run_settings(
        args.api_key.clone().or(stored.api_key),
        args.model.clone().or(stored.model),
    );

    let mut session = TranslationSession::from_config(&config);
    session.load_document(document);
    if let Some(estimate) = session.estimate() {
        info!("{}", estimate.summary());
    }

    let stop = session.stop_handle();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; stopping after the current chunk");
            stop.stop();
        }
    });
    let result = session.translate_with_settings(&settings, &LogSink).await;
    watcher.abort();

    let outcome = result?;
    let state = outcome.state;
    let completed = outcome.completed();
    let total = outcome.total();
    let failure = outcome
        .failure
        .as_ref()
        .map(|failure| format!("chunk {}: {}", failure.index + 1, failure.error));

    if args.show_log {
        eprint!("{}", session.activity().render());
    }

    if session.translated_text().is_some() {
        let model = settings.model.as_deref().unwrap_or_default();
        write_outputs(&session, &config, model, &args)?;
    }

    match state {
        RunState::Completed => {
            println!("Translated {completed}/{total} chunks.");
            Ok(())
        }
        RunState::Cancelled => {
            println!("Cancelled after {completed}/{total} chunks.");
            Ok(())
        }
        _ => bail!(
            "translation stopped at {}",
            failure.unwrap_or_else(|| "an unknown chunk".into())
        ),
    }
}

fn write_outputs(
    session: &TranslationSession,
    config: &TranslatorConfig,
    model: &str,
    args: &TranslateArgs,
) -> Result<()> {
    let target = &config.translation.target_lang;

    if args.print {
        if let Some(text) = session.translated_text() {
            println!("{text}");
        }
    }

    let path = session
        .save_translation(&args.out_dir, target)
        .context("writing translated file")?;
    println!("Saved {}", path.display());

    if args.bundle {
        let info = BundleInfo {
            source_language: &config.translation.source_lang,
            target_language: target,
            total_chunks: session.chunks().len(),
            provider: config.translation.provider,
            model,
        };
        let bundle = session
            .save_bundle(&args.out_dir, &info)
            .context("writing bundle")?;
        println!("Saved {}", bundle.display());
    }

    if args.open {
        open_output_folder(&args.out_dir).context("opening output folder")?;
    }
    Ok(())
}

pub fn keys_set(
    store: &dyn KeyValueStore,
    provider: ProviderId,
    api_key: Option<String>,
    model: Option<String>,
) -> Result<()> {
    if api_key.is_none() && model.is_none() {
        bail!("nothing to store; pass --api-key and/or --model");
    }
    ProviderSettings { api_key, model }
        .save(store, provider)
        .context("saving provider settings")?;
    println!("Saved settings for {provider}.");
    Ok(())
}

pub fn keys_show(store: &dyn KeyValueStore, provider: Option<ProviderId>) -> Result<()> {
    let providers = match provider {
        Some(provider) => vec![provider],
        None => ProviderId::ALL.to_vec(),
    };
    for provider in providers {
        let settings = ProviderSettings::load(store, provider);
        println!(
            "{:<11} key: {:<12} model: {}",
            provider.label(),
            settings.api_key.as_deref().map(mask).unwrap_or_else(|| "-".into()),
            settings.model.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn mask(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    if key.chars().count() <= 4 {
        "****".into()
    } else {
        format!("{visible}****")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_translator_core::store::MemoryStore;
    use doc_translator_core::ChunkPlan;

    fn plan_for(chunking: &ChunkingArgs) -> ChunkPlan {
        let mut config = TranslatorConfig::default();
        apply_chunking(&mut config, chunking);
        config.chunk_plan()
    }

    #[test]
    fn chunking_flags_switch_to_manual_plan() {
        assert_eq!(plan_for(&ChunkingArgs::default()), ChunkPlan::auto());
        let plan = plan_for(&ChunkingArgs {
            max_lines: Some(80),
            overlap: None,
        });
        assert_eq!(plan, ChunkPlan::manual(80, 0));
    }

    fn translate_args(extra: &[&str]) -> TranslateArgs {
        use clap::Parser;
        let mut argv = vec!["doc-translator", "translate", "notes.txt"];
        argv.extend_from_slice(extra);
        match crate::Cli::parse_from(argv).command {
            crate::Command::Translate(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn custom_languages_resolve_on_both_sides() {
        let mut config = TranslatorConfig::default();
        let args = translate_args(&[
            "--source",
            "custom",
            "--custom-source",
            "Old Norse",
            "--target",
            "custom",
            "--custom-target",
            "Klingon",
        ]);
        apply_translate_args(&mut config, &args);
        assert_eq!(config.translation.source_lang, "Old Norse");
        assert_eq!(config.translation.target_lang, "Klingon");

        let mut config = TranslatorConfig::default();
        apply_translate_args(&mut config, &translate_args(&["--source", "ja"]));
        assert_eq!(config.translation.source_lang, "ja");
        assert_eq!(config.translation.target_lang, "en");
    }

    #[test]
    fn masks_stored_keys() {
        assert_eq!(mask("sk-abcdef"), "sk-a****");
        assert_eq!(mask("abc"), "****");
    }

    #[test]
    fn keys_set_requires_a_value() {
        let store = MemoryStore::new();
        assert!(keys_set(&store, ProviderId::Google, None, None).is_err());
        keys_set(&store, ProviderId::Google, Some("k".into()), None).unwrap();
        assert_eq!(store.get("google_api_key").as_deref(), Some("k"));
    }
}
