use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use doc_translator_core::ProviderId;
use log::error;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "doc-translator", version, about, long_about = None)]
struct Cli {
    /// JSON or YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Settings file holding API keys and model names
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show how a document would be split into chunks
    Estimate {
        file: PathBuf,

        #[command(flatten)]
        chunking: ChunkingArgs,
    },
    /// Translate a document chunk by chunk
    Translate(TranslateArgs),
    /// Manage stored API keys and model names
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },
    /// Write a config file with default values
    InitConfig { path: PathBuf },
}

#[derive(Args, Debug, Default)]
pub struct ChunkingArgs {
    /// Lines per chunk; turns off automatic sizing
    #[arg(long)]
    pub max_lines: Option<usize>,

    /// Lines repeated at the start of the next chunk; turns off automatic sizing
    #[arg(long)]
    pub overlap: Option<usize>,
}

#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// Plain text document to translate
    pub file: PathBuf,

    #[command(flatten)]
    pub chunking: ChunkingArgs,

    /// google, openrouter or cerebras
    #[arg(short, long)]
    pub provider: Option<ProviderId>,

    /// Model name; falls back to the stored one
    #[arg(short, long)]
    pub model: Option<String>,

    /// API key; falls back to the stored one
    #[arg(long, env = "DOC_TRANSLATOR_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Source language, "auto", or "custom" together with --custom-source
    #[arg(short, long)]
    pub source: Option<String>,

    /// Free-text source language used when --source is "custom"
    #[arg(long)]
    pub custom_source: Option<String>,

    /// Target language, or "custom" together with --custom-target
    #[arg(short, long)]
    pub target: Option<String>,

    /// Free-text target language used when --target is "custom"
    #[arg(long)]
    pub custom_target: Option<String>,

    /// Custom instruction replacing the default one
    #[arg(short, long)]
    pub instruction: Option<String>,

    /// Drop repeated overlap lines when merging
    #[arg(long)]
    pub trim_overlap: bool,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Directory for the translated file
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Also write a zip with the original, the translation and metadata
    #[arg(long)]
    pub bundle: bool,

    /// Open the output directory when done
    #[arg(long)]
    pub open: bool,

    /// Print the merged translation to stdout
    #[arg(long)]
    pub print: bool,

    /// Print the activity log to stderr when done
    #[arg(long)]
    pub show_log: bool,
}

#[derive(Subcommand, Debug)]
enum KeysAction {
    /// Store the API key and/or model name for a provider
    Set {
        provider: ProviderId,

        #[arg(long)]
        api_key: Option<String>,

        #[arg(long)]
        model: Option<String>,
    },
    /// Show what is stored (keys are masked)
    Show { provider: Option<ProviderId> },
}

async fn run(cli: Cli) -> Result<()> {
    let config = commands::load_config(cli.config.as_deref())?;
    let store = commands::open_store(cli.settings);

    match cli.command {
        Command::Estimate { file, chunking } => commands::estimate(config, &file, &chunking),
        Command::Translate(args) => commands::translate(config, &store, args).await,
        Command::Keys { action } => match action {
            KeysAction::Set {
                provider,
                api_key,
                model,
            } => commands::keys_set(&store, provider, api_key, model),
            KeysAction::Show { provider } => commands::keys_show(&store, provider),
        },
        Command::InitConfig { path } => commands::init_config(&config, &path),
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        error!("{:#}", err);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_translate_flags() {
        let cli = Cli::parse_from([
            "doc-translator",
            "translate",
            "notes.txt",
            "--provider",
            "openrouter",
            "--max-lines",
            "120",
            "--target",
            "custom",
            "--custom-target",
            "Klingon",
            "--bundle",
        ]);
        match cli.command {
            Command::Translate(args) => {
                assert_eq!(args.provider, Some(ProviderId::OpenRouter));
                assert_eq!(args.chunking.max_lines, Some(120));
                assert_eq!(args.custom_target.as_deref(), Some("Klingon"));
                assert!(args.bundle);
                assert!(!args.open);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_provider() {
        let result = Cli::try_parse_from(["doc-translator", "keys", "show", "grok"]);
        assert!(result.is_err());
    }
}
