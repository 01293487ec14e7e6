//! Writing translation results to disk: the plain translated file and the
//! zip bundle with metadata.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::ai::ProviderId;
use crate::document::Document;
use crate::time::{iso_timestamp, unix_millis};

pub const METADATA_FILE_NAME: &str = "translation_metadata.json";
const DEFAULT_EXTENSION: &str = "txt";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("No results to download.")]
    NoResults,

    #[error("Please upload a file first.")]
    NoDocument,

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

static LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("en", "english"),
    ("id", "indonesia"),
    ("ja", "japanese"),
    ("es", "spanish"),
    ("fr", "french"),
    ("de", "german"),
    ("zh", "chinese"),
    ("ko", "korean"),
    ("ar", "arabic"),
    ("ru", "russian"),
    ("pt", "portuguese"),
    ("it", "italian"),
    ("nl", "dutch"),
    ("sv", "swedish"),
    ("no", "norwegian"),
    ("da", "danish"),
    ("fi", "finnish"),
    ("pl", "polish"),
    ("tr", "turkish"),
    ("hi", "hindi"),
    ("th", "thai"),
    ("vi", "vietnamese"),
    ("auto", "auto-detected"),
];

static DISALLOWED_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s-]").expect("valid slug regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static DASH_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid regex"));

/// File-name friendly name for a language tag, e.g. `ja` -> `japanese`.
pub fn language_suffix(language: &str) -> String {
    if let Some((_, name)) = LANGUAGE_NAMES.iter().find(|(tag, _)| *tag == language) {
        return (*name).to_string();
    }

    let lower = language.to_lowercase();
    let cleaned = DISALLOWED_CHARS.replace_all(&lower, "");
    let dashed = WHITESPACE_RUN.replace_all(&cleaned, "-");
    let collapsed = DASH_RUN.replace_all(&dashed, "-");
    collapsed.trim_matches('-').to_string()
}

/// `"custom"` picks the free-text language; anything else is used as-is.
pub fn resolve_language(selected: &str, custom: Option<&str>) -> String {
    if selected != "custom" {
        return selected.to_string();
    }
    custom
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

/// `report.md` translated to `ja` becomes `report-japanese.md`.
pub fn translated_file_name(original: &str, target_lang: &str) -> String {
    let (base, ext) = match original.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < original.len() => (&original[..dot], &original[dot + 1..]),
        Some(dot) if dot > 0 => (&original[..dot], DEFAULT_EXTENSION),
        _ => (original, DEFAULT_EXTENSION),
    };
    format!("{}-{}.{}", base, language_suffix(target_lang), ext)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleMetadata {
    pub original_file: String,
    pub translated_file: String,
    pub source_language: String,
    pub target_language: String,
    pub translation_date: String,
    pub total_chunks: usize,
    pub provider: String,
    pub model: String,
}

/// Everything `write_bundle` needs besides the document itself.
#[derive(Debug, Clone)]
pub struct BundleInfo<'a> {
    pub source_language: &'a str,
    pub target_language: &'a str,
    pub total_chunks: usize,
    pub provider: ProviderId,
    pub model: &'a str,
}

impl BundleMetadata {
    pub fn new(document: &Document, info: &BundleInfo<'_>, now: &DateTime<Utc>) -> Self {
        Self {
            original_file: document.file_name().to_string(),
            translated_file: translated_file_name(document.file_name(), info.target_language),
            source_language: info.source_language.to_string(),
            target_language: info.target_language.to_string(),
            translation_date: iso_timestamp(now),
            total_chunks: info.total_chunks,
            provider: info.provider.as_str().to_string(),
            model: info.model.to_string(),
        }
    }
}

/// Writes the merged translation and returns its path.
pub fn write_translated_file(
    dir: &Path,
    original_name: &str,
    target_lang: &str,
    translated: &str,
) -> ExportResult<PathBuf> {
    if translated.is_empty() {
        return Err(ExportError::NoResults);
    }

    fs::create_dir_all(dir)?;
    let path = dir.join(translated_file_name(original_name, target_lang));
    fs::write(&path, translated)?;
    info!("wrote translated file {}", path.display());
    Ok(path)
}

/// Packs original, translation and metadata into `translation_{millis}.zip`.
pub fn write_bundle(
    dir: &Path,
    document: Option<&Document>,
    translated: &str,
    info: &BundleInfo<'_>,
) -> ExportResult<PathBuf> {
    let document = document.ok_or(ExportError::NoDocument)?;
    if translated.is_empty() {
        return Err(ExportError::NoResults);
    }

    let now = Utc::now();
    let metadata = BundleMetadata::new(document, info, &now);

    fs::create_dir_all(dir)?;
    let path = dir.join(format!("translation_{}.zip", unix_millis(&now)));
    let mut writer = ZipWriter::new(File::create(&path)?);

    let options = FileOptions::<()>::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    writer.start_file(document.file_name(), options.clone())?;
    writer.write_all(document.content().as_bytes())?;

    writer.start_file(metadata.translated_file.as_str(), options.clone())?;
    writer.write_all(translated.as_bytes())?;

    writer.start_file(METADATA_FILE_NAME, options)?;
    writer.write_all(serde_json::to_string_pretty(&metadata)?.as_bytes())?;

    writer.finish()?;
    info!("wrote translation bundle {}", path.display());
    Ok(path)
}

/// Canonical form of an output directory, without `\\?\` prefixes on Windows.
pub fn canonical_dir(dir: &Path) -> ExportResult<PathBuf> {
    dunce::canonicalize(dir).map_err(|_| ExportError::PathNotFound(dir.display().to_string()))
}

pub fn open_output_folder(dir: &Path) -> ExportResult<()> {
    let path = canonical_dir(dir)?;
    open::that_detached(&path)?;
    Ok(())
}
