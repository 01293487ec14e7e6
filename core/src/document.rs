/// Loaded source documents and text decoding
use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::prompt::DocumentFormat;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Please upload a plain text file: {0}")]
    NotPlainText(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
}

/// An uploaded text file. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    file_name: String,
    content: String,
    encoding: Encoding,
}

impl Document {
    pub fn new(file_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
            encoding: Encoding::Utf8,
        }
    }

    /// Decodes raw file bytes. Only UTF-8 and BOM-marked UTF-16 are accepted;
    /// anything that looks binary is rejected.
    pub fn from_bytes(file_name: impl Into<String>, bytes: &[u8]) -> Result<Self, DocumentError> {
        let file_name = file_name.into();
        let (content, encoding) = decode(bytes)
            .ok_or_else(|| DocumentError::NotPlainText(file_name.clone()))?;

        if content.contains('\0') {
            return Err(DocumentError::NotPlainText(file_name));
        }

        Ok(Self {
            file_name,
            content,
            encoding,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let bytes = fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.txt".to_string());
        Self::from_bytes(file_name, &bytes)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Lines split on `\n`. An empty document is a single empty line and a
    /// trailing newline yields a trailing empty line.
    pub fn lines(&self) -> Vec<&str> {
        self.content.split('\n').collect()
    }

    pub fn line_count(&self) -> usize {
        self.content.split('\n').count()
    }

    pub fn size_kb(&self) -> f64 {
        self.content.len() as f64 / 1024.0
    }

    pub fn format(&self) -> DocumentFormat {
        DocumentFormat::from_file_name(&self.file_name)
    }
}

fn decode(bytes: &[u8]) -> Option<(String, Encoding)> {
    if let Some(rest) = bytes.strip_prefix(b"\xEF\xBB\xBF") {
        return String::from_utf8(rest.to_vec())
            .ok()
            .map(|text| (text, Encoding::Utf8Bom));
    }

    if let Some(rest) = bytes.strip_prefix(b"\xFF\xFE") {
        return decode_utf16(rest, u16::from_le_bytes).map(|text| (text, Encoding::Utf16Le));
    }

    if let Some(rest) = bytes.strip_prefix(b"\xFE\xFF") {
        return decode_utf16(rest, u16::from_be_bytes).map(|text| (text, Encoding::Utf16Be));
    }

    std::str::from_utf8(bytes)
        .ok()
        .map(|text| (text.to_string(), Encoding::Utf8))
}

fn decode_utf16(bytes: &[u8], read: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| read([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}
