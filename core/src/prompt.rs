/// Translation prompt construction
///
/// Every chunk is sent as a single prompt string: a fixed rules header, the
/// task description, format-specific guidance picked from the uploaded file's
/// extension, a validation checklist and finally the chunk itself.
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_INSTRUCTION: &str = "Translate the following text naturally and accurately. Maintain the original formatting, tone, and context. For technical terms, provide appropriate translations while keeping important keywords recognizable.";

const RULES_HEADER: &str = "CRITICAL TRANSLATION RULES - FOLLOW EXACTLY:

1. PRESERVE STRUCTURE: Maintain EXACT same number of lines, paragraphs, sections, and formatting
2. PRESERVE SYNTAX: Keep all markup, tags, delimiters, brackets, quotes, and special characters UNCHANGED
3. TRANSLATE ONLY CONTENT: Only translate readable text content, NOT structure elements
4. NO ADDITIONS: Do not add explanations, notes, or extra content
5. NO DELETIONS: Do not remove or skip any part of the original
6. NO REFORMATTING: Keep exact spacing, indentation, and line breaks";

const VALIDATION_CHECKLIST: &str = "VALIDATION CHECKPOINT:
Before outputting, verify:
✓ Same number of lines as input
✓ Same structure/format preserved
✓ No missing content
✓ No added explanations
✓ Syntax elements unchanged
✓ Only content text translated";

const OUTPUT_LINE: &str =
    "OUTPUT: Return the exact same structure with only the translatable text converted to target language.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Txt,
    Csv,
    Markdown,
    Json,
    Srt,
    Vtt,
    Xml,
    Yaml,
    Log,
    Other,
}

impl DocumentFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "txt" => Self::Txt,
            "csv" => Self::Csv,
            "md" => Self::Markdown,
            "json" => Self::Json,
            "srt" => Self::Srt,
            "vtt" => Self::Vtt,
            "xml" => Self::Xml,
            "yaml" | "yml" => Self::Yaml,
            "log" => Self::Log,
            _ => Self::Other,
        }
    }

    /// Files without an extension are treated as plain text.
    pub fn from_file_name(file_name: &str) -> Self {
        Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Txt)
    }

    fn rules(&self) -> &'static str {
        match self {
            Self::Txt => "TRANSLATE TEXT FILE - CRITICAL RULES:\n- Keep exact line breaks and paragraph spacing\n- Preserve any special formatting (bullets, numbers, dashes)\n- Translate only readable text, keep symbols unchanged\n- Maintain exact character count per line structure where possible\n- Do not merge or split paragraphs",
            Self::Csv => "TRANSLATE CSV FILE - CRITICAL RULES:\n- Preserve ALL commas, quotes, and delimiters EXACTLY\n- Keep header row structure identical\n- Translate only cell content, NOT column names (unless specified)\n- Maintain exact number of columns and rows\n- Preserve empty cells as empty\n- Keep any escape characters or special CSV formatting",
            Self::Markdown => "TRANSLATE MARKDOWN FILE - CRITICAL RULES:\n- Keep ALL markdown syntax: #, *, **, _, `, [], (), etc.\n- Preserve exact heading levels and structure\n- Keep link URLs unchanged, translate only link text\n- Maintain code blocks untranslated (```code```)\n- Keep table structure identical\n- Preserve line breaks and spacing exactly",
            Self::Json => "TRANSLATE JSON FILE - CRITICAL RULES:\n- Keep ALL JSON syntax: {}, [], \"\", :, , exactly as is\n- Translate only string VALUES, never keys or structure\n- Maintain exact indentation and formatting\n- Preserve escape characters (\\n, \\t, \\\", etc.)\n- Keep numeric and boolean values unchanged\n- Ensure valid JSON output",
            Self::Srt => "TRANSLATE SUBTITLE FILE - CRITICAL RULES:\n- Keep ALL timestamp formats EXACTLY (00:00:00,000 --> 00:00:00,000)\n- Preserve subtitle numbering sequence\n- Maintain exact timing and cue structure\n- Translate only subtitle text content\n- Keep speaker labels if present\n- Preserve line breaks within subtitles",
            Self::Vtt => "TRANSLATE SUBTITLE FILE - CRITICAL RULES:\n- Keep ALL timestamp formats EXACTLY (00:00:00.000 --> 00:00:00.000)\n- Preserve cue timing and WebVTT format\n- Maintain exact timing and cue structure\n- Translate only subtitle text content\n- Keep speaker labels if present\n- Preserve line breaks within subtitles",
            Self::Xml => "TRANSLATE XML FILE - CRITICAL RULES:\n- Keep ALL XML tags unchanged: <tag>, </tag>, <tag/>\n- Preserve attributes and values in tags\n- Translate only text content between tags\n- Maintain exact tag hierarchy and nesting\n- Keep CDATA sections format\n- Preserve XML declarations and namespaces",
            Self::Yaml => "TRANSLATE YAML FILE - CRITICAL RULES:\n- Keep ALL YAML syntax: indentation, dashes, colons\n- Preserve exact spacing and structure\n- Translate only string values, keep keys unchanged\n- Maintain list and dictionary structures\n- Keep comments (# lines) in original language or translate if needed\n- Preserve multi-line string formats",
            Self::Log => "TRANSLATE LOG FILE - CRITICAL RULES:\n- Keep ALL timestamps and log levels unchanged\n- Preserve exact log entry format and structure\n- Translate only human-readable message content\n- Keep technical identifiers, IPs, codes unchanged\n- Maintain chronological order\n- Preserve any log formatting patterns",
            Self::Other => "Preserve original formatting exactly.",
        }
    }
}

/// Everything about a run that stays the same from chunk to chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    pub source_lang: String,
    pub target_lang: String,
    pub instruction: Option<String>,
    /// Upper-cased extension shown as the content type.
    pub content_type: String,
    pub format: DocumentFormat,
}

impl PromptContext {
    pub fn new(file_name: &str, source_lang: &str, target_lang: &str) -> Self {
        let content_type = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("txt")
            .to_uppercase();

        Self {
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            instruction: None,
            content_type,
            format: DocumentFormat::from_file_name(file_name),
        }
    }

    pub fn with_instruction(mut self, instruction: Option<String>) -> Self {
        self.instruction = instruction
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self
    }

    pub fn build(&self, content: &str) -> String {
        build_prompt(
            content,
            &self.source_lang,
            &self.target_lang,
            self.instruction.as_deref(),
            &self.content_type,
            self.format,
        )
    }
}

/// Picks the instruction for a run: the custom text unless it is blank or the
/// caller asked for the default.
pub fn resolve_instruction(custom: Option<&str>, use_default: bool) -> String {
    match custom.map(str::trim) {
        Some(text) if !use_default && !text.is_empty() => text.to_string(),
        _ => DEFAULT_INSTRUCTION.to_string(),
    }
}

pub fn build_prompt(
    content: &str,
    source_lang: &str,
    target_lang: &str,
    instruction: Option<&str>,
    content_type: &str,
    format: DocumentFormat,
) -> String {
    let mut prompt = String::with_capacity(content.len() + 2048);

    prompt.push_str(RULES_HEADER);
    prompt.push_str("\n\nTRANSLATION TASK:\n");
    prompt.push_str(&format!("- Source Language: {source_lang}\n"));
    prompt.push_str(&format!("- Target Language: {target_lang}\n"));
    prompt.push_str(&format!("- Content Type: {content_type}\n\n"));

    if let Some(instruction) = instruction.filter(|text| !text.trim().is_empty()) {
        prompt.push_str(&format!("CUSTOM INSTRUCTION: {instruction}\n"));
    }
    prompt.push_str("\n\n");

    prompt.push_str(format.rules());
    prompt.push_str("\n\n");
    prompt.push_str(VALIDATION_CHECKLIST);
    prompt.push_str("\n\nINPUT CONTENT:\n");
    prompt.push_str(content);
    prompt.push_str("\n\n");
    prompt.push_str(OUTPUT_LINE);

    prompt
}
