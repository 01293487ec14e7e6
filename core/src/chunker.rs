/// Line-window chunking and merging for translation runs
use serde::{Deserialize, Serialize};

/// Baseline window size used by auto mode to decide how many windows a
/// document needs.
pub const AUTO_TARGET_LINES: usize = 300;
pub const AUTO_MIN_LINES: usize = 50;
pub const AUTO_MAX_LINES: usize = 500;
pub const AUTO_MAX_OVERLAP: usize = 5;

pub const DEFAULT_MAX_LINES: usize = 300;
pub const DEFAULT_OVERLAP: usize = 0;

/// User-facing chunking settings.
///
/// When `auto` is set the line values are ignored and derived from the
/// document length instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkPlan {
    pub max_lines_per_chunk: usize,
    pub overlap_lines: usize,
    pub auto: bool,
}

impl Default for ChunkPlan {
    fn default() -> Self {
        Self {
            max_lines_per_chunk: DEFAULT_MAX_LINES,
            overlap_lines: DEFAULT_OVERLAP,
            auto: true,
        }
    }
}

impl ChunkPlan {
    pub fn auto() -> Self {
        Self::default()
    }

    pub fn manual(max_lines_per_chunk: usize, overlap_lines: usize) -> Self {
        Self {
            max_lines_per_chunk,
            overlap_lines,
            auto: false,
        }
    }

    /// Resolves the window size and overlap actually used for `total_lines`.
    ///
    /// The returned overlap is always strictly smaller than the window size.
    pub fn effective(&self, total_lines: usize) -> (usize, usize) {
        if self.auto {
            let windows = div_ceil(total_lines, AUTO_TARGET_LINES).max(1);
            let max_lines = div_ceil(total_lines, windows).clamp(AUTO_MIN_LINES, AUTO_MAX_LINES);
            let overlap = (max_lines / 20).min(AUTO_MAX_OVERLAP);
            (max_lines, overlap)
        } else {
            let max_lines = self.max_lines_per_chunk.max(1);
            let overlap = self.overlap_lines.min(max_lines - 1);
            (max_lines, overlap)
        }
    }
}

/// A contiguous slice of document lines; `end_line` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub index: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
}

impl Chunk {
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line
    }
}

/// Preview numbers for the UI, computed without building chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkEstimate {
    pub chunk_count: usize,
    pub effective_max: usize,
    pub effective_overlap: usize,
}

impl ChunkEstimate {
    pub fn summary(&self) -> String {
        format!(
            "Estimate: {} chunks • Max {} lines/chunk • Overlap {}",
            self.chunk_count, self.effective_max, self.effective_overlap
        )
    }
}

/// How translated chunks are stitched back together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeMode {
    /// Join every chunk as-is. Overlapping lines show up twice.
    #[default]
    Concatenate,
    /// Drop the leading overlap lines of every chunk after the first.
    TrimOverlap,
}

pub fn split<S: AsRef<str>>(lines: &[S], plan: &ChunkPlan) -> Vec<Chunk> {
    let total = lines.len();
    if total == 0 {
        return vec![Chunk {
            index: 0,
            start_line: 0,
            end_line: 0,
            content: String::new(),
        }];
    }

    let (max_lines, overlap) = plan.effective(total);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total {
        let end = total.min(start + max_lines);
        let content = lines[start..end]
            .iter()
            .map(|line| line.as_ref())
            .collect::<Vec<_>>()
            .join("\n");
        chunks.push(Chunk {
            index: chunks.len(),
            start_line: start,
            end_line: end,
            content,
        });
        if end == total {
            break;
        }
        start = end - overlap;
    }

    chunks
}

pub fn estimate(total_lines: usize, plan: &ChunkPlan) -> ChunkEstimate {
    let (max_lines, overlap) = plan.effective(total_lines);
    let step = max_lines - overlap;
    let chunk_count = if total_lines <= overlap {
        1
    } else {
        div_ceil(total_lines - overlap, step).max(1)
    };

    ChunkEstimate {
        chunk_count,
        effective_max: max_lines,
        effective_overlap: overlap,
    }
}

/// Joins translated chunks with `\n`, in the order given.
pub fn merge<S: AsRef<str>>(chunks: &[S]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.as_ref())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Like [`merge`], but honours `mode`. `chunks` holds one entry per split
/// chunk in order and `overlap` is the effective overlap they were split with.
///
/// Empty entries contribute nothing. With [`MergeMode::TrimOverlap`] a chunk
/// loses its leading `overlap` lines only when the chunk right before it
/// produced text, since otherwise those lines appear nowhere else.
pub fn merge_with<S: AsRef<str>>(chunks: &[S], mode: MergeMode, overlap: usize) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(chunks.len());
    let mut previous_contributed = false;

    for chunk in chunks {
        let text = chunk.as_ref();
        if text.is_empty() {
            previous_contributed = false;
            continue;
        }

        let trim = mode == MergeMode::TrimOverlap && overlap > 0 && previous_contributed;
        if !trim {
            parts.push(text);
        } else if let Some(rest) = skip_lines(text, overlap) {
            parts.push(rest);
        }
        previous_contributed = true;
    }
    parts.join("\n")
}

/// Returns the text after the first `count` lines, or `None` when nothing is
/// left.
fn skip_lines(text: &str, count: usize) -> Option<&str> {
    let mut offset = 0;
    for _ in 0..count {
        match text[offset..].find('\n') {
            Some(position) => offset += position + 1,
            None => return None,
        }
    }
    Some(&text[offset..])
}

fn div_ceil(value: usize, divisor: usize) -> usize {
    if value == 0 {
        0
    } else {
        (value - 1) / divisor + 1
    }
}
