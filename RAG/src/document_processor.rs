use crate::config::ChunkingConfig;
use crate::models::*;
use anyhow::{anyhow, Result};
use pdf_extract::extract_text;
use regex::Regex;
use std::collections::VecDeque;
use std::io::Write;
use std::path::PathBuf;
use std::sync::LazyLock;
use uuid::Uuid;

const SEPARATOR: &str = "\n\n";

const PAGE_BREAK: char = '\x0c';

static RE_CARRIAGE_RETURN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n?").expect("carriage return regex"));

pub struct DocumentProcessor {
    chunking: ChunkingConfig,
}

impl DocumentProcessor {
    pub fn new(chunking: ChunkingConfig) -> Self {
        Self { chunking }
    }

    pub async fn process_pdf(&self, filename: &str, bytes: Vec<u8>) -> Result<Document> {
        log::info!("Processing PDF: {} ({} bytes)", filename, bytes.len());

        let content = extract_pdf_text(bytes).await?;
        let chunks = self.create_chunks(&content);

        Ok(Document {
            id: Uuid::new_v4().to_string(),
            filename: filename.to_string(),
            content,
            chunks,
        })
    }

    pub fn create_chunks(&self, content: &str) -> Vec<DocumentChunk> {
        let chunks: Vec<DocumentChunk> = self
            .split_text(content)
            .into_iter()
            .enumerate()
            .map(|(index, content)| DocumentChunk {
                id: Uuid::new_v4().to_string(),
                index,
                content,
                embedding: None,
            })
            .collect();

        log::info!("Created {} chunks", chunks.len());
        chunks
    }

    /// Splits on blank lines, then greedily packs the pieces back into chunks
    /// of at most `chunk_size` characters, carrying up to `chunk_overlap`
    /// characters of trailing pieces into the next chunk.
    ///
    /// Pages (form-feed separated) are chunked independently, so no chunk
    /// spans two pages.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let normalized = RE_CARRIAGE_RETURN.replace_all(text, "\n");

        normalized
            .split(PAGE_BREAK)
            .flat_map(|page| {
                let splits: Vec<&str> = page
                    .split(SEPARATOR)
                    .filter(|s| !s.is_empty())
                    .collect();
                self.merge_splits(&splits)
            })
            .collect()
    }

    fn merge_splits(&self, splits: &[&str]) -> Vec<String> {
        let chunk_size = self.chunking.chunk_size;
        let overlap = self.chunking.chunk_overlap;
        let separator_len = SEPARATOR.chars().count();

        let mut chunks = Vec::new();
        let mut current: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for split in splits {
            let len = split.chars().count();
            let joined_len = |current: &VecDeque<(&str, usize)>, total: usize| {
                total + len + if current.is_empty() { 0 } else { separator_len }
            };

            if joined_len(&current, total) > chunk_size {
                if total > chunk_size {
                    log::warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total,
                        chunk_size
                    );
                }

                if !current.is_empty() {
                    if let Some(chunk) = join_splits(&current) {
                        chunks.push(chunk);
                    }

                    while total > overlap || (joined_len(&current, total) > chunk_size && total > 0) {
                        let Some((_, first_len)) = current.front().copied() else {
                            break;
                        };
                        total -= first_len + if current.len() > 1 { separator_len } else { 0 };
                        current.pop_front();
                    }
                }
            }

            current.push_back((split, len));
            total += len + if current.len() > 1 { separator_len } else { 0 };
        }

        if let Some(chunk) = join_splits(&current) {
            chunks.push(chunk);
        }

        chunks
    }
}

fn join_splits(current: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined = current
        .iter()
        .map(|(split, _)| *split)
        .collect::<Vec<_>>()
        .join(SEPARATOR);
    let trimmed = joined.trim();

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Extracts text from an in-memory PDF by staging it in a temporary file.
///
/// The temp file is removed when it goes out of scope, including when the
/// parser fails or panics.
pub async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String> {
    extract_pdf_text_in(bytes, std::env::temp_dir()).await
}

/// Same as [`extract_pdf_text`], staging the file under `dir`.
pub async fn extract_pdf_text_in(bytes: Vec<u8>, dir: PathBuf) -> Result<String> {
    if bytes.is_empty() {
        return Err(anyhow!("Uploaded PDF is empty"));
    }

    tokio::task::spawn_blocking(move || -> Result<String> {
        let mut temp_file = tempfile::Builder::new()
            .prefix("compliance-")
            .suffix(".pdf")
            .tempfile_in(&dir)?;
        temp_file.write_all(&bytes)?;
        temp_file.flush()?;

        log::debug!("Staged PDF at {}", temp_file.path().display());

        extract_text(temp_file.path()).map_err(|e| anyhow!("Failed to extract PDF text: {}", e))
    })
    .await
    .map_err(|e| anyhow!("PDF parser aborted: {}", e))?
}
