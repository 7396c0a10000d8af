//! PDF ingestion into the vector store.
//!
//! Extracts text from every PDF in a directory, splits it into overlapping
//! chunks, and embeds them into the store in fixed-size batches, one file at
//! a time.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::core::StoredChunk;
use crate::error::Result;
use crate::retrieval::SqliteVectorStore;

/// Target chunk length in characters.
pub const CHUNK_SIZE: usize = 500;
/// Characters shared between consecutive chunks.
pub const CHUNK_OVERLAP: usize = 50;
/// Chunks embedded per store write.
pub const BATCH_SIZE: usize = 100;

/// Outcome of an ingest run.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// PDFs whose text was extracted.
    pub documents: usize,
    /// Chunks written to the store.
    pub chunks: usize,
    /// PDFs that could not be read, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Lists `*.pdf` files directly inside `dir`, sorted by path.
///
/// A missing directory yields an empty list.
///
/// # Errors
///
/// Returns an I/O error if the directory exists but cannot be read.
pub fn find_pdfs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut pdfs: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    pdfs.sort();
    Ok(pdfs)
}

/// Splits `text` into chunks of at most `size` characters, overlapping by
/// `overlap` characters.
///
/// Cuts prefer, in order: a blank line, a line break, then any whitespace in
/// the second half of the window. Cuts always fall on grapheme boundaries.
#[must_use]
pub fn split_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let size = size.max(1);
    let overlap = overlap.min(size - 1);
    let graphemes: Vec<(usize, &str)> = text.grapheme_indices(true).collect();
    let total = graphemes.len();
    let byte_at = |idx: usize| graphemes.get(idx).map_or(text.len(), |(b, _)| *b);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < total {
        let mut end = (start + size).min(total);
        if end < total {
            end = preferred_cut(&graphemes, start + size / 2, end).unwrap_or(end);
        }

        let piece = text[byte_at(start)..byte_at(end)].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
        if end >= total {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }
    chunks
}

/// Finds the best cut in `(from, to]`, returning the index after the separator.
fn preferred_cut(graphemes: &[(usize, &str)], from: usize, to: usize) -> Option<usize> {
    let window = from.max(1)..=to;
    let is_ws = |g: &str| g.chars().all(char::is_whitespace);

    window
        .clone()
        .rev()
        .find(|&i| i >= 2 && graphemes[i - 1].1 == "\n" && graphemes[i - 2].1 == "\n")
        .or_else(|| window.clone().rev().find(|&i| graphemes[i - 1].1.contains('\n')))
        .or_else(|| window.rev().find(|&i| is_ws(graphemes[i - 1].1)))
}

/// Extracts text from each PDF in parallel.
///
/// Returns `(extracted, failed)`; a PDF that cannot be parsed does not stop
/// the others.
#[must_use]
pub fn extract_documents(paths: &[PathBuf]) -> (Vec<(PathBuf, String)>, Vec<(PathBuf, String)>) {
    let results: Vec<(PathBuf, std::result::Result<String, String>)> = paths
        .par_iter()
        .map(|path| {
            let text = std::fs::read(path)
                .map_err(|e| e.to_string())
                .and_then(|bytes| {
                    // pdf-extract panics on some malformed inputs
                    std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes))
                        .map_err(|_| "PDF parser panicked".to_string())?
                        .map_err(|e| e.to_string())
                });
            (path.clone(), text)
        })
        .collect();

    let mut extracted = Vec::new();
    let mut failed = Vec::new();
    for (path, result) in results {
        match result {
            Ok(text) => extracted.push((path, text)),
            Err(reason) => {
                warn!(path = %path.display(), %reason, "skipping unreadable PDF");
                failed.push((path, reason));
            }
        }
    }
    (extracted, failed)
}

/// Ingests every PDF in `dir` into `store`.
///
/// Each file replaces the chunks previously stored under its path. A file
/// whose chunks fail to embed keeps its earlier chunks.
///
/// # Errors
///
/// Returns an error if the directory cannot be read or the store rejects a
/// document (embedding or database failure).
pub async fn ingest_directory(dir: &Path, store: &SqliteVectorStore) -> Result<IngestReport> {
    let pdfs = find_pdfs(dir)?;
    if pdfs.is_empty() {
        return Ok(IngestReport::default());
    }
    info!(count = pdfs.len(), dir = %dir.display(), "loading documents");

    let (documents, skipped) = extract_documents(&pdfs);

    let mut written = 0;
    for (path, text) in &documents {
        let source = path.display().to_string();
        let chunks: Vec<StoredChunk> = split_text(text, CHUNK_SIZE, CHUNK_OVERLAP)
            .into_iter()
            .enumerate()
            .map(|(i, content)| StoredChunk::new(content, source.clone(), i))
            .collect();
        let stored = store.replace_source(&source, &chunks, BATCH_SIZE).await?;
        info!(source = %source, chunks = stored, "stored document");
        written += stored;
    }
    info!(documents = documents.len(), chunks = written, "ingest complete");

    Ok(IngestReport {
        documents: documents.len(),
        chunks: written,
        skipped,
    })
}
