use crate::types::{AppError, ChunkMetadata, DocumentChunk, LoadedDocument, Result};
use sha2::{Digest, Sha256};
use text_splitter::{ChunkConfig, TextSplitter};

/// Character-bounded splitter that prefers semantic boundaries
/// (paragraphs, sentences, words) before falling back to raw characters.
pub struct TextChunker {
    splitter: TextSplitter<text_splitter::Characters>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    /// Fails with `InvalidInput` unless `0 <= chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(AppError::InvalidInput(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        let config = ChunkConfig::new(chunk_size)
            .with_overlap(chunk_overlap)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        Ok(Self {
            splitter: TextSplitter::new(config),
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        self.splitter
            .chunks(text)
            .filter(|chunk| !chunk.trim().is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Split every document, numbering chunks per document.
    pub fn split_documents(&self, documents: &[LoadedDocument]) -> Vec<DocumentChunk> {
        documents
            .iter()
            .flat_map(|doc| {
                self.chunk(&doc.content)
                    .into_iter()
                    .enumerate()
                    .map(move |(chunk_index, content)| DocumentChunk {
                        content,
                        metadata: ChunkMetadata {
                            source: doc.source.clone(),
                            page: doc.page,
                            chunk_index,
                        },
                    })
            })
            .collect()
    }
}

/// Stable record id derived from the chunk's origin and text, so re-ingesting
/// unchanged data overwrites instead of duplicating.
pub fn record_id(chunk: &DocumentChunk) -> String {
    let mut hasher = Sha256::new();
    hasher.update(chunk.metadata.source.as_bytes());
    hasher.update([0u8]);
    match chunk.metadata.page {
        Some(page) => hasher.update(page.to_le_bytes()),
        None => hasher.update(b"-"),
    }
    hasher.update([0u8]);
    hasher.update((chunk.metadata.chunk_index as u64).to_le_bytes());
    hasher.update([0u8]);
    hasher.update(chunk.content.as_bytes());
    hex::encode(hasher.finalize())
}
