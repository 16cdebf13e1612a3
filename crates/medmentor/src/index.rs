//! Semantic document index.
//!
//! Flat nearest-neighbor index over embedded chunks: build walks a corpus
//! directory, retrieval scans with cosine similarity. The index is persisted
//! as JSON and reloaded at startup — rebuilding is an explicit offline
//! operation, never done on the query path. Readers share a `parking_lot`
//! read lock; rebuild and ingestion take the write lock, so they are
//! exclusive with queries.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::config::ChunkingConfig;
use crate::embeddings::{cosine_similarity, Embedder};
use crate::processing::{DocumentParser, TextChunker};
use crate::types::RetrievedPassage;

const INDEX_FILE: &str = "index.json";
const META_FILE: &str = "meta.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub id: Uuid,
    pub doc_id: Uuid,
    pub title: String,
    pub source: String,
    pub text: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub dimension: usize,
    pub chunk_count: usize,
    pub built_at: DateTime<Utc>,
}

pub struct DocumentIndex {
    embedder: Arc<dyn Embedder>,
    chunker: TextChunker,
    chunks: RwLock<Vec<IndexedChunk>>,
}

impl DocumentIndex {
    /// Create an empty index.
    pub fn new(embedder: Arc<dyn Embedder>, chunking: &ChunkingConfig) -> Self {
        Self {
            embedder,
            chunker: TextChunker::new(
                chunking.chunk_size,
                chunking.chunk_overlap,
                chunking.min_chunk_size,
            ),
            chunks: RwLock::new(Vec::new()),
        }
    }

    /// Build the index from a corpus directory. Supported files (txt/md/pdf)
    /// are chunked and embedded; everything else is skipped with a notice.
    pub async fn build(
        corpus_dir: &Path,
        embedder: Arc<dyn Embedder>,
        chunking: &ChunkingConfig,
    ) -> Result<Self> {
        let index = Self::new(embedder, chunking);
        let parser = DocumentParser::new();

        let mut files_indexed = 0usize;
        for entry in WalkDir::new(corpus_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let Some(doc) = parser.parse_file(entry.path())? else {
                continue;
            };
            index.ingest_document(&doc.title, &doc.source, &doc.content).await?;
            files_indexed += 1;
        }

        tracing::info!(
            corpus = %corpus_dir.display(),
            files = files_indexed,
            chunks = index.len(),
            "Document index built"
        );
        Ok(index)
    }

    /// Chunk, embed, and insert a single document's text.
    pub async fn ingest_document(&self, title: &str, source: &str, text: &str) -> Result<()> {
        let chunk_results = self.chunker.chunk(text);
        if chunk_results.is_empty() {
            tracing::warn!(title = %title, "Document produced no chunks, skipping");
            return Ok(());
        }

        let texts: Vec<&str> = chunk_results.iter().map(|c| c.text.as_str()).collect();
        let vectors = self.embedder.embed_documents(&texts).await?;

        let doc_id = Uuid::new_v4();
        let mut indexed: Vec<IndexedChunk> = chunk_results
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexedChunk {
                id: chunk.id,
                doc_id,
                title: title.to_string(),
                source: source.to_string(),
                text: chunk.text,
                vector,
            })
            .collect();

        let mut chunks = self.chunks.write();
        chunks.append(&mut indexed);
        tracing::debug!(title = %title, total_chunks = chunks.len(), "Document ingested");
        Ok(())
    }

    /// Return up to `k` passages ranked by similarity to the query, most
    /// similar first. Fewer than `k` when the corpus is smaller.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        // Embed outside the lock — the HTTP call must not block readers.
        let query_vector = self.embedder.embed_query(query).await?;

        let chunks = self.chunks.read();
        let mut scored: Vec<RetrievedPassage> = chunks
            .iter()
            .map(|chunk| RetrievedPassage {
                text: chunk.text.clone(),
                source: chunk.source.clone(),
                score: cosine_similarity(&query_vector, &chunk.vector),
            })
            .collect();
        drop(chunks);

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    /// Persist the index to an on-disk directory (serialized chunks + metadata).
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create index dir: {}", dir.display()))?;

        let chunks = self.chunks.read();
        let meta = IndexMeta {
            dimension: self.embedder.dimension(),
            chunk_count: chunks.len(),
            built_at: Utc::now(),
        };

        std::fs::write(dir.join(INDEX_FILE), serde_json::to_vec(&*chunks)?)
            .context("Failed to write index file")?;
        std::fs::write(dir.join(META_FILE), serde_json::to_vec_pretty(&meta)?)
            .context("Failed to write index metadata")?;

        tracing::info!(dir = %dir.display(), chunks = chunks.len(), "Document index saved");
        Ok(())
    }

    /// Load a previously saved index. Fails if the stored dimension does not
    /// match the embedder's.
    pub fn load(dir: &Path, embedder: Arc<dyn Embedder>, chunking: &ChunkingConfig) -> Result<Self> {
        let meta_raw = std::fs::read_to_string(dir.join(META_FILE))
            .with_context(|| format!("Failed to read index metadata in {}", dir.display()))?;
        let meta: IndexMeta = serde_json::from_str(&meta_raw).context("Malformed index metadata")?;

        if meta.dimension != embedder.dimension() {
            return Err(anyhow!(
                "index dimension {} does not match embedder dimension {}",
                meta.dimension,
                embedder.dimension()
            ));
        }

        let chunks_raw = std::fs::read_to_string(dir.join(INDEX_FILE))
            .with_context(|| format!("Failed to read index file in {}", dir.display()))?;
        let chunks: Vec<IndexedChunk> =
            serde_json::from_str(&chunks_raw).context("Malformed index file")?;

        tracing::info!(
            dir = %dir.display(),
            chunks = chunks.len(),
            built_at = %meta.built_at,
            "Document index loaded"
        );

        let index = Self::new(embedder, chunking);
        *index.chunks.write() = chunks;
        Ok(index)
    }

    /// Replace the index contents from a corpus directory. Exclusive with
    /// readers for the duration of the swap.
    pub async fn rebuild(&self, corpus_dir: &Path) -> Result<()> {
        let parser = DocumentParser::new();
        let mut replacement: Vec<IndexedChunk> = Vec::new();

        for entry in WalkDir::new(corpus_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let Some(doc) = parser.parse_file(entry.path())? else {
                continue;
            };
            let chunk_results = self.chunker.chunk(&doc.content);
            if chunk_results.is_empty() {
                continue;
            }
            let texts: Vec<&str> = chunk_results.iter().map(|c| c.text.as_str()).collect();
            let vectors = self.embedder.embed_documents(&texts).await?;
            let doc_id = Uuid::new_v4();
            replacement.extend(chunk_results.into_iter().zip(vectors).map(|(chunk, vector)| {
                IndexedChunk {
                    id: chunk.id,
                    doc_id,
                    title: doc.title.clone(),
                    source: doc.source.clone(),
                    text: chunk.text,
                    vector,
                }
            }));
        }

        let mut chunks = self.chunks.write();
        let old = chunks.len();
        *chunks = replacement;
        tracing::info!(old_chunks = old, new_chunks = chunks.len(), "Document index rebuilt");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.read().is_empty()
    }
}
