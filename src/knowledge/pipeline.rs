//! 문서 처리 파이프라인
//!
//! 추출된 텍스트 → 분류 → 청킹 → 청크 저장까지 한 문서를 처리하고
//! 문서 상태(pending → processing → completed | error)를 기록합니다.
//! 검색 시에는 저장소에서 후보 청크를 불러와 lexical scorer로 순위를 매깁니다.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use thiserror::Error;

use super::categorizer::{categorize, Category};
use super::cleaner::summarize;
use super::document::DocumentChunker;
use super::search::{search, tokenize_query, ScoredChunk};
use super::store::{ChunkFilter, DocumentStatus, KnowledgeStore, NewDocument};

/// 문서 요약 길이 (문자 수)
const SUMMARY_CHARACTERS: usize = 200;

// ============================================================================
// Errors
// ============================================================================

/// 문서 처리 실패
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("storage error: {0:#}")]
    Store(#[from] anyhow::Error),

    #[error("chunking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("document {0} has no stored text to reprocess")]
    NoStoredText(String),
}

// ============================================================================
// Types
// ============================================================================

/// 처리 결과
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub document_id: String,
    pub category: Category,
    pub chunk_count: usize,
    /// 같은 내용이 이미 처리되어 건너뜀
    pub skipped: bool,
}

// ============================================================================
// DocumentProcessor
// ============================================================================

/// 문서 처리기
///
/// 청킹은 순수 함수라 blocking 스레드에서 병렬로 돌려도 안전합니다.
#[derive(Clone)]
pub struct DocumentProcessor {
    store: KnowledgeStore,
    chunker: Arc<DocumentChunker>,
}

impl DocumentProcessor {
    pub fn new(store: KnowledgeStore, chunker: DocumentChunker) -> Self {
        Self {
            store,
            chunker: Arc::new(chunker),
        }
    }

    /// 기본 저장소 + 기본 청킹 설정
    pub fn open_default() -> anyhow::Result<Self> {
        Ok(Self::new(
            KnowledgeStore::open_default()?,
            DocumentChunker::default(),
        ))
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    /// 새 문서 처리
    ///
    /// 같은 해시의 완료된 문서가 있으면 `force`가 아닌 한 건너뜁니다.
    pub async fn ingest(&self, doc: NewDocument, force: bool) -> Result<IngestOutcome, ProcessError> {
        let hash = content_hash(&doc.content);

        if !force {
            if let Some(existing) = self.store.find_by_hash(&hash)? {
                tracing::info!(
                    "Skipping {}: same content as document {}",
                    doc.filename,
                    existing.id
                );
                return Ok(IngestOutcome {
                    document_id: existing.id,
                    category: existing.category,
                    chunk_count: existing.chunk_count,
                    skipped: true,
                });
            }
        }

        let category = doc
            .category
            .unwrap_or_else(|| categorize(&doc.filename, &doc.content));
        let summary = summarize(&doc.content, SUMMARY_CHARACTERS);

        let id = self.store.create_document(&doc, category, &hash, &summary)?;
        let chunk_count = self.run(&id, &doc.filename, doc.content).await?;

        Ok(IngestOutcome {
            document_id: id,
            category,
            chunk_count,
            skipped: false,
        })
    }

    /// 저장된 원문으로 청크 전체 재생성
    ///
    /// 추출에 실패해 원문이 없는 문서는 상태를 건드리지 않고 거부합니다.
    pub async fn reprocess(&self, id: &str) -> Result<IngestOutcome, ProcessError> {
        let doc = self
            .store
            .get_document(id)?
            .ok_or_else(|| ProcessError::NotFound(id.to_string()))?;

        if doc.content.trim().is_empty() {
            return Err(ProcessError::NoStoredText(doc.id));
        }

        let chunk_count = self.run(&doc.id, &doc.filename, doc.content).await?;

        Ok(IngestOutcome {
            document_id: doc.id,
            category: doc.category,
            chunk_count,
            skipped: false,
        })
    }

    /// 추출 단계에서 실패한 파일을 error 상태 문서로 기록
    pub fn record_failure(&self, filename: &str, error: &ProcessError) -> anyhow::Result<String> {
        let doc = NewDocument {
            filename: filename.to_string(),
            content: String::new(),
            category: None,
        };

        let id = self
            .store
            .create_document(&doc, Category::General, &content_hash(""), "")?;
        self.store
            .set_status(&id, DocumentStatus::Error, Some(&error.to_string()))?;

        tracing::warn!("Recorded failed document {}: {}", filename, error);
        Ok(id)
    }

    /// 상태 전이 + 청킹 + 저장
    async fn run(&self, id: &str, filename: &str, content: String) -> Result<usize, ProcessError> {
        self.store.set_status(id, DocumentStatus::Processing, None)?;

        match self.chunk_and_store(id, filename, content).await {
            Ok(count) => {
                self.store.set_status(id, DocumentStatus::Completed, None)?;
                if count == 0 {
                    tracing::warn!("Document {} produced no chunks", filename);
                }
                Ok(count)
            }
            Err(e) => {
                tracing::error!("Processing {} failed: {}", filename, e);
                if let Err(status_err) =
                    self.store
                        .set_status(id, DocumentStatus::Error, Some(&e.to_string()))
                {
                    tracing::error!("Failed to record error status for {}: {}", id, status_err);
                }
                Err(e)
            }
        }
    }

    async fn chunk_and_store(
        &self,
        id: &str,
        filename: &str,
        content: String,
    ) -> Result<usize, ProcessError> {
        let chunker = Arc::clone(&self.chunker);
        let document_id = id.to_string();
        let filename = filename.to_string();

        let chunks = tokio::task::spawn_blocking(move || {
            chunker.chunk_document(&document_id, &filename, &content)
        })
        .await?;

        Ok(self.store.replace_chunks(id, &chunks)?)
    }

    /// 키워드 검색
    ///
    /// 점수가 0보다 클 수 있는 청크(쿼리 단어나 쿼리 전체를 포함)만 저장소에서 불러온 뒤
    /// lexical scorer로 상위 결과를 고릅니다.
    pub fn query(
        &self,
        query: &str,
        filter: &ChunkFilter,
        max_results: usize,
    ) -> anyhow::Result<Vec<ScoredChunk>> {
        let terms = tokenize_query(query);
        if terms.is_empty() {
            return Ok(vec![]);
        }

        let mut needles = terms;
        let phrase = query.trim().to_lowercase();
        if !needles.contains(&phrase) {
            needles.push(phrase);
        }

        let candidates = self.store.candidate_chunks(&needles, filter)?;
        Ok(search(&candidates, query, max_results))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 문서 내용 SHA-256 (hex)
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

// ============================================================================
// Tests
// ============================================================================
