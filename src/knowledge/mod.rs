//! Knowledge 모듈 - 문서 청킹 + 키워드 검색
//!
//! - Cleaner / Sections / Chunker / Filter: 문서 텍스트 → 청크 (순수 함수)
//! - Search: 부분 문자열/단어 빈도 기반 lexical 검색
//! - Categorizer: HR 문서 카테고리 추정
//! - Store: SQLite 문서/청크 저장소
//! - Pipeline: 문서 처리 상태 관리 + 검색 진입점

mod categorizer;
mod chunker;
mod cleaner;
mod document;
mod filter;
mod pipeline;
mod search;
mod sections;
mod store;

// Re-exports
pub use categorizer::{categorize, Category};
pub use chunker::{
    compute_overlap, paragraph_chunker, word_count, Chunk, ChunkConfig, Chunker,
    ParagraphChunker, RawChunk,
};
pub use cleaner::{clean_for_chunking, flatten, summarize};
pub use document::DocumentChunker;
pub use filter::{check_chunk, post_process, post_process_with, DropReason, FilterConfig};
pub use pipeline::{content_hash, DocumentProcessor, IngestOutcome, ProcessError};
pub use search::{
    score_chunk, search, tokenize_query, ScoredChunk, DEFAULT_MAX_RESULTS, EXACT_PHRASE_BONUS,
};
pub use sections::{identify_sections, identify_sections_with, HeadingKind, Section};
pub use store::{
    get_data_dir, ChunkFilter, Document, DocumentStatus, KnowledgeStore, NewDocument, StoreStats,
    DATA_DIR_ENV,
};
