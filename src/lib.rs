//! pulse-one - 문서 청킹 + 키워드 검색 코어
//!
//! 업로드된 HR 문서에서 추출한 텍스트를 정리/섹션 분할/청킹하여
//! SQLite에 저장하고, 채팅/문서 생성 시 근거가 될 청크를 키워드로 검색합니다.

pub mod cli;
pub mod collector;
pub mod extractor;
pub mod knowledge;

// Re-exports
pub use knowledge::{
    clean_for_chunking, flatten, identify_sections, post_process, search, Category, Chunk,
    ChunkConfig, ChunkFilter, Chunker, Document, DocumentChunker, DocumentProcessor,
    DocumentStatus, FilterConfig, KnowledgeStore, NewDocument, ParagraphChunker, ProcessError,
    RawChunk, ScoredChunk, Section, StoreStats,
};
