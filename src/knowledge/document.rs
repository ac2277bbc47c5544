//! Document Chunker
//!
//! 추출된 문서 텍스트 한 건을 저장 가능한 청크 목록으로 바꿉니다.
//!
//! clean → (짧은 문서 예외) → 섹션 식별 → 섹션별 문단 청킹 → 후처리
//!
//! 상태를 갖지 않으므로 여러 문서를 동시에 처리해도 안전합니다.

use super::chunker::{paragraph_chunker, Chunk, ChunkConfig, Chunker, RawChunk};
use super::cleaner::clean_for_chunking;
use super::filter::{into_chunk, post_process_with, FilterConfig};
use super::sections::identify_sections_with;

/// 문서 단위 청킹 파이프라인
pub struct DocumentChunker {
    config: ChunkConfig,
    chunker: Box<dyn Chunker>,
    filter: FilterConfig,
}

impl Default for DocumentChunker {
    fn default() -> Self {
        Self::new(ChunkConfig::default(), FilterConfig::default())
    }
}

impl DocumentChunker {
    pub fn new(config: ChunkConfig, filter: FilterConfig) -> Self {
        Self {
            chunker: paragraph_chunker(config.clone()),
            config,
            filter,
        }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// 문서 텍스트를 청크로 분할
    ///
    /// 빈 문서는 빈 목록을 반환합니다 (에러 아님).
    /// `filename`은 로그에만 사용됩니다.
    pub fn chunk_document(&self, document_id: &str, filename: &str, raw_text: &str) -> Vec<Chunk> {
        let cleaned = clean_for_chunking(raw_text);
        if cleaned.is_empty() {
            tracing::warn!("No text to chunk in {}", filename);
            return vec![];
        }

        let config = self.config();
        let length = cleaned.chars().count();

        // 짧은 문서는 필터 없이 통째로 한 청크
        if length < config.short_document_characters {
            tracing::info!("Chunked {}: short document, 1 chunk", filename);
            let raw = RawChunk {
                content: cleaned,
                start_offset: 0,
                end_offset: length,
            };
            return vec![into_chunk(document_id, 0, raw)];
        }

        let sections = identify_sections_with(&cleaned, config.min_section_characters);

        let raw_chunks: Vec<RawChunk> = sections
            .iter()
            .flat_map(|section| {
                self.chunker
                    .chunk(&section.content)
                    .into_iter()
                    .map(move |raw| RawChunk {
                        start_offset: raw.start_offset + section.start,
                        end_offset: raw.end_offset + section.start,
                        content: raw.content,
                    })
            })
            .collect();

        let chunks = post_process_with(document_id, raw_chunks, &self.filter);

        tracing::info!(
            "Chunked {}: {} sections, {} chunks ({} chars, {})",
            filename,
            sections.len(),
            chunks.len(),
            length,
            self.chunker.name()
        );

        chunks
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::chunker::compute_overlap;

    const SENTENCE: &str = "Employees must submit leave requests two weeks in advance.";

    fn chunker() -> DocumentChunker {
        DocumentChunker::default()
    }

    #[test]
    fn test_empty_document() {
        assert!(chunker().chunk_document("doc", "empty.txt", "").is_empty());
        assert!(chunker().chunk_document("doc", "blank.txt", " \r\n\t ").is_empty());
    }

    #[test]
    fn test_single_short_paragraph() {
        let text = "This is a short document for testing.";
        let chunks = chunker().chunk_document("doc", "short.txt", text);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].word_count, 7);
        assert_eq!(chunks[0].end_position, text.len());
    }

    #[test]
    fn test_short_document_bypasses_filters() {
        let text = "  Tiny \r\n\r\n\r\n note  ";
        let chunks = chunker().chunk_document("doc", "tiny.txt", text);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, clean_for_chunking(text));
    }

    #[test]
    fn test_repeated_long_paragraph() {
        let para = vec![SENTENCE; 10].join(" ");
        let text = format!("{}\n\n{}", para, para);
        let chunks = chunker().chunk_document("doc", "leave.txt", &text);

        assert!(chunks.len() > 1);
        let overlap = compute_overlap(&chunks[0].content, 200);
        assert!(chunks[1].content.starts_with(&overlap));
    }

    #[test]
    fn test_repeated_run_on_paragraph() {
        let para = SENTENCE.repeat(10);
        let text = format!("{}\n\n{}", para, para);
        let chunks = chunker().chunk_document("doc", "leave.txt", &text);

        assert_eq!(chunks.len(), 2);
        let overlap = compute_overlap(&chunks[0].content, 200);
        assert!(!overlap.is_empty());
        assert!(chunks[1].content.starts_with(&overlap));
        assert_eq!(chunks[1].chunk_index, 1);
    }

    #[test]
    fn test_contiguous_indexes_after_filtering() {
        let prose = "Managers approve timesheets every Friday before the payroll cutoff at noon.";
        let body = vec![prose; 6].join(" ");
        let junk = "=".repeat(150);
        let text = format!(
            "# Timesheets\n\n{}\n\n# Separator Block\n\n{}\n\n# Payroll\n\n{}",
            body, junk, body
        );

        let chunks = chunker().chunk_document("doc", "payroll.md", &text);

        assert!(chunks.len() >= 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
            assert_eq!(chunk.document_id, "doc");
        }
        assert!(chunks.iter().all(|c| !c.content.contains(&junk)));
    }

    #[test]
    fn test_section_offsets_are_absolute() {
        let prose = "Benefits enrollment closes on the last business day of November each year.";
        let body = vec![prose; 5].join(" ");
        let text = format!("# Enrollment\n\n{}\n\n# Coverage\n\n{}", body, body);
        let cleaned = clean_for_chunking(&text);

        let chunks = chunker().chunk_document("doc", "benefits.md", &text);
        assert_eq!(chunks.len(), 2);

        let chars: Vec<char> = cleaned.chars().collect();
        for chunk in &chunks {
            let span: String = chars[chunk.start_position..chunk.end_position].iter().collect();
            assert_eq!(span, chunk.content);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = format!("INTRODUCTION\n\n{}\n\n1. Scope of policy\n\n{}", SENTENCE.repeat(12), SENTENCE.repeat(12));
        let a = chunker().chunk_document("doc", "a.txt", &text);
        let b = chunker().chunk_document("doc", "a.txt", &text);
        assert_eq!(a, b);
    }
}
