//! Text Chunking Module
//!
//! 문단 경계를 존중하는 고정 크기 청킹을 제공합니다.
//! 청크 사이에는 문장/단어 경계에 맞춘 오버랩을 넣습니다.
//!
//! 모든 크기와 위치는 바이트가 아닌 문자(char) 단위입니다.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정
///
/// 기본값은 운영에서 맞춰온 경험적 수치입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// 목표 청크 크기 (문자 수)
    pub target_characters: usize,
    /// 다음 청크로 넘기는 오버랩 크기 (문자 수)
    pub overlap_characters: usize,
    /// 이보다 짧은 문서는 통째로 한 청크
    pub short_document_characters: usize,
    /// 이보다 짧은 문단은 서식 잡음으로 보고 건너뜀
    pub min_paragraph_characters: usize,
    /// 이보다 짧은 섹션은 버림
    pub min_section_characters: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            target_characters: 1000,
            overlap_characters: 200,
            short_document_characters: 500,
            min_paragraph_characters: 20,
            min_section_characters: 50,
        }
    }
}

// ============================================================================
// Types
// ============================================================================

/// 후처리 전 청크
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    pub content: String,
    /// 입력 텍스트 기준 시작 위치 (문자 단위, 오버랩 포함 근사치)
    pub start_offset: usize,
    /// 입력 텍스트 기준 끝 위치 (문자 단위)
    pub end_offset: usize,
}

/// 저장용 청크
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 소유 문서 ID
    pub document_id: String,
    /// 문서 내 순번 (0부터 연속)
    pub chunk_index: usize,
    pub content: String,
    pub word_count: usize,
    /// 정리된 원문 기준 위치 (문자 단위)
    pub start_position: usize,
    pub end_position: usize,
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할 (위치는 입력 텍스트 기준)
    fn chunk(&self, text: &str) -> Vec<RawChunk>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// ParagraphChunker
// ============================================================================

/// 문단 단위 청커
///
/// 문단을 목표 크기까지 탐욕적으로 채우고, 넘치면 청크를 닫습니다.
/// 닫힌 청크의 끝부분(오버랩)이 다음 청크의 시작이 됩니다.
pub struct ParagraphChunker {
    config: ChunkConfig,
}

struct Paragraph<'a> {
    text: &'a str,
    chars: usize,
    start: usize,
    end: usize,
}

impl ParagraphChunker {
    /// 설정으로 생성
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// 기본 설정으로 생성
    pub fn with_defaults() -> Self {
        Self::new(ChunkConfig::default())
    }

    /// 빈 줄 기준 문단 분할 (짧은 문단은 제외)
    fn split_paragraphs<'a>(&self, text: &'a str) -> Vec<Paragraph<'a>> {
        let mut cursor = CharCursor::default();
        let mut paragraphs = Vec::new();
        let mut last = 0;

        let mut bounds: Vec<(usize, usize)> = PARAGRAPH_BREAK
            .find_iter(text)
            .map(|m| {
                let piece = (last, m.start());
                last = m.end();
                piece
            })
            .collect();
        bounds.push((last, text.len()));

        for (from, to) in bounds {
            let piece = &text[from..to];
            let trimmed = piece.trim();
            if trimmed.is_empty() {
                continue;
            }

            let chars = trimmed.chars().count();
            if chars < self.config.min_paragraph_characters {
                tracing::trace!("Skipping short paragraph ({} chars)", chars);
                continue;
            }

            let leading = piece.len() - piece.trim_start().len();
            let start = cursor.advance(text, from + leading);
            let end = cursor.advance(text, from + leading + trimmed.len());

            paragraphs.push(Paragraph {
                text: trimmed,
                chars,
                start,
                end,
            });
        }

        paragraphs
    }
}

impl Chunker for ParagraphChunker {
    fn chunk(&self, text: &str) -> Vec<RawChunk> {
        if text.trim().is_empty() {
            return vec![];
        }

        let target = self.config.target_characters;
        let mut chunks = Vec::new();

        let mut buffer = String::new();
        let mut buffer_chars = 0;
        let mut start = 0;
        let mut end = 0;
        // 오버랩만 들어있는 버퍼는 닫지 않음
        let mut has_own_paragraph = false;

        for para in self.split_paragraphs(text) {
            if has_own_paragraph && buffer_chars + para.chars > target {
                let overlap = compute_overlap(&buffer, self.config.overlap_characters);
                let overlap_chars = overlap.chars().count();

                chunks.push(RawChunk {
                    content: std::mem::take(&mut buffer),
                    start_offset: start,
                    end_offset: end,
                });

                start = end.saturating_sub(overlap_chars);
                buffer = overlap;
                buffer_chars = overlap_chars;
                has_own_paragraph = false;
            }

            if buffer.is_empty() {
                start = para.start;
            } else {
                buffer.push_str("\n\n");
                buffer_chars += 2;
            }

            buffer.push_str(para.text);
            buffer_chars += para.chars;
            end = para.end;
            has_own_paragraph = true;
        }

        if has_own_paragraph {
            chunks.push(RawChunk {
                content: buffer,
                start_offset: start,
                end_offset: end,
            });
        }

        chunks
    }

    fn name(&self) -> &'static str {
        "ParagraphChunker"
    }
}

// ============================================================================
// Overlap
// ============================================================================

/// 닫힌 청크에서 다음 청크로 넘길 오버랩 텍스트 계산
///
/// 끝에서 `overlap` 문자를 자른 뒤,
/// - 윈도우 중간 이후에 `". "`가 있으면 그 다음 문장부터
/// - 아니면 첫 공백 다음 단어부터
/// - 공백도 없으면 자른 그대로
pub fn compute_overlap(text: &str, overlap: usize) -> String {
    if overlap == 0 || text.is_empty() {
        return String::new();
    }

    let tail = tail_chars(text, overlap);

    if let Some(pos) = tail.rfind(". ") {
        if tail[..pos].chars().count() > overlap / 2 {
            let sentence = tail[pos + 2..].trim_start();
            if !sentence.is_empty() {
                return sentence.to_string();
            }
        }
    }

    if let Some((pos, ws)) = tail.char_indices().find(|(_, c)| c.is_whitespace()) {
        let word = tail[pos + ws.len_utf8()..].trim_start();
        if !word.is_empty() {
            return word.to_string();
        }
    }

    tail.to_string()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 마지막 `n` 문자 슬라이스 (UTF-8 안전)
fn tail_chars(s: &str, n: usize) -> &str {
    let total = s.chars().count();
    if total <= n {
        return s;
    }

    let start = s
        .char_indices()
        .nth(total - n)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &s[start..]
}

/// 바이트 위치 → 문자 위치 변환 (앞으로만 이동)
#[derive(Default)]
struct CharCursor {
    byte: usize,
    chars: usize,
}

impl CharCursor {
    fn advance(&mut self, text: &str, to_byte: usize) -> usize {
        if to_byte > self.byte {
            self.chars += text[self.byte..to_byte].chars().count();
            self.byte = to_byte;
        }
        self.chars
    }
}

/// 공백 기준 단어 수
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 문단 청커 생성 (설정 지정)
pub fn paragraph_chunker(config: ChunkConfig) -> Box<dyn Chunker> {
    Box::new(ParagraphChunker::new(config))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SENTENCE: &str = "Employees must submit leave requests two weeks in advance.";

    fn long_paragraph() -> String {
        vec![SENTENCE; 10].join(" ")
    }

    #[test]
    fn test_chunker_empty() {
        let chunker = ParagraphChunker::with_defaults();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("  \n\n  ").is_empty());
    }

    #[test]
    fn test_sentence_length() {
        assert_eq!(SENTENCE.chars().count(), 58);
    }

    #[test]
    fn test_single_paragraph() {
        let chunker = ParagraphChunker::with_defaults();
        let text = long_paragraph();
        let chunks = chunker.chunk(&text);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[0].end_offset, text.chars().count());
    }

    #[test]
    fn test_repeated_long_paragraph_overlap() {
        let chunker = ParagraphChunker::with_defaults();
        let text = format!("{}\n\n{}", long_paragraph(), long_paragraph());
        let chunks = chunker.chunk(&text);

        assert!(chunks.len() > 1);

        let overlap = compute_overlap(&chunks[0].content, 200);
        assert!(!overlap.is_empty());
        assert!(chunks[1].content.starts_with(&overlap));
        // 윈도우 후반부의 문장 경계에서 시작
        assert_eq!(overlap, SENTENCE);
    }

    #[test]
    fn test_run_on_paragraph_overlap_word_boundary() {
        let chunker = ParagraphChunker::with_defaults();
        // 문장 사이에 공백이 없어 윈도우 안에 ". "가 없음
        let para = SENTENCE.repeat(10);
        let text = format!("{}\n\n{}", para, para);
        let chunks = chunker.chunk(&text);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, para);

        let tail = tail_chars(&para, 200);
        assert!(!tail.contains(". "));
        let space = tail.find(' ').unwrap();
        let expected = tail[space + 1..].trim_start();

        let overlap = compute_overlap(&chunks[0].content, 200);
        assert_eq!(overlap, expected);
        assert!(overlap.chars().count() < 200);
        assert!(overlap.ends_with("in advance."));
        assert_eq!(chunks[1].content, format!("{}\n\n{}", overlap, para));
    }

    #[test]
    fn test_overlap_round_trip_many_chunks() {
        let config = ChunkConfig {
            target_characters: 300,
            overlap_characters: 80,
            ..ChunkConfig::default()
        };
        let chunker = ParagraphChunker::new(config);

        let paragraphs: Vec<String> = (0..12)
            .map(|i| format!("Paragraph number {} talks about payroll schedules and approvals in detail.", i))
            .collect();
        let text = paragraphs.join("\n\n");
        let chunks = chunker.chunk(&text);

        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            let overlap = compute_overlap(&pair[0].content, 80);
            assert!(
                pair[1].content.starts_with(&overlap),
                "{:?} does not start with {:?}",
                pair[1].content,
                overlap
            );
        }
    }

    #[test]
    fn test_no_overlap_config() {
        let chunker = ParagraphChunker::new(ChunkConfig {
            overlap_characters: 0,
            ..ChunkConfig::default()
        });
        let text = format!("{}\n\n{}", long_paragraph(), long_paragraph());
        let chunks = chunker.chunk(&text);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].content, long_paragraph());
        assert_eq!(chunks[1].start_offset, long_paragraph().chars().count() + 2);
    }

    #[test]
    fn test_short_paragraphs_skipped() {
        let chunker = ParagraphChunker::with_defaults();
        let text = format!("Page 3\n\n{}\n\n---", SENTENCE);
        let chunks = chunker.chunk(&text);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, SENTENCE);
        assert_eq!(chunks[0].start_offset, 8);
    }

    #[test]
    fn test_oversized_paragraph_kept_whole() {
        let config = ChunkConfig {
            target_characters: 100,
            ..ChunkConfig::default()
        };
        let chunker = ParagraphChunker::new(config);
        let text = long_paragraph();
        let chunks = chunker.chunk(&text);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
    }

    #[test]
    fn test_compute_overlap_sentence_boundary() {
        let text = format!("{} {}", "x".repeat(150), "Tail sentence. Final words here");
        let overlap = compute_overlap(&text, 40);
        assert_eq!(overlap, "Final words here");
    }

    #[test]
    fn test_compute_overlap_word_boundary() {
        let text = "alpha beta gamma delta epsilon";
        // tail = " gamma delta epsilon"
        let overlap = compute_overlap(text, 20);
        assert_eq!(overlap, "gamma delta epsilon");
    }

    #[test]
    fn test_compute_overlap_raw_slice() {
        let text = "x".repeat(300);
        assert_eq!(compute_overlap(&text, 200), "x".repeat(200));
        assert_eq!(compute_overlap(&text, 0), "");
    }

    #[test]
    fn test_tail_chars_unicode() {
        let s = "Hello, 세계!";
        assert_eq!(tail_chars(s, 3), "세계!");
        assert_eq!(tail_chars(s, 100), s);
        assert_eq!(tail_chars("", 0), "");
    }

    #[test]
    fn test_unicode_offsets() {
        let chunker = ParagraphChunker::with_defaults();
        let text = "휴가 정책: 직원은 연간 20일의 유급 휴가를 사용할 수 있습니다.\n\n병가 정책: 진단서가 필요한 경우 인사팀에 제출해야 합니다.";
        let chunks = chunker.chunk(text);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].end_offset, text.chars().count());
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("one two\n\nthree"), 3);
        assert_eq!(word_count(""), 0);
    }
}
