//! Chunk Post-Processor
//!
//! 의미 없는 청크(너무 짧음, 반복 문자, URL 위주)를 걸러내고
//! 남은 청크에 0부터 연속된 인덱스를 다시 매깁니다.
//! 청크 내용은 절대 수정하지 않습니다.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::chunker::{word_count, Chunk, RawChunk};

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid regex"));

// ============================================================================
// Filter Configuration
// ============================================================================

/// 후처리 필터 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// 최소 청크 길이 (문자 수)
    pub min_characters: usize,
    /// 반복 검사 대상이 되는 최소 길이
    pub repetitive_min_length: usize,
    /// 반복 검사에서 요구하는 최소 고유 문자 수
    pub min_unique_characters: usize,
    /// URL이 차지할 수 있는 최대 비율
    pub max_url_ratio: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_characters: 30,
            repetitive_min_length: 100,
            min_unique_characters: 10,
            max_url_ratio: 0.5,
        }
    }
}

/// 청크가 버려진 이유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    TooShort,
    Repetitive,
    UrlHeavy,
}

// ============================================================================
// Post-Processing
// ============================================================================

/// 기본 설정으로 후처리
pub fn post_process(document_id: &str, raw_chunks: Vec<RawChunk>) -> Vec<Chunk> {
    post_process_with(document_id, raw_chunks, &FilterConfig::default())
}

/// 필터링 후 인덱스 재부여
pub fn post_process_with(
    document_id: &str,
    raw_chunks: Vec<RawChunk>,
    config: &FilterConfig,
) -> Vec<Chunk> {
    let total = raw_chunks.len();

    let chunks: Vec<Chunk> = raw_chunks
        .into_iter()
        .filter(|raw| match check_chunk(&raw.content, config) {
            Some(reason) => {
                tracing::debug!(
                    "Dropping chunk of {} ({:?}, {} chars)",
                    document_id,
                    reason,
                    raw.content.chars().count()
                );
                false
            }
            None => true,
        })
        .enumerate()
        .map(|(index, raw)| into_chunk(document_id, index, raw))
        .collect();

    if chunks.len() < total {
        tracing::debug!(
            "Filtered {} of {} chunks for {}",
            total - chunks.len(),
            total,
            document_id
        );
    }

    chunks
}

/// RawChunk → Chunk 변환 (필터 없이)
pub fn into_chunk(document_id: &str, chunk_index: usize, raw: RawChunk) -> Chunk {
    Chunk {
        document_id: document_id.to_string(),
        chunk_index,
        word_count: word_count(&raw.content),
        content: raw.content,
        start_position: raw.start_offset,
        end_position: raw.end_offset,
    }
}

/// 버려야 하는 청크면 이유를 반환
pub fn check_chunk(content: &str, config: &FilterConfig) -> Option<DropReason> {
    let length = content.chars().count();

    if length < config.min_characters {
        return Some(DropReason::TooShort);
    }

    if length > config.repetitive_min_length
        && unique_characters(content) < config.min_unique_characters
    {
        return Some(DropReason::Repetitive);
    }

    if url_ratio(content, length) > config.max_url_ratio {
        return Some(DropReason::UrlHeavy);
    }

    None
}

/// 대소문자 무시, 공백 제외 고유 문자 수
fn unique_characters(content: &str) -> usize {
    content
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect::<HashSet<char>>()
        .len()
}

/// 전체 문자 중 URL이 차지하는 비율
fn url_ratio(content: &str, length: usize) -> f64 {
    if length == 0 {
        return 0.0;
    }

    let url_chars: usize = URL_PATTERN
        .find_iter(content)
        .map(|m| m.as_str().chars().count())
        .sum();

    url_chars as f64 / length as f64
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(content: &str) -> RawChunk {
        RawChunk {
            content: content.to_string(),
            start_offset: 0,
            end_offset: content.chars().count(),
        }
    }

    const PROSE: &str = "Remote work requests are reviewed by the direct manager within five days.";

    #[test]
    fn test_drops_short_chunk() {
        let config = FilterConfig::default();
        assert_eq!(check_chunk("0123456789", &config), Some(DropReason::TooShort));
    }

    #[test]
    fn test_drops_repetitive_chunk() {
        let config = FilterConfig::default();
        assert_eq!(
            check_chunk(&"a".repeat(150), &config),
            Some(DropReason::Repetitive)
        );
        // 100자 이하는 반복 검사 대상 아님
        assert_eq!(check_chunk(&"=".repeat(60), &config), None);
    }

    #[test]
    fn test_repetitive_is_case_insensitive() {
        let config = FilterConfig::default();
        let content = "aAbBcC dD ".repeat(20);
        assert_eq!(check_chunk(&content, &config), Some(DropReason::Repetitive));
    }

    #[test]
    fn test_drops_url_heavy_chunk() {
        let config = FilterConfig::default();
        assert_eq!(
            check_chunk(&"http://x.com/".repeat(20), &config),
            Some(DropReason::UrlHeavy)
        );

        let mixed = format!("{} https://intranet.example.com/hr", PROSE);
        assert_eq!(check_chunk(&mixed, &config), None);
    }

    #[test]
    fn test_keeps_prose() {
        assert_eq!(check_chunk(PROSE, &FilterConfig::default()), None);
    }

    #[test]
    fn test_post_process_reindexes() {
        let chunks = post_process(
            "doc-1",
            vec![
                raw(PROSE),
                raw("tiny"),
                raw(&"a".repeat(150)),
                raw(&format!("Second: {}", PROSE)),
                raw(&"http://x.com/".repeat(20)),
                raw(&format!("Third: {}", PROSE)),
            ],
        );

        let indexes: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert!(chunks.iter().all(|c| c.document_id == "doc-1"));
        assert_eq!(chunks[0].content, PROSE);
        assert!(chunks[1].content.starts_with("Second"));
        assert!(chunks[2].content.starts_with("Third"));
    }

    #[test]
    fn test_post_process_keeps_content_and_positions() {
        let input = RawChunk {
            content: PROSE.to_string(),
            start_offset: 120,
            end_offset: 193,
        };
        let chunks = post_process("doc", vec![input]);

        assert_eq!(chunks[0].content, PROSE);
        assert_eq!(chunks[0].start_position, 120);
        assert_eq!(chunks[0].end_position, 193);
        assert_eq!(chunks[0].word_count, 12);
    }

    #[test]
    fn test_post_process_empty() {
        assert!(post_process("doc", vec![]).is_empty());
    }
}
