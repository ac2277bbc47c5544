//! Lexical Search
//!
//! 단순 부분 문자열 / 단어 빈도 기반 스코어링입니다.
//! TF-IDF 정규화나 임베딩 유사도는 사용하지 않습니다.
//!
//! score = (전체 쿼리 포함 시 10) + Σ 쿼리 단어별 등장 횟수

use serde::Serialize;

use super::chunker::Chunk;

/// 기본 결과 개수
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// 전체 쿼리 문자열이 그대로 포함될 때 가산점
pub const EXACT_PHRASE_BONUS: u32 = 10;

/// 쿼리에서 제외하는 불용어 (3자 이상만, 2자 이하는 길이로 걸러짐)
const STOP_WORDS: &[&str] = &[
    "the", "and", "are", "was", "were", "been", "being", "have", "has", "had", "does", "did",
    "will", "would", "could", "should", "can", "may", "might", "must", "shall", "what", "when",
    "where", "who", "whom", "whose", "why", "how", "which", "that", "this", "these", "those",
    "for", "with", "from", "about", "into", "than", "then", "there", "their", "they", "you",
    "your", "our", "not", "but", "any", "all",
];

// ============================================================================
// Types
// ============================================================================

/// 점수가 붙은 검색 결과
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: u32,
}

// ============================================================================
// Query Tokenization
// ============================================================================

/// 쿼리를 검색 단어로 분리
///
/// 소문자 변환 → 구두점 제거 → 공백 분리 → 2자 이하/불용어 제거.
/// 남는 단어가 없으면 소문자 쿼리 전체를 단일 단어로 사용합니다.
pub fn tokenize_query(query: &str) -> Vec<String> {
    let lowered = query.trim().to_lowercase();
    if lowered.is_empty() {
        return vec![];
    }

    let stripped: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect();

    let terms: Vec<String> = stripped
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .filter(|w| !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect();

    if terms.is_empty() {
        return vec![lowered];
    }

    terms
}

// ============================================================================
// Scoring
// ============================================================================

/// 단일 청크 점수 계산
pub fn score_chunk(content: &str, query: &str, terms: &[String]) -> u32 {
    let content = content.to_lowercase();
    let query = query.trim().to_lowercase();

    let mut score = 0;

    if !query.is_empty() && content.contains(&query) {
        score += EXACT_PHRASE_BONUS;
    }

    for term in terms.iter().filter(|t| !t.is_empty()) {
        score += content.matches(term.as_str()).count() as u32;
    }

    score
}

/// 청크 목록에서 쿼리와 관련된 상위 `max_results`개 반환
///
/// 점수 0인 청크는 제외되며, 동점은 입력 순서를 유지합니다 (stable sort).
pub fn search(chunks: &[Chunk], query: &str, max_results: usize) -> Vec<ScoredChunk> {
    let terms = tokenize_query(query);
    if terms.is_empty() {
        return vec![];
    }

    let mut results: Vec<ScoredChunk> = chunks
        .iter()
        .filter_map(|chunk| {
            let score = score_chunk(&chunk.content, query, &terms);
            (score > 0).then(|| ScoredChunk {
                chunk: chunk.clone(),
                score,
            })
        })
        .collect();

    results.sort_by(|a, b| b.score.cmp(&a.score));
    results.truncate(max_results);

    tracing::debug!(
        "Lexical search {:?}: {} terms, {} hits",
        query,
        terms.len(),
        results.len()
    );

    results
}

// ============================================================================
// Tests
// ============================================================================
