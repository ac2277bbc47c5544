//! Section Identifier
//!
//! 헤더처럼 보이는 줄을 찾아 텍스트를 섹션으로 나눕니다.
//! 섹션은 청크 경계를 잡기 위한 임시 구조이며 저장되지 않습니다.

use std::sync::LazyLock;

use regex::Regex;

/// 헤더가 하나도 없을 때 사용하는 섹션 이름
pub const DEFAULT_SECTION_HEADER: &str = "Document";

/// 첫 헤더 앞의 본문에 붙는 섹션 이름
pub const PREAMBLE_SECTION_HEADER: &str = "Preamble";

/// 최소 섹션 길이 (문자 수)
pub const DEFAULT_MIN_SECTION_CHARS: usize = 50;

// ============================================================================
// Heading Patterns
// ============================================================================

/// 헤더 패턴 종류
///
/// 같은 위치에서 여러 패턴이 매치되면 선언 순서가 앞선 쪽이 우선합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HeadingKind {
    /// `# Title` ~ `###### Title`
    Markdown,
    /// `1. Title` (줄 끝까지 마침표 없음)
    Numbered,
    /// `GENERAL PROVISIONS:`
    AllCaps,
    /// `Leave Of Absence`
    TitleCase,
    /// 첫 헤더 앞 본문
    Preamble,
    /// 헤더 없는 문서 전체
    Whole,
}

static MARKDOWN_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+\S.*$").expect("valid regex"));

static NUMBERED_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\d+\.[ \t]+[^.\n]+$").expect("valid regex"));

static ALL_CAPS_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[A-Z][A-Z0-9 \t&/,()'-]*:?$").expect("valid regex"));

static TITLE_CASE_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[A-Z][a-z]+(?:[ \t]+(?:[A-Z][a-z]+|&|and|of|the|for|to|in))*:?$")
        .expect("valid regex")
});

/// 평가 순서가 고정된 (종류, 패턴) 테이블
fn heading_patterns() -> [(HeadingKind, &'static Regex); 4] {
    [
        (HeadingKind::Markdown, &*MARKDOWN_HEADING),
        (HeadingKind::Numbered, &*NUMBERED_HEADING),
        (HeadingKind::AllCaps, &*ALL_CAPS_HEADING),
        (HeadingKind::TitleCase, &*TITLE_CASE_HEADING),
    ]
}

/// ALL-CAPS 헤더는 대문자가 4개 이상이어야 함
fn has_enough_capitals(line: &str) -> bool {
    line.chars().filter(|c| c.is_ascii_uppercase()).count() >= 4
}

// ============================================================================
// Types
// ============================================================================

/// 헤더로 구분된 텍스트 구간
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// 헤더 텍스트 (`#`, `:` 제거)
    pub header: String,
    /// 헤더 종류
    pub kind: HeadingKind,
    /// 헤더 줄을 포함한 섹션 본문
    pub content: String,
    /// 원문에서의 시작 위치 (문자 단위)
    pub start: usize,
}

#[derive(Debug, Clone, Copy)]
struct HeadingMatch {
    kind: HeadingKind,
    /// 바이트 위치
    start: usize,
    end: usize,
}

// ============================================================================
// Section Identification
// ============================================================================

/// 기본 최소 길이(50자)로 섹션 식별
pub fn identify_sections(text: &str) -> Vec<Section> {
    identify_sections_with(text, DEFAULT_MIN_SECTION_CHARS)
}

/// 텍스트를 섹션으로 분할
///
/// 헤더가 없으면 전체 텍스트를 하나의 섹션으로 반환합니다.
/// `min_section_chars`보다 짧은 섹션은 버립니다.
pub fn identify_sections_with(text: &str, min_section_chars: usize) -> Vec<Section> {
    if text.trim().is_empty() {
        return vec![];
    }

    let headings = find_headings(text);

    if headings.is_empty() {
        return vec![Section {
            header: DEFAULT_SECTION_HEADER.to_string(),
            kind: HeadingKind::Whole,
            content: text.to_string(),
            start: 0,
        }];
    }

    let mut sections = Vec::with_capacity(headings.len() + 1);

    // 첫 헤더 앞 본문
    let first = headings[0].start;
    if first > 0 {
        push_section(
            &mut sections,
            text,
            PREAMBLE_SECTION_HEADER.to_string(),
            HeadingKind::Preamble,
            0,
            first,
            min_section_chars,
        );
    }

    for (i, heading) in headings.iter().enumerate() {
        let end = headings
            .get(i + 1)
            .map(|next| next.start)
            .unwrap_or(text.len());

        push_section(
            &mut sections,
            text,
            heading_label(&text[heading.start..heading.end]),
            heading.kind,
            heading.start,
            end,
            min_section_chars,
        );
    }

    sections
}

fn push_section(
    sections: &mut Vec<Section>,
    text: &str,
    header: String,
    kind: HeadingKind,
    start: usize,
    end: usize,
    min_section_chars: usize,
) {
    let content = text[start..end].trim_end();

    if content.chars().count() < min_section_chars {
        tracing::debug!("Dropping short section {:?} ({} chars)", header, content.len());
        return;
    }

    // 정리된 텍스트는 줄 앞 공백이 없으므로 start는 본문 시작과 같음
    let leading = content.len() - content.trim_start().len();
    let start = start + leading;

    sections.push(Section {
        header,
        kind,
        content: content.trim_start().to_string(),
        start: text[..start].chars().count(),
    });
}

/// 모든 패턴의 매치를 위치 순으로 병합
fn find_headings(text: &str) -> Vec<HeadingMatch> {
    let mut matches: Vec<HeadingMatch> = Vec::new();

    for (kind, pattern) in heading_patterns() {
        for m in pattern.find_iter(text) {
            if kind == HeadingKind::AllCaps && !has_enough_capitals(m.as_str()) {
                continue;
            }
            matches.push(HeadingMatch {
                kind,
                start: m.start(),
                end: m.end(),
            });
        }
    }

    merge_headings(matches)
}

/// 위치 → 우선순위 순 정렬 후 같은 위치는 첫 번째만 유지
fn merge_headings(mut matches: Vec<HeadingMatch>) -> Vec<HeadingMatch> {
    matches.sort_by_key(|m| (m.start, m.kind));
    matches.dedup_by_key(|m| m.start);
    matches
}

/// 헤더 줄에서 표시용 라벨 추출
fn heading_label(line: &str) -> String {
    line.trim()
        .trim_start_matches('#')
        .trim()
        .trim_end_matches(':')
        .trim()
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================
