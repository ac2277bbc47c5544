//! Text Cleaner
//!
//! 추출된 문서 텍스트의 공백/줄바꿈을 정규화합니다.
//!
//! 두 가지 정리 방식을 분리해서 제공합니다:
//! - `clean_for_chunking`: 문단 경계(`\n\n`)를 유지 (청킹용)
//! - `flatten`: 모든 공백을 한 칸으로 압축 (요약/미리보기용)

use std::sync::LazyLock;

use regex::Regex;

static HORIZONTAL_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\x0B\x0C]+").expect("valid regex"));

static WS_AROUND_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ?\n ?").expect("valid regex"));

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

static ANY_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

// ============================================================================
// Cleaners
// ============================================================================

/// 문단 구조를 유지하는 정리 (청킹 전 단계)
///
/// 1. `\r\n`, `\r` → `\n`
/// 2. 가로 공백 연속 → 공백 한 칸
/// 3. 줄바꿈 앞뒤 공백 제거
/// 4. 3개 이상의 연속 줄바꿈 → `\n\n`
/// 5. 앞뒤 공백 제거
pub fn clean_for_chunking(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let text = raw.replace("\r\n", "\n").replace('\r', "\n");
    let text = HORIZONTAL_WS.replace_all(&text, " ");
    let text = WS_AROUND_NEWLINE.replace_all(&text, "\n");
    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");

    text.trim().to_string()
}

/// 모든 공백(줄바꿈 포함)을 한 칸으로 압축
pub fn flatten(raw: &str) -> String {
    ANY_WS.replace_all(raw, " ").trim().to_string()
}

/// 요약 미리보기 (flatten 후 최대 `max_chars` 문자)
pub fn summarize(raw: &str, max_chars: usize) -> String {
    let flat = flatten(raw);
    if flat.chars().count() <= max_chars {
        return flat;
    }

    let truncated: String = flat.chars().take(max_chars).collect();
    format!("{}...", truncated.trim_end())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_line_endings() {
        assert_eq!(clean_for_chunking("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_clean_collapses_blank_lines() {
        let cleaned = clean_for_chunking("First\n\n\n\n\nSecond");
        assert_eq!(cleaned, "First\n\nSecond");
    }

    #[test]
    fn test_clean_preserves_paragraphs() {
        let cleaned = clean_for_chunking("  First   para  \n \n  Second\tpara  ");
        assert_eq!(cleaned, "First para\n\nSecond para");
    }

    #[test]
    fn test_clean_whitespace_only_lines() {
        let cleaned = clean_for_chunking("One\n   \n   \n   \nTwo");
        assert_eq!(cleaned, "One\n\nTwo");
    }

    #[test]
    fn test_clean_empty() {
        assert_eq!(clean_for_chunking(""), "");
        assert_eq!(clean_for_chunking(" \n\t\r\n "), "");
    }

    #[test]
    fn test_clean_idempotent() {
        let inputs = [
            "",
            "plain",
            "  a \r\n\r\n\r\n b  \t c\n\n\n\n",
            "x \n \n \n y",
            "\x0C page \x0C break \n\n\n\n\n end",
            "Heading\r\r\rBody text   here.\n",
        ];

        for input in inputs {
            let once = clean_for_chunking(input);
            assert_eq!(clean_for_chunking(&once), once, "input: {:?}", input);

            let flat = flatten(input);
            assert_eq!(flatten(&flat), flat, "input: {:?}", input);
        }
    }

    #[test]
    fn test_flatten() {
        assert_eq!(flatten("  a\n\nb \t c\r\n"), "a b c");
        assert_eq!(flatten(""), "");
    }

    #[test]
    fn test_summarize() {
        assert_eq!(summarize("short\n\ntext", 100), "short text");
        assert_eq!(summarize("hello world again", 11), "hello world...");
    }
}
