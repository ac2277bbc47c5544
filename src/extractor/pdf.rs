//! PDF 텍스트 추출 모듈
//!
//! pdf-extract 크레이트를 사용하여 PDF에서 텍스트를 추출합니다.
//! 페이지는 빈 줄로 이어 붙여 한 문서로 만듭니다 (문단 경계 유지).

use std::path::Path;

use anyhow::{Context, Result};

/// PDF에서 텍스트 추출
///
/// (이어 붙인 텍스트, 페이지 수)를 반환합니다.
/// 스캔 문서처럼 텍스트가 없으면 빈 문자열을 반환합니다.
pub fn extract_text_from_pdf(path: &Path) -> Result<(String, usize)> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read PDF: {:?}", path))?;

    let text = pdf_extract::extract_text_from_mem(&bytes)
        .with_context(|| format!("Failed to extract text from PDF: {:?}", path))?;

    if text.trim().is_empty() {
        tracing::warn!(
            "No text extracted from PDF: {:?}. It might be a scanned document.",
            path
        );
        return Ok((String::new(), 0));
    }

    let pages = split_pdf_pages(&text);
    let page_count = pages.len();

    Ok((pages.join("\n\n"), page_count))
}

/// 폼피드(`\x0c`) 기준 페이지 분리 (빈 페이지 제외)
fn split_pdf_pages(text: &str) -> Vec<&str> {
    text.split('\x0c')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
