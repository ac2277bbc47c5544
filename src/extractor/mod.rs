//! 콘텐츠 추출 모듈
//!
//! 업로드된 파일에서 청킹할 텍스트를 추출합니다.
//! - 텍스트 파일: UTF-8로 직접 읽기
//! - PDF 파일: pdf-extract로 텍스트 추출 (blocking 스레드)

pub mod pdf;

use std::path::Path;

use anyhow::{Context, Result};

use crate::collector::DocumentFormat;

// ============================================================================
// Extracted Content
// ============================================================================

/// 추출된 콘텐츠
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// 추출된 텍스트
    pub text: String,
    /// 원본 문서 형식
    pub format: DocumentFormat,
    /// 총 페이지 수 (PDF)
    pub page_count: Option<usize>,
}

// ============================================================================
// Content Extractor
// ============================================================================

/// 콘텐츠 추출기
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentExtractor;

impl ContentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 파일에서 콘텐츠 추출
    pub async fn extract(&self, path: &Path, format: DocumentFormat) -> Result<ExtractedContent> {
        match format {
            DocumentFormat::Text => self.extract_text(path).await,
            DocumentFormat::Pdf => self.extract_pdf(path).await,
        }
    }

    /// 텍스트 파일에서 추출
    async fn extract_text(&self, path: &Path) -> Result<ExtractedContent> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read text file: {:?}", path))?;

        // 깨진 바이트는 대체 문자로
        let text = String::from_utf8_lossy(&bytes).into_owned();

        Ok(ExtractedContent {
            text,
            format: DocumentFormat::Text,
            page_count: None,
        })
    }

    /// PDF 파일에서 추출
    async fn extract_pdf(&self, path: &Path) -> Result<ExtractedContent> {
        // PDF 추출은 CPU 바운드이므로 spawn_blocking 사용
        let path = path.to_path_buf();
        let (text, pages) = tokio::task::spawn_blocking(move || pdf::extract_text_from_pdf(&path))
            .await
            .context("PDF extraction task failed")??;

        Ok(ExtractedContent {
            text,
            format: DocumentFormat::Pdf,
            page_count: Some(pages),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
