//! 업로드 스캔 모듈
//!
//! HR 담당자가 올린 파일이나 폴더에서 처리할 문서를 고릅니다.
//! 텍스트 문서와 PDF만 받고, 나머지는 건너뛴 사유와 함께 돌려줍니다.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;

/// 기본 업로드 크기 제한 (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// UTF-8로 바로 읽는 확장자
const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "csv", "html", "htm", "json", "rst", "log",
];

// ============================================================================
// Document Format
// ============================================================================

/// 업로드 문서 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// 텍스트 문서 (txt, md, csv 등)
    Text,
    /// PDF 문서
    Pdf,
}

impl DocumentFormat {
    /// 확장자로 형식 판별
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if ext == "pdf" {
            Some(Self::Pdf)
        } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Text)
        } else {
            None
        }
    }

    /// 진행 상황 출력용 라벨
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "TXT",
            Self::Pdf => "PDF",
        }
    }
}

// ============================================================================
// Scan Results
// ============================================================================

/// 건너뛴 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Unsupported,
    TooLarge(u64),
    Empty,
    PdfExcluded,
    /// 오피스 잠금 파일 (`~$` 접두사)
    LockFile,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => f.write_str("지원하지 않는 형식"),
            Self::TooLarge(size) => write!(f, "크기 제한 초과 ({} bytes)", size),
            Self::Empty => f.write_str("빈 파일"),
            Self::PdfExcluded => f.write_str("PDF 제외"),
            Self::LockFile => f.write_str("오피스 잠금 파일"),
        }
    }
}

/// 처리 대상 업로드 파일
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub path: PathBuf,
    /// 업로드 루트 기준 상대 경로 (문서 이름으로 저장)
    pub name: String,
    pub format: DocumentFormat,
    pub size: u64,
}

/// 건너뛴 파일
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// 한 번의 업로드 스캔 결과
#[derive(Debug, Default)]
pub struct UploadBatch {
    pub files: Vec<UploadFile>,
    pub skipped: Vec<SkippedFile>,
}

impl UploadBatch {
    pub fn count(&self, format: DocumentFormat) -> usize {
        self.files.iter().filter(|f| f.format == format).count()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

// ============================================================================
// Upload Scanner
// ============================================================================

/// 스캔 설정
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// 이보다 큰 파일은 건너뜀 (0이면 제한 없음)
    pub max_file_bytes: u64,
    pub include_pdfs: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            include_pdfs: true,
        }
    }
}

/// 업로드 스캐너
pub struct UploadScanner {
    config: ScanConfig,
}

impl UploadScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// 파일 또는 폴더 스캔
    ///
    /// 폴더는 하위까지 파일명 순으로 돌며 숨김 파일과 `.gitignore` 대상은 보지 않습니다.
    pub fn scan(&self, path: &Path) -> Result<UploadBatch> {
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Upload path not found: {:?}", path))?;

        let mut batch = UploadBatch::default();

        if metadata.is_file() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            self.admit(&mut batch, path.to_path_buf(), name, metadata.len());
            return Ok(batch);
        }

        let walker = WalkBuilder::new(path)
            .hidden(true)
            .git_ignore(true)
            .git_exclude(true)
            .git_global(false)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read upload entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let size = match entry.metadata() {
                Ok(m) => m.len(),
                Err(e) => {
                    tracing::warn!("Failed to read metadata for {:?}: {}", entry.path(), e);
                    continue;
                }
            };

            let name = entry
                .path()
                .strip_prefix(path)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");

            self.admit(&mut batch, entry.into_path(), name, size);
        }

        tracing::info!(
            "Scanned {:?}: {} accepted, {} skipped",
            path,
            batch.files.len(),
            batch.skipped.len()
        );
        Ok(batch)
    }

    fn admit(&self, batch: &mut UploadBatch, path: PathBuf, name: String, size: u64) {
        match self.classify(&path, size) {
            Ok(format) => batch.files.push(UploadFile {
                path,
                name,
                format,
                size,
            }),
            Err(reason) => {
                tracing::debug!("Skipping {:?}: {:?}", path, reason);
                batch.skipped.push(SkippedFile { path, reason });
            }
        }
    }

    fn classify(&self, path: &Path, size: u64) -> Result<DocumentFormat, SkipReason> {
        let lock_file = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("~$"));
        if lock_file {
            return Err(SkipReason::LockFile);
        }

        let format = DocumentFormat::detect(path).ok_or(SkipReason::Unsupported)?;

        if format == DocumentFormat::Pdf && !self.config.include_pdfs {
            return Err(SkipReason::PdfExcluded);
        }
        if size == 0 {
            return Err(SkipReason::Empty);
        }
        if self.config.max_file_bytes > 0 && size > self.config.max_file_bytes {
            return Err(SkipReason::TooLarge(size));
        }

        Ok(format)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &[u8]) {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    fn reasons(batch: &UploadBatch) -> Vec<SkipReason> {
        batch.skipped.iter().map(|s| s.reason).collect()
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(DocumentFormat::detect(Path::new("a/handbook.md")), Some(DocumentFormat::Text));
        assert_eq!(DocumentFormat::detect(Path::new("LEAVE.TXT")), Some(DocumentFormat::Text));
        assert_eq!(DocumentFormat::detect(Path::new("policy.PDF")), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::detect(Path::new("offer.docx")), None);
        assert_eq!(DocumentFormat::detect(Path::new("README")), None);
    }

    #[test]
    fn test_scan_upload_folder() {
        let dir = TempDir::new().unwrap();
        write(&dir, "handbook.md", b"# Welcome");
        write(&dir, "benefits.txt", b"Dental plan");
        write(&dir, "archive/old.pdf", b"%PDF-1.4");
        write(&dir, "logo.png", &[1u8; 4]);
        write(&dir, "~$policy.md", b"lock");
        write(&dir, "notes.txt", b"");
        write(&dir, ".draft.md", b"hidden");

        let batch = UploadScanner::new(ScanConfig::default())
            .scan(dir.path())
            .unwrap();

        let names: Vec<&str> = batch.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["archive/old.pdf", "benefits.txt", "handbook.md"]);
        assert_eq!(batch.count(DocumentFormat::Text), 2);
        assert_eq!(batch.count(DocumentFormat::Pdf), 1);
        assert_eq!(batch.total_bytes(), 8 + 11 + 9);

        assert_eq!(
            reasons(&batch),
            vec![SkipReason::Unsupported, SkipReason::Empty, SkipReason::LockFile]
        );
    }

    #[test]
    fn test_size_cap_and_pdf_exclusion() {
        let dir = TempDir::new().unwrap();
        write(&dir, "big.md", "x".repeat(20).as_bytes());
        write(&dir, "scan.pdf", b"%PDF-1.4");

        let scanner = UploadScanner::new(ScanConfig {
            max_file_bytes: 10,
            include_pdfs: false,
        });
        let batch = scanner.scan(dir.path()).unwrap();

        assert!(batch.is_empty());
        assert_eq!(
            reasons(&batch),
            vec![SkipReason::TooLarge(20), SkipReason::PdfExcluded]
        );
    }

    #[test]
    fn test_gitignore_respected() {
        let dir = TempDir::new().unwrap();
        write(&dir, ".gitignore", b"drafts/\n");
        write(&dir, "drafts/wip.md", b"work in progress");
        write(&dir, "final.md", b"approved");

        let batch = UploadScanner::new(ScanConfig::default())
            .scan(dir.path())
            .unwrap();
        assert_eq!(batch.files.len(), 1);
        assert_eq!(batch.files[0].name, "final.md");
    }

    #[test]
    fn test_scan_single_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "sheet.xlsx", b"binary");
        write(&dir, "leave.md", b"Leave policy");
        let scanner = UploadScanner::new(ScanConfig::default());

        let batch = scanner.scan(&dir.path().join("leave.md")).unwrap();
        assert_eq!(batch.files.len(), 1);
        assert_eq!(batch.files[0].name, "leave.md");

        let batch = scanner.scan(&dir.path().join("sheet.xlsx")).unwrap();
        assert!(batch.is_empty());
        assert_eq!(reasons(&batch), vec![SkipReason::Unsupported]);

        assert!(scanner.scan(&dir.path().join("missing.txt")).is_err());
    }
}
