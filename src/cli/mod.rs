//! CLI 모듈
//!
//! pulse-one CLI 명령어 정의 및 구현

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::stream::{self, StreamExt};

use crate::collector::{DocumentFormat, ScanConfig, UploadFile, UploadScanner};
use crate::extractor::ContentExtractor;
use crate::knowledge::{
    flatten, get_data_dir, Category, ChunkConfig, ChunkFilter, DocumentChunker,
    DocumentProcessor, FilterConfig, IngestOutcome, KnowledgeStore, NewDocument, ProcessError,
    DATA_DIR_ENV,
};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "pulse-one")]
#[command(version, about = "문서 청킹 + 키워드 검색", long_about = None)]
pub struct Cli {
    /// 상세 로그 출력
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// DB 파일 경로 (기본: <data dir>/knowledge.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// 청킹 설정 옵션
#[derive(Args, Debug, Clone)]
pub struct ChunkOptions {
    /// 목표 청크 크기 (문자 수)
    #[arg(long, default_value = "1000")]
    pub chunk_size: usize,

    /// 청크 오버랩 (문자 수, 0이면 없음)
    #[arg(long, default_value = "200")]
    pub overlap: usize,
}

impl ChunkOptions {
    fn to_config(&self) -> ChunkConfig {
        ChunkConfig {
            target_characters: self.chunk_size,
            overlap_characters: self.overlap,
            ..ChunkConfig::default()
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// 파일, 폴더, 또는 텍스트를 처리하여 청크 저장
    Ingest {
        /// 직접 입력할 텍스트
        #[arg(short, long)]
        text: Option<String>,

        /// 직접 입력 텍스트의 문서 이름
        #[arg(long, default_value = "direct-input.txt")]
        name: String,

        /// 처리할 파일 경로
        #[arg(long)]
        file: Option<PathBuf>,

        /// 처리할 폴더 경로 (재귀)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// 카테고리 지정 (기본: 자동 분류)
        #[arg(short, long)]
        category: Option<Category>,

        /// PDF 파일 건너뛰기
        #[arg(long)]
        skip_pdfs: bool,

        /// 같은 내용이 이미 처리되었어도 다시 처리
        #[arg(long)]
        force: bool,

        /// 동시에 처리할 파일 수
        #[arg(short, long, default_value = "4")]
        jobs: usize,

        #[command(flatten)]
        chunking: ChunkOptions,
    },

    /// 청크 키워드 검색
    Query {
        /// 검색 쿼리
        query: String,

        /// 결과 개수 제한
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// 카테고리 필터
        #[arg(short, long)]
        category: Option<Category>,

        /// 문서 ID 필터
        #[arg(long)]
        document: Option<String>,

        /// JSON 출력
        #[arg(long)]
        json: bool,
    },

    /// 저장된 문서 목록
    List {
        /// 카테고리 필터
        #[arg(short, long)]
        category: Option<Category>,

        /// 결과 개수 제한
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// 문서의 청크 보기
    Chunks {
        /// 문서 ID
        id: String,

        /// 청크 전체 내용 출력
        #[arg(long)]
        full: bool,
    },

    /// 저장된 원문으로 청크 재생성
    Reprocess {
        /// 문서 ID
        id: String,

        #[command(flatten)]
        chunking: ChunkOptions,
    },

    /// 문서 삭제 (청크 포함)
    Delete {
        /// 문서 ID
        id: String,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let db = cli.db;

    match cli.command {
        Commands::Ingest {
            text,
            name,
            file,
            dir,
            category,
            skip_pdfs,
            force,
            jobs,
            chunking,
        } => {
            let processor = open_processor(db.as_deref(), chunking.to_config())?;
            if let Some(path) = file.or(dir) {
                cmd_ingest_upload(&processor, &path, category, skip_pdfs, force, jobs).await
            } else if let Some(text) = text {
                cmd_ingest_text(&processor, name, text, category, force).await
            } else {
                bail!("--text, --file, --dir 중 하나를 지정해야 합니다");
            }
        }
        Commands::Query {
            query,
            limit,
            category,
            document,
            json,
        } => {
            let processor = open_processor(db.as_deref(), ChunkConfig::default())?;
            let filter = ChunkFilter {
                category,
                document_id: document,
                limit: 0,
            };
            cmd_query(&processor, &query, limit, &filter, json)
        }
        Commands::List { category, limit } => cmd_list(&open_store(db.as_deref())?, category, limit),
        Commands::Chunks { id, full } => cmd_chunks(&open_store(db.as_deref())?, &id, full),
        Commands::Reprocess { id, chunking } => {
            let processor = open_processor(db.as_deref(), chunking.to_config())?;
            cmd_reprocess(&processor, &id).await
        }
        Commands::Delete { id } => cmd_delete(&open_store(db.as_deref())?, &id),
        Commands::Status => cmd_status(db.as_deref()),
    }
}

fn open_store(db: Option<&Path>) -> Result<KnowledgeStore> {
    match db {
        Some(path) => KnowledgeStore::open(path),
        None => KnowledgeStore::open_default(),
    }
    .context("KnowledgeStore 열기 실패")
}

fn open_processor(db: Option<&Path>, config: ChunkConfig) -> Result<DocumentProcessor> {
    if config.target_characters == 0 {
        bail!("--chunk-size는 0보다 커야 합니다");
    }

    let store = open_store(db)?;
    Ok(DocumentProcessor::new(
        store,
        DocumentChunker::new(config, FilterConfig::default()),
    ))
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 직접 입력 텍스트 처리
async fn cmd_ingest_text(
    processor: &DocumentProcessor,
    name: String,
    text: String,
    category: Option<Category>,
    force: bool,
) -> Result<()> {
    println!("[*] 문서 처리 중: {}", name);

    let outcome = processor
        .ingest(
            NewDocument {
                filename: name,
                content: text,
                category,
            },
            force,
        )
        .await
        .context("문서 처리 실패")?;

    print_outcome(&outcome);
    Ok(())
}

/// 파일/폴더 처리 명령어
///
/// 파일별 추출 + 청킹을 `jobs`개까지 동시에 진행합니다.
async fn cmd_ingest_upload(
    processor: &DocumentProcessor,
    path: &Path,
    category: Option<Category>,
    skip_pdfs: bool,
    force: bool,
    jobs: usize,
) -> Result<()> {
    let scanner = UploadScanner::new(ScanConfig {
        include_pdfs: !skip_pdfs,
        ..Default::default()
    });
    let extractor = ContentExtractor::new();

    let batch = scanner.scan(path)?;

    for skipped in &batch.skipped {
        println!("[!] 건너뜀: {:?} ({})", skipped.path, skipped.reason);
    }

    if batch.is_empty() {
        println!("[!] 처리할 파일이 없습니다.");
        return Ok(());
    }

    println!("[*] 처리 대상: {} 파일", batch.files.len());
    println!(
        "    텍스트: {}, PDF: {}",
        batch.count(DocumentFormat::Text),
        batch.count(DocumentFormat::Pdf)
    );
    println!("    총 크기: {}", format_bytes(batch.total_bytes() as usize));
    println!();

    let total = batch.files.len();
    let mut done = 0;
    let mut success_count = 0;
    let mut error_count = 0;

    let mut results = stream::iter(batch.files.iter())
        .map(|upload| ingest_upload(processor, &extractor, upload, category, force))
        .buffer_unordered(jobs.max(1));

    while let Some((upload, result)) = results.next().await {
        done += 1;
        let label = upload.format.label();

        match result {
            Ok(outcome) if outcome.skipped => {
                println!("[{}/{}] [{}] {}... 건너뜀 (동일 내용)", done, total, label, upload.name);
                success_count += 1;
            }
            Ok(outcome) => {
                println!(
                    "[{}/{}] [{}] {}... 완료 ({} 청크, {})",
                    done, total, label, upload.name, outcome.chunk_count, outcome.category
                );
                success_count += 1;
            }
            Err(e) => {
                println!("[{}/{}] [{}] {}... 실패: {}", done, total, label, upload.name, e);
                error_count += 1;
            }
        }
    }

    println!();
    println!(
        "[OK] 완료: 성공 {}, 실패 {}, 제외 {}",
        success_count,
        error_count,
        batch.skipped.len()
    );

    Ok(())
}

/// 업로드 파일 한 개 추출 + 처리
///
/// 문서 이름은 업로드 루트 기준 상대 경로입니다.
async fn ingest_upload<'a>(
    processor: &DocumentProcessor,
    extractor: &ContentExtractor,
    upload: &'a UploadFile,
    category: Option<Category>,
    force: bool,
) -> (&'a UploadFile, Result<IngestOutcome, ProcessError>) {
    let result = match extractor.extract(&upload.path, upload.format).await {
        Ok(content) => {
            if let Some(pages) = content.page_count {
                tracing::debug!("Extracted {} pages from {}", pages, upload.name);
            }
            let doc = NewDocument {
                filename: upload.name.clone(),
                content: content.text,
                category,
            };
            processor.ingest(doc, force).await
        }
        Err(e) => {
            let error = ProcessError::Extraction(format!("{:#}", e));
            if let Err(record_err) = processor.record_failure(&upload.name, &error) {
                tracing::error!("Failed to record failure for {}: {}", upload.name, record_err);
            }
            Err(error)
        }
    };

    (upload, result)
}

/// 검색 명령어 (query)
fn cmd_query(
    processor: &DocumentProcessor,
    query: &str,
    limit: usize,
    filter: &ChunkFilter,
    json: bool,
) -> Result<()> {
    let results = processor.query(query, filter, limit).context("검색 실패")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!("[*] 검색 중: \"{}\"", query);

    if results.is_empty() {
        println!("\n[!] 검색 결과가 없습니다.");
        return Ok(());
    }

    println!("\n[OK] 검색 결과 ({} 건):\n", results.len());

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [점수: {}] Doc {} #{}",
            i + 1,
            result.score,
            result.chunk.document_id,
            result.chunk.chunk_index
        );
        println!("   내용: {}", truncate_text(&result.chunk.content, 200));
        println!();
    }

    Ok(())
}

/// 목록 명령어 (list)
fn cmd_list(store: &KnowledgeStore, category: Option<Category>, limit: usize) -> Result<()> {
    let docs = store
        .list_documents(limit, category)
        .context("문서 목록 조회 실패")?;

    if docs.is_empty() {
        println!("[!] 저장된 문서가 없습니다.");
        return Ok(());
    }

    println!("[OK] 저장된 문서 ({} 건):\n", docs.len());

    for doc in docs {
        println!("  {} [{}] {}", doc.id, doc.category, truncate_text(&doc.filename, 40));
        println!(
            "        {} | {} | {} chunks | {} chars",
            doc.created_at.format("%Y-%m-%d %H:%M"),
            doc.status,
            doc.chunk_count,
            doc.content.chars().count()
        );
        if let Some(ref error) = doc.error_message {
            println!("        오류: {}", error);
        } else if !doc.summary.is_empty() {
            println!("        {}", truncate_text(&doc.summary, 80));
        }
        println!();
    }

    Ok(())
}

/// 청크 보기 명령어 (chunks)
fn cmd_chunks(store: &KnowledgeStore, id: &str, full: bool) -> Result<()> {
    let doc = store
        .get_document(id)
        .context("문서 조회 실패")?
        .ok_or_else(|| anyhow::anyhow!("ID {}인 문서를 찾을 수 없습니다", id))?;

    let chunks = store.load_chunks(id).context("청크 조회 실패")?;

    println!("[OK] {} ({} 청크)\n", doc.filename, chunks.len());

    for chunk in chunks {
        println!(
            "#{} [{}..{}] {} words",
            chunk.chunk_index, chunk.start_position, chunk.end_position, chunk.word_count
        );
        if full {
            println!("{}", chunk.content);
        } else {
            println!("   {}", truncate_text(&chunk.content, 160));
        }
        println!();
    }

    Ok(())
}

/// 재처리 명령어 (reprocess)
async fn cmd_reprocess(processor: &DocumentProcessor, id: &str) -> Result<()> {
    println!("[*] 문서 재처리 중: {}", id);

    let outcome = processor.reprocess(id).await.context("문서 재처리 실패")?;
    print_outcome(&outcome);

    Ok(())
}

/// 삭제 명령어 (delete)
fn cmd_delete(store: &KnowledgeStore, id: &str) -> Result<()> {
    if store.delete_document(id).context("문서 삭제 실패")? {
        println!("[OK] 문서 {} 삭제됨", id);
    } else {
        bail!("ID {}인 문서를 찾을 수 없습니다", id);
    }

    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status(db: Option<&Path>) -> Result<()> {
    println!("pulse-one v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("[*] 데이터 디렉토리: {}", get_data_dir().display());
    if std::env::var(DATA_DIR_ENV).is_err() {
        println!("    변경: export {}=/path/to/dir", DATA_DIR_ENV);
    }

    match open_store(db) {
        Ok(store) => match store.stats() {
            Ok(stats) => {
                println!("[OK] DB: {}", stats.db_path.display());
                println!("[OK] 저장된 문서: {} 건 (오류 {} 건)", stats.document_count, stats.error_count);
                println!("[OK] 저장된 청크: {} 개", stats.chunk_count);
                println!("     총 콘텐츠: {}", format_bytes(stats.total_content_bytes));
            }
            Err(e) => println!("[!] 통계 조회 실패: {}", e),
        },
        Err(e) => println!("[!] {:#}", e),
    }

    let config = ChunkConfig::default();
    println!(
        "[*] 청킹 기본값: {}자 / 오버랩 {}자 / 짧은 문서 {}자 미만",
        config.target_characters, config.overlap_characters, config.short_document_characters
    );

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn print_outcome(outcome: &IngestOutcome) {
    if outcome.skipped {
        println!("[OK] 이미 처리된 문서입니다 (ID: {})", outcome.document_id);
        return;
    }

    println!("[OK] 문서 처리 완료 (ID: {})", outcome.document_id);
    println!("     카테고리: {}", outcome.category);
    if outcome.chunk_count == 0 {
        println!("[!] 생성된 청크가 없습니다. 텍스트가 비어있거나 너무 짧습니다.");
    } else {
        println!("     청크: {} 개", outcome.chunk_count);
    }
}

/// 텍스트 자르기 (UTF-8 안전, 공백 압축)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = flatten(text);

    if cleaned.chars().count() <= max_chars {
        cleaned
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query() {
        let cli = Cli::try_parse_from([
            "pulse-one", "query", "vacation policy", "--limit", "3", "--category", "policy",
        ])
        .unwrap();

        match cli.command {
            Commands::Query {
                query,
                limit,
                category,
                ..
            } => {
                assert_eq!(query, "vacation policy");
                assert_eq!(limit, 3);
                assert_eq!(category, Some(Category::Policy));
            }
            _ => panic!("expected query command"),
        }
    }

    #[test]
    fn test_parse_ingest_chunk_options() {
        let cli = Cli::try_parse_from([
            "pulse-one", "ingest", "--text", "hello", "--chunk-size", "800", "--overlap", "0",
        ])
        .unwrap();

        match cli.command {
            Commands::Ingest { chunking, .. } => {
                let config = chunking.to_config();
                assert_eq!(config.target_characters, 800);
                assert_eq!(config.overlap_characters, 0);
                assert_eq!(config.short_document_characters, 500);
            }
            _ => panic!("expected ingest command"),
        }
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("hello\n\nworld", 20), "hello world");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
    }

    #[test]
    fn test_truncate_unicode() {
        assert_eq!(truncate_text("안녕하세요 세계", 5), "안녕하세요...");
    }
}
