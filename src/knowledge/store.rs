//! Knowledge Store - rusqlite 기반 동기 문서/청크 저장소
//!
//! 문서 메타데이터와 청크를 저장하고, 검색 후보 청크를 불러옵니다.
//! 저장 위치: ~/.pulse-one/knowledge.db (PULSE_ONE_DATA_DIR로 변경 가능)

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, Row};
use serde::{Deserialize, Serialize};

use super::categorizer::Category;
use super::chunker::Chunk;

/// 데이터 디렉토리 환경변수
pub const DATA_DIR_ENV: &str = "PULSE_ONE_DATA_DIR";

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로 (PULSE_ONE_DATA_DIR 또는 ~/.pulse-one/)
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }

    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pulse-one")
}

// ============================================================================
// Types
// ============================================================================

/// 문서 처리 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "error" => Ok(Self::Error),
            other => anyhow::bail!("Unknown document status: {}", other),
        }
    }
}

/// 저장된 문서 엔트리
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub category: Category,
    pub status: DocumentStatus,
    pub error_message: Option<String>,
    pub content_hash: String,
    /// 추출된 원문 (재처리용)
    pub content: String,
    pub summary: String,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 새 문서 입력용 구조체
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub content: String,
    /// 지정하지 않으면 자동 분류
    pub category: Option<Category>,
}

/// 후보 청크 조회 조건
#[derive(Debug, Clone, Default)]
pub struct ChunkFilter {
    pub category: Option<Category>,
    pub document_id: Option<String>,
    /// 후보 최대 개수 (0이면 제한 없음)
    pub limit: usize,
}

/// 저장소 통계
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub document_count: usize,
    pub chunk_count: usize,
    pub error_count: usize,
    pub total_content_bytes: usize,
    pub db_path: PathBuf,
}

// ============================================================================
// KnowledgeStore
// ============================================================================

const DOCUMENT_COLUMNS: &str = "id, filename, category, status, error_message, content_hash, \
                                content, summary, chunk_count, created_at, updated_at";

/// Knowledge Store - 동기 문서/청크 저장소
#[derive(Clone)]
pub struct KnowledgeStore {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl KnowledgeStore {
    /// 저장소 열기 (없으면 생성)
    ///
    /// # Arguments
    /// * `path` - DB 파일 경로 (없으면 생성)
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create database directory")?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open SQLite database")?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: path.to_path_buf(),
        };

        store.initialize()?;
        Ok(store)
    }

    /// 기본 위치에서 열기 (<data dir>/knowledge.db)
    pub fn open_default() -> Result<Self> {
        let data_dir = get_data_dir();
        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;
        }

        Self::open(&data_dir.join("knowledge.db"))
    }

    /// DB 경로 반환
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))
    }

    /// 스키마 초기화
    fn initialize(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT 'general',
                status TEXT NOT NULL DEFAULT 'pending',
                error_message TEXT,
                content_hash TEXT NOT NULL,
                content TEXT NOT NULL,
                summary TEXT NOT NULL DEFAULT '',
                chunk_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_category ON documents(category);
            CREATE INDEX IF NOT EXISTS idx_documents_hash ON documents(content_hash);

            CREATE TABLE IF NOT EXISTS document_chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                content_folded TEXT NOT NULL,
                word_count INTEGER NOT NULL,
                start_position INTEGER NOT NULL,
                end_position INTEGER NOT NULL,
                UNIQUE(document_id, chunk_index)
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_document ON document_chunks(document_id);
            "#,
        )
        .context("Failed to initialize schema")?;

        tracing::debug!("Knowledge store initialized at {:?}", self.db_path);
        Ok(())
    }

    /// 문서 생성 (pending 상태)
    pub fn create_document(
        &self,
        doc: &NewDocument,
        category: Category,
        content_hash: &str,
        summary: &str,
    ) -> Result<String> {
        let conn = self.lock()?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO documents (id, filename, category, status, content_hash, content, summary,
                                    created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                id,
                doc.filename,
                category.as_str(),
                DocumentStatus::Pending.as_str(),
                content_hash,
                doc.content,
                summary,
                now
            ],
        )
        .context("Failed to insert document")?;

        tracing::info!("Created document: {} (id={})", doc.filename, id);
        Ok(id)
    }

    /// ID로 문서 조회
    pub fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM documents WHERE id = ?1",
            DOCUMENT_COLUMNS
        ))?;

        let mut rows = stmt.query_map(params![id], map_document)?;
        rows.next().transpose().context("Failed to read document")
    }

    /// 같은 내용(해시)으로 처리 완료된 문서 조회
    pub fn find_by_hash(&self, content_hash: &str) -> Result<Option<Document>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM documents WHERE content_hash = ?1 AND status = 'completed'
             ORDER BY created_at DESC LIMIT 1",
            DOCUMENT_COLUMNS
        ))?;

        let mut rows = stmt.query_map(params![content_hash], map_document)?;
        rows.next().transpose().context("Failed to read document")
    }

    /// 문서 목록 조회
    pub fn list_documents(&self, limit: usize, category: Option<Category>) -> Result<Vec<Document>> {
        let conn = self.lock()?;

        let docs = if let Some(category) = category {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM documents WHERE category = ?1
                 ORDER BY created_at DESC LIMIT ?2",
                DOCUMENT_COLUMNS
            ))?;
            let rows = stmt.query_map(params![category.as_str(), limit as i64], map_document)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM documents ORDER BY created_at DESC LIMIT ?1",
                DOCUMENT_COLUMNS
            ))?;
            let rows = stmt.query_map(params![limit as i64], map_document)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        Ok(docs)
    }

    /// 문서 삭제 (청크는 CASCADE로 함께 삭제)
    pub fn delete_document(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// 처리 상태 변경
    pub fn set_status(
        &self,
        id: &str,
        status: DocumentStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();

        let rows = conn.execute(
            "UPDATE documents SET status = ?2, error_message = ?3, updated_at = ?4 WHERE id = ?1",
            params![id, status.as_str(), error_message, now],
        )?;

        if rows == 0 {
            anyhow::bail!("Document not found: {}", id);
        }

        tracing::debug!("Document {} -> {}", id, status);
        Ok(())
    }

    /// 문서의 청크 전체 교체 (단일 트랜잭션)
    ///
    /// 기존 청크를 모두 지우고 새 청크 집합을 넣습니다. 부분 갱신은 없습니다.
    pub fn replace_chunks(&self, document_id: &str, chunks: &[Chunk]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        let removed = tx.execute(
            "DELETE FROM document_chunks WHERE document_id = ?1",
            params![document_id],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO document_chunks
                    (document_id, chunk_index, content, content_folded, word_count,
                     start_position, end_position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;

            for chunk in chunks {
                if chunk.document_id != document_id {
                    anyhow::bail!(
                        "Chunk belongs to {} but was stored under {}",
                        chunk.document_id,
                        document_id
                    );
                }

                stmt.execute(params![
                    document_id,
                    chunk.chunk_index as i64,
                    chunk.content,
                    chunk.content.to_lowercase(),
                    chunk.word_count as i64,
                    chunk.start_position as i64,
                    chunk.end_position as i64,
                ])
                .context("Failed to insert chunk")?;
            }
        }

        tx.execute(
            "UPDATE documents SET chunk_count = ?2, updated_at = ?3 WHERE id = ?1",
            params![document_id, chunks.len() as i64, Utc::now().to_rfc3339()],
        )?;

        tx.commit().context("Failed to commit chunks")?;

        tracing::info!(
            "Stored {} chunks for {} (replaced {})",
            chunks.len(),
            document_id,
            removed
        );
        Ok(chunks.len())
    }

    /// 문서의 청크를 순서대로 조회
    pub fn load_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT document_id, chunk_index, content, word_count, start_position, end_position
             FROM document_chunks WHERE document_id = ?1
             ORDER BY chunk_index",
        )?;

        let chunks = stmt
            .query_map(params![document_id], map_chunk)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(chunks)
    }

    /// 검색 후보 청크 조회
    ///
    /// `needles`(소문자) 중 하나라도 포함하는 청크를 문서/청크 순서대로 반환합니다.
    /// 비교 대상은 저장 시 Rust `to_lowercase()`로 접은 `content_folded`이므로
    /// 유니코드 대소문자도 scorer와 똑같이 취급됩니다. `needles`가 비어 있으면 전부.
    pub fn candidate_chunks(&self, needles: &[String], filter: &ChunkFilter) -> Result<Vec<Chunk>> {
        let conn = self.lock()?;

        let mut sql = String::from(
            "SELECT c.document_id, c.chunk_index, c.content, c.word_count,
                    c.start_position, c.end_position
             FROM document_chunks c
             JOIN documents d ON d.id = c.document_id
             WHERE d.status = 'completed'",
        );
        let mut values: Vec<String> = Vec::new();

        if let Some(category) = filter.category {
            values.push(category.as_str().to_string());
            sql.push_str(&format!(" AND d.category = ?{}", values.len()));
        }

        if let Some(ref document_id) = filter.document_id {
            values.push(document_id.clone());
            sql.push_str(&format!(" AND c.document_id = ?{}", values.len()));
        }

        let needles: Vec<&String> = needles.iter().filter(|n| !n.is_empty()).collect();
        if !needles.is_empty() {
            let clauses: Vec<String> = needles
                .iter()
                .map(|needle| {
                    values.push(needle.to_string());
                    format!("instr(c.content_folded, ?{}) > 0", values.len())
                })
                .collect();
            sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
        }

        sql.push_str(" ORDER BY d.created_at, c.document_id, c.chunk_index");

        if filter.limit > 0 {
            sql.push_str(&format!(" LIMIT {}", filter.limit));
        }

        let mut stmt = conn.prepare(&sql)?;
        let chunks = stmt
            .query_map(rusqlite::params_from_iter(values.iter()), map_chunk)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::debug!("Loaded {} candidate chunks", chunks.len());
        Ok(chunks)
    }

    /// 저장소 통계
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.lock()?;

        let count = |sql: &str| -> Result<i64> {
            conn.query_row(sql, [], |row| row.get(0))
                .with_context(|| format!("Failed to query stats: {}", sql))
        };

        Ok(StoreStats {
            document_count: count("SELECT COUNT(*) FROM documents")? as usize,
            chunk_count: count("SELECT COUNT(*) FROM document_chunks")? as usize,
            error_count: count("SELECT COUNT(*) FROM documents WHERE status = 'error'")? as usize,
            total_content_bytes: count(
                "SELECT COALESCE(SUM(LENGTH(CAST(content AS BLOB))), 0) FROM documents",
            )?
                as usize,
            db_path: self.db_path.clone(),
        })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn map_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        filename: row.get(1)?,
        category: row
            .get::<_, String>(2)?
            .parse()
            .unwrap_or(Category::General),
        status: row
            .get::<_, String>(3)?
            .parse()
            .unwrap_or(DocumentStatus::Error),
        error_message: row.get(4)?,
        content_hash: row.get(5)?,
        content: row.get(6)?,
        summary: row.get(7)?,
        chunk_count: row.get::<_, i64>(8)? as usize,
        created_at: parse_datetime(row.get::<_, String>(9)?),
        updated_at: parse_datetime(row.get::<_, String>(10)?),
    })
}

fn map_chunk(row: &Row<'_>) -> rusqlite::Result<Chunk> {
    Ok(Chunk {
        document_id: row.get(0)?,
        chunk_index: row.get::<_, i64>(1)? as usize,
        content: row.get(2)?,
        word_count: row.get::<_, i64>(3)? as usize,
        start_position: row.get::<_, i64>(4)? as usize,
        end_position: row.get::<_, i64>(5)? as usize,
    })
}

/// RFC3339 문자열을 DateTime<Utc>로 파싱
fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

// ============================================================================
// Tests
// ============================================================================
