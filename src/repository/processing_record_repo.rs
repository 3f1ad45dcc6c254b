// ==========================================
// 销售佣金 CRM - 处理记录仓储
// ==========================================

use crate::domain::processing::ProcessingRecord;
use crate::domain::types::ProcessingStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ProcessingRecordRepository
// ==========================================
pub struct ProcessingRecordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProcessingRecordRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 批量持久化处理记录（单事务）
    pub fn batch_insert(&self, records: &[ProcessingRecord]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let count = {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO processing_record (
                    pending_document_id, entity_id, status, dto_json, error_message, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;

            let mut count = 0;
            for record in records {
                stmt.execute(params![
                    record.pending_document_id,
                    record.entity_id,
                    record.status.to_db_str(),
                    serde_json::to_string(&record.dto_json)?,
                    record.error_message,
                    record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                ])?;
                count += 1;
            }
            count
        };
        tx.commit()?;
        Ok(count)
    }

    /// 查询某文档的全部处理记录（按插入顺序）
    pub fn list_by_document(
        &self,
        pending_document_id: i64,
    ) -> RepositoryResult<Vec<ProcessingRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT pending_document_id, entity_id, status, dto_json, error_message, created_at
            FROM processing_record
            WHERE pending_document_id = ?1
            ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map(params![pending_document_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<i64>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (doc_id, entity_id, status_raw, dto_raw, error_message, created) = row?;
            records.push(ProcessingRecord {
                pending_document_id: doc_id,
                entity_id,
                status: ProcessingStatus::parse(&status_raw),
                dto_json: serde_json::from_str(&dto_raw)?,
                error_message,
                created_at: chrono::NaiveDateTime::parse_from_str(
                    created.trim(),
                    "%Y-%m-%d %H:%M:%S",
                )
                .map(|dt| dt.and_utc())
                .unwrap_or_else(|_| chrono::Utc::now()),
            });
        }
        Ok(records)
    }
}
