// ==========================================
// 销售佣金 CRM - 待处理文档仓储
// ==========================================
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::pending::{PendingDocument, PendingEntity};
use crate::domain::types::{
    ConfirmationStatus, DocumentEntityType, PendingEntityType, WorkflowStatus,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// PendingDocumentRepository
// ==========================================
pub struct PendingDocumentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PendingDocumentRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 加载待处理文档及其全部 PendingEntity
    ///
    /// # 返回
    /// - Ok(Some(document)): 找到文档（pending_entities 已加载）
    /// - Ok(None): 未找到
    pub fn load_with_entities(&self, id: i64) -> RepositoryResult<Option<PendingDocument>> {
        let conn = self.get_conn()?;

        let doc = conn
            .query_row(
                r#"
                SELECT id, file_id, entity_type, extracted_data_json, workflow_status,
                       created_at, updated_at
                FROM pending_document
                WHERE id = ?1
                "#,
                params![id],
                |row| {
                    let entity_type_raw: Option<String> = row.get(2)?;
                    let extracted_raw: String = row.get(3)?;
                    let status_raw: String = row.get(4)?;
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        entity_type_raw,
                        extracted_raw,
                        status_raw,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((doc_id, file_id, entity_type_raw, extracted_raw, status_raw, created, updated)) =
            doc
        else {
            return Ok(None);
        };

        let extracted_data_json: serde_json::Value = serde_json::from_str(&extracted_raw)?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, pending_document_id, entity_type, confirmation_status,
                   best_match_id, dto_ids, flow_index_detail, extracted_data, created_at
            FROM pending_entity
            WHERE pending_document_id = ?1
            ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map(params![doc_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<i64>>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<i64>>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut pending_entities = Vec::new();
        for row in rows {
            let (
                pe_id,
                pending_document_id,
                entity_type_raw,
                status_raw,
                best_match_id,
                dto_ids_raw,
                flow_index_detail,
                extracted_data_raw,
                pe_created,
            ) = row?;

            let Some(entity_type) = PendingEntityType::parse(&entity_type_raw) else {
                // 未知实体类型按数据质量问题跳过, 不阻断加载
                continue;
            };
            let Some(confirmation_status) = ConfirmationStatus::parse(&status_raw) else {
                continue;
            };

            let dto_ids: Vec<String> = serde_json::from_str(&dto_ids_raw)?;
            let extracted_data = match extracted_data_raw {
                Some(raw) => Some(serde_json::from_str(&raw)?),
                None => None,
            };

            pending_entities.push(PendingEntity {
                id: pe_id,
                pending_document_id,
                entity_type,
                confirmation_status,
                best_match_id,
                dto_ids,
                flow_index_detail: flow_index_detail.map(|v| v as usize),
                extracted_data,
                created_at: parse_ts(&pe_created),
            });
        }

        Ok(Some(PendingDocument {
            id: doc_id,
            file_id,
            entity_type: entity_type_raw.as_deref().and_then(DocumentEntityType::parse),
            extracted_data_json,
            workflow_status: WorkflowStatus::parse(&status_raw),
            pending_entities,
            created_at: parse_ts(&created),
            updated_at: parse_ts(&updated),
        }))
    }

    /// 更新工作流状态
    pub fn update_workflow_status(
        &self,
        id: i64,
        status: WorkflowStatus,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            r#"
            UPDATE pending_document
            SET workflow_status = ?2, updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![id, status.to_db_str()],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "pending_document".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// 在独立短事务中将文档置为 FAILED
    ///
    /// 用途: 执行器兜底路径（外层事务可能已不可用）
    pub fn mark_failed_transient(&self, id: i64) -> RepositoryResult<()> {
        self.update_workflow_status(id, WorkflowStatus::Failed)
    }
}

fn parse_ts(raw: &str) -> chrono::DateTime<Utc> {
    // SQLite datetime('now') 形如 "2026-08-26 10:00:00"
    chrono::NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}
