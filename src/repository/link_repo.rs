// ==========================================
// 销售佣金 CRM - 实体链接仓储
// ==========================================
// 用途: 源文件与创建实体之间的关联关系
// ==========================================

use crate::domain::types::{LinkSourceType, LinkTargetType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct EntityLinkRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EntityLinkRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 批量建立源 → 目标链接（单事务, 重复四元组静默忽略）
    pub fn bulk_create_links(
        &self,
        source_type: LinkSourceType,
        source_id: i64,
        target_type: LinkTargetType,
        target_ids: &[i64],
    ) -> RepositoryResult<usize> {
        if target_ids.is_empty() {
            return Ok(0);
        }
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let count = {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO entity_link (source_type, source_id, target_type, target_id)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )?;
            let mut count = 0;
            for target_id in target_ids {
                count += stmt.execute(params![
                    source_type.to_db_str(),
                    source_id,
                    target_type.to_db_str(),
                    target_id,
                ])?;
            }
            count
        };
        tx.commit()?;
        Ok(count)
    }

    /// 查询某源的全部目标 id（测试与巡检用）
    pub fn list_target_ids(
        &self,
        source_type: LinkSourceType,
        source_id: i64,
        target_type: LinkTargetType,
    ) -> RepositoryResult<Vec<i64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT target_id FROM entity_link
            WHERE source_type = ?1 AND source_id = ?2 AND target_type = ?3
            ORDER BY target_id
            "#,
        )?;
        let rows = stmt.query_map(
            params![source_type.to_db_str(), source_id, target_type.to_db_str()],
            |row| row.get::<_, i64>(0),
        )?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }
}
