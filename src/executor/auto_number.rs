// ==========================================
// 销售佣金 CRM - 自动编号服务
// ==========================================
// 用途: 订单/发票缺号时优先从序列分配, 其余实体走时间戳兜底
// 存储: number_sequence 表 (entity_type → next_value)
// ==========================================

use crate::domain::types::DocumentEntityType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// AutoNumberService Trait
// ==========================================
#[async_trait]
pub trait AutoNumberService: Send + Sync {
    /// 值是否需要生成编号（None / 空串 / 纯空白）
    fn needs_generation(&self, value: Option<&str>) -> bool {
        value.map(str::trim).map_or(true, str::is_empty)
    }

    /// 为指定实体类型分配下一个编号
    async fn generate_number(&self, entity_type: DocumentEntityType) -> RepositoryResult<String>;
}

// ==========================================
// SequenceAutoNumberService - 序列表实现
// ==========================================
pub struct SequenceAutoNumberService {
    conn: Arc<Mutex<Connection>>,
}

impl SequenceAutoNumberService {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn number_prefix(entity_type: DocumentEntityType) -> &'static str {
        match entity_type {
            DocumentEntityType::Orders => "PO",
            DocumentEntityType::Invoices => "INV",
            _ => "GEN",
        }
    }
}

#[async_trait]
impl AutoNumberService for SequenceAutoNumberService {
    async fn generate_number(&self, entity_type: DocumentEntityType) -> RepositoryResult<String> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO number_sequence (entity_type, next_value) VALUES (?1, 2)
            ON CONFLICT(entity_type) DO UPDATE SET next_value = next_value + 1
            "#,
            params![entity_type.to_db_str()],
        )?;
        // UPSERT 后 next_value 指向下一个待发编号, 本次分配的是 next_value - 1
        let allocated: i64 = tx.query_row(
            "SELECT next_value - 1 FROM number_sequence WHERE entity_type = ?1",
            params![entity_type.to_db_str()],
            |row| row.get(0),
        )?;
        tx.commit()?;

        Ok(format!(
            "{}-{:06}",
            Self::number_prefix(entity_type),
            allocated
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn service() -> SequenceAutoNumberService {
        let conn = Connection::open_in_memory().expect("open");
        db::configure_sqlite_connection(&conn).expect("configure");
        db::init_schema(&conn).expect("schema");
        SequenceAutoNumberService::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_needs_generation() {
        let svc = service();
        assert!(svc.needs_generation(None));
        assert!(svc.needs_generation(Some("")));
        assert!(svc.needs_generation(Some("   ")));
        assert!(!svc.needs_generation(Some("PO-1")));
    }

    #[tokio::test]
    async fn test_sequence_increments() {
        let svc = service();
        let a = svc
            .generate_number(DocumentEntityType::Orders)
            .await
            .unwrap();
        let b = svc
            .generate_number(DocumentEntityType::Orders)
            .await
            .unwrap();
        let c = svc
            .generate_number(DocumentEntityType::Invoices)
            .await
            .unwrap();
        assert_eq!(a, "PO-000001");
        assert_eq!(b, "PO-000002");
        assert_eq!(c, "INV-000001");
    }
}
