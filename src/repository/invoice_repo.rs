// ==========================================
// 销售佣金 CRM - 发票仓储
// ==========================================

use crate::domain::invoice::InvoiceInput;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_util::{date_opt_to_sql, dec_opt_to_sql, dec_to_sql};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct InvoiceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InvoiceRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在外层事务/保存点内创建发票（头 + 明细）
    pub fn create_in_tx(conn: &Connection, input: &InvoiceInput) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO invoice (
                invoice_number, factory_id, sold_to_customer_id, invoice_date, invoice_amount
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                input.invoice_number,
                input.factory_id,
                input.sold_to_customer_id,
                date_opt_to_sql(input.invoice_date),
                dec_to_sql(input.invoice_amount),
            ],
        )?;
        let invoice_id = conn.last_insert_rowid();

        let mut stmt = conn.prepare(
            r#"
            INSERT INTO invoice_detail (
                invoice_id, item_number, order_detail_id, product_id,
                adhoc_product_name, quantity, unit_price, commission_rate
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )?;
        for detail in &input.details {
            stmt.execute(params![
                invoice_id,
                detail.item_number,
                detail.order_detail_id,
                detail.product_id,
                detail.adhoc_product_name,
                dec_to_sql(detail.quantity),
                dec_to_sql(detail.unit_price),
                dec_opt_to_sql(detail.commission_rate),
            ])?;
        }
        Ok(invoice_id)
    }

    /// 独立事务创建发票
    pub fn create(&self, input: &InvoiceInput) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let id = Self::create_in_tx(&tx, input)?;
        tx.commit()?;
        Ok(id)
    }

    /// 按自然键 (invoice_number, factory_id) 查找发票 id
    pub fn find_by_number_and_factory(
        &self,
        invoice_number: &str,
        factory_id: i64,
    ) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                "SELECT id FROM invoice WHERE invoice_number = ?1 AND factory_id = ?2",
                params![invoice_number, factory_id],
                |row| row.get(0),
            )
            .optional()?)
    }
}
