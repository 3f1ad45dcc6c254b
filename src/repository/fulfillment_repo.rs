// ==========================================
// 销售佣金 CRM - 履约仓储
// ==========================================
// 聚合: 订单确认 / 发货单 / 报价
// ==========================================

use crate::domain::fulfillment::{AcknowledgementInput, DeliveryInput, QuoteInput};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_util::{date_opt_to_sql, dec_to_sql};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct FulfillmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl FulfillmentRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 订单确认
    // ==========================================
    pub fn create_acknowledgement(&self, input: &AcknowledgementInput) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO order_acknowledgement (
                ack_number, order_id, order_detail_id, ack_date, ship_date
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                input.ack_number,
                input.order_id,
                input.order_detail_id,
                date_opt_to_sql(input.ack_date),
                date_opt_to_sql(input.ship_date),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 按自然键 (order_detail_id, ack_number) 查找订单确认 id
    pub fn find_acknowledgement(
        &self,
        order_detail_id: Option<i64>,
        ack_number: &str,
    ) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                r#"
                SELECT id FROM order_acknowledgement
                WHERE order_detail_id IS ?1 AND ack_number = ?2
                "#,
                params![order_detail_id, ack_number],
                |row| row.get(0),
            )
            .optional()?)
    }

    // ==========================================
    // 发货单
    // ==========================================
    pub fn create_delivery(&self, input: &DeliveryInput) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let delivery_id = {
            tx.execute(
                r#"
                INSERT INTO delivery (delivery_number, vendor_id, warehouse_id, delivery_date)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    input.delivery_number,
                    input.vendor_id,
                    input.warehouse_id,
                    date_opt_to_sql(input.delivery_date),
                ],
            )?;
            let delivery_id = tx.last_insert_rowid();

            let mut stmt = tx.prepare(
                "INSERT INTO delivery_item (delivery_id, product_id, quantity) VALUES (?1, ?2, ?3)",
            )?;
            for item in &input.items {
                stmt.execute(params![delivery_id, item.product_id, dec_to_sql(item.quantity)])?;
            }
            delivery_id
        };
        tx.commit()?;
        Ok(delivery_id)
    }

    /// 按自然键 (delivery_number, vendor_id) 查找发货单 id
    pub fn find_delivery_by_number_and_vendor(
        &self,
        delivery_number: &str,
        vendor_id: i64,
    ) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                "SELECT id FROM delivery WHERE delivery_number = ?1 AND vendor_id = ?2",
                params![delivery_number, vendor_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    // ==========================================
    // 报价
    // ==========================================
    pub fn create_quote(&self, input: &QuoteInput) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let quote_id = {
            tx.execute(
                r#"
                INSERT INTO quote (quote_number, sold_to_customer_id, end_user_id, quote_date)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    input.quote_number,
                    input.sold_to_customer_id,
                    input.end_user_id,
                    date_opt_to_sql(input.quote_date),
                ],
            )?;
            let quote_id = tx.last_insert_rowid();

            let mut stmt = tx.prepare(
                r#"
                INSERT INTO quote_detail (
                    quote_id, item_number, product_id, adhoc_product_name, quantity, unit_price
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for detail in &input.details {
                stmt.execute(params![
                    quote_id,
                    detail.item_number,
                    detail.product_id,
                    detail.adhoc_product_name,
                    dec_to_sql(detail.quantity),
                    dec_to_sql(detail.unit_price),
                ])?;
            }
            quote_id
        };
        tx.commit()?;
        Ok(quote_id)
    }

    /// 按报价单号查找报价 id（全局唯一）
    pub fn find_quote_by_number(&self, quote_number: &str) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                "SELECT id FROM quote WHERE quote_number = ?1",
                params![quote_number],
                |row| row.get(0),
            )
            .optional()?)
    }
}
