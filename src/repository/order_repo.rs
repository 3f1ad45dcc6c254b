// ==========================================
// 销售佣金 CRM - 订单仓储
// ==========================================
// 静态 *_in_tx 方法供保存点波次在外层事务内复用
// ==========================================

use crate::domain::order::{Order, OrderDetail, OrderInput};
use crate::domain::types::OrderDetailStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_util::{
    date_opt_from_sql, date_opt_to_sql, dec_from_sql, dec_opt_from_sql, dec_opt_to_sql, dec_to_sql,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在外层事务/保存点内创建订单（头 + 明细）
    ///
    /// 明细 shipping_balance 初始化为订单数量（未发货）
    pub fn create_in_tx(conn: &Connection, input: &OrderInput) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO sales_order (
                order_number, factory_id, sold_to_customer_id, bill_to_customer_id, order_date
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                input.order_number,
                input.factory_id,
                input.sold_to_customer_id,
                input.bill_to_customer_id,
                date_opt_to_sql(input.order_date),
            ],
        )?;
        let order_id = conn.last_insert_rowid();

        let mut stmt = conn.prepare(
            r#"
            INSERT INTO order_detail (
                order_id, item_number, product_id, adhoc_product_name, end_user_id,
                quantity, unit_price, commission_rate, commission_discount_rate,
                discount_rate, shipping_balance, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )?;
        for detail in &input.details {
            stmt.execute(params![
                order_id,
                detail.item_number,
                detail.product_id,
                detail.adhoc_product_name,
                detail.end_user_id,
                dec_to_sql(detail.quantity),
                dec_to_sql(detail.unit_price),
                dec_opt_to_sql(detail.commission_rate),
                dec_opt_to_sql(detail.commission_discount_rate),
                dec_opt_to_sql(detail.discount_rate),
                dec_to_sql(detail.quantity),
                OrderDetailStatus::Open.to_db_str(),
            ])?;
        }
        Ok(order_id)
    }

    /// 独立事务创建订单
    pub fn create(&self, input: &OrderInput) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let id = Self::create_in_tx(&tx, input)?;
        tx.commit()?;
        Ok(id)
    }

    /// 按自然键 (order_number, factory_id) 查找订单 id
    pub fn find_by_number_and_factory(
        &self,
        order_number: &str,
        factory_id: i64,
    ) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                "SELECT id FROM sales_order WHERE order_number = ?1 AND factory_id = ?2",
                params![order_number, factory_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// 加载订单及全部明细（明细按 item_number, id 排序）
    pub fn find_with_details(&self, id: i64) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;

        let head = conn
            .query_row(
                r#"
                SELECT id, order_number, factory_id, sold_to_customer_id,
                       bill_to_customer_id, order_date, created_at
                FROM sales_order
                WHERE id = ?1
                "#,
                params![id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((order_id, order_number, factory_id, sold_to, bill_to, order_date, created)) =
            head
        else {
            return Ok(None);
        };

        let details = Self::load_details(&conn, order_id)?;

        Ok(Some(Order {
            id: order_id,
            order_number,
            factory_id,
            sold_to_customer_id: sold_to,
            bill_to_customer_id: bill_to,
            order_date: date_opt_from_sql(order_date),
            details,
            created_at: chrono::NaiveDateTime::parse_from_str(
                created.trim(),
                "%Y-%m-%d %H:%M:%S",
            )
            .map(|dt| dt.and_utc())
            .unwrap_or_else(|_| chrono::Utc::now()),
        }))
    }

    /// 加载订单明细对应的产品特征 (厂商件号, 产品描述)
    ///
    /// 与 find_with_details 的明细顺序一致, 供模糊行匹配按位对齐
    pub fn detail_part_features(
        &self,
        order_id: i64,
    ) -> RepositoryResult<Vec<(Option<String>, Option<String>)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT p.factory_part_number, p.description
            FROM order_detail d
            LEFT JOIN product p ON p.id = d.product_id
            WHERE d.order_id = ?1
            ORDER BY d.item_number, d.id
            "#,
        )?;
        let rows = stmt.query_map(params![order_id], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, Option<String>>(1)?,
            ))
        })?;
        let mut features = Vec::new();
        for row in rows {
            features.push(row?);
        }
        Ok(features)
    }

    fn load_details(conn: &Connection, order_id: i64) -> RepositoryResult<Vec<OrderDetail>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, order_id, item_number, product_id, adhoc_product_name, end_user_id,
                   quantity, unit_price, commission_rate, commission_discount_rate,
                   discount_rate, shipping_balance, status
            FROM order_detail
            WHERE order_id = ?1
            ORDER BY item_number, id
            "#,
        )?;
        let rows = stmt.query_map(params![order_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<i64>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<i64>>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, Option<String>>(8)?,
                row.get::<_, Option<String>>(9)?,
                row.get::<_, Option<String>>(10)?,
                row.get::<_, String>(11)?,
                row.get::<_, String>(12)?,
            ))
        })?;

        let mut details = Vec::new();
        for row in rows {
            let (
                detail_id,
                order_id,
                item_number,
                product_id,
                adhoc_product_name,
                end_user_id,
                quantity,
                unit_price,
                commission_rate,
                commission_discount_rate,
                discount_rate,
                shipping_balance,
                status,
            ) = row?;
            details.push(OrderDetail {
                id: detail_id,
                order_id,
                item_number,
                product_id,
                adhoc_product_name,
                end_user_id,
                quantity: dec_from_sql(&quantity)?,
                unit_price: dec_from_sql(&unit_price)?,
                commission_rate: dec_opt_from_sql(commission_rate)?,
                commission_discount_rate: dec_opt_from_sql(commission_discount_rate)?,
                discount_rate: dec_opt_from_sql(discount_rate)?,
                shipping_balance: dec_from_sql(&shipping_balance)?,
                status: OrderDetailStatus::parse(&status),
            });
        }
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::domain::order::OrderDetailInput;
    use crate::engine::detail_matcher::{IncomingLine, OrderDetailMatcher};
    use rust_decimal_macros::dec;

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        db::configure_sqlite_connection(&conn).expect("configure");
        db::init_schema(&conn).expect("schema");
        Arc::new(Mutex::new(conn))
    }

    fn seed_product(
        conn: &Arc<Mutex<Connection>>,
        factory_id: i64,
        name: &str,
        fpn: &str,
        description: &str,
    ) -> i64 {
        let guard = conn.lock().expect("lock");
        guard
            .execute(
                r#"
                INSERT INTO product (name, factory_id, factory_part_number, description)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![name, factory_id, fpn, description],
            )
            .expect("insert product");
        guard.last_insert_rowid()
    }

    // 两行同价的订单, 行 2 的数量/余量更大
    fn seed_two_line_order(conn: &Arc<Mutex<Connection>>) -> i64 {
        {
            let guard = conn.lock().expect("lock");
            guard
                .execute("INSERT INTO factory (name) VALUES ('Cooper')", [])
                .expect("insert factory");
            guard
                .execute("INSERT INTO customer (company_name) VALUES ('Acme')", [])
                .expect("insert customer");
        }
        let p1 = seed_product(conn, 1, "Widget Deluxe", "FPN-1", "steel bracket large");
        let p2 = seed_product(conn, 1, "Gadget Basic", "FPN-2", "aluminum rod small");

        let repo = OrderRepository::from_connection(conn.clone());
        let detail = |item, product_id, qty| OrderDetailInput {
            item_number: item,
            product_id: Some(product_id),
            adhoc_product_name: None,
            end_user_id: None,
            quantity: qty,
            unit_price: dec!(10),
            commission_rate: None,
            commission_discount_rate: None,
            discount_rate: None,
        };
        repo.create(&OrderInput {
            order_number: "PO-1".to_string(),
            factory_id: 1,
            sold_to_customer_id: 1,
            bill_to_customer_id: None,
            order_date: None,
            details: vec![detail(1, p1, dec!(5)), detail(2, p2, dec!(9))],
        })
        .expect("create order")
    }

    #[test]
    fn test_part_features_are_fpn_then_description() {
        let conn = setup();
        let order_id = seed_two_line_order(&conn);
        let repo = OrderRepository::from_connection(conn);

        let features = repo.detail_part_features(order_id).expect("features");
        assert_eq!(
            features,
            vec![
                (
                    Some("FPN-1".to_string()),
                    Some("steel bracket large".to_string())
                ),
                (
                    Some("FPN-2".to_string()),
                    Some("aluminum rod small".to_string())
                ),
            ]
        );
    }

    #[test]
    fn test_description_clause_matches_through_repository() {
        let conn = setup();
        let order_id = seed_two_line_order(&conn);
        let repo = OrderRepository::from_connection(conn);

        let order = repo
            .find_with_details(order_id)
            .expect("load order")
            .expect("order exists");
        let features = repo.detail_part_features(order_id).expect("features");

        // 进线件号与行 1 的产品描述相似, 价格两行同中:
        // 价格 ∧ 描述子句必须选行 1, 而不是退到纯价格子句取余量大的行 2
        let matcher = OrderDetailMatcher::new(88, dec!(0.10));
        let line = IncomingLine {
            unit_price: dec!(10),
            part_number: Some("steel bracket large".to_string()),
            quantity: dec!(1),
            item_number: None,
        };
        assert_eq!(
            matcher.best_match(&order.details, &features, &line),
            Some(order.details[0].id)
        );
    }
}
