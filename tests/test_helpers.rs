// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 内存数据库初始化、主数据与待处理文档的种子数据
// ==========================================
#![allow(dead_code)]

use commission_crm::db;
use commission_crm::executor::ExecutionSettings;
use rusqlite::{params, Connection};
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 创建临时文件测试数据库并初始化 schema
///
/// 返回的 NamedTempFile 必须在测试期间保持存活
pub fn create_test_db() -> (NamedTempFile, Arc<Mutex<Connection>>) {
    let file = NamedTempFile::new().expect("create temp db file");
    let path = file.path().to_str().expect("utf8 temp path");
    let conn = db::open_sqlite_connection(path).expect("open test db");
    db::init_schema(&conn).expect("init schema");
    (file, Arc::new(Mutex::new(conn)))
}

/// 默认执行设置（与配置缺省值一致）
pub fn default_settings() -> ExecutionSettings {
    ExecutionSettings {
        batch_size: 50,
        fuzzy_match_threshold: 88,
        price_tolerance: dec!(0.10),
        acting_user_id: 1,
    }
}

// ==========================================
// 主数据种子
// ==========================================

pub fn seed_factory(conn: &Arc<Mutex<Connection>>, name: &str, rate: Option<&str>) -> i64 {
    let guard = conn.lock().expect("lock");
    guard
        .execute(
            "INSERT INTO factory (name, default_commission_rate) VALUES (?1, ?2)",
            params![name, rate],
        )
        .expect("insert factory");
    guard.last_insert_rowid()
}

pub fn seed_customer(conn: &Arc<Mutex<Connection>>, company_name: &str) -> i64 {
    let guard = conn.lock().expect("lock");
    guard
        .execute(
            "INSERT INTO customer (company_name) VALUES (?1)",
            params![company_name],
        )
        .expect("insert customer");
    guard.last_insert_rowid()
}

pub fn seed_end_user(conn: &Arc<Mutex<Connection>>, name: &str) -> i64 {
    let guard = conn.lock().expect("lock");
    guard
        .execute("INSERT INTO end_user (name) VALUES (?1)", params![name])
        .expect("insert end_user");
    guard.last_insert_rowid()
}

pub fn seed_warehouse(conn: &Arc<Mutex<Connection>>, name: &str) -> i64 {
    let guard = conn.lock().expect("lock");
    guard
        .execute("INSERT INTO warehouse (name) VALUES (?1)", params![name])
        .expect("insert warehouse");
    guard.last_insert_rowid()
}

pub fn seed_product(
    conn: &Arc<Mutex<Connection>>,
    factory_id: Option<i64>,
    name: &str,
    factory_part_number: Option<&str>,
) -> i64 {
    let guard = conn.lock().expect("lock");
    guard
        .execute(
            "INSERT INTO product (name, factory_id, factory_part_number) VALUES (?1, ?2, ?3)",
            params![name, factory_id, factory_part_number],
        )
        .expect("insert product");
    guard.last_insert_rowid()
}

pub fn seed_order(
    conn: &Arc<Mutex<Connection>>,
    order_number: &str,
    factory_id: i64,
    customer_id: i64,
) -> i64 {
    let guard = conn.lock().expect("lock");
    guard
        .execute(
            "INSERT INTO sales_order (order_number, factory_id, sold_to_customer_id) VALUES (?1, ?2, ?3)",
            params![order_number, factory_id, customer_id],
        )
        .expect("insert sales_order");
    guard.last_insert_rowid()
}

#[allow(clippy::too_many_arguments)]
pub fn seed_order_detail(
    conn: &Arc<Mutex<Connection>>,
    order_id: i64,
    item_number: i64,
    product_id: Option<i64>,
    quantity: &str,
    unit_price: &str,
    shipping_balance: &str,
    status: &str,
) -> i64 {
    let guard = conn.lock().expect("lock");
    guard
        .execute(
            r#"
            INSERT INTO order_detail (
                order_id, item_number, product_id, quantity, unit_price,
                shipping_balance, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![order_id, item_number, product_id, quantity, unit_price, shipping_balance, status],
        )
        .expect("insert order_detail");
    guard.last_insert_rowid()
}

pub fn seed_invoice(
    conn: &Arc<Mutex<Connection>>,
    invoice_number: &str,
    factory_id: i64,
    customer_id: i64,
    amount: &str,
) -> i64 {
    let guard = conn.lock().expect("lock");
    guard
        .execute(
            r#"
            INSERT INTO invoice (invoice_number, factory_id, sold_to_customer_id, invoice_amount)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![invoice_number, factory_id, customer_id, amount],
        )
        .expect("insert invoice");
    guard.last_insert_rowid()
}

// ==========================================
// 待处理文档种子
// ==========================================

pub fn seed_pending_document(
    conn: &Arc<Mutex<Connection>>,
    file_id: i64,
    entity_type: Option<&str>,
    extracted_data: &serde_json::Value,
) -> i64 {
    let guard = conn.lock().expect("lock");
    guard
        .execute(
            r#"
            INSERT INTO pending_document (file_id, entity_type, extracted_data_json)
            VALUES (?1, ?2, ?3)
            "#,
            params![
                file_id,
                entity_type,
                serde_json::to_string(extracted_data).expect("serialize extracted")
            ],
        )
        .expect("insert pending_document");
    guard.last_insert_rowid()
}

#[allow(clippy::too_many_arguments)]
pub fn seed_pending_entity(
    conn: &Arc<Mutex<Connection>>,
    document_id: i64,
    entity_type: &str,
    confirmation_status: &str,
    best_match_id: Option<i64>,
    dto_ids: &[&str],
    flow_index_detail: Option<i64>,
    extracted_data: Option<&serde_json::Value>,
) -> i64 {
    let guard = conn.lock().expect("lock");
    guard
        .execute(
            r#"
            INSERT INTO pending_entity (
                pending_document_id, entity_type, confirmation_status, best_match_id,
                dto_ids, flow_index_detail, extracted_data
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                document_id,
                entity_type,
                confirmation_status,
                best_match_id,
                serde_json::to_string(dto_ids).expect("serialize dto_ids"),
                flow_index_detail,
                extracted_data.map(|v| serde_json::to_string(v).expect("serialize extracted_data")),
            ],
        )
        .expect("insert pending_entity");
    guard.last_insert_rowid()
}

// ==========================================
// 查询辅助
// ==========================================

pub fn count_rows(conn: &Arc<Mutex<Connection>>, table: &str) -> i64 {
    let guard = conn.lock().expect("lock");
    guard
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })
        .expect("count rows")
}

pub fn workflow_status(conn: &Arc<Mutex<Connection>>, document_id: i64) -> String {
    let guard = conn.lock().expect("lock");
    guard
        .query_row(
            "SELECT workflow_status FROM pending_document WHERE id = ?1",
            params![document_id],
            |row| row.get(0),
        )
        .expect("query workflow_status")
}

pub fn query_text(conn: &Arc<Mutex<Connection>>, sql: &str) -> String {
    let guard = conn.lock().expect("lock");
    guard
        .query_row(sql, [], |row| row.get(0))
        .expect("query text")
}

pub fn query_i64(conn: &Arc<Mutex<Connection>>, sql: &str) -> i64 {
    let guard = conn.lock().expect("lock");
    guard
        .query_row(sql, [], |row| row.get(0))
        .expect("query i64")
}
