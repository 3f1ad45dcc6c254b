// ==========================================
// 销售佣金 CRM - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 提供内嵌 schema 初始化（库与测试共用一份 DDL）
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化数据库 schema（幂等, CREATE TABLE IF NOT EXISTS）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

// 内嵌 schema
// 金额/费率统一以 TEXT 存储（rust_decimal 往返, 避免浮点误差）
const SCHEMA_SQL: &str = r#"
-- ===== 配置 =====
CREATE TABLE IF NOT EXISTS config_kv (
    key         TEXT PRIMARY KEY,
    value       TEXT NOT NULL,
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ===== 编号序列 =====
CREATE TABLE IF NOT EXISTS number_sequence (
    entity_type TEXT PRIMARY KEY,
    next_value  INTEGER NOT NULL DEFAULT 1
);

-- ===== 主数据 =====
CREATE TABLE IF NOT EXISTS factory (
    id                               INTEGER PRIMARY KEY AUTOINCREMENT,
    name                             TEXT NOT NULL,
    default_commission_rate          TEXT,
    default_commission_discount_rate TEXT,
    default_product_discount_rate    TEXT,
    created_at                       TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS customer (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    company_name TEXT NOT NULL COLLATE NOCASE UNIQUE,
    contact_name TEXT,
    email        TEXT,
    phone        TEXT,
    address      TEXT,
    city         TEXT,
    state        TEXT,
    zip_code     TEXT,
    created_at   TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS end_user (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS app_user (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS uom (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS warehouse (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL COLLATE NOCASE UNIQUE
);

CREATE TABLE IF NOT EXISTS product (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    name                TEXT NOT NULL,
    factory_id          INTEGER REFERENCES factory(id),
    factory_part_number TEXT,
    description         TEXT,
    uom_id              INTEGER REFERENCES uom(id),
    unit_price          TEXT,
    commission_rate     TEXT,
    created_at          TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ===== 订单 =====
CREATE TABLE IF NOT EXISTS sales_order (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    order_number        TEXT NOT NULL,
    factory_id          INTEGER NOT NULL REFERENCES factory(id),
    sold_to_customer_id INTEGER NOT NULL REFERENCES customer(id),
    bill_to_customer_id INTEGER REFERENCES customer(id),
    order_date          TEXT,
    created_at          TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(order_number, factory_id)
);

CREATE TABLE IF NOT EXISTS order_detail (
    id                       INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id                 INTEGER NOT NULL REFERENCES sales_order(id) ON DELETE CASCADE,
    item_number              INTEGER NOT NULL,
    product_id               INTEGER REFERENCES product(id),
    adhoc_product_name       TEXT,
    end_user_id              INTEGER REFERENCES end_user(id),
    quantity                 TEXT NOT NULL,
    unit_price               TEXT NOT NULL,
    commission_rate          TEXT,
    commission_discount_rate TEXT,
    discount_rate            TEXT,
    shipping_balance         TEXT NOT NULL,
    status                   TEXT NOT NULL DEFAULT 'OPEN'
);

-- ===== 发票 =====
CREATE TABLE IF NOT EXISTS invoice (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_number      TEXT NOT NULL,
    factory_id          INTEGER NOT NULL REFERENCES factory(id),
    sold_to_customer_id INTEGER NOT NULL REFERENCES customer(id),
    invoice_date        TEXT,
    invoice_amount      TEXT NOT NULL,
    created_at          TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(invoice_number, factory_id)
);

CREATE TABLE IF NOT EXISTS invoice_detail (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_id         INTEGER NOT NULL REFERENCES invoice(id) ON DELETE CASCADE,
    item_number        INTEGER NOT NULL,
    order_detail_id    INTEGER REFERENCES order_detail(id),
    product_id         INTEGER REFERENCES product(id),
    adhoc_product_name TEXT,
    quantity           TEXT NOT NULL,
    unit_price         TEXT NOT NULL,
    commission_rate    TEXT
);

-- ===== 贷项 =====
CREATE TABLE IF NOT EXISTS credit (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    credit_number TEXT NOT NULL,
    factory_id    INTEGER NOT NULL REFERENCES factory(id),
    order_id      INTEGER NOT NULL REFERENCES sales_order(id),
    credit_date   TEXT,
    credit_amount TEXT NOT NULL,
    created_at    TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(credit_number, factory_id)
);

CREATE TABLE IF NOT EXISTS credit_detail (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    credit_id       INTEGER NOT NULL REFERENCES credit(id) ON DELETE CASCADE,
    order_detail_id INTEGER REFERENCES order_detail(id),
    quantity        TEXT NOT NULL,
    unit_price      TEXT NOT NULL,
    commission_rate TEXT
);

-- ===== 调整 =====
CREATE TABLE IF NOT EXISTS adjustment (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    adjustment_number TEXT NOT NULL,
    factory_id        INTEGER NOT NULL REFERENCES factory(id),
    customer_id       INTEGER REFERENCES customer(id),
    amount            TEXT NOT NULL,
    reason            TEXT,
    adjustment_date   TEXT,
    allocation_method TEXT NOT NULL,
    created_at        TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(adjustment_number, factory_id)
);

CREATE TABLE IF NOT EXISTS adjustment_split (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    adjustment_id INTEGER NOT NULL REFERENCES adjustment(id) ON DELETE CASCADE,
    user_id       INTEGER NOT NULL REFERENCES app_user(id),
    percentage    TEXT NOT NULL
);

-- ===== 佣金结算单 =====
CREATE TABLE IF NOT EXISTS commission_statement (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    statement_number TEXT NOT NULL UNIQUE,
    factory_id       INTEGER NOT NULL REFERENCES factory(id),
    statement_date   TEXT,
    created_at       TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS statement_detail (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    statement_id      INTEGER NOT NULL REFERENCES commission_statement(id) ON DELETE CASCADE,
    invoice_id        INTEGER REFERENCES invoice(id),
    order_detail_id   INTEGER REFERENCES order_detail(id),
    quantity          TEXT NOT NULL,
    unit_price        TEXT NOT NULL,
    commission_rate   TEXT,
    commission_amount TEXT
);

-- ===== 支票 =====
CREATE TABLE IF NOT EXISTS payment_check (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    check_number TEXT NOT NULL,
    factory_id   INTEGER NOT NULL REFERENCES factory(id),
    check_date   TEXT,
    check_amount TEXT NOT NULL,
    created_at   TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(check_number, factory_id)
);

CREATE TABLE IF NOT EXISTS check_detail (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    check_id    INTEGER NOT NULL REFERENCES payment_check(id) ON DELETE CASCADE,
    invoice_id  INTEGER NOT NULL REFERENCES invoice(id),
    paid_amount TEXT NOT NULL
);

-- ===== 订单确认 =====
CREATE TABLE IF NOT EXISTS order_acknowledgement (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    ack_number      TEXT NOT NULL,
    order_id        INTEGER NOT NULL REFERENCES sales_order(id),
    order_detail_id INTEGER REFERENCES order_detail(id),
    ack_date        TEXT,
    ship_date       TEXT,
    created_at      TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(order_detail_id, ack_number)
);

-- ===== 发货单 =====
CREATE TABLE IF NOT EXISTS delivery (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    delivery_number TEXT NOT NULL,
    vendor_id       INTEGER NOT NULL REFERENCES factory(id),
    warehouse_id    INTEGER NOT NULL REFERENCES warehouse(id),
    delivery_date   TEXT,
    created_at      TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(delivery_number, vendor_id)
);

CREATE TABLE IF NOT EXISTS delivery_item (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    delivery_id INTEGER NOT NULL REFERENCES delivery(id) ON DELETE CASCADE,
    product_id  INTEGER NOT NULL REFERENCES product(id),
    quantity    TEXT NOT NULL
);

-- ===== 报价 =====
CREATE TABLE IF NOT EXISTS quote (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    quote_number        TEXT NOT NULL UNIQUE,
    sold_to_customer_id INTEGER NOT NULL REFERENCES customer(id),
    end_user_id         INTEGER NOT NULL REFERENCES end_user(id),
    quote_date          TEXT,
    created_at          TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS quote_detail (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    quote_id           INTEGER NOT NULL REFERENCES quote(id) ON DELETE CASCADE,
    item_number        INTEGER NOT NULL,
    product_id         INTEGER REFERENCES product(id),
    adhoc_product_name TEXT,
    quantity           TEXT NOT NULL,
    unit_price         TEXT NOT NULL
);

-- ===== 待处理文档 =====
CREATE TABLE IF NOT EXISTS pending_document (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id             INTEGER NOT NULL,
    entity_type         TEXT,
    extracted_data_json TEXT NOT NULL DEFAULT '[]',
    workflow_status     TEXT NOT NULL DEFAULT 'IN_PROGRESS',
    created_at          TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at          TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS pending_entity (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    pending_document_id INTEGER NOT NULL REFERENCES pending_document(id) ON DELETE CASCADE,
    entity_type         TEXT NOT NULL,
    confirmation_status TEXT NOT NULL,
    best_match_id       INTEGER,
    dto_ids             TEXT NOT NULL DEFAULT '[]',
    flow_index_detail   INTEGER,
    extracted_data      TEXT,
    created_at          TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ===== 处理记录 =====
CREATE TABLE IF NOT EXISTS processing_record (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    pending_document_id INTEGER NOT NULL REFERENCES pending_document(id),
    entity_id           INTEGER,
    status              TEXT NOT NULL,
    dto_json            TEXT NOT NULL,
    error_message       TEXT,
    created_at          TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ===== 文件链接 =====
CREATE TABLE IF NOT EXISTS entity_link (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    source_type TEXT NOT NULL,
    source_id   INTEGER NOT NULL,
    target_type TEXT NOT NULL,
    target_id   INTEGER NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(source_type, source_id, target_type, target_id)
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        configure_sqlite_connection(&conn).expect("configure");
        init_schema(&conn).expect("first init");
        init_schema(&conn).expect("second init");
    }
}
