// ==========================================
// 销售佣金 CRM - 发票领域模型
// ==========================================

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// Invoice - 发票
// ==========================================
// 自然键: (invoice_number, factory_id), 由存储唯一约束保障
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub factory_id: i64,
    pub sold_to_customer_id: i64,
    pub invoice_date: Option<NaiveDate>,
    pub invoice_amount: Decimal,
    pub details: Vec<InvoiceDetail>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceDetail {
    pub id: i64,
    pub invoice_id: i64,
    pub item_number: i64,
    pub order_detail_id: Option<i64>, // 模糊匹配回挂的订单行
    pub product_id: Option<i64>,
    pub adhoc_product_name: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub commission_rate: Option<Decimal>,
}

// ==========================================
// 创建输入
// ==========================================
#[derive(Debug, Clone)]
pub struct InvoiceInput {
    pub invoice_number: String,
    pub factory_id: i64,
    pub sold_to_customer_id: i64,
    pub invoice_date: Option<NaiveDate>,
    pub invoice_amount: Decimal,
    pub details: Vec<InvoiceDetailInput>,
}

#[derive(Debug, Clone)]
pub struct InvoiceDetailInput {
    pub item_number: i64,
    pub order_detail_id: Option<i64>,
    pub product_id: Option<i64>,
    pub adhoc_product_name: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub commission_rate: Option<Decimal>,
}
