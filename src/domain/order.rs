// ==========================================
// 销售佣金 CRM - 订单领域模型
// ==========================================
// 用途: 订单转换器的创建输入与仓储读取模型
// ==========================================

use crate::domain::types::OrderDetailStatus;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// Order - 订单（含已加载明细）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub factory_id: i64,
    pub sold_to_customer_id: i64,
    pub bill_to_customer_id: Option<i64>,
    pub order_date: Option<NaiveDate>,
    pub details: Vec<OrderDetail>,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// OrderDetail - 订单行
// ==========================================
// shipping_balance: 未发货余量, 模糊行匹配的平手裁决依据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    pub id: i64,
    pub order_id: i64,
    pub item_number: i64,
    pub product_id: Option<i64>,
    pub adhoc_product_name: Option<String>, // 无产品映射时的临时品名
    pub end_user_id: Option<i64>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub commission_rate: Option<Decimal>,
    pub commission_discount_rate: Option<Decimal>,
    pub discount_rate: Option<Decimal>,
    pub shipping_balance: Decimal,
    pub status: OrderDetailStatus,
}

// ==========================================
// 创建输入
// ==========================================
#[derive(Debug, Clone)]
pub struct OrderInput {
    pub order_number: String,
    pub factory_id: i64,
    pub sold_to_customer_id: i64,
    pub bill_to_customer_id: Option<i64>,
    pub order_date: Option<NaiveDate>,
    pub details: Vec<OrderDetailInput>,
}

#[derive(Debug, Clone)]
pub struct OrderDetailInput {
    pub item_number: i64,
    pub product_id: Option<i64>,
    pub adhoc_product_name: Option<String>,
    pub end_user_id: Option<i64>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub commission_rate: Option<Decimal>,
    pub commission_discount_rate: Option<Decimal>,
    pub discount_rate: Option<Decimal>,
}
