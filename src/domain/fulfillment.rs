// ==========================================
// 销售佣金 CRM - 履约领域模型
// ==========================================
// 聚合: 订单确认 / 发货单 / 报价
// ==========================================

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// OrderAcknowledgement - 订单确认
// ==========================================
// 自然键: (order_detail_id, ack_number)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAcknowledgement {
    pub id: i64,
    pub ack_number: String,
    pub order_id: i64,
    pub order_detail_id: Option<i64>,
    pub ack_date: Option<NaiveDate>,
    pub ship_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct AcknowledgementInput {
    pub ack_number: String,
    pub order_id: i64,
    pub order_detail_id: Option<i64>,
    pub ack_date: Option<NaiveDate>,
    pub ship_date: Option<NaiveDate>,
}

// ==========================================
// Delivery - 发货单（含行项目）
// ==========================================
// 硬性要求: 供应商（厂商映射）与仓库; 每行必须有产品映射
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: i64,
    pub delivery_number: String,
    pub vendor_id: i64,
    pub warehouse_id: i64,
    pub delivery_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct DeliveryInput {
    pub delivery_number: String,
    pub vendor_id: i64,
    pub warehouse_id: i64,
    pub delivery_date: Option<NaiveDate>,
    pub items: Vec<DeliveryItemInput>,
}

#[derive(Debug, Clone)]
pub struct DeliveryItemInput {
    pub product_id: i64,
    pub quantity: Decimal,
}

// ==========================================
// Quote - 报价
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub id: i64,
    pub quote_number: String,
    pub sold_to_customer_id: i64,
    pub end_user_id: i64,
    pub quote_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct QuoteInput {
    pub quote_number: String,
    pub sold_to_customer_id: i64,
    pub end_user_id: i64,
    pub quote_date: Option<NaiveDate>,
    pub details: Vec<QuoteDetailInput>,
}

#[derive(Debug, Clone)]
pub struct QuoteDetailInput {
    pub item_number: i64,
    pub product_id: Option<i64>,
    pub adhoc_product_name: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}
