// ==========================================
// 销售佣金 CRM - 佣金结算领域模型
// ==========================================
// 聚合: 贷项 / 调整 / 佣金结算单 / 支票
// ==========================================

use crate::domain::types::AllocationMethod;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// Credit - 贷项
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credit {
    pub id: i64,
    pub credit_number: String,
    pub factory_id: i64,
    pub order_id: i64,
    pub credit_date: Option<NaiveDate>,
    pub credit_amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct CreditInput {
    pub credit_number: String,
    pub factory_id: i64,
    pub order_id: i64,
    pub credit_date: Option<NaiveDate>,
    pub credit_amount: Decimal,
    pub details: Vec<CreditDetailInput>,
}

#[derive(Debug, Clone)]
pub struct CreditDetailInput {
    pub order_detail_id: Option<i64>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub commission_rate: Option<Decimal>,
}

// ==========================================
// Adjustment - 佣金调整
// ==========================================
// 分摊: 有客户 → CUSTOMER; 否则 REP_SPLIT（操作用户 100%）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adjustment {
    pub id: i64,
    pub adjustment_number: String,
    pub factory_id: i64,
    pub customer_id: Option<i64>,
    pub amount: Decimal,
    pub reason: Option<String>,
    pub adjustment_date: Option<NaiveDate>,
    pub allocation_method: AllocationMethod,
}

#[derive(Debug, Clone)]
pub struct AdjustmentInput {
    pub adjustment_number: String,
    pub factory_id: i64,
    pub customer_id: Option<i64>,
    pub amount: Decimal,
    pub reason: Option<String>,
    pub adjustment_date: Option<NaiveDate>,
    pub allocation_method: AllocationMethod,
    /// REP_SPLIT 时的分成 (user_id, 百分比)
    pub splits: Vec<(i64, Decimal)>,
}

// ==========================================
// CommissionStatement - 佣金结算单
// ==========================================
// 自然键: statement_number（全局唯一）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionStatement {
    pub id: i64,
    pub statement_number: String,
    pub factory_id: i64,
    pub statement_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct StatementInput {
    pub statement_number: String,
    pub factory_id: i64,
    pub statement_date: Option<NaiveDate>,
    pub details: Vec<StatementDetailInput>,
}

#[derive(Debug, Clone)]
pub struct StatementDetailInput {
    pub invoice_id: Option<i64>,
    pub order_detail_id: Option<i64>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub commission_rate: Option<Decimal>,
    /// 行佣金额; None 时由下游模型按费率重算, 0 为有效值
    pub commission_amount: Option<Decimal>,
}

// ==========================================
// PaymentCheck - 支票
// ==========================================
// 自然键: (check_number, factory_id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCheck {
    pub id: i64,
    pub check_number: String,
    pub factory_id: i64,
    pub check_date: Option<NaiveDate>,
    pub check_amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct CheckInput {
    pub check_number: String,
    pub factory_id: i64,
    pub check_date: Option<NaiveDate>,
    pub check_amount: Decimal,
    pub details: Vec<CheckDetailInput>,
}

#[derive(Debug, Clone)]
pub struct CheckDetailInput {
    pub invoice_id: i64,
    pub paid_amount: Decimal,
}
