// ==========================================
// 销售佣金 CRM - 提取 DTO 定义
// ==========================================
// 用途: extracted_data_json 反序列化的逐实体行结构
// 约定:
// - 每个 DTO 携带 internal_uuid（DTO 加载器在缺失时补齐）
// - details 行携带 flow_index / flow_detail_index（DTO 内 0 基行号）
// ==========================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// 公共引用片段
// ==========================================

/// 文档头部对厂商/客户等相对方的名称引用
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartyRef {
    pub name: Option<String>,
}

impl PartyRef {
    /// 规范化名称（trim + 小写）, 用于分组键
    pub fn normalized_name(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
    }
}

// ==========================================
// 订单 DTO
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDto {
    pub internal_uuid: String,
    pub order_number: Option<String>,
    pub order_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub sold_to_customer: PartyRef,
    #[serde(default)]
    pub factory: PartyRef,
    #[serde(default)]
    pub details: Vec<OrderDetailDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetailDto {
    pub flow_index: usize,
    pub item_number: Option<i64>,
    pub factory_part_number: Option<String>,
    pub customer_part_number: Option<String>,
    pub description: Option<String>,
    pub quantity_ordered: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub commission_rate: Option<Decimal>,
    pub commission_discount_rate: Option<Decimal>,
    pub discount_rate: Option<Decimal>,
}

// ==========================================
// 发票 DTO
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceDto {
    pub internal_uuid: String,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<chrono::NaiveDate>,
    pub invoice_amount: Option<Decimal>,
    #[serde(default)]
    pub factory: PartyRef,
    #[serde(default)]
    pub sold_to_customer: PartyRef,
    #[serde(default)]
    pub details: Vec<InvoiceDetailDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceDetailDto {
    pub flow_detail_index: usize,
    pub item_number: Option<i64>,
    pub order_number: Option<String>,
    pub factory_part_number: Option<String>,
    pub customer_part_number: Option<String>,
    pub description: Option<String>,
    pub quantity_shipped: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub commission_rate: Option<Decimal>,
}

// ==========================================
// 贷项 DTO
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditDto {
    pub internal_uuid: String,
    pub credit_number: Option<String>,
    pub credit_date: Option<chrono::NaiveDate>,
    pub credit_amount: Option<Decimal>,
    #[serde(default)]
    pub factory: PartyRef,
    #[serde(default)]
    pub details: Vec<CreditDetailDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditDetailDto {
    pub flow_detail_index: usize,
    pub item_number: Option<i64>,
    pub factory_part_number: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub commission_rate: Option<Decimal>,
}

// ==========================================
// 调整 DTO
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentDto {
    pub internal_uuid: String,
    pub adjustment_number: Option<String>,
    pub adjustment_date: Option<chrono::NaiveDate>,
    pub amount: Option<Decimal>,
    pub reason: Option<String>,
    #[serde(default)]
    pub factory: PartyRef,
}

// ==========================================
// 佣金结算单 DTO
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementDto {
    pub internal_uuid: String,
    pub statement_number: Option<String>,
    pub statement_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub factory: PartyRef,
    #[serde(default)]
    pub details: Vec<StatementDetailDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementDetailDto {
    pub flow_detail_index: usize,
    pub item_number: Option<i64>,
    pub invoice_number: Option<String>,
    pub order_number: Option<String>,
    pub factory_part_number: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub commission_rate: Option<Decimal>,
    /// 行佣金总额（优先）
    pub total_line_commission: Option<Decimal>,
    /// 已付佣金额（次选; 0 为有效透传值, 不得折算为 null）
    pub paid_commission_amount: Option<Decimal>,
}

impl StatementDetailDto {
    /// 结算单行佣金字段选取: total_line_commission ?? paid_commission_amount
    /// 两者都缺失时返回 None, 由下游模型按费率重新计算
    pub fn commission_amount(&self) -> Option<Decimal> {
        self.total_line_commission.or(self.paid_commission_amount)
    }
}

// ==========================================
// 支票 DTO
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckDto {
    pub internal_uuid: String,
    pub check_number: Option<String>,
    pub check_date: Option<chrono::NaiveDate>,
    pub check_amount: Option<Decimal>,
    #[serde(default)]
    pub factory: PartyRef,
    #[serde(default)]
    pub details: Vec<CheckDetailDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckDetailDto {
    pub flow_detail_index: usize,
    pub invoice_number: Option<String>,
    pub paid_amount: Option<Decimal>,
}

// ==========================================
// 订单确认 DTO
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcknowledgementDto {
    pub internal_uuid: String,
    pub ack_number: Option<String>,
    pub ack_date: Option<chrono::NaiveDate>,
    pub order_number: Option<String>,
    #[serde(default)]
    pub details: Vec<AcknowledgementDetailDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcknowledgementDetailDto {
    pub flow_index: usize,
    pub item_number: Option<i64>,
    pub factory_part_number: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub ship_date: Option<chrono::NaiveDate>,
}

// ==========================================
// 发货单 DTO
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryDto {
    pub internal_uuid: String,
    pub delivery_number: Option<String>,
    pub delivery_date: Option<chrono::NaiveDate>,
    pub warehouse_name: Option<String>,
    /// 是否影响库存（影响库存的发货必须有仓库）
    #[serde(default)]
    pub affects_inventory: bool,
    #[serde(default)]
    pub details: Vec<DeliveryDetailDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryDetailDto {
    pub flow_index: usize,
    pub part_number: Option<String>,
    pub quantity: Option<Decimal>,
}

// ==========================================
// 报价 DTO
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteDto {
    pub internal_uuid: String,
    pub quote_number: Option<String>,
    pub quote_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub sold_to_customer: PartyRef,
    #[serde(default)]
    pub details: Vec<QuoteDetailDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteDetailDto {
    pub flow_index: usize,
    pub factory_part_number: Option<String>,
    pub customer_part_number: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
}

// ==========================================
// 产品 DTO
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDto {
    pub internal_uuid: String,
    pub name: Option<String>,
    pub factory_part_number: Option<String>,
    pub customer_part_number: Option<String>,
    pub description: Option<String>,
    pub uom: Option<String>, // 计量单位名称（按大写标题解析/新建）
    pub unit_price: Option<Decimal>,
    pub commission_rate: Option<Decimal>,
}

// ==========================================
// 客户 DTO
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDto {
    pub internal_uuid: String,
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

// ==========================================
// 厂商 DTO
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactoryDto {
    pub internal_uuid: String,
    pub name: Option<String>,
    pub default_commission_rate: Option<Decimal>,
    pub default_commission_discount_rate: Option<Decimal>,
    pub default_product_discount_rate: Option<Decimal>,
}
