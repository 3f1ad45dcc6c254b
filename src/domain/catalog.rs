// ==========================================
// 销售佣金 CRM - 主数据领域模型
// ==========================================
// 聚合: 厂商 / 客户 / 最终用户 / 产品 / 计量单位 / 仓库 / 用户
// ==========================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// Factory - 厂商
// ==========================================
// 默认费率是转换器缺省回退的来源
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Factory {
    pub id: i64,
    pub name: String,
    pub default_commission_rate: Option<Decimal>,
    pub default_commission_discount_rate: Option<Decimal>,
    pub default_product_discount_rate: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct FactoryInput {
    pub name: String,
    pub default_commission_rate: Option<Decimal>,
    pub default_commission_discount_rate: Option<Decimal>,
    pub default_product_discount_rate: Option<Decimal>,
}

// ==========================================
// Customer - 客户
// ==========================================
// company_name 大小写不敏感唯一, 批量创建按此去重
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub company_name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CustomerInput {
    pub company_name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

// ==========================================
// Product - 产品
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub factory_id: Option<i64>,
    pub factory_part_number: Option<String>,
    pub description: Option<String>,
    pub uom_id: Option<i64>,
    pub unit_price: Option<Decimal>,
    pub commission_rate: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub factory_id: Option<i64>,
    pub factory_part_number: Option<String>,
    pub description: Option<String>,
    pub uom_id: Option<i64>,
    pub unit_price: Option<Decimal>,
    pub commission_rate: Option<Decimal>,
}
