// ==========================================
// 销售佣金 CRM - 转换器共享缺省规则
// ==========================================
// 缺省规则全集:
// - 缺号: "<PREFIX>-<UTC yyyymmddhhmmss>" 时间戳兜底
// - 费率: 行值 ?? 厂商默认值
// - 数量缺省 1, 单价缺省 0
// - 临时品名: fpn ?? cpn ?? 描述前 100 字符
// ==========================================

use crate::domain::catalog::Factory;
use crate::domain::order::OrderDetail;
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::error::RepositoryResult;
use crate::repository::order_repo::OrderRepository;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;

// ===== 编号前缀 =====
pub const PREFIX_CHECK: &str = "CHK";
pub const PREFIX_ADJUSTMENT: &str = "ADJ";
pub const PREFIX_CREDIT: &str = "CRD";
pub const PREFIX_DELIVERY: &str = "DEL";
pub const PREFIX_ACK: &str = "ACK";
pub const PREFIX_QUOTE: &str = "QTE";
pub const PREFIX_STATEMENT: &str = "S";
pub const PREFIX_AUTO: &str = "AUTO";

/// 时间戳兜底编号
pub fn timestamp_number(prefix: &str) -> String {
    format!("{}-{}", prefix, Utc::now().format("%Y%m%d%H%M%S"))
}

/// 编号选取: 非空取原值, 否则时间戳兜底
pub fn number_or_timestamp(value: Option<&str>, prefix: &str) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v.to_string(),
        None => timestamp_number(prefix),
    }
}

/// 费率回退: 行值 ?? 厂商默认值
pub fn rate_or_default(detail_rate: Option<Decimal>, factory_default: Option<Decimal>) -> Option<Decimal> {
    detail_rate.or(factory_default)
}

/// 数量缺省 1
pub fn quantity_or_default(quantity: Option<Decimal>) -> Decimal {
    quantity.unwrap_or(Decimal::ONE)
}

/// 单价缺省 0
pub fn price_or_default(unit_price: Option<Decimal>) -> Decimal {
    unit_price.unwrap_or(Decimal::ZERO)
}

/// 无产品映射时的临时品名: fpn ?? cpn ?? 描述前 100 字符
pub fn adhoc_product_name(
    factory_part_number: Option<&str>,
    customer_part_number: Option<&str>,
    description: Option<&str>,
) -> Option<String> {
    fn non_empty(s: Option<&str>) -> Option<&str> {
        s.map(str::trim).filter(|v| !v.is_empty())
    }

    non_empty(factory_part_number)
        .map(str::to_string)
        .or_else(|| non_empty(customer_part_number).map(str::to_string))
        .or_else(|| non_empty(description).map(|d| d.chars().take(100).collect()))
}

// ==========================================
// FactoryDefaultsCache - 厂商默认费率缓存
// ==========================================
// 生命周期: 单次执行内（转换器实例私有）
pub struct FactoryDefaultsCache {
    repo: CatalogRepository,
    cache: HashMap<i64, Option<Factory>>,
}

impl FactoryDefaultsCache {
    pub fn new(repo: CatalogRepository) -> Self {
        Self {
            repo,
            cache: HashMap::new(),
        }
    }

    pub fn get(&mut self, factory_id: i64) -> RepositoryResult<Option<&Factory>> {
        if !self.cache.contains_key(&factory_id) {
            let factory = self.repo.find_factory(factory_id)?;
            self.cache.insert(factory_id, factory);
        }
        Ok(self.cache.get(&factory_id).and_then(|f| f.as_ref()))
    }
}

// ==========================================
// OrderLookupCache - 订单缓存（模糊行匹配用）
// ==========================================
// 缓存项: (订单行列表, 逐行产品特征 (fpn, 描述))
pub struct OrderLookupCache {
    repo: OrderRepository,
    cache: HashMap<i64, Option<CachedOrder>>,
}

pub struct CachedOrder {
    pub details: Vec<OrderDetail>,
    pub part_features: Vec<(Option<String>, Option<String>)>,
}

impl OrderLookupCache {
    pub fn new(repo: OrderRepository) -> Self {
        Self {
            repo,
            cache: HashMap::new(),
        }
    }

    pub fn get(&mut self, order_id: i64) -> RepositoryResult<Option<&CachedOrder>> {
        if !self.cache.contains_key(&order_id) {
            let loaded = match self.repo.find_with_details(order_id)? {
                Some(order) => {
                    let part_features = self.repo.detail_part_features(order_id)?;
                    Some(CachedOrder {
                        details: order.details,
                        part_features,
                    })
                }
                None => None,
            };
            self.cache.insert(order_id, loaded);
        }
        Ok(self.cache.get(&order_id).and_then(|o| o.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_number_or_timestamp() {
        assert_eq!(number_or_timestamp(Some(" CHK-9 "), PREFIX_CHECK), "CHK-9");
        let generated = number_or_timestamp(Some("  "), PREFIX_CHECK);
        assert!(generated.starts_with("CHK-"));
        assert_eq!(generated.len(), "CHK-".len() + 14);
    }

    #[test]
    fn test_rate_fallback() {
        assert_eq!(rate_or_default(Some(dec!(5)), Some(dec!(3))), Some(dec!(5)));
        assert_eq!(rate_or_default(None, Some(dec!(3))), Some(dec!(3)));
        assert_eq!(rate_or_default(None, None), None);
    }

    #[test]
    fn test_adhoc_name_chain() {
        assert_eq!(
            adhoc_product_name(Some("FPN-1"), Some("CPN-1"), Some("desc")),
            Some("FPN-1".to_string())
        );
        assert_eq!(
            adhoc_product_name(Some("  "), Some("CPN-1"), None),
            Some("CPN-1".to_string())
        );
        let long_desc = "x".repeat(150);
        assert_eq!(
            adhoc_product_name(None, None, Some(&long_desc)),
            Some("x".repeat(100))
        );
        assert_eq!(adhoc_product_name(None, None, None), None);
    }

    #[test]
    fn test_quantity_price_defaults() {
        assert_eq!(quantity_or_default(None), dec!(1));
        assert_eq!(price_or_default(None), dec!(0));
        assert_eq!(quantity_or_default(Some(dec!(7))), dec!(7));
    }
}
