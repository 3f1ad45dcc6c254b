// ==========================================
// 销售佣金 CRM - DTO 分组器
// ==========================================
// 职责: 将共享自然键的订单/发票 DTO 片段合并为单份父 + 明细文档
// 键: 订单 (order_number, sold_to_customer.name); 发票 (invoice_number, factory.name)
//     均 trim + 小写; 两者皆缺时回退 internal_uuid
// ==========================================

use crate::domain::dto::{InvoiceDto, OrderDto};
use std::collections::HashMap;
use tracing::debug;

// ==========================================
// GroupedDto - 分组结果
// ==========================================
// source_uuids: 构成该组的原始片段 internal_uuid（保持遭遇顺序）
#[derive(Debug, Clone)]
pub struct GroupedDto<D> {
    pub dto: D,
    pub source_uuids: Vec<String>,
}

fn normalize(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

fn order_key(dto: &OrderDto) -> String {
    let number = normalize(&dto.order_number);
    let customer = dto.sold_to_customer.normalized_name();
    match (number, customer) {
        (None, None) => format!("uuid:{}", dto.internal_uuid),
        (n, c) => format!("{}|{}", n.unwrap_or_default(), c.unwrap_or_default()),
    }
}

fn invoice_key(dto: &InvoiceDto) -> String {
    let number = normalize(&dto.invoice_number);
    let factory = dto.factory.normalized_name();
    match (number, factory) {
        (None, None) => format!("uuid:{}", dto.internal_uuid),
        (n, f) => format!("{}|{}", n.unwrap_or_default(), f.unwrap_or_default()),
    }
}

/// 订单片段分组: 头字段取首个片段, 明细按遭遇顺序拼接
pub fn group_order_dtos(dtos: Vec<OrderDto>) -> Vec<GroupedDto<OrderDto>> {
    let mut groups: Vec<GroupedDto<OrderDto>> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for dto in dtos {
        let key = order_key(&dto);
        match index_by_key.get(&key) {
            Some(&idx) => {
                let group = &mut groups[idx];
                group.source_uuids.push(dto.internal_uuid.clone());
                group.dto.details.extend(dto.details);
            }
            None => {
                index_by_key.insert(key, groups.len());
                groups.push(GroupedDto {
                    source_uuids: vec![dto.internal_uuid.clone()],
                    dto,
                });
            }
        }
    }

    debug!(group_count = groups.len(), "订单 DTO 分组完成");
    groups
}

/// 发票片段分组: 头字段取首个片段, 明细拼接, invoice_amount 跨片段求和
pub fn group_invoice_dtos(dtos: Vec<InvoiceDto>) -> Vec<GroupedDto<InvoiceDto>> {
    let mut groups: Vec<GroupedDto<InvoiceDto>> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for dto in dtos {
        let key = invoice_key(&dto);
        match index_by_key.get(&key) {
            Some(&idx) => {
                let group = &mut groups[idx];
                group.source_uuids.push(dto.internal_uuid.clone());
                group.dto.invoice_amount = match (group.dto.invoice_amount, dto.invoice_amount) {
                    (Some(a), Some(b)) => Some(a + b),
                    (a, b) => a.or(b),
                };
                group.dto.details.extend(dto.details);
            }
            None => {
                index_by_key.insert(key, groups.len());
                groups.push(GroupedDto {
                    source_uuids: vec![dto.internal_uuid.clone()],
                    dto,
                });
            }
        }
    }

    debug!(group_count = groups.len(), "发票 DTO 分组完成");
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dto::{InvoiceDetailDto, PartyRef};
    use rust_decimal_macros::dec;

    fn invoice_dto(uuid: &str, number: &str, factory: &str, idx: usize) -> InvoiceDto {
        InvoiceDto {
            internal_uuid: uuid.to_string(),
            invoice_number: Some(number.to_string()),
            invoice_date: None,
            invoice_amount: Some(dec!(100)),
            factory: PartyRef {
                name: Some(factory.to_string()),
            },
            sold_to_customer: PartyRef::default(),
            details: vec![InvoiceDetailDto {
                flow_detail_index: idx,
                item_number: None,
                order_number: None,
                factory_part_number: None,
                customer_part_number: None,
                description: None,
                quantity_shipped: Some(dec!(1)),
                unit_price: Some(dec!(100)),
                commission_rate: None,
            }],
        }
    }

    #[test]
    fn test_invoice_fragments_merge_and_sum() {
        let groups = group_invoice_dtos(vec![
            invoice_dto("u1", "INV-7", "Cooper", 0),
            invoice_dto("u2", "INV-7", " cooper ", 1),
        ]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].dto.details.len(), 2);
        assert_eq!(groups[0].dto.invoice_amount, Some(dec!(200)));
        assert_eq!(groups[0].source_uuids, vec!["u1", "u2"]);
    }

    #[test]
    fn test_missing_key_falls_back_to_uuid() {
        let mut a = invoice_dto("u1", "x", "y", 0);
        a.invoice_number = None;
        a.factory = PartyRef::default();
        let mut b = a.clone();
        b.internal_uuid = "u2".to_string();

        let groups = group_invoice_dtos(vec![a, b]);
        // 键齐缺时按 uuid 各自成组
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_grouping_is_idempotent_in_shape() {
        let groups = group_invoice_dtos(vec![
            invoice_dto("u1", "INV-7", "Cooper", 0),
            invoice_dto("u2", "INV-7", "Cooper", 1),
        ]);
        let regrouped = group_invoice_dtos(groups.iter().map(|g| g.dto.clone()).collect());
        assert_eq!(regrouped.len(), 1);
        assert_eq!(regrouped[0].dto.details.len(), 2);
    }

    #[test]
    fn test_order_header_from_first_fragment() {
        let a = OrderDto {
            internal_uuid: "u1".to_string(),
            order_number: Some("PO-1".to_string()),
            order_date: None,
            sold_to_customer: PartyRef {
                name: Some("Acme".to_string()),
            },
            factory: PartyRef {
                name: Some("Cooper".to_string()),
            },
            details: vec![],
        };
        let mut b = a.clone();
        b.internal_uuid = "u2".to_string();
        b.factory = PartyRef {
            name: Some("Other".to_string()),
        };

        let groups = group_order_dtos(vec![a, b]);
        assert_eq!(groups.len(), 1);
        // 头字段来自首个片段
        assert_eq!(groups[0].dto.factory.name.as_deref(), Some("Cooper"));
    }
}
