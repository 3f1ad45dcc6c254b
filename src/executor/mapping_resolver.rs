// ==========================================
// 销售佣金 CRM - 实体映射解析器
// ==========================================
// 职责: 将 PendingEntity 决策折叠为 {dto_id → EntityMapping}
// 红线: 永不失败; 数据不一致的决策记日志后丢弃
// ==========================================

use crate::domain::mapping::EntityMapping;
use crate::domain::pending::PendingEntity;
use crate::domain::types::{ConfirmationStatus, PendingEntityType};
use std::collections::HashMap;
use tracing::{debug, warn};

/// 将全部 PendingEntity 折叠为逐 DTO 的映射表
///
/// # 折叠语义
/// - 标量字段: first_non_empty（先到先得）
/// - map/set: 并集
pub fn resolve_entity_mappings(entities: &[PendingEntity]) -> HashMap<String, EntityMapping> {
    let mut mappings: HashMap<String, EntityMapping> = HashMap::new();

    for entity in entities {
        let Some(contribution) = contribution_of(entity) else {
            continue;
        };

        for dto_id in &entity.dto_ids {
            mappings
                .entry(dto_id.clone())
                .or_default()
                .merge_from(&contribution);
        }
    }

    debug!(
        entity_count = entities.len(),
        dto_count = mappings.len(),
        "实体映射折叠完成"
    );
    mappings
}

/// 单条决策对映射的贡献; None 表示该决策不参与折叠
fn contribution_of(entity: &PendingEntity) -> Option<EntityMapping> {
    let mut m = EntityMapping::default();

    match entity.confirmation_status {
        ConfirmationStatus::Confirmed
        | ConfirmationStatus::AutoMatched
        | ConfirmationStatus::CreatedNew => {
            let Some(id) = entity.best_match_id else {
                // 决策声明已解析但缺少 id, 属数据质量问题
                warn!(
                    pending_entity_id = entity.id,
                    entity_type = %entity.entity_type,
                    status = %entity.confirmation_status,
                    "已确认的决策缺少 best_match_id, 丢弃"
                );
                return None;
            };

            match entity.entity_type {
                PendingEntityType::Factories => m.factory_id = Some(id),
                PendingEntityType::Customers => m.sold_to_customer_id = Some(id),
                PendingEntityType::BillToCustomers => m.bill_to_customer_id = Some(id),
                PendingEntityType::Products | PendingEntityType::EndUsers => {
                    // 行级映射严格要求行索引
                    let Some(idx) = entity.flow_index_detail else {
                        warn!(
                            pending_entity_id = entity.id,
                            entity_type = %entity.entity_type,
                            "行级决策缺少 flow_index_detail, 丢弃"
                        );
                        return None;
                    };
                    match entity.entity_type {
                        PendingEntityType::Products => {
                            m.products.insert(idx, id);
                        }
                        _ => {
                            m.end_users.insert(idx, id);
                        }
                    }
                }
                PendingEntityType::Orders => {
                    m.orders.insert(entity.flow_index_detail.unwrap_or(0), id);
                }
                PendingEntityType::Invoices => {
                    m.invoices.insert(entity.flow_index_detail.unwrap_or(0), id);
                }
                PendingEntityType::Credits => {
                    m.credits.insert(entity.flow_index_detail.unwrap_or(0), id);
                }
                PendingEntityType::Adjustments => {
                    m.adjustments
                        .insert(entity.flow_index_detail.unwrap_or(0), id);
                }
            }
        }

        ConfirmationStatus::Skipped => match entity.entity_type {
            PendingEntityType::Products => {
                let Some(idx) = entity.flow_index_detail else {
                    warn!(
                        pending_entity_id = entity.id,
                        "产品跳过决策缺少 flow_index_detail, 丢弃"
                    );
                    return None;
                };
                m.skipped_product_indices.insert(idx);
            }
            PendingEntityType::Orders => {
                m.skipped_order_indices
                    .insert(entity.flow_index_detail.unwrap_or(0));
            }
            PendingEntityType::Invoices => {
                m.skipped_invoice_indices
                    .insert(entity.flow_index_detail.unwrap_or(0));
            }
            _ => return None,
        },

        // SET_FOR_CREATION 由创建波次消费, 不参与映射折叠
        ConfirmationStatus::SetForCreation => return None,
    }

    Some(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn pe(
        id: i64,
        entity_type: PendingEntityType,
        status: ConfirmationStatus,
        best_match_id: Option<i64>,
        dto_ids: &[&str],
        flow_index_detail: Option<usize>,
    ) -> PendingEntity {
        PendingEntity {
            id,
            pending_document_id: 1,
            entity_type,
            confirmation_status: status,
            best_match_id,
            dto_ids: dto_ids.iter().map(|s| s.to_string()).collect(),
            flow_index_detail,
            extracted_data: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_scalar_and_indexed_fields() {
        let entities = vec![
            pe(
                1,
                PendingEntityType::Factories,
                ConfirmationStatus::Confirmed,
                Some(11),
                &["U1"],
                None,
            ),
            pe(
                2,
                PendingEntityType::Customers,
                ConfirmationStatus::AutoMatched,
                Some(22),
                &["U1"],
                None,
            ),
            pe(
                3,
                PendingEntityType::Products,
                ConfirmationStatus::Confirmed,
                Some(33),
                &["U1"],
                Some(0),
            ),
            pe(
                4,
                PendingEntityType::EndUsers,
                ConfirmationStatus::CreatedNew,
                Some(44),
                &["U1"],
                Some(0),
            ),
        ];
        let mappings = resolve_entity_mappings(&entities);
        let m = mappings.get("U1").expect("U1 mapped");
        assert_eq!(m.factory_id, Some(11));
        assert_eq!(m.sold_to_customer_id, Some(22));
        assert_eq!(m.product_id_for(0), Some(33));
        assert_eq!(m.end_user_id_for(0), Some(44));
    }

    #[test]
    fn test_confirmed_without_id_is_noop() {
        let entities = vec![pe(
            1,
            PendingEntityType::Factories,
            ConfirmationStatus::Confirmed,
            None,
            &["U1"],
            None,
        )];
        let mappings = resolve_entity_mappings(&entities);
        assert!(mappings.is_empty());
    }

    #[test]
    fn test_skip_sets() {
        let entities = vec![
            pe(
                1,
                PendingEntityType::Products,
                ConfirmationStatus::Skipped,
                None,
                &["U1"],
                Some(1),
            ),
            pe(
                2,
                PendingEntityType::Orders,
                ConfirmationStatus::Skipped,
                None,
                &["U1"],
                None,
            ),
        ];
        let mappings = resolve_entity_mappings(&entities);
        let m = mappings.get("U1").expect("U1 mapped");
        assert!(m.skipped_product_indices.contains(&1));
        // 缺少行索引的订单跳过落到索引 0
        assert!(m.skipped_order_indices.contains(&0));
        assert!(m.is_user_skipped());
    }

    #[test]
    fn test_multi_decision_merge_per_dto() {
        let entities = vec![
            pe(
                1,
                PendingEntityType::Factories,
                ConfirmationStatus::Confirmed,
                Some(11),
                &["U1", "U2"],
                None,
            ),
            pe(
                2,
                PendingEntityType::Factories,
                ConfirmationStatus::Confirmed,
                Some(99),
                &["U2"],
                None,
            ),
        ];
        let mappings = resolve_entity_mappings(&entities);
        // U2 先收到 11, 后到的 99 不覆盖
        assert_eq!(mappings.get("U1").unwrap().factory_id, Some(11));
        assert_eq!(mappings.get("U2").unwrap().factory_id, Some(11));
    }

    #[test]
    fn test_set_for_creation_ignored() {
        let entities = vec![pe(
            1,
            PendingEntityType::Orders,
            ConfirmationStatus::SetForCreation,
            None,
            &["U1"],
            None,
        )];
        assert!(resolve_entity_mappings(&entities).is_empty());
    }
}
