// ==========================================
// 销售佣金 CRM - 订单行模糊匹配引擎
// ==========================================
// 职责: 将进线（发票/贷项/结算单行）回挂到已有订单行
// 规则: 优先级子句表, 首个命中的子句生效;
//       同一子句多候选时取 shipping_balance 最大者
// ==========================================

use crate::domain::order::OrderDetail;
use crate::domain::types::OrderDetailStatus;
use crate::engine::fuzzy;
use rust_decimal::Decimal;
use tracing::debug;

// ==========================================
// IncomingLine - 进线行
// ==========================================
#[derive(Debug, Clone)]
pub struct IncomingLine {
    pub unit_price: Decimal,
    pub part_number: Option<String>,
    pub quantity: Decimal,
    pub item_number: Option<i64>,
}

// 每个候选行预计算的特征
struct Candidate {
    id: i64,
    shipping_balance: Decimal,
    price_match: bool,
    fpn_match: bool,
    cpn_match: bool,
    item_match: bool,
    open_status: bool,
    quantity_valid: bool,
}

impl Candidate {
    fn either_match(&self) -> bool {
        self.fpn_match || self.cpn_match
    }
}

// ==========================================
// OrderDetailMatcher - 匹配引擎
// ==========================================
// 阈值与价差容忍为策略旋钮, 从配置注入
pub struct OrderDetailMatcher {
    fuzzy_threshold: u8,
    price_tolerance: Decimal,
}

impl OrderDetailMatcher {
    pub fn new(fuzzy_threshold: u8, price_tolerance: Decimal) -> Self {
        Self {
            fuzzy_threshold,
            price_tolerance,
        }
    }

    /// 在已加载的订单行中选出最佳匹配
    ///
    /// # 参数
    /// - details: 订单行（需带已解析的产品零件号/描述特征）
    /// - part_features: 每行对应的 (factory_part_number, description), 与 details 等长
    /// - line: 进线行
    ///
    /// # 返回
    /// - Some(order_detail_id): 首个命中的子句选出的行
    /// - None: 无子句命中
    pub fn best_match(
        &self,
        details: &[OrderDetail],
        part_features: &[(Option<String>, Option<String>)],
        line: &IncomingLine,
    ) -> Option<i64> {
        if details.is_empty() {
            return None;
        }

        let candidates: Vec<Candidate> = details
            .iter()
            .zip(part_features.iter())
            .map(|(d, (fpn, desc))| self.build_candidate(d, fpn.as_deref(), desc.as_deref(), line))
            .collect();

        // 子句表: (谓词, 允许多候选)
        // 所有子句都额外要求 quantity_valid
        type Clause = (fn(&Candidate) -> bool, bool);
        let clauses: [Clause; 12] = [
            (|c| c.item_match && c.fpn_match && c.open_status, false),
            (|c| c.price_match && c.fpn_match && c.open_status, false),
            (|c| c.price_match && c.fpn_match, true),
            (|c| c.price_match && c.fpn_match, false),
            (|c| c.price_match && c.cpn_match, false),
            (|c| c.price_match && c.either_match(), true),
            (|c| c.price_match && c.either_match(), false),
            (|c| c.either_match(), false),
            (|c| c.item_match && c.either_match(), false),
            (|c| c.price_match, true),
            (|c| c.item_match, false),
            (|c| c.quantity_valid, false),
        ];

        for (clause_no, (predicate, allow_multiple)) in clauses.iter().enumerate() {
            let hits: Vec<&Candidate> = candidates
                .iter()
                .filter(|c| c.quantity_valid && predicate(c))
                .collect();

            let chosen = match (hits.len(), allow_multiple) {
                (0, _) => continue,
                (1, _) => Some(hits[0]),
                // 多候选仅在允许时生效, 取 shipping_balance 最大者
                (_, true) => hits.iter().max_by_key(|c| c.shipping_balance).copied(),
                (_, false) => continue,
            };

            if let Some(c) = chosen {
                debug!(
                    clause = clause_no + 1,
                    order_detail_id = c.id,
                    "订单行匹配命中"
                );
                return Some(c.id);
            }
        }

        None
    }

    fn build_candidate(
        &self,
        detail: &OrderDetail,
        fpn: Option<&str>,
        description: Option<&str>,
        line: &IncomingLine,
    ) -> Candidate {
        let similarity_fpn = fuzzy::ratio_opt(line.part_number.as_deref(), fpn);
        let similarity_desc = fuzzy::ratio_opt(line.part_number.as_deref(), description);

        let price_diff = (detail.unit_price - line.unit_price).abs();

        Candidate {
            id: detail.id,
            shipping_balance: detail.shipping_balance,
            price_match: price_diff < self.price_tolerance,
            fpn_match: similarity_fpn >= self.fuzzy_threshold,
            cpn_match: similarity_desc >= self.fuzzy_threshold,
            item_match: line.item_number == Some(detail.item_number),
            open_status: detail.status == OrderDetailStatus::Open,
            quantity_valid: detail.quantity >= line.quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn detail(
        id: i64,
        item: i64,
        price: Decimal,
        qty: Decimal,
        balance: Decimal,
        status: OrderDetailStatus,
    ) -> OrderDetail {
        OrderDetail {
            id,
            order_id: 1,
            item_number: item,
            product_id: None,
            adhoc_product_name: None,
            end_user_id: None,
            quantity: qty,
            unit_price: price,
            commission_rate: None,
            commission_discount_rate: None,
            discount_rate: None,
            shipping_balance: balance,
            status,
        }
    }

    fn matcher() -> OrderDetailMatcher {
        OrderDetailMatcher::new(88, dec!(0.10))
    }

    #[test]
    fn test_item_and_fpn_open_wins_first_clause() {
        // 对应场景: L1 item=1 fpn=ABC-123 price=10 qty=5 open balance=5
        //          L2 item=2 fpn=XYZ-999 price=20 qty=3 open balance=2
        let details = vec![
            detail(101, 1, dec!(10), dec!(5), dec!(5), OrderDetailStatus::Open),
            detail(102, 2, dec!(20), dec!(3), dec!(2), OrderDetailStatus::Open),
        ];
        let features = vec![
            (Some("ABC-123".to_string()), None),
            (Some("XYZ-999".to_string()), None),
        ];
        let line = IncomingLine {
            unit_price: dec!(10.05),
            part_number: Some("ABC-123".to_string()),
            quantity: dec!(4),
            item_number: Some(1),
        };
        assert_eq!(matcher().best_match(&details, &features, &line), Some(101));
    }

    #[test]
    fn test_quantity_invalid_excludes_all() {
        let details = vec![detail(
            101,
            1,
            dec!(10),
            dec!(2),
            dec!(2),
            OrderDetailStatus::Open,
        )];
        let features = vec![(Some("ABC-123".to_string()), None)];
        let line = IncomingLine {
            unit_price: dec!(10),
            part_number: Some("ABC-123".to_string()),
            quantity: dec!(5), // 超出现有行数量
            item_number: Some(1),
        };
        assert_eq!(matcher().best_match(&details, &features, &line), None);
    }

    #[test]
    fn test_multi_candidate_takes_largest_balance() {
        // 两行都满足 price ∧ fpn（多候选子句 3）, 取余量大者
        let details = vec![
            detail(101, 1, dec!(10), dec!(9), dec!(3), OrderDetailStatus::Closed),
            detail(102, 2, dec!(10), dec!(9), dec!(7), OrderDetailStatus::Closed),
        ];
        let features = vec![
            (Some("ABC-123".to_string()), None),
            (Some("ABC-123".to_string()), None),
        ];
        let line = IncomingLine {
            unit_price: dec!(10),
            part_number: Some("ABC-123".to_string()),
            quantity: dec!(1),
            item_number: None,
        };
        assert_eq!(matcher().best_match(&details, &features, &line), Some(102));
    }

    #[test]
    fn test_single_clause_requires_exactly_one() {
        // 两行都仅满足 quantity_valid（子句 12, 单候选）→ 不触发
        let details = vec![
            detail(101, 1, dec!(50), dec!(9), dec!(3), OrderDetailStatus::Open),
            detail(102, 2, dec!(60), dec!(9), dec!(7), OrderDetailStatus::Open),
        ];
        let features = vec![(None, None), (None, None)];
        let line = IncomingLine {
            unit_price: dec!(10),
            part_number: None,
            quantity: dec!(1),
            item_number: None,
        };
        assert_eq!(matcher().best_match(&details, &features, &line), None);
    }

    #[test]
    fn test_description_similarity_clause() {
        // 价格匹配 + 描述相似（cpn_match, 子句 5）
        let details = vec![detail(
            101,
            1,
            dec!(10),
            dec!(9),
            dec!(3),
            OrderDetailStatus::Closed,
        )];
        let features = vec![(None, Some("WIDGET-500".to_string()))];
        let line = IncomingLine {
            unit_price: dec!(10.05),
            part_number: Some("WIDGET-500".to_string()),
            quantity: dec!(1),
            item_number: None,
        };
        assert_eq!(matcher().best_match(&details, &features, &line), Some(101));
    }

    #[test]
    fn test_price_only_multi_clause() {
        // 仅价格匹配, 多候选子句 10 生效
        let details = vec![
            detail(101, 1, dec!(10), dec!(9), dec!(3), OrderDetailStatus::Open),
            detail(102, 2, dec!(10.05), dec!(9), dec!(7), OrderDetailStatus::Open),
        ];
        let features = vec![(None, None), (None, None)];
        let line = IncomingLine {
            unit_price: dec!(10),
            part_number: None,
            quantity: dec!(1),
            item_number: None,
        };
        assert_eq!(matcher().best_match(&details, &features, &line), Some(102));
    }
}
