// ==========================================
// 销售佣金 CRM - 实体映射
// ==========================================
// 用途: 映射解析器的输出, 转换器按 DTO 消费
// 折叠语义: 标量字段 first_non_empty, map/set 取并集
// ==========================================

use std::collections::{BTreeMap, BTreeSet};

// ==========================================
// EntityMapping - 单个 DTO 的已解析引用集合
// ==========================================
// 不变式: 只有出现在 DTO details 中的行索引才会出现在 map/set 中
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityMapping {
    // ===== 文档级标量引用 =====
    pub factory_id: Option<i64>,          // 厂商
    pub sold_to_customer_id: Option<i64>, // 售达客户
    pub bill_to_customer_id: Option<i64>, // 开票客户

    // ===== 行级索引引用（键为 flow_index_detail）=====
    pub products: BTreeMap<usize, i64>,
    pub end_users: BTreeMap<usize, i64>,
    pub orders: BTreeMap<usize, i64>,
    pub invoices: BTreeMap<usize, i64>,
    pub credits: BTreeMap<usize, i64>,
    pub adjustments: BTreeMap<usize, i64>,

    // ===== 用户跳过标记 =====
    pub skipped_product_indices: BTreeSet<usize>,
    pub skipped_order_indices: BTreeSet<usize>,
    pub skipped_invoice_indices: BTreeSet<usize>,
}

impl EntityMapping {
    /// 按行索引取订单 id, 行级缺失时回退到索引 0
    pub fn order_id_for(&self, flow_index: usize) -> Option<i64> {
        self.orders
            .get(&flow_index)
            .or_else(|| self.orders.get(&0))
            .copied()
    }

    /// 按行索引取发票 id, 行级缺失时回退到索引 0
    pub fn invoice_id_for(&self, flow_index: usize) -> Option<i64> {
        self.invoices
            .get(&flow_index)
            .or_else(|| self.invoices.get(&0))
            .copied()
    }

    /// 按行索引取产品 id（不回退, 产品映射严格按行）
    pub fn product_id_for(&self, flow_index: usize) -> Option<i64> {
        self.products.get(&flow_index).copied()
    }

    /// 按行索引取最终用户 id
    pub fn end_user_id_for(&self, flow_index: usize) -> Option<i64> {
        self.end_users.get(&flow_index).copied()
    }

    /// 该 DTO 是否被用户整体跳过（订单/发票级跳过标记）
    pub fn is_user_skipped(&self) -> bool {
        !self.skipped_order_indices.is_empty() || !self.skipped_invoice_indices.is_empty()
    }

    /// 合并另一个映射（多条 PendingEntity 指向同一 dto_id 的情况）
    ///
    /// # 语义
    /// - 标量字段: 仅在当前未设置时写入
    /// - map/set: 并集（已有键不覆盖）
    pub fn merge_from(&mut self, other: &EntityMapping) {
        if self.factory_id.is_none() {
            self.factory_id = other.factory_id;
        }
        if self.sold_to_customer_id.is_none() {
            self.sold_to_customer_id = other.sold_to_customer_id;
        }
        if self.bill_to_customer_id.is_none() {
            self.bill_to_customer_id = other.bill_to_customer_id;
        }

        for (k, v) in &other.products {
            self.products.entry(*k).or_insert(*v);
        }
        for (k, v) in &other.end_users {
            self.end_users.entry(*k).or_insert(*v);
        }
        for (k, v) in &other.orders {
            self.orders.entry(*k).or_insert(*v);
        }
        for (k, v) in &other.invoices {
            self.invoices.entry(*k).or_insert(*v);
        }
        for (k, v) in &other.credits {
            self.credits.entry(*k).or_insert(*v);
        }
        for (k, v) in &other.adjustments {
            self.adjustments.entry(*k).or_insert(*v);
        }

        self.skipped_product_indices
            .extend(other.skipped_product_indices.iter().copied());
        self.skipped_order_indices
            .extend(other.skipped_order_indices.iter().copied());
        self.skipped_invoice_indices
            .extend(other.skipped_invoice_indices.iter().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_scalar_first_wins() {
        let mut a = EntityMapping {
            factory_id: Some(1),
            ..Default::default()
        };
        let b = EntityMapping {
            factory_id: Some(2),
            sold_to_customer_id: Some(9),
            ..Default::default()
        };
        a.merge_from(&b);
        // 标量: 已设置的不被覆盖, 未设置的补齐
        assert_eq!(a.factory_id, Some(1));
        assert_eq!(a.sold_to_customer_id, Some(9));
    }

    #[test]
    fn test_merge_maps_union() {
        let mut a = EntityMapping::default();
        a.products.insert(0, 10);
        let mut b = EntityMapping::default();
        b.products.insert(0, 99);
        b.products.insert(1, 11);
        b.skipped_product_indices.insert(2);
        a.merge_from(&b);
        assert_eq!(a.products.get(&0), Some(&10));
        assert_eq!(a.products.get(&1), Some(&11));
        assert!(a.skipped_product_indices.contains(&2));
    }

    #[test]
    fn test_order_id_fallback_to_zero() {
        let mut m = EntityMapping::default();
        m.orders.insert(0, 7);
        assert_eq!(m.order_id_for(3), Some(7));
        m.orders.insert(3, 8);
        assert_eq!(m.order_id_for(3), Some(8));
    }
}
