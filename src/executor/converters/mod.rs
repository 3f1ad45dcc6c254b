// ==========================================
// 销售佣金 CRM - 转换器家族
// ==========================================
// 统一契约: parse_dtos / to_input / dedup_key /
//           find_existing / create_one / create_bulk
// 按 DocumentEntityType 做标签分发（见 document_executor）
// ==========================================

use crate::domain::mapping::EntityMapping;
use crate::executor::error::{ConversionError, ConversionResult};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

pub mod acknowledgement;
pub mod adjustment;
pub mod check;
pub mod common;
pub mod credit;
pub mod customer;
pub mod delivery;
pub mod factory;
pub mod invoice;
pub mod order;
pub mod product;
pub mod quote;
pub mod statement;

pub use acknowledgement::AcknowledgementConverter;
pub use adjustment::AdjustmentConverter;
pub use check::CheckConverter;
pub use credit::CreditConverter;
pub use customer::CustomerConverter;
pub use delivery::DeliveryConverter;
pub use factory::FactoryConverter;
pub use invoice::InvoiceConverter;
pub use order::OrderConverter;
pub use product::ProductConverter;
pub use quote::QuoteConverter;
pub use statement::StatementConverter;

// ==========================================
// BulkCreateOutcome - 批量创建结果
// ==========================================
// created 与输入按位对齐: Some(id) 已创建, None 跳过（重复或创建失败）
#[derive(Debug, Default)]
pub struct BulkCreateOutcome {
    pub created: Vec<Option<i64>>,
}

impl BulkCreateOutcome {
    pub fn skipped_indices(&self) -> Vec<usize> {
        self.created
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(i, _)| i)
            .collect()
    }
}

// ==========================================
// DtoConverter Trait
// ==========================================
// 红线: 转换失败作为值返回（ConversionError）, 不在转换路径抛出;
//       Ok(None) 表示缺少必填字段、无法构成输入
#[async_trait]
pub trait DtoConverter: Send {
    type Dto: Serialize + DeserializeOwned + Clone + Send + Sync;
    type Input: Send + Sync;

    /// 将加载器产出的 JSON 行解析为类型化 DTO 列表
    fn parse_dtos(&self, rows: &[serde_json::Value]) -> ConversionResult<Vec<Self::Dto>> {
        rows.iter()
            .map(|row| {
                serde_json::from_value(row.clone())
                    .map_err(|e| ConversionError::Parse(e.to_string()))
            })
            .collect()
    }

    /// DTO 的逻辑 id（映射表键）
    fn internal_uuid<'a>(&self, dto: &'a Self::Dto) -> &'a str;

    /// DTO → 创建输入
    ///
    /// # 返回
    /// - Ok(Some(input)): 可创建
    /// - Ok(None): 缺少必填字段, 无法构成输入
    /// - Err: 类型化转换失败
    async fn to_input(
        &mut self,
        dto: &Self::Dto,
        mapping: &EntityMapping,
    ) -> ConversionResult<Option<Self::Input>>;

    /// 批内去重键; None 表示该 DTO 不参与去重
    fn dedup_key(&self, dto: &Self::Dto, mapping: &EntityMapping) -> Option<String>;

    /// 按自然键查找既有实体（幂等转换器覆写; 默认不查找）
    async fn find_existing(&mut self, _input: &Self::Input) -> RepositoryResult<Option<i64>> {
        Ok(None)
    }

    /// 创建单个实体
    async fn create_one(&mut self, input: &Self::Input) -> RepositoryResult<i64>;

    /// 批量创建
    ///
    /// 默认实现: 逐条 find_existing + create_one; 既有实体与创建失败
    /// 均折算为跳过位（批处理器产出 SKIPPED 记录）
    async fn create_bulk(&mut self, inputs: &[Self::Input]) -> RepositoryResult<BulkCreateOutcome> {
        let mut outcome = BulkCreateOutcome::default();
        for input in inputs {
            if self.find_existing(input).await?.is_some() {
                outcome.created.push(None);
                continue;
            }
            match self.create_one(input).await {
                Ok(id) => outcome.created.push(Some(id)),
                Err(e) => {
                    warn!(error = %e, "批量创建中的单条失败, 按跳过处理");
                    outcome.created.push(None);
                }
            }
        }
        Ok(outcome)
    }
}

// ==========================================
// SavepointCreate Trait
// ==========================================
// 创建波次 在外层事务的保存点内同步创建实体;
// 仅订单/发票/贷项/调整四个波次转换器实现
pub trait SavepointCreate: DtoConverter {
    fn create_in_savepoint(conn: &Connection, input: &Self::Input) -> RepositoryResult<i64>;
}
