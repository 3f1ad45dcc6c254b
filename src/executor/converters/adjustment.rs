// ==========================================
// 销售佣金 CRM - 调整转换器
// ==========================================
// 分摊规则: 有客户映射 → CUSTOMER; 否则 REP_SPLIT 给操作用户 100%
// 幂等: 按自然键 (adjustment_number, factory_id) 查重
// ==========================================

use crate::domain::commission::AdjustmentInput;
use crate::domain::dto::AdjustmentDto;
use crate::domain::mapping::EntityMapping;
use crate::domain::types::AllocationMethod;
use crate::executor::converters::common::{self, PREFIX_ADJUSTMENT};
use crate::executor::converters::{DtoConverter, SavepointCreate};
use crate::executor::error::{ConversionError, ConversionResult};
use crate::repository::commission_repo::CommissionRepository;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

pub struct AdjustmentConverter {
    commission_repo: CommissionRepository,
    acting_user_id: i64,
}

impl AdjustmentConverter {
    pub fn new(conn: Arc<Mutex<Connection>>, acting_user_id: i64) -> Self {
        Self {
            commission_repo: CommissionRepository::from_connection(conn),
            acting_user_id,
        }
    }
}

#[async_trait]
impl DtoConverter for AdjustmentConverter {
    type Dto = AdjustmentDto;
    type Input = AdjustmentInput;

    fn internal_uuid<'a>(&self, dto: &'a Self::Dto) -> &'a str {
        &dto.internal_uuid
    }

    async fn to_input(
        &mut self,
        dto: &Self::Dto,
        mapping: &EntityMapping,
    ) -> ConversionResult<Option<Self::Input>> {
        let factory_id = mapping.factory_id.ok_or(ConversionError::FactoryRequired)?;
        let customer_id = mapping.sold_to_customer_id;

        let (allocation_method, splits) = match customer_id {
            Some(_) => (AllocationMethod::Customer, Vec::new()),
            None => (
                AllocationMethod::RepSplit,
                vec![(self.acting_user_id, Decimal::ONE_HUNDRED)],
            ),
        };

        Ok(Some(AdjustmentInput {
            adjustment_number: common::number_or_timestamp(
                dto.adjustment_number.as_deref(),
                PREFIX_ADJUSTMENT,
            ),
            factory_id,
            customer_id,
            amount: dto.amount.unwrap_or(Decimal::ZERO),
            reason: dto.reason.clone(),
            adjustment_date: dto.adjustment_date,
            allocation_method,
            splits,
        }))
    }

    fn dedup_key(&self, dto: &Self::Dto, mapping: &EntityMapping) -> Option<String> {
        let number = dto.adjustment_number.as_deref().map(str::trim)?;
        if number.is_empty() {
            return None;
        }
        Some(format!(
            "{}|{}",
            number.to_lowercase(),
            mapping.factory_id.unwrap_or(0)
        ))
    }

    async fn find_existing(&mut self, input: &Self::Input) -> RepositoryResult<Option<i64>> {
        self.commission_repo
            .find_adjustment_by_number_and_factory(&input.adjustment_number, input.factory_id)
    }

    async fn create_one(&mut self, input: &Self::Input) -> RepositoryResult<i64> {
        self.commission_repo.create_adjustment(input)
    }
}

impl SavepointCreate for AdjustmentConverter {
    fn create_in_savepoint(conn: &Connection, input: &Self::Input) -> RepositoryResult<i64> {
        CommissionRepository::create_adjustment_in_tx(conn, input)
    }
}
