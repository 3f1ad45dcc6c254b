// ==========================================
// 销售佣金 CRM - 贷项转换器
// ==========================================
// 行回挂: 模糊匹配失败时回退订单首行
// ==========================================

use crate::domain::commission::{CreditDetailInput, CreditInput};
use crate::domain::dto::CreditDto;
use crate::domain::mapping::EntityMapping;
use crate::engine::detail_matcher::{IncomingLine, OrderDetailMatcher};
use crate::executor::converters::common::{self, FactoryDefaultsCache, OrderLookupCache, PREFIX_CREDIT};
use crate::executor::converters::{DtoConverter, SavepointCreate};
use crate::executor::error::{ConversionError, ConversionResult};
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::commission_repo::CommissionRepository;
use crate::repository::error::RepositoryResult;
use crate::repository::order_repo::OrderRepository;
use async_trait::async_trait;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

pub struct CreditConverter {
    commission_repo: CommissionRepository,
    order_cache: OrderLookupCache,
    factory_defaults: FactoryDefaultsCache,
    matcher: OrderDetailMatcher,
}

impl CreditConverter {
    pub fn new(conn: Arc<Mutex<Connection>>, matcher: OrderDetailMatcher) -> Self {
        Self {
            commission_repo: CommissionRepository::from_connection(conn.clone()),
            order_cache: OrderLookupCache::new(OrderRepository::from_connection(conn.clone())),
            factory_defaults: FactoryDefaultsCache::new(CatalogRepository::from_connection(conn)),
            matcher,
        }
    }
}

#[async_trait]
impl DtoConverter for CreditConverter {
    type Dto = CreditDto;
    type Input = CreditInput;

    fn internal_uuid<'a>(&self, dto: &'a Self::Dto) -> &'a str {
        &dto.internal_uuid
    }

    async fn to_input(
        &mut self,
        dto: &Self::Dto,
        mapping: &EntityMapping,
    ) -> ConversionResult<Option<Self::Input>> {
        let factory_id = mapping.factory_id.ok_or(ConversionError::FactoryRequired)?;
        let order_id = mapping.order_id_for(0).ok_or(ConversionError::OrderRequired)?;

        let default_rate = self
            .factory_defaults
            .get(factory_id)?
            .and_then(|f| f.default_commission_rate);

        let mut details = Vec::new();
        for detail in &dto.details {
            let quantity = common::quantity_or_default(detail.quantity);
            let unit_price = common::price_or_default(detail.unit_price);

            let order_detail_id = match self.order_cache.get(order_id)? {
                Some(order) => self
                    .matcher
                    .best_match(
                        &order.details,
                        &order.part_features,
                        &IncomingLine {
                            unit_price,
                            part_number: detail.factory_part_number.clone(),
                            quantity,
                            item_number: detail.item_number,
                        },
                    )
                    // 匹配失败回退订单首行
                    .or_else(|| order.details.first().map(|d| d.id)),
                None => None,
            };

            details.push(CreditDetailInput {
                order_detail_id,
                quantity,
                unit_price,
                commission_rate: common::rate_or_default(detail.commission_rate, default_rate),
            });
        }

        if details.is_empty() {
            return Ok(None);
        }

        let credit_amount = dto.credit_amount.unwrap_or_else(|| {
            details
                .iter()
                .map(|d| d.quantity * d.unit_price)
                .sum::<Decimal>()
        });

        Ok(Some(CreditInput {
            credit_number: common::number_or_timestamp(dto.credit_number.as_deref(), PREFIX_CREDIT),
            factory_id,
            order_id,
            credit_date: dto.credit_date,
            credit_amount,
            details,
        }))
    }

    fn dedup_key(&self, dto: &Self::Dto, mapping: &EntityMapping) -> Option<String> {
        let number = dto.credit_number.as_deref().map(str::trim)?;
        if number.is_empty() {
            return None;
        }
        Some(format!(
            "{}|{}",
            number.to_lowercase(),
            mapping.factory_id.unwrap_or(0)
        ))
    }

    async fn create_one(&mut self, input: &Self::Input) -> RepositoryResult<i64> {
        self.commission_repo.create_credit(input)
    }
}

impl SavepointCreate for CreditConverter {
    fn create_in_savepoint(conn: &Connection, input: &Self::Input) -> RepositoryResult<i64> {
        CommissionRepository::create_credit_in_tx(conn, input)
    }
}
