// ==========================================
// 销售佣金 CRM - 订单转换器
// ==========================================
// 编号策略: 自动编号服务优先, 时间戳 AUTO 兜底
// ==========================================

use crate::domain::dto::OrderDto;
use crate::domain::mapping::EntityMapping;
use crate::domain::order::{OrderDetailInput, OrderInput};
use crate::domain::types::DocumentEntityType;
use crate::executor::auto_number::AutoNumberService;
use crate::executor::converters::common::{
    self, FactoryDefaultsCache, PREFIX_AUTO,
};
use crate::executor::converters::{DtoConverter, SavepointCreate};
use crate::executor::error::{ConversionError, ConversionResult};
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::error::RepositoryResult;
use crate::repository::order_repo::OrderRepository;
use async_trait::async_trait;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::warn;

pub struct OrderConverter {
    order_repo: OrderRepository,
    factory_defaults: FactoryDefaultsCache,
    auto_number: Box<dyn AutoNumberService>,
}

impl OrderConverter {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        auto_number: Box<dyn AutoNumberService>,
    ) -> Self {
        Self {
            order_repo: OrderRepository::from_connection(conn.clone()),
            factory_defaults: FactoryDefaultsCache::new(CatalogRepository::from_connection(conn)),
            auto_number,
        }
    }

    async fn resolve_number(&self, raw: Option<&str>) -> String {
        if !self.auto_number.needs_generation(raw) {
            return raw.map(str::trim).unwrap_or_default().to_string();
        }
        match self
            .auto_number
            .generate_number(DocumentEntityType::Orders)
            .await
        {
            Ok(n) if !n.trim().is_empty() => n,
            Ok(_) => common::timestamp_number(PREFIX_AUTO),
            Err(e) => {
                warn!(error = %e, "订单自动编号失败, 回退时间戳编号");
                common::timestamp_number(PREFIX_AUTO)
            }
        }
    }
}

#[async_trait]
impl DtoConverter for OrderConverter {
    type Dto = OrderDto;
    type Input = OrderInput;

    fn internal_uuid<'a>(&self, dto: &'a Self::Dto) -> &'a str {
        &dto.internal_uuid
    }

    async fn to_input(
        &mut self,
        dto: &Self::Dto,
        mapping: &EntityMapping,
    ) -> ConversionResult<Option<Self::Input>> {
        let factory_id = mapping.factory_id.ok_or(ConversionError::FactoryRequired)?;
        let sold_to_customer_id = mapping
            .sold_to_customer_id
            .ok_or(ConversionError::SoldToCustomerRequired)?;

        let defaults = self.factory_defaults.get(factory_id)?.cloned();
        let (default_rate, default_discount, default_product_discount) = defaults
            .map(|f| {
                (
                    f.default_commission_rate,
                    f.default_commission_discount_rate,
                    f.default_product_discount_rate,
                )
            })
            .unwrap_or((None, None, None));

        let mut details = Vec::new();
        for detail in &dto.details {
            // 用户跳过的产品行在转换前过滤
            if mapping.skipped_product_indices.contains(&detail.flow_index) {
                continue;
            }
            let product_id = mapping.product_id_for(detail.flow_index);
            let adhoc_product_name = match product_id {
                Some(_) => None,
                None => common::adhoc_product_name(
                    detail.factory_part_number.as_deref(),
                    detail.customer_part_number.as_deref(),
                    detail.description.as_deref(),
                ),
            };

            details.push(OrderDetailInput {
                item_number: detail
                    .item_number
                    .unwrap_or((detail.flow_index + 1) as i64),
                product_id,
                adhoc_product_name,
                end_user_id: mapping.end_user_id_for(detail.flow_index),
                quantity: common::quantity_or_default(detail.quantity_ordered),
                unit_price: common::price_or_default(detail.unit_price),
                commission_rate: common::rate_or_default(detail.commission_rate, default_rate),
                commission_discount_rate: common::rate_or_default(
                    detail.commission_discount_rate,
                    default_discount,
                ),
                discount_rate: common::rate_or_default(
                    detail.discount_rate,
                    default_product_discount,
                ),
            });
        }

        if details.is_empty() {
            return Ok(None);
        }

        Ok(Some(OrderInput {
            order_number: self.resolve_number(dto.order_number.as_deref()).await,
            factory_id,
            sold_to_customer_id,
            bill_to_customer_id: mapping.bill_to_customer_id,
            order_date: dto.order_date,
            details,
        }))
    }

    fn dedup_key(&self, dto: &Self::Dto, mapping: &EntityMapping) -> Option<String> {
        let number = dto.order_number.as_deref().map(str::trim)?;
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
        self.order_repo.create(input)
    }
}

impl SavepointCreate for OrderConverter {
    fn create_in_savepoint(conn: &Connection, input: &Self::Input) -> RepositoryResult<i64> {
        OrderRepository::create_in_tx(conn, input)
    }
}
