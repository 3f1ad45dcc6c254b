// ==========================================
// 销售佣金 CRM - 订单确认转换器
// ==========================================
// 自然键: (order_detail_id, ack_number), 幂等查重
// ==========================================

use crate::domain::dto::AcknowledgementDto;
use crate::domain::fulfillment::AcknowledgementInput;
use crate::domain::mapping::EntityMapping;
use crate::executor::converters::common::{self, OrderLookupCache, PREFIX_ACK};
use crate::executor::converters::DtoConverter;
use crate::executor::error::{ConversionError, ConversionResult};
use crate::repository::error::RepositoryResult;
use crate::repository::fulfillment_repo::FulfillmentRepository;
use crate::repository::order_repo::OrderRepository;
use async_trait::async_trait;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub struct AcknowledgementConverter {
    fulfillment_repo: FulfillmentRepository,
    order_cache: OrderLookupCache,
}

impl AcknowledgementConverter {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            fulfillment_repo: FulfillmentRepository::from_connection(conn.clone()),
            order_cache: OrderLookupCache::new(OrderRepository::from_connection(conn)),
        }
    }
}

#[async_trait]
impl DtoConverter for AcknowledgementConverter {
    type Dto = AcknowledgementDto;
    type Input = AcknowledgementInput;

    fn internal_uuid<'a>(&self, dto: &'a Self::Dto) -> &'a str {
        &dto.internal_uuid
    }

    async fn to_input(
        &mut self,
        dto: &Self::Dto,
        mapping: &EntityMapping,
    ) -> ConversionResult<Option<Self::Input>> {
        let order_id = mapping.order_id_for(0).ok_or(ConversionError::OrderRequired)?;

        // 确认对应的订单行: 首行明细按 item_number 回挂, 找不到退回订单首行
        let first_detail = dto.details.first();
        let order_detail_id = match self.order_cache.get(order_id)? {
            Some(order) => {
                let by_item = first_detail
                    .and_then(|d| d.item_number)
                    .and_then(|item| {
                        order
                            .details
                            .iter()
                            .find(|od| od.item_number == item)
                            .map(|od| od.id)
                    });
                by_item.or_else(|| order.details.first().map(|d| d.id))
            }
            None => None,
        };

        Ok(Some(AcknowledgementInput {
            ack_number: common::number_or_timestamp(dto.ack_number.as_deref(), PREFIX_ACK),
            order_id,
            order_detail_id,
            ack_date: dto.ack_date,
            ship_date: first_detail.and_then(|d| d.ship_date),
        }))
    }

    fn dedup_key(&self, dto: &Self::Dto, mapping: &EntityMapping) -> Option<String> {
        let number = dto.ack_number.as_deref().map(str::trim)?;
        if number.is_empty() {
            return None;
        }
        Some(format!(
            "{}|{}",
            number.to_lowercase(),
            mapping.order_id_for(0).unwrap_or(0)
        ))
    }

    async fn find_existing(&mut self, input: &Self::Input) -> RepositoryResult<Option<i64>> {
        self.fulfillment_repo
            .find_acknowledgement(input.order_detail_id, &input.ack_number)
    }

    async fn create_one(&mut self, input: &Self::Input) -> RepositoryResult<i64> {
        self.fulfillment_repo.create_acknowledgement(input)
    }
}
