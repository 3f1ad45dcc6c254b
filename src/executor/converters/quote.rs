// ==========================================
// 销售佣金 CRM - 报价转换器
// ==========================================
// 必填: 售达客户映射 + 最终用户映射（索引 0）
// 行: 产品映射可空, 缺失时落临时品名
// ==========================================

use crate::domain::dto::QuoteDto;
use crate::domain::fulfillment::{QuoteDetailInput, QuoteInput};
use crate::domain::mapping::EntityMapping;
use crate::executor::converters::common::{self, PREFIX_QUOTE};
use crate::executor::converters::DtoConverter;
use crate::executor::error::{ConversionError, ConversionResult};
use crate::repository::error::RepositoryResult;
use crate::repository::fulfillment_repo::FulfillmentRepository;
use async_trait::async_trait;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub struct QuoteConverter {
    fulfillment_repo: FulfillmentRepository,
}

impl QuoteConverter {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            fulfillment_repo: FulfillmentRepository::from_connection(conn),
        }
    }
}

#[async_trait]
impl DtoConverter for QuoteConverter {
    type Dto = QuoteDto;
    type Input = QuoteInput;

    fn internal_uuid<'a>(&self, dto: &'a Self::Dto) -> &'a str {
        &dto.internal_uuid
    }

    async fn to_input(
        &mut self,
        dto: &Self::Dto,
        mapping: &EntityMapping,
    ) -> ConversionResult<Option<Self::Input>> {
        let sold_to_customer_id = mapping
            .sold_to_customer_id
            .ok_or(ConversionError::SoldToCustomerRequired)?;
        let end_user_id = mapping
            .end_user_id_for(0)
            .ok_or(ConversionError::EndUserRequired)?;

        let mut details = Vec::new();
        for detail in &dto.details {
            if mapping.skipped_product_indices.contains(&detail.flow_index) {
                continue;
            }

            let product_id = mapping.product_id_for(detail.flow_index);
            let adhoc_name = match product_id {
                Some(_) => None,
                None => common::adhoc_product_name(
                    detail.factory_part_number.as_deref(),
                    detail.customer_part_number.as_deref(),
                    detail.description.as_deref(),
                ),
            };

            details.push(QuoteDetailInput {
                item_number: (detail.flow_index + 1) as i64,
                product_id,
                adhoc_product_name: adhoc_name,
                quantity: common::quantity_or_default(detail.quantity),
                unit_price: common::price_or_default(detail.unit_price),
            });
        }

        if details.is_empty() {
            return Ok(None);
        }

        Ok(Some(QuoteInput {
            quote_number: common::number_or_timestamp(dto.quote_number.as_deref(), PREFIX_QUOTE),
            sold_to_customer_id,
            end_user_id,
            quote_date: dto.quote_date,
            details,
        }))
    }

    fn dedup_key(&self, dto: &Self::Dto, _mapping: &EntityMapping) -> Option<String> {
        let number = dto.quote_number.as_deref().map(str::trim)?;
        if number.is_empty() {
            return None;
        }
        Some(number.to_lowercase())
    }

    async fn find_existing(&mut self, input: &Self::Input) -> RepositoryResult<Option<i64>> {
        self.fulfillment_repo.find_quote_by_number(&input.quote_number)
    }

    async fn create_one(&mut self, input: &Self::Input) -> RepositoryResult<i64> {
        self.fulfillment_repo.create_quote(input)
    }
}
