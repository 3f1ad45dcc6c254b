// ==========================================
// 销售佣金 CRM - 发票转换器
// ==========================================
// 行回挂: 通过模糊行匹配引擎 附着 order_detail_id
// 金额: 有行被过滤时按存活行重算, 否则沿用 DTO 金额
// ==========================================

use crate::domain::dto::InvoiceDto;
use crate::domain::invoice::{InvoiceDetailInput, InvoiceInput};
use crate::domain::mapping::EntityMapping;
use crate::domain::types::DocumentEntityType;
use crate::engine::detail_matcher::{IncomingLine, OrderDetailMatcher};
use crate::executor::auto_number::AutoNumberService;
use crate::executor::converters::common::{
    self, FactoryDefaultsCache, OrderLookupCache, PREFIX_AUTO,
};
use crate::executor::converters::{DtoConverter, SavepointCreate};
use crate::executor::error::{ConversionError, ConversionResult};
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::error::RepositoryResult;
use crate::repository::invoice_repo::InvoiceRepository;
use crate::repository::order_repo::OrderRepository;
use async_trait::async_trait;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use tracing::warn;

pub struct InvoiceConverter {
    invoice_repo: InvoiceRepository,
    order_cache: OrderLookupCache,
    factory_defaults: FactoryDefaultsCache,
    matcher: OrderDetailMatcher,
    auto_number: Box<dyn AutoNumberService>,
}

impl InvoiceConverter {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        matcher: OrderDetailMatcher,
        auto_number: Box<dyn AutoNumberService>,
    ) -> Self {
        Self {
            invoice_repo: InvoiceRepository::from_connection(conn.clone()),
            order_cache: OrderLookupCache::new(OrderRepository::from_connection(conn.clone())),
            factory_defaults: FactoryDefaultsCache::new(CatalogRepository::from_connection(conn)),
            matcher,
            auto_number,
        }
    }

    async fn resolve_number(&self, raw: Option<&str>) -> String {
        if !self.auto_number.needs_generation(raw) {
            return raw.map(str::trim).unwrap_or_default().to_string();
        }
        match self
            .auto_number
            .generate_number(DocumentEntityType::Invoices)
            .await
        {
            Ok(n) if !n.trim().is_empty() => n,
            Ok(_) => common::timestamp_number(PREFIX_AUTO),
            Err(e) => {
                warn!(error = %e, "发票自动编号失败, 回退时间戳编号");
                common::timestamp_number(PREFIX_AUTO)
            }
        }
    }
}

#[async_trait]
impl DtoConverter for InvoiceConverter {
    type Dto = InvoiceDto;
    type Input = InvoiceInput;

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

        let default_rate = self
            .factory_defaults
            .get(factory_id)?
            .and_then(|f| f.default_commission_rate);

        let mut details = Vec::new();
        let mut any_filtered = false;
        for detail in &dto.details {
            if mapping
                .skipped_product_indices
                .contains(&detail.flow_detail_index)
            {
                any_filtered = true;
                continue;
            }

            let quantity = common::quantity_or_default(detail.quantity_shipped);
            let unit_price = common::price_or_default(detail.unit_price);

            // 回挂订单行: 行级订单映射 → 模糊匹配
            let order_detail_id = match mapping.order_id_for(detail.flow_detail_index) {
                Some(order_id) => match self.order_cache.get(order_id)? {
                    Some(order) => self.matcher.best_match(
                        &order.details,
                        &order.part_features,
                        &IncomingLine {
                            unit_price,
                            part_number: detail
                                .factory_part_number
                                .clone()
                                .or_else(|| detail.customer_part_number.clone()),
                            quantity,
                            item_number: detail.item_number,
                        },
                    ),
                    None => None,
                },
                None => None,
            };

            let product_id = mapping.product_id_for(detail.flow_detail_index);
            let adhoc_product_name = match product_id {
                Some(_) => None,
                None => common::adhoc_product_name(
                    detail.factory_part_number.as_deref(),
                    detail.customer_part_number.as_deref(),
                    detail.description.as_deref(),
                ),
            };

            details.push(InvoiceDetailInput {
                item_number: detail
                    .item_number
                    .unwrap_or((detail.flow_detail_index + 1) as i64),
                order_detail_id,
                product_id,
                adhoc_product_name,
                quantity,
                unit_price,
                commission_rate: common::rate_or_default(detail.commission_rate, default_rate),
            });
        }

        if details.is_empty() {
            return Ok(None);
        }

        // 有行被过滤时金额只反映存活行
        let invoice_amount = match (dto.invoice_amount, any_filtered) {
            (Some(amount), false) => amount,
            _ => details
                .iter()
                .map(|d| d.quantity * d.unit_price)
                .sum::<Decimal>(),
        };

        Ok(Some(InvoiceInput {
            invoice_number: self.resolve_number(dto.invoice_number.as_deref()).await,
            factory_id,
            sold_to_customer_id,
            invoice_date: dto.invoice_date,
            invoice_amount,
            details,
        }))
    }

    fn dedup_key(&self, dto: &Self::Dto, mapping: &EntityMapping) -> Option<String> {
        let number = dto.invoice_number.as_deref().map(str::trim)?;
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
        self.invoice_repo.create(input)
    }
}

impl SavepointCreate for InvoiceConverter {
    fn create_in_savepoint(conn: &Connection, input: &Self::Input) -> RepositoryResult<i64> {
        InvoiceRepository::create_in_tx(conn, input)
    }
}
