// ==========================================
// 销售佣金 CRM - 佣金结算单转换器
// ==========================================
// 行佣金字段: total_line_commission ?? paid_commission_amount;
// 0 为有效透传值, 两者皆缺时留空由下游按费率重算
// ==========================================

use crate::domain::commission::{StatementDetailInput, StatementInput};
use crate::domain::dto::StatementDto;
use crate::domain::mapping::EntityMapping;
use crate::engine::detail_matcher::{IncomingLine, OrderDetailMatcher};
use crate::executor::converters::common::{self, FactoryDefaultsCache, OrderLookupCache, PREFIX_STATEMENT};
use crate::executor::converters::DtoConverter;
use crate::executor::error::{ConversionError, ConversionResult};
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::commission_repo::CommissionRepository;
use crate::repository::error::RepositoryResult;
use crate::repository::invoice_repo::InvoiceRepository;
use crate::repository::order_repo::OrderRepository;
use async_trait::async_trait;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct StatementConverter {
    commission_repo: CommissionRepository,
    invoice_repo: InvoiceRepository,
    order_cache: OrderLookupCache,
    factory_defaults: FactoryDefaultsCache,
    matcher: OrderDetailMatcher,
    // 发票查找缓存: (规范化发票号, factory_id) → id
    invoice_cache: HashMap<(String, i64), Option<i64>>,
}

impl StatementConverter {
    pub fn new(conn: Arc<Mutex<Connection>>, matcher: OrderDetailMatcher) -> Self {
        Self {
            commission_repo: CommissionRepository::from_connection(conn.clone()),
            invoice_repo: InvoiceRepository::from_connection(conn.clone()),
            order_cache: OrderLookupCache::new(OrderRepository::from_connection(conn.clone())),
            factory_defaults: FactoryDefaultsCache::new(CatalogRepository::from_connection(conn)),
            matcher,
            invoice_cache: HashMap::new(),
        }
    }

    fn lookup_invoice(&mut self, number: &str, factory_id: i64) -> RepositoryResult<Option<i64>> {
        let key = (number.trim().to_lowercase(), factory_id);
        if let Some(cached) = self.invoice_cache.get(&key) {
            return Ok(*cached);
        }
        let found = self
            .invoice_repo
            .find_by_number_and_factory(number.trim(), factory_id)?;
        self.invoice_cache.insert(key, found);
        Ok(found)
    }
}

#[async_trait]
impl DtoConverter for StatementConverter {
    type Dto = StatementDto;
    type Input = StatementInput;

    fn internal_uuid<'a>(&self, dto: &'a Self::Dto) -> &'a str {
        &dto.internal_uuid
    }

    async fn to_input(
        &mut self,
        dto: &Self::Dto,
        mapping: &EntityMapping,
    ) -> ConversionResult<Option<Self::Input>> {
        let factory_id = mapping.factory_id.ok_or(ConversionError::FactoryRequired)?;

        let default_rate = self
            .factory_defaults
            .get(factory_id)?
            .and_then(|f| f.default_commission_rate);

        let mut details = Vec::new();
        for detail in &dto.details {
            let quantity = common::quantity_or_default(detail.quantity);
            let unit_price = common::price_or_default(detail.unit_price);

            let invoice_id = match detail.invoice_number.as_deref() {
                Some(number) if !number.trim().is_empty() => {
                    self.lookup_invoice(number, factory_id)?
                }
                _ => None,
            };

            let order_detail_id = match mapping.order_id_for(detail.flow_detail_index) {
                Some(order_id) => match self.order_cache.get(order_id)? {
                    Some(order) => self.matcher.best_match(
                        &order.details,
                        &order.part_features,
                        &IncomingLine {
                            unit_price,
                            part_number: detail.factory_part_number.clone(),
                            quantity,
                            item_number: detail.item_number,
                        },
                    ),
                    None => None,
                },
                None => None,
            };

            details.push(StatementDetailInput {
                invoice_id,
                order_detail_id,
                quantity,
                unit_price,
                commission_rate: common::rate_or_default(detail.commission_rate, default_rate),
                commission_amount: detail.commission_amount(),
            });
        }

        if details.is_empty() {
            return Ok(None);
        }

        Ok(Some(StatementInput {
            statement_number: common::number_or_timestamp(
                dto.statement_number.as_deref(),
                PREFIX_STATEMENT,
            ),
            factory_id,
            statement_date: dto.statement_date,
            details,
        }))
    }

    fn dedup_key(&self, dto: &Self::Dto, _mapping: &EntityMapping) -> Option<String> {
        let number = dto.statement_number.as_deref().map(str::trim)?;
        if number.is_empty() {
            return None;
        }
        Some(number.to_lowercase())
    }

    async fn find_existing(&mut self, input: &Self::Input) -> RepositoryResult<Option<i64>> {
        self.commission_repo
            .find_statement_by_number(&input.statement_number)
    }

    async fn create_one(&mut self, input: &Self::Input) -> RepositoryResult<i64> {
        self.commission_repo.create_statement(input)
    }
}
