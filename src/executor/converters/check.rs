// ==========================================
// 销售佣金 CRM - 支票转换器
// ==========================================
// 发票查找: (invoice_number, factory_id), 单次执行内缓存
// 幂等: 按自然键 (check_number, factory_id) 查重
// ==========================================

use crate::domain::commission::{CheckDetailInput, CheckInput};
use crate::domain::dto::CheckDto;
use crate::domain::mapping::EntityMapping;
use crate::executor::converters::common::{self, PREFIX_CHECK};
use crate::executor::converters::DtoConverter;
use crate::executor::error::{ConversionError, ConversionResult};
use crate::repository::commission_repo::CommissionRepository;
use crate::repository::error::RepositoryResult;
use crate::repository::invoice_repo::InvoiceRepository;
use async_trait::async_trait;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct CheckConverter {
    commission_repo: CommissionRepository,
    invoice_repo: InvoiceRepository,
    invoice_cache: HashMap<(String, i64), Option<i64>>,
}

impl CheckConverter {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            commission_repo: CommissionRepository::from_connection(conn.clone()),
            invoice_repo: InvoiceRepository::from_connection(conn),
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
impl DtoConverter for CheckConverter {
    type Dto = CheckDto;
    type Input = CheckInput;

    fn internal_uuid<'a>(&self, dto: &'a Self::Dto) -> &'a str {
        &dto.internal_uuid
    }

    async fn to_input(
        &mut self,
        dto: &Self::Dto,
        mapping: &EntityMapping,
    ) -> ConversionResult<Option<Self::Input>> {
        let factory_id = mapping.factory_id.ok_or(ConversionError::FactoryRequired)?;

        let mut details = Vec::new();
        for detail in &dto.details {
            let number = detail
                .invoice_number
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty());
            let Some(number) = number else {
                // 无发票号的支票行无法回挂, 跳过该行
                continue;
            };

            let invoice_id = self.lookup_invoice(number, factory_id)?.ok_or_else(|| {
                ConversionError::InvoiceNotFound {
                    number: number.to_string(),
                    factory_id,
                }
            })?;

            details.push(CheckDetailInput {
                invoice_id,
                paid_amount: common::price_or_default(detail.paid_amount),
            });
        }

        if details.is_empty() {
            return Ok(None);
        }

        let check_amount = dto
            .check_amount
            .unwrap_or_else(|| details.iter().map(|d| d.paid_amount).sum::<Decimal>());

        Ok(Some(CheckInput {
            check_number: common::number_or_timestamp(dto.check_number.as_deref(), PREFIX_CHECK),
            factory_id,
            check_date: dto.check_date,
            check_amount,
            details,
        }))
    }

    fn dedup_key(&self, dto: &Self::Dto, mapping: &EntityMapping) -> Option<String> {
        let number = dto.check_number.as_deref().map(str::trim)?;
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
            .find_check_by_number_and_factory(&input.check_number, input.factory_id)
    }

    async fn create_one(&mut self, input: &Self::Input) -> RepositoryResult<i64> {
        self.commission_repo.create_check(input)
    }
}
