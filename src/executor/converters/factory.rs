// ==========================================
// 销售佣金 CRM - 厂商转换器
// ==========================================

use crate::domain::catalog::FactoryInput;
use crate::domain::dto::FactoryDto;
use crate::domain::mapping::EntityMapping;
use crate::executor::converters::DtoConverter;
use crate::executor::error::ConversionResult;
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub struct FactoryConverter {
    catalog_repo: CatalogRepository,
}

impl FactoryConverter {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            catalog_repo: CatalogRepository::from_connection(conn),
        }
    }
}

#[async_trait]
impl DtoConverter for FactoryConverter {
    type Dto = FactoryDto;
    type Input = FactoryInput;

    fn internal_uuid<'a>(&self, dto: &'a Self::Dto) -> &'a str {
        &dto.internal_uuid
    }

    async fn to_input(
        &mut self,
        dto: &Self::Dto,
        _mapping: &EntityMapping,
    ) -> ConversionResult<Option<Self::Input>> {
        let Some(name) = dto.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(None);
        };

        Ok(Some(FactoryInput {
            name: name.to_string(),
            default_commission_rate: dto.default_commission_rate,
            default_commission_discount_rate: dto.default_commission_discount_rate,
            default_product_discount_rate: dto.default_product_discount_rate,
        }))
    }

    fn dedup_key(&self, dto: &Self::Dto, _mapping: &EntityMapping) -> Option<String> {
        dto.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_lowercase)
    }

    async fn create_one(&mut self, input: &Self::Input) -> RepositoryResult<i64> {
        self.catalog_repo.create_factory(input)
    }
}
