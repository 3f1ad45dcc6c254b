// ==========================================
// 销售佣金 CRM - 客户转换器
// ==========================================
// 去重: company_name 大小写不敏感（批内 + 库级）
// ==========================================

use crate::domain::catalog::CustomerInput;
use crate::domain::dto::CustomerDto;
use crate::domain::mapping::EntityMapping;
use crate::executor::converters::DtoConverter;
use crate::executor::error::ConversionResult;
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub struct CustomerConverter {
    catalog_repo: CatalogRepository,
}

impl CustomerConverter {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            catalog_repo: CatalogRepository::from_connection(conn),
        }
    }
}

#[async_trait]
impl DtoConverter for CustomerConverter {
    type Dto = CustomerDto;
    type Input = CustomerInput;

    fn internal_uuid<'a>(&self, dto: &'a Self::Dto) -> &'a str {
        &dto.internal_uuid
    }

    async fn to_input(
        &mut self,
        dto: &Self::Dto,
        _mapping: &EntityMapping,
    ) -> ConversionResult<Option<Self::Input>> {
        let Some(company_name) = dto
            .company_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
        else {
            return Ok(None);
        };

        Ok(Some(CustomerInput {
            company_name: company_name.to_string(),
            contact_name: dto.contact_name.clone(),
            email: dto.email.clone(),
            phone: dto.phone.clone(),
            address: dto.address.clone(),
            city: dto.city.clone(),
            state: dto.state.clone(),
            zip_code: dto.zip_code.clone(),
        }))
    }

    fn dedup_key(&self, dto: &Self::Dto, _mapping: &EntityMapping) -> Option<String> {
        dto.company_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_lowercase)
    }

    async fn find_existing(&mut self, input: &Self::Input) -> RepositoryResult<Option<i64>> {
        Ok(self
            .catalog_repo
            .find_customer_by_company_name(&input.company_name)?
            .map(|c| c.id))
    }

    async fn create_one(&mut self, input: &Self::Input) -> RepositoryResult<i64> {
        self.catalog_repo.create_customer(input)
    }
}
