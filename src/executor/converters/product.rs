// ==========================================
// 销售佣金 CRM - 产品转换器
// ==========================================
// 品名: name ?? factory_part_number, 两者皆缺 → 无法构成输入
// 计量单位: 按大写标题解析或新建, 单次执行内缓存
// ==========================================

use crate::domain::catalog::ProductInput;
use crate::domain::dto::ProductDto;
use crate::domain::mapping::EntityMapping;
use crate::executor::converters::DtoConverter;
use crate::executor::error::ConversionResult;
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct ProductConverter {
    catalog_repo: CatalogRepository,
    uom_cache: HashMap<String, i64>,
}

impl ProductConverter {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            catalog_repo: CatalogRepository::from_connection(conn),
            uom_cache: HashMap::new(),
        }
    }

    fn resolve_uom(&mut self, title: &str) -> RepositoryResult<i64> {
        let title = title.trim().to_uppercase();
        if let Some(id) = self.uom_cache.get(&title) {
            return Ok(*id);
        }
        let id = self.catalog_repo.resolve_uom(&title)?;
        self.uom_cache.insert(title, id);
        Ok(id)
    }
}

#[async_trait]
impl DtoConverter for ProductConverter {
    type Dto = ProductDto;
    type Input = ProductInput;

    fn internal_uuid<'a>(&self, dto: &'a Self::Dto) -> &'a str {
        &dto.internal_uuid
    }

    async fn to_input(
        &mut self,
        dto: &Self::Dto,
        mapping: &EntityMapping,
    ) -> ConversionResult<Option<Self::Input>> {
        let non_empty = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let Some(name) = non_empty(&dto.name).or_else(|| non_empty(&dto.factory_part_number))
        else {
            return Ok(None);
        };

        let uom_id = match dto.uom.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(title) => Some(self.resolve_uom(title)?),
            None => None,
        };

        Ok(Some(ProductInput {
            name,
            factory_id: mapping.factory_id,
            factory_part_number: non_empty(&dto.factory_part_number),
            description: non_empty(&dto.description),
            uom_id,
            unit_price: dto.unit_price,
            commission_rate: dto.commission_rate,
        }))
    }

    fn dedup_key(&self, dto: &Self::Dto, mapping: &EntityMapping) -> Option<String> {
        // 优先 (厂商, 件号), 无件号退回品名
        if let Some(fpn) = dto
            .factory_part_number
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            return Some(format!(
                "{}|{}",
                mapping.factory_id.unwrap_or(0),
                fpn.to_lowercase()
            ));
        }
        dto.name
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_lowercase)
    }

    async fn find_existing(&mut self, input: &Self::Input) -> RepositoryResult<Option<i64>> {
        match (input.factory_id, input.factory_part_number.as_deref()) {
            (Some(factory_id), Some(fpn)) => self
                .catalog_repo
                .find_product_by_part_number(factory_id, fpn),
            _ => Ok(None),
        }
    }

    async fn create_one(&mut self, input: &Self::Input) -> RepositoryResult<i64> {
        self.catalog_repo.create_product(input)
    }
}
