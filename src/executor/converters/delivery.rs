// ==========================================
// 销售佣金 CRM - 发货单转换器
// ==========================================
// 硬性校验: 供应商（厂商映射）/ 仓库 / 每行产品映射;
// 缺失不降级, 直接返回类型化转换错误
// ==========================================

use crate::domain::dto::DeliveryDto;
use crate::domain::fulfillment::{DeliveryInput, DeliveryItemInput};
use crate::domain::mapping::EntityMapping;
use crate::executor::converters::common::{self, PREFIX_DELIVERY};
use crate::executor::converters::DtoConverter;
use crate::executor::error::{ConversionError, ConversionResult};
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::error::RepositoryResult;
use crate::repository::fulfillment_repo::FulfillmentRepository;
use async_trait::async_trait;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub struct DeliveryConverter {
    fulfillment_repo: FulfillmentRepository,
    catalog_repo: CatalogRepository,
}

impl DeliveryConverter {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            fulfillment_repo: FulfillmentRepository::from_connection(conn.clone()),
            catalog_repo: CatalogRepository::from_connection(conn),
        }
    }

    fn resolve_warehouse(&self, dto: &DeliveryDto) -> ConversionResult<i64> {
        let name = dto
            .warehouse_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        let Some(name) = name else {
            // 影响库存的发货必须指定仓库, 错误类型据此区分
            if dto.affects_inventory {
                return Err(ConversionError::WarehouseRequiredForInventory);
            }
            return Err(ConversionError::DeliveryWarehouseRequired);
        };
        self.catalog_repo
            .find_warehouse_by_name(name)?
            .ok_or(ConversionError::DeliveryWarehouseRequired)
    }
}

#[async_trait]
impl DtoConverter for DeliveryConverter {
    type Dto = DeliveryDto;
    type Input = DeliveryInput;

    fn internal_uuid<'a>(&self, dto: &'a Self::Dto) -> &'a str {
        &dto.internal_uuid
    }

    async fn to_input(
        &mut self,
        dto: &Self::Dto,
        mapping: &EntityMapping,
    ) -> ConversionResult<Option<Self::Input>> {
        let vendor_id = mapping
            .factory_id
            .ok_or(ConversionError::DeliveryVendorRequired)?;
        let warehouse_id = self.resolve_warehouse(dto)?;

        let mut items = Vec::new();
        for detail in &dto.details {
            let product_id = mapping.product_id_for(detail.flow_index).ok_or_else(|| {
                ConversionError::DeliveryProductRequired {
                    flow_index: detail.flow_index,
                    part_number: detail.part_number.clone(),
                }
            })?;
            items.push(DeliveryItemInput {
                product_id,
                quantity: common::quantity_or_default(detail.quantity),
            });
        }

        if items.is_empty() {
            return Ok(None);
        }

        Ok(Some(DeliveryInput {
            delivery_number: common::number_or_timestamp(
                dto.delivery_number.as_deref(),
                PREFIX_DELIVERY,
            ),
            vendor_id,
            warehouse_id,
            delivery_date: dto.delivery_date,
            items,
        }))
    }

    fn dedup_key(&self, dto: &Self::Dto, mapping: &EntityMapping) -> Option<String> {
        let number = dto.delivery_number.as_deref().map(str::trim)?;
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
        self.fulfillment_repo
            .find_delivery_by_number_and_vendor(&input.delivery_number, input.vendor_id)
    }

    async fn create_one(&mut self, input: &Self::Input) -> RepositoryResult<i64> {
        self.fulfillment_repo.create_delivery(input)
    }
}
