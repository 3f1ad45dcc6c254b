// ==========================================
// 销售佣金 CRM - 创建波次处理器
// ==========================================
// 波次顺序: 订单 → 发票 → 贷项 → 调整（后序波次消费前序波次写入的 id）
// 事务模型: 转换全部在锁外完成, 每波次一个外层事务,
//           逐实体保存点, 失败回滚保存点并记 CreationIssue
// ==========================================

use crate::domain::dto::{AdjustmentDto, CreditDto, InvoiceDto, OrderDto};
use crate::domain::mapping::EntityMapping;
use crate::domain::pending::{PendingDocument, PendingEntity};
use crate::domain::processing::{CreationIssue, CreationResult, ProcessingRecord};
use crate::domain::types::{DocumentEntityType, PendingEntityType};
use crate::engine::detail_matcher::OrderDetailMatcher;
use crate::executor::auto_number::SequenceAutoNumberService;
use crate::executor::batch_processor::MSG_NOT_CONVERTIBLE;
use crate::executor::converters::{
    AdjustmentConverter, CreditConverter, DtoConverter, InvoiceConverter, OrderConverter,
    SavepointCreate,
};
use crate::executor::dto_grouper::{group_invoice_dtos, group_order_dtos};
use crate::executor::dto_loader;
use crate::executor::error::ExecutionResult;
use crate::repository::error::RepositoryError;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

// ==========================================
// WaveItem - 单个待创建实体
// ==========================================
// dto_ids: 该实体覆盖的 DTO 逻辑 id（映射回灌与批输入剔除的作用域）
struct WaveItem<D> {
    pending_entity_id: i64,
    dto_ids: Vec<String>,
    flow_index: usize,
    dto: D,
}

pub struct CreationHandler {
    conn: Arc<Mutex<Connection>>,
    fuzzy_threshold: u8,
    price_tolerance: Decimal,
    acting_user_id: i64,
}

impl CreationHandler {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        fuzzy_threshold: u8,
        price_tolerance: Decimal,
        acting_user_id: i64,
    ) -> Self {
        Self {
            conn,
            fuzzy_threshold,
            price_tolerance,
            acting_user_id,
        }
    }

    fn matcher(&self) -> OrderDetailMatcher {
        OrderDetailMatcher::new(self.fuzzy_threshold, self.price_tolerance)
    }

    fn auto_number(&self) -> Box<SequenceAutoNumberService> {
        Box::new(SequenceAutoNumberService::from_connection(self.conn.clone()))
    }

    /// 按固定顺序执行全部 SET_FOR_CREATION 波次
    pub async fn run_waves(
        &self,
        document: &PendingDocument,
        mappings: &mut HashMap<String, EntityMapping>,
    ) -> ExecutionResult<CreationResult> {
        let mut result = CreationResult::default();
        let doc_type = document.entity_type;

        // ===== 波次 1: 订单（分组后创建）=====
        let items = self.build_grouped_items(
            document,
            PendingEntityType::Orders,
            group_order_dtos,
            &mut result,
        );
        if !items.is_empty() {
            let mut converter = OrderConverter::new(self.conn.clone(), self.auto_number());
            let created = self
                .run_wave(
                    &mut converter,
                    PendingEntityType::Orders,
                    items,
                    document,
                    mappings,
                    doc_type == Some(DocumentEntityType::Orders),
                    &mut result,
                )
                .await?;
            result.orders_created = created;
        }

        // ===== 波次 2: 发票 =====
        let items = self.build_grouped_items(
            document,
            PendingEntityType::Invoices,
            group_invoice_dtos,
            &mut result,
        );
        if !items.is_empty() {
            let mut converter =
                InvoiceConverter::new(self.conn.clone(), self.matcher(), self.auto_number());
            let created = self
                .run_wave(
                    &mut converter,
                    PendingEntityType::Invoices,
                    items,
                    document,
                    mappings,
                    doc_type == Some(DocumentEntityType::Invoices),
                    &mut result,
                )
                .await?;
            result.invoices_created = created;
        }

        // ===== 波次 3: 贷项 =====
        let items =
            self.build_plain_items::<CreditDto>(document, PendingEntityType::Credits, &mut result);
        if !items.is_empty() {
            let mut converter = CreditConverter::new(self.conn.clone(), self.matcher());
            let created = self
                .run_wave(
                    &mut converter,
                    PendingEntityType::Credits,
                    items,
                    document,
                    mappings,
                    doc_type == Some(DocumentEntityType::Credits),
                    &mut result,
                )
                .await?;
            result.credits_created = created;
        }

        // ===== 波次 4: 调整 =====
        let items = self.build_plain_items::<AdjustmentDto>(
            document,
            PendingEntityType::Adjustments,
            &mut result,
        );
        if !items.is_empty() {
            let mut converter = AdjustmentConverter::new(self.conn.clone(), self.acting_user_id);
            let created = self
                .run_wave(
                    &mut converter,
                    PendingEntityType::Adjustments,
                    items,
                    document,
                    mappings,
                    doc_type == Some(DocumentEntityType::Adjustments),
                    &mut result,
                )
                .await?;
            result.adjustments_created = created;
        }

        info!(
            document_id = document.id,
            total_created = result.total_created(),
            issue_count = result.issues.len(),
            "创建波次完成"
        );
        Ok(result)
    }

    /// 选出指定波次的 SET_FOR_CREATION 决策并解析其片段 DTO
    fn parse_fragments<D: DeserializeOwned>(
        &self,
        document: &PendingDocument,
        wave: PendingEntityType,
        result: &mut CreationResult,
    ) -> Vec<(i64, Vec<String>, usize, D)> {
        let mut parsed = Vec::new();
        for entity in document
            .pending_entities
            .iter()
            .filter(|e| e.is_set_for_creation(wave))
        {
            let Some(raw) = entity.extracted_data.clone() else {
                // 数据质量问题: SET_FOR_CREATION 决策缺少待建数据
                warn!(pending_entity_id = entity.id, entity_type = %wave, "待建决策缺少 extracted_data");
                result.issues.push(CreationIssue {
                    entity_type: wave,
                    pending_entity_id: Some(entity.id),
                    error_message: MSG_NOT_CONVERTIBLE.to_string(),
                    dto_json: None,
                });
                continue;
            };

            let mut raw = raw;
            dto_loader::ensure_internal_uuid(&mut raw);
            match serde_json::from_value::<D>(raw.clone()) {
                Ok(dto) => parsed.push((
                    entity.id,
                    scope_dto_ids(entity, &raw),
                    entity.flow_index_detail.unwrap_or(0),
                    dto,
                )),
                Err(e) => {
                    warn!(pending_entity_id = entity.id, error = %e, "待建片段解析失败");
                    result.issues.push(CreationIssue {
                        entity_type: wave,
                        pending_entity_id: Some(entity.id),
                        error_message: e.to_string(),
                        dto_json: Some(raw),
                    });
                }
            }
        }
        parsed
    }

    /// 贷项/调整: 每条决策一个实体, 不分组
    fn build_plain_items<D: DeserializeOwned>(
        &self,
        document: &PendingDocument,
        wave: PendingEntityType,
        result: &mut CreationResult,
    ) -> Vec<WaveItem<D>> {
        self.parse_fragments::<D>(document, wave, result)
            .into_iter()
            .map(|(pending_entity_id, dto_ids, flow_index, dto)| WaveItem {
                pending_entity_id,
                dto_ids,
                flow_index,
                dto,
            })
            .collect()
    }

    /// 订单/发票: 片段先经分组器合并, 同一逻辑文档只创建一次
    fn build_grouped_items<D>(
        &self,
        document: &PendingDocument,
        wave: PendingEntityType,
        group: fn(Vec<D>) -> Vec<crate::executor::dto_grouper::GroupedDto<D>>,
        result: &mut CreationResult,
    ) -> Vec<WaveItem<D>>
    where
        D: DeserializeOwned + HasInternalUuid,
    {
        let fragments = self.parse_fragments::<D>(document, wave, result);

        // 片段元数据按 internal_uuid 索引, 分组后按 source_uuids 归并
        let mut meta: HashMap<String, (i64, Vec<String>, usize)> = HashMap::new();
        let mut dtos = Vec::new();
        for (pe_id, dto_ids, flow_index, dto) in fragments {
            meta.insert(dto.internal_uuid().to_string(), (pe_id, dto_ids, flow_index));
            dtos.push(dto);
        }

        group(dtos)
            .into_iter()
            .filter_map(|g| {
                let mut pending_entity_id = None;
                let mut dto_ids: Vec<String> = Vec::new();
                let mut flow_index = 0;
                for (i, uuid) in g.source_uuids.iter().enumerate() {
                    let Some((pe_id, ids, idx)) = meta.get(uuid) else {
                        continue;
                    };
                    if i == 0 {
                        pending_entity_id = Some(*pe_id);
                        flow_index = *idx;
                    }
                    for id in ids {
                        if !dto_ids.contains(id) {
                            dto_ids.push(id.clone());
                        }
                    }
                }
                pending_entity_id.map(|pe_id| WaveItem {
                    pending_entity_id: pe_id,
                    dto_ids,
                    flow_index,
                    dto: g.dto,
                })
            })
            .collect()
    }

    /// 运行单个波次: 锁外转换, 锁内保存点逐实体创建
    #[allow(clippy::too_many_arguments)]
    async fn run_wave<C>(
        &self,
        converter: &mut C,
        wave: PendingEntityType,
        items: Vec<WaveItem<C::Dto>>,
        document: &PendingDocument,
        mappings: &mut HashMap<String, EntityMapping>,
        is_document_wave: bool,
        result: &mut CreationResult,
    ) -> ExecutionResult<usize>
    where
        C: DtoConverter + SavepointCreate,
        C::Dto: Serialize,
    {
        // 第一阶段: 全部转换在连接锁外完成, 避免转换器内部取锁时死锁
        let mut staged: Vec<(usize, C::Input)> = Vec::new();
        for (idx, item) in items.iter().enumerate() {
            let merged = merged_mapping(mappings, &item.dto_ids);
            match converter.to_input(&item.dto, &merged).await {
                Ok(Some(input)) => staged.push((idx, input)),
                Ok(None) => result.issues.push(CreationIssue {
                    entity_type: wave,
                    pending_entity_id: Some(item.pending_entity_id),
                    error_message: MSG_NOT_CONVERTIBLE.to_string(),
                    dto_json: Some(dto_snapshot(&item.dto)),
                }),
                Err(e) => {
                    warn!(pending_entity_id = item.pending_entity_id, entity_type = %wave, error = %e, "待建实体转换失败");
                    result.issues.push(CreationIssue {
                        entity_type: wave,
                        pending_entity_id: Some(item.pending_entity_id),
                        error_message: e.to_string(),
                        dto_json: Some(dto_snapshot(&item.dto)),
                    });
                }
            }
        }

        if staged.is_empty() {
            return Ok(0);
        }

        // 第二阶段: 单个外层事务 + 逐实体保存点
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let mut tx = conn.unchecked_transaction()?;
        let mut created = 0usize;

        for (idx, input) in &staged {
            let item = &items[*idx];
            let mut sp = tx.savepoint()?;
            match C::create_in_savepoint(&sp, input) {
                Ok(new_id) => {
                    sp.commit()?;
                    created += 1;

                    // 新 id 回灌共享映射, 供后序波次与批处理器消费
                    for dto_id in &item.dto_ids {
                        propagate_id(
                            mappings.entry(dto_id.clone()).or_default(),
                            wave,
                            item.flow_index,
                            new_id,
                        );
                    }

                    if is_document_wave {
                        result.wave_records.push(ProcessingRecord::created(
                            document.id,
                            new_id,
                            dto_snapshot(&item.dto),
                        ));
                        result.wave_entity_ids.push(new_id);
                        result.consumed_dto_ids.extend(item.dto_ids.iter().cloned());
                    }
                }
                Err(e) => {
                    warn!(
                        pending_entity_id = item.pending_entity_id,
                        entity_type = %wave,
                        error = %e,
                        "保存点内创建失败, 回滚该实体"
                    );
                    sp.rollback()?;
                    result.issues.push(CreationIssue {
                        entity_type: wave,
                        pending_entity_id: Some(item.pending_entity_id),
                        error_message: e.to_string(),
                        dto_json: Some(dto_snapshot(&item.dto)),
                    });
                }
            }
        }

        tx.commit()?;
        info!(entity_type = %wave, created, "波次创建提交");
        Ok(created)
    }
}

/// 决策作用域内全部 dto_id 的映射合并视图
fn merged_mapping(
    mappings: &HashMap<String, EntityMapping>,
    dto_ids: &[String],
) -> EntityMapping {
    let mut merged = EntityMapping::default();
    for dto_id in dto_ids {
        if let Some(m) = mappings.get(dto_id) {
            merged.merge_from(m);
        }
    }
    merged
}

/// 按波次类型把新建 id 写入映射的对应 map（flow_index_detail 或 0）
fn propagate_id(mapping: &mut EntityMapping, wave: PendingEntityType, idx: usize, id: i64) {
    match wave {
        PendingEntityType::Orders => {
            mapping.orders.insert(idx, id);
        }
        PendingEntityType::Invoices => {
            mapping.invoices.insert(idx, id);
        }
        PendingEntityType::Credits => {
            mapping.credits.insert(idx, id);
        }
        PendingEntityType::Adjustments => {
            mapping.adjustments.insert(idx, id);
        }
        _ => {}
    }
}

fn dto_snapshot<D: Serialize>(dto: &D) -> serde_json::Value {
    serde_json::to_value(dto).unwrap_or_default()
}

/// 决策的 dto_ids 为空时退回片段自身的 internal_uuid
fn scope_dto_ids(entity: &PendingEntity, raw: &serde_json::Value) -> Vec<String> {
    if !entity.dto_ids.is_empty() {
        return entity.dto_ids.clone();
    }
    raw.get("internal_uuid")
        .and_then(|v| v.as_str())
        .map(|s| vec![s.to_string()])
        .unwrap_or_default()
}

// ==========================================
// HasInternalUuid - 分组波次的片段标识
// ==========================================
trait HasInternalUuid {
    fn internal_uuid(&self) -> &str;
}

impl HasInternalUuid for OrderDto {
    fn internal_uuid(&self) -> &str {
        &self.internal_uuid
    }
}

impl HasInternalUuid for InvoiceDto {
    fn internal_uuid(&self) -> &str {
        &self.internal_uuid
    }
}
