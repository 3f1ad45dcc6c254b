// ==========================================
// 销售佣金 CRM - 批处理器
// ==========================================
// 分块推进: 用户跳过 → 批内去重 → 转换 → 批量创建 → 记录
// 记录顺序（块内）: 用户跳过在前, 创建/跳过按 DTO 原位序, 转换错误最后;
// 块间按处理顺序追加, 无跨块去重
// ==========================================

use crate::domain::mapping::EntityMapping;
use crate::domain::processing::ProcessingRecord;
use crate::executor::converters::DtoConverter;
use crate::executor::error::ExecutionResult;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

// ===== 处理记录文案（外部数据契约, 不做本地化）=====
pub(crate) const MSG_SKIPPED_BY_USER: &str = "Skipped by user";
pub(crate) const MSG_DUPLICATE_OR_FAILED: &str = "Duplicate or could not be created";
pub(crate) const MSG_NOT_CONVERTIBLE: &str =
    "Record could not be converted to input. Missing required fields?";

/// 单个 DTO 在块内的去向
enum Slot {
    /// 参与批量创建, 值为 inputs 中的位置
    Staged(usize),
    /// 批内重复（与既有 dedup_key 撞键）
    Duplicate,
    /// 转换失败或无法构成输入
    Error(String),
}

/// 将 DTO 列表按块转换并创建, 逐 DTO 产出处理记录
///
/// # 参数
/// - `on_created`: 每个成功创建的实体 id 回调一次（文件链接收集）
#[instrument(skip_all, fields(document_id = document_id, dto_count = dtos.len(), batch_size = batch_size))]
pub async fn process_dtos<C>(
    converter: &mut C,
    dtos: &[C::Dto],
    mappings: &HashMap<String, EntityMapping>,
    document_id: i64,
    batch_size: usize,
    on_created: &mut dyn FnMut(i64),
) -> ExecutionResult<Vec<ProcessingRecord>>
where
    C: DtoConverter,
{
    let batch_size = batch_size.max(1);
    let mut records = Vec::with_capacity(dtos.len());

    for chunk in dtos.chunks(batch_size) {
        process_chunk(converter, chunk, mappings, document_id, on_created, &mut records).await?;
    }

    debug!(record_count = records.len(), "批处理完成");
    Ok(records)
}

async fn process_chunk<C>(
    converter: &mut C,
    chunk: &[C::Dto],
    mappings: &HashMap<String, EntityMapping>,
    document_id: i64,
    on_created: &mut dyn FnMut(i64),
    records: &mut Vec<ProcessingRecord>,
) -> ExecutionResult<()>
where
    C: DtoConverter,
{
    let mut slots: Vec<Option<Slot>> = Vec::with_capacity(chunk.len());
    let mut inputs: Vec<C::Input> = Vec::new();
    let mut seen_keys: HashSet<String> = HashSet::new();

    // 阶段 1-4: 用户跳过 / 去重 / 转换
    for dto in chunk {
        let mapping = mappings
            .get(converter.internal_uuid(dto))
            .cloned()
            .unwrap_or_default();

        if mapping.is_user_skipped() {
            records.push(ProcessingRecord::skipped(
                document_id,
                snapshot(dto),
                MSG_SKIPPED_BY_USER,
            ));
            slots.push(None);
            continue;
        }

        if let Some(key) = converter.dedup_key(dto, &mapping) {
            if !seen_keys.insert(key) {
                slots.push(Some(Slot::Duplicate));
                continue;
            }
        }

        match converter.to_input(dto, &mapping).await {
            Ok(Some(input)) => {
                inputs.push(input);
                slots.push(Some(Slot::Staged(inputs.len() - 1)));
            }
            Ok(None) => slots.push(Some(Slot::Error(MSG_NOT_CONVERTIBLE.to_string()))),
            Err(e) => slots.push(Some(Slot::Error(e.to_string()))),
        }
    }

    // 阶段 5: 批量创建（既有/失败折算为跳过位）
    let outcome = converter.create_bulk(&inputs).await?;
    let skipped_in_create = outcome.skipped_indices().len();
    if skipped_in_create > 0 {
        debug!(skipped_in_create, "批量创建存在跳过位");
    }

    // 记录: 创建/跳过按原位序
    let mut deferred_errors = Vec::new();
    for (dto, slot) in chunk.iter().zip(&slots) {
        match slot {
            None => {} // 用户跳过已在阶段 1 落记录
            Some(Slot::Duplicate) => records.push(ProcessingRecord::skipped(
                document_id,
                snapshot(dto),
                MSG_DUPLICATE_OR_FAILED,
            )),
            Some(Slot::Staged(pos)) => match outcome.created.get(*pos).copied().flatten() {
                Some(entity_id) => {
                    on_created(entity_id);
                    records.push(ProcessingRecord::created(document_id, entity_id, snapshot(dto)));
                }
                None => records.push(ProcessingRecord::skipped(
                    document_id,
                    snapshot(dto),
                    MSG_DUPLICATE_OR_FAILED,
                )),
            },
            Some(Slot::Error(message)) => {
                deferred_errors.push(ProcessingRecord::error(
                    document_id,
                    snapshot(dto),
                    message.clone(),
                ));
            }
        }
    }

    // 转换错误最后落盘
    records.extend(deferred_errors);
    Ok(())
}

fn snapshot<D: Serialize>(dto: &D) -> serde_json::Value {
    serde_json::to_value(dto).unwrap_or_default()
}
