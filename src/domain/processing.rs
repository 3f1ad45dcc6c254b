// ==========================================
// 销售佣金 CRM - 执行结果领域模型
// ==========================================
// 用途: 批处理器逐 DTO 产出 ProcessingRecord;
//       创建波次汇总 CreationResult
// ==========================================

use crate::domain::types::{PendingEntityType, ProcessingStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ProcessingRecord - 单条处理记录
// ==========================================
// 不变式:
// - CREATED ⇔ entity_id 存在
// - SKIPPED / ERROR ⇒ entity_id 为空
// - 分组/去重后的每个 DTO 至少产出一条记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingRecord {
    pub pending_document_id: i64,
    pub entity_id: Option<i64>,
    pub status: ProcessingStatus,
    pub dto_json: serde_json::Value, // DTO 快照
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProcessingRecord {
    pub fn created(pending_document_id: i64, entity_id: i64, dto_json: serde_json::Value) -> Self {
        Self {
            pending_document_id,
            entity_id: Some(entity_id),
            status: ProcessingStatus::Created,
            dto_json,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn skipped(
        pending_document_id: i64,
        dto_json: serde_json::Value,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            pending_document_id,
            entity_id: None,
            status: ProcessingStatus::Skipped,
            dto_json,
            error_message: Some(reason.into()),
            created_at: Utc::now(),
        }
    }

    pub fn error(
        pending_document_id: i64,
        dto_json: serde_json::Value,
        message: impl Into<String>,
    ) -> Self {
        Self {
            pending_document_id,
            entity_id: None,
            status: ProcessingStatus::Error,
            dto_json,
            error_message: Some(message.into()),
            created_at: Utc::now(),
        }
    }
}

// ==========================================
// CreationIssue - 创建波次中的单个失败
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreationIssue {
    pub entity_type: PendingEntityType,
    pub pending_entity_id: Option<i64>,
    pub error_message: String,
    pub dto_json: Option<serde_json::Value>,
}

// ==========================================
// CreationResult - 创建波次聚合结果
// ==========================================
// has_issues = true 时执行器短路: 文档置 FAILED, 跳过批处理器
#[derive(Debug, Clone, Default)]
pub struct CreationResult {
    pub orders_created: usize,
    pub invoices_created: usize,
    pub credits_created: usize,
    pub adjustments_created: usize,
    pub issues: Vec<CreationIssue>,

    /// 波次成功创建的文档同类型实体的处理记录
    /// （文档自身类型的 SET_FOR_CREATION DTO 由波次消费, 不再进批处理器）
    pub wave_records: Vec<ProcessingRecord>,
    /// 波次创建的、属于文档自身类型的实体 id（用于文件链接）
    pub wave_entity_ids: Vec<i64>,
    /// 波次消费掉的 DTO internal_uuid（从批处理输入中剔除）
    pub consumed_dto_ids: Vec<String>,
}

impl CreationResult {
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn total_created(&self) -> usize {
        self.orders_created + self.invoices_created + self.credits_created + self.adjustments_created
    }
}
