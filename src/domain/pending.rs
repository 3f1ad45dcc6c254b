// ==========================================
// 销售佣金 CRM - 待处理文档领域模型
// ==========================================
// 用途: 提取阶段（外部协作方）写入, 执行器读取并一次性变更状态
// ==========================================

use crate::domain::types::{ConfirmationStatus, DocumentEntityType, PendingEntityType, WorkflowStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// PendingDocument - 待处理文档
// ==========================================
// 不变式:
// - entity_type 在执行前必须已设置
// - workflow_status 每次执行只发生 IN_PROGRESS → {COMPLETED, FAILED} 一次
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingDocument {
    // ===== 主键与关联 =====
    pub id: i64,      // 文档 id
    pub file_id: i64, // 上传源文件 id（链接源）

    // ===== 执行输入 =====
    pub entity_type: Option<DocumentEntityType>, // 文档实体类型（决定转换器）
    pub extracted_data_json: serde_json::Value,  // DTO 数组或表格文件引用（不透明）

    // ===== 状态 =====
    pub workflow_status: WorkflowStatus,

    // ===== 用户决策 =====
    pub pending_entities: Vec<PendingEntity>,

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// PendingEntity - 单条用户决策
// ==========================================
// 一条决策描述: 文档中某个被引用实体的解析结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingEntity {
    pub id: i64,
    pub pending_document_id: i64,

    // ===== 决策内容 =====
    pub entity_type: PendingEntityType,
    pub confirmation_status: ConfirmationStatus,
    pub best_match_id: Option<i64>, // 已解析的现有实体 id

    // ===== 作用范围 =====
    pub dto_ids: Vec<String>,             // 该决策作用的 DTO 逻辑 id 列表
    pub flow_index_detail: Option<usize>, // 行级索引（0 基）

    // ===== 待新建数据 =====
    pub extracted_data: Option<serde_json::Value>, // SET_FOR_CREATION 时的序列化 DTO

    pub created_at: DateTime<Utc>,
}

impl PendingEntity {
    /// 该决策是否为指定波次的 SET_FOR_CREATION 决策
    pub fn is_set_for_creation(&self, entity_type: PendingEntityType) -> bool {
        self.confirmation_status == ConfirmationStatus::SetForCreation
            && self.entity_type == entity_type
    }
}
