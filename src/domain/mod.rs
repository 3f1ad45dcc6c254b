// ==========================================
// 销售佣金 CRM - 领域层
// ==========================================
// 职责: 实体、DTO、映射与执行结果的纯数据定义
// 红线: 领域层不访问数据库、不包含管道流程
// ==========================================

pub mod catalog;
pub mod commission;
pub mod dto;
pub mod fulfillment;
pub mod invoice;
pub mod mapping;
pub mod order;
pub mod pending;
pub mod processing;
pub mod types;

// 重导出核心类型
pub use mapping::EntityMapping;
pub use pending::{PendingDocument, PendingEntity};
pub use processing::{CreationIssue, CreationResult, ProcessingRecord};
pub use types::{
    AllocationMethod, ConfirmationStatus, DocumentEntityType, LinkSourceType, LinkTargetType,
    OrderDetailStatus, PendingEntityType, ProcessingStatus, WorkflowStatus,
};
