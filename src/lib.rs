// ==========================================
// 销售佣金 CRM - 核心库
// ==========================================
// 职责: 多租户销售佣金 CRM 的文档执行管道
// 输入: 提取阶段写入的待处理文档与用户映射决策
// 输出: 业务实体（订单/发票/支票/...）+ 逐 DTO 处理记录 + 文件链接
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 模糊行匹配
pub mod engine;

// 执行层 - 文档执行管道
pub mod executor;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AllocationMethod, ConfirmationStatus, DocumentEntityType, LinkSourceType, LinkTargetType,
    OrderDetailStatus, PendingEntityType, ProcessingStatus, WorkflowStatus,
};

// 领域实体
pub use domain::mapping::EntityMapping;
pub use domain::pending::{PendingDocument, PendingEntity};
pub use domain::processing::{CreationIssue, CreationResult, ProcessingRecord};

// 引擎
pub use engine::detail_matcher::{IncomingLine, OrderDetailMatcher};

// 执行器
pub use executor::{
    ConversionError, CreationHandler, DocumentExecutor, ExecutionError, ExecutionSettings,
};

// 配置
pub use config::{ConfigManager, ExecutionConfigReader};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "销售佣金 CRM";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
