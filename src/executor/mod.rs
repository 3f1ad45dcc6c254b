// ==========================================
// 销售佣金 CRM - 文档执行层
// ==========================================
// 管道: 映射解析 → DTO 分组 → 转换器家族 →
//       创建波次 → 批处理 → 执行编排
// ==========================================

pub mod auto_number;
pub mod batch_processor;
pub mod converters;
pub mod creation_handler;
pub mod document_executor;
pub mod dto_grouper;
pub mod dto_loader;
pub mod error;
pub mod mapping_resolver;

pub use auto_number::{AutoNumberService, SequenceAutoNumberService};
pub use creation_handler::CreationHandler;
pub use document_executor::{DocumentExecutor, ExecutionSettings};
pub use error::{ConversionError, ConversionResult, ExecutionError, ExecutionResult};
