// ==========================================
// 销售佣金 CRM - 执行器错误类型
// ==========================================
// 分层:
// - ConversionError: 转换器的类型化失败, 作为值在管道内流转
// - ExecutionError: 执行器的顶层失败
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

// ==========================================
// ConversionError - DTO → 创建输入的类型化失败
// ==========================================
// 红线: 转换失败是值不是异常, 批处理器逐条折算为 ERROR 记录
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("缺少厂商映射")]
    FactoryRequired,

    #[error("缺少售达客户映射")]
    SoldToCustomerRequired,

    #[error("缺少订单映射")]
    OrderRequired,

    #[error("缺少最终用户映射")]
    EndUserRequired,

    #[error("产品未找到 (flow_index={flow_index}, fpn={fpn:?})")]
    ProductNotFound {
        flow_index: usize,
        fpn: Option<String>,
    },

    #[error("发票未找到 (number={number}, factory_id={factory_id})")]
    InvoiceNotFound { number: String, factory_id: i64 },

    #[error("缺少厂商件号")]
    FactoryPartNumberRequired,

    #[error("贷项创建失败: {0}")]
    CreditCreationFailed(String),

    #[error("调整创建失败: {0}")]
    AdjustmentCreationFailed(String),

    #[error("发货单缺少供应商映射")]
    DeliveryVendorRequired,

    #[error("发货单缺少仓库")]
    DeliveryWarehouseRequired,

    #[error("发货行缺少产品映射 (flow_index={flow_index}, part_number={part_number:?})")]
    DeliveryProductRequired {
        flow_index: usize,
        part_number: Option<String>,
    },

    #[error("影响库存的发货单必须指定仓库")]
    WarehouseRequiredForInventory,

    #[error("DTO 解析失败: {0}")]
    Parse(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

// ==========================================
// ExecutionError - 顶层执行失败
// ==========================================
// entity_type 未设置是唯一向调用方直接抛出的程序性错误;
// 其余意外错误由执行器捕获, 文档在独立短事务中置 FAILED
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("待处理文档的 entity_type 未设置")]
    EntityTypeNotSet,

    #[error("待处理文档未找到: id={id}")]
    DocumentNotFound { id: i64 },

    #[error("提取数据加载失败: {0}")]
    DtoLoad(String),

    #[error("配置读取失败: {0}")]
    Config(String),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

// 保存点波次直接操作 rusqlite 事务, 底层错误按仓储错误分类归档
impl From<rusqlite::Error> for ExecutionError {
    fn from(err: rusqlite::Error) -> Self {
        ExecutionError::Repository(RepositoryError::from(err))
    }
}

pub type ConversionResult<T> = Result<T, ConversionError>;
pub type ExecutionResult<T> = Result<T, ExecutionError>;
