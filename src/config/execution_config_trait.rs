// ==========================================
// 销售佣金 CRM - 执行配置读取 Trait
// ==========================================
// 职责: 定义文档执行管道所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::error::Error;

// ==========================================
// ExecutionConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ExecutionConfigReader: Send + Sync {
    /// 获取批处理大小（每批 DTO 行数）
    ///
    /// # 默认值
    /// - 50
    async fn get_batch_size(&self) -> Result<usize, Box<dyn Error>>;

    /// 获取模糊匹配阈值（0-100）
    ///
    /// # 默认值
    /// - 88
    ///
    /// # 用途
    /// - 订单行匹配的产品名/件号相似度下限
    async fn get_fuzzy_match_threshold(&self) -> Result<u8, Box<dyn Error>>;

    /// 获取单价容差（绝对值）
    ///
    /// # 默认值
    /// - 0.10
    ///
    /// # 用途
    /// - 订单行匹配的 |detail.unit_price - line.unit_price| <= 容差 判定
    async fn get_price_tolerance(&self) -> Result<Decimal, Box<dyn Error>>;

    /// 获取操作用户 id（REP_SPLIT 调整默认 100% 分成的归属人）
    ///
    /// # 默认值
    /// - 1
    async fn get_acting_user_id(&self) -> Result<i64, Box<dyn Error>>;
}
