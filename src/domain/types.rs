// ==========================================
// 销售佣金 CRM - 领域类型定义
// ==========================================
// 职责: 文档执行管道涉及的所有枚举类型
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 文档实体类型 (Document Entity Type)
// ==========================================
// 用途: PendingDocument.entity_type, 决定使用哪个转换器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentEntityType {
    Orders,                // 订单
    Invoices,              // 发票
    Checks,                // 支票
    Credits,               // 贷项
    Adjustments,           // 佣金调整
    Quotes,                // 报价
    Customers,             // 客户
    Factories,             // 厂商
    Products,              // 产品
    OrderAcknowledgements, // 订单确认
    CommissionStatements,  // 佣金结算单
    Deliveries,            // 发货单
}

impl fmt::Display for DocumentEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl DocumentEntityType {
    /// 从字符串解析文档实体类型
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ORDERS" => Some(DocumentEntityType::Orders),
            "INVOICES" => Some(DocumentEntityType::Invoices),
            "CHECKS" => Some(DocumentEntityType::Checks),
            "CREDITS" => Some(DocumentEntityType::Credits),
            "ADJUSTMENTS" => Some(DocumentEntityType::Adjustments),
            "QUOTES" => Some(DocumentEntityType::Quotes),
            "CUSTOMERS" => Some(DocumentEntityType::Customers),
            "FACTORIES" => Some(DocumentEntityType::Factories),
            "PRODUCTS" => Some(DocumentEntityType::Products),
            "ORDER_ACKNOWLEDGEMENTS" => Some(DocumentEntityType::OrderAcknowledgements),
            "COMMISSION_STATEMENTS" => Some(DocumentEntityType::CommissionStatements),
            "DELIVERIES" => Some(DocumentEntityType::Deliveries),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            DocumentEntityType::Orders => "ORDERS",
            DocumentEntityType::Invoices => "INVOICES",
            DocumentEntityType::Checks => "CHECKS",
            DocumentEntityType::Credits => "CREDITS",
            DocumentEntityType::Adjustments => "ADJUSTMENTS",
            DocumentEntityType::Quotes => "QUOTES",
            DocumentEntityType::Customers => "CUSTOMERS",
            DocumentEntityType::Factories => "FACTORIES",
            DocumentEntityType::Products => "PRODUCTS",
            DocumentEntityType::OrderAcknowledgements => "ORDER_ACKNOWLEDGEMENTS",
            DocumentEntityType::CommissionStatements => "COMMISSION_STATEMENTS",
            DocumentEntityType::Deliveries => "DELIVERIES",
        }
    }

    /// 映射到文件链接目标类型
    ///
    /// # 返回
    /// - Some(LinkTargetType): 该文档类型创建的实体需要建立文件链接
    /// - None: 该文档类型不建立链接
    pub fn link_target(&self) -> Option<LinkTargetType> {
        match self {
            DocumentEntityType::Quotes => Some(LinkTargetType::Quote),
            DocumentEntityType::Orders => Some(LinkTargetType::Order),
            DocumentEntityType::Invoices => Some(LinkTargetType::Invoice),
            DocumentEntityType::Checks => Some(LinkTargetType::Check),
            DocumentEntityType::Customers => Some(LinkTargetType::Customer),
            DocumentEntityType::Factories => Some(LinkTargetType::Factory),
            DocumentEntityType::Products => Some(LinkTargetType::Product),
            DocumentEntityType::OrderAcknowledgements => {
                Some(LinkTargetType::OrderAcknowledgement)
            }
            _ => None,
        }
    }
}

// ==========================================
// 工作流状态 (Workflow Status)
// ==========================================
// 红线: IN_PROGRESS → {COMPLETED, FAILED} 每次执行只发生一次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    InProgress, // 执行中
    Completed,  // 已完成
    Failed,     // 已失败
    Paused,     // 已暂停
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl WorkflowStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "COMPLETED" => WorkflowStatus::Completed,
            "FAILED" => WorkflowStatus::Failed,
            "PAUSED" => WorkflowStatus::Paused,
            _ => WorkflowStatus::InProgress,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            WorkflowStatus::InProgress => "IN_PROGRESS",
            WorkflowStatus::Completed => "COMPLETED",
            WorkflowStatus::Failed => "FAILED",
            WorkflowStatus::Paused => "PAUSED",
        }
    }
}

// ==========================================
// 待定实体类型 (Pending Entity Type)
// ==========================================
// 用途: PendingEntity.entity_type, 决定映射落入 EntityMapping 的哪个字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingEntityType {
    Factories,       // 厂商
    Customers,       // 客户（售达方）
    BillToCustomers, // 客户（开票方）
    Products,        // 产品（行级）
    EndUsers,        // 最终用户（行级）
    Orders,          // 订单
    Invoices,        // 发票
    Credits,         // 贷项
    Adjustments,     // 调整
}

impl fmt::Display for PendingEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl PendingEntityType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "FACTORIES" => Some(PendingEntityType::Factories),
            "CUSTOMERS" => Some(PendingEntityType::Customers),
            "BILL_TO_CUSTOMERS" => Some(PendingEntityType::BillToCustomers),
            "PRODUCTS" => Some(PendingEntityType::Products),
            "END_USERS" => Some(PendingEntityType::EndUsers),
            "ORDERS" => Some(PendingEntityType::Orders),
            "INVOICES" => Some(PendingEntityType::Invoices),
            "CREDITS" => Some(PendingEntityType::Credits),
            "ADJUSTMENTS" => Some(PendingEntityType::Adjustments),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            PendingEntityType::Factories => "FACTORIES",
            PendingEntityType::Customers => "CUSTOMERS",
            PendingEntityType::BillToCustomers => "BILL_TO_CUSTOMERS",
            PendingEntityType::Products => "PRODUCTS",
            PendingEntityType::EndUsers => "END_USERS",
            PendingEntityType::Orders => "ORDERS",
            PendingEntityType::Invoices => "INVOICES",
            PendingEntityType::Credits => "CREDITS",
            PendingEntityType::Adjustments => "ADJUSTMENTS",
        }
    }
}

// ==========================================
// 确认状态 (Confirmation Status)
// ==========================================
// 不变式:
// - CONFIRMED / AUTO_MATCHED / CREATED_NEW ⇒ best_match_id 必须存在
// - SET_FOR_CREATION ⇒ extracted_data 必须存在
// - SKIPPED ⇒ 两者皆可为空
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmationStatus {
    Confirmed,      // 用户确认匹配
    AutoMatched,    // 系统自动匹配
    CreatedNew,     // 已新建（执行前）
    Skipped,        // 用户跳过
    SetForCreation, // 待执行时新建
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ConfirmationStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CONFIRMED" => Some(ConfirmationStatus::Confirmed),
            "AUTO_MATCHED" => Some(ConfirmationStatus::AutoMatched),
            "CREATED_NEW" => Some(ConfirmationStatus::CreatedNew),
            "SKIPPED" => Some(ConfirmationStatus::Skipped),
            "SET_FOR_CREATION" => Some(ConfirmationStatus::SetForCreation),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ConfirmationStatus::Confirmed => "CONFIRMED",
            ConfirmationStatus::AutoMatched => "AUTO_MATCHED",
            ConfirmationStatus::CreatedNew => "CREATED_NEW",
            ConfirmationStatus::Skipped => "SKIPPED",
            ConfirmationStatus::SetForCreation => "SET_FOR_CREATION",
        }
    }

    /// 该状态是否携带已解析的实体 id（用于映射折叠）
    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            ConfirmationStatus::Confirmed
                | ConfirmationStatus::AutoMatched
                | ConfirmationStatus::CreatedNew
        )
    }
}

// ==========================================
// 处理记录状态 (Processing Status)
// ==========================================
// 不变式: CREATED ⇔ entity_id 存在; SKIPPED/ERROR ⇒ entity_id 为空
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    Created, // 已创建实体
    Skipped, // 跳过（用户跳过或重复）
    Error,   // 转换/创建失败
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ProcessingStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "CREATED" => ProcessingStatus::Created,
            "SKIPPED" => ProcessingStatus::Skipped,
            _ => ProcessingStatus::Error,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Created => "CREATED",
            ProcessingStatus::Skipped => "SKIPPED",
            ProcessingStatus::Error => "ERROR",
        }
    }
}

// ==========================================
// 文件链接类型 (Link Source / Target Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkSourceType {
    File, // 源文件
}

impl LinkSourceType {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            LinkSourceType::File => "FILE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkTargetType {
    Quote,
    Order,
    Invoice,
    Check,
    Customer,
    Factory,
    Product,
    OrderAcknowledgement,
}

impl fmt::Display for LinkTargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl LinkTargetType {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            LinkTargetType::Quote => "QUOTE",
            LinkTargetType::Order => "ORDER",
            LinkTargetType::Invoice => "INVOICE",
            LinkTargetType::Check => "CHECK",
            LinkTargetType::Customer => "CUSTOMER",
            LinkTargetType::Factory => "FACTORY",
            LinkTargetType::Product => "PRODUCT",
            LinkTargetType::OrderAcknowledgement => "ORDER_ACKNOWLEDGEMENT",
        }
    }
}

// ==========================================
// 订单行状态 (Order Detail Status)
// ==========================================
// 用途: 模糊行匹配的 open_status 谓词
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderDetailStatus {
    Open,   // 未结清（仍有待发货余量）
    Closed, // 已结清
}

impl fmt::Display for OrderDetailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl OrderDetailStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "CLOSED" => OrderDetailStatus::Closed,
            _ => OrderDetailStatus::Open,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderDetailStatus::Open => "OPEN",
            OrderDetailStatus::Closed => "CLOSED",
        }
    }
}

// ==========================================
// 调整分摊方式 (Allocation Method)
// ==========================================
// 规则: 有客户映射 → CUSTOMER; 否则 REP_SPLIT（操作用户 100%）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationMethod {
    Customer, // 按客户分摊
    RepSplit, // 按代表分成
}

impl fmt::Display for AllocationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl AllocationMethod {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "CUSTOMER" => AllocationMethod::Customer,
            _ => AllocationMethod::RepSplit,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            AllocationMethod::Customer => "CUSTOMER",
            AllocationMethod::RepSplit => "REP_SPLIT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_entity_type_roundtrip() {
        for s in [
            "ORDERS",
            "INVOICES",
            "CHECKS",
            "CREDITS",
            "ADJUSTMENTS",
            "QUOTES",
            "CUSTOMERS",
            "FACTORIES",
            "PRODUCTS",
            "ORDER_ACKNOWLEDGEMENTS",
            "COMMISSION_STATEMENTS",
            "DELIVERIES",
        ] {
            let parsed = DocumentEntityType::parse(s).expect("should parse");
            assert_eq!(parsed.to_db_str(), s);
        }
        assert!(DocumentEntityType::parse("UNKNOWN").is_none());
    }

    #[test]
    fn test_link_target_mapping() {
        assert_eq!(
            DocumentEntityType::Orders.link_target(),
            Some(LinkTargetType::Order)
        );
        assert_eq!(
            DocumentEntityType::OrderAcknowledgements.link_target(),
            Some(LinkTargetType::OrderAcknowledgement)
        );
        // 贷项/调整/结算单/发货单不建立文件链接
        assert_eq!(DocumentEntityType::Credits.link_target(), None);
        assert_eq!(DocumentEntityType::Adjustments.link_target(), None);
        assert_eq!(DocumentEntityType::CommissionStatements.link_target(), None);
        assert_eq!(DocumentEntityType::Deliveries.link_target(), None);
    }

    #[test]
    fn test_confirmation_status_resolved() {
        assert!(ConfirmationStatus::Confirmed.is_resolved());
        assert!(ConfirmationStatus::AutoMatched.is_resolved());
        assert!(ConfirmationStatus::CreatedNew.is_resolved());
        assert!(!ConfirmationStatus::Skipped.is_resolved());
        assert!(!ConfirmationStatus::SetForCreation.is_resolved());
    }
}
