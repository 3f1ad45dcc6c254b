// ==========================================
// 销售佣金 CRM - 引擎层
// ==========================================
// 职责: 纯业务规则（不落库、不编排）
// ==========================================

pub mod detail_matcher;
pub mod fuzzy;

pub use detail_matcher::{IncomingLine, OrderDetailMatcher};
