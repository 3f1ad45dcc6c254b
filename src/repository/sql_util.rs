// ==========================================
// 销售佣金 CRM - 仓储层 SQL 工具
// ==========================================
// 职责: Decimal / NaiveDate 与 TEXT 列的统一往返
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Decimal → TEXT（必填列）
pub fn dec_to_sql(v: Decimal) -> String {
    v.to_string()
}

/// Option<Decimal> → Option<TEXT>
pub fn dec_opt_to_sql(v: Option<Decimal>) -> Option<String> {
    v.map(|d| d.to_string())
}

/// TEXT → Decimal（必填列）
pub fn dec_from_sql(raw: &str) -> RepositoryResult<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|e| RepositoryError::FieldValueError {
        field: "decimal".to_string(),
        message: format!("无法解析 {raw}: {e}"),
    })
}

/// Option<TEXT> → Option<Decimal>（解析失败按列值错误处理）
pub fn dec_opt_from_sql(raw: Option<String>) -> RepositoryResult<Option<Decimal>> {
    match raw {
        Some(s) => dec_from_sql(&s).map(Some),
        None => Ok(None),
    }
}

/// NaiveDate → TEXT (ISO YYYY-MM-DD)
pub fn date_opt_to_sql(v: Option<NaiveDate>) -> Option<String> {
    v.map(|d| d.format("%Y-%m-%d").to_string())
}

/// Option<TEXT> → Option<NaiveDate>
pub fn date_opt_from_sql(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_roundtrip() {
        let v = dec!(123.45);
        assert_eq!(dec_from_sql(&dec_to_sql(v)).unwrap(), v);
    }

    #[test]
    fn test_date_roundtrip() {
        let d = NaiveDate::from_ymd_opt(2026, 8, 26);
        assert_eq!(date_opt_from_sql(date_opt_to_sql(d)), d);
    }
}
