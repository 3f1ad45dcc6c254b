// ==========================================
// 销售佣金 CRM - 模糊字符串相似度
// ==========================================
// 口径: 0-100 整数, 大小写不敏感
// 实现: strsim 归一化 Levenshtein
// ==========================================

/// 计算两个字符串的相似度（0-100）
///
/// # 规则
/// - 大小写不敏感, 两端空白不参与比较
/// - 任一侧为空 → 0
pub fn ratio(a: &str, b: &str) -> u8 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    (strsim::normalized_levenshtein(&a, &b) * 100.0).round() as u8
}

/// Option 版本: 任一侧缺失 → 0
pub fn ratio_opt(a: Option<&str>, b: Option<&str>) -> u8 {
    match (a, b) {
        (Some(a), Some(b)) => ratio(a, b),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_ignores_case() {
        assert_eq!(ratio("ABC-123", "abc-123"), 100);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(ratio("", "abc"), 0);
        assert_eq!(ratio_opt(None, Some("abc")), 0);
    }

    #[test]
    fn test_similar_above_threshold() {
        // 单字符差异的长零件号应当仍然高于 88 阈值
        assert!(ratio("ABC-12345", "ABC-12346") >= 88);
    }

    #[test]
    fn test_dissimilar_below_threshold() {
        assert!(ratio("ABC-123", "XYZ-999") < 88);
    }
}
