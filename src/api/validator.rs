// ==========================================
// 生鲜配送拣选系统 - 请求校验器
// ==========================================
// 职责: 作用域/标识参数的前置校验
// 红线: 无效作用域请求在触碰存储之前即拒绝
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use chrono::NaiveDate;

/// 标识字段最大长度 (仓配中心/班次/拣选员等)
const MAX_IDENT_LEN: usize = 64;

/// 列表单页上限
pub const MAX_PAGE_SIZE: i64 = 500;

// ==========================================
// ScopeValidator - 作用域校验器
// ==========================================
pub struct ScopeValidator;

impl ScopeValidator {
    /// 校验仓配中心代码 (非空, 长度受限, 字符集受限)
    pub fn validate_work_center(work_center: &str) -> ApiResult<()> {
        Self::validate_ident("work_center", work_center)
    }

    /// 校验班次名称
    pub fn validate_shift_name(shift_name: &str) -> ApiResult<()> {
        Self::validate_ident("shift_name", shift_name)
    }

    /// 校验拣选员 ID
    pub fn validate_picker_id(picker_id: &str) -> ApiResult<()> {
        Self::validate_ident("picker_id", picker_id)
    }

    /// 校验操作人 ID
    pub fn validate_actor(actor: &str) -> ApiResult<()> {
        Self::validate_ident("actor", actor)
    }

    /// 解析班次日期 (格式 YYYY-MM-DD, 格式错误即拒绝)
    pub fn parse_shift_date(raw: &str) -> ApiResult<NaiveDate> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
            ApiError::InvalidInput(format!("shift_date 格式错误 (应为 YYYY-MM-DD): {}", raw))
        })
    }

    /// 校验分页参数
    pub fn validate_pagination(limit: i64, offset: i64) -> ApiResult<()> {
        if limit <= 0 || limit > MAX_PAGE_SIZE {
            return Err(ApiError::InvalidInput(format!(
                "limit 必须在 1~{} 之间: {}",
                MAX_PAGE_SIZE, limit
            )));
        }
        if offset < 0 {
            return Err(ApiError::InvalidInput(format!(
                "offset 不允许为负数: {}",
                offset
            )));
        }
        Ok(())
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn validate_ident(field: &str, value: &str) -> ApiResult<()> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ApiError::InvalidInput(format!("{} 不允许为空", field)));
        }
        if trimmed.len() > MAX_IDENT_LEN {
            return Err(ApiError::InvalidInput(format!(
                "{} 超过最大长度 {}: {}",
                field, MAX_IDENT_LEN, trimmed
            )));
        }
        let valid_charset = trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_charset {
            return Err(ApiError::InvalidInput(format!(
                "{} 只允许字母/数字/短横线/下划线: {}",
                field, trimmed
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_center_validation() {
        assert!(ScopeValidator::validate_work_center("WC01").is_ok());
        assert!(ScopeValidator::validate_work_center("wc-01_a").is_ok());

        assert!(ScopeValidator::validate_work_center("").is_err());
        assert!(ScopeValidator::validate_work_center("   ").is_err());
        assert!(ScopeValidator::validate_work_center("WC 01").is_err());
        assert!(ScopeValidator::validate_work_center("WC01; DROP TABLE").is_err());
        assert!(ScopeValidator::validate_work_center(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_shift_date_parse() {
        assert_eq!(
            ScopeValidator::parse_shift_date("2026-08-07").unwrap(),
            NaiveDate::from_ymd_opt(2026, 8, 7).unwrap()
        );
        assert!(ScopeValidator::parse_shift_date("2026/08/07").is_err());
        assert!(ScopeValidator::parse_shift_date("2026-13-01").is_err());
        assert!(ScopeValidator::parse_shift_date("not-a-date").is_err());
    }

    #[test]
    fn test_pagination_bounds() {
        assert!(ScopeValidator::validate_pagination(100, 0).is_ok());
        assert!(ScopeValidator::validate_pagination(0, 0).is_err());
        assert!(ScopeValidator::validate_pagination(501, 0).is_err());
        assert!(ScopeValidator::validate_pagination(10, -1).is_err());
    }
}
