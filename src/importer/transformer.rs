// ==========================================
// 供应商价格表同步系统 - 字段变换器
// ==========================================
// 职责: 对标准字段值执行配置化变换（纯函数）
// 失败语义: 单字段变换失败只影响该字段（调用方置空并记 warning），
//           不中断所在行
// ==========================================

use crate::config::TransformSpec;
use crate::importer::error::{ImportError, ImportResult};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// 对单个字段值应用变换
///
/// # 参数
/// - field: 标准字段名（仅用于报错定位）
/// - value: 原始字段值
/// - spec: 变换配置
///
/// # 返回
/// - Ok(String): 变换后的值
/// - Err(ImportError::TransformError): 变换失败（调用方置空该字段）
pub fn apply_transform(field: &str, value: &str, spec: &TransformSpec) -> ImportResult<String> {
    match spec {
        TransformSpec::Divide { divisor } => divide(field, value, *divisor),
        TransformSpec::Date { input_format } => reformat_date(field, value, input_format),
        TransformSpec::Substring { start, length } => Ok(substring(value, *start, *length)),
        TransformSpec::TrimZeros => Ok(trim_leading_zeros(value)),
    }
}

/// 数值缩小: 精确十进制除法（如 "1000" ÷ 100 → "10"）
fn divide(field: &str, value: &str, divisor: u32) -> ImportResult<String> {
    if divisor == 0 {
        return Err(ImportError::TransformError {
            field: field.to_string(),
            message: "除数不能为 0".to_string(),
        });
    }

    let amount = Decimal::from_str(value.trim()).map_err(|_| ImportError::TransformError {
        field: field.to_string(),
        message: format!("无法解析为数值: {}", value),
    })?;

    let result = amount / Decimal::from(divisor);
    Ok(result.normalize().to_string())
}

/// 日期重格式化: 按 input_format 解析，输出 ISO-8601 (YYYY-MM-DD)
fn reformat_date(field: &str, value: &str, input_format: &str) -> ImportResult<String> {
    let date = NaiveDate::parse_from_str(value.trim(), input_format).map_err(|_| {
        ImportError::TransformError {
            field: field.to_string(),
            message: format!("日期格式错误: 期望 {}, 实际 {}", input_format, value),
        }
    })?;
    Ok(date.format("%Y-%m-%d").to_string())
}

/// 取子串（按字符计，越界截断）
fn substring(value: &str, start: usize, length: usize) -> String {
    value.chars().skip(start).take(length).collect()
}

/// 去除前导零；全零串保留单个 "0"
fn trim_leading_zeros(value: &str) -> String {
    let trimmed = value.trim().trim_start_matches('0');
    if trimmed.is_empty() && !value.trim().is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divide_cents_to_currency() {
        let spec = TransformSpec::Divide { divisor: 100 };
        assert_eq!(apply_transform("cost_price", "1000", &spec).unwrap(), "10");
        assert_eq!(apply_transform("cost_price", "1050", &spec).unwrap(), "10.5");
    }

    #[test]
    fn test_divide_invalid_number() {
        let spec = TransformSpec::Divide { divisor: 100 };
        assert!(apply_transform("cost_price", "abc", &spec).is_err());
    }

    #[test]
    fn test_divide_by_zero_rejected() {
        let spec = TransformSpec::Divide { divisor: 0 };
        assert!(apply_transform("cost_price", "1000", &spec).is_err());
    }

    #[test]
    fn test_date_reformat() {
        let spec = TransformSpec::Date {
            input_format: "%d.%m.%Y".to_string(),
        };
        assert_eq!(
            apply_transform("effective", "20.01.2026", &spec).unwrap(),
            "2026-01-20"
        );
    }

    #[test]
    fn test_date_invalid_value() {
        let spec = TransformSpec::Date {
            input_format: "%Y%m%d".to_string(),
        };
        assert!(apply_transform("effective", "not-a-date", &spec).is_err());
    }

    #[test]
    fn test_substring() {
        let spec = TransformSpec::Substring { start: 2, length: 3 };
        assert_eq!(apply_transform("sku", "XX12345", &spec).unwrap(), "123");
        // 越界截断
        assert_eq!(apply_transform("sku", "XX1", &spec).unwrap(), "1");
    }

    #[test]
    fn test_trim_zeros() {
        let spec = TransformSpec::TrimZeros;
        assert_eq!(apply_transform("sku", "000123", &spec).unwrap(), "123");
        assert_eq!(apply_transform("sku", "0000", &spec).unwrap(), "0");
        assert_eq!(apply_transform("sku", "123", &spec).unwrap(), "123");
    }
}
