// ==========================================
// 供应商价格表同步系统 - 字段映射器
// ==========================================
// 职责: 源列名 → 标准字段映射 + 字段变换 + 类型转换
// 顺序: 先重命名/丢弃，再对标准字段施加变换，最后转强类型记录
// 失败语义: 字段级失败置空该字段并记 warning，整行继续
// ==========================================

use crate::config::{
    ColumnMapping, TransformSpec, FIELD_COST_PRICE, FIELD_CURRENCY_CODE, FIELD_DESCRIPTION,
    FIELD_LEAD_TIME_DAYS, FIELD_QUANTITY, FIELD_SUPPLIER_SKU, FIELD_VARIANT_SKU,
};
use crate::domain::price_list::RawPriceRecord;
use crate::importer::line_parser::ParsedRow;
use crate::importer::transformer::apply_transform;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

/// 货币最小单位换算因子（两位小数币种）
const MINOR_UNITS_PER_MAJOR: i64 = 100;

// ==========================================
// MappedRow - 映射后的单行（仍为字符串值）
// ==========================================
#[derive(Debug, Clone)]
pub struct MappedRow {
    pub line_number: usize,
    pub fields: HashMap<String, String>,
    pub warnings: Vec<String>,
}

/// 对解析行序列执行映射 + 变换
pub fn map_rows(
    rows: &[ParsedRow],
    mapping: &ColumnMapping,
    transformations: &HashMap<String, TransformSpec>,
) -> Vec<MappedRow> {
    rows.iter()
        .map(|row| map_row(row, mapping, transformations))
        .collect()
}

/// 映射单行: 重命名/丢弃 → 变换
///
/// 未映射的源列丢弃；映射目标在源中缺失不报错；
/// 变换失败置空该字段并追加 warning
pub fn map_row(
    row: &ParsedRow,
    mapping: &ColumnMapping,
    transformations: &HashMap<String, TransformSpec>,
) -> MappedRow {
    let mut fields = HashMap::new();
    let mut warnings = Vec::new();

    // 步骤 1: 列重命名（未映射列丢弃）
    for (source_column, canonical) in mapping {
        if let Some(value) = row.fields.get(source_column) {
            fields.insert(canonical.clone(), value.clone());
        }
    }

    // 步骤 2: 标准字段变换
    for (canonical, spec) in transformations {
        let Some(value) = fields.get(canonical).cloned() else {
            continue;
        };
        match apply_transform(canonical, &value, spec) {
            Ok(transformed) => {
                fields.insert(canonical.clone(), transformed);
            }
            Err(e) => {
                warnings.push(format!("第 {} 行: {}", row.line_number, e));
                fields.remove(canonical);
            }
        }
    }

    MappedRow {
        line_number: row.line_number,
        fields,
        warnings,
    }
}

/// 映射行 → 强类型导入记录
///
/// 动态边界到此为止: 此后的管道只操作强类型结构
pub fn to_raw_record(row: &MappedRow) -> RawPriceRecord {
    let mut warnings = row.warnings.clone();

    let cost_price_minor = match row.fields.get(FIELD_COST_PRICE) {
        None => None,
        Some(raw) => match parse_money_minor(raw) {
            Ok(minor) => Some(minor),
            Err(msg) => {
                warnings.push(format!(
                    "第 {} 行: 字段 {} {}",
                    row.line_number, FIELD_COST_PRICE, msg
                ));
                None
            }
        },
    };

    let quantity = parse_optional_i32(row, FIELD_QUANTITY, &mut warnings);
    let lead_time_days = parse_optional_i32(row, FIELD_LEAD_TIME_DAYS, &mut warnings);

    RawPriceRecord {
        supplier_sku: non_empty(row.fields.get(FIELD_SUPPLIER_SKU)),
        variant_sku: non_empty(row.fields.get(FIELD_VARIANT_SKU)),
        cost_price_minor,
        currency_code: non_empty(row.fields.get(FIELD_CURRENCY_CODE))
            .map(|c| c.to_uppercase()),
        quantity,
        lead_time_days,
        description: non_empty(row.fields.get(FIELD_DESCRIPTION)),
        row_number: row.line_number,
        warnings,
    }
}

/// 十进制金额串 → 最小货币单位
///
/// 精确计算（不经过浮点）；负数与超出最小单位精度的值拒绝
pub fn parse_money_minor(value: &str) -> Result<i64, String> {
    let amount = Decimal::from_str(value.trim())
        .map_err(|_| format!("无法解析为金额: {}", value))?;

    if amount.is_sign_negative() {
        return Err(format!("金额不能为负: {}", value));
    }

    let scaled = amount * Decimal::from(MINOR_UNITS_PER_MAJOR);
    if scaled.fract() != Decimal::ZERO {
        return Err(format!("金额精度超过最小货币单位: {}", value));
    }

    scaled
        .to_i64()
        .ok_or_else(|| format!("金额超出可表示范围: {}", value))
}

fn parse_optional_i32(row: &MappedRow, field: &str, warnings: &mut Vec<String>) -> Option<i32> {
    let raw = non_empty(row.fields.get(field))?;
    match raw.parse::<i32>() {
        Ok(n) => Some(n),
        Err(_) => {
            warnings.push(format!(
                "第 {} 行: 字段 {} 无法解析为整数: {}",
                row.line_number, field, raw
            ));
            None
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformSpec;

    fn parsed_row(pairs: &[(&str, &str)]) -> ParsedRow {
        ParsedRow {
            line_number: 2,
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn mapping(pairs: &[(&str, &str)]) -> ColumnMapping {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_map_row_rename_and_drop() {
        let row = parsed_row(&[("PARTNO", "A1"), ("PRICE", "10.00"), ("IGNORED", "x")]);
        let mapping = mapping(&[("PARTNO", "supplier_sku"), ("PRICE", "cost_price")]);

        let mapped = map_row(&row, &mapping, &HashMap::new());
        assert_eq!(mapped.fields.get("supplier_sku"), Some(&"A1".to_string()));
        assert_eq!(mapped.fields.get("cost_price"), Some(&"10.00".to_string()));
        // 未映射的源列丢弃
        assert!(!mapped.fields.contains_key("IGNORED"));
    }

    #[test]
    fn test_map_row_missing_source_column_not_error() {
        let row = parsed_row(&[("PARTNO", "A1")]);
        let mapping = mapping(&[("PARTNO", "supplier_sku"), ("PRICE", "cost_price")]);

        let mapped = map_row(&row, &mapping, &HashMap::new());
        assert!(mapped.fields.get("cost_price").is_none());
        assert!(mapped.warnings.is_empty());
    }

    #[test]
    fn test_map_row_transform_failure_nulls_field() {
        let row = parsed_row(&[("PARTNO", "A1"), ("PRICE", "oops")]);
        let mapping = mapping(&[("PARTNO", "supplier_sku"), ("PRICE", "cost_price")]);
        let mut transforms = HashMap::new();
        transforms.insert(
            "cost_price".to_string(),
            TransformSpec::Divide { divisor: 100 },
        );

        let mapped = map_row(&row, &mapping, &transforms);
        // 字段被置空，行未中断
        assert!(mapped.fields.get("cost_price").is_none());
        assert_eq!(mapped.fields.get("supplier_sku"), Some(&"A1".to_string()));
        assert_eq!(mapped.warnings.len(), 1);
    }

    #[test]
    fn test_to_raw_record_money_minor_units() {
        let row = parsed_row(&[("PARTNO", "A1"), ("PRICE", "10.50")]);
        let mapping = mapping(&[("PARTNO", "supplier_sku"), ("PRICE", "cost_price")]);

        let mapped = map_row(&row, &mapping, &HashMap::new());
        let record = to_raw_record(&mapped);
        assert_eq!(record.supplier_sku, Some("A1".to_string()));
        assert_eq!(record.cost_price_minor, Some(1050));
    }

    #[test]
    fn test_parse_money_minor_rejects_negative_and_precision() {
        assert!(parse_money_minor("-1.00").is_err());
        assert!(parse_money_minor("1.005").is_err());
        assert_eq!(parse_money_minor("0").unwrap(), 0);
        assert_eq!(parse_money_minor("10").unwrap(), 1000);
    }

    #[test]
    fn test_to_raw_record_bad_quantity_warns() {
        let row = parsed_row(&[("PARTNO", "A1"), ("QTY", "many")]);
        let mapping = mapping(&[("PARTNO", "supplier_sku"), ("QTY", "quantity")]);

        let mapped = map_row(&row, &mapping, &HashMap::new());
        let record = to_raw_record(&mapped);
        assert_eq!(record.quantity, None);
        assert_eq!(record.warnings.len(), 1);
    }
}
