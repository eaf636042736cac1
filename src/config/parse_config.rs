// ==========================================
// 供应商价格表同步系统 - 解析语法配置
// ==========================================
// 职责: 描述一份价格文件怎么解析（格式/分隔符/定宽列/字段变换）
// 约束: 定宽格式必须给出非空列定义；分隔符格式的分隔符与引号
//       必须是单个 ASCII 字符
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::types::ParseFormat;

/// 列映射: 源列名 → 标准字段名
///
/// 未映射的源列丢弃；源文件中不存在的标准字段保持缺省（不报错）
pub type ColumnMapping = HashMap<String, String>;

// ===== 标准字段名全集 =====
pub const FIELD_SUPPLIER_SKU: &str = "supplier_sku";
pub const FIELD_VARIANT_SKU: &str = "variant_sku";
pub const FIELD_COST_PRICE: &str = "cost_price";
pub const FIELD_CURRENCY_CODE: &str = "currency_code";
pub const FIELD_QUANTITY: &str = "quantity";
pub const FIELD_LEAD_TIME_DAYS: &str = "lead_time_days";
pub const FIELD_DESCRIPTION: &str = "description";

// ==========================================
// FixedWidthColumn - 定宽列定义
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedWidthColumn {
    pub name: String,
    pub start_offset: usize, // 起始字符偏移（按字符计，非字节）
    pub width: usize,
}

// ==========================================
// TransformSpec - 字段变换
// ==========================================
// 以带标签的和类型建模，未知变换种类在反序列化期即失败，
// 不做运行期字符串分发
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformSpec {
    /// 数值缩小（如整数分值 → 十进制货币）
    Divide { divisor: u32 },
    /// 按指定格式解析日期，输出 ISO-8601（失败置空）
    Date { input_format: String },
    /// 取子串（按字符计）
    Substring { start: usize, length: usize },
    /// 去除数值串的前导零
    TrimZeros,
}

// ==========================================
// ParseConfig - 解析语法
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseConfig {
    pub format: ParseFormat,

    /// 分隔符（单 ASCII 字符）；None 时按逗号处理，
    /// 预览服务在 None 时执行自动探测
    #[serde(default)]
    pub delimiter: Option<char>,

    /// 引号字符（默认双引号）
    #[serde(default = "default_quote_char")]
    pub quote_char: char,

    /// 首个数据行之前是否有表头行
    #[serde(default)]
    pub has_header: bool,

    /// 表头之前跳过的行数
    #[serde(default)]
    pub skip_rows: usize,

    /// 定宽列定义（定宽格式必填）
    #[serde(default)]
    pub fixed_width_columns: Vec<FixedWidthColumn>,

    /// 标准字段名 → 变换
    #[serde(default)]
    pub transformations: HashMap<String, TransformSpec>,
}

fn default_quote_char() -> char {
    '"'
}

pub const DEFAULT_DELIMITER: char = ',';

impl ParseConfig {
    /// 分隔符格式的缺省配置
    pub fn delimited(delimiter: Option<char>, has_header: bool) -> Self {
        Self {
            format: ParseFormat::Delimited,
            delimiter,
            quote_char: default_quote_char(),
            has_header,
            skip_rows: 0,
            fixed_width_columns: Vec::new(),
            transformations: HashMap::new(),
        }
    }

    /// 定宽格式的缺省配置
    pub fn fixed_width(columns: Vec<FixedWidthColumn>) -> Self {
        Self {
            format: ParseFormat::FixedWidth,
            delimiter: None,
            quote_char: default_quote_char(),
            has_header: false,
            skip_rows: 0,
            fixed_width_columns: columns,
            transformations: HashMap::new(),
        }
    }

    /// 实际使用的分隔符（缺省逗号）
    pub fn effective_delimiter(&self) -> char {
        self.delimiter.unwrap_or(DEFAULT_DELIMITER)
    }

    /// 校验配置不变式
    ///
    /// # 返回
    /// - Ok(()): 合法
    /// - Err(String): 违规描述
    pub fn validate(&self) -> Result<(), String> {
        match self.format {
            ParseFormat::FixedWidth => {
                if self.fixed_width_columns.is_empty() {
                    return Err("定宽格式必须提供非空的列定义".to_string());
                }
                for col in &self.fixed_width_columns {
                    if col.width == 0 {
                        return Err(format!("定宽列 {} 的宽度不能为 0", col.name));
                    }
                }
            }
            ParseFormat::Delimited => {
                let delim = self.effective_delimiter();
                if !delim.is_ascii() {
                    return Err(format!("分隔符必须是单个 ASCII 字符: {:?}", delim));
                }
                if !self.quote_char.is_ascii() {
                    return Err(format!("引号字符必须是单个 ASCII 字符: {:?}", self.quote_char));
                }
            }
        }
        Ok(())
    }
}
