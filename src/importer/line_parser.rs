// ==========================================
// 供应商价格表同步系统 - 行解析器
// ==========================================
// 职责: 原始文件文本 → 有序的 字段名→值 行记录
// 纯函数: 相同输入 + 相同配置恒产出相同输出，无隐藏状态
// 支持: 分隔符文件（引号内分隔符/转义引号 "" 均正确处理）、定宽列文件
// ==========================================

use crate::config::{FixedWidthColumn, ParseConfig};
use crate::domain::types::ParseFormat;
use crate::importer::error::{ImportError, ImportResult};
use std::collections::HashMap;

// ==========================================
// ParsedRow - 解析后的单行
// ==========================================
#[derive(Debug, Clone)]
pub struct ParsedRow {
    /// 原始文件行号（1 起，用于行级报错定位）
    pub line_number: usize,
    /// 字段名 → 值（值已 trim）
    pub fields: HashMap<String, String>,
}

// ==========================================
// ParseOutput - 解析结果
// ==========================================
// 列数不匹配的行计入 errors 并从 rows 中排除，不中断整批
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub headers: Vec<String>,
    pub rows: Vec<ParsedRow>,
    pub errors: Vec<String>,
}

/// 解析价格文件文本
///
/// # 参数
/// - raw_text: 文件全文
/// - config: 解析语法（须通过 validate）
///
/// # 返回
/// - Ok(ParseOutput): 行记录 + 行级错误
/// - Err(ImportError::InvalidParseConfig): 配置非法（致命）
pub fn parse(raw_text: &str, config: &ParseConfig) -> ImportResult<ParseOutput> {
    config
        .validate()
        .map_err(ImportError::InvalidParseConfig)?;

    match config.format {
        ParseFormat::Delimited => parse_delimited(raw_text, config),
        ParseFormat::FixedWidth => Ok(parse_fixed_width(raw_text, config)),
    }
}

// ==========================================
// 分隔符模式
// ==========================================
fn parse_delimited(raw_text: &str, config: &ParseConfig) -> ImportResult<ParseOutput> {
    let delimiter = config.effective_delimiter();
    let quote = config.quote_char;

    // 按换行拆分，剔除空白行，保留原始行号
    let lines: Vec<(usize, &str)> = non_blank_lines(raw_text)
        .skip(config.skip_rows)
        .collect();

    let mut output = ParseOutput::default();
    let mut data_lines = lines.into_iter();

    // 表头: 显式表头行，或由首个数据行列数合成 col_0..col_n
    if config.has_header {
        match data_lines.next() {
            Some((line_no, line)) => match split_delimited_line(line, delimiter, quote) {
                Ok(fields) => output.headers = fields,
                Err(e) => {
                    return Err(ImportError::ParseError {
                        row: line_no,
                        message: format!("表头解析失败: {}", e),
                    })
                }
            },
            None => return Ok(output), // 跳行之后文件为空
        }
    }

    for (line_no, line) in data_lines {
        let fields = match split_delimited_line(line, delimiter, quote) {
            Ok(fields) => fields,
            Err(e) => {
                output
                    .errors
                    .push(format!("第 {} 行: 行解析失败: {}", line_no, e));
                continue;
            }
        };

        // 无表头模式: 首个数据行确定列数并合成列名
        if output.headers.is_empty() {
            output.headers = (0..fields.len()).map(|i| format!("col_{}", i)).collect();
        }

        if fields.len() != output.headers.len() {
            output.errors.push(format!(
                "第 {} 行: 列数不匹配（期望 {}, 实际 {}），该行已排除",
                line_no,
                output.headers.len(),
                fields.len()
            ));
            continue;
        }

        let mut row_map = HashMap::with_capacity(fields.len());
        for (header, value) in output.headers.iter().zip(fields.into_iter()) {
            row_map.insert(header.clone(), value);
        }

        output.rows.push(ParsedRow {
            line_number: line_no,
            fields: row_map,
        });
    }

    Ok(output)
}

/// 用 csv reader 拆分单行字段
///
/// 引号语义: 引号内的分隔符不拆分；引号内的 "" 产出一个字面引号，
/// 之后正确回到引号外继续拆分
fn split_delimited_line(line: &str, delimiter: char, quote: char) -> Result<Vec<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter as u8)
        .quote(quote as u8)
        .flexible(true)
        .from_reader(line.as_bytes());

    let mut record = csv::StringRecord::new();
    if reader.read_record(&mut record)? {
        Ok(record.iter().map(|f| f.trim().to_string()).collect())
    } else {
        Ok(Vec::new())
    }
}

/// 将字段序列重新序列化为一行分隔符文本
///
/// 含分隔符/引号的字段自动加引号，内部引号按 "" 转义；
/// 与 split_delimited_line 互为往返
pub fn serialize_row(
    fields: &[String],
    delimiter: char,
    quote: char,
) -> ImportResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter as u8)
        .quote(quote as u8)
        .from_writer(Vec::new());

    writer.write_record(fields)?;
    writer
        .flush()
        .map_err(|e| ImportError::CsvParseError(e.to_string()))?;

    let bytes = writer
        .into_inner()
        .map_err(|e| ImportError::CsvParseError(e.to_string()))?;
    let line = String::from_utf8_lossy(&bytes);
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

// ==========================================
// 定宽模式
// ==========================================
// 每个数据行按配置列截取 [start_offset, start_offset+width) 并 trim；
// 不做分隔符探测。has_header=true 时跳过一行表头（列名以配置为准）
fn parse_fixed_width(raw_text: &str, config: &ParseConfig) -> ParseOutput {
    let columns = &config.fixed_width_columns;
    let skip = config.skip_rows + usize::from(config.has_header);

    let mut output = ParseOutput {
        headers: columns.iter().map(|c| c.name.clone()).collect(),
        ..Default::default()
    };

    for (line_no, line) in non_blank_lines(raw_text).skip(skip) {
        let mut row_map = HashMap::with_capacity(columns.len());
        for col in columns {
            row_map.insert(col.name.clone(), extract_fixed_column(line, col));
        }
        output.rows.push(ParsedRow {
            line_number: line_no,
            fields: row_map,
        });
    }

    output
}

/// 按字符（非字节）截取定宽列并去除两端空白；越界部分按空处理
fn extract_fixed_column(line: &str, col: &FixedWidthColumn) -> String {
    line.chars()
        .skip(col.start_offset)
        .take(col.width)
        .collect::<String>()
        .trim()
        .to_string()
}

/// 带原始行号（1 起）的非空白行迭代器
fn non_blank_lines(raw_text: &str) -> impl Iterator<Item = (usize, &str)> {
    raw_text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .filter(|(_, line)| !line.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseConfig;

    fn delimited_config(has_header: bool) -> ParseConfig {
        ParseConfig::delimited(None, has_header)
    }

    #[test]
    fn test_parse_delimited_with_header() {
        let text = "SKU,PRICE\nA1,10.00\nA2,20.00\n";
        let output = parse(text, &delimited_config(true)).unwrap();

        assert_eq!(output.headers, vec!["SKU", "PRICE"]);
        assert_eq!(output.rows.len(), 2);
        assert_eq!(output.rows[0].fields.get("SKU"), Some(&"A1".to_string()));
        assert_eq!(output.rows[1].fields.get("PRICE"), Some(&"20.00".to_string()));
        assert!(output.errors.is_empty());
    }

    #[test]
    fn test_parse_delimited_synthesizes_headers() {
        let text = "A1,10.00\nA2,20.00\n";
        let output = parse(text, &delimited_config(false)).unwrap();

        assert_eq!(output.headers, vec!["col_0", "col_1"]);
        assert_eq!(output.rows[0].fields.get("col_0"), Some(&"A1".to_string()));
    }

    #[test]
    fn test_parse_delimited_quoted_delimiter() {
        // 引号内的逗号不拆分
        let text = "NAME,PRICE\n\"Acme, Inc.\",10.50\n";
        let output = parse(text, &delimited_config(true)).unwrap();

        assert_eq!(output.rows.len(), 1);
        assert_eq!(
            output.rows[0].fields.get("NAME"),
            Some(&"Acme, Inc.".to_string())
        );
        assert_eq!(output.rows[0].fields.get("PRICE"), Some(&"10.50".to_string()));
    }

    #[test]
    fn test_parse_delimited_escaped_quote_resumes() {
        // "" 产出字面引号，之后继续按分隔符拆分
        let text = "NAME,PRICE\n\"5\"\" disk\",3.00\n";
        let output = parse(text, &delimited_config(true)).unwrap();

        assert_eq!(
            output.rows[0].fields.get("NAME"),
            Some(&"5\" disk".to_string())
        );
        assert_eq!(output.rows[0].fields.get("PRICE"), Some(&"3.00".to_string()));
    }

    #[test]
    fn test_parse_delimited_column_mismatch_excluded() {
        let text = "SKU,PRICE\nA1,10.00\nA2,20.00,EXTRA\nA3,30.00\n";
        let output = parse(text, &delimited_config(true)).unwrap();

        assert_eq!(output.rows.len(), 2);
        assert_eq!(output.errors.len(), 1);
        assert!(output.errors[0].contains("第 3 行"));
        assert!(output.errors[0].contains("列数不匹配"));
    }

    #[test]
    fn test_parse_delimited_skip_rows_and_blank_lines() {
        let text = "报价单 2026-08\n\nSKU,PRICE\nA1,10.00\n\n";
        let mut config = delimited_config(true);
        config.skip_rows = 1;

        let output = parse(text, &config).unwrap();
        assert_eq!(output.headers, vec!["SKU", "PRICE"]);
        assert_eq!(output.rows.len(), 1);
    }

    #[test]
    fn test_parse_delimited_semicolon() {
        let text = "SKU;PRICE\nA1;10,00\n";
        let mut config = delimited_config(true);
        config.delimiter = Some(';');

        let output = parse(text, &config).unwrap();
        assert_eq!(output.rows[0].fields.get("PRICE"), Some(&"10,00".to_string()));
    }

    #[test]
    fn test_parse_fixed_width() {
        let text = "A1  1000\nB22  500\n";
        let config = ParseConfig::fixed_width(vec![
            FixedWidthColumn {
                name: "sku".to_string(),
                start_offset: 0,
                width: 4,
            },
            FixedWidthColumn {
                name: "price".to_string(),
                start_offset: 4,
                width: 4,
            },
        ]);

        let output = parse(text, &config).unwrap();
        assert_eq!(output.rows.len(), 2);
        assert_eq!(output.rows[0].fields.get("sku"), Some(&"A1".to_string()));
        assert_eq!(output.rows[0].fields.get("price"), Some(&"1000".to_string()));
        assert_eq!(output.rows[1].fields.get("sku"), Some(&"B22".to_string()));
        assert_eq!(output.rows[1].fields.get("price"), Some(&"500".to_string()));
    }

    #[test]
    fn test_parse_fixed_width_short_line() {
        // 行短于列定义时越界列按空处理
        let text = "A1\n";
        let config = ParseConfig::fixed_width(vec![
            FixedWidthColumn {
                name: "sku".to_string(),
                start_offset: 0,
                width: 4,
            },
            FixedWidthColumn {
                name: "price".to_string(),
                start_offset: 4,
                width: 6,
            },
        ]);

        let output = parse(text, &config).unwrap();
        assert_eq!(output.rows[0].fields.get("sku"), Some(&"A1".to_string()));
        assert_eq!(output.rows[0].fields.get("price"), Some(&"".to_string()));
    }

    #[test]
    fn test_parse_deterministic_restartable() {
        let text = "SKU,PRICE\nA1,10.00\n";
        let config = delimited_config(true);

        let first = parse(text, &config).unwrap();
        let second = parse(text, &config).unwrap();

        assert_eq!(first.headers, second.headers);
        assert_eq!(first.rows.len(), second.rows.len());
        assert_eq!(first.rows[0].fields, second.rows[0].fields);
    }

    #[test]
    fn test_serialize_row_roundtrip() {
        // 内嵌引号内分隔符的字段，解析再序列化后字段保持不变
        let original = "\"Acme, Inc.\",10.50";
        let fields = split_delimited_line(original, ',', '"').unwrap();
        assert_eq!(fields, vec!["Acme, Inc.".to_string(), "10.50".to_string()]);

        let serialized = serialize_row(&fields, ',', '"').unwrap();
        let reparsed = split_delimited_line(&serialized, ',', '"').unwrap();
        assert_eq!(reparsed, fields);
    }
}
