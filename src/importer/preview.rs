// ==========================================
// 供应商价格表同步系统 - 预览服务
// ==========================================
// 职责: 对文件前缀运行 解析器+映射器，供界面快速反馈
// 约束: 纯计算，不触达存储与商品目录；可随时取消，无需清理
// ==========================================

use crate::config::{ColumnMapping, ParseConfig, DEFAULT_DELIMITER};
use crate::domain::types::ParseFormat;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::map_rows;
use crate::importer::line_parser::parse;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// 预览最多读取的行数（表头 + 约 10 个数据行）
pub const PREVIEW_MAX_LINES: usize = 12;

/// 预览最多返回的映射行数
pub const PREVIEW_MAX_ROWS: usize = 5;

/// 分隔符探测采样的非空白行数
const DETECT_SAMPLE_LINES: usize = 3;

/// 分隔符候选集（按优先序）
const DELIMITER_CANDIDATES: [char; 4] = [',', ';', '\t', '|'];

// ==========================================
// PreviewStats - 预览统计
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviewStats {
    pub sampled_lines: usize, // 截取的行数（含表头）
    pub parsed_rows: usize,   // 成功解析的数据行数
    pub error_rows: usize,    // 解析失败/列数不匹配的行数
}

// ==========================================
// PreviewResult - 预览结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResult {
    pub detected_format: ParseFormat,
    pub detected_delimiter: Option<char>, // 分隔符模式下实际采用的分隔符
    pub preview_rows: Vec<HashMap<String, String>>, // 映射后的行（≤ PREVIEW_MAX_ROWS）
    pub detected_columns: Vec<String>,    // 观察到的标准字段名（排序去重）
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub stats: PreviewStats,
}

/// 预览价格文件
///
/// # 参数
/// - file_content: 文件全文（内部只取前 PREVIEW_MAX_LINES 行）
/// - file_type: 显式文件格式；None 时自动判定
/// - parse_config: 解析语法；分隔符缺省时自动探测
/// - column_mapping: 列映射
pub fn preview(
    file_content: &str,
    file_type: Option<ParseFormat>,
    parse_config: &ParseConfig,
    column_mapping: &ColumnMapping,
) -> ImportResult<PreviewResult> {
    // 截取前缀，控制预览时延
    let truncated: Vec<&str> = file_content.lines().take(PREVIEW_MAX_LINES).collect();
    let sampled_lines = truncated.len();
    let truncated = truncated.join("\n");

    // 格式判定: 显式指定 > 配置含定宽列 > 分隔符
    let detected_format = file_type.unwrap_or({
        if parse_config.fixed_width_columns.is_empty() {
            ParseFormat::Delimited
        } else {
            ParseFormat::FixedWidth
        }
    });

    // 分隔符探测（仅分隔符模式且配置未指定时）
    let mut effective_config = parse_config.clone();
    effective_config.format = detected_format;
    let detected_delimiter = match detected_format {
        ParseFormat::Delimited => {
            let delimiter = parse_config
                .delimiter
                .unwrap_or_else(|| detect_delimiter(&truncated));
            effective_config.delimiter = Some(delimiter);
            Some(delimiter)
        }
        ParseFormat::FixedWidth => None,
    };

    debug!(
        format = %detected_format,
        delimiter = ?detected_delimiter,
        sampled_lines = sampled_lines,
        "预览: 格式判定完成"
    );

    let output = parse(&truncated, &effective_config)?;
    let parsed_rows = output.rows.len();
    let error_rows = output.errors.len();

    let mapped = map_rows(
        &output.rows,
        column_mapping,
        &effective_config.transformations,
    );

    // 观察到的标准字段名（去重后排序，保证输出确定性）
    let mut detected_columns: Vec<String> = Vec::new();
    let mut warnings = Vec::new();
    let mut preview_rows = Vec::new();

    for row in &mapped {
        for key in row.fields.keys() {
            if !detected_columns.contains(key) {
                detected_columns.push(key.clone());
            }
        }
        warnings.extend(row.warnings.iter().cloned());
        if preview_rows.len() < PREVIEW_MAX_ROWS {
            preview_rows.push(row.fields.clone());
        }
    }
    detected_columns.sort();

    Ok(PreviewResult {
        detected_format,
        detected_delimiter,
        preview_rows,
        detected_columns,
        warnings,
        errors: output.errors,
        stats: PreviewStats {
            sampled_lines,
            parsed_rows,
            error_rows,
        },
    })
}

/// 自动探测分隔符
///
/// 规则: 对前 DETECT_SAMPLE_LINES 个非空白行统计每个候选分隔符的出现次数；
/// 仅当次数在所有采样行上一致且非零时该候选有效；取一致次数最高者；
/// 无有效候选时回落逗号
pub fn detect_delimiter(content: &str) -> char {
    let sample: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(DETECT_SAMPLE_LINES)
        .collect();

    if sample.is_empty() {
        return DEFAULT_DELIMITER;
    }

    let mut best: Option<(char, usize)> = None;
    for candidate in DELIMITER_CANDIDATES {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| line.matches(candidate).count())
            .collect();

        let first = counts[0];
        let consistent = first > 0 && counts.iter().all(|&c| c == first);
        if consistent {
            match best {
                Some((_, best_count)) if best_count >= first => {}
                _ => best = Some((candidate, first)),
            }
        }
    }

    best.map(|(c, _)| c).unwrap_or(DEFAULT_DELIMITER)
}
