// ==========================================
// 供应商价格表同步系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 传播策略: 行级/字段级错误只降级单行，不中断整批
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 配置错误 =====
    #[error("解析配置非法: {0}")]
    InvalidParseConfig(String),

    // ===== 解析错误 =====
    #[error("行解析失败 (行 {row}): {message}")]
    ParseError { row: usize, message: String },

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    // ===== 数据映射错误 =====
    #[error("变换失败 (字段 {field}): {message}")]
    TransformError { field: String, message: String },

    // ===== 必填校验错误 =====
    #[error("第 {row} 行: 必填字段 {field} 缺失或非法，该行拒收")]
    RequiredFieldMissing { row: usize, field: String },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
