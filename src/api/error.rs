// ==========================================
// 供应商价格表同步系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换内层错误为用户友好的错误消息
// 说明: 预期失败（SKU 无匹配、冲突全失效、更新失败已补偿）不是错误，
//       以结构化报告返回；此处只承载真正的异常路径
// ==========================================

use crate::engine::SyncError;
use crate::repository::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("同步失败: {0}")]
    SyncFailure(String),

    #[error("补偿失败，系统状态需人工复核: {0}")]
    CompensationFailure(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg)
            | RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg)
            | RepositoryError::LockError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg)
            | RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::InvalidInput(format!("约束违反: {}", msg))
            }
            RepositoryError::BusinessRuleViolation(msg) => ApiError::InvalidInput(msg),
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 SyncError 转换
// ==========================================
impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::PriceListNotFound(id) => {
                ApiError::NotFound(format!("价格表(id={})不存在", id))
            }
            SyncError::CompensationFailure { .. } => {
                ApiError::CompensationFailure(err.to_string())
            }
            SyncError::Repository(msg) | SyncError::Catalog(msg) => {
                ApiError::DatabaseError(msg)
            }
            other => ApiError::SyncFailure(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
