// ==========================================
// 供应商价格表同步系统 - 同步引擎错误类型
// ==========================================
// 传播策略:
// - Resolution: 条目级，单条降级为 ERROR，运行继续
// - ConflictPolicyViolation: 策略缺陷，按致命处理（不应到达）
// - ApplyFailure: 运行级，触发补偿
// - CompensationFailure: 致命，系统无法再保证一致性，必须人工复核
// ==========================================

use thiserror::Error;

/// 同步引擎错误类型
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("价格表未找到: {0}")]
    PriceListNotFound(String),

    #[error("品类解析失败 (条目 {item_id}): {message}")]
    Resolution { item_id: String, message: String },

    #[error("冲突策略违例 (品类 {variant_id}): {message}")]
    ConflictPolicyViolation {
        variant_id: String,
        message: String,
    },

    #[error("价格更新失败 (品类 {variant_id}): {message}")]
    ApplyFailure {
        variant_id: String,
        message: String,
    },

    #[error("补偿失败 (品类 {variant_id}): {message}，系统状态需人工复核")]
    CompensationFailure {
        variant_id: String,
        message: String,
    },

    #[error("仓储错误: {0}")]
    Repository(String),

    #[error("目录访问错误: {0}")]
    Catalog(String),
}

/// Result 类型别名
pub type SyncResult<T> = Result<T, SyncError>;
