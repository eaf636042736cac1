// ==========================================
// 供应商价格表同步系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 供应商价格文件导入 → 冲突裁决 → 目录价格同步（可补偿）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/schema 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ParseFormat, SyncRunState, SyncStatus};

// 领域实体
pub use domain::{
    CommitOutcome, ConflictCandidate, PriceList, PriceListItem, PriceListMeta, RawPriceRecord,
    Supplier, SyncDecision, SyncRun, SyncRunReport, SyncSummary, VariantSeed,
};

// 配置
pub use config::{ColumnMapping, FixedWidthColumn, ParseConfig, SyncSettings, TransformSpec};

// 引擎
pub use engine::{ConflictResolver, SyncError, SyncOrchestrator, VariantResolver};

// API
pub use api::PriceListApi;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "供应商价格表同步系统";
