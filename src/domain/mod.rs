// ==========================================
// 供应商价格表同步系统 - 领域层
// ==========================================
// 职责: 实体与类型定义，不含业务规则与数据访问
// ==========================================

pub mod catalog;
pub mod price_list;
pub mod sync;
pub mod types;

// 重导出核心类型
pub use catalog::{VariantSeed, VariantSource};
pub use price_list::{
    CommitOutcome, PriceList, PriceListItem, PriceListMeta, RawPriceRecord, Supplier,
};
pub use sync::{ConflictCandidate, PriceUndo, SyncDecision, SyncRun, SyncRunReport, SyncSummary};
pub use types::{ParseFormat, SyncRunState, SyncStatus};
