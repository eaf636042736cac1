// ==========================================
// 供应商价格表同步系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎，不拼 SQL
// 红线: Engine 不拼 SQL，所有裁决/跳过/错误必须输出 reason
// ==========================================

pub mod conflict_resolver;
pub mod error;
pub mod sync_orchestrator;
pub mod variant_resolver;

// 重导出核心引擎
pub use conflict_resolver::ConflictResolver;
pub use error::{SyncError, SyncResult};
pub use sync_orchestrator::SyncOrchestrator;
pub use variant_resolver::{Resolution, ResolveOutcome, VariantResolver};
