// ==========================================
// 供应商价格表同步系统 - 同步运行领域模型
// ==========================================
// SyncDecision 为运行期临时对象（每次运行重新计算，不落库）；
// SyncRun 为审计记录（落 sync_run 表）
// ==========================================

use crate::domain::price_list::PriceListItem;
use crate::domain::types::SyncRunState;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ConflictCandidate - 冲突裁决候选
// ==========================================
// 条目 + 其父价格表的生效窗口 + 供应商优选标记，
// 由仓储按品类聚合后交给冲突裁决器
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCandidate {
    pub item: PriceListItem,
    pub list_is_active: bool,
    pub effective_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub priority_rank: i32,
    pub supplier_preferred: bool,
}

// ==========================================
// SyncDecision - 冲突裁决结果（临时）
// ==========================================
// 每个品类恰好产生一条裁决；落选条目在 Reporting 阶段标记 SKIPPED
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncDecision {
    pub variant_id: String,
    pub winning_item_id: String,
    pub amount_minor: i64,
    pub currency_code: String,
    pub losing_item_ids: Vec<String>,
}

// ==========================================
// PriceUndo - 回滚日志条目
// ==========================================
// 每次成功改价先登记逆操作，补偿时逆序执行
#[derive(Debug, Clone)]
pub struct PriceUndo {
    pub variant_id: String,
    pub item_id: String,       // 胜出条目（用于状态标记）
    pub previous_minor: i64,   // 改价前售价（逆操作参数）
    pub applied_minor: i64,    // 本次写入的售价
    pub currency_code: String,
}

// ==========================================
// SyncSummary - 同步汇总统计
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSummary {
    pub total_items: usize,        // 目标价格表参与处理的条目数
    pub variants_to_update: usize, // 与目录价存在差异的品类数
    pub synced: usize,
    pub skipped: usize,
    pub errors: usize,
}

// ==========================================
// SyncRunReport - 同步运行报告
// ==========================================
// sync 接口对预期失败（SKU 无匹配、全部失效等）一律返回结构化报告，
// 不抛不透明错误
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRunReport {
    pub run_id: String,
    pub success: bool,
    pub updated_count: usize, // 实际生效的改价数（补偿后为 0）
    pub items_processed: usize,
    pub dry_run: bool,
    pub summary: SyncSummary,
    pub failure_reason: Option<String>, // success=false 时的首要原因
}

// ==========================================
// SyncRun - 同步运行审计记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRun {
    pub run_id: String, // UUID
    pub price_list_id: String,
    pub dry_run: bool,
    pub force_sync: bool,
    pub final_state: SyncRunState, // DONE / FAILED
    pub updated_count: usize,
    pub summary: SyncSummary,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
