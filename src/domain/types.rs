// ==========================================
// 供应商价格表同步系统 - 领域类型定义
// ==========================================
// 依据: 价格表导入与同步流程设计
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 解析格式 (Parse Format)
// ==========================================
// 价格文件的两种文本布局：分隔符 / 定宽列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParseFormat {
    Delimited,  // 分隔符文件（CSV 及变体）
    FixedWidth, // 定宽列文件
}

impl fmt::Display for ParseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFormat::Delimited => write!(f, "DELIMITED"),
            ParseFormat::FixedWidth => write!(f, "FIXED_WIDTH"),
        }
    }
}

// ==========================================
// 同步状态 (Sync Status)
// ==========================================
// 价格表条目的同步生命周期
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Pending, // 待同步（落库后初始状态）
    Synced,  // 已同步（胜出并生效，或价格本就一致）
    Skipped, // 跳过（冲突落选/价格表失效）
    Error,   // 错误（解析失败/建品失败/更新失败/已回滚）
}

impl SyncStatus {
    /// 数据库存储值（与 serde 序列化一致）
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "PENDING",
            SyncStatus::Synced => "SYNCED",
            SyncStatus::Skipped => "SKIPPED",
            SyncStatus::Error => "ERROR",
        }
    }

    /// 从数据库存储值解析（未知值按 ERROR 处理）
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "PENDING" => SyncStatus::Pending,
            "SYNCED" => SyncStatus::Synced,
            "SKIPPED" => SyncStatus::Skipped,
            _ => SyncStatus::Error,
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 同步运行状态 (Sync Run State)
// ==========================================
// Saga 状态机: Resolving → Diffing → Applying → Reporting → Done
// Applying 阶段失败时进入 Compensating，补偿完成后终态为 Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncRunState {
    Resolving,    // 品类解析（含孤儿建品）
    Diffing,      // 冲突裁决 + 与目录价比对
    Applying,     // 应用价格更新（dry_run 跳过）
    Compensating, // 回滚本次已应用的更新
    Reporting,    // 落盘条目状态
    Done,         // 成功终态（含 dry_run 成功）
    Failed,       // 失败终态（补偿已完成）
}

impl fmt::Display for SyncRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncRunState::Resolving => "RESOLVING",
            SyncRunState::Diffing => "DIFFING",
            SyncRunState::Applying => "APPLYING",
            SyncRunState::Compensating => "COMPENSATING",
            SyncRunState::Reporting => "REPORTING",
            SyncRunState::Done => "DONE",
            SyncRunState::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}
