// ==========================================
// 供应商价格表同步系统 - 价格表领域模型
// ==========================================
// 数据所有权: price_list / price_list_item 由本系统独占写入；
// 商品目录 (product / product_variant) 的价格仅通过目录更新契约修改
// ==========================================

use crate::domain::types::SyncStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Supplier - 供应商
// ==========================================
// is_preferred 参与冲突裁决（优选供应商优先）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub supplier_id: String,
    pub name: String,
    pub is_preferred: bool,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// PriceList - 价格表（一次供应商报价提交）
// ==========================================
// 生效窗口: effective_date <= 今天 <= expiry_date（expiry 为空视为长期有效）
// 被取代或过期后置为 is_active=false，不删除；
// 非活动价格表不参与冲突裁决
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceList {
    pub price_list_id: String, // UUID
    pub supplier_id: String,
    pub name: String,                     // 版本名（同名提交取代旧表）
    pub effective_date: NaiveDate,        // 生效日期
    pub expiry_date: Option<NaiveDate>,   // 失效日期（含当天）
    pub is_active: bool,
    pub currency_code: String,            // 条目缺省币种
    pub priority_rank: i32,               // 越小优先级越高
    pub upload_filename: Option<String>,  // 源文件名
    pub created_at: DateTime<Utc>,
}

// ==========================================
// PriceListItem - 价格表条目（一行报价）
// ==========================================
// 写入方约束: product_variant_id / sync_status / sync_note 仅由
// 品类解析器与同步编排器修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceListItem {
    // ===== 主键与归属 =====
    pub item_id: String, // UUID
    pub price_list_id: String,
    pub supplier_id: String,

    // ===== 报价字段 =====
    pub supplier_sku: String,                 // 供应商件号（必填非空）
    pub variant_sku: Option<String>,          // 解析后回填的目录 SKU
    pub product_variant_id: Option<String>,   // 目录品类引用（解析/建品后回填）
    pub cost_price_minor: i64,                // 成本价（最小货币单位，非负）
    pub currency_code: String,
    pub quantity: i32,                        // 最小起订量（默认 1）
    pub lead_time_days: Option<i32>,          // 供货周期（天）

    // ===== 同步状态 =====
    pub sync_status: SyncStatus,
    pub sync_note: Option<String>,            // 跳过/错误原因

    // ===== 元信息 =====
    pub row_number: usize,                    // 源文件行号
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// PriceListMeta - 提交价格表时的元数据
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceListMeta {
    pub name: String,
    pub effective_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub currency_code: String,
    pub priority_rank: i32,
    pub upload_filename: Option<String>,
}

// ==========================================
// RawPriceRecord - 导入中间结构体
// ==========================================
// 用途: 导入管道中间产物（行解析 → 字段映射 → 此结构 → PriceListItem）
// 生命周期: 仅在导入流程内；字段级失败置 None 并记录 warning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPriceRecord {
    pub supplier_sku: Option<String>,
    pub variant_sku: Option<String>,
    pub cost_price_minor: Option<i64>,
    pub currency_code: Option<String>,
    pub quantity: Option<i32>,
    pub lead_time_days: Option<i32>,
    pub description: Option<String>, // 孤儿建品时作为商品名种子

    // 元信息
    pub row_number: usize,           // 原始文件行号
    pub warnings: Vec<String>,       // 字段级转换警告
}

// ==========================================
// CommitOutcome - 价格表提交结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub price_list_id: String,
    pub total_rows: usize,     // 解析出的数据行数
    pub stored_items: usize,   // 成功落库条目数
    pub error_rows: usize,     // 因缺失必填字段被拒的行数
    pub superseded_lists: usize, // 被本次提交取代的旧表数量
    pub errors: Vec<String>,   // 行级错误（解析 + 必填校验）
    pub warnings: Vec<String>, // 字段级转换警告
    pub elapsed_ms: i64,
}
