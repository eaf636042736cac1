// ==========================================
// 供应商价格表同步系统 - 商品目录领域模型
// ==========================================
// 目录是外部协作方：本系统只通过窄契约（查询/建品/改价）访问，
// 不对目录价格保留第二份事实
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// VariantSeed - 孤儿建品种子
// ==========================================
// 建品契约为原子操作：商品 + 品类要么都创建，要么都不创建
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantSeed {
    pub sku: String,               // 品类标识与 SKU 均取供应商件号
    pub product_name: String,      // 商品名（取 description，缺省为件号）
    pub initial_price_minor: i64,  // 初始售价 = 条目成本价
    pub currency_code: String,
    pub source: VariantSource,     // 侧元数据：回指来源
}

// ==========================================
// VariantSource - 品类来源回指
// ==========================================
// 以 JSON 存入品类侧元数据列，用于追溯孤儿建品的出处
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantSource {
    pub supplier_id: String,
    pub price_list_id: String,
}
