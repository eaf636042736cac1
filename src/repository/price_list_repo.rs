// ==========================================
// 供应商价格表同步系统 - 价格表仓储 Trait
// ==========================================
// 职责: 定义价格表相关数据访问接口（不包含实现）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::price_list::{PriceList, PriceListItem, Supplier};
use crate::domain::sync::{ConflictCandidate, SyncRun};
use crate::domain::types::SyncStatus;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::error::Error;

// ==========================================
// PriceListRepository Trait
// ==========================================
// 用途: 价格表与条目存储访问
// 实现者: PriceListRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait PriceListRepository: Send + Sync {
    // ===== 供应商 =====

    /// 写入/更新供应商（INSERT OR REPLACE 策略）
    async fn upsert_supplier(&self, supplier: Supplier) -> Result<(), Box<dyn Error>>;

    /// 按 ID 查询供应商
    async fn get_supplier(&self, supplier_id: &str) -> Result<Option<Supplier>, Box<dyn Error>>;

    // ===== 价格表 =====

    /// 插入价格表头
    async fn insert_price_list(&self, list: PriceList) -> Result<(), Box<dyn Error>>;

    /// 按 ID 查询价格表头
    async fn get_price_list(
        &self,
        price_list_id: &str,
    ) -> Result<Option<PriceList>, Box<dyn Error>>;

    /// 取代旧表: 将同一供应商下同名的活动价格表置为非活动
    ///
    /// # 返回
    /// - Ok(usize): 被取代的价格表数量
    async fn supersede_price_lists(
        &self,
        supplier_id: &str,
        name: &str,
    ) -> Result<usize, Box<dyn Error>>;

    /// 维护操作: 将已过失效日期的活动价格表置为非活动
    ///
    /// 冲突裁决本身也按日期过滤，此操作只是存储卫生，不承担正确性
    async fn expire_stale_lists(&self, today: NaiveDate) -> Result<usize, Box<dyn Error>>;

    // ===== 条目（事务化批量写入）=====

    /// 批量插入条目（整批一个事务，失败整体回滚）
    ///
    /// # 返回
    /// - Ok(usize): 成功插入的条目数
    async fn batch_insert_items(
        &self,
        items: Vec<PriceListItem>,
    ) -> Result<usize, Box<dyn Error>>;

    /// 查询价格表的全部条目（按行号排序）
    async fn get_items_by_list(
        &self,
        price_list_id: &str,
    ) -> Result<Vec<PriceListItem>, Box<dyn Error>>;

    /// 回填条目的品类关联（解析/建品成功后调用）
    async fn link_variant(
        &self,
        item_id: &str,
        variant_id: &str,
        variant_sku: &str,
    ) -> Result<(), Box<dyn Error>>;

    /// 更新条目同步状态与备注
    async fn update_item_status(
        &self,
        item_id: &str,
        status: SyncStatus,
        note: Option<&str>,
    ) -> Result<(), Box<dyn Error>>;

    // ===== 冲突裁决支撑查询 =====

    /// 按品类聚合候选条目（跨供应商、跨价格表）
    ///
    /// 返回引用该品类的全部条目及其父表生效窗口与供应商优选标记；
    /// 活动窗口过滤由冲突裁决器执行（规则归引擎，查询归仓储）
    async fn find_candidates_by_variant(
        &self,
        variant_id: &str,
    ) -> Result<Vec<ConflictCandidate>, Box<dyn Error>>;

    // ===== 同步运行审计 =====

    /// 写入同步运行记录
    async fn insert_sync_run(&self, run: SyncRun) -> Result<(), Box<dyn Error>>;

    /// 查询最近的同步运行记录
    async fn get_recent_sync_runs(&self, limit: usize) -> Result<Vec<SyncRun>, Box<dyn Error>>;
}
