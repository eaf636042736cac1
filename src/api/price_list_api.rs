// ==========================================
// 供应商价格表同步系统 - 价格表API
// ==========================================
// 职责: 面向外围管理层的三个入口: preview / commit_price_list / sync
// 说明: preview 纯计算不触库；commit 与 sync 按 db_path 自行装配依赖
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ColumnMapping, ParseConfig, SyncSettings};
use crate::db::open_sqlite_connection;
use crate::domain::price_list::{CommitOutcome, PriceListItem, PriceListMeta, Supplier};
use crate::domain::sync::{SyncRun, SyncRunReport};
use crate::domain::types::ParseFormat;
use crate::engine::SyncOrchestrator;
use crate::importer::preview::PreviewResult;
use crate::importer::{preview, PriceListImporter, PriceListImporterImpl};
use crate::repository::{
    PriceListRepository, PriceListRepositoryImpl, SqliteCatalogRepository,
};
use chrono::Utc;
use std::sync::Arc;

// ==========================================
// PriceListApi - 价格表API
// ==========================================
pub struct PriceListApi {
    db_path: String,
}

impl PriceListApi {
    /// 创建新的 PriceListApi 实例
    pub fn new(db_path: String) -> Self {
        Self { db_path }
    }

    /// 登记/更新供应商
    pub async fn register_supplier(
        &self,
        supplier_id: &str,
        name: &str,
        is_preferred: bool,
    ) -> ApiResult<()> {
        if supplier_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("供应商 ID 不能为空".to_string()));
        }

        let repo = self.create_repo()?;
        repo.upsert_supplier(Supplier {
            supplier_id: supplier_id.to_string(),
            name: name.to_string(),
            is_preferred,
            created_at: Utc::now(),
        })
        .await
        .map_err(|e| ApiError::DatabaseError(format!("供应商登记失败: {}", e)))?;
        Ok(())
    }

    /// 预览价格文件（纯计算，不落库、不触达目录）
    pub fn preview(
        &self,
        file_content: &str,
        file_type: Option<ParseFormat>,
        parse_config: &ParseConfig,
        column_mapping: &ColumnMapping,
    ) -> ApiResult<PreviewResult> {
        preview::preview(file_content, file_type, parse_config, column_mapping)
            .map_err(|e| ApiError::ImportError(format!("预览失败: {}", e)))
    }

    /// 提交价格表
    pub async fn commit_price_list(
        &self,
        supplier_id: &str,
        parse_config: &ParseConfig,
        column_mapping: &ColumnMapping,
        file_content: &str,
        meta: PriceListMeta,
    ) -> ApiResult<CommitOutcome> {
        if meta.currency_code.trim().is_empty() {
            return Err(ApiError::InvalidInput("币种不能为空".to_string()));
        }

        let importer = PriceListImporterImpl::new(self.create_repo()?);
        importer
            .commit_price_list(
                supplier_id,
                parse_config,
                column_mapping,
                file_content,
                meta,
            )
            .await
            .map_err(|e| ApiError::ImportError(format!("提交失败: {}", e)))
    }

    /// 同步价格表到商品目录
    ///
    /// # 参数
    /// - price_list_id: 目标价格表
    /// - force_sync: 冲突裁决跳过优选供应商判定
    /// - dry_run: 只计算并报告裁决，不改目录价
    pub async fn sync(
        &self,
        price_list_id: &str,
        force_sync: bool,
        dry_run: bool,
    ) -> ApiResult<SyncRunReport> {
        let repo: Arc<dyn PriceListRepository> = Arc::new(self.create_repo()?);
        let catalog = Arc::new(
            SqliteCatalogRepository::new(&self.db_path)
                .map_err(|e| ApiError::DatabaseError(format!("目录访问创建失败: {}", e)))?,
        );

        // 存储卫生: 顺带将已过失效日期的价格表置为非活动
        // （冲突裁决本身按日期过滤，此步不承担正确性）
        let expired = repo
            .expire_stale_lists(Utc::now().date_naive())
            .await
            .map_err(|e| ApiError::DatabaseError(format!("过期清理失败: {}", e)))?;
        if expired > 0 {
            tracing::info!(expired = expired, "已将过期价格表置为非活动");
        }

        let settings = {
            let conn = open_sqlite_connection(&self.db_path)
                .map_err(|e| ApiError::DatabaseError(format!("数据库连接失败: {}", e)))?;
            SyncSettings::load(&conn)
                .map_err(|e| ApiError::DatabaseError(format!("运行参数加载失败: {}", e)))?
        };

        let orchestrator = SyncOrchestrator::new(repo, catalog, settings);
        let report = orchestrator.sync(price_list_id, force_sync, dry_run).await?;
        Ok(report)
    }

    /// 查询价格表条目（按行号排序）
    pub async fn list_items(&self, price_list_id: &str) -> ApiResult<Vec<PriceListItem>> {
        let repo = self.create_repo()?;
        repo.get_items_by_list(price_list_id)
            .await
            .map_err(|e| ApiError::DatabaseError(format!("条目查询失败: {}", e)))
    }

    /// 查询最近的同步运行记录
    pub async fn recent_sync_runs(&self, limit: usize) -> ApiResult<Vec<SyncRun>> {
        let repo = self.create_repo()?;
        repo.get_recent_sync_runs(limit.clamp(1, 100))
            .await
            .map_err(|e| ApiError::DatabaseError(format!("运行记录查询失败: {}", e)))
    }

    fn create_repo(&self) -> ApiResult<PriceListRepositoryImpl> {
        PriceListRepositoryImpl::new(&self.db_path)
            .map_err(|e| ApiError::DatabaseError(format!("创建仓储失败: {}", e)))
    }
}
