// ==========================================
// 供应商价格表同步系统 - 品类解析器 + 孤儿建品器
// ==========================================
// 职责: 将条目的供应商件号匹配到目录品类；无匹配者（孤儿）自动建品
// 匹配规则: SKU 精确字符串匹配（不做大小写/前导零归一化，已知限制）
// 失败语义: 单个孤儿建品失败只标记该条目 ERROR，不阻塞其他条目
// ==========================================

use crate::domain::catalog::{VariantSeed, VariantSource};
use crate::domain::price_list::PriceListItem;
use crate::domain::types::SyncStatus;
use crate::engine::error::{SyncError, SyncResult};
use crate::repository::{CatalogRepository, PriceListRepository};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

// ==========================================
// Resolution - 单条解析结果
// ==========================================
#[derive(Debug, Clone)]
pub enum Resolution {
    Resolved { variant_id: String },
    Orphan { reason: String },
}

// ==========================================
// ResolveOutcome - 解析阶段汇总
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ResolveOutcome {
    pub matched: usize,     // 命中既有品类
    pub provisioned: usize, // 孤儿建品成功
    pub failed: usize,      // 建品失败（条目已标 ERROR）
}

// ==========================================
// VariantResolver - 品类解析器
// ==========================================
pub struct VariantResolver {
    catalog: Arc<dyn CatalogRepository>,
    repo: Arc<dyn PriceListRepository>,
    lookup_concurrency: usize,
}

impl VariantResolver {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        repo: Arc<dyn PriceListRepository>,
        lookup_concurrency: usize,
    ) -> Self {
        Self {
            catalog,
            repo,
            lookup_concurrency: lookup_concurrency.max(1),
        }
    }

    /// 解析单条目（只查不写）
    pub async fn resolve(&self, item: &PriceListItem) -> SyncResult<Resolution> {
        match self
            .catalog
            .find_variant_by_sku(&item.supplier_sku)
            .await
            .map_err(|e| SyncError::Catalog(e.to_string()))?
        {
            Some(variant_id) => Ok(Resolution::Resolved { variant_id }),
            None => Ok(Resolution::Orphan {
                reason: format!("目录中无匹配 SKU: {}", item.supplier_sku),
            }),
        }
    }

    /// 解析整批条目并为孤儿建品，结果回写条目与存储
    ///
    /// # 流程
    /// 1. 有界并发查询目录 SKU 索引（只读）
    /// 2. 命中者回填 product_variant_id / variant_sku
    /// 3. 孤儿逐个原子建品（种子取条目成本价/币种/描述），再回填关联
    ///    （零孤儿时整个回填步骤跳过）
    pub async fn resolve_items(
        &self,
        items: &mut [PriceListItem],
    ) -> SyncResult<ResolveOutcome> {
        let mut outcome = ResolveOutcome::default();

        // 待解析下标: 未出错且尚未关联品类
        let pending: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                item.sync_status != SyncStatus::Error && item.product_variant_id.is_none()
            })
            .map(|(idx, _)| idx)
            .collect();

        if pending.is_empty() {
            debug!("品类解析: 无待解析条目");
            return Ok(outcome);
        }

        // 步骤 1: 有界并发查询（不同条目互不依赖）
        let semaphore = Arc::new(Semaphore::new(self.lookup_concurrency));
        let skus: Vec<(usize, String)> = pending
            .iter()
            .map(|&idx| (idx, items[idx].supplier_sku.clone()))
            .collect();
        let lookups = skus.into_iter().map(|(idx, sku)| {
            let catalog = self.catalog.clone();
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore.acquire().await;
                (idx, catalog.find_variant_by_sku(&sku).await)
            }
        });
        let lookup_results = join_all(lookups).await;

        // 步骤 2: 命中回填，孤儿收集
        let mut orphan_indices = Vec::new();
        for (idx, result) in lookup_results {
            match result {
                Ok(Some(variant_id)) => {
                    let item = &mut items[idx];
                    item.variant_sku = Some(item.supplier_sku.clone());
                    item.product_variant_id = Some(variant_id.clone());
                    self.repo
                        .link_variant(&item.item_id, &variant_id, &item.supplier_sku)
                        .await
                        .map_err(|e| SyncError::Repository(e.to_string()))?;
                    outcome.matched += 1;
                }
                Ok(None) => orphan_indices.push(idx),
                Err(e) => {
                    // 目录查询失败: 条目降级为 ERROR，运行继续
                    let item = &mut items[idx];
                    let note = format!("目录查询失败: {}", e);
                    warn!(item_id = %item.item_id, error = %e, "品类查询失败");
                    self.mark_error(item, &note).await?;
                    outcome.failed += 1;
                }
            }
        }

        // 步骤 3: 孤儿建品 + 回填（零孤儿时整步跳过）
        if orphan_indices.is_empty() {
            debug!(matched = outcome.matched, "品类解析完成: 无孤儿");
            return Ok(outcome);
        }

        info!(orphans = orphan_indices.len(), "检测到孤儿条目，开始自动建品");

        for idx in orphan_indices {
            let seed = {
                let item = &items[idx];
                VariantSeed {
                    sku: item.supplier_sku.clone(),
                    product_name: item.supplier_sku.clone(),
                    initial_price_minor: item.cost_price_minor,
                    currency_code: item.currency_code.clone(),
                    source: VariantSource {
                        supplier_id: item.supplier_id.clone(),
                        price_list_id: item.price_list_id.clone(),
                    },
                }
            };

            match self.catalog.create_product_and_variant(seed).await {
                Ok(variant_id) => {
                    let item = &mut items[idx];
                    item.variant_sku = Some(item.supplier_sku.clone());
                    item.product_variant_id = Some(variant_id.clone());
                    self.repo
                        .link_variant(&item.item_id, &variant_id, &item.supplier_sku)
                        .await
                        .map_err(|e| SyncError::Repository(e.to_string()))?;
                    debug!(item_id = %item.item_id, variant_id = %variant_id, "孤儿建品成功");
                    outcome.provisioned += 1;
                }
                Err(e) => {
                    // 单个建品失败不阻塞其他孤儿
                    let item = &mut items[idx];
                    let note = format!("孤儿建品失败: {}", e);
                    warn!(item_id = %item.item_id, error = %e, "孤儿建品失败");
                    self.mark_error(item, &note).await?;
                    outcome.failed += 1;
                }
            }
        }

        info!(
            matched = outcome.matched,
            provisioned = outcome.provisioned,
            failed = outcome.failed,
            "品类解析完成"
        );
        Ok(outcome)
    }

    async fn mark_error(&self, item: &mut PriceListItem, note: &str) -> SyncResult<()> {
        item.sync_status = SyncStatus::Error;
        item.sync_note = Some(note.to_string());
        self.repo
            .update_item_status(&item.item_id, SyncStatus::Error, Some(note))
            .await
            .map_err(|e| SyncError::Repository(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{VariantSeed, VariantSource};
    use crate::repository::{
        CatalogRepository, PriceListRepositoryImpl, SqliteCatalogRepository,
    };
    use chrono::Utc;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn memory_resolver() -> (VariantResolver, Arc<SqliteCatalogRepository>) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        let shared = Arc::new(Mutex::new(conn));

        let catalog = Arc::new(SqliteCatalogRepository::from_connection(shared.clone()));
        let repo = Arc::new(PriceListRepositoryImpl::from_connection(shared));
        (
            VariantResolver::new(catalog.clone(), repo, 4),
            catalog,
        )
    }

    fn item(sku: &str) -> PriceListItem {
        let now = Utc::now();
        PriceListItem {
            item_id: format!("item-{}", sku),
            price_list_id: "PL1".to_string(),
            supplier_id: "SUP1".to_string(),
            supplier_sku: sku.to_string(),
            variant_sku: None,
            product_variant_id: None,
            cost_price_minor: 1000,
            currency_code: "CNY".to_string(),
            quantity: 1,
            lead_time_days: None,
            sync_status: SyncStatus::Pending,
            sync_note: None,
            row_number: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_resolve_exact_match_and_orphan() {
        let (resolver, catalog) = memory_resolver();

        catalog
            .create_product_and_variant(VariantSeed {
                sku: "A1".to_string(),
                product_name: "商品 A1".to_string(),
                initial_price_minor: 500,
                currency_code: "CNY".to_string(),
                source: VariantSource {
                    supplier_id: "SUP1".to_string(),
                    price_list_id: "PL1".to_string(),
                },
            })
            .await
            .unwrap();

        match resolver.resolve(&item("A1")).await.unwrap() {
            Resolution::Resolved { variant_id } => assert_eq!(variant_id, "A1"),
            Resolution::Orphan { .. } => panic!("应命中既有品类"),
        }

        // 精确匹配: 大小写不同视为孤儿
        match resolver.resolve(&item("a1")).await.unwrap() {
            Resolution::Orphan { reason } => assert!(reason.contains("a1")),
            Resolution::Resolved { .. } => panic!("不应命中"),
        }
    }
}
