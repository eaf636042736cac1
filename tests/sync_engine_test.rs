// ==========================================
// 同步引擎集成测试
// ==========================================
// 测试目标: 品类解析/孤儿建品/冲突裁决/幂等/补偿 全链路
// ==========================================


use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use supplier_price_sync::config::{ColumnMapping, ParseConfig, SyncSettings};
use supplier_price_sync::domain::catalog::VariantSeed;
use supplier_price_sync::domain::price_list::{PriceListItem, PriceListMeta};
use supplier_price_sync::domain::types::SyncStatus;
use supplier_price_sync::engine::SyncOrchestrator;
use supplier_price_sync::logging;
use supplier_price_sync::repository::{
    CatalogRepository, PriceListRepository, PriceListRepositoryImpl, SqliteCatalogRepository,
};
use supplier_price_sync::PriceListApi;
use test_helpers::{create_test_db, seed_supplier, seed_variant, variant_price};

fn meta(name: &str, rank: i32) -> PriceListMeta {
    PriceListMeta {
        name: name.to_string(),
        effective_date: chrono::Utc::now().date_naive(),
        expiry_date: None,
        currency_code: "CNY".to_string(),
        priority_rank: rank,
        upload_filename: None,
    }
}

fn sku_price_mapping() -> ColumnMapping {
    let mut mapping = ColumnMapping::new();
    mapping.insert("SKU".to_string(), "supplier_sku".to_string());
    mapping.insert("PRICE".to_string(), "cost_price".to_string());
    mapping
}

async fn commit(
    api: &PriceListApi,
    supplier: &str,
    name: &str,
    rank: i32,
    content: &str,
) -> String {
    let config = ParseConfig::delimited(None, true);
    api.commit_price_list(supplier, &config, &sku_price_mapping(), content, meta(name, rank))
        .await
        .unwrap()
        .price_list_id
}

fn items_by_sku(items: &[PriceListItem]) -> HashMap<String, PriceListItem> {
    items
        .iter()
        .map(|i| (i.supplier_sku.clone(), i.clone()))
        .collect()
}

// ==========================================
// 孤儿建品
// ==========================================

#[tokio::test]
async fn test_sync_provisions_orphans_and_links_back() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    seed_supplier(&db_path, "SUP1", false).await.unwrap();

    let api = PriceListApi::new(db_path.clone());
    let list_id = commit(&api, "SUP1", "L1", 100, "SKU,PRICE\nN1,10.00\nN2,20.00\n").await;

    let report = api.sync(&list_id, false, false).await.unwrap();
    assert!(report.success);
    assert_eq!(report.items_processed, 2);
    // 建品种子价 = 条目成本价 → 无差异，无需更新
    assert_eq!(report.updated_count, 0);
    assert_eq!(report.summary.synced, 2);

    // 目录中已建品，价格 = 成本价种子
    assert_eq!(variant_price(&db_path, "N1").await.unwrap(), 1000);
    assert_eq!(variant_price(&db_path, "N2").await.unwrap(), 2000);

    // 条目已回填品类关联
    let items = api.list_items(&list_id).await.unwrap();
    assert!(items
        .iter()
        .all(|i| i.product_variant_id.is_some() && i.sync_status == SyncStatus::Synced));
}

// ==========================================
// 既有品类改价 + 幂等
// ==========================================

#[tokio::test]
async fn test_sync_updates_price_and_is_idempotent() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    seed_supplier(&db_path, "SUP1", false).await.unwrap();
    seed_variant(&db_path, "A1", 500).await.unwrap();

    let api = PriceListApi::new(db_path.clone());
    let list_id = commit(&api, "SUP1", "L1", 100, "SKU,PRICE\nA1,10.00\n").await;

    let first = api.sync(&list_id, false, false).await.unwrap();
    assert!(first.success);
    assert_eq!(first.updated_count, 1);
    assert_eq!(first.summary.variants_to_update, 1);
    assert_eq!(variant_price(&db_path, "A1").await.unwrap(), 1000);

    // 幂等: 状态不变时第二次运行零改价
    let second = api.sync(&list_id, false, false).await.unwrap();
    assert!(second.success);
    assert_eq!(second.updated_count, 0);
    assert_eq!(second.summary.variants_to_update, 0);
    assert_eq!(variant_price(&db_path, "A1").await.unwrap(), 1000);
}

// ==========================================
// 冲突裁决: 优选供应商 vs 优先级 + force_sync
// ==========================================

#[tokio::test]
async fn test_conflict_preferred_wins_then_force_sync_inverts() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    seed_supplier(&db_path, "S1", false).await.unwrap();
    seed_supplier(&db_path, "S2", true).await.unwrap();
    seed_variant(&db_path, "W1", 1000).await.unwrap();

    let api = PriceListApi::new(db_path.clone());
    // 非优选 rank 1 报 9.00；优选 rank 2 报 8.50
    let list1 = commit(&api, "S1", "L1", 1, "SKU,PRICE\nW1,9.00\n").await;
    let list2 = commit(&api, "S2", "L2", 2, "SKU,PRICE\nW1,8.50\n").await;

    // dry_run 先行: 完成 list1 条目的品类解析，目录价不动
    let dry = api.sync(&list1, false, true).await.unwrap();
    assert!(dry.success && dry.dry_run);
    assert_eq!(variant_price(&db_path, "W1").await.unwrap(), 1000);

    // 正常裁决: 优选供应商胜出，8.50 生效
    let report = api.sync(&list2, false, false).await.unwrap();
    assert!(report.success);
    assert_eq!(report.updated_count, 1);
    assert_eq!(variant_price(&db_path, "W1").await.unwrap(), 850);

    let items1 = items_by_sku(&api.list_items(&list1).await.unwrap());
    let items2 = items_by_sku(&api.list_items(&list2).await.unwrap());
    assert_eq!(items1["W1"].sync_status, SyncStatus::Skipped);
    assert!(items1["W1"]
        .sync_note
        .as_deref()
        .unwrap()
        .contains(&items2["W1"].item_id));
    assert_eq!(items2["W1"].sync_status, SyncStatus::Synced);

    // force_sync: 跳过优选判定，rank 1 胜出，9.00 生效
    let forced = api.sync(&list1, true, false).await.unwrap();
    assert!(forced.success);
    assert_eq!(variant_price(&db_path, "W1").await.unwrap(), 900);

    let items1 = items_by_sku(&api.list_items(&list1).await.unwrap());
    let items2 = items_by_sku(&api.list_items(&list2).await.unwrap());
    assert_eq!(items1["W1"].sync_status, SyncStatus::Synced);
    assert_eq!(items2["W1"].sync_status, SyncStatus::Skipped);
}

// ==========================================
// 生效窗口: 未生效价格表 → 合法的 SKIPPED 结果
// ==========================================

#[tokio::test]
async fn test_sync_future_effective_list_skips_items() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    seed_supplier(&db_path, "SUP1", false).await.unwrap();
    seed_variant(&db_path, "A1", 500).await.unwrap();

    let api = PriceListApi::new(db_path.clone());
    let config = ParseConfig::delimited(None, true);
    let mut future_meta = meta("未来表", 100);
    future_meta.effective_date = chrono::Utc::now().date_naive() + chrono::Duration::days(30);

    let outcome = api
        .commit_price_list(
            "SUP1",
            &config,
            &sku_price_mapping(),
            "SKU,PRICE\nA1,10.00\n",
            future_meta,
        )
        .await
        .unwrap();

    // 未生效 → 无裁决，条目 SKIPPED，不抛错误
    let report = api.sync(&outcome.price_list_id, false, false).await.unwrap();
    assert!(report.success);
    assert_eq!(report.updated_count, 0);
    assert_eq!(report.summary.skipped, 1);
    assert_eq!(variant_price(&db_path, "A1").await.unwrap(), 500);
}

// ==========================================
// dry_run: 计算裁决但不改目录价
// ==========================================

#[tokio::test]
async fn test_dry_run_reports_without_applying() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    seed_supplier(&db_path, "SUP1", false).await.unwrap();
    seed_variant(&db_path, "A1", 500).await.unwrap();

    let api = PriceListApi::new(db_path.clone());
    let list_id = commit(&api, "SUP1", "L1", 100, "SKU,PRICE\nA1,10.00\n").await;

    let report = api.sync(&list_id, false, true).await.unwrap();
    assert!(report.success && report.dry_run);
    assert_eq!(report.summary.variants_to_update, 1);
    assert_eq!(report.updated_count, 0);

    // 目录价未动，条目保持 PENDING（带 dry_run 备注）可重放
    assert_eq!(variant_price(&db_path, "A1").await.unwrap(), 500);
    let items = api.list_items(&list_id).await.unwrap();
    assert_eq!(items[0].sync_status, SyncStatus::Pending);
    assert!(items[0].sync_note.as_deref().unwrap().contains("dry_run"));
}

// ==========================================
// 补偿完整性: 部分失败后全量回滚
// ==========================================

/// 包装目录实现: 对指定品类的改价调用注入故障
struct FailingCatalog {
    inner: SqliteCatalogRepository,
    fail_variant: String,
}

#[async_trait]
impl CatalogRepository for FailingCatalog {
    async fn find_variant_by_sku(&self, sku: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.inner.find_variant_by_sku(sku).await
    }

    async fn get_variant_price(
        &self,
        variant_id: &str,
    ) -> Result<(i64, String), Box<dyn Error>> {
        self.inner.get_variant_price(variant_id).await
    }

    async fn create_product_and_variant(
        &self,
        seed: VariantSeed,
    ) -> Result<String, Box<dyn Error>> {
        self.inner.create_product_and_variant(seed).await
    }

    async fn set_variant_price(
        &self,
        variant_id: &str,
        amount_minor: i64,
        currency_code: &str,
    ) -> Result<i64, Box<dyn Error>> {
        if variant_id == self.fail_variant {
            return Err("模拟目录故障".into());
        }
        self.inner
            .set_variant_price(variant_id, amount_minor, currency_code)
            .await
    }
}

#[tokio::test]
async fn test_compensation_restores_all_prices_on_partial_failure() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    seed_supplier(&db_path, "SUP1", false).await.unwrap();

    // 5 个品类，运行前价格 101..105
    for (idx, sku) in ["V1", "V2", "V3", "V4", "V5"].iter().enumerate() {
        seed_variant(&db_path, sku, 101 + idx as i64).await.unwrap();
    }

    let api = PriceListApi::new(db_path.clone());
    let list_id = commit(
        &api,
        "SUP1",
        "L1",
        100,
        "SKU,PRICE\nV1,9.01\nV2,9.02\nV3,9.03\nV4,9.04\nV5,9.05\n",
    )
    .await;

    // 第 3 个品类注入改价故障；apply_concurrency=1 保证 V1、V2 先行生效
    let repo: Arc<dyn PriceListRepository> =
        Arc::new(PriceListRepositoryImpl::new(&db_path).unwrap());
    let catalog = Arc::new(FailingCatalog {
        inner: SqliteCatalogRepository::new(&db_path).unwrap(),
        fail_variant: "V3".to_string(),
    });
    let settings = SyncSettings {
        resolve_concurrency: 2,
        apply_concurrency: 1,
    };
    let orchestrator = SyncOrchestrator::new(repo, catalog, settings);

    let report = orchestrator.sync(&list_id, false, false).await.unwrap();
    assert!(!report.success);
    assert_eq!(report.updated_count, 0);
    assert!(report.failure_reason.as_deref().unwrap().contains("V3"));

    // 补偿完整性: 5 个品类全部恢复运行前价格
    for (idx, sku) in ["V1", "V2", "V3", "V4", "V5"].iter().enumerate() {
        assert_eq!(
            variant_price(&db_path, sku).await.unwrap(),
            101 + idx as i64,
            "品类 {} 未恢复运行前价格",
            sku
        );
    }

    // 状态: 已应用后回滚的 2 条为 ERROR（回滚备注），失败的 1 条为 ERROR，
    //       未尝试的 2 条保持 PENDING 可重试
    let items = items_by_sku(&api.list_items(&list_id).await.unwrap());
    assert_eq!(items["V1"].sync_status, SyncStatus::Error);
    assert!(items["V1"].sync_note.as_deref().unwrap().contains("回滚"));
    assert_eq!(items["V2"].sync_status, SyncStatus::Error);
    assert!(items["V2"].sync_note.as_deref().unwrap().contains("回滚"));
    assert_eq!(items["V3"].sync_status, SyncStatus::Error);
    assert!(items["V3"]
        .sync_note
        .as_deref()
        .unwrap()
        .contains("价格更新失败"));
    assert_eq!(items["V4"].sync_status, SyncStatus::Pending);
    assert_eq!(items["V5"].sync_status, SyncStatus::Pending);

    // 失败后重跑（换用正常目录）可收敛
    let report = api.sync(&list_id, false, false).await.unwrap();
    assert!(report.success);
    assert_eq!(report.updated_count, 5);
    assert_eq!(variant_price(&db_path, "V3").await.unwrap(), 903);
}

// ==========================================
// 运行审计
// ==========================================

#[tokio::test]
async fn test_sync_runs_are_recorded() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    seed_supplier(&db_path, "SUP1", false).await.unwrap();

    let api = PriceListApi::new(db_path);
    let list_id = commit(&api, "SUP1", "L1", 100, "SKU,PRICE\nA1,10.00\n").await;

    api.sync(&list_id, false, true).await.unwrap();
    api.sync(&list_id, false, false).await.unwrap();

    let runs = api.recent_sync_runs(10).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().any(|r| r.dry_run));
    assert!(runs.iter().any(|r| !r.dry_run));
}

#[tokio::test]
async fn test_sync_unknown_price_list_is_not_found() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();

    let api = PriceListApi::new(db_path);
    let result = api.sync("不存在的表", false, false).await;
    assert!(result.is_err());
}
