// ==========================================
// 供应商价格表同步系统 - 商品目录契约与参考实现
// ==========================================
// 目录是外部协作方，核心只依赖以下窄契约:
// - 查询: find_variant_by_sku / get_variant_price
// - 建品: create_product_and_variant（原子，失败不留半成品）
// - 改价: set_variant_price（原子，返回旧价，可用旧价再调一次实现撤销）
// 本文件同时提供 rusqlite 参考实现，使系统可端到端运行与测试
// ==========================================

use crate::db::open_and_init;
use crate::domain::catalog::VariantSeed;
use crate::repository::error::RepositoryError;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// CatalogRepository Trait
// ==========================================
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// 按 SKU 精确匹配品类
    ///
    /// 限制: 仅精确字符串匹配，不做大小写/前导零归一化
    async fn find_variant_by_sku(&self, sku: &str) -> Result<Option<String>, Box<dyn Error>>;

    /// 查询品类当前售价
    ///
    /// # 返回
    /// - Ok((最小单位金额, 币种))
    async fn get_variant_price(&self, variant_id: &str)
        -> Result<(i64, String), Box<dyn Error>>;

    /// 原子创建 商品+品类 对（失败不留半成品）
    ///
    /// # 返回
    /// - Ok(String): 新品类 ID
    async fn create_product_and_variant(
        &self,
        seed: VariantSeed,
    ) -> Result<String, Box<dyn Error>>;

    /// 原子改价
    ///
    /// # 返回
    /// - Ok(i64): 改价前的售价（最小单位），用旧价再调一次即撤销
    async fn set_variant_price(
        &self,
        variant_id: &str,
        amount_minor: i64,
        currency_code: &str,
    ) -> Result<i64, Box<dyn Error>>;
}

// ==========================================
// SqliteCatalogRepository - rusqlite 参考实现
// ==========================================
pub struct SqliteCatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalogRepository {
    /// 创建新的目录访问实例（schema 缺失时自动初始化）
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_and_init(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl CatalogRepository for SqliteCatalogRepository {
    async fn find_variant_by_sku(&self, sku: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.lock_conn()?;
        let result = conn.query_row(
            "SELECT variant_id FROM product_variants WHERE sku = ?1",
            params![sku],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(variant_id) => Ok(Some(variant_id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    async fn get_variant_price(
        &self,
        variant_id: &str,
    ) -> Result<(i64, String), Box<dyn Error>> {
        let conn = self.lock_conn()?;
        let result = conn.query_row(
            "SELECT price_minor, currency_code FROM product_variants WHERE variant_id = ?1",
            params![variant_id],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
        )?;
        Ok(result)
    }

    async fn create_product_and_variant(
        &self,
        seed: VariantSeed,
    ) -> Result<String, Box<dyn Error>> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        // 品类标识与 SKU 均取供应商件号；商品 ID 独立生成
        let product_id = Uuid::new_v4().to_string();
        let variant_id = seed.sku.clone();
        let now = Utc::now();
        let source_json = serde_json::to_string(&seed.source)?;

        tx.execute(
            "INSERT INTO products (product_id, name, created_at) VALUES (?1, ?2, ?3)",
            params![product_id, seed.product_name, now],
        )?;

        tx.execute(
            r#"
            INSERT INTO product_variants (
                variant_id, product_id, sku, price_minor, currency_code,
                source_metadata, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                variant_id,
                product_id,
                seed.sku,
                seed.initial_price_minor,
                seed.currency_code,
                source_json,
                now,
                now,
            ],
        )?;

        // 商品与品类同一事务落库: 任一失败则整体回滚，不留半成品
        tx.commit()?;
        Ok(variant_id)
    }

    async fn set_variant_price(
        &self,
        variant_id: &str,
        amount_minor: i64,
        currency_code: &str,
    ) -> Result<i64, Box<dyn Error>> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let previous: i64 = tx.query_row(
            "SELECT price_minor FROM product_variants WHERE variant_id = ?1",
            params![variant_id],
            |row| row.get(0),
        )?;

        tx.execute(
            r#"
            UPDATE product_variants
            SET price_minor = ?2, currency_code = ?3, updated_at = ?4
            WHERE variant_id = ?1
            "#,
            params![variant_id, amount_minor, currency_code, Utc::now()],
        )?;

        tx.commit()?;
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::VariantSource;

    fn seed(sku: &str, price: i64) -> VariantSeed {
        VariantSeed {
            sku: sku.to_string(),
            product_name: format!("商品 {}", sku),
            initial_price_minor: price,
            currency_code: "CNY".to_string(),
            source: VariantSource {
                supplier_id: "SUP1".to_string(),
                price_list_id: "PL1".to_string(),
            },
        }
    }

    fn memory_catalog() -> SqliteCatalogRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        SqliteCatalogRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_create_and_find_variant() {
        let catalog = memory_catalog();

        let variant_id = catalog
            .create_product_and_variant(seed("A1", 1000))
            .await
            .unwrap();
        assert_eq!(variant_id, "A1");

        assert_eq!(
            catalog.find_variant_by_sku("A1").await.unwrap(),
            Some("A1".to_string())
        );
        // 精确匹配: 大小写不同不命中
        assert_eq!(catalog.find_variant_by_sku("a1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_price_returns_previous_and_undoes() {
        let catalog = memory_catalog();
        let variant_id = catalog
            .create_product_and_variant(seed("B2", 500))
            .await
            .unwrap();

        let previous = catalog
            .set_variant_price(&variant_id, 900, "CNY")
            .await
            .unwrap();
        assert_eq!(previous, 500);
        assert_eq!(
            catalog.get_variant_price(&variant_id).await.unwrap().0,
            900
        );

        // 用旧价再调一次即撤销
        let reverted = catalog
            .set_variant_price(&variant_id, previous, "CNY")
            .await
            .unwrap();
        assert_eq!(reverted, 900);
        assert_eq!(
            catalog.get_variant_price(&variant_id).await.unwrap().0,
            500
        );
    }

    #[tokio::test]
    async fn test_duplicate_sku_creation_fails_atomically() {
        let catalog = memory_catalog();
        catalog
            .create_product_and_variant(seed("C3", 100))
            .await
            .unwrap();

        let before: i64 = {
            let conn = catalog.conn.lock().unwrap();
            conn.query_row("SELECT COUNT(*) FROM products", [], |r| r.get(0))
                .unwrap()
        };

        // SKU 唯一约束触发失败
        assert!(catalog
            .create_product_and_variant(seed("C3", 200))
            .await
            .is_err());

        // 事务回滚: 不留半成品商品
        let after: i64 = {
            let conn = catalog.conn.lock().unwrap();
            conn.query_row("SELECT COUNT(*) FROM products", [], |r| r.get(0))
                .unwrap()
        };
        assert_eq!(before, after);
    }
}
