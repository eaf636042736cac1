// ==========================================
// 供应商价格表同步系统 - 价格表仓储实现
// ==========================================
// 存储: SQLite (rusqlite)
// 约定: 日期存 TEXT (ISO)，时间戳存 RFC3339，布尔存 0/1
// ==========================================

use crate::db::open_and_init;
use crate::domain::price_list::{PriceList, PriceListItem, Supplier};
use crate::domain::sync::{ConflictCandidate, SyncRun, SyncSummary};
use crate::domain::types::{SyncRunState, SyncStatus};
use crate::repository::error::RepositoryError;
use crate::repository::price_list_repo::PriceListRepository;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// PriceListRepositoryImpl
// ==========================================
pub struct PriceListRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl PriceListRepositoryImpl {
    /// 创建新的 Repository 实例（schema 缺失时自动初始化）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_and_init(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（连接须已应用统一 PRAGMA）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// price_list_items 的标准 SELECT 列序
    const ITEM_COLUMNS: &'static str = "item_id, price_list_id, supplier_id, supplier_sku, \
         variant_sku, product_variant_id, cost_price_minor, currency_code, quantity, \
         lead_time_days, sync_status, sync_note, row_number, created_at, updated_at";

    fn map_item_row(row: &Row<'_>) -> rusqlite::Result<PriceListItem> {
        Ok(PriceListItem {
            item_id: row.get(0)?,
            price_list_id: row.get(1)?,
            supplier_id: row.get(2)?,
            supplier_sku: row.get(3)?,
            variant_sku: row.get(4)?,
            product_variant_id: row.get(5)?,
            cost_price_minor: row.get(6)?,
            currency_code: row.get(7)?,
            quantity: row.get(8)?,
            lead_time_days: row.get(9)?,
            sync_status: SyncStatus::parse(&row.get::<_, String>(10)?),
            sync_note: row.get(11)?,
            row_number: row.get::<_, i64>(12)? as usize,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }

    fn map_price_list_row(row: &Row<'_>) -> rusqlite::Result<PriceList> {
        Ok(PriceList {
            price_list_id: row.get(0)?,
            supplier_id: row.get(1)?,
            name: row.get(2)?,
            effective_date: row.get(3)?,
            expiry_date: row.get(4)?,
            is_active: row.get::<_, i32>(5)? != 0,
            currency_code: row.get(6)?,
            priority_rank: row.get(7)?,
            upload_filename: row.get(8)?,
            created_at: row.get(9)?,
        })
    }
}

#[async_trait]
impl PriceListRepository for PriceListRepositoryImpl {
    // ===== 供应商 =====

    async fn upsert_supplier(&self, supplier: Supplier) -> Result<(), Box<dyn Error>> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO suppliers (supplier_id, name, is_preferred, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                supplier.supplier_id,
                supplier.name,
                supplier.is_preferred as i32,
                supplier.created_at,
            ],
        )?;
        Ok(())
    }

    async fn get_supplier(&self, supplier_id: &str) -> Result<Option<Supplier>, Box<dyn Error>> {
        let conn = self.lock_conn()?;
        let result = conn.query_row(
            "SELECT supplier_id, name, is_preferred, created_at FROM suppliers WHERE supplier_id = ?1",
            params![supplier_id],
            |row| {
                Ok(Supplier {
                    supplier_id: row.get(0)?,
                    name: row.get(1)?,
                    is_preferred: row.get::<_, i32>(2)? != 0,
                    created_at: row.get(3)?,
                })
            },
        );

        match result {
            Ok(supplier) => Ok(Some(supplier)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    // ===== 价格表 =====

    async fn insert_price_list(&self, list: PriceList) -> Result<(), Box<dyn Error>> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO price_lists (
                price_list_id, supplier_id, name, effective_date, expiry_date,
                is_active, currency_code, priority_rank, upload_filename, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                list.price_list_id,
                list.supplier_id,
                list.name,
                list.effective_date,
                list.expiry_date,
                list.is_active as i32,
                list.currency_code,
                list.priority_rank,
                list.upload_filename,
                list.created_at,
            ],
        )?;
        Ok(())
    }

    async fn get_price_list(
        &self,
        price_list_id: &str,
    ) -> Result<Option<PriceList>, Box<dyn Error>> {
        let conn = self.lock_conn()?;
        let result = conn.query_row(
            r#"
            SELECT price_list_id, supplier_id, name, effective_date, expiry_date,
                   is_active, currency_code, priority_rank, upload_filename, created_at
            FROM price_lists WHERE price_list_id = ?1
            "#,
            params![price_list_id],
            Self::map_price_list_row,
        );

        match result {
            Ok(list) => Ok(Some(list)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    async fn supersede_price_lists(
        &self,
        supplier_id: &str,
        name: &str,
    ) -> Result<usize, Box<dyn Error>> {
        let conn = self.lock_conn()?;
        let count = conn.execute(
            "UPDATE price_lists SET is_active = 0 WHERE supplier_id = ?1 AND name = ?2 AND is_active = 1",
            params![supplier_id, name],
        )?;
        Ok(count)
    }

    async fn expire_stale_lists(&self, today: NaiveDate) -> Result<usize, Box<dyn Error>> {
        let conn = self.lock_conn()?;
        let count = conn.execute(
            "UPDATE price_lists SET is_active = 0 WHERE is_active = 1 AND expiry_date IS NOT NULL AND expiry_date < ?1",
            params![today],
        )?;
        Ok(count)
    }

    // ===== 条目 =====

    async fn batch_insert_items(
        &self,
        items: Vec<PriceListItem>,
    ) -> Result<usize, Box<dyn Error>> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO price_list_items (
                    item_id, price_list_id, supplier_id, supplier_sku, variant_sku,
                    product_variant_id, cost_price_minor, currency_code, quantity,
                    lead_time_days, sync_status, sync_note, row_number, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                "#,
            )?;

            for item in &items {
                stmt.execute(params![
                    item.item_id,
                    item.price_list_id,
                    item.supplier_id,
                    item.supplier_sku,
                    item.variant_sku,
                    item.product_variant_id,
                    item.cost_price_minor,
                    item.currency_code,
                    item.quantity,
                    item.lead_time_days,
                    item.sync_status.as_str(),
                    item.sync_note,
                    item.row_number as i64,
                    item.created_at,
                    item.updated_at,
                ])?;
                count += 1;
            }
        }

        tx.commit()?;
        Ok(count)
    }

    async fn get_items_by_list(
        &self,
        price_list_id: &str,
    ) -> Result<Vec<PriceListItem>, Box<dyn Error>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM price_list_items WHERE price_list_id = ?1 ORDER BY row_number",
            Self::ITEM_COLUMNS
        ))?;

        let items = stmt
            .query_map(params![price_list_id], Self::map_item_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    async fn link_variant(
        &self,
        item_id: &str,
        variant_id: &str,
        variant_sku: &str,
    ) -> Result<(), Box<dyn Error>> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            UPDATE price_list_items
            SET product_variant_id = ?2, variant_sku = ?3, updated_at = ?4
            WHERE item_id = ?1
            "#,
            params![item_id, variant_id, variant_sku, Utc::now()],
        )?;
        Ok(())
    }

    async fn update_item_status(
        &self,
        item_id: &str,
        status: SyncStatus,
        note: Option<&str>,
    ) -> Result<(), Box<dyn Error>> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            UPDATE price_list_items
            SET sync_status = ?2, sync_note = ?3, updated_at = ?4
            WHERE item_id = ?1
            "#,
            params![item_id, status.as_str(), note, Utc::now()],
        )?;
        Ok(())
    }

    // ===== 冲突裁决支撑查询 =====

    async fn find_candidates_by_variant(
        &self,
        variant_id: &str,
    ) -> Result<Vec<ConflictCandidate>, Box<dyn Error>> {
        let conn = self.lock_conn()?;
        let sql = format!(
            r#"
            SELECT {item_cols},
                   l.is_active, l.effective_date, l.expiry_date, l.priority_rank,
                   s.is_preferred
            FROM price_list_items i
            JOIN price_lists l ON l.price_list_id = i.price_list_id
            JOIN suppliers s ON s.supplier_id = i.supplier_id
            WHERE i.product_variant_id = ?1
            ORDER BY i.item_id
            "#,
            item_cols = Self::ITEM_COLUMNS
                .split(", ")
                .map(|c| format!("i.{}", c))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let candidates = stmt
            .query_map(params![variant_id], |row| {
                Ok(ConflictCandidate {
                    item: Self::map_item_row(row)?,
                    list_is_active: row.get::<_, i32>(15)? != 0,
                    effective_date: row.get(16)?,
                    expiry_date: row.get(17)?,
                    priority_rank: row.get(18)?,
                    supplier_preferred: row.get::<_, i32>(19)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(candidates)
    }

    // ===== 同步运行审计 =====

    async fn insert_sync_run(&self, run: SyncRun) -> Result<(), Box<dyn Error>> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO sync_runs (
                run_id, price_list_id, dry_run, force_sync, final_state,
                updated_count, total_items, variants_to_update, synced, skipped,
                errors, started_at, finished_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                run.run_id,
                run.price_list_id,
                run.dry_run as i32,
                run.force_sync as i32,
                run.final_state.to_string(),
                run.updated_count as i64,
                run.summary.total_items as i64,
                run.summary.variants_to_update as i64,
                run.summary.synced as i64,
                run.summary.skipped as i64,
                run.summary.errors as i64,
                run.started_at,
                run.finished_at,
            ],
        )?;
        Ok(())
    }

    async fn get_recent_sync_runs(&self, limit: usize) -> Result<Vec<SyncRun>, Box<dyn Error>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT run_id, price_list_id, dry_run, force_sync, final_state,
                   updated_count, total_items, variants_to_update, synced, skipped,
                   errors, started_at, finished_at
            FROM sync_runs
            ORDER BY started_at DESC
            LIMIT ?1
            "#,
        )?;

        let runs = stmt
            .query_map(params![limit as i64], |row| {
                let final_state = match row.get::<_, String>(4)?.as_str() {
                    "DONE" => SyncRunState::Done,
                    _ => SyncRunState::Failed,
                };
                Ok(SyncRun {
                    run_id: row.get(0)?,
                    price_list_id: row.get(1)?,
                    dry_run: row.get::<_, i32>(2)? != 0,
                    force_sync: row.get::<_, i32>(3)? != 0,
                    final_state,
                    updated_count: row.get::<_, i64>(5)? as usize,
                    summary: SyncSummary {
                        total_items: row.get::<_, i64>(6)? as usize,
                        variants_to_update: row.get::<_, i64>(7)? as usize,
                        synced: row.get::<_, i64>(8)? as usize,
                        skipped: row.get::<_, i64>(9)? as usize,
                        errors: row.get::<_, i64>(10)? as usize,
                    },
                    started_at: row.get(11)?,
                    finished_at: row.get(12)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }
}
