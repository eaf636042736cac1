// ==========================================
// 供应商价格表同步系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免"部分模块外键开启/部分不开启"
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 集中 schema 引导，新库首次打开即可用
// ==========================================

use rusqlite::Connection;
use std::error::Error;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化数据库 schema（幂等）
///
/// 表清单:
/// - suppliers / price_lists / price_list_items: 价格表存储（本系统独占写入）
/// - products / product_variants: 商品目录（通过目录契约访问）
/// - sync_runs: 同步运行审计
/// - config_kv: 运行参数
pub fn init_schema(conn: &Connection) -> Result<(), Box<dyn Error>> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS suppliers (
            supplier_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            is_preferred INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS price_lists (
            price_list_id TEXT PRIMARY KEY,
            supplier_id TEXT NOT NULL REFERENCES suppliers(supplier_id),
            name TEXT NOT NULL,
            effective_date TEXT NOT NULL,
            expiry_date TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            currency_code TEXT NOT NULL,
            priority_rank INTEGER NOT NULL DEFAULT 100,
            upload_filename TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS price_list_items (
            item_id TEXT PRIMARY KEY,
            price_list_id TEXT NOT NULL REFERENCES price_lists(price_list_id) ON DELETE CASCADE,
            supplier_id TEXT NOT NULL REFERENCES suppliers(supplier_id),
            supplier_sku TEXT NOT NULL,
            variant_sku TEXT,
            product_variant_id TEXT,
            cost_price_minor INTEGER NOT NULL,
            currency_code TEXT NOT NULL,
            quantity INTEGER NOT NULL DEFAULT 1,
            lead_time_days INTEGER,
            sync_status TEXT NOT NULL DEFAULT 'PENDING',
            sync_note TEXT,
            row_number INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_items_list
            ON price_list_items(price_list_id);
        CREATE INDEX IF NOT EXISTS idx_items_variant
            ON price_list_items(product_variant_id);

        CREATE TABLE IF NOT EXISTS products (
            product_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS product_variants (
            variant_id TEXT PRIMARY KEY,
            product_id TEXT NOT NULL REFERENCES products(product_id),
            sku TEXT NOT NULL UNIQUE,
            price_minor INTEGER NOT NULL,
            currency_code TEXT NOT NULL,
            source_metadata TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_variants_sku
            ON product_variants(sku);

        CREATE TABLE IF NOT EXISTS sync_runs (
            run_id TEXT PRIMARY KEY,
            price_list_id TEXT NOT NULL,
            dry_run INTEGER NOT NULL,
            force_sync INTEGER NOT NULL,
            final_state TEXT NOT NULL,
            updated_count INTEGER NOT NULL,
            total_items INTEGER NOT NULL,
            variants_to_update INTEGER NOT NULL,
            synced INTEGER NOT NULL,
            skipped INTEGER NOT NULL,
            errors INTEGER NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 打开连接并确保 schema 就绪
pub fn open_and_init(db_path: &str) -> Result<Connection, Box<dyn Error>> {
    let conn = open_sqlite_connection(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    use rusqlite::OptionalExtension;

    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(
            read_schema_version(&conn).unwrap(),
            Some(CURRENT_SCHEMA_VERSION)
        );
    }
}
