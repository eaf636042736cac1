// ==========================================
// 供应商价格表同步系统 - 运行参数配置
// ==========================================
// 职责: 并发上限等运行参数的加载
// 存储: config_kv 表 (key-value + scope)，缺省值内置
// ==========================================

use rusqlite::{params, Connection};
use std::error::Error;

/// 解析/裁决阶段的缺省并发上限
pub const DEFAULT_RESOLVE_CONCURRENCY: usize = 8;

/// 改价阶段的缺省并发上限（不同品类可并发，同一品类串行）
pub const DEFAULT_APPLY_CONCURRENCY: usize = 4;

// ==========================================
// SyncSettings - 同步运行参数
// ==========================================
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub resolve_concurrency: usize,
    pub apply_concurrency: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            resolve_concurrency: DEFAULT_RESOLVE_CONCURRENCY,
            apply_concurrency: DEFAULT_APPLY_CONCURRENCY,
        }
    }
}

impl SyncSettings {
    /// 从 config_kv 表加载（scope_id='global'），缺失键回落缺省值
    ///
    /// # 键
    /// - sync.resolve_concurrency
    /// - sync.apply_concurrency
    pub fn load(conn: &Connection) -> Result<Self, Box<dyn Error>> {
        let mut settings = SyncSettings::default();

        if let Some(v) = read_global_value(conn, "sync.resolve_concurrency")? {
            if let Ok(n) = v.trim().parse::<usize>() {
                if n > 0 {
                    settings.resolve_concurrency = n;
                }
            }
        }

        if let Some(v) = read_global_value(conn, "sync.apply_concurrency")? {
            if let Ok(n) = v.trim().parse::<usize>() {
                if n > 0 {
                    settings.apply_concurrency = n;
                }
            }
        }

        Ok(settings)
    }
}

/// 读取 global scope 的配置值
fn read_global_value(conn: &Connection, key: &str) -> Result<Option<String>, Box<dyn Error>> {
    let result = conn.query_row(
        "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
        params![key],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Box::new(e)),
    }
}

/// 写入 global scope 的配置值（INSERT OR REPLACE）
pub fn write_global_value(conn: &Connection, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
    conn.execute(
        r#"
        INSERT INTO config_kv (scope_id, key, value, updated_at)
        VALUES ('global', ?1, ?2, datetime('now'))
        ON CONFLICT(scope_id, key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        "#,
        params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    #[test]
    fn test_settings_defaults_when_table_empty() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let settings = SyncSettings::load(&conn).unwrap();
        assert_eq!(settings.resolve_concurrency, DEFAULT_RESOLVE_CONCURRENCY);
        assert_eq!(settings.apply_concurrency, DEFAULT_APPLY_CONCURRENCY);
    }

    #[test]
    fn test_settings_override_from_config_kv() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        write_global_value(&conn, "sync.apply_concurrency", "2").unwrap();
        // 非法值被忽略
        write_global_value(&conn, "sync.resolve_concurrency", "abc").unwrap();

        let settings = SyncSettings::load(&conn).unwrap();
        assert_eq!(settings.apply_concurrency, 2);
        assert_eq!(settings.resolve_concurrency, DEFAULT_RESOLVE_CONCURRENCY);
    }
}
