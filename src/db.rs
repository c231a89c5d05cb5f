// ==========================================
// 生鲜配送拣选系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout,减少并发写入时的偶发 busy 错误
// - 提供 schema 引导 (幂等建表)
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout (毫秒)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 默认数据库路径 (系统数据目录下; 不可用时回退当前目录)
pub fn default_db_path() -> String {
    let mut dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.push("fresh-picking");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(error = %e, "数据目录创建失败,回退当前目录");
        return "fresh_picking.db".to_string();
    }
    dir.push("fresh_picking.db");
    dir.display().to_string()
}

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明:
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

/// 读取 schema_version (若表不存在则返回 None)
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
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

/// 初始化数据库 schema (幂等)
///
/// 表清单:
/// - schema_version: 版本标记
/// - config_scope / config_kv: 配置存储
/// - item_catalog: 商品目录 (协作方参考数据)
/// - container_type: 箱型目录
/// - packing_override: 单品装箱覆写
/// - customer_order: 订单 (协作方参考数据,lines 以 JSON 嵌入)
/// - pick_task: 拣选任务 (唯一约束: 仓配中心+班次+日期+订单)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id),
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS item_catalog (
            item_id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            category TEXT,
            type_name TEXT,
            variety TEXT,
            avg_unit_weight_g REAL
        );

        CREATE TABLE IF NOT EXISTS container_type (
            container_key TEXT PRIMARY KEY,
            inner_l_mm REAL NOT NULL,
            inner_w_mm REAL NOT NULL,
            inner_h_mm REAL NOT NULL,
            headroom_frac REAL NOT NULL DEFAULT 0.0,
            usable_liters REAL,
            max_weight_kg REAL NOT NULL,
            vented INTEGER NOT NULL DEFAULT 0,
            max_distinct_items INTEGER
        );

        CREATE TABLE IF NOT EXISTS packing_override (
            item_id TEXT PRIMARY KEY,
            fragility TEXT,
            mixing_allowed INTEGER,
            ventilation_required INTEGER,
            min_container_key TEXT,
            max_kg_per_box REAL,
            density_kg_per_l REAL,
            unit_volume_l REAL
        );

        CREATE TABLE IF NOT EXISTS customer_order (
            order_id TEXT PRIMARY KEY,
            work_center TEXT NOT NULL,
            shift_name TEXT NOT NULL,
            shift_date TEXT NOT NULL,
            lines_json TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_customer_order_scope
        ON customer_order(work_center, shift_name, shift_date);

        CREATE TABLE IF NOT EXISTS pick_task (
            task_id TEXT PRIMARY KEY,
            work_center TEXT NOT NULL,
            shift_name TEXT NOT NULL,
            shift_date TEXT NOT NULL,
            order_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'OPEN',
            priority INTEGER NOT NULL DEFAULT 0,
            assigned_picker TEXT,
            plan_json TEXT NOT NULL,
            total_est_kg REAL NOT NULL DEFAULT 0,
            total_liters REAL NOT NULL DEFAULT 0,
            total_est_units INTEGER NOT NULL DEFAULT 0,
            box_count INTEGER NOT NULL DEFAULT 0,
            progress_json TEXT NOT NULL,
            audit_json TEXT NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(work_center, shift_name, shift_date, order_id)
        );

        CREATE INDEX IF NOT EXISTS idx_pick_task_scope_status
        ON pick_task(work_center, shift_name, shift_date, status);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}
