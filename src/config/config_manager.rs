// ==========================================
// 生鲜配送拣选系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::{configure_sqlite_connection, open_sqlite_connection};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ===== 配置键 =====
pub const KEY_AUTO_READY_ON_GENERATE: &str = "task_gen/auto_ready_on_generate";
pub const KEY_DEFAULT_TASK_PRIORITY: &str = "task_gen/default_task_priority";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明: 为保证连接行为一致,会对传入连接再次应用统一 PRAGMA (幂等)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            configure_sqlite_connection(&conn_guard)?;
        }
        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值 (scope_id='global')
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

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

    /// 写入 global scope 配置值 (upsert)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    // ==========================================
    // 任务生成配置
    // ==========================================

    /// 生成任务后是否自动释放为可认领 (OPEN → READY)
    ///
    /// 默认: true (分批释放场景可关闭,由运营端手动释放)
    pub fn auto_ready_on_generate(&self) -> Result<bool, Box<dyn Error>> {
        let raw = self.get_config_value(KEY_AUTO_READY_ON_GENERATE)?;
        Ok(raw
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(true))
    }

    /// 新任务默认优先级
    pub fn default_task_priority(&self) -> Result<i32, Box<dyn Error>> {
        let raw = self.get_config_value(KEY_DEFAULT_TASK_PRIORITY)?;
        Ok(raw.and_then(|v| v.trim().parse::<i32>().ok()).unwrap_or(0))
    }

    // ==========================================
    // 配置快照
    // ==========================================

    /// 获取所有 global 配置的快照 (JSON)
    ///
    /// 用途: 生成任务批次时记入审计负载,便于事后解释
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn
            .prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&config_map)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_without_rows() {
        let mgr = manager();
        assert!(mgr.auto_ready_on_generate().unwrap());
        assert_eq!(mgr.default_task_priority().unwrap(), 0);
    }

    #[test]
    fn test_set_and_read_back() {
        let mgr = manager();
        mgr.set_global_config_value(KEY_AUTO_READY_ON_GENERATE, "false")
            .unwrap();
        mgr.set_global_config_value(KEY_DEFAULT_TASK_PRIORITY, "7")
            .unwrap();

        assert!(!mgr.auto_ready_on_generate().unwrap());
        assert_eq!(mgr.default_task_priority().unwrap(), 7);
    }

    #[test]
    fn test_config_snapshot_contains_keys() {
        let mgr = manager();
        mgr.set_global_config_value(KEY_DEFAULT_TASK_PRIORITY, "3")
            .unwrap();

        let snapshot = mgr.get_config_snapshot().unwrap();
        assert!(snapshot.contains(KEY_DEFAULT_TASK_PRIORITY));
        assert!(snapshot.contains("3"));
    }
}
