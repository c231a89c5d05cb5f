// ==========================================
// 生鲜配送拣选系统 - 性能观测
// ==========================================
// 职责: API 操作耗时统计 + SQLite 慢查询日志
// ==========================================

use rusqlite::Connection;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static SLOW_SQL_THRESHOLD_MS: AtomicU64 = AtomicU64::new(0);

thread_local! {
    // 当前线程上活跃 PerfGuard 观测到的 SQL 语句数
    static TRACKED_SQL: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

/// 安装 SQLite profile 回调 (慢查询日志 + 语句计数)
///
/// 开关:
/// - Debug 默认开启; Release 默认关闭
/// - `FRESH_PICKING_PERF_SQL=1` 强制开启
/// - `FRESH_PICKING_SLOW_SQL_MS=50` 配置慢 SQL 阈值 (毫秒)
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let enabled = std::env::var("FRESH_PICKING_PERF_SQL")
        .map(|v| matches!(v.trim(), "1" | "true" | "on" | "yes"))
        .unwrap_or(cfg!(debug_assertions));

    if !enabled {
        conn.profile(None);
        return;
    }

    let slow_ms = std::env::var("FRESH_PICKING_SLOW_SQL_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });
    SLOW_SQL_THRESHOLD_MS.store(slow_ms, Ordering::Relaxed);

    conn.profile(Some(profile_callback));
}

fn profile_callback(sql: &str, duration: Duration) {
    TRACKED_SQL.with(|stack| {
        for count in stack.borrow_mut().iter_mut() {
            *count += 1;
        }
    });

    let threshold = SLOW_SQL_THRESHOLD_MS.load(Ordering::Relaxed);
    let ms = duration.as_millis() as u64;
    if threshold > 0 && ms >= threshold {
        let mut sql_short = sql.trim().replace('\n', " ");
        if sql_short.len() > 400 {
            sql_short.truncate(400);
        }
        tracing::warn!(target: "slow_sql", duration_ms = ms, sql = %sql_short, "slow sql");
    }
}

// ==========================================
// PerfGuard - 操作级性能统计
// ==========================================

/// 作用域结束时输出 elapsed_ms + 观测到的 SQL 语句数
///
/// 使用方式:
/// ```ignore
/// let _perf = fresh_picking::perf::PerfGuard::new("list_tasks_for_shift");
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        TRACKED_SQL.with(|stack| stack.borrow_mut().push(0));
        Self {
            op,
            start: Instant::now(),
        }
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let sql_count = TRACKED_SQL.with(|stack| stack.borrow_mut().pop().unwrap_or(0));
        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            sql_count,
            "done"
        );
    }
}
