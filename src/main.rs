// ==========================================
// 生鲜配送拣选系统 - 主入口
// ==========================================
// 职责: 初始化日志/数据库,打印系统信息
// 说明: 业务操作通过库接口与 ops 工具 (generate_shift_tasks) 进行,
//       本入口只做环境引导
// ==========================================

use fresh_picking::db::{
    default_db_path, init_schema, open_sqlite_connection, read_schema_version,
    CURRENT_SCHEMA_VERSION,
};
use fresh_picking::perf::install_sqlite_tracing;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志系统
    fresh_picking::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", fresh_picking::APP_NAME);
    tracing::info!("系统版本: {}", fresh_picking::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let mut conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;
    install_sqlite_tracing(&mut conn);

    match read_schema_version(&conn)? {
        Some(v) if v == CURRENT_SCHEMA_VERSION => {
            tracing::info!("schema_version={} (最新)", v);
        }
        Some(v) => {
            tracing::warn!(
                "schema_version={} 与当前代码期望 {} 不一致",
                v,
                CURRENT_SCHEMA_VERSION
            );
        }
        None => {
            tracing::warn!("未找到 schema_version 表");
        }
    }

    tracing::info!("初始化完成");
    Ok(())
}
