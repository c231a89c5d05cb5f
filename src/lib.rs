// ==========================================
// 生鲜配送拣选系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 装箱方案计算 + 拣选任务分发 (一单一任务,一任务一人)
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 主数据文件导入
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施 (连接初始化/PRAGMA 统一/schema 引导)
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// 性能观测
pub mod perf;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    ContainerKey, FragilityClass, PieceKind, ProduceBucket, QuantityMode, TaskAction, TaskStatus,
};

// 领域实体
pub use domain::{
    BoxContentItem, ContainerType, CustomerOrder, ItemInfo, ItemRollup, OrderLine, PackedBox,
    PackingOverride, PackingPlan, PackingRule, PackingSummary, PickTask, Piece, ShiftScope,
    TaskAuditEntry, TaskProgress,
};

// 引擎
pub use engine::{
    GenerateResult, ItemClassifier, PackingEngine, PackingError, PieceBuilder, TaskGenerator,
};

// API
pub use api::{TaskApi, TaskListRequest, TaskListResponse};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "生鲜配送拣选系统";
