// ==========================================
// 生鲜配送拣选系统 - 领域层
// ==========================================
// 职责: 实体与类型定义,不含数据访问与业务流程
// ==========================================

pub mod container;
pub mod order;
pub mod packing;
pub mod task;
pub mod types;

// 重导出核心实体
pub use container::ContainerType;
pub use order::{CustomerOrder, ItemInfo, OrderLine};
pub use packing::{
    BoxContentItem, ItemRollup, PackedBox, PackingOverride, PackingPlan, PackingRule,
    PackingSummary, Piece,
};
pub use task::{PickTask, ShiftScope, TaskAuditEntry, TaskProgress};
