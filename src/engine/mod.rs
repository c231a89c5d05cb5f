// ==========================================
// 生鲜配送拣选系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL, 所有跳过/丢弃必须输出 reason
// ==========================================

pub mod classifier;
pub mod events;
pub mod packer;
pub mod piece_builder;
pub mod repositories;
pub mod task_generator;

// 重导出核心引擎
pub use classifier::{BundleSpec, ItemClassifier};
pub use events::{
    NoOpEventPublisher, OptionalEventPublisher, TaskEvent, TaskEventPublisher, TaskEventType,
};
pub use packer::{PackingEngine, PackingError};
pub use piece_builder::PieceBuilder;
pub use repositories::{
    ActorDirectory, ContainerCatalog, ItemCatalog, NoOpActorDirectory, OrderSource,
    OverrideSource, ShiftClock, SystemShiftClock,
};
pub use task_generator::{GenerateResult, TaskGenerator};
