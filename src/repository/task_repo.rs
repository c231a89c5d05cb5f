// ==========================================
// 生鲜配送拣选系统 - 拣选任务仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射与原子写入
// 并发保证:
// - 任务创建: UNIQUE 约束 + INSERT OR IGNORE (仅插入语义),
//   并发生成互不报错,输家静默跳过
// - 任务认领: 单条条件 UPDATE,匹配与置位一步完成,
//   两个并发调用方不可能认领到同一任务
// ==========================================

mod core;
mod queries;


pub use core::PickTaskRepository;
pub use queries::{AssigneeCount, StatusCount, TaskListFilter, TaskListPage};
