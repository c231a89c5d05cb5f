// ==========================================
// 生鲜配送拣选系统 - 引擎层协作方接口
// ==========================================
// 职责: 定义任务生成/认领所依赖的协作方 trait
// 说明: Engine 层定义 trait,Repository 层提供 SQLite 适配器,
//       实现依赖倒置; 协作方自身的 CRUD 与校验不在本系统范围内
// ==========================================

use crate::domain::container::ContainerType;
use crate::domain::order::{CustomerOrder, ItemInfo};
use crate::domain::packing::PackingOverride;
use crate::domain::task::ShiftScope;
use crate::repository::error::RepositoryResult;
use chrono::{Local, Timelike};
use std::collections::HashMap;

// ==========================================
// OrderSource - 订单来源
// ==========================================
// 生成器按作用域拉取订单,不做任何流水线阶段过滤
pub trait OrderSource: Send + Sync {
    /// 查询指定 (仓配中心, 班次, 日期) 的全部订单
    fn find_orders_for_shift(&self, scope: &ShiftScope) -> RepositoryResult<Vec<CustomerOrder>>;
}

// ==========================================
// ItemCatalog - 商品目录
// ==========================================
pub trait ItemCatalog: Send + Sync {
    /// 批量查询商品 (单次批量,不允许逐单查询)
    fn find_items_by_ids(&self, ids: &[String]) -> RepositoryResult<HashMap<String, ItemInfo>>;
}

// ==========================================
// ContainerCatalog - 箱型目录
// ==========================================
pub trait ContainerCatalog: Send + Sync {
    /// 列出全部可用箱型
    fn list_container_types(&self) -> RepositoryResult<Vec<ContainerType>>;
}

// ==========================================
// OverrideSource - 单品装箱覆写来源
// ==========================================
pub trait OverrideSource: Send + Sync {
    /// 批量查询单品覆写 (无覆写的商品不出现在结果中)
    fn find_overrides_by_ids(
        &self,
        ids: &[String],
    ) -> RepositoryResult<HashMap<String, PackingOverride>>;
}

// ==========================================
// ShiftClock - 当前班次解析
// ==========================================
// 认领器据此把"当前时刻"解析为 (班次, 本地日期) 作用域
pub trait ShiftClock: Send + Sync {
    fn current_shift(&self, work_center: &str) -> ShiftScope;
}

/// 按本地时间切分班次的默认实现
///
/// 06:00-14:00 MORNING, 14:00-22:00 AFTERNOON, 其余 NIGHT
pub struct SystemShiftClock;

impl ShiftClock for SystemShiftClock {
    fn current_shift(&self, work_center: &str) -> ShiftScope {
        let now = Local::now();
        let shift_name = match now.hour() {
            6..=13 => "MORNING",
            14..=21 => "AFTERNOON",
            _ => "NIGHT",
        };
        ShiftScope::new(work_center, shift_name, now.date_naive())
    }
}

// ==========================================
// ActorDirectory - 操作人目录
// ==========================================
// 审计记录的操作人显示名; 查询失败可容忍 (回退为原始 ID)
pub trait ActorDirectory: Send + Sync {
    fn display_name(&self, actor_id: &str) -> Option<String>;
}

/// 空实现: 审计记录直接使用原始 ID
pub struct NoOpActorDirectory;

impl ActorDirectory for NoOpActorDirectory {
    fn display_name(&self, _actor_id: &str) -> Option<String> {
        None
    }
}
