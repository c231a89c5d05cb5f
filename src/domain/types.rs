// ==========================================
// 生鲜配送拣选系统 - 领域类型定义
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 易损等级 (Fragility Class)
// ==========================================
// 红线: 等级制,不是评分制
// 用途: 决定单袋重量上限与装箱先后顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FragilityClass {
    Sturdy,      // 耐压(根茎类)
    Normal,      // 一般
    Fragile,     // 易损(叶菜类)
    VeryFragile, // 极易损(浆果/番茄)
}

impl FragilityClass {
    /// 单袋重量上限 (kg)
    ///
    /// 越易损的品类单袋越小,避免压伤
    pub fn bag_cap_kg(&self) -> f64 {
        match self {
            FragilityClass::Sturdy => 3.0,
            FragilityClass::Normal => 2.0,
            FragilityClass::Fragile => 1.5,
            FragilityClass::VeryFragile => 0.7,
        }
    }

    /// 装箱顺序权重
    ///
    /// 耐压件先装(压箱底),易损件后装(置顶层);
    /// 系统不建 3D 堆叠模型,仅用装箱顺序表达上下关系
    pub fn placement_rank(&self) -> u8 {
        match self {
            FragilityClass::Sturdy => 0,
            FragilityClass::Normal => 1,
            FragilityClass::Fragile => 2,
            FragilityClass::VeryFragile => 3,
        }
    }
}

impl fmt::Display for FragilityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragilityClass::Sturdy => write!(f, "STURDY"),
            FragilityClass::Normal => write!(f, "NORMAL"),
            FragilityClass::Fragile => write!(f, "FRAGILE"),
            FragilityClass::VeryFragile => write!(f, "VERY_FRAGILE"),
        }
    }
}

// ==========================================
// 品类桶 (Produce Bucket)
// ==========================================
// 分类引擎输出: 关键词命中 → 桶 → 装箱默认参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProduceBucket {
    Leafy,      // 叶菜
    Tomatoes,   // 番茄
    Berries,    // 浆果
    StoneFruit, // 核果
    Roots,      // 根茎
    Alliums,    // 葱蒜
    Cucurbits,  // 瓜类
    Generic,    // 未命中兜底
}

impl fmt::Display for ProduceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProduceBucket::Leafy => write!(f, "LEAFY"),
            ProduceBucket::Tomatoes => write!(f, "TOMATOES"),
            ProduceBucket::Berries => write!(f, "BERRIES"),
            ProduceBucket::StoneFruit => write!(f, "STONE_FRUIT"),
            ProduceBucket::Roots => write!(f, "ROOTS"),
            ProduceBucket::Alliums => write!(f, "ALLIUMS"),
            ProduceBucket::Cucurbits => write!(f, "CUCURBITS"),
            ProduceBucket::Generic => write!(f, "GENERIC"),
        }
    }
}

// ==========================================
// 箱型规格档位 (Container Key)
// ==========================================
// 红线: 档位按箱体大小有序 (Small < Medium < Large),
// "最小箱型" 约束按此序比较,不按字符串比较
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerKey {
    Small,
    Medium,
    Large,
}

impl ContainerKey {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKey::Small => "SMALL",
            ContainerKey::Medium => "MEDIUM",
            ContainerKey::Large => "LARGE",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SMALL" => Some(ContainerKey::Small),
            "MEDIUM" => Some(ContainerKey::Medium),
            "LARGE" => Some(ContainerKey::Large),
            _ => None,
        }
    }
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 计量方式 (Quantity Mode)
// ==========================================
// 订单行按重量(kg)或按件数(unit)售卖,由哪个字段有值推导
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuantityMode {
    Kg,
    Unit,
}

impl fmt::Display for QuantityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantityMode::Kg => write!(f, "KG"),
            QuantityMode::Unit => write!(f, "UNIT"),
        }
    }
}

// ==========================================
// 拣选件类型 (Piece Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PieceKind {
    Bag,    // 散装袋(按重量封顶)
    Bundle, // 预包装件(固定件数,如一打鸡蛋)
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PieceKind::Bag => write!(f, "BAG"),
            PieceKind::Bundle => write!(f, "BUNDLE"),
        }
    }
}

// ==========================================
// 拣选任务状态 (Task Status)
// ==========================================
// 状态机: OPEN → READY → CLAIMED → IN_PROGRESS → DONE
// PROBLEM / CANCELLED 可从任何非终态进入; 终态不可回退
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Open,       // 已生成,未释放给拣选员
    Ready,      // 可认领
    Claimed,    // 已认领
    InProgress, // 拣选中
    Done,       // 完成(终态)
    Problem,    // 异常挂起
    Cancelled,  // 取消(终态)
}

impl TaskStatus {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "OPEN",
            TaskStatus::Ready => "READY",
            TaskStatus::Claimed => "CLAIMED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
            TaskStatus::Problem => "PROBLEM",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(TaskStatus::Open),
            "READY" => Some(TaskStatus::Ready),
            "CLAIMED" => Some(TaskStatus::Claimed),
            "IN_PROGRESS" => Some(TaskStatus::InProgress),
            "DONE" => Some(TaskStatus::Done),
            "PROBLEM" => Some(TaskStatus::Problem),
            "CANCELLED" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    /// 是否终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Cancelled)
    }

    /// 该状态下 assigned_picker 是否必须非空
    ///
    /// 不变量: assigned_picker 非空 ⇔ 状态 ∈ {CLAIMED, IN_PROGRESS, DONE}
    pub fn requires_assignee(&self) -> bool {
        matches!(
            self,
            TaskStatus::Claimed | TaskStatus::InProgress | TaskStatus::Done
        )
    }

    /// 列表展示排序权重
    ///
    /// 固定顺序: READY, CLAIMED, IN_PROGRESS, OPEN, PROBLEM, CANCELLED, DONE
    pub fn listing_rank(&self) -> i32 {
        match self {
            TaskStatus::Ready => 0,
            TaskStatus::Claimed => 1,
            TaskStatus::InProgress => 2,
            TaskStatus::Open => 3,
            TaskStatus::Problem => 4,
            TaskStatus::Cancelled => 5,
            TaskStatus::Done => 6,
        }
    }

    /// 状态转换合法性
    ///
    /// # 规则
    /// 1. 终态不可再转换
    /// 2. PROBLEM / CANCELLED 可从任何非终态进入
    /// 3. 其余只允许沿主链前进一步 (PROBLEM 可恢复为 READY)
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == TaskStatus::Problem || next == TaskStatus::Cancelled {
            return true;
        }
        matches!(
            (self, next),
            (TaskStatus::Open, TaskStatus::Ready)
                | (TaskStatus::Ready, TaskStatus::Claimed)
                | (TaskStatus::Claimed, TaskStatus::InProgress)
                | (TaskStatus::InProgress, TaskStatus::Done)
                | (TaskStatus::Problem, TaskStatus::Ready)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 任务操作类型 (Task Action)
// ==========================================
// 用途: 审计轨迹的操作词表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskAction {
    Generate, // 生成任务
    Release,  // 释放给拣选员 (OPEN → READY)
    Claim,    // 认领
    Start,    // 开始拣选
    Progress, // 进度更新
    Complete, // 完成
    Problem,  // 异常挂起
    Cancel,   // 取消
    Note,     // 备注
}

impl TaskAction {
    /// 转换为字符串 (用于审计存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskAction::Generate => "Generate",
            TaskAction::Release => "Release",
            TaskAction::Claim => "Claim",
            TaskAction::Start => "Start",
            TaskAction::Progress => "Progress",
            TaskAction::Complete => "Complete",
            TaskAction::Problem => "Problem",
            TaskAction::Cancel => "Cancel",
            TaskAction::Note => "Note",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Generate" => Some(TaskAction::Generate),
            "Release" => Some(TaskAction::Release),
            "Claim" => Some(TaskAction::Claim),
            "Start" => Some(TaskAction::Start),
            "Progress" => Some(TaskAction::Progress),
            "Complete" => Some(TaskAction::Complete),
            "Problem" => Some(TaskAction::Problem),
            "Cancel" => Some(TaskAction::Cancel),
            "Note" => Some(TaskAction::Note),
            _ => None,
        }
    }
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_key_ordering() {
        assert!(ContainerKey::Small < ContainerKey::Medium);
        assert!(ContainerKey::Medium < ContainerKey::Large);
    }

    #[test]
    fn test_bag_cap_tighter_for_fragile() {
        assert!(FragilityClass::VeryFragile.bag_cap_kg() < FragilityClass::Fragile.bag_cap_kg());
        assert!(FragilityClass::Fragile.bag_cap_kg() < FragilityClass::Normal.bag_cap_kg());
        assert!(FragilityClass::Normal.bag_cap_kg() < FragilityClass::Sturdy.bag_cap_kg());
    }

    #[test]
    fn test_placement_rank_sturdy_first() {
        assert!(
            FragilityClass::Sturdy.placement_rank() < FragilityClass::VeryFragile.placement_rank()
        );
    }

    #[test]
    fn test_status_roundtrip() {
        for s in [
            TaskStatus::Open,
            TaskStatus::Ready,
            TaskStatus::Claimed,
            TaskStatus::InProgress,
            TaskStatus::Done,
            TaskStatus::Problem,
            TaskStatus::Cancelled,
        ] {
            assert_eq!(TaskStatus::from_str(s.as_str()), Some(s));
        }
    }

    #[test]
    fn test_status_transitions() {
        assert!(TaskStatus::Open.can_transition_to(TaskStatus::Ready));
        assert!(TaskStatus::Ready.can_transition_to(TaskStatus::Claimed));
        assert!(TaskStatus::Claimed.can_transition_to(TaskStatus::InProgress));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Done));

        // 任何非终态可进入 PROBLEM / CANCELLED
        assert!(TaskStatus::Open.can_transition_to(TaskStatus::Cancelled));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Problem));

        // 终态不可回退
        assert!(!TaskStatus::Done.can_transition_to(TaskStatus::Ready));
        assert!(!TaskStatus::Cancelled.can_transition_to(TaskStatus::Problem));

        // 不允许跳步
        assert!(!TaskStatus::Open.can_transition_to(TaskStatus::Claimed));
        assert!(!TaskStatus::Ready.can_transition_to(TaskStatus::Done));
    }

    #[test]
    fn test_listing_rank_fixed_order() {
        assert!(TaskStatus::Ready.listing_rank() < TaskStatus::Claimed.listing_rank());
        assert!(TaskStatus::Claimed.listing_rank() < TaskStatus::InProgress.listing_rank());
        assert!(TaskStatus::InProgress.listing_rank() < TaskStatus::Open.listing_rank());
        assert!(TaskStatus::Open.listing_rank() < TaskStatus::Problem.listing_rank());
        assert!(TaskStatus::Problem.listing_rank() < TaskStatus::Cancelled.listing_rank());
        assert!(TaskStatus::Cancelled.listing_rank() < TaskStatus::Done.listing_rank());
    }
}
