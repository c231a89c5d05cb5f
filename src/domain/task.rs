// ==========================================
// 生鲜配送拣选系统 - 拣选任务领域模型
// ==========================================
// 红线: 所有写入必须追加审计记录
// 唯一性: (work_center, shift_name, shift_date, order_id) 每班次每单一个任务
// ==========================================

use crate::domain::packing::PackingPlan;
use crate::domain::types::{TaskAction, TaskStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ==========================================
// ShiftScope - 班次作用域
// ==========================================
// 任务唯一性与认领检索的作用域三元组
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShiftScope {
    pub work_center: String,
    pub shift_name: String,
    pub shift_date: NaiveDate,
}

impl ShiftScope {
    pub fn new(work_center: &str, shift_name: &str, shift_date: NaiveDate) -> Self {
        Self {
            work_center: work_center.to_string(),
            shift_name: shift_name.to_string(),
            shift_date,
        }
    }
}

// ==========================================
// TaskProgress - 拣选进度
// ==========================================
// placed: item_id → 已拣数量 (kg 或件数,与订单行计量方式一致)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskProgress {
    pub current_box_index: i32,
    pub placed: BTreeMap<String, f64>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

// ==========================================
// TaskAuditEntry - 审计记录
// ==========================================
// 追加式日志,与任务同存 (不设独立审计表)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAuditEntry {
    pub entry_id: String,
    pub action: String, // TaskAction 字符串形式
    pub actor: String,
    pub at: DateTime<Utc>,
    pub note: Option<String>,
}

impl TaskAuditEntry {
    pub fn new(action: TaskAction, actor: &str, note: Option<String>) -> Self {
        Self {
            entry_id: Uuid::new_v4().to_string(),
            action: action.as_str().to_string(),
            actor: actor.to_string(),
            at: Utc::now(),
            note,
        }
    }
}

// ==========================================
// PickTask - 拣选任务
// ==========================================
// 对齐: pick_task 表
// 生命周期: 只创建与转换,从不删除 (终态 DONE / CANCELLED)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickTask {
    // ===== 主键与作用域 =====
    pub task_id: String,
    pub work_center: String,
    pub shift_name: String,
    pub shift_date: NaiveDate,
    pub order_id: String,

    // ===== 状态机 =====
    pub status: TaskStatus,
    pub priority: i32,
    pub assigned_picker: Option<String>,

    // ===== 方案快照与汇总缓存 =====
    // 汇总字段落库前必须由 plan.boxes 重算 (缓存,不是事实源)
    pub plan: PackingPlan,
    pub total_est_kg: f64,
    pub total_liters: f64,
    pub total_est_units: i64,
    pub box_count: i32,

    // ===== 进度与审计 =====
    pub progress: TaskProgress,
    pub audit: Vec<TaskAuditEntry>,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PickTask {
    /// 从装箱方案创建新任务 (状态 OPEN,附 Generate 审计记录)
    pub fn from_plan(
        scope: &ShiftScope,
        order_id: &str,
        plan: PackingPlan,
        priority: i32,
        actor: &str,
    ) -> Self {
        let now = Utc::now();
        let mut task = Self {
            task_id: Uuid::new_v4().to_string(),
            work_center: scope.work_center.clone(),
            shift_name: scope.shift_name.clone(),
            shift_date: scope.shift_date,
            order_id: order_id.to_string(),
            status: TaskStatus::Open,
            priority,
            assigned_picker: None,
            plan,
            total_est_kg: 0.0,
            total_liters: 0.0,
            total_est_units: 0,
            box_count: 0,
            progress: TaskProgress::default(),
            audit: vec![TaskAuditEntry::new(TaskAction::Generate, actor, None)],
            notes: None,
            created_at: now,
            updated_at: now,
        };
        task.recompute_totals();
        task
    }

    /// 任务作用域
    pub fn scope(&self) -> ShiftScope {
        ShiftScope::new(&self.work_center, &self.shift_name, self.shift_date)
    }

    /// 由 plan.boxes 重算汇总缓存 (落库前必须调用)
    pub fn recompute_totals(&mut self) {
        self.total_est_kg = self.plan.total_est_kg();
        self.total_liters = self.plan.total_liters();
        self.total_est_units = self.plan.total_est_units();
        self.box_count = self.plan.boxes.len() as i32;
    }

    /// 追加审计记录
    pub fn append_audit(&mut self, action: TaskAction, actor: &str, note: Option<String>) {
        self.audit.push(TaskAuditEntry::new(action, actor, note));
    }

    /// 校验 assigned_picker 与状态的一致性
    ///
    /// 不变量: assigned_picker 非空 ⇔ 状态 ∈ {CLAIMED, IN_PROGRESS, DONE}
    pub fn assignment_invariant_holds(&self) -> bool {
        self.assigned_picker.is_some() == self.status.requires_assignee()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::packing::{PackedBox, PackingSummary};
    use crate::domain::types::ContainerKey;

    fn empty_plan() -> PackingPlan {
        PackingPlan {
            boxes: vec![PackedBox {
                box_no: 1,
                container_key: ContainerKey::Small,
                vented: false,
                fill_liters: 3.0,
                fill_kg: 2.0,
                fill_percent: 30.0,
                contents: vec![],
            }],
            summary: PackingSummary {
                box_count: 1,
                items: vec![],
                warnings: vec![],
            },
        }
    }

    #[test]
    fn test_from_plan_recomputes_totals_and_audits() {
        let scope = ShiftScope::new("WC01", "MORNING", NaiveDate::from_ymd_opt(2026, 8, 7).unwrap());
        let task = PickTask::from_plan(&scope, "ORD-1", empty_plan(), 5, "scheduler");

        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(task.box_count, 1);
        assert!((task.total_est_kg - 2.0).abs() < 1e-9);
        assert!((task.total_liters - 3.0).abs() < 1e-9);
        assert_eq!(task.audit.len(), 1);
        assert_eq!(task.audit[0].action, "Generate");
        assert!(task.assignment_invariant_holds());
    }

    #[test]
    fn test_assignment_invariant() {
        let scope = ShiftScope::new("WC01", "MORNING", NaiveDate::from_ymd_opt(2026, 8, 7).unwrap());
        let mut task = PickTask::from_plan(&scope, "ORD-1", empty_plan(), 0, "scheduler");

        task.status = TaskStatus::Claimed;
        assert!(!task.assignment_invariant_holds());

        task.assigned_picker = Some("picker-1".to_string());
        assert!(task.assignment_invariant_holds());

        task.status = TaskStatus::Problem;
        assert!(!task.assignment_invariant_holds());
        task.assigned_picker = None;
        assert!(task.assignment_invariant_holds());
    }
}
