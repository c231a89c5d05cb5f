// ==========================================
// 生鲜配送拣选系统 - 拣选任务 API
// ==========================================
// 职责: 面向调度触发器 / 运营看板 / 拣选端的业务接口
// 约定: 作用域参数先校验后访问存储;
//       认领无可用任务返回 None,从不报错、从不内部重试
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::ScopeValidator;
use crate::domain::task::{PickTask, ShiftScope};
use crate::domain::types::TaskStatus;
use crate::engine::repositories::{ActorDirectory, ShiftClock};
use crate::engine::task_generator::{GenerateResult, TaskGenerator};
use crate::perf::PerfGuard;
use crate::repository::task_repo::{
    AssigneeCount, PickTaskRepository, StatusCount, TaskListFilter,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

// ==========================================
// 列表请求 / 响应
// ==========================================

/// 列表请求参数 (字符串形态,由 API 层解析与校验)
#[derive(Debug, Clone)]
pub struct TaskListRequest {
    pub work_center: String,
    pub shift_name: String,
    pub shift_date: String,
    pub status: Option<String>,
    pub assigned_picker: Option<String>,
    pub unassigned_only: bool,
    pub limit: i64,
    pub offset: i64,
}

/// 列表响应: 分页条目 + 按状态/按分配的计数
#[derive(Debug)]
pub struct TaskListResponse {
    pub items: Vec<PickTask>,
    pub total: i64,
    pub status_counts: Vec<StatusCount>,
    pub assignee_counts: Vec<AssigneeCount>,
}

// ==========================================
// TaskApi - 拣选任务 API
// ==========================================
pub struct TaskApi {
    task_repo: Arc<PickTaskRepository>,
    generator: Arc<TaskGenerator>,
    shift_clock: Arc<dyn ShiftClock>,
    actor_directory: Arc<dyn ActorDirectory>,
}

impl TaskApi {
    pub fn new(
        task_repo: Arc<PickTaskRepository>,
        generator: Arc<TaskGenerator>,
        shift_clock: Arc<dyn ShiftClock>,
        actor_directory: Arc<dyn ActorDirectory>,
    ) -> Self {
        Self {
            task_repo,
            generator,
            shift_clock,
            actor_directory,
        }
    }

    // ==========================================
    // 任务生成 (调度/看板触发)
    // ==========================================

    /// 为指定班次生成拣选任务 (幂等)
    ///
    /// # 参数
    /// - work_center: 仓配中心代码
    /// - shift_name: 班次名称
    /// - shift_date: 班次日期 (YYYY-MM-DD)
    /// - actor: 触发人 (审计用)
    pub fn generate_tasks_for_shift(
        &self,
        work_center: &str,
        shift_name: &str,
        shift_date: &str,
        actor: &str,
    ) -> ApiResult<GenerateResult> {
        let _perf = PerfGuard::new("generate_tasks_for_shift");

        ScopeValidator::validate_work_center(work_center)?;
        ScopeValidator::validate_shift_name(shift_name)?;
        ScopeValidator::validate_actor(actor)?;
        let date = ScopeValidator::parse_shift_date(shift_date)?;

        let scope = ShiftScope::new(work_center.trim(), shift_name.trim(), date);
        let result = self.generator.generate_for_shift(&scope, actor)?;
        Ok(result)
    }

    // ==========================================
    // 任务认领 (拣选端)
    // ==========================================

    /// 认领下一个可认领任务
    ///
    /// 内部解析当前班次作用域; 原子认领保证同一任务
    /// 只会被一个并发调用方拿到。无可认领任务返回 None。
    pub fn claim_next_ready_task(
        &self,
        work_center: &str,
        picker_id: &str,
    ) -> ApiResult<Option<PickTask>> {
        let _perf = PerfGuard::new("claim_next_ready_task");

        ScopeValidator::validate_work_center(work_center)?;
        ScopeValidator::validate_picker_id(picker_id)?;

        let scope = self.shift_clock.current_shift(work_center.trim());
        // 操作人目录查询失败可容忍,审计回退为原始 ID
        let actor_display = self
            .actor_directory
            .display_name(picker_id)
            .unwrap_or_else(|| picker_id.to_string());

        let claimed = self
            .task_repo
            .claim_next_ready(&scope, picker_id, &actor_display)?;

        if let Some(ref task) = claimed {
            info!(
                task_id = %task.task_id,
                order_id = %task.order_id,
                picker_id,
                "任务认领成功"
            );
        }
        Ok(claimed)
    }

    // ==========================================
    // 任务列表 (运营看板)
    // ==========================================

    /// 班次任务列表 (分页 + 按状态/分配计数)
    ///
    /// 固定排序: READY, CLAIMED, IN_PROGRESS, OPEN, PROBLEM,
    /// CANCELLED, DONE → 优先级降序 → 创建时间升序
    pub fn list_tasks_for_shift(&self, request: &TaskListRequest) -> ApiResult<TaskListResponse> {
        let _perf = PerfGuard::new("list_tasks_for_shift");

        ScopeValidator::validate_work_center(&request.work_center)?;
        ScopeValidator::validate_shift_name(&request.shift_name)?;
        ScopeValidator::validate_pagination(request.limit, request.offset)?;
        let date = ScopeValidator::parse_shift_date(&request.shift_date)?;

        let status = match request.status.as_deref() {
            Some(raw) => Some(Self::parse_status(raw)?),
            None => None,
        };
        if let Some(ref picker) = request.assigned_picker {
            ScopeValidator::validate_picker_id(picker)?;
        }

        let scope = ShiftScope::new(request.work_center.trim(), request.shift_name.trim(), date);
        let filter = TaskListFilter {
            scope: scope.clone(),
            status,
            assigned_picker: request.assigned_picker.clone(),
            unassigned_only: request.unassigned_only,
            limit: request.limit,
            offset: request.offset,
        };

        let page = self.task_repo.list(&filter)?;
        let status_counts = self.task_repo.count_by_status(&scope)?;
        let assignee_counts = self.task_repo.count_by_assignee(&scope)?;

        Ok(TaskListResponse {
            items: page.items,
            total: page.total,
            status_counts,
            assignee_counts,
        })
    }

    // ==========================================
    // 单任务操作 (拣选端 / 运营端)
    // ==========================================

    /// 查询任务详情
    pub fn get_task(&self, task_id: &str) -> ApiResult<PickTask> {
        self.task_repo
            .find_by_id(task_id)?
            .ok_or_else(|| ApiError::NotFound(format!("PickTask(id={})不存在", task_id)))
    }

    /// 状态转换 (状态机校验 + 审计)
    ///
    /// 认领请走 claim_next_ready_task; 本接口覆盖其余转换:
    /// 释放 / 开始拣选 / 完成 / 异常挂起 / 取消 / 异常恢复
    pub fn transition_task(
        &self,
        task_id: &str,
        next_status: &str,
        actor: &str,
        note: Option<String>,
    ) -> ApiResult<PickTask> {
        ScopeValidator::validate_actor(actor)?;
        let next = Self::parse_status(next_status)?;

        let actor_display = self
            .actor_directory
            .display_name(actor)
            .unwrap_or_else(|| actor.to_string());

        Ok(self
            .task_repo
            .transition(task_id, next, &actor_display, note)?)
    }

    /// 更新拣选进度 (仅限已分配拣选员)
    pub fn update_task_progress(
        &self,
        task_id: &str,
        picker_id: &str,
        current_box_index: i32,
        placed: BTreeMap<String, f64>,
    ) -> ApiResult<PickTask> {
        ScopeValidator::validate_picker_id(picker_id)?;
        if current_box_index < 0 {
            return Err(ApiError::InvalidInput(format!(
                "current_box_index 不允许为负数: {}",
                current_box_index
            )));
        }

        Ok(self
            .task_repo
            .update_progress(task_id, picker_id, current_box_index, placed)?)
    }

    /// 追加任务备注
    pub fn add_task_note(&self, task_id: &str, actor: &str, note: &str) -> ApiResult<PickTask> {
        ScopeValidator::validate_actor(actor)?;
        if note.trim().is_empty() {
            return Err(ApiError::InvalidInput("备注不允许为空".to_string()));
        }

        Ok(self.task_repo.add_note(task_id, actor, note.trim())?)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn parse_status(raw: &str) -> ApiResult<TaskStatus> {
        TaskStatus::from_str(raw.trim())
            .ok_or_else(|| ApiError::InvalidInput(format!("未知任务状态: {}", raw)))
    }
}
