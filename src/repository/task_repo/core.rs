// ==========================================
// 拣选任务仓储 - 核心写入操作
// ==========================================

use crate::domain::task::{PickTask, ShiftScope, TaskProgress};
use crate::domain::types::{TaskAction, TaskStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex};

// ==========================================
// PickTaskRepository - 拣选任务仓储
// ==========================================
pub struct PickTaskRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PickTaskRepository {
    /// 创建新的拣选任务仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入新任务 (仅插入语义)
    ///
    /// 唯一键 (work_center, shift_name, shift_date, order_id) 已存在时
    /// 静默跳过: 并发生成的输家不报错,批次其余订单不受影响。
    /// 落库前重算汇总缓存 (汇总字段不是事实源)。
    ///
    /// # 返回
    /// - Ok(true): 本次插入成功
    /// - Ok(false): 任务已存在,未做任何修改
    pub fn insert_new(&self, task: &PickTask) -> RepositoryResult<bool> {
        let mut task = task.clone();
        task.recompute_totals();

        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            INSERT OR IGNORE INTO pick_task (
                task_id, work_center, shift_name, shift_date, order_id,
                status, priority, assigned_picker,
                plan_json, total_est_kg, total_liters, total_est_units, box_count,
                progress_json, audit_json, notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                task.task_id,
                task.work_center,
                task.shift_name,
                task.shift_date,
                task.order_id,
                task.status.as_str(),
                task.priority,
                task.assigned_picker,
                serde_json::to_string(&task.plan)?,
                task.total_est_kg,
                task.total_liters,
                task.total_est_units,
                task.box_count,
                serde_json::to_string(&task.progress)?,
                serde_json::to_string(&task.audit)?,
                task.notes,
                task.created_at,
                task.updated_at,
            ],
        )?;

        Ok(rows == 1)
    }

    /// 认领下一个可认领任务 (原子操作)
    ///
    /// 单条条件 UPDATE 完成"匹配 + 置位":
    /// - 匹配: 作用域内 status=READY 且未分配,按
    ///   priority 降序 → created_at 升序 (同优先级先到先得) → task_id
    /// - 置位: status=CLAIMED + assigned_picker + updated_at
    /// WHERE 子句在置位时刻重新校验 READY/未分配,
    /// 并发调用方要么拿到不同任务,要么拿到 None。
    /// 同一事务内补写进度起始时间与审计记录。
    ///
    /// # 返回
    /// - Ok(Some(task)): 认领成功
    /// - Ok(None): 作用域内无可认领任务
    pub fn claim_next_ready(
        &self,
        scope: &ShiftScope,
        picker_id: &str,
        actor_display: &str,
    ) -> RepositoryResult<Option<PickTask>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = Utc::now();

        let claimed_id: Option<String> = tx
            .query_row(
                r#"
                UPDATE pick_task
                   SET status = 'CLAIMED', assigned_picker = ?4, updated_at = ?5
                 WHERE task_id = (
                       SELECT task_id FROM pick_task
                        WHERE work_center = ?1 AND shift_name = ?2 AND shift_date = ?3
                          AND status = 'READY' AND assigned_picker IS NULL
                        ORDER BY priority DESC, created_at ASC, task_id ASC
                        LIMIT 1)
                   AND status = 'READY' AND assigned_picker IS NULL
                RETURNING task_id
                "#,
                params![
                    scope.work_center,
                    scope.shift_name,
                    scope.shift_date,
                    picker_id,
                    now
                ],
                |row| row.get(0),
            )
            .optional()?;

        let Some(task_id) = claimed_id else {
            tx.commit()?;
            return Ok(None);
        };

        let mut task = Self::row_by_id(&tx, &task_id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "PickTask".to_string(),
            id: task_id.clone(),
        })?;

        task.progress.started_at = Some(now);
        task.append_audit(TaskAction::Claim, actor_display, None);

        tx.execute(
            "UPDATE pick_task SET progress_json = ?2, audit_json = ?3 WHERE task_id = ?1",
            params![
                task.task_id,
                serde_json::to_string(&task.progress)?,
                serde_json::to_string(&task.audit)?,
            ],
        )?;

        tx.commit()?;
        Ok(Some(task))
    }

    /// 状态转换 (带状态机校验与审计)
    ///
    /// # 规则
    /// - 按 TaskStatus::can_transition_to 校验,终态不可回退
    /// - 进入 CLAIMED/IN_PROGRESS/DONE 要求已有分配拣选员
    /// - 进入 READY/PROBLEM/CANCELLED 清空分配
    ///   (不变量: assigned_picker 非空 ⇔ 状态要求分配)
    /// - 进入 DONE 时记录 finished_at
    pub fn transition(
        &self,
        task_id: &str,
        next: TaskStatus,
        actor: &str,
        note: Option<String>,
    ) -> RepositoryResult<PickTask> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut task = Self::row_by_id(&tx, task_id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "PickTask".to_string(),
            id: task_id.to_string(),
        })?;

        if !task.status.can_transition_to(next) {
            return Err(RepositoryError::InvalidStateTransition {
                from: task.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }

        if next.requires_assignee() {
            if task.assigned_picker.is_none() {
                return Err(RepositoryError::BusinessRuleViolation(format!(
                    "状态 {} 要求已分配拣选员: task_id={}",
                    next, task_id
                )));
            }
        } else {
            task.assigned_picker = None;
        }

        let now = Utc::now();
        if next == TaskStatus::Done {
            task.progress.finished_at = Some(now);
        }

        let action = match next {
            TaskStatus::Ready => TaskAction::Release,
            TaskStatus::Claimed => TaskAction::Claim,
            TaskStatus::InProgress => TaskAction::Start,
            TaskStatus::Done => TaskAction::Complete,
            TaskStatus::Problem => TaskAction::Problem,
            TaskStatus::Cancelled => TaskAction::Cancel,
            TaskStatus::Open => TaskAction::Generate,
        };

        task.status = next;
        task.updated_at = now;
        task.append_audit(action, actor, note);

        tx.execute(
            r#"
            UPDATE pick_task
               SET status = ?2, assigned_picker = ?3, progress_json = ?4,
                   audit_json = ?5, updated_at = ?6
             WHERE task_id = ?1
            "#,
            params![
                task.task_id,
                task.status.as_str(),
                task.assigned_picker,
                serde_json::to_string(&task.progress)?,
                serde_json::to_string(&task.audit)?,
                task.updated_at,
            ],
        )?;

        tx.commit()?;
        Ok(task)
    }

    /// 更新拣选进度 (仅限已分配拣选员,状态 CLAIMED/IN_PROGRESS)
    pub fn update_progress(
        &self,
        task_id: &str,
        picker_id: &str,
        current_box_index: i32,
        placed: std::collections::BTreeMap<String, f64>,
    ) -> RepositoryResult<PickTask> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut task = Self::row_by_id(&tx, task_id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "PickTask".to_string(),
            id: task_id.to_string(),
        })?;

        if task.assigned_picker.as_deref() != Some(picker_id) {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "进度只能由已分配拣选员更新: task_id={}, picker_id={}",
                task_id, picker_id
            )));
        }
        if !matches!(task.status, TaskStatus::Claimed | TaskStatus::InProgress) {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "状态 {} 不允许更新进度: task_id={}",
                task.status, task_id
            )));
        }

        let now = Utc::now();
        task.progress.current_box_index = current_box_index;
        task.progress.placed = placed;
        task.updated_at = now;
        task.append_audit(
            TaskAction::Progress,
            picker_id,
            Some(format!("box_index={}", current_box_index)),
        );

        tx.execute(
            "UPDATE pick_task SET progress_json = ?2, audit_json = ?3, updated_at = ?4 WHERE task_id = ?1",
            params![
                task.task_id,
                serde_json::to_string(&task.progress)?,
                serde_json::to_string(&task.audit)?,
                task.updated_at,
            ],
        )?;

        tx.commit()?;
        Ok(task)
    }

    /// 追加任务备注 (附 Note 审计记录)
    pub fn add_note(&self, task_id: &str, actor: &str, note: &str) -> RepositoryResult<PickTask> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut task = Self::row_by_id(&tx, task_id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "PickTask".to_string(),
            id: task_id.to_string(),
        })?;

        task.notes = Some(match task.notes.take() {
            Some(existing) => format!("{}\n{}", existing, note),
            None => note.to_string(),
        });
        task.updated_at = Utc::now();
        task.append_audit(TaskAction::Note, actor, Some(note.to_string()));

        tx.execute(
            "UPDATE pick_task SET notes = ?2, audit_json = ?3, updated_at = ?4 WHERE task_id = ?1",
            params![
                task.task_id,
                task.notes,
                serde_json::to_string(&task.audit)?,
                task.updated_at,
            ],
        )?;

        tx.commit()?;
        Ok(task)
    }

    /// 批量释放: 作用域内所有 OPEN 任务 → READY (逐个追加审计)
    ///
    /// # 返回
    /// - Ok(count): 本次释放的任务数
    pub fn mark_ready_bulk(&self, scope: &ShiftScope, actor: &str) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = Utc::now();

        let open_ids: Vec<String> = {
            let mut stmt = tx.prepare(
                r#"
                SELECT task_id FROM pick_task
                 WHERE work_center = ?1 AND shift_name = ?2 AND shift_date = ?3
                   AND status = 'OPEN'
                 ORDER BY created_at ASC, task_id ASC
                "#,
            )?;
            let rows = stmt.query_map(
                params![scope.work_center, scope.shift_name, scope.shift_date],
                |row| row.get(0),
            )?;
            rows.collect::<Result<Vec<String>, _>>()?
        };

        for task_id in &open_ids {
            let mut task =
                Self::row_by_id(&tx, task_id)?.ok_or_else(|| RepositoryError::NotFound {
                    entity: "PickTask".to_string(),
                    id: task_id.clone(),
                })?;
            task.status = TaskStatus::Ready;
            task.updated_at = now;
            task.append_audit(TaskAction::Release, actor, None);

            tx.execute(
                "UPDATE pick_task SET status = 'READY', audit_json = ?2, updated_at = ?3 WHERE task_id = ?1",
                params![task.task_id, serde_json::to_string(&task.audit)?, task.updated_at],
            )?;
        }

        tx.commit()?;
        Ok(open_ids.len())
    }

    // ==========================================
    // 行映射 (core 与 queries 共用)
    // ==========================================

    /// 按主键读取单行 (可在事务内使用)
    pub(super) fn row_by_id(
        conn: &Connection,
        task_id: &str,
    ) -> RepositoryResult<Option<PickTask>> {
        let raw = conn
            .query_row(
                &format!("{} WHERE task_id = ?1", Self::SELECT_COLUMNS),
                params![task_id],
                Self::map_raw_row,
            )
            .optional()?;

        raw.map(Self::into_task).transpose()
    }

    pub(super) const SELECT_COLUMNS: &'static str = r#"
        SELECT task_id, work_center, shift_name, shift_date, order_id,
               status, priority, assigned_picker,
               plan_json, total_est_kg, total_liters, total_est_units, box_count,
               progress_json, audit_json, notes, created_at, updated_at
          FROM pick_task
    "#;

    /// 行 → 原始列值 (JSON/枚举转换推迟到 into_task)
    pub(super) fn map_raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTaskRow> {
        Ok(RawTaskRow {
            task_id: row.get(0)?,
            work_center: row.get(1)?,
            shift_name: row.get(2)?,
            shift_date: row.get(3)?,
            order_id: row.get(4)?,
            status: row.get(5)?,
            priority: row.get(6)?,
            assigned_picker: row.get(7)?,
            plan_json: row.get(8)?,
            total_est_kg: row.get(9)?,
            total_liters: row.get(10)?,
            total_est_units: row.get(11)?,
            box_count: row.get(12)?,
            progress_json: row.get(13)?,
            audit_json: row.get(14)?,
            notes: row.get(15)?,
            created_at: row.get(16)?,
            updated_at: row.get(17)?,
        })
    }

    /// 原始列值 → 领域实体
    pub(super) fn into_task(raw: RawTaskRow) -> RepositoryResult<PickTask> {
        let status = TaskStatus::from_str(&raw.status).ok_or_else(|| {
            RepositoryError::ValidationError(format!("未知任务状态: {}", raw.status))
        })?;
        let progress: TaskProgress = serde_json::from_str(&raw.progress_json)?;

        Ok(PickTask {
            task_id: raw.task_id,
            work_center: raw.work_center,
            shift_name: raw.shift_name,
            shift_date: raw.shift_date,
            order_id: raw.order_id,
            status,
            priority: raw.priority,
            assigned_picker: raw.assigned_picker,
            plan: serde_json::from_str(&raw.plan_json)?,
            total_est_kg: raw.total_est_kg,
            total_liters: raw.total_liters,
            total_est_units: raw.total_est_units,
            box_count: raw.box_count,
            progress,
            audit: serde_json::from_str(&raw.audit_json)?,
            notes: raw.notes,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        })
    }
}

/// pick_task 行的原始列值
pub(super) struct RawTaskRow {
    pub task_id: String,
    pub work_center: String,
    pub shift_name: String,
    pub shift_date: chrono::NaiveDate,
    pub order_id: String,
    pub status: String,
    pub priority: i32,
    pub assigned_picker: Option<String>,
    pub plan_json: String,
    pub total_est_kg: f64,
    pub total_liters: f64,
    pub total_est_units: i64,
    pub box_count: i32,
    pub progress_json: String,
    pub audit_json: String,
    pub notes: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
