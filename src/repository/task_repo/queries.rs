// ==========================================
// 拣选任务仓储 - 查询操作
// ==========================================

use super::core::PickTaskRepository;
use crate::domain::task::{PickTask, ShiftScope};
use crate::domain::types::TaskStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::params;
use rusqlite::types::Value;
use std::collections::HashSet;

/// 列表过滤条件 (作用域必填,其余可选)
#[derive(Debug, Clone)]
pub struct TaskListFilter {
    pub scope: ShiftScope,
    pub status: Option<TaskStatus>,
    pub assigned_picker: Option<String>,
    pub unassigned_only: bool,
    pub limit: i64,
    pub offset: i64,
}

impl TaskListFilter {
    pub fn for_scope(scope: ShiftScope) -> Self {
        Self {
            scope,
            status: None,
            assigned_picker: None,
            unassigned_only: false,
            limit: 100,
            offset: 0,
        }
    }
}

/// 按状态计数
#[derive(Debug, Clone, serde::Serialize)]
pub struct StatusCount {
    pub status: TaskStatus,
    pub count: i64,
}

/// 按分配计数 (picker_id=None 表示未分配)
#[derive(Debug, Clone, serde::Serialize)]
pub struct AssigneeCount {
    pub picker_id: Option<String>,
    pub count: i64,
}

/// 分页结果
#[derive(Debug, Clone)]
pub struct TaskListPage {
    pub items: Vec<PickTask>,
    pub total: i64,
}

// 列表固定排序: 状态序 (READY 最前, DONE 最后) → 优先级降序 → 创建时间升序
const LISTING_ORDER: &str = r#"
    ORDER BY CASE status
        WHEN 'READY' THEN 0
        WHEN 'CLAIMED' THEN 1
        WHEN 'IN_PROGRESS' THEN 2
        WHEN 'OPEN' THEN 3
        WHEN 'PROBLEM' THEN 4
        WHEN 'CANCELLED' THEN 5
        ELSE 6
    END, priority DESC, created_at ASC, task_id ASC
"#;

impl PickTaskRepository {
    // ==========================================
    // 单条查询
    // ==========================================

    /// 按主键查询
    pub fn find_by_id(&self, task_id: &str) -> RepositoryResult<Option<PickTask>> {
        let conn = self.get_conn()?;
        Self::row_by_id(&conn, task_id)
    }

    /// 按作用域 + 订单查询 (唯一键)
    pub fn find_by_scope_and_order(
        &self,
        scope: &ShiftScope,
        order_id: &str,
    ) -> RepositoryResult<Option<PickTask>> {
        use rusqlite::OptionalExtension;

        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "{} WHERE work_center = ?1 AND shift_name = ?2 AND shift_date = ?3 AND order_id = ?4",
                    Self::SELECT_COLUMNS
                ),
                params![scope.work_center, scope.shift_name, scope.shift_date, order_id],
                Self::map_raw_row,
            )
            .optional()?;

        raw.map(Self::into_task).transpose()
    }

    /// 作用域内已有任务的订单 ID 集合 (生成器去重用)
    pub fn existing_order_ids(&self, scope: &ShiftScope) -> RepositoryResult<HashSet<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT order_id FROM pick_task WHERE work_center = ?1 AND shift_name = ?2 AND shift_date = ?3",
        )?;
        let rows = stmt.query_map(
            params![scope.work_center, scope.shift_name, scope.shift_date],
            |row| row.get::<_, String>(0),
        )?;
        let mut set = HashSet::new();
        for row in rows {
            set.insert(row?);
        }
        Ok(set)
    }

    // ==========================================
    // 列表查询
    // ==========================================

    /// 分页列表 (固定状态序排序)
    pub fn list(&self, filter: &TaskListFilter) -> RepositoryResult<TaskListPage> {
        if filter.limit < 0 || filter.offset < 0 {
            return Err(RepositoryError::ValidationError(
                "limit/offset 不允许为负数".to_string(),
            ));
        }

        let (where_clause, values) = Self::build_where(filter);
        let conn = self.get_conn()?;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM pick_task {}", where_clause),
            rusqlite::params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "{} {} {} LIMIT {} OFFSET {}",
            Self::SELECT_COLUMNS,
            where_clause,
            LISTING_ORDER,
            filter.limit,
            filter.offset
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), Self::map_raw_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(Self::into_task(row?)?);
        }

        Ok(TaskListPage { items, total })
    }

    /// 作用域内按状态计数
    pub fn count_by_status(&self, scope: &ShiftScope) -> RepositoryResult<Vec<StatusCount>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT status, COUNT(*) FROM pick_task
             WHERE work_center = ?1 AND shift_name = ?2 AND shift_date = ?3
             GROUP BY status
            "#,
        )?;
        let rows = stmt.query_map(
            params![scope.work_center, scope.shift_name, scope.shift_date],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )?;

        let mut counts = Vec::new();
        for row in rows {
            let (status_str, count) = row?;
            let status = TaskStatus::from_str(&status_str).ok_or_else(|| {
                RepositoryError::ValidationError(format!("未知任务状态: {}", status_str))
            })?;
            counts.push(StatusCount { status, count });
        }
        counts.sort_by_key(|c| c.status.listing_rank());
        Ok(counts)
    }

    /// 作用域内按分配计数 (NULL 归并为未分配)
    pub fn count_by_assignee(&self, scope: &ShiftScope) -> RepositoryResult<Vec<AssigneeCount>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT assigned_picker, COUNT(*) FROM pick_task
             WHERE work_center = ?1 AND shift_name = ?2 AND shift_date = ?3
             GROUP BY assigned_picker
             ORDER BY assigned_picker IS NULL, assigned_picker
            "#,
        )?;
        let rows = stmt.query_map(
            params![scope.work_center, scope.shift_name, scope.shift_date],
            |row| {
                Ok(AssigneeCount {
                    picker_id: row.get(0)?,
                    count: row.get(1)?,
                })
            },
        )?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 组装 WHERE 子句 (参数化,防 SQL 注入)
    fn build_where(filter: &TaskListFilter) -> (String, Vec<Value>) {
        let mut conditions = vec![
            "work_center = ?".to_string(),
            "shift_name = ?".to_string(),
            "shift_date = ?".to_string(),
        ];
        let mut values: Vec<Value> = vec![
            Value::Text(filter.scope.work_center.clone()),
            Value::Text(filter.scope.shift_name.clone()),
            Value::Text(filter.scope.shift_date.format("%Y-%m-%d").to_string()),
        ];

        if let Some(status) = filter.status {
            conditions.push("status = ?".to_string());
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(ref picker) = filter.assigned_picker {
            conditions.push("assigned_picker = ?".to_string());
            values.push(Value::Text(picker.clone()));
        }
        if filter.unassigned_only {
            conditions.push("assigned_picker IS NULL".to_string());
        }

        (format!("WHERE {}", conditions.join(" AND ")), values)
    }
}
