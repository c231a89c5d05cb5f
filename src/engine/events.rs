// ==========================================
// 生鲜配送拣选系统 - 引擎层事件发布
// ==========================================
// 职责: 定义任务事件发布 trait,实现依赖倒置
// 说明: Engine 层定义 trait,外围系统 (看板/通知) 实现适配器
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 任务事件类型
// ==========================================

/// 任务事件触发类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskEventType {
    /// 批次生成完成
    TasksGenerated,
    /// 任务被认领
    TaskClaimed,
    /// 任务完成
    TaskCompleted,
    /// 手动触发
    ManualTrigger,
}

impl TaskEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            TaskEventType::TasksGenerated => "TasksGenerated",
            TaskEventType::TaskClaimed => "TaskClaimed",
            TaskEventType::TaskCompleted => "TaskCompleted",
            TaskEventType::ManualTrigger => "ManualTrigger",
        }
    }
}

/// 任务事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEvent {
    /// 仓配中心
    pub work_center: String,
    /// 班次名称
    pub shift_name: String,
    /// 班次日期
    pub shift_date: NaiveDate,
    /// 事件类型
    pub event_type: TaskEventType,
    /// 事件来源描述
    pub source: Option<String>,
    /// 涉及任务数
    pub count: usize,
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 任务事件发布者 Trait
///
/// Engine 层定义,外围系统实现;
/// 通过 trait 解除 Engine 对下游看板/通知系统的直接依赖
pub trait TaskEventPublisher: Send + Sync {
    /// 发布任务事件
    fn publish(&self, event: TaskEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者 (单元测试等不需要事件的场景)
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl TaskEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: TaskEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - work_center={}, event_type={}",
            event.work_center,
            event.event_type.as_str()
        );
        Ok(())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn TaskEventPublisher>> 的使用
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn TaskEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn TaskEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例 (不发布事件)
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件 (如果有发布者)
    pub fn publish(&self, event: TaskEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者,跳过事件 - event_type={}",
                    event.event_type.as_str()
                );
                Ok(())
            }
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event_type: TaskEventType) -> TaskEvent {
        TaskEvent {
            work_center: "WC01".to_string(),
            shift_name: "MORNING".to_string(),
            shift_date: NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
            event_type,
            source: Some("TaskGenerator".to_string()),
            count: 3,
        }
    }

    #[test]
    fn test_noop_publisher() {
        let publisher = NoOpEventPublisher;
        assert!(publisher.publish(event(TaskEventType::TasksGenerated)).is_ok());
    }

    #[test]
    fn test_optional_publisher_none() {
        let publisher = OptionalEventPublisher::none();
        assert!(!publisher.is_configured());
        assert!(publisher.publish(event(TaskEventType::ManualTrigger)).is_ok());
    }

    #[test]
    fn test_optional_publisher_with_noop() {
        let noop = Arc::new(NoOpEventPublisher) as Arc<dyn TaskEventPublisher>;
        let publisher = OptionalEventPublisher::with_publisher(noop);
        assert!(publisher.is_configured());
        assert!(publisher.publish(event(TaskEventType::TaskClaimed)).is_ok());
    }
}
