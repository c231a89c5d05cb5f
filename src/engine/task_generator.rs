// ==========================================
// 生鲜配送拣选系统 - 任务生成引擎
// ==========================================
// 职责: "本班次每个缺任务的订单,算方案并落任务" 的幂等编排
// 并发保证: 唯一约束 + 仅插入写,多个生成器并发跑同一作用域
//           不会产生重复任务,输家静默跳过
// 红线: 单个订单失败不中断批次,其余订单继续处理
// ==========================================

use crate::config::ConfigManager;
use crate::domain::order::CustomerOrder;
use crate::domain::task::{PickTask, ShiftScope};
use crate::engine::events::{OptionalEventPublisher, TaskEvent, TaskEventType};
use crate::engine::packer::{PackingEngine, PackingError};
use crate::engine::repositories::{ContainerCatalog, ItemCatalog, OrderSource, OverrideSource};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::task_repo::PickTaskRepository;
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ==========================================
// GenerateResult - 生成结果
// ==========================================
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct GenerateResult {
    pub created: usize,         // 本次新建任务数
    pub already_existed: usize, // 已有任务 (含并发输家) 的订单数
    pub orders_processed: usize, // 作用域内订单总数
    pub skipped_empty: usize,   // 方案无内容被跳过的订单数
    pub warnings: Vec<String>,  // 订单级警告 (engine 警告前缀订单号)
}

// ==========================================
// TaskGenerator - 任务生成引擎
// ==========================================
pub struct TaskGenerator {
    order_source: Arc<dyn OrderSource>,
    item_catalog: Arc<dyn ItemCatalog>,
    container_catalog: Arc<dyn ContainerCatalog>,
    override_source: Arc<dyn OverrideSource>,
    task_repo: Arc<PickTaskRepository>,
    config: Arc<ConfigManager>,
    packing_engine: PackingEngine,
    events: OptionalEventPublisher,
}

impl TaskGenerator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_source: Arc<dyn OrderSource>,
        item_catalog: Arc<dyn ItemCatalog>,
        container_catalog: Arc<dyn ContainerCatalog>,
        override_source: Arc<dyn OverrideSource>,
        task_repo: Arc<PickTaskRepository>,
        config: Arc<ConfigManager>,
        events: OptionalEventPublisher,
    ) -> Self {
        Self {
            order_source,
            item_catalog,
            container_catalog,
            override_source,
            task_repo,
            config,
            packing_engine: PackingEngine::new(),
            events,
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 为班次生成拣选任务 (幂等,可重跑)
    ///
    /// # 步骤
    /// 1) 拉取作用域内全部订单 (不按任何流水线阶段过滤);
    ///    零订单直接返回零结果,不触碰任务存储
    /// 2) 查询作用域内已有任务的订单集合
    /// 3) 批量预载商品目录与覆写 (单次批量查询,不逐单查)
    /// 4) 逐单算方案并仅插入落库; 空方案订单不建任务;
    ///    单个订单失败记警告继续
    /// 5) 按配置把作用域内仍为 OPEN 的任务批量释放为 READY
    #[instrument(skip(self), fields(
        work_center = %scope.work_center,
        shift_name = %scope.shift_name,
        shift_date = %scope.shift_date
    ))]
    pub fn generate_for_shift(
        &self,
        scope: &ShiftScope,
        actor: &str,
    ) -> RepositoryResult<GenerateResult> {
        let mut result = GenerateResult::default();

        // 1) 订单拉取
        let orders = self.order_source.find_orders_for_shift(scope)?;
        result.orders_processed = orders.len();
        if orders.is_empty() {
            info!("作用域内无订单,跳过任务生成");
            return Ok(result);
        }

        // 2) 已有任务去重集合
        let existing = self.task_repo.existing_order_ids(scope)?;

        // 3) 批量预载 (商品 / 覆写 / 箱型)
        let item_ids = Self::collect_item_ids(&orders);
        let items_by_id = self.item_catalog.find_items_by_ids(&item_ids)?;
        let overrides_by_id = self.override_source.find_overrides_by_ids(&item_ids)?;
        let container_types = self.container_catalog.list_container_types()?;

        let default_priority = self
            .config
            .default_task_priority()
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?;

        // 4) 逐单算方案并落任务
        for order in &orders {
            if existing.contains(&order.order_id) {
                result.already_existed += 1;
                continue;
            }

            let plan = match self.packing_engine.compute_plan(
                &order.lines,
                &items_by_id,
                &container_types,
                &overrides_by_id,
            ) {
                Ok(plan) => plan,
                // 箱型目录为空是配置级错误,整个批次无法继续
                Err(PackingError::EmptyContainerCatalog) => {
                    return Err(RepositoryError::BusinessRuleViolation(
                        PackingError::EmptyContainerCatalog.to_string(),
                    ));
                }
            };

            for w in &plan.summary.warnings {
                result
                    .warnings
                    .push(format!("order_id={}: {}", order.order_id, w));
            }

            if !plan.has_packed_contents() {
                warn!(order_id = %order.order_id, "方案无装箱内容,不生成任务");
                result.skipped_empty += 1;
                result
                    .warnings
                    .push(format!("order_id={}: EMPTY_PLAN, 未生成任务", order.order_id));
                continue;
            }

            let task = PickTask::from_plan(scope, &order.order_id, plan, default_priority, actor);
            // 仅插入语义: 并发生成的输家拿到 false,静默计入 already_existed
            if self.task_repo.insert_new(&task)? {
                result.created += 1;
            } else {
                result.already_existed += 1;
            }
        }

        // 5) 可配置的批量释放 (OPEN → READY)
        let auto_ready = self
            .config
            .auto_ready_on_generate()
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?;
        if auto_ready {
            let released = self.task_repo.mark_ready_bulk(scope, actor)?;
            info!(released, "生成后自动释放任务");
        }

        if let Err(e) = self.events.publish(TaskEvent {
            work_center: scope.work_center.clone(),
            shift_name: scope.shift_name.clone(),
            shift_date: scope.shift_date,
            event_type: TaskEventType::TasksGenerated,
            source: Some("TaskGenerator".to_string()),
            count: result.created,
        }) {
            // 事件发布失败不影响生成结果
            warn!(error = %e, "任务事件发布失败");
        }

        info!(
            created = result.created,
            already_existed = result.already_existed,
            skipped_empty = result.skipped_empty,
            "任务生成完成"
        );
        Ok(result)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 汇总去重后的商品 ID (供批量预载)
    fn collect_item_ids(orders: &[CustomerOrder]) -> Vec<String> {
        let mut ids: Vec<String> = orders
            .iter()
            .flat_map(|o| o.lines.iter().map(|l| l.item_id.clone()))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}
