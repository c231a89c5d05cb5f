// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 测试数据库初始化、环境装配、种子数据
// ==========================================

use chrono::{NaiveDate, Utc};
use fresh_picking::api::TaskApi;
use fresh_picking::config::ConfigManager;
use fresh_picking::db::{configure_sqlite_connection, init_schema};
use fresh_picking::domain::container::ContainerType;
use fresh_picking::domain::order::{CustomerOrder, ItemInfo, OrderLine};
use fresh_picking::domain::task::ShiftScope;
use fresh_picking::domain::types::ContainerKey;
use fresh_picking::engine::repositories::{ActorDirectory, ShiftClock};
use fresh_picking::engine::{OptionalEventPublisher, TaskGenerator};
use fresh_picking::repository::{MasterDataRepository, OrderRepository, PickTaskRepository};
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件 (需要保持存活)
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = Connection::open(&db_path)?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 固定班次时钟 (测试用: 认领作用域可控)
pub struct FixedShiftClock {
    pub shift_name: String,
    pub shift_date: NaiveDate,
}

impl ShiftClock for FixedShiftClock {
    fn current_shift(&self, work_center: &str) -> ShiftScope {
        ShiftScope::new(work_center, &self.shift_name, self.shift_date)
    }
}

/// 固定操作人目录 (测试用)
pub struct FixedActorDirectory;

impl ActorDirectory for FixedActorDirectory {
    fn display_name(&self, actor_id: &str) -> Option<String> {
        match actor_id {
            "picker-1" => Some("拣选员一".to_string()),
            _ => None,
        }
    }
}

/// 测试环境: 同一临时库上装配好的全套仓储与 API
pub struct TestEnv {
    pub _temp_file: NamedTempFile,
    pub db_path: String,
    pub master_data: Arc<MasterDataRepository>,
    pub order_repo: Arc<OrderRepository>,
    pub task_repo: Arc<PickTaskRepository>,
    pub config: Arc<ConfigManager>,
    pub api: Arc<TaskApi>,
}

/// 标准测试作用域: WC01 / MORNING / 2026-08-07
pub fn test_scope() -> ShiftScope {
    ShiftScope::new(
        "WC01",
        "MORNING",
        NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
    )
}

/// 创建测试环境 (认领作用域固定为 test_scope)
pub fn setup_test_env() -> TestEnv {
    let (temp_file, db_path) = create_test_db().unwrap();

    let conn = Arc::new(Mutex::new(
        fresh_picking::db::open_sqlite_connection(&db_path).unwrap(),
    ));

    let master_data = Arc::new(MasterDataRepository::new(conn.clone()));
    let order_repo = Arc::new(OrderRepository::new(conn.clone()));
    let task_repo = Arc::new(PickTaskRepository::new(conn.clone()));
    let config = Arc::new(ConfigManager::from_connection(conn.clone()).unwrap());

    let generator = Arc::new(TaskGenerator::new(
        order_repo.clone(),
        master_data.clone(),
        master_data.clone(),
        master_data.clone(),
        task_repo.clone(),
        config.clone(),
        OptionalEventPublisher::none(),
    ));

    let scope = test_scope();
    let api = Arc::new(TaskApi::new(
        task_repo.clone(),
        generator,
        Arc::new(FixedShiftClock {
            shift_name: scope.shift_name.clone(),
            shift_date: scope.shift_date,
        }),
        Arc::new(FixedActorDirectory),
    ));

    TestEnv {
        _temp_file: temp_file,
        db_path,
        master_data,
        order_repo,
        task_repo,
        config,
        api,
    }
}

/// 种子商品目录 (常用生鲜品类)
pub fn seed_items(env: &TestEnv) {
    let item = |id: &str, name: &str, type_name: &str, category: &str, avg_g: Option<f64>| ItemInfo {
        item_id: id.to_string(),
        display_name: name.to_string(),
        category: Some(category.to_string()),
        type_name: Some(type_name.to_string()),
        variety: None,
        avg_unit_weight_g: avg_g,
    };

    env.master_data
        .batch_upsert_items(&[
            item("carrot-1", "胡萝卜", "Carrot", "Vegetable", Some(250.0)),
            item("tomato-1", "番茄", "Tomato", "Vegetable", Some(120.0)),
            item("lettuce-1", "生菜", "Lettuce", "Vegetable", Some(350.0)),
            item("strawberry-1", "草莓", "Strawberry", "Fruit", Some(20.0)),
            item("egg-1", "鸡蛋", "Egg", "Dairy & Eggs", Some(60.0)),
        ])
        .unwrap();
}

/// 种子箱型目录 (小/中/大三档,均通风)
pub fn seed_containers(env: &TestEnv) {
    let container = |key: ContainerKey, usable: f64, max_kg: f64| ContainerType {
        key,
        inner_l_mm: 0.0,
        inner_w_mm: 0.0,
        inner_h_mm: 0.0,
        headroom_frac: 0.0,
        usable_liters: Some(usable),
        max_weight_kg: max_kg,
        vented: true,
        max_distinct_items: None,
    };

    env.master_data
        .batch_upsert_containers(&[
            container(ContainerKey::Small, 8.0, 5.0),
            container(ContainerKey::Medium, 20.0, 10.0),
            container(ContainerKey::Large, 40.0, 15.0),
        ])
        .unwrap();
}

/// 种子订单 (固定作用域)
pub fn seed_order(env: &TestEnv, order_id: &str, lines: Vec<OrderLine>) {
    let scope = test_scope();
    env.order_repo
        .batch_insert(&[CustomerOrder {
            order_id: order_id.to_string(),
            work_center: scope.work_center,
            shift_name: scope.shift_name,
            shift_date: scope.shift_date,
            lines,
            created_at: Utc::now(),
        }])
        .unwrap();
}
