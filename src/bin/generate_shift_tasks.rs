// Ops utility: generate pick tasks for one shift scope, on demand or from cron.
//
// Usage:
//   cargo run --bin generate_shift_tasks -- <work_center> <shift_name> <shift_date> [db_path] [actor]
//
// Safe to re-run: task creation is insert-only behind a uniqueness constraint,
// so a repeated or concurrent run never duplicates tasks.

use fresh_picking::api::TaskApi;
use fresh_picking::config::ConfigManager;
use fresh_picking::db::{init_schema, open_sqlite_connection};
use fresh_picking::engine::repositories::{NoOpActorDirectory, SystemShiftClock};
use fresh_picking::engine::{OptionalEventPublisher, TaskGenerator};
use fresh_picking::repository::{MasterDataRepository, OrderRepository, PickTaskRepository};
use std::sync::{Arc, Mutex};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    fresh_picking::logging::init();

    let mut args = std::env::args().skip(1);
    let work_center = args.next().ok_or("missing arg: work_center")?;
    let shift_name = args.next().ok_or("missing arg: shift_name")?;
    let shift_date = args.next().ok_or("missing arg: shift_date (YYYY-MM-DD)")?;
    let db_path = args
        .next()
        .unwrap_or_else(fresh_picking::db::default_db_path);
    let actor = args.next().unwrap_or_else(|| "ops-cli".to_string());

    let conn = Arc::new(Mutex::new(open_sqlite_connection(&db_path)?));
    {
        let c = conn.lock().unwrap();
        init_schema(&c)?;
    }

    let master_data = Arc::new(MasterDataRepository::new(conn.clone()));
    let order_repo = Arc::new(OrderRepository::new(conn.clone()));
    let task_repo = Arc::new(PickTaskRepository::new(conn.clone()));
    let config = Arc::new(ConfigManager::from_connection(conn.clone())?);

    let generator = Arc::new(TaskGenerator::new(
        order_repo,
        master_data.clone(),
        master_data.clone(),
        master_data,
        task_repo.clone(),
        config,
        OptionalEventPublisher::none(),
    ));

    let api = TaskApi::new(
        task_repo,
        generator,
        Arc::new(SystemShiftClock),
        Arc::new(NoOpActorDirectory),
    );

    let result = api.generate_tasks_for_shift(&work_center, &shift_name, &shift_date, &actor)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
