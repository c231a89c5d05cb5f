// ==========================================
// 并发控制测试
// ==========================================
// 职责: 验证任务创建的恰好一次与任务认领的恰好一人
// 方式: 每个线程独立数据库连接,制造真实的存储层竞争
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod concurrent_control_test {
    use crate::test_helpers::{seed_containers, seed_items, seed_order, setup_test_env, test_scope};
    use fresh_picking::config::ConfigManager;
    use fresh_picking::db::open_sqlite_connection;
    use fresh_picking::engine::{OptionalEventPublisher, TaskGenerator};
    use fresh_picking::domain::order::OrderLine;
    use fresh_picking::domain::types::TaskStatus;
    use fresh_picking::repository::{
        MasterDataRepository, OrderRepository, PickTaskRepository, TaskListFilter,
    };
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread;

    /// 在指定库上装配一套独立连接的生成器
    fn build_generator(db_path: &str) -> TaskGenerator {
        let conn = Arc::new(Mutex::new(open_sqlite_connection(db_path).unwrap()));
        let master_data = Arc::new(MasterDataRepository::new(conn.clone()));
        let order_repo = Arc::new(OrderRepository::new(conn.clone()));
        let task_repo = Arc::new(PickTaskRepository::new(conn.clone()));
        let config = Arc::new(ConfigManager::from_connection(conn).unwrap());

        TaskGenerator::new(
            order_repo,
            master_data.clone(),
            master_data.clone(),
            master_data,
            task_repo,
            config,
            OptionalEventPublisher::none(),
        )
    }

    /// 独立连接的任务仓储
    fn build_task_repo(db_path: &str) -> PickTaskRepository {
        let conn = Arc::new(Mutex::new(open_sqlite_connection(db_path).unwrap()));
        PickTaskRepository::new(conn)
    }

    // ==========================================
    // 测试1: 并发生成的恰好一次创建
    // ==========================================

    #[test]
    fn test_concurrent_generation_exactly_once() {
        let env = setup_test_env();
        seed_items(&env);
        seed_containers(&env);
        let order_count = 6;
        for i in 1..=order_count {
            seed_order(
                &env,
                &format!("ORD-{}", i),
                vec![OrderLine::by_weight("carrot-1", 2.0)],
            );
        }
        let db_path = env.db_path.clone();

        // N 个生成器并发跑同一作用域
        let thread_count = 5;
        let barrier = Arc::new(Barrier::new(thread_count));
        let mut handles = vec![];

        for _ in 0..thread_count {
            let db_path = db_path.clone();
            let barrier = barrier.clone();
            handles.push(thread::spawn(move || {
                let generator = build_generator(&db_path);
                barrier.wait();
                generator
                    .generate_for_shift(&test_scope(), "scheduler")
                    .map(|r| r.created)
                    .map_err(|e| e.to_string())
            }));
        }

        let mut total_created = 0;
        for handle in handles {
            total_created += handle.join().unwrap().expect("生成器不应报错");
        }

        // 任务总数 = 订单数,不是 N × 订单数
        assert_eq!(total_created, order_count);

        let repo = build_task_repo(&db_path);
        let page = repo.list(&TaskListFilter::for_scope(test_scope())).unwrap();
        assert_eq!(page.total, order_count as i64);

        // 每单恰好一个任务
        let order_ids: HashSet<String> =
            page.items.iter().map(|t| t.order_id.clone()).collect();
        assert_eq!(order_ids.len(), order_count);
    }

    // ==========================================
    // 测试2: 并发认领的恰好一人
    // ==========================================

    #[test]
    fn test_concurrent_claims_exactly_one_winner() {
        let env = setup_test_env();
        seed_items(&env);
        seed_containers(&env);
        // 作用域内恰好一个 READY 任务
        seed_order(&env, "ORD-1", vec![OrderLine::by_weight("carrot-1", 2.0)]);
        env.api
            .generate_tasks_for_shift("WC01", "MORNING", "2026-08-07", "scheduler")
            .unwrap();
        let db_path = env.db_path.clone();

        let thread_count = 8;
        let barrier = Arc::new(Barrier::new(thread_count));
        let mut handles = vec![];

        for i in 0..thread_count {
            let db_path = db_path.clone();
            let barrier = barrier.clone();
            handles.push(thread::spawn(move || {
                let repo = build_task_repo(&db_path);
                let picker_id = format!("picker-{}", i);
                barrier.wait();
                repo.claim_next_ready(&test_scope(), &picker_id, &picker_id)
                    .expect("认领不应报错")
            }));
        }

        let mut winners = vec![];
        let mut none_count = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Some(task) => winners.push(task),
                None => none_count += 1,
            }
        }

        // 恰好一个赢家,其余拿到"无可认领"
        assert_eq!(winners.len(), 1);
        assert_eq!(none_count, thread_count - 1);

        let winner = &winners[0];
        assert_eq!(winner.status, TaskStatus::Claimed);
        assert!(winner.assigned_picker.is_some());

        // 落库状态与赢家一致
        let repo = build_task_repo(&db_path);
        let stored = repo.find_by_id(&winner.task_id).unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Claimed);
        assert_eq!(stored.assigned_picker, winner.assigned_picker);
        assert!(stored.assignment_invariant_holds());
    }

    // ==========================================
    // 测试3: 多任务并发认领不重复分配
    // ==========================================

    #[test]
    fn test_concurrent_claims_distinct_tasks() {
        let env = setup_test_env();
        seed_items(&env);
        seed_containers(&env);
        let task_count = 4;
        for i in 1..=task_count {
            seed_order(
                &env,
                &format!("ORD-{}", i),
                vec![OrderLine::by_weight("carrot-1", 1.0)],
            );
        }
        env.api
            .generate_tasks_for_shift("WC01", "MORNING", "2026-08-07", "scheduler")
            .unwrap();
        let db_path = env.db_path.clone();

        // 线程数多于任务数: 多出的线程拿 None
        let thread_count = 6;
        let barrier = Arc::new(Barrier::new(thread_count));
        let mut handles = vec![];

        for i in 0..thread_count {
            let db_path = db_path.clone();
            let barrier = barrier.clone();
            handles.push(thread::spawn(move || {
                let repo = build_task_repo(&db_path);
                let picker_id = format!("picker-{}", i);
                barrier.wait();
                repo.claim_next_ready(&test_scope(), &picker_id, &picker_id)
                    .expect("认领不应报错")
            }));
        }

        let mut claimed_ids = vec![];
        for handle in handles {
            if let Some(task) = handle.join().unwrap() {
                claimed_ids.push(task.task_id);
            }
        }

        // 每个任务最多一个认领者: 认领到的任务两两不同
        assert_eq!(claimed_ids.len(), task_count);
        let distinct: HashSet<&String> = claimed_ids.iter().collect();
        assert_eq!(distinct.len(), task_count);
    }
}
