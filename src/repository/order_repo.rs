// ==========================================
// 生鲜配送拣选系统 - 订单仓储 (协作方适配器)
// ==========================================
// 职责: 订单协作方的 SQLite 只读适配 + 测试/演示数据写入
// 说明: 订单的 CRUD 与校验流水线属于订单系统,不在本系统范围;
//       这里只提供生成器所需的按作用域读取
// ==========================================

use crate::domain::order::{CustomerOrder, OrderLine};
use crate::domain::task::ShiftScope;
use crate::engine::repositories::OrderSource;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// OrderRepository - 订单仓储
// ==========================================
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 批量写入订单 (事务化; 供种子数据与测试使用)
    pub fn batch_insert(&self, orders: &[CustomerOrder]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for order in orders {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO customer_order (
                    order_id, work_center, shift_name, shift_date, lines_json, created_at
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
                params![
                    order.order_id,
                    order.work_center,
                    order.shift_name,
                    order.shift_date,
                    serde_json::to_string(&order.lines)?,
                    order.created_at,
                ],
            )?;
            count += 1;
        }

        tx.commit()?;
        Ok(count)
    }
}

impl OrderSource for OrderRepository {
    fn find_orders_for_shift(&self, scope: &ShiftScope) -> RepositoryResult<Vec<CustomerOrder>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT order_id, work_center, shift_name, shift_date, lines_json, created_at
              FROM customer_order
             WHERE work_center = ?1 AND shift_name = ?2 AND shift_date = ?3
             ORDER BY created_at ASC, order_id ASC
            "#,
        )?;

        let rows = stmt.query_map(
            params![scope.work_center, scope.shift_name, scope.shift_date],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, chrono::NaiveDate>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, chrono::DateTime<chrono::Utc>>(5)?,
                ))
            },
        )?;

        let mut orders = Vec::new();
        for row in rows {
            let (order_id, work_center, shift_name, shift_date, lines_json, created_at) = row?;
            let lines: Vec<OrderLine> = serde_json::from_str(&lines_json)?;
            orders.push(CustomerOrder {
                order_id,
                work_center,
                shift_name,
                shift_date,
                lines,
                created_at,
            });
        }
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_batch_insert_and_scoped_read() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        let repo = OrderRepository::new(Arc::new(Mutex::new(conn)));

        let date = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let order = |id: &str, shift: &str| CustomerOrder {
            order_id: id.to_string(),
            work_center: "WC01".to_string(),
            shift_name: shift.to_string(),
            shift_date: date,
            lines: vec![OrderLine::by_weight("carrot-1", 2.0)],
            created_at: Utc::now(),
        };

        repo.batch_insert(&[order("ORD-1", "MORNING"), order("ORD-2", "AFTERNOON")])
            .unwrap();

        let scope = ShiftScope::new("WC01", "MORNING", date);
        let found = repo.find_orders_for_shift(&scope).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].order_id, "ORD-1");
        assert_eq!(found[0].lines.len(), 1);
    }
}
