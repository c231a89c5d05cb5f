// ==========================================
// 生鲜配送拣选系统 - 主数据仓储
// ==========================================
// 职责: 商品目录 / 箱型目录 / 单品覆写的数据访问
// 红线: Repository 不含业务逻辑; 所有查询参数化
// 写入: INSERT OR REPLACE (主数据以导入为准)
// ==========================================

use crate::domain::container::ContainerType;
use crate::domain::order::ItemInfo;
use crate::domain::packing::PackingOverride;
use crate::domain::types::{ContainerKey, FragilityClass};
use crate::engine::repositories::{ContainerCatalog, ItemCatalog, OverrideSource};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ==========================================
// MasterDataRepository - 主数据仓储
// ==========================================
pub struct MasterDataRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MasterDataRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 商品目录
    // ==========================================

    /// 批量写入商品目录 (事务化, INSERT OR REPLACE)
    pub fn batch_upsert_items(&self, items: &[ItemInfo]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for item in items {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO item_catalog (
                    item_id, display_name, category, type_name, variety, avg_unit_weight_g
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
                params![
                    item.item_id,
                    item.display_name,
                    item.category,
                    item.type_name,
                    item.variety,
                    item.avg_unit_weight_g,
                ],
            )?;
            count += 1;
        }

        tx.commit()?;
        Ok(count)
    }

    // ==========================================
    // 箱型目录
    // ==========================================

    /// 批量写入箱型 (事务化, INSERT OR REPLACE)
    pub fn batch_upsert_containers(&self, containers: &[ContainerType]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for c in containers {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO container_type (
                    container_key, inner_l_mm, inner_w_mm, inner_h_mm,
                    headroom_frac, usable_liters, max_weight_kg, vented, max_distinct_items
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    c.key.as_str(),
                    c.inner_l_mm,
                    c.inner_w_mm,
                    c.inner_h_mm,
                    c.headroom_frac,
                    c.usable_liters,
                    c.max_weight_kg,
                    c.vented as i32,
                    c.max_distinct_items,
                ],
            )?;
            count += 1;
        }

        tx.commit()?;
        Ok(count)
    }

    // ==========================================
    // 单品覆写
    // ==========================================

    /// 批量写入单品覆写 (事务化, INSERT OR REPLACE)
    pub fn batch_upsert_overrides(&self, overrides: &[PackingOverride]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for ov in overrides {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO packing_override (
                    item_id, fragility, mixing_allowed, ventilation_required,
                    min_container_key, max_kg_per_box, density_kg_per_l, unit_volume_l
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    ov.item_id,
                    ov.fragility.map(|f| f.to_string()),
                    ov.mixing_allowed.map(|b| b as i32),
                    ov.ventilation_required.map(|b| b as i32),
                    ov.min_container_key.map(|k| k.as_str()),
                    ov.max_kg_per_box,
                    ov.density_kg_per_l,
                    ov.unit_volume_l,
                ],
            )?;
            count += 1;
        }

        tx.commit()?;
        Ok(count)
    }

    // ==========================================
    // 行映射辅助
    // ==========================================

    fn parse_fragility(raw: Option<String>) -> RepositoryResult<Option<FragilityClass>> {
        match raw.as_deref() {
            None => Ok(None),
            Some("STURDY") => Ok(Some(FragilityClass::Sturdy)),
            Some("NORMAL") => Ok(Some(FragilityClass::Normal)),
            Some("FRAGILE") => Ok(Some(FragilityClass::Fragile)),
            Some("VERY_FRAGILE") => Ok(Some(FragilityClass::VeryFragile)),
            Some(other) => Err(RepositoryError::ValidationError(format!(
                "未知易损等级: {}",
                other
            ))),
        }
    }

    fn parse_container_key(raw: &str) -> RepositoryResult<ContainerKey> {
        ContainerKey::from_str(raw).ok_or_else(|| {
            RepositoryError::ValidationError(format!("未知箱型档位: {}", raw))
        })
    }

    /// 批量查询的 IN 子句占位符
    fn placeholders(n: usize) -> String {
        std::iter::repeat("?").take(n).collect::<Vec<_>>().join(", ")
    }
}

// ==========================================
// 协作方接口实现 (引擎只读侧)
// ==========================================

impl ItemCatalog for MasterDataRepository {
    fn find_items_by_ids(&self, ids: &[String]) -> RepositoryResult<HashMap<String, ItemInfo>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT item_id, display_name, category, type_name, variety, avg_unit_weight_g
               FROM item_catalog WHERE item_id IN ({})",
            Self::placeholders(ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(ids.iter()), |row| {
            Ok(ItemInfo {
                item_id: row.get(0)?,
                display_name: row.get(1)?,
                category: row.get(2)?,
                type_name: row.get(3)?,
                variety: row.get(4)?,
                avg_unit_weight_g: row.get(5)?,
            })
        })?;

        let mut map = HashMap::new();
        for row in rows {
            let item = row?;
            map.insert(item.item_id.clone(), item);
        }
        Ok(map)
    }
}

impl ContainerCatalog for MasterDataRepository {
    fn list_container_types(&self) -> RepositoryResult<Vec<ContainerType>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT container_key, inner_l_mm, inner_w_mm, inner_h_mm,
                   headroom_frac, usable_liters, max_weight_kg, vented, max_distinct_items
              FROM container_type
             ORDER BY container_key
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, Option<f64>>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, i32>(7)?,
                row.get::<_, Option<u32>>(8)?,
            ))
        })?;

        let mut containers = Vec::new();
        for row in rows {
            let (key_raw, l, w, h, headroom, usable, max_kg, vented, max_items) = row?;
            containers.push(ContainerType {
                key: Self::parse_container_key(&key_raw)?,
                inner_l_mm: l,
                inner_w_mm: w,
                inner_h_mm: h,
                headroom_frac: headroom,
                usable_liters: usable,
                max_weight_kg: max_kg,
                vented: vented != 0,
                max_distinct_items: max_items,
            });
        }
        // 档位序输出 (字母序与档位序不一致,按领域序重排)
        containers.sort_by_key(|c| c.key);
        Ok(containers)
    }
}

impl OverrideSource for MasterDataRepository {
    fn find_overrides_by_ids(
        &self,
        ids: &[String],
    ) -> RepositoryResult<HashMap<String, PackingOverride>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT item_id, fragility, mixing_allowed, ventilation_required,
                    min_container_key, max_kg_per_box, density_kg_per_l, unit_volume_l
               FROM packing_override WHERE item_id IN ({})",
            Self::placeholders(ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(ids.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<i32>>(2)?,
                row.get::<_, Option<i32>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<f64>>(5)?,
                row.get::<_, Option<f64>>(6)?,
                row.get::<_, Option<f64>>(7)?,
            ))
        })?;

        let mut map = HashMap::new();
        for row in rows {
            let (item_id, fragility, mixing, vent, min_key, max_kg, density, unit_vol) = row?;
            let min_container_key = match min_key {
                Some(raw) => Some(Self::parse_container_key(&raw)?),
                None => None,
            };
            map.insert(
                item_id.clone(),
                PackingOverride {
                    item_id,
                    fragility: Self::parse_fragility(fragility)?,
                    mixing_allowed: mixing.map(|v| v != 0),
                    ventilation_required: vent.map(|v| v != 0),
                    min_container_key,
                    max_kg_per_box: max_kg,
                    density_kg_per_l: density,
                    unit_volume_l: unit_vol,
                },
            );
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};

    fn repo() -> MasterDataRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        MasterDataRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_item_roundtrip_and_batch_lookup() {
        let repo = repo();
        let items = vec![
            ItemInfo {
                item_id: "carrot-1".to_string(),
                display_name: "胡萝卜".to_string(),
                category: Some("Vegetable".to_string()),
                type_name: Some("Carrot".to_string()),
                variety: None,
                avg_unit_weight_g: Some(250.0),
            },
            ItemInfo {
                item_id: "egg-1".to_string(),
                display_name: "鸡蛋".to_string(),
                category: Some("Dairy & Eggs".to_string()),
                type_name: Some("Egg".to_string()),
                variety: Some("Free Range".to_string()),
                avg_unit_weight_g: Some(60.0),
            },
        ];
        assert_eq!(repo.batch_upsert_items(&items).unwrap(), 2);

        let found = repo
            .find_items_by_ids(&["carrot-1".to_string(), "ghost".to_string()])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["carrot-1"].avg_unit_weight_g, Some(250.0));
    }

    #[test]
    fn test_container_listing_in_key_order() {
        let repo = repo();
        let mk = |key: ContainerKey, usable: f64| ContainerType {
            key,
            inner_l_mm: 0.0,
            inner_w_mm: 0.0,
            inner_h_mm: 0.0,
            headroom_frac: 0.0,
            usable_liters: Some(usable),
            max_weight_kg: 10.0,
            vented: false,
            max_distinct_items: None,
        };
        repo.batch_upsert_containers(&[
            mk(ContainerKey::Large, 40.0),
            mk(ContainerKey::Small, 8.0),
            mk(ContainerKey::Medium, 20.0),
        ])
        .unwrap();

        let listed = repo.list_container_types().unwrap();
        let keys: Vec<ContainerKey> = listed.iter().map(|c| c.key).collect();
        assert_eq!(
            keys,
            vec![ContainerKey::Small, ContainerKey::Medium, ContainerKey::Large]
        );
    }

    #[test]
    fn test_override_partial_fields_roundtrip() {
        let repo = repo();
        repo.batch_upsert_overrides(&[PackingOverride {
            item_id: "melon-1".to_string(),
            fragility: Some(FragilityClass::Normal),
            mixing_allowed: None,
            ventilation_required: Some(false),
            min_container_key: Some(ContainerKey::Large),
            max_kg_per_box: None,
            density_kg_per_l: Some(0.9),
            unit_volume_l: None,
        }])
        .unwrap();

        let found = repo
            .find_overrides_by_ids(&["melon-1".to_string()])
            .unwrap();
        let ov = &found["melon-1"];
        assert_eq!(ov.fragility, Some(FragilityClass::Normal));
        assert_eq!(ov.mixing_allowed, None);
        assert_eq!(ov.ventilation_required, Some(false));
        assert_eq!(ov.min_container_key, Some(ContainerKey::Large));
        assert_eq!(ov.density_kg_per_l, Some(0.9));
    }
}
