// ==========================================
// 生鲜配送拣选系统 - 主数据导入
// ==========================================
// 对象: 箱型目录 / 单品装箱覆写 (CSV / Excel)
// 流程: 文件读取 → 字段映射 → 行级校验 → 事务化落库 + DQ 报告
// 红线: 行级问题进 DQ 报告,不中断批次; 合法行照常落库
// ==========================================

use crate::domain::container::ContainerType;
use crate::domain::packing::PackingOverride;
use crate::domain::types::{ContainerKey, FragilityClass};
use crate::i18n::t_with_args;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{read_table, RawRecord};
use crate::repository::master_data_repo::MasterDataRepository;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

// ==========================================
// 导入报告
// ==========================================

/// 行级违规记录
#[derive(Debug, Clone, serde::Serialize)]
pub struct RowViolation {
    pub row: usize, // 数据行号 (1 起,不含表头)
    pub reason: String,
}

/// 单文件导入报告
#[derive(Debug, Clone, serde::Serialize)]
pub struct ImportReport {
    pub batch_id: String,
    pub file: String,
    pub ok_count: usize,
    pub violations: Vec<RowViolation>,
}

/// 导入对象类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    ContainerTypes,
    PackingOverrides,
}

// ==========================================
// MasterDataImporter Trait
// ==========================================
#[async_trait]
pub trait MasterDataImporter: Send + Sync {
    /// 导入箱型目录
    async fn import_container_types<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
    ) -> ImportResult<ImportReport>;

    /// 导入单品装箱覆写
    async fn import_packing_overrides<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
    ) -> ImportResult<ImportReport>;

    /// 批量导入多个文件 (并发执行,单文件失败不影响其他文件)
    async fn batch_import(
        &self,
        files: Vec<(ImportKind, PathBuf)>,
    ) -> Vec<Result<ImportReport, String>>;
}

// ==========================================
// MasterDataImporterImpl - 导入实现
// ==========================================
pub struct MasterDataImporterImpl {
    repo: Arc<MasterDataRepository>,
}

impl MasterDataImporterImpl {
    pub fn new(repo: Arc<MasterDataRepository>) -> Self {
        Self { repo }
    }

    // ==========================================
    // 字段映射
    // ==========================================

    /// 行记录 → 箱型
    ///
    /// 必填: key / inner_l_mm / inner_w_mm / inner_h_mm / max_weight_kg
    /// 可选: headroom_frac (默认 0) / usable_liters / vented / max_distinct_items
    fn map_container(row: &RawRecord) -> Result<ContainerType, String> {
        let key_raw = required(row, "key")?;
        let key = ContainerKey::from_str(&key_raw)
            .ok_or_else(|| format!("未知箱型档位: {}", key_raw))?;

        let headroom_frac = optional_f64(row, "headroom_frac")?.unwrap_or(0.0);
        if !(0.0..=0.9).contains(&headroom_frac) {
            return Err(format!("headroom_frac 超出 0~0.9: {}", headroom_frac));
        }

        let max_weight_kg = required_f64(row, "max_weight_kg")?;
        if max_weight_kg <= 0.0 {
            return Err(format!("max_weight_kg 必须为正数: {}", max_weight_kg));
        }

        Ok(ContainerType {
            key,
            inner_l_mm: required_f64(row, "inner_l_mm")?,
            inner_w_mm: required_f64(row, "inner_w_mm")?,
            inner_h_mm: required_f64(row, "inner_h_mm")?,
            headroom_frac,
            usable_liters: optional_f64(row, "usable_liters")?,
            max_weight_kg,
            vented: optional_bool(row, "vented")?.unwrap_or(false),
            max_distinct_items: optional_f64(row, "max_distinct_items")?.map(|v| v as u32),
        })
    }

    /// 行记录 → 单品覆写
    ///
    /// 必填: item_id; 其余字段缺省即"不覆写"
    fn map_override(row: &RawRecord) -> Result<PackingOverride, String> {
        let fragility = match nonempty(row, "fragility") {
            Some(raw) => Some(parse_fragility(&raw)?),
            None => None,
        };
        let min_container_key = match nonempty(row, "min_container_key") {
            Some(raw) => Some(
                ContainerKey::from_str(&raw).ok_or_else(|| format!("未知箱型档位: {}", raw))?,
            ),
            None => None,
        };

        let density = optional_f64(row, "density_kg_per_l")?;
        if let Some(d) = density {
            if d <= 0.0 {
                return Err(format!("density_kg_per_l 必须为正数: {}", d));
            }
        }

        Ok(PackingOverride {
            item_id: required(row, "item_id")?,
            fragility,
            mixing_allowed: optional_bool(row, "mixing_allowed")?,
            ventilation_required: optional_bool(row, "ventilation_required")?,
            min_container_key,
            max_kg_per_box: optional_f64(row, "max_kg_per_box")?,
            density_kg_per_l: density,
            unit_volume_l: optional_f64(row, "unit_volume_l")?,
        })
    }

    /// 通用导入流程: 读文件 → 逐行映射 → 落库合法行 → 报告
    fn run_import<T, F, P>(
        &self,
        file_path: P,
        map_row: F,
        persist: impl FnOnce(&MasterDataRepository, &[T]) -> Result<usize, String>,
    ) -> ImportResult<ImportReport>
    where
        F: Fn(&RawRecord) -> Result<T, String>,
        P: AsRef<Path>,
    {
        let path = file_path.as_ref();
        let records = read_table(path)?;
        if records.is_empty() {
            return Err(ImportError::EmptyFile(path.display().to_string()));
        }

        let batch_id = Uuid::new_v4().to_string();
        let mut valid = Vec::new();
        let mut violations = Vec::new();

        for (idx, record) in records.iter().enumerate() {
            let row_no = idx + 1;
            match map_row(record) {
                Ok(entity) => valid.push(entity),
                Err(reason) => {
                    warn!(
                        "{}",
                        t_with_args(
                            "import.row_rejected",
                            &[("row", &row_no.to_string()), ("reason", &reason)]
                        )
                    );
                    violations.push(RowViolation {
                        row: row_no,
                        reason,
                    });
                }
            }
        }

        let ok_count = if valid.is_empty() {
            0
        } else {
            persist(&self.repo, &valid).map_err(ImportError::PersistError)?
        };

        info!(
            "{}",
            t_with_args(
                "import.done",
                &[
                    ("ok", &ok_count.to_string()),
                    ("rejected", &violations.len().to_string())
                ]
            )
        );

        Ok(ImportReport {
            batch_id,
            file: path.display().to_string(),
            ok_count,
            violations,
        })
    }
}

#[async_trait]
impl MasterDataImporter for MasterDataImporterImpl {
    async fn import_container_types<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
    ) -> ImportResult<ImportReport> {
        self.run_import(file_path, Self::map_container, |repo, rows| {
            repo.batch_upsert_containers(rows).map_err(|e| e.to_string())
        })
    }

    async fn import_packing_overrides<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
    ) -> ImportResult<ImportReport> {
        self.run_import(file_path, Self::map_override, |repo, rows| {
            repo.batch_upsert_overrides(rows).map_err(|e| e.to_string())
        })
    }

    async fn batch_import(
        &self,
        files: Vec<(ImportKind, PathBuf)>,
    ) -> Vec<Result<ImportReport, String>> {
        let futures = files.into_iter().map(|(kind, path)| async move {
            match kind {
                ImportKind::ContainerTypes => self
                    .import_container_types(&path)
                    .await
                    .map_err(|e| format!("{}: {}", path.display(), e)),
                ImportKind::PackingOverrides => self
                    .import_packing_overrides(&path)
                    .await
                    .map_err(|e| format!("{}: {}", path.display(), e)),
            }
        });

        futures::future::join_all(futures).await
    }
}

// ==========================================
// 字段解析辅助
// ==========================================

fn nonempty(row: &RawRecord, field: &str) -> Option<String> {
    row.get(field)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(row: &RawRecord, field: &str) -> Result<String, String> {
    nonempty(row, field).ok_or_else(|| format!("缺少必填字段: {}", field))
}

fn required_f64(row: &RawRecord, field: &str) -> Result<f64, String> {
    let raw = required(row, field)?;
    raw.parse::<f64>()
        .map_err(|_| format!("字段 {} 不是合法数值: {}", field, raw))
}

fn optional_f64(row: &RawRecord, field: &str) -> Result<Option<f64>, String> {
    match nonempty(row, field) {
        Some(raw) => raw
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("字段 {} 不是合法数值: {}", field, raw)),
        None => Ok(None),
    }
}

fn optional_bool(row: &RawRecord, field: &str) -> Result<Option<bool>, String> {
    match nonempty(row, field) {
        Some(raw) => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "y" | "是" => Ok(Some(true)),
            "0" | "false" | "no" | "n" | "否" => Ok(Some(false)),
            _ => Err(format!("字段 {} 不是合法布尔值: {}", field, raw)),
        },
        None => Ok(None),
    }
}

fn parse_fragility(raw: &str) -> Result<FragilityClass, String> {
    match raw {
        "STURDY" => Ok(FragilityClass::Sturdy),
        "NORMAL" => Ok(FragilityClass::Normal),
        "FRAGILE" => Ok(FragilityClass::Fragile),
        "VERY_FRAGILE" => Ok(FragilityClass::VeryFragile),
        _ => Err(format!("未知易损等级: {}", raw)),
    }
}
