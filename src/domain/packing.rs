// ==========================================
// 生鲜配送拣选系统 - 装箱领域模型
// ==========================================
// 职责: 装箱规则 / 拣选件 / 装箱方案
// 红线: 方案一经返回不再修改; 汇总字段是缓存,不是事实源
// ==========================================

use crate::domain::types::{ContainerKey, FragilityClass, PieceKind, QuantityMode};
use serde::{Deserialize, Serialize};

// ==========================================
// PackingOverride - 单品装箱覆写
// ==========================================
// 对齐: packing_override 表
// 规则: 有值的字段整体覆盖对应默认值,不做字段内合并
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackingOverride {
    pub item_id: String,
    pub fragility: Option<FragilityClass>,
    pub mixing_allowed: Option<bool>,
    pub ventilation_required: Option<bool>,
    pub min_container_key: Option<ContainerKey>,
    pub max_kg_per_box: Option<f64>,
    pub density_kg_per_l: Option<f64>,
    pub unit_volume_l: Option<f64>,
}

// ==========================================
// PackingRule - 解析后的装箱规则
// ==========================================
// 来源: 品类桶默认值 ⊕ 单品覆写 (classifier 输出)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackingRule {
    pub fragility: FragilityClass,
    pub mixing_allowed: bool,
    pub ventilation_required: bool,
    pub min_container_key: Option<ContainerKey>,
    pub max_kg_per_box: Option<f64>,
    pub density_kg_per_l: f64,
    pub unit_volume_l: Option<f64>,
}

impl PackingRule {
    /// 叠加单品覆写 (有值字段整体取覆写值)
    pub fn overlay(mut self, ov: &PackingOverride) -> Self {
        if let Some(v) = ov.fragility {
            self.fragility = v;
        }
        if let Some(v) = ov.mixing_allowed {
            self.mixing_allowed = v;
        }
        if let Some(v) = ov.ventilation_required {
            self.ventilation_required = v;
        }
        if ov.min_container_key.is_some() {
            self.min_container_key = ov.min_container_key;
        }
        if ov.max_kg_per_box.is_some() {
            self.max_kg_per_box = ov.max_kg_per_box;
        }
        if let Some(v) = ov.density_kg_per_l {
            self.density_kg_per_l = v;
        }
        if ov.unit_volume_l.is_some() {
            self.unit_volume_l = ov.unit_volume_l;
        }
        self
    }
}

// ==========================================
// Piece - 拣选件 (袋 / 预包装件)
// ==========================================
// 仅存在于一次装箱运算内部,不单独落库
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Piece {
    pub item_id: String,
    pub item_name: String,
    pub kind: PieceKind,
    pub mode: QuantityMode,
    pub quantity: f64,   // KG 模式为公斤数; UNIT 模式为件数
    pub est_liters: f64, // 估算体积 (L)
    pub est_kg: f64,     // 估算重量 (kg)
    pub fragility: FragilityClass,
    pub mixing_allowed: bool,
    pub ventilation_required: bool,
    pub min_container_key: Option<ContainerKey>,
    pub max_kg_per_box: Option<f64>,
}

// ==========================================
// BoxContentItem - 箱内拣选件快照
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxContentItem {
    pub item_id: String,
    pub item_name: String,
    pub kind: PieceKind,
    pub mode: QuantityMode,
    pub quantity: f64,
    pub est_liters: f64,
    pub est_kg: f64,
    pub fragility: FragilityClass,
}

impl BoxContentItem {
    /// 从拣选件生成快照
    pub fn from_piece(piece: &Piece) -> Self {
        Self {
            item_id: piece.item_id.clone(),
            item_name: piece.item_name.clone(),
            kind: piece.kind,
            mode: piece.mode,
            quantity: piece.quantity,
            est_liters: piece.est_liters,
            est_kg: piece.est_kg,
            fragility: piece.fragility,
        }
    }
}

// ==========================================
// PackedBox - 装箱结果 (单箱)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackedBox {
    pub box_no: i32,              // 箱号 (从 1 开始,按开箱顺序)
    pub container_key: ContainerKey,
    pub vented: bool,
    pub fill_liters: f64,         // 已装体积 (L)
    pub fill_kg: f64,             // 已装重量 (kg)
    pub fill_percent: f64,        // 体积填充率 (0~100)
    pub contents: Vec<BoxContentItem>,
}

impl PackedBox {
    /// 箱内不同 SKU 数
    pub fn distinct_item_count(&self) -> usize {
        let mut ids: Vec<&str> = self.contents.iter().map(|c| c.item_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// 箱内某 SKU 的累计重量 (kg)
    pub fn item_kg(&self, item_id: &str) -> f64 {
        self.contents
            .iter()
            .filter(|c| c.item_id == item_id)
            .map(|c| c.est_kg)
            .sum()
    }
}

// ==========================================
// ItemRollup - 按商品汇总
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRollup {
    pub item_id: String,
    pub item_name: String,
    pub bag_count: i32,
    pub bundle_count: i32,
    pub total_kg: f64,
    pub total_units: i64,
}

// ==========================================
// PackingSummary - 方案汇总
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingSummary {
    pub box_count: i32,
    pub items: Vec<ItemRollup>,
    pub warnings: Vec<String>, // 数据质量问题降级为警告,由调用方透出
}

// ==========================================
// PackingPlan - 装箱方案
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingPlan {
    pub boxes: Vec<PackedBox>,
    pub summary: PackingSummary,
}

impl PackingPlan {
    /// 估算总重量 (kg), 永远从 boxes 重新计算
    pub fn total_est_kg(&self) -> f64 {
        self.boxes.iter().map(|b| b.fill_kg).sum()
    }

    /// 估算总体积 (L), 永远从 boxes 重新计算
    pub fn total_liters(&self) -> f64 {
        self.boxes.iter().map(|b| b.fill_liters).sum()
    }

    /// 估算总件数 (UNIT 模式拣选件的件数之和)
    pub fn total_est_units(&self) -> i64 {
        self.boxes
            .iter()
            .flat_map(|b| b.contents.iter())
            .filter(|c| c.mode == QuantityMode::Unit)
            .map(|c| c.quantity.round() as i64)
            .sum()
    }

    /// 是否存在有内容的箱 (空方案不生成任务)
    pub fn has_packed_contents(&self) -> bool {
        self.boxes.iter().any(|b| !b.contents.is_empty())
    }
}
