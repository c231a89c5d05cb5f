// ==========================================
// 生鲜配送拣选系统 - 装箱引擎
// ==========================================
// 职责: 订单行 + 商品目录 + 箱型目录 + 单品覆写 → 装箱方案
// 红线: 纯函数,无副作用,同输入必同输出 (可跨订单并行)
// 红线: 数据质量问题降级为警告; 仅箱型目录为空时拒绝运算
// ==========================================

use crate::domain::container::ContainerType;
use crate::domain::order::{ItemInfo, OrderLine};
use crate::domain::packing::{
    BoxContentItem, ItemRollup, PackedBox, PackingOverride, PackingPlan, PackingSummary, Piece,
};
use crate::domain::types::{PieceKind, QuantityMode};
use crate::engine::piece_builder::PieceBuilder;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::instrument;

/// 容量比较的数值容差
const EPS: f64 = 1e-9;

// ==========================================
// 装箱引擎错误
// ==========================================
// 仅配置级问题致命; 单行/单件问题一律降级为方案警告
#[derive(Error, Debug)]
pub enum PackingError {
    #[error("箱型目录为空,无法装箱")]
    EmptyContainerCatalog,
}

// ==========================================
// OpenBox - 装箱过程中的开放箱
// ==========================================
// 只追加不删除的箱位累加器,按开箱顺序扫描
struct OpenBox {
    container: ContainerType,
    fill_kg: f64,
    fill_liters: f64,
    contents: Vec<BoxContentItem>,
    // 箱内已放入禁混品时记录其 item_id,此后只允许同品进入
    no_mix_item: Option<String>,
}

impl OpenBox {
    fn new(container: ContainerType) -> Self {
        Self {
            container,
            fill_kg: 0.0,
            fill_liters: 0.0,
            contents: Vec::new(),
            no_mix_item: None,
        }
    }

    fn distinct_item_count(&self) -> usize {
        let mut ids: Vec<&str> = self.contents.iter().map(|c| c.item_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    fn contains_item(&self, item_id: &str) -> bool {
        self.contents.iter().any(|c| c.item_id == item_id)
    }

    fn item_kg(&self, item_id: &str) -> f64 {
        self.contents
            .iter()
            .filter(|c| c.item_id == item_id)
            .map(|c| c.est_kg)
            .sum()
    }

    /// 准入判定: 全部约束满足才接收
    ///
    /// 约束 (依次): 通风 / 最小箱型档位 / 承重 / 容积 /
    /// 混装规则 / 单品箱内限重 / 单箱 SKU 上限
    fn admits(&self, piece: &Piece) -> bool {
        // 通风要求
        if piece.ventilation_required && !self.container.vented {
            return false;
        }

        // 最小箱型档位 (按档位序比较)
        if let Some(min_key) = piece.min_container_key {
            if self.container.key < min_key {
                return false;
            }
        }

        // 承重 / 容积
        if self.fill_kg + piece.est_kg > self.container.max_weight_kg + EPS {
            return false;
        }
        if self.fill_liters + piece.est_liters > self.container.usable_liters() + EPS {
            return false;
        }

        // 禁混件只进空箱或纯同品箱
        if !piece.mixing_allowed && self.contents.iter().any(|c| c.item_id != piece.item_id) {
            return false;
        }

        // 箱内已有禁混品 → 只允许同品进入
        if let Some(ref no_mix_id) = self.no_mix_item {
            if *no_mix_id != piece.item_id {
                return false;
            }
        }

        // 单品箱内限重 (累计)
        if let Some(cap) = piece.max_kg_per_box {
            if self.item_kg(&piece.item_id) + piece.est_kg > cap + EPS {
                return false;
            }
        }

        // 单箱 SKU 上限
        if let Some(max_skus) = self.container.max_distinct_items {
            let added = if self.contains_item(&piece.item_id) { 0 } else { 1 };
            if self.distinct_item_count() + added > max_skus as usize {
                return false;
            }
        }

        true
    }

    fn place(&mut self, piece: &Piece) {
        self.fill_kg += piece.est_kg;
        self.fill_liters += piece.est_liters;
        if !piece.mixing_allowed {
            self.no_mix_item = Some(piece.item_id.clone());
        }
        self.contents.push(BoxContentItem::from_piece(piece));
    }

    fn into_packed(self, box_no: i32) -> PackedBox {
        let usable = self.container.usable_liters();
        let fill_percent = if usable > 0.0 {
            (self.fill_liters / usable * 100.0).min(100.0)
        } else {
            0.0
        };
        PackedBox {
            box_no,
            container_key: self.container.key,
            vented: self.container.vented,
            fill_liters: self.fill_liters,
            fill_kg: self.fill_kg,
            fill_percent,
            contents: self.contents,
        }
    }
}

// ==========================================
// PackingEngine - 装箱引擎
// ==========================================
pub struct PackingEngine {
    piece_builder: PieceBuilder,
}

impl PackingEngine {
    pub fn new() -> Self {
        Self {
            piece_builder: PieceBuilder::new(),
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 计算装箱方案
    ///
    /// # 步骤
    /// 1) 分类 + 拣选件构造 (行级问题降级为警告)
    /// 2) 超规格自动拆分 (对最大箱型,有界重试)
    /// 3) 排序: 耐压件在前 / 易损件在后,同级按体积降序
    /// 4) 首次适配装箱: 按开箱顺序扫描,全约束准入;
    ///    无箱可入则按"可容纳该件的最小箱型"开新箱;
    ///    开不出新箱则丢弃该件并警告
    /// 5) 汇总: 单箱填充率 + 按商品汇总 + 警告列表
    ///
    /// # 返回
    /// - Ok(PackingPlan): 尽力而为的方案 (含警告)
    /// - Err(EmptyContainerCatalog): 箱型目录为空
    #[instrument(skip_all, fields(line_count = lines.len(), container_count = container_types.len()))]
    pub fn compute_plan(
        &self,
        lines: &[OrderLine],
        items_by_id: &HashMap<String, ItemInfo>,
        container_types: &[ContainerType],
        overrides_by_id: &HashMap<String, PackingOverride>,
    ) -> Result<PackingPlan, PackingError> {
        if container_types.is_empty() {
            return Err(PackingError::EmptyContainerCatalog);
        }

        // 箱型按 (档位, 可用容积) 升序; 开新箱取首个可行项即"最小可行箱型"
        let mut sorted_containers: Vec<&ContainerType> = container_types.iter().collect();
        sorted_containers.sort_by(|a, b| {
            a.key
                .cmp(&b.key)
                .then(a.usable_liters().total_cmp(&b.usable_liters()))
        });
        let largest = sorted_containers[sorted_containers.len() - 1];

        // 1) 拣选件构造
        let (pieces, mut warnings) =
            self.piece_builder
                .build_pieces(lines, items_by_id, overrides_by_id);

        // 2) 超规格自动拆分
        let mut pieces = self
            .piece_builder
            .auto_split(pieces, largest, &mut warnings);

        // 3) 装箱顺序: 耐压先装压箱底,易损后装置顶层; 同级大体积优先
        //    (稳定排序保证同输入同输出)
        pieces.sort_by(|a, b| {
            a.fragility
                .placement_rank()
                .cmp(&b.fragility.placement_rank())
                .then(b.est_liters.total_cmp(&a.est_liters))
                .then(a.item_id.cmp(&b.item_id))
        });

        // 4) 首次适配装箱
        let mut open_boxes: Vec<OpenBox> = Vec::new();
        for piece in &pieces {
            let slot = open_boxes.iter().position(|b| b.admits(piece));
            match slot {
                Some(idx) => open_boxes[idx].place(piece),
                None => match self.feasible_container(&sorted_containers, piece) {
                    Some(container) => {
                        let mut new_box = OpenBox::new(container.clone());
                        new_box.place(piece);
                        open_boxes.push(new_box);
                    }
                    None => {
                        warnings.push(format!(
                            "NO_FEASIBLE_CONTAINER: item_id={}, est_kg={:.2}, est_liters={:.2}, 该件被丢弃",
                            piece.item_id, piece.est_kg, piece.est_liters
                        ));
                    }
                },
            }
        }

        // 5) 汇总
        let boxes: Vec<PackedBox> = open_boxes
            .into_iter()
            .enumerate()
            .map(|(i, b)| b.into_packed(i as i32 + 1))
            .collect();

        let summary = PackingSummary {
            box_count: boxes.len() as i32,
            items: Self::rollup_items(&boxes),
            warnings,
        };

        Ok(PackingPlan { boxes, summary })
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 单独容纳该件的最小可行箱型
    ///
    /// 可行 = 通风满足 + 档位不低于最小要求 + 承重/容积足够
    fn feasible_container<'a>(
        &self,
        sorted_containers: &[&'a ContainerType],
        piece: &Piece,
    ) -> Option<&'a ContainerType> {
        sorted_containers
            .iter()
            .find(|c| {
                if piece.ventilation_required && !c.vented {
                    return false;
                }
                if let Some(min_key) = piece.min_container_key {
                    if c.key < min_key {
                        return false;
                    }
                }
                piece.est_kg <= c.max_weight_kg + EPS && piece.est_liters <= c.usable_liters() + EPS
            })
            .copied()
    }

    /// 按商品汇总 (袋数/预包装件数/总重量/总件数)
    fn rollup_items(boxes: &[PackedBox]) -> Vec<ItemRollup> {
        let mut by_item: BTreeMap<String, ItemRollup> = BTreeMap::new();

        for content in boxes.iter().flat_map(|b| b.contents.iter()) {
            let entry = by_item
                .entry(content.item_id.clone())
                .or_insert_with(|| ItemRollup {
                    item_id: content.item_id.clone(),
                    item_name: content.item_name.clone(),
                    bag_count: 0,
                    bundle_count: 0,
                    total_kg: 0.0,
                    total_units: 0,
                });

            match content.kind {
                PieceKind::Bag => entry.bag_count += 1,
                PieceKind::Bundle => entry.bundle_count += 1,
            }
            entry.total_kg += content.est_kg;
            if content.mode == QuantityMode::Unit {
                entry.total_units += content.quantity.round() as i64;
            }
        }

        by_item.into_values().collect()
    }
}

impl Default for PackingEngine {
    fn default() -> Self {
        Self::new()
    }
}
