// ==========================================
// 生鲜配送拣选系统 - 拣选件构造引擎
// ==========================================
// 职责: 订单行 → 拣选件 (袋/预包装件) + 超规格自动对半拆分
// 红线: 数据质量问题降级为警告,整个运算不因单行失败
// ==========================================

use crate::domain::container::ContainerType;
use crate::domain::order::{ItemInfo, OrderLine};
use crate::domain::packing::{PackingOverride, PackingRule, Piece};
use crate::domain::types::{PieceKind, QuantityMode};
use crate::engine::classifier::{ItemClassifier, BAG_OVERHEAD_L, DEFAULT_UNIT_WEIGHT_G};
use std::collections::HashMap;

/// 自动拆分最大轮数 (对半拆分的有界重试)
pub const MAX_SPLIT_ROUNDS: u32 = 6;

/// 密度兜底值 (kg/L), 覆写给出非法密度时使用
const FALLBACK_DENSITY: f64 = 0.60;

// ==========================================
// PieceBuilder - 拣选件构造引擎
// ==========================================
pub struct PieceBuilder {
    classifier: ItemClassifier,
}

impl PieceBuilder {
    pub fn new() -> Self {
        Self {
            classifier: ItemClassifier::new(),
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 订单行集合 → 拣选件集合
    ///
    /// # 规则
    /// - 商品缺失 / 订单行无有效数量: 记警告并跳过该行
    /// - 预包装商品 (件数模式): 按固定件数切成预包装件,
    ///   count = ceil(件数 / 每件数量)
    /// - 其余商品: 按易损等级单袋上限循环剥离散装袋
    ///
    /// # 返回
    /// (拣选件列表, 警告列表)
    pub fn build_pieces(
        &self,
        lines: &[OrderLine],
        items_by_id: &HashMap<String, ItemInfo>,
        overrides_by_id: &HashMap<String, PackingOverride>,
    ) -> (Vec<Piece>, Vec<String>) {
        let mut pieces = Vec::new();
        let mut warnings = Vec::new();

        for line in lines {
            let item = match items_by_id.get(&line.item_id) {
                Some(item) => item,
                None => {
                    warnings.push(format!("ITEM_NOT_FOUND: item_id={}", line.item_id));
                    continue;
                }
            };

            let mode = match line.mode() {
                Some(mode) => mode,
                None => {
                    warnings.push(format!("EMPTY_LINE: item_id={}", line.item_id));
                    continue;
                }
            };

            if line.has_ambiguous_quantity() {
                warnings.push(format!(
                    "AMBIGUOUS_QUANTITY: item_id={}, 重量与件数同时有值,按重量处理",
                    line.item_id
                ));
            }

            let rule = self
                .classifier
                .resolve_rule(item, overrides_by_id.get(&line.item_id));

            match mode {
                QuantityMode::Unit => {
                    if let Some(spec) = self.classifier.bundle_spec(item) {
                        let units = line.quantity_units.unwrap_or(0);
                        self.build_bundles(item, &rule, units, spec, &mut pieces);
                        continue;
                    }
                    let units = line.quantity_units.unwrap_or(0);
                    self.build_unit_bags(item, &rule, units, &mut pieces);
                }
                QuantityMode::Kg => {
                    let kg = line.quantity_kg.unwrap_or(0.0);
                    self.build_weight_bags(item, &rule, kg, &mut pieces);
                }
            }
        }

        (pieces, warnings)
    }

    /// 超规格自动拆分
    ///
    /// 任何按重量或体积都装不进最大箱型的拣选件,
    /// 对半拆分 (有界重试 MAX_SPLIT_ROUNDS 轮) 直到可装入;
    /// 每次触发记一条警告。拆到上限仍超规格的件保留原样,
    /// 由装箱阶段按"无可用箱型"丢弃并警告。
    pub fn auto_split(
        &self,
        pieces: Vec<Piece>,
        largest: &ContainerType,
        warnings: &mut Vec<String>,
    ) -> Vec<Piece> {
        let max_kg = largest.max_weight_kg;
        let max_liters = largest.usable_liters();

        let mut out = Vec::with_capacity(pieces.len());
        let mut stack: Vec<(Piece, u32)> = pieces.into_iter().map(|p| (p, 0)).collect();
        // 栈式展开保持稳定顺序 (先入先出)
        stack.reverse();

        while let Some((piece, round)) = stack.pop() {
            let fits = piece.est_kg <= max_kg && piece.est_liters <= max_liters;
            // 单件 (1 个单位) 不可再拆
            let splittable = match piece.mode {
                QuantityMode::Unit => piece.quantity >= 2.0,
                QuantityMode::Kg => piece.quantity > 1e-6,
            };
            if fits || round >= MAX_SPLIT_ROUNDS || !splittable {
                out.push(piece);
                continue;
            }

            warnings.push(format!(
                "OVERSIZED_PIECE_SPLIT: item_id={}, est_kg={:.2}, est_liters={:.2}, round={}",
                piece.item_id,
                piece.est_kg,
                piece.est_liters,
                round + 1
            ));

            let (first, second) = Self::halve(&piece);
            // 保持原顺序: first 先处理
            stack.push((second, round + 1));
            stack.push((first, round + 1));
        }

        out
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 预包装件构造 (count = ceil(units / bundle_size))
    ///
    /// 尾件承载余量件数,但体积仍按整件常数计 (不满的箱格照占空间)
    fn build_bundles(
        &self,
        item: &ItemInfo,
        rule: &PackingRule,
        units: i64,
        spec: crate::engine::classifier::BundleSpec,
        pieces: &mut Vec<Piece>,
    ) {
        let unit_kg = item
            .avg_unit_weight_g
            .unwrap_or(spec.default_unit_weight_g)
            / 1000.0;
        let density = Self::safe_density(rule.density_kg_per_l);

        let mut remaining = units;
        while remaining > 0 {
            let take = remaining.min(spec.bundle_size);
            let est_kg = take as f64 * unit_kg;
            let est_liters = if spec.bundle_volume_l > 0.0 {
                spec.bundle_volume_l
            } else {
                est_kg / density + BAG_OVERHEAD_L
            };

            pieces.push(Piece {
                item_id: item.item_id.clone(),
                item_name: item.display_name.clone(),
                kind: PieceKind::Bundle,
                mode: QuantityMode::Unit,
                quantity: take as f64,
                est_liters,
                est_kg,
                fragility: rule.fragility,
                mixing_allowed: rule.mixing_allowed,
                ventilation_required: rule.ventilation_required,
                min_container_key: rule.min_container_key,
                max_kg_per_box: rule.max_kg_per_box,
            });
            remaining -= take;
        }
    }

    /// 重量模式散装袋: 按单袋上限循环剥离 min(remaining, cap)
    fn build_weight_bags(
        &self,
        item: &ItemInfo,
        rule: &PackingRule,
        kg: f64,
        pieces: &mut Vec<Piece>,
    ) {
        let cap = rule.fragility.bag_cap_kg();
        let density = Self::safe_density(rule.density_kg_per_l);

        let mut remaining = kg;
        while remaining > 1e-9 {
            let take = remaining.min(cap);
            pieces.push(Piece {
                item_id: item.item_id.clone(),
                item_name: item.display_name.clone(),
                kind: PieceKind::Bag,
                mode: QuantityMode::Kg,
                quantity: take,
                est_liters: take / density + BAG_OVERHEAD_L,
                est_kg: take,
                fragility: rule.fragility,
                mixing_allowed: rule.mixing_allowed,
                ventilation_required: rule.ventilation_required,
                min_container_key: rule.min_container_key,
                max_kg_per_box: rule.max_kg_per_box,
            });
            remaining -= take;
        }
    }

    /// 件数模式散装袋: 由平均单件重量推导单袋最大件数后剥离
    fn build_unit_bags(
        &self,
        item: &ItemInfo,
        rule: &PackingRule,
        units: i64,
        pieces: &mut Vec<Piece>,
    ) {
        let unit_kg = item.avg_unit_weight_g.unwrap_or(DEFAULT_UNIT_WEIGHT_G) / 1000.0;
        let cap = rule.fragility.bag_cap_kg();
        let density = Self::safe_density(rule.density_kg_per_l);

        let max_units_per_bag = ((cap / unit_kg).floor() as i64).max(1);

        let mut remaining = units;
        while remaining > 0 {
            let take = remaining.min(max_units_per_bag);
            let est_kg = take as f64 * unit_kg;
            let est_liters = match rule.unit_volume_l {
                Some(uv) => take as f64 * uv + BAG_OVERHEAD_L,
                None => est_kg / density + BAG_OVERHEAD_L,
            };

            pieces.push(Piece {
                item_id: item.item_id.clone(),
                item_name: item.display_name.clone(),
                kind: PieceKind::Bag,
                mode: QuantityMode::Unit,
                quantity: take as f64,
                est_liters,
                est_kg,
                fragility: rule.fragility,
                mixing_allowed: rule.mixing_allowed,
                ventilation_required: rule.ventilation_required,
                min_container_key: rule.min_container_key,
                max_kg_per_box: rule.max_kg_per_box,
            });
            remaining -= take;
        }
    }

    /// 对半拆分 (件数模式保持整数件; 重量/体积按比例分摊)
    fn halve(piece: &Piece) -> (Piece, Piece) {
        let (q1, q2) = match piece.mode {
            QuantityMode::Unit => {
                let q = piece.quantity.round() as i64;
                let first = (q + 1) / 2;
                (first as f64, (q - first) as f64)
            }
            QuantityMode::Kg => (piece.quantity / 2.0, piece.quantity / 2.0),
        };

        let make = |q: f64| {
            let factor = if piece.quantity > 0.0 {
                q / piece.quantity
            } else {
                0.5
            };
            Piece {
                quantity: q,
                est_kg: piece.est_kg * factor,
                est_liters: piece.est_liters * factor,
                ..piece.clone()
            }
        };

        (make(q1), make(q2))
    }

    fn safe_density(density: f64) -> f64 {
        if density.is_finite() && density > 0.0 {
            density
        } else {
            FALLBACK_DENSITY
        }
    }
}

impl Default for PieceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ContainerKey, FragilityClass};

    fn item(id: &str, type_name: &str, avg_g: Option<f64>) -> ItemInfo {
        ItemInfo {
            item_id: id.to_string(),
            display_name: type_name.to_string(),
            category: Some("Vegetable".to_string()),
            type_name: Some(type_name.to_string()),
            variety: None,
            avg_unit_weight_g: avg_g,
        }
    }

    fn catalog(items: Vec<ItemInfo>) -> HashMap<String, ItemInfo> {
        items.into_iter().map(|i| (i.item_id.clone(), i)).collect()
    }

    #[test]
    fn test_weight_bags_respect_cap() {
        let builder = PieceBuilder::new();
        let items = catalog(vec![item("carrot-1", "Carrot", None)]);
        let lines = vec![OrderLine::by_weight("carrot-1", 9.0)];

        let (pieces, warnings) = builder.build_pieces(&lines, &items, &HashMap::new());

        // roots: 耐压, 单袋上限 3.0 kg → 3 袋 × 3.0
        assert!(warnings.is_empty());
        assert_eq!(pieces.len(), 3);
        for p in &pieces {
            assert!((p.est_kg - 3.0).abs() < 1e-9);
            assert_eq!(p.kind, PieceKind::Bag);
            assert_eq!(p.fragility, FragilityClass::Sturdy);
        }
    }

    #[test]
    fn test_very_fragile_five_kg_splits_into_eight_bags() {
        let builder = PieceBuilder::new();
        let items = catalog(vec![item("tomato-1", "Tomato", None)]);
        let lines = vec![OrderLine::by_weight("tomato-1", 5.0)];

        let (pieces, _) = builder.build_pieces(&lines, &items, &HashMap::new());

        // 极易损上限 0.7 kg → ceil(5/0.7) = 8 袋,无一超限
        assert_eq!(pieces.len(), 8);
        for p in &pieces {
            assert!(p.est_kg <= 0.7 + 1e-9);
        }
        let total: f64 = pieces.iter().map(|p| p.est_kg).sum();
        assert!((total - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_item_warns_and_skips() {
        let builder = PieceBuilder::new();
        let items = catalog(vec![]);
        let lines = vec![OrderLine::by_weight("ghost", 2.0)];

        let (pieces, warnings) = builder.build_pieces(&lines, &items, &HashMap::new());
        assert!(pieces.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("ITEM_NOT_FOUND"));
    }

    #[test]
    fn test_egg_bundles_chopped_by_dozen() {
        let builder = PieceBuilder::new();
        let items = catalog(vec![item("egg-1", "Egg", Some(60.0))]);
        let lines = vec![OrderLine::by_units("egg-1", 25)];

        let (pieces, _) = builder.build_pieces(&lines, &items, &HashMap::new());

        // ceil(25/12) = 3 件; 尾件 1 枚
        assert_eq!(pieces.len(), 3);
        assert!(pieces.iter().all(|p| p.kind == PieceKind::Bundle));
        assert_eq!(pieces[0].quantity, 12.0);
        assert_eq!(pieces[1].quantity, 12.0);
        assert_eq!(pieces[2].quantity, 1.0);
        // 体积按整件常数计
        assert!((pieces[2].est_liters - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_unit_bags_from_avg_weight() {
        let builder = PieceBuilder::new();
        // 胡萝卜 250 g/根, 耐压上限 3.0 kg → 每袋最多 12 根
        let items = catalog(vec![item("carrot-1", "Carrot", Some(250.0))]);
        let lines = vec![OrderLine::by_units("carrot-1", 30)];

        let (pieces, _) = builder.build_pieces(&lines, &items, &HashMap::new());
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0].quantity, 12.0);
        assert_eq!(pieces[1].quantity, 12.0);
        assert_eq!(pieces[2].quantity, 6.0);
    }

    #[test]
    fn test_auto_split_halves_until_fits() {
        let builder = PieceBuilder::new();
        let largest = ContainerType {
            key: ContainerKey::Large,
            inner_l_mm: 0.0,
            inner_w_mm: 0.0,
            inner_h_mm: 0.0,
            headroom_frac: 0.0,
            usable_liters: Some(10.0),
            max_weight_kg: 2.0,
            vented: false,
            max_distinct_items: None,
        };

        let piece = Piece {
            item_id: "watermelon-1".to_string(),
            item_name: "西瓜".to_string(),
            kind: PieceKind::Bag,
            mode: QuantityMode::Kg,
            quantity: 6.0,
            est_liters: 8.0,
            est_kg: 6.0,
            fragility: FragilityClass::Normal,
            mixing_allowed: true,
            ventilation_required: false,
            min_container_key: None,
            max_kg_per_box: None,
        };

        let mut warnings = Vec::new();
        let out = builder.auto_split(vec![piece], &largest, &mut warnings);

        // 6 kg → 3 kg (超) → 1.5 kg (可装): 4 件
        assert_eq!(out.len(), 4);
        for p in &out {
            assert!(p.est_kg <= 2.0 + 1e-9);
        }
        let total: f64 = out.iter().map(|p| p.est_kg).sum();
        assert!((total - 6.0).abs() < 1e-9);
        assert!(!warnings.is_empty());
        assert!(warnings[0].contains("OVERSIZED_PIECE_SPLIT"));
    }

    #[test]
    fn test_auto_split_bounded() {
        let builder = PieceBuilder::new();
        let largest = ContainerType {
            key: ContainerKey::Large,
            inner_l_mm: 0.0,
            inner_w_mm: 0.0,
            inner_h_mm: 0.0,
            headroom_frac: 0.0,
            usable_liters: Some(0.001),
            max_weight_kg: 0.001,
            vented: false,
            max_distinct_items: None,
        };

        let piece = Piece {
            item_id: "boulder".to_string(),
            item_name: "超大件".to_string(),
            kind: PieceKind::Bag,
            mode: QuantityMode::Kg,
            quantity: 100.0,
            est_liters: 100.0,
            est_kg: 100.0,
            fragility: FragilityClass::Sturdy,
            mixing_allowed: true,
            ventilation_required: false,
            min_container_key: None,
            max_kg_per_box: None,
        };

        let mut warnings = Vec::new();
        let out = builder.auto_split(vec![piece], &largest, &mut warnings);

        // 有界拆分: 2^6 = 64 件,仍超规格但终止
        assert_eq!(out.len(), 64);
        let total: f64 = out.iter().map(|p| p.est_kg).sum();
        assert!((total - 100.0).abs() < 1e-6);
    }
}
