// ==========================================
// 生鲜配送拣选系统 - 品类分类引擎
// ==========================================
// 职责: 关键词命中 → 品类桶 → 装箱默认参数;
//       单品覆写整体叠加 (有值字段整体取覆写)
// 红线: 显式映射表,禁止逐字段 null 合并的临时写法
// ==========================================

use crate::domain::order::ItemInfo;
use crate::domain::packing::{PackingOverride, PackingRule};
use crate::domain::types::{FragilityClass, ProduceBucket};

/// 件数模式下缺少平均单件重量时的兜底假设 (克)
pub const DEFAULT_UNIT_WEIGHT_G: f64 = 200.0;

/// 每袋包装损耗体积 (L)
pub const BAG_OVERHEAD_L: f64 = 0.25;

// ==========================================
// 关键词表
// ==========================================
// 匹配对象: type/variety/category 拼接后的小写文本
const LEAFY_KEYWORDS: &[&str] = &[
    "lettuce", "spinach", "chard", "kale", "cabbage", "arugula", "herb", "bok choy", "生菜",
    "菠菜", "叶菜",
];
const TOMATO_KEYWORDS: &[&str] = &["tomato", "番茄", "西红柿"];
const BERRY_KEYWORDS: &[&str] = &[
    "berry", "strawberry", "blueberry", "raspberry", "blackberry", "grape", "草莓", "蓝莓",
];
const STONE_FRUIT_KEYWORDS: &[&str] = &[
    "peach", "plum", "apricot", "nectarine", "cherry", "桃", "李子", "樱桃",
];
const ROOT_KEYWORDS: &[&str] = &[
    "carrot", "potato", "beet", "radish", "turnip", "yam", "ginger", "sweet potato", "胡萝卜",
    "土豆", "萝卜",
];
const ALLIUM_KEYWORDS: &[&str] = &["onion", "garlic", "leek", "shallot", "洋葱", "大蒜", "葱"];
const CUCURBIT_KEYWORDS: &[&str] = &[
    "cucumber", "zucchini", "squash", "melon", "pumpkin", "黄瓜", "南瓜", "西瓜",
];

// 预包装件关键词 (如一打装鸡蛋)
const EGG_KEYWORDS: &[&str] = &["egg", "鸡蛋"];

// ==========================================
// BundleSpec - 预包装件规格
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BundleSpec {
    pub bundle_size: i64,           // 每件固定数量 (如 12 枚/打)
    pub bundle_volume_l: f64,       // 单件体积常数 (L)
    pub default_unit_weight_g: f64, // 单个单位的兜底重量 (克)
}

// ==========================================
// ItemClassifier - 分类引擎
// ==========================================
pub struct ItemClassifier {
    // 无状态引擎,不需要注入依赖
}

impl ItemClassifier {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 分类商品 → 品类桶
    ///
    /// # 规则
    /// 按固定优先级依次匹配关键词表,首个命中生效;
    /// 全部未命中 → Generic 兜底
    pub fn classify(&self, item: &ItemInfo) -> ProduceBucket {
        let text = item.classification_text();

        if Self::hits(&text, LEAFY_KEYWORDS) {
            return ProduceBucket::Leafy;
        }
        if Self::hits(&text, TOMATO_KEYWORDS) {
            return ProduceBucket::Tomatoes;
        }
        if Self::hits(&text, BERRY_KEYWORDS) {
            return ProduceBucket::Berries;
        }
        if Self::hits(&text, STONE_FRUIT_KEYWORDS) {
            return ProduceBucket::StoneFruit;
        }
        if Self::hits(&text, ROOT_KEYWORDS) {
            return ProduceBucket::Roots;
        }
        if Self::hits(&text, ALLIUM_KEYWORDS) {
            return ProduceBucket::Alliums;
        }
        if Self::hits(&text, CUCURBIT_KEYWORDS) {
            return ProduceBucket::Cucurbits;
        }
        ProduceBucket::Generic
    }

    /// 品类桶 → 装箱默认参数
    ///
    /// 密度 (kg/L) / 易损等级 / 是否需通风 / 是否允许混装
    pub fn bucket_defaults(&self, bucket: ProduceBucket) -> PackingRule {
        let (density, fragility, vented, mixing) = match bucket {
            ProduceBucket::Leafy => (0.20, FragilityClass::Fragile, true, true),
            ProduceBucket::Tomatoes => (0.55, FragilityClass::VeryFragile, true, true),
            ProduceBucket::Berries => (0.35, FragilityClass::VeryFragile, true, false),
            ProduceBucket::StoneFruit => (0.50, FragilityClass::Fragile, true, true),
            ProduceBucket::Roots => (0.80, FragilityClass::Sturdy, false, true),
            ProduceBucket::Alliums => (0.55, FragilityClass::Sturdy, true, true),
            ProduceBucket::Cucurbits => (0.60, FragilityClass::Normal, false, true),
            ProduceBucket::Generic => (0.60, FragilityClass::Normal, false, true),
        };

        PackingRule {
            fragility,
            mixing_allowed: mixing,
            ventilation_required: vented,
            min_container_key: None,
            max_kg_per_box: None,
            density_kg_per_l: density,
            unit_volume_l: None,
        }
    }

    /// 解析最终装箱规则 (桶默认值 ⊕ 单品覆写)
    pub fn resolve_rule(&self, item: &ItemInfo, ov: Option<&PackingOverride>) -> PackingRule {
        let defaults = self.bucket_defaults(self.classify(item));
        match ov {
            Some(ov) => defaults.overlay(ov),
            None => defaults,
        }
    }

    /// 预包装件规格 (如一打装鸡蛋)
    ///
    /// # 返回
    /// - Some(spec): 该商品按固定件数预包装拣选
    /// - None: 普通散装商品
    pub fn bundle_spec(&self, item: &ItemInfo) -> Option<BundleSpec> {
        let text = item.classification_text();
        if Self::hits(&text, EGG_KEYWORDS) {
            return Some(BundleSpec {
                bundle_size: 12,
                bundle_volume_l: 2.5,
                default_unit_weight_g: 60.0,
            });
        }
        None
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn hits(text: &str, keywords: &[&str]) -> bool {
        keywords.iter().any(|kw| text.contains(kw))
    }
}

impl Default for ItemClassifier {
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
    use crate::domain::types::ContainerKey;

    fn item(type_name: &str, variety: &str, category: &str) -> ItemInfo {
        ItemInfo {
            item_id: "test".to_string(),
            display_name: type_name.to_string(),
            category: Some(category.to_string()),
            type_name: Some(type_name.to_string()),
            variety: Some(variety.to_string()),
            avg_unit_weight_g: None,
        }
    }

    #[test]
    fn test_classify_keyword_buckets() {
        let classifier = ItemClassifier::new();

        assert_eq!(
            classifier.classify(&item("Lettuce", "Romaine", "Vegetable")),
            ProduceBucket::Leafy
        );
        assert_eq!(
            classifier.classify(&item("Spinach", "Baby", "Vegetable")),
            ProduceBucket::Leafy
        );
        assert_eq!(
            classifier.classify(&item("Tomato", "Cherry", "Vegetable")),
            ProduceBucket::Tomatoes
        );
        assert_eq!(
            classifier.classify(&item("Strawberry", "", "Fruit")),
            ProduceBucket::Berries
        );
        assert_eq!(
            classifier.classify(&item("Carrot", "Nantes", "Vegetable")),
            ProduceBucket::Roots
        );
        assert_eq!(
            classifier.classify(&item("Onion", "Yellow", "Vegetable")),
            ProduceBucket::Alliums
        );
        assert_eq!(
            classifier.classify(&item("Cucumber", "", "Vegetable")),
            ProduceBucket::Cucurbits
        );
    }

    #[test]
    fn test_classify_unmatched_falls_back_to_generic() {
        let classifier = ItemClassifier::new();
        assert_eq!(
            classifier.classify(&item("Dragonfruit", "", "Fruit")),
            ProduceBucket::Generic
        );
    }

    #[test]
    fn test_classify_matches_variety_and_category() {
        let classifier = ItemClassifier::new();
        // 品种字段命中
        assert_eq!(
            classifier.classify(&item("Mixed Greens", "Kale Blend", "Vegetable")),
            ProduceBucket::Leafy
        );
    }

    #[test]
    fn test_roots_defaults_match_placement_contract() {
        let classifier = ItemClassifier::new();
        let rule = classifier.bucket_defaults(ProduceBucket::Roots);

        assert_eq!(rule.fragility, FragilityClass::Sturdy);
        assert!((rule.density_kg_per_l - 0.80).abs() < 1e-9);
        assert!(!rule.ventilation_required);
        assert!((rule.fragility.bag_cap_kg() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_resolve_rule_with_override() {
        let classifier = ItemClassifier::new();
        let carrot = item("Carrot", "", "Vegetable");
        let ov = PackingOverride {
            item_id: "test".to_string(),
            fragility: Some(FragilityClass::Normal),
            min_container_key: Some(ContainerKey::Medium),
            ..Default::default()
        };

        let rule = classifier.resolve_rule(&carrot, Some(&ov));
        assert_eq!(rule.fragility, FragilityClass::Normal);
        assert_eq!(rule.min_container_key, Some(ContainerKey::Medium));
        // 未覆写字段保持桶默认
        assert!((rule.density_kg_per_l - 0.80).abs() < 1e-9);
    }

    #[test]
    fn test_bundle_spec_for_eggs_only() {
        let classifier = ItemClassifier::new();

        let eggs = item("Egg", "Free Range", "Dairy & Eggs");
        let spec = classifier.bundle_spec(&eggs).unwrap();
        assert_eq!(spec.bundle_size, 12);

        let carrot = item("Carrot", "", "Vegetable");
        assert!(classifier.bundle_spec(&carrot).is_none());
    }
}
