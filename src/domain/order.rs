// ==========================================
// 生鲜配送拣选系统 - 订单与商品领域模型
// ==========================================
// 职责: 装箱引擎的只读输入 (订单行 + 商品目录)
// 红线: 引擎不回写订单与商品目录
// ==========================================

use crate::domain::types::QuantityMode;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// OrderLine - 订单行
// ==========================================
// 约定: quantity_kg 与 quantity_units 不会同时有业务意义,
// 计量方式由哪个字段有值推导 (两者都有值时按重量处理并记警告)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: String,
    pub quantity_kg: Option<f64>,
    pub quantity_units: Option<i64>,
}

impl OrderLine {
    /// 按重量下单的订单行
    pub fn by_weight(item_id: &str, kg: f64) -> Self {
        Self {
            item_id: item_id.to_string(),
            quantity_kg: Some(kg),
            quantity_units: None,
        }
    }

    /// 按件数下单的订单行
    pub fn by_units(item_id: &str, units: i64) -> Self {
        Self {
            item_id: item_id.to_string(),
            quantity_kg: None,
            quantity_units: Some(units),
        }
    }

    /// 推导计量方式
    ///
    /// # 返回
    /// - Some(Kg): 重量有值 (> 0)
    /// - Some(Unit): 件数有值 (> 0)
    /// - None: 两者皆空或皆非正数
    pub fn mode(&self) -> Option<QuantityMode> {
        if self.quantity_kg.map(|kg| kg > 0.0).unwrap_or(false) {
            return Some(QuantityMode::Kg);
        }
        if self.quantity_units.map(|u| u > 0).unwrap_or(false) {
            return Some(QuantityMode::Unit);
        }
        None
    }

    /// 重量与件数是否同时有值 (数据质量警告信号)
    pub fn has_ambiguous_quantity(&self) -> bool {
        self.quantity_kg.map(|kg| kg > 0.0).unwrap_or(false)
            && self.quantity_units.map(|u| u > 0).unwrap_or(false)
    }
}

// ==========================================
// CustomerOrder - 客户订单
// ==========================================
// 对齐: customer_order 表 (lines 以 JSON 嵌入)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerOrder {
    pub order_id: String,
    pub work_center: String,  // 仓配中心代码
    pub shift_name: String,   // 班次名称
    pub shift_date: NaiveDate, // 班次日期
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// ItemInfo - 商品目录记录
// ==========================================
// 来源: 商品目录协作方,只读;
// 分类提示 (category/type/variety) 供分类引擎做关键词匹配
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemInfo {
    pub item_id: String,
    pub display_name: String,
    pub category: Option<String>,          // 展示大类 (如 vegetable / fruit)
    pub type_name: Option<String>,         // 品类 (如 lettuce / tomato)
    pub variety: Option<String>,           // 品种 (如 romaine / cherry)
    pub avg_unit_weight_g: Option<f64>,    // 平均单件重量 (克)
}

impl ItemInfo {
    /// 分类引擎使用的匹配文本 (小写拼接)
    pub fn classification_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(t) = self.type_name.as_deref() {
            parts.push(t);
        }
        if let Some(v) = self.variety.as_deref() {
            parts.push(v);
        }
        if let Some(c) = self.category.as_deref() {
            parts.push(c);
        }
        parts.join(" ").to_lowercase()
    }
}
