// ==========================================
// 生鲜配送拣选系统 - 箱型领域模型
// ==========================================
// 职责: 箱型目录记录 (装箱运算期间的不可变参考数据)
// ==========================================

use crate::domain::types::ContainerKey;
use serde::{Deserialize, Serialize};

/// 预留空间比例的上限 (满箱也要留出封口/缓冲空间)
pub const MAX_HEADROOM_FRAC: f64 = 0.9;

// ==========================================
// ContainerType - 箱型
// ==========================================
// 对齐: container_type 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerType {
    pub key: ContainerKey,             // 规格档位 (Small < Medium < Large)
    pub inner_l_mm: f64,               // 内净长 (mm)
    pub inner_w_mm: f64,               // 内净宽 (mm)
    pub inner_h_mm: f64,               // 内净高 (mm)
    pub headroom_frac: f64,            // 预留空间比例 (0 ~ 0.9)
    pub usable_liters: Option<f64>,    // 可用容积 (L); 为空时由内尺寸推导
    pub max_weight_kg: f64,            // 最大承重 (kg)
    pub vented: bool,                  // 是否通风箱
    pub max_distinct_items: Option<u32>, // 单箱 SKU 上限 (可选)
}

impl ContainerType {
    /// 可用容积 (升)
    ///
    /// 优先取存储值; 缺省按内尺寸推导:
    /// l*w*h*(1-headroom) / 1_000_000 (mm³ → L)
    pub fn usable_liters(&self) -> f64 {
        if let Some(v) = self.usable_liters {
            return v;
        }
        let headroom = self.headroom_frac.clamp(0.0, MAX_HEADROOM_FRAC);
        self.inner_l_mm * self.inner_w_mm * self.inner_h_mm * (1.0 - headroom) / 1_000_000.0
    }
}
