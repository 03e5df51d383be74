//! 產能原始資料模型

use serde::{Deserialize, Serialize};

/// 機台限制資料列
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineRecord {
    /// 資源代碼
    pub resource_code: String,

    /// 資源名稱
    pub resource_name: String,

    /// 作業名稱（如 Casting、Grinding、Machining）
    pub operation: String,

    /// 機台數量
    pub unit_count: u32,

    /// 每班時數
    pub hours_per_day: f64,

    /// 每日班數
    pub shifts_per_day: f64,
}

impl MachineRecord {
    /// 創建新的機台資料列（單台、單班）
    pub fn new(resource_code: &str, operation: &str, hours_per_day: f64) -> Self {
        Self {
            resource_code: resource_code.to_string(),
            resource_name: resource_code.to_string(),
            operation: operation.to_string(),
            unit_count: 1,
            hours_per_day,
            shifts_per_day: 1.0,
        }
    }

    /// 建構器模式：設置機台數量
    pub fn with_units(mut self, units: u32) -> Self {
        self.unit_count = units;
        self
    }

    /// 建構器模式：設置每日班數
    pub fn with_shifts(mut self, shifts: f64) -> Self {
        self.shifts_per_day = shifts;
        self
    }

    /// 是否為鑄造作業
    pub fn is_casting(&self) -> bool {
        self.operation.to_lowercase().contains("casting")
    }
}

/// 模箱產能資料列
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MouldBoxRecord {
    /// 模箱尺寸
    pub box_size: String,

    /// 每週額定產能（模數，單班）
    pub weekly_capacity: f64,
}

impl MouldBoxRecord {
    pub fn new(box_size: &str, weekly_capacity: f64) -> Self {
        Self {
            box_size: box_size.to_string(),
            weekly_capacity,
        }
    }
}
