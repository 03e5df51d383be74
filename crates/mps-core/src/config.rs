//! 排程配置模型

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{MpsError, Result};

/// 主生產排程配置
///
/// 以不可變值的方式傳入每個元件，不使用任何全域狀態。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// 排程起始日（第 1 週的第一天）
    pub planning_start: NaiveDate,

    /// 最大排程週數
    pub max_planning_weeks: u32,

    /// 最晚訂單週之後額外保留的緩衝週數
    pub planning_buffer_weeks: u32,

    /// 無任何訂單時的預設排程週數
    pub default_horizon_weeks: u32,

    /// 訂單未填交期時，以起始日往後推算的週數
    pub default_due_offset_weeks: u32,

    /// 設備綜合效率（OEE）
    pub efficiency: f64,

    /// 每週工作天數
    pub working_days_per_week: u32,

    /// 加班容許比例（0.1 表示產能 +10%）
    pub overtime_allowance: f64,

    /// 交貨視窗：到期週前後可出貨的週數
    pub delivery_buffer_weeks: u32,

    /// 最短前置週數
    pub min_lead_time_weeks: u32,

    /// 鑄造後到交貨之間的固定管線緩衝週數
    pub pipeline_buffer_weeks: u32,

    /// 冷卻 + 落砂時數在此範圍內不額外增加週數
    pub cooling_grace_hours: f64,

    /// 未滿足需求懲罰（每件）
    pub unmet_penalty: f64,

    /// 延遲懲罰（每件每週）
    pub lateness_penalty: f64,

    /// 提早持有成本（每件每週，超過容許週數才計）
    pub holding_cost: f64,

    /// 可無成本提早交貨的週數
    pub max_early_weeks: u32,

    /// 換模懲罰（每次）
    pub setup_penalty: f64,

    /// 換模時間（分鐘）
    pub setup_minutes: f64,

    /// 真空產能折減係數（< 1，真空件佔用較多有效時間）
    pub vacuum_capacity_penalty: f64,

    /// 模箱可用比例（其餘保留為緩衝）
    pub mould_box_usable_ratio: f64,

    /// 每週熔解噸位上限（未設定則不限制）
    pub casting_tons_per_week: Option<f64>,

    /// 資源代碼別名（別名前綴 → 正式前綴）
    pub resource_aliases: BTreeMap<String, String>,

    /// 求解器設定
    pub solver: SolverConfig,
}

/// 求解器設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// 時間上限（秒）
    pub time_limit_secs: f64,

    /// 執行緒數
    pub threads: u32,

    /// 相對 MIP 間隙（未設定則使用求解器預設值）
    pub mip_rel_gap: Option<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: 120.0,
            threads: 8,
            mip_rel_gap: None,
        }
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            planning_start: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap_or_default(),
            max_planning_weeks: 30,
            planning_buffer_weeks: 2,
            default_horizon_weeks: 10,
            default_due_offset_weeks: 3,
            efficiency: 0.90,
            working_days_per_week: 6,
            overtime_allowance: 0.0,
            delivery_buffer_weeks: 1,
            min_lead_time_weeks: 2,
            pipeline_buffer_weeks: 2,
            cooling_grace_hours: 120.0,
            unmet_penalty: 200_000.0,
            lateness_penalty: 150_000.0,
            holding_cost: 1.0,
            max_early_weeks: 8,
            setup_penalty: 5.0,
            setup_minutes: 18.0,
            vacuum_capacity_penalty: 0.75,
            mould_box_usable_ratio: 0.90,
            casting_tons_per_week: None,
            resource_aliases: BTreeMap::from([("BVC".to_string(), "KVC".to_string())]),
            solver: SolverConfig::default(),
        }
    }
}

impl PlanConfig {
    /// 以指定起始日創建配置，其餘使用預設值
    pub fn new(planning_start: NaiveDate) -> Self {
        Self {
            planning_start,
            ..Self::default()
        }
    }

    /// 從 JSON 字串載入配置（缺少的欄位使用預設值）
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlanConfig = serde_json::from_str(json)
            .map_err(|e| MpsError::InvalidConfig(format!("JSON 解析失敗: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 建構器模式：設置排程週數上限與緩衝
    pub fn with_horizon(mut self, max_weeks: u32, buffer_weeks: u32) -> Self {
        self.max_planning_weeks = max_weeks;
        self.planning_buffer_weeks = buffer_weeks;
        self
    }

    /// 建構器模式：設置設備效率
    pub fn with_efficiency(mut self, efficiency: f64) -> Self {
        self.efficiency = efficiency;
        self
    }

    /// 建構器模式：設置每週工作天數
    pub fn with_working_days(mut self, days: u32) -> Self {
        self.working_days_per_week = days;
        self
    }

    /// 建構器模式：設置加班容許比例
    pub fn with_overtime_allowance(mut self, allowance: f64) -> Self {
        self.overtime_allowance = allowance;
        self
    }

    /// 建構器模式：設置交貨視窗緩衝週數
    pub fn with_delivery_buffer(mut self, weeks: u32) -> Self {
        self.delivery_buffer_weeks = weeks;
        self
    }

    /// 建構器模式：設置最短前置週數與管線緩衝週數
    pub fn with_lead_time(mut self, min_weeks: u32, pipeline_buffer_weeks: u32) -> Self {
        self.min_lead_time_weeks = min_weeks;
        self.pipeline_buffer_weeks = pipeline_buffer_weeks;
        self
    }

    /// 建構器模式：設置目標函數權重
    pub fn with_penalties(mut self, unmet: f64, lateness: f64, holding: f64) -> Self {
        self.unmet_penalty = unmet;
        self.lateness_penalty = lateness;
        self.holding_cost = holding;
        self
    }

    /// 建構器模式：設置換模懲罰與換模時間
    pub fn with_setup(mut self, penalty: f64, minutes: f64) -> Self {
        self.setup_penalty = penalty;
        self.setup_minutes = minutes;
        self
    }

    /// 建構器模式：設置真空產能折減係數
    pub fn with_vacuum_penalty(mut self, factor: f64) -> Self {
        self.vacuum_capacity_penalty = factor;
        self
    }

    /// 建構器模式：設置每週熔解噸位上限
    pub fn with_casting_tons_per_week(mut self, tons: f64) -> Self {
        self.casting_tons_per_week = Some(tons);
        self
    }

    /// 建構器模式：新增資源代碼別名
    pub fn with_resource_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.resource_aliases
            .insert(crate::normalize_code(alias), crate::normalize_code(canonical));
        self
    }

    /// 建構器模式：設置求解器時間上限與執行緒數
    pub fn with_solver(mut self, time_limit_secs: f64, threads: u32) -> Self {
        self.solver.time_limit_secs = time_limit_secs;
        self.solver.threads = threads;
        self
    }

    /// 產能乘數（含加班）
    pub fn capacity_multiplier(&self) -> f64 {
        1.0 + self.overtime_allowance
    }

    /// 驗證配置
    pub fn validate(&self) -> Result<()> {
        fn fraction(name: &str, value: f64) -> Result<()> {
            if value > 0.0 && value <= 1.0 {
                Ok(())
            } else {
                Err(MpsError::InvalidConfig(format!(
                    "{} 必須介於 (0, 1]，實際為 {}",
                    name, value
                )))
            }
        }

        fraction("efficiency", self.efficiency)?;
        fraction("vacuum_capacity_penalty", self.vacuum_capacity_penalty)?;
        fraction("mould_box_usable_ratio", self.mould_box_usable_ratio)?;

        if self.max_planning_weeks == 0 || self.default_horizon_weeks == 0 {
            return Err(MpsError::InvalidConfig("排程週數必須大於 0".to_string()));
        }
        if !(1..=7).contains(&self.working_days_per_week) {
            return Err(MpsError::InvalidConfig(format!(
                "每週工作天數必須介於 1 到 7，實際為 {}",
                self.working_days_per_week
            )));
        }

        let weights = [
            ("overtime_allowance", self.overtime_allowance),
            ("cooling_grace_hours", self.cooling_grace_hours),
            ("unmet_penalty", self.unmet_penalty),
            ("lateness_penalty", self.lateness_penalty),
            ("holding_cost", self.holding_cost),
            ("setup_penalty", self.setup_penalty),
            ("setup_minutes", self.setup_minutes),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(MpsError::InvalidConfig(format!(
                    "{} 不可為負值，實際為 {}",
                    name, value
                )));
            }
        }

        if let Some(tons) = self.casting_tons_per_week {
            if tons <= 0.0 {
                return Err(MpsError::InvalidConfig("熔解噸位上限必須大於 0".to_string()));
            }
        }
        if self.solver.time_limit_secs <= 0.0 || self.solver.threads == 0 {
            return Err(MpsError::InvalidConfig(
                "求解器時間上限與執行緒數必須大於 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PlanConfig::default();

        assert_eq!(config.planning_start, NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());
        assert_eq!(config.max_planning_weeks, 30);
        assert_eq!(config.working_days_per_week, 6);
        assert_eq!(config.solver.time_limit_secs, 120.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = PlanConfig::new(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap())
            .with_efficiency(1.0)
            .with_setup(10.0, 30.0)
            .with_resource_alias(" xa ", "yb")
            .with_solver(30.0, 2);

        assert_eq!(config.efficiency, 1.0);
        assert_eq!(config.setup_minutes, 30.0);
        assert_eq!(config.resource_aliases.get("XA"), Some(&"YB".to_string()));
        assert_eq!(config.solver.threads, 2);
    }

    #[test]
    fn test_from_json_partial() {
        let json = r#"{ "planning_start": "2026-03-02", "efficiency": 0.85, "solver": { "threads": 4 } }"#;
        let config = PlanConfig::from_json_str(json).unwrap();

        assert_eq!(config.planning_start, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(config.efficiency, 0.85);
        assert_eq!(config.solver.threads, 4);
        // 未提供的欄位保留預設值
        assert_eq!(config.solver.time_limit_secs, 120.0);
        assert_eq!(config.max_early_weeks, 8);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(PlanConfig::default().with_efficiency(1.5).validate().is_err());
        assert!(PlanConfig::default().with_vacuum_penalty(0.0).validate().is_err());
        assert!(PlanConfig::default().with_working_days(0).validate().is_err());
        assert!(PlanConfig::default()
            .with_penalties(-1.0, 1.0, 1.0)
            .validate()
            .is_err());
        assert!(PlanConfig::from_json_str("{ not json").is_err());
    }
}
