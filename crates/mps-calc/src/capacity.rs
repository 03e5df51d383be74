//! 產能提供者

use mps_core::{normalize_code, MachineRecord, MouldBoxRecord, MpsError, PlanConfig, Result};
use std::collections::{BTreeMap, HashMap};

/// 每週資源產能
///
/// 機台與鑄造線以分鐘計，模箱以模數計。建構後唯讀。
#[derive(Debug, Clone)]
pub struct CapacityProvider {
    /// 資源代碼 → 每週可用分鐘（已含效率與加班）
    machine_minutes: HashMap<String, f64>,

    /// 作業名稱 → 每週可用分鐘合計
    operation_minutes: HashMap<String, f64>,

    /// 模箱尺寸 → 每週額定模數（已乘鑄造班數）
    mould_boxes: HashMap<String, f64>,

    /// 資源代碼別名（前綴）
    aliases: BTreeMap<String, String>,

    /// 模箱可用比例
    usable_ratio: f64,
}

impl CapacityProvider {
    /// 由原始機台與模箱資料建立產能表
    ///
    /// 每週工時 = 每班時數 × 班數 × 台數 × 效率 × 工作天數；同代碼多筆相加。
    pub fn build(
        machines: &[MachineRecord],
        mould_boxes: &[MouldBoxRecord],
        config: &PlanConfig,
    ) -> Result<Self> {
        let multiplier = config.capacity_multiplier();
        let mut machine_minutes: HashMap<String, f64> = HashMap::new();
        let mut operation_minutes: HashMap<String, f64> = HashMap::new();
        let mut casting_shifts: f64 = 0.0;

        for record in machines {
            if record.hours_per_day < 0.0 || record.shifts_per_day < 0.0 {
                return Err(MpsError::InvalidInput(format!(
                    "資源 {} 的時數或班數為負值",
                    record.resource_code
                )));
            }

            let weekly_hours = record.hours_per_day
                * record.shifts_per_day
                * f64::from(record.unit_count)
                * config.efficiency
                * f64::from(config.working_days_per_week);
            let minutes = weekly_hours * 60.0 * multiplier;

            *machine_minutes
                .entry(normalize_code(&record.resource_code))
                .or_insert(0.0) += minutes;
            *operation_minutes
                .entry(record.operation.trim().to_lowercase())
                .or_insert(0.0) += minutes;

            if record.is_casting() {
                casting_shifts = casting_shifts.max(record.shifts_per_day);
            }
        }

        // 模箱額定產能以單班計，依鑄造最大班數放大
        let shift_factor = casting_shifts.max(1.0);
        let mut boxes: HashMap<String, f64> = HashMap::new();
        for record in mould_boxes {
            *boxes.entry(normalize_code(&record.box_size)).or_insert(0.0) +=
                record.weekly_capacity * shift_factor;
        }

        tracing::debug!(
            "產能表建立完成：資源 {} 個，模箱 {} 種，鑄造班數 {}",
            machine_minutes.len(),
            boxes.len(),
            shift_factor
        );

        Ok(Self {
            machine_minutes,
            operation_minutes,
            mould_boxes: boxes,
            aliases: config.resource_aliases.clone(),
            usable_ratio: config.mould_box_usable_ratio,
        })
    }

    /// 解析資源代碼（精確比對優先，其次套用前綴別名）
    pub fn resolve_code(&self, code: &str) -> String {
        let code = normalize_code(code);
        if self.machine_minutes.contains_key(&code) {
            return code;
        }
        for (alias, canonical) in &self.aliases {
            if let Some(rest) = code.strip_prefix(alias.as_str()) {
                let candidate = format!("{}{}", canonical, rest);
                if self.machine_minutes.contains_key(&candidate) {
                    return candidate;
                }
            }
        }
        code
    }

    /// 資源每週可用分鐘
    pub fn machine_minutes(&self, code: &str) -> Option<f64> {
        self.machine_minutes.get(&self.resolve_code(code)).copied()
    }

    /// 作業每週可用分鐘合計
    pub fn operation_minutes(&self, operation: &str) -> Option<f64> {
        self.operation_minutes
            .get(&operation.trim().to_lowercase())
            .copied()
    }

    /// 模箱每週額定模數
    pub fn mould_box_capacity(&self, box_size: &str) -> Option<f64> {
        self.mould_boxes.get(&normalize_code(box_size)).copied()
    }

    /// 模箱每週可用模數（保留緩衝後）
    pub fn usable_mould_boxes(&self, box_size: &str) -> Option<f64> {
        self.mould_box_capacity(box_size)
            .map(|capacity| capacity * self.usable_ratio)
    }

    /// 資源是否有正產能
    pub fn has_machine(&self, code: &str) -> bool {
        self.machine_minutes(code).map_or(false, |m| m > 0.0)
    }
}
