//! 途程與參數建構

use mps_core::{
    normalize_code, MachiningRoute, MouldBoxSpec, MpsError, PaintingRoute, Part,
    PartMasterRecord, PlanConfig, Result, Routing, RoutingStepRecord, Stage, StageOp,
};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

use crate::lead_time::LeadTimeCalculator;

/// 零件目錄（正規化代碼 → 零件）
#[derive(Debug, Clone, Default)]
pub struct PartCatalog {
    parts: HashMap<String, Part>,
}

impl PartCatalog {
    /// 查詢零件（代碼不分大小寫）
    pub fn get(&self, code: &str) -> Option<&Part> {
        self.parts.get(&normalize_code(code))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.parts.contains_key(&normalize_code(code))
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Part> {
        self.parts.values()
    }
}

/// 途程建構器
pub struct RoutingBuilder;

impl RoutingBuilder {
    /// 由零件主檔建立零件目錄（各零件獨立，平行處理）
    pub fn build(records: &[PartMasterRecord], config: &PlanConfig) -> Result<PartCatalog> {
        tracing::info!("開始建立途程參數：零件主檔 {} 筆", records.len());

        let parts = records
            .par_iter()
            .map(|record| Self::build_part(record, config))
            .collect::<Result<Vec<Part>>>()?;

        let mut catalog = PartCatalog::default();
        for part in parts {
            if catalog.parts.contains_key(&part.code) {
                tracing::warn!("零件主檔重複：{}，保留第一筆", part.code);
                continue;
            }
            catalog.parts.insert(part.code.clone(), part);
        }

        tracing::debug!("途程參數建立完成：{} 個零件", catalog.len());
        Ok(catalog)
    }

    /// 建立單一零件
    pub fn build_part(record: &PartMasterRecord, config: &PlanConfig) -> Result<Part> {
        let code = normalize_code(&record.part_code);
        if code.is_empty() {
            return Err(MpsError::InvalidInput("零件主檔存在空白零件代碼".to_string()));
        }

        let line = normalize_code(&record.casting_line);
        if !Self::is_present(&line) {
            return Err(MpsError::InvalidInput(format!("零件 {} 缺少鑄造線", code)));
        }
        if record.casting_cycle_minutes <= 0.0 {
            return Err(MpsError::InvalidInput(format!(
                "零件 {} 的鑄造週期時間必須大於 0",
                code
            )));
        }

        let casting = StageOp {
            resource: line,
            cycle_minutes: record.casting_cycle_minutes,
            batch_size: Self::batch(record.casting_batch_size),
        };

        // 砂心批量至少為 1
        let core_minutes_per_unit = if record.core_cycle_minutes.is_finite()
            && record.core_cycle_minutes > 0.0
        {
            record.core_cycle_minutes / Self::batch(record.core_batch_size).max(1.0)
        } else {
            0.0
        };

        let mut operations = BTreeMap::new();
        for stage in Stage::MACHINED {
            if let Some(op) = record.step(stage).and_then(Self::parse_step) {
                operations.insert(stage, op);
            }
        }

        let routing = Self::routing_from(&code, &operations);
        // 途程未經過的工序不保留作業參數
        operations.retain(|stage, _| routing.has(*stage));

        let cooling_hours = record.cooling_hours.max(0.0) + record.shakeout_hours.max(0.0);
        let cooling_lag_weeks = LeadTimeCalculator::cooling_weeks(cooling_hours, config);
        let lead_time_weeks = LeadTimeCalculator::lead_time_weeks(cooling_lag_weeks, config);

        let mould_box = match (&record.box_size, record.box_quantity) {
            (Some(size), Some(units)) if Self::is_present(size) && units > 0.0 => {
                Some(MouldBoxSpec {
                    size: normalize_code(size),
                    units_per_box: units,
                })
            }
            _ => None,
        };

        Ok(Part {
            code,
            unit_weight_kg: record.unit_weight_kg.max(0.0),
            mould_box,
            casting,
            core_minutes_per_unit,
            operations,
            routing,
            cooling_hours,
            requires_vacuum: record.vacuum_minutes > 0.0,
            cooling_lag_weeks,
            lead_time_weeks,
        })
    }

    /// 依工序作業是否存在推導途程描述
    fn routing_from(code: &str, operations: &BTreeMap<Stage, StageOp>) -> Routing {
        let has = |stage: Stage| operations.contains_key(&stage);

        let machining = if has(Stage::Mc1) {
            MachiningRoute::Through {
                mc2: has(Stage::Mc2),
                mc3: has(Stage::Mc3),
            }
        } else {
            if has(Stage::Mc2) || has(Stage::Mc3) {
                tracing::warn!("零件 {} 缺少 MC1，忽略後續加工工序", code);
            }
            MachiningRoute::Skipped
        };

        let painting = if has(Stage::Sp1) {
            PaintingRoute::Through {
                sp2: has(Stage::Sp2),
                sp3: has(Stage::Sp3),
            }
        } else {
            if has(Stage::Sp2) || has(Stage::Sp3) {
                tracing::warn!("零件 {} 缺少 SP1，忽略後續塗裝工序", code);
            }
            PaintingRoute::Skipped
        };

        Routing {
            grinding: has(Stage::Grinding),
            machining,
            painting,
        }
    }

    /// 解析單一途程欄位；資源或週期時間缺失表示不經過此工序
    fn parse_step(step: &RoutingStepRecord) -> Option<StageOp> {
        let resource = normalize_code(step.resource.as_deref()?);
        if !Self::is_present(&resource) {
            return None;
        }
        let cycle_minutes = step.cycle_minutes.filter(|c| c.is_finite() && *c > 0.0)?;
        Some(StageOp {
            resource,
            cycle_minutes,
            batch_size: Self::batch(step.batch_size),
        })
    }

    fn batch(batch_size: Option<f64>) -> f64 {
        batch_size.filter(|b| b.is_finite() && *b > 0.0).unwrap_or(1.0)
    }

    /// 代碼是否有效（排除空白、"0"、"NAN"）
    fn is_present(code: &str) -> bool {
        let code = code.trim();
        !(code.is_empty() || code == "0" || code.eq_ignore_ascii_case("nan"))
    }
}
