//! 最佳化模型建構器

use mps_calc::{CapacityProvider, Decomposition, PartCatalog};
use mps_core::{DemandVariant, MpsError, Part, PlanConfig, Result, Stage};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::constraints;
use crate::model::MilpModel;
use crate::variables::VariablePool;

/// 模型中的零件及其變體索引
#[derive(Debug, Clone)]
pub struct PartSlot {
    pub part: Part,
    /// 變體在 `Decomposition::variants` 中的索引
    pub variants: Vec<usize>,
}

/// 建構完成的排程模型
#[derive(Debug, Clone)]
pub struct PlanningModel {
    pub model: MilpModel,
    pub pool: VariablePool,
    pub parts: Vec<PartSlot>,
    pub horizon_weeks: u32,
}

/// 約束建構時共用的唯讀資料
pub(crate) struct ModelContext<'a> {
    pub config: &'a PlanConfig,
    pub capacity: &'a CapacityProvider,
    pub decomposition: &'a Decomposition,
    pub parts: &'a [PartSlot],
    pub pool: &'a VariablePool,
    pub horizon_weeks: u32,
}

impl ModelContext<'_> {
    pub fn variant(&self, index: usize) -> &DemandVariant {
        &self.decomposition.variants[index]
    }
}

/// Decimal 轉 f64
///
/// Decimal 的 96 位元尾數遠小於 f64 範圍，`to_f64` 對任何值都回傳 `Some`，
/// 預設值不會被用到。
pub(crate) fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// 最佳化模型建構器
pub struct ModelBuilder<'a> {
    config: &'a PlanConfig,
    catalog: &'a PartCatalog,
    capacity: &'a CapacityProvider,
    decomposition: &'a Decomposition,
}

impl<'a> ModelBuilder<'a> {
    /// 創建新的模型建構器
    pub fn new(
        config: &'a PlanConfig,
        catalog: &'a PartCatalog,
        capacity: &'a CapacityProvider,
        decomposition: &'a Decomposition,
    ) -> Self {
        Self {
            config,
            catalog,
            capacity,
            decomposition,
        }
    }

    /// 建立變數、約束與目標函數
    pub fn build(&self) -> Result<PlanningModel> {
        let start_time = std::time::Instant::now();
        let horizon_weeks = self.decomposition.calendar.horizon_weeks;

        // Step 1: 依零件整理變體
        tracing::debug!("Step 1: 整理零件與變體");
        let parts = self.collect_parts()?;

        // Step 2: 產能缺口檢查（求解前）
        tracing::debug!("Step 2: 產能缺口檢查");
        self.check_capacity(&parts)?;

        // Step 3: 建立決策變數與目標係數
        tracing::debug!("Step 3: 建立決策變數");
        let mut model = MilpModel::new();
        let pool = self.create_variables(&mut model, &parts, horizon_weeks);
        tracing::debug!(
            "變數 {} 個（整數 {} 個）",
            model.num_columns(),
            model.num_integer_columns()
        );

        // Step 4: 建立約束
        tracing::debug!("Step 4: 建立約束");
        let ctx = ModelContext {
            config: self.config,
            capacity: self.capacity,
            decomposition: self.decomposition,
            parts: &parts,
            pool: &pool,
            horizon_weeks,
        };
        constraints::add_flow_constraints(&ctx, &mut model);
        constraints::add_seriality_constraints(&ctx, &mut model);
        constraints::add_lead_time_constraints(&ctx, &mut model);
        constraints::add_demand_balance(&ctx, &mut model);
        constraints::add_resource_capacity(&ctx, &mut model);
        constraints::add_casting_line_capacity(&ctx, &mut model);
        constraints::add_core_capacity(&ctx, &mut model);
        constraints::add_setup_links(&ctx, &mut model);
        constraints::add_mould_box_capacity(&ctx, &mut model);
        constraints::add_melt_tonnage(&ctx, &mut model);

        tracing::info!(
            "模型建構完成：變數 {} 個，約束 {} 條，耗時 {:?}",
            model.num_columns(),
            model.num_rows(),
            start_time.elapsed()
        );

        Ok(PlanningModel {
            model,
            pool,
            parts,
            horizon_weeks,
        })
    }

    /// 依零件代碼分組變體
    fn collect_parts(&self) -> Result<Vec<PartSlot>> {
        let mut grouped: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (idx, variant) in self.decomposition.variants.iter().enumerate() {
            grouped.entry(variant.part_code()).or_default().push(idx);
        }

        grouped
            .into_iter()
            .map(|(code, variants)| {
                let part = self
                    .catalog
                    .get(code)
                    .cloned()
                    .ok_or_else(|| MpsError::PartNotFound(code.to_string()))?;
                Ok(PartSlot { part, variants })
            })
            .collect()
    }

    /// 有正需求的工序必須有產能資料，否則在求解前回報全部缺口
    fn check_capacity(&self, parts: &[PartSlot]) -> Result<()> {
        let mut gaps = Vec::new();

        for slot in parts {
            let part = &slot.part;
            let Some(requirement) = self.decomposition.part_requirements.get(&part.code) else {
                continue;
            };
            let reqs = &requirement.requirements;

            if reqs.casting > Decimal::ZERO {
                if !self.capacity.has_machine(part.casting_line()) {
                    gaps.push(format!("{} 鑄造線 {}", part.code, part.casting_line()));
                }
                if let Some(spec) = &part.mould_box {
                    let usable = self.capacity.usable_mould_boxes(&spec.size).unwrap_or(0.0);
                    if usable <= 0.0 {
                        gaps.push(format!("{} 模箱 {}", part.code, spec.size));
                    }
                }
            }

            for stage in Stage::MACHINED {
                let needed = reqs.for_stage(stage).unwrap_or(Decimal::ZERO) > Decimal::ZERO;
                if !needed || !part.routing.has(stage) {
                    continue;
                }
                if let Some(op) = part.operation(stage) {
                    if !self.capacity.has_machine(&op.resource) {
                        gaps.push(format!("{} {} 資源 {}", part.code, stage, op.resource));
                    }
                }
            }
        }

        if gaps.is_empty() {
            Ok(())
        } else {
            tracing::warn!("產能缺口 {} 項", gaps.len());
            Err(MpsError::MissingCapacity(gaps.join("; ")))
        }
    }

    /// 建立變數並設定目標係數
    ///
    /// 交貨變數只在交貨視窗內建立，延遲/提早成本依真正到期週計算。
    fn create_variables(
        &self,
        model: &mut MilpModel,
        parts: &[PartSlot],
        horizon_weeks: u32,
    ) -> VariablePool {
        let config = self.config;
        let mut pool = VariablePool::new(self.decomposition.variants.len(), parts.len(), horizon_weeks);

        for (part_idx, slot) in parts.iter().enumerate() {
            let mut casts = false;

            for &v in &slot.variants {
                let variant = &self.decomposition.variants[v];
                if variant.wip_only {
                    continue;
                }
                let net = to_f64(variant.net_demand);

                for week in 1..=horizon_weeks {
                    for stage in slot.part.routing.stages() {
                        if stage == Stage::Delivery {
                            continue;
                        }
                        let req = to_f64(variant.requirements.for_stage(stage).unwrap_or_default());
                        if req <= 0.0 {
                            continue;
                        }
                        let column = if stage == Stage::Casting {
                            casts = true;
                            model.add_integer_column(0.0, 0.0, req.ceil())
                        } else {
                            model.add_column(0.0, 0.0, req)
                        };
                        pool.set_stage(v, week, stage, column);
                    }

                    if variant.window.contains(week) {
                        let due = variant.due_week();
                        let late = f64::from(week.saturating_sub(due));
                        let early =
                            f64::from(due.saturating_sub(week).saturating_sub(config.max_early_weeks));
                        let cost = config.lateness_penalty * late + config.holding_cost * early;
                        let column = model.add_column(cost, 0.0, net);
                        pool.set_stage(v, week, Stage::Delivery, column);
                    }
                }

                let unmet = model.add_column(config.unmet_penalty, 0.0, net);
                pool.set_unmet(v, unmet);
            }

            if casts {
                for week in 1..=horizon_weeks {
                    let column = model.add_binary_column(config.setup_penalty);
                    pool.set_setup(part_idx, week, column);
                }
            }
        }

        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mps_calc::{DemandDecomposer, RoutingBuilder};
    use mps_core::{
        Checkpoint, ConstraintClass, MachineRecord, MouldBoxRecord, OrderLine, PartMasterRecord,
        RoutingStepRecord, WipSnapshot,
    };

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()
    }

    fn week(n: u32) -> NaiveDate {
        start() + chrono::Duration::days(7 * (i64::from(n) - 1))
    }

    fn config() -> PlanConfig {
        PlanConfig::new(start())
            .with_efficiency(1.0)
            .with_working_days(1)
            .with_setup(5.0, 0.0)
    }

    fn record() -> PartMasterRecord {
        PartMasterRecord::new("P1", "L1", 6.0)
            .with_unit_weight(50.0)
            .with_mould_box("B1", 2.0)
            .with_core(10.0, 2.0)
            .with_step(Stage::Grinding, RoutingStepRecord::new("GR", 3.0, 1.0))
            .with_step(Stage::Mc1, RoutingStepRecord::new("MC-A", 4.0, 1.0))
            .with_step(Stage::Mc2, RoutingStepRecord::new("MC-B", 4.0, 1.0))
            .with_step(Stage::Sp1, RoutingStepRecord::new("SP-A", 2.0, 1.0))
    }

    fn machines() -> Vec<MachineRecord> {
        vec![
            MachineRecord::new("L1", "Casting", 10.0),
            MachineRecord::new("GR", "Grinding", 10.0),
            MachineRecord::new("MC-A", "Machining", 10.0),
            MachineRecord::new("MC-B", "Machining", 10.0),
            MachineRecord::new("SP-A", "Painting", 10.0),
        ]
    }

    fn build(
        config: &PlanConfig,
        machines: &[MachineRecord],
        orders: Vec<OrderLine>,
        wip: &[WipSnapshot],
    ) -> Result<(Decomposition, PlanningModel)> {
        let catalog = RoutingBuilder::build(&[record()], config)?;
        let capacity =
            CapacityProvider::build(machines, &[MouldBoxRecord::new("B1", 100.0)], config)?;
        let decomposition = DemandDecomposer::new(config, &catalog).decompose(orders, wip)?;
        let planning = ModelBuilder::new(config, &catalog, &capacity, &decomposition).build()?;
        Ok((decomposition, planning))
    }

    #[test]
    fn test_build_creates_constraint_classes() {
        let config = config();
        let orders = vec![OrderLine::new("P1", Decimal::from(100), week(4))];
        let (_, planning) = build(&config, &machines(), orders, &[]).unwrap();
        let model = &planning.model;

        // 排程週數 = 4 + 2
        assert_eq!(planning.horizon_weeks, 6);
        for class in [
            ConstraintClass::FlowConservation,
            ConstraintClass::StageSeriality,
            ConstraintClass::LeadTime,
            ConstraintClass::DemandBalance,
            ConstraintClass::ResourceCapacity,
            ConstraintClass::CastingLine,
            ConstraintClass::SetupLink,
            ConstraintClass::MouldBox,
        ] {
            assert!(model.count_class(class) > 0, "{:?} 應有約束", class);
        }
        // 未設定熔解上限，也沒有砂心作業
        assert_eq!(model.count_class(ConstraintClass::MeltTonnage), 0);
        assert_eq!(model.count_class(ConstraintClass::CoreCapacity), 0);
        // MC2 ≤ MC1，每週一條
        assert_eq!(model.count_class(ConstraintClass::StageSeriality), 6);
        assert_eq!(model.count_class(ConstraintClass::DemandBalance), 1);
        // 鑄造變數與佔線指示為整數
        assert_eq!(model.num_integer_columns(), 12);
    }

    #[test]
    fn test_delivery_columns_only_inside_window() {
        let config = config();
        let orders = vec![OrderLine::new("P1", Decimal::from(100), week(4))];
        let (_, planning) = build(&config, &machines(), orders, &[]).unwrap();

        let weeks: Vec<u32> = (1..=planning.horizon_weeks)
            .filter(|w| planning.pool.stage(0, *w, Stage::Delivery).is_some())
            .collect();
        assert_eq!(weeks, vec![3, 4, 5]);

        // 延後一週的交貨成本為延遲懲罰
        let late = planning.pool.stage(0, 5, Stage::Delivery).unwrap();
        assert_eq!(planning.model.columns()[late.0].cost, config.lateness_penalty);
        let on_time = planning.pool.stage(0, 4, Stage::Delivery).unwrap();
        assert_eq!(planning.model.columns()[on_time.0].cost, 0.0);
    }

    #[test]
    fn test_wip_only_variant_has_no_columns() {
        let config = config();
        let orders = vec![
            OrderLine::new("P1", Decimal::from(30), week(1)),
            OrderLine::new("P1", Decimal::from(50), week(4)),
        ];
        let wip = vec![WipSnapshot::new("P1").with(Checkpoint::FinishedGoods, Decimal::from(30))];
        let (decomposition, planning) = build(&config, &machines(), orders, &wip).unwrap();

        assert!(decomposition.variants[0].wip_only);
        for w in 1..=planning.horizon_weeks {
            for stage in Stage::ALL {
                assert!(planning.pool.stage(0, w, stage).is_none());
            }
        }
        assert!(planning.pool.unmet(0).is_none());
        assert!(planning.pool.unmet(1).is_some());
        assert_eq!(planning.model.count_class(ConstraintClass::DemandBalance), 1);
    }

    #[test]
    fn test_missing_capacity_lists_all_gaps() {
        let config = config();
        let orders = vec![OrderLine::new("P1", Decimal::from(100), week(4))];
        let machines: Vec<MachineRecord> = machines()
            .into_iter()
            .filter(|m| m.resource_code != "L1" && m.resource_code != "MC-B")
            .collect();

        let err = build(&config, &machines, orders, &[]).unwrap_err();
        let MpsError::MissingCapacity(message) = err else {
            panic!("應為產能缺失錯誤: {:?}", err);
        };
        assert!(message.contains("L1"));
        assert!(message.contains("MC-B"));
        assert!(!message.contains("MC-A"));
    }

    #[test]
    fn test_melt_tonnage_rows_when_configured() {
        let config = config().with_casting_tons_per_week(3.0);
        let orders = vec![OrderLine::new("P1", Decimal::from(100), week(4))];
        let (_, planning) = build(&config, &machines(), orders, &[]).unwrap();

        assert_eq!(
            planning.model.count_class(ConstraintClass::MeltTonnage),
            planning.horizon_weeks as usize
        );
    }

    #[test]
    fn test_core_rows_use_operation_capacity() {
        let config = config();
        let mut machines = machines();
        machines.push(MachineRecord::new("CM-1", "Core", 4.0));
        machines.push(MachineRecord::new("CM-2", " core ", 1.0));
        let orders = vec![OrderLine::new("P1", Decimal::from(100), week(4))];
        let (_, planning) = build(&config, &machines, orders, &[]).unwrap();
        let model = &planning.model;

        assert_eq!(
            model.count_class(ConstraintClass::CoreCapacity),
            planning.horizon_weeks as usize
        );
        // 兩台砂心機合計 (4 + 1) × 60 分鐘，每件 10 / 2 分鐘
        let casting = planning.pool.stage(0, 1, Stage::Casting).unwrap();
        let row = model
            .rows()
            .iter()
            .find(|r| r.class == ConstraintClass::CoreCapacity)
            .unwrap();
        assert_eq!(row.upper, 300.0);
        assert_eq!(row.terms, vec![(casting, 5.0)]);
    }

    #[test]
    fn test_to_f64_never_falls_back() {
        assert!((to_f64(Decimal::new(12345, 2)) - 123.45).abs() < 1e-9);
        assert!(to_f64(Decimal::MAX) > 7.9e28);
        assert!(to_f64(Decimal::MIN) < -7.9e28);
        assert!(to_f64(Decimal::new(1, 28)) > 0.0);
    }
}
