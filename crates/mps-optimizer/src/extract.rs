//! 求解結果萃取

use mps_calc::{AllocationCalculator, CapacityProvider, Decomposition};
use mps_core::plan::{
    BottleneckRow, BottleneckSeverity, ChangeoverRow, FlowTimingRow, FulfillmentStatus,
    OrderFulfillmentRow, ResourceUtilization, SolveSummary, StageProductionRow,
    StockDeliveryRow, UnmetDemandRow, VacuumUtilizationRow, WeeklyStageSummary,
};
use mps_core::{DemandVariant, OrderLine, PlanConfig, PlanWarning, ProductionPlan, Stage};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::builder::{to_f64, PartSlot, PlanningModel};
use crate::model::ColumnId;
use crate::solver::SolverSolution;

/// 小於此值的變數值視為數值雜訊
pub const VALUE_EPSILON: f64 = 1e-3;

/// 佔線指示變數的判定門檻
const SETUP_THRESHOLD: f64 = 0.5;

/// 生產明細及其變體索引
type VariantRow = (usize, StageProductionRow);

/// 數量四捨五入至小數 2 位
fn to_quantity(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(2)
}

/// 結果萃取器
pub struct ResultsExtractor<'a> {
    config: &'a PlanConfig,
    capacity: &'a CapacityProvider,
    decomposition: &'a Decomposition,
    planning: &'a PlanningModel,
}

impl<'a> ResultsExtractor<'a> {
    pub fn new(
        config: &'a PlanConfig,
        capacity: &'a CapacityProvider,
        decomposition: &'a Decomposition,
        planning: &'a PlanningModel,
    ) -> Self {
        Self {
            config,
            capacity,
            decomposition,
            planning,
        }
    }

    /// 將變數值轉為結構化生產計劃（不修改任何輸入，可重複呼叫）
    pub fn extract(&self, solution: &SolverSolution, elapsed_ms: u128) -> ProductionPlan {
        let values = &solution.values;
        let mut warnings = self.decomposition.warnings.clone();

        let mut keyed = self.stage_rows(values);
        let unmet_by_variant = self.reconcile(values, &mut keyed, &mut warnings);
        let flow_timing = self.flow_timing(&keyed, &unmet_by_variant);
        let production: Vec<StageProductionRow> = keyed.into_iter().map(|(_, row)| row).collect();
        let stock_deliveries: Vec<StockDeliveryRow> = self
            .decomposition
            .variants
            .iter()
            .filter_map(|v| self.stock_delivery(v))
            .collect();
        let resource_utilization = self.resource_utilization(values);
        let bottlenecks = Self::bottlenecks(&resource_utilization);
        let order_fulfillment = self.order_fulfillment(&flow_timing);

        // flow_timing 與變體一一對應（同順序）
        let unmet_demand: Vec<UnmetDemandRow> = flow_timing
            .iter()
            .zip(&self.decomposition.variants)
            .filter(|(row, _)| row.unmet > Decimal::ZERO)
            .map(|(row, variant)| UnmetDemandRow {
                part_code: row.part_code.clone(),
                variant: row.variant.clone(),
                due_week: row.due_week,
                net_demand: variant.net_demand,
                delivered: variant.net_demand - row.unmet,
                unmet: row.unmet,
            })
            .collect();

        let changeovers = self.changeovers(values);
        let total_demand = self.decomposition.total_gross_demand();
        let total_delivered: Decimal = flow_timing.iter().map(|r| r.delivered).sum();
        let total_unmet: Decimal = flow_timing.iter().map(|r| r.unmet).sum();
        let fulfillment_pct = if total_demand > Decimal::ZERO {
            to_f64(total_delivered) / to_f64(total_demand) * 100.0
        } else {
            100.0
        };

        let summary = SolveSummary {
            status: solution.status,
            objective: solution.objective,
            horizon_weeks: self.planning.horizon_weeks,
            variables: self.planning.model.num_columns(),
            constraints: self.planning.model.num_rows(),
            total_demand,
            total_delivered,
            total_unmet,
            fulfillment_pct,
            changeovers: changeovers.len(),
            elapsed_ms,
        };

        tracing::info!(
            "結果萃取完成：生產明細 {} 筆，交貨 {}，未滿足 {}，換模 {} 次",
            production.len(),
            total_delivered,
            total_unmet,
            changeovers.len()
        );

        ProductionPlan {
            weekly_summary: self.weekly_summary(&production),
            vacuum_utilization: self.vacuum_utilization(values),
            production,
            resource_utilization,
            changeovers,
            unmet_demand,
            flow_timing,
            wip_coverage: self.decomposition.wip_coverage(),
            stock_deliveries,
            order_fulfillment,
            bottlenecks,
            excluded_orders: self.decomposition.excluded.clone(),
            warnings,
            summary,
        }
    }

    fn value(values: &[f64], column: Option<ColumnId>) -> f64 {
        let value = column
            .and_then(|c| values.get(c.0).copied())
            .unwrap_or(0.0);
        if value < VALUE_EPSILON {
            0.0
        } else {
            value
        }
    }

    fn resource_for(&self, slot: &PartSlot, stage: Stage) -> Option<String> {
        slot.part
            .operation(stage)
            .map(|op| self.capacity.resolve_code(&op.resource))
    }

    /// 每件耗用分鐘（鑄造含真空折減）
    fn minutes_per_unit(&self, slot: &PartSlot, stage: Stage) -> f64 {
        match stage {
            Stage::Casting => slot
                .part
                .effective_casting_minutes(self.config.vacuum_capacity_penalty),
            Stage::Delivery => 0.0,
            other => slot.part.operation(other).map_or(0.0, |op| op.minutes_per_unit()),
        }
    }

    /// 九個工序的正數量明細
    fn stage_rows(&self, values: &[f64]) -> Vec<VariantRow> {
        let pool = &self.planning.pool;
        let mut rows = Vec::new();

        for slot in &self.planning.parts {
            for &v in &slot.variants {
                let variant = &self.decomposition.variants[v];
                for week in 1..=self.planning.horizon_weeks {
                    for stage in Stage::ALL {
                        let value = Self::value(values, pool.stage(v, week, stage));
                        if value <= 0.0 {
                            continue;
                        }
                        let quantity = to_quantity(value);
                        if quantity <= Decimal::ZERO {
                            continue;
                        }
                        rows.push((
                            v,
                            StageProductionRow {
                                stage,
                                part_code: slot.part.code.clone(),
                                variant: variant.label(),
                                due_week: variant.due_week(),
                                week,
                                quantity,
                                tonnage: to_f64(quantity) * slot.part.unit_tons(),
                                resource: self.resource_for(slot, stage),
                                vacuum: slot.part.requires_vacuum,
                            },
                        ));
                    }
                }
            }
        }

        rows
    }

    /// 校正需求平衡：未滿足 = 淨需求 − 交貨；交貨因四捨五入超出時修剪
    fn reconcile(
        &self,
        values: &[f64],
        production: &mut Vec<VariantRow>,
        warnings: &mut Vec<PlanWarning>,
    ) -> HashMap<usize, Decimal> {
        let mut unmet_by_variant = HashMap::new();

        // 變體 → 交貨列位置（週次遞增）
        let mut deliveries: HashMap<usize, Vec<usize>> = HashMap::new();
        for (pos, (v, row)) in production.iter().enumerate() {
            if row.stage == Stage::Delivery {
                deliveries.entry(*v).or_default().push(pos);
            }
        }

        for slot in &self.planning.parts {
            for &v in &slot.variants {
                let variant = &self.decomposition.variants[v];
                if variant.wip_only {
                    continue;
                }
                let label = variant.label();
                let net = variant.net_demand;
                let positions = deliveries.get(&v).map_or(&[][..], Vec::as_slice);

                let mut delivered: Decimal =
                    positions.iter().map(|&pos| production[pos].1.quantity).sum();

                if delivered > net {
                    let mut overage = delivered - net;
                    for &pos in positions.iter().rev() {
                        let row = &mut production[pos].1;
                        let cut = overage.min(row.quantity);
                        row.quantity -= cut;
                        row.tonnage = to_f64(row.quantity) * slot.part.unit_tons();
                        overage -= cut;
                        if overage <= Decimal::ZERO {
                            break;
                        }
                    }
                    tracing::warn!("{} 交貨 {} 超過淨需求 {}，已修剪", label, delivered, net);
                    warnings.push(PlanWarning::warning(
                        &slot.part.code,
                        format!("{} 交貨 {} 超過淨需求 {}，已修剪", label, delivered, net),
                    ));
                    delivered = net;
                }

                let solved_unmet = to_quantity(Self::value(values, self.planning.pool.unmet(v)));
                let unmet = net - delivered;
                if solved_unmet != unmet {
                    tracing::warn!(
                        "{} 需求平衡不一致（交貨 {} + 未滿足 {} ≠ {}），未滿足改為 {}",
                        label,
                        delivered,
                        solved_unmet,
                        net,
                        unmet
                    );
                    warnings.push(PlanWarning::warning(
                        &slot.part.code,
                        format!("{} 未滿足數量由 {} 校正為 {}", label, solved_unmet, unmet),
                    ));
                }
                unmet_by_variant.insert(v, unmet);
            }
        }

        // 修剪後可能出現零數量列
        production.retain(|(_, r)| r.quantity > Decimal::ZERO);

        unmet_by_variant
    }

    /// 庫存直接出貨（於到期週，超出排程範圍則於最後一週）
    fn stock_delivery(&self, variant: &DemandVariant) -> Option<StockDeliveryRow> {
        let quantity = variant.stock_covered();
        (quantity > Decimal::ZERO).then(|| StockDeliveryRow {
            part_code: variant.part_code().to_string(),
            variant: variant.label(),
            week: variant.due_week().min(self.planning.horizon_weeks),
            quantity,
        })
    }

    /// 變體流程時程（與 `Decomposition::variants` 同順序）
    fn flow_timing(
        &self,
        production: &[VariantRow],
        unmet_by_variant: &HashMap<usize, Decimal>,
    ) -> Vec<FlowTimingRow> {
        let mut by_variant: HashMap<usize, Vec<&StageProductionRow>> = HashMap::new();
        for (v, row) in production {
            by_variant.entry(*v).or_default().push(row);
        }

        self.decomposition
            .variants
            .iter()
            .enumerate()
            .map(|(idx, variant)| {
                let rows = by_variant.get(&idx).map_or(&[][..], Vec::as_slice);

                let first_casting_week = rows
                    .iter()
                    .filter(|r| r.stage == Stage::Casting)
                    .map(|r| r.week)
                    .min();
                let produced: Vec<&StageProductionRow> = rows
                    .iter()
                    .copied()
                    .filter(|r| r.stage == Stage::Delivery && r.quantity > Decimal::ZERO)
                    .collect();
                let stock_row = self.stock_delivery(variant);

                let last_delivery_week = produced
                    .iter()
                    .map(|r| r.week)
                    .chain(stock_row.as_ref().map(|s| s.week))
                    .max();
                let delivered = produced.iter().map(|r| r.quantity).sum::<Decimal>()
                    + stock_row.as_ref().map_or(Decimal::ZERO, |s| s.quantity);
                let unmet = unmet_by_variant.get(&idx).copied().unwrap_or(Decimal::ZERO);
                let weeks_late =
                    last_delivery_week.map_or(0, |w| w.saturating_sub(variant.due_week()));

                FlowTimingRow {
                    part_code: variant.part_code().to_string(),
                    variant: variant.label(),
                    due_week: variant.due_week(),
                    first_casting_week,
                    last_delivery_week,
                    delivered,
                    unmet,
                    on_time: unmet <= Decimal::ZERO && weeks_late == 0,
                    weeks_late,
                }
            })
            .collect()
    }

    /// 各資源每週耗用分鐘與使用率（鑄造線含換模時間）
    fn resource_utilization(&self, values: &[f64]) -> Vec<ResourceUtilization> {
        let pool = &self.planning.pool;
        let mut used: BTreeMap<(String, u32), f64> = BTreeMap::new();

        for (part_idx, slot) in self.planning.parts.iter().enumerate() {
            for week in 1..=self.planning.horizon_weeks {
                for stage in Stage::ALL {
                    if stage == Stage::Delivery {
                        continue;
                    }
                    let Some(resource) = self.resource_for(slot, stage) else {
                        continue;
                    };
                    let minutes = self.minutes_per_unit(slot, stage);
                    let quantity: f64 = slot
                        .variants
                        .iter()
                        .map(|&v| Self::value(values, pool.stage(v, week, stage)))
                        .sum();
                    let mut total = quantity * minutes;

                    if stage == Stage::Casting
                        && Self::value(values, pool.setup(part_idx, week)) > SETUP_THRESHOLD
                    {
                        total += self.config.setup_minutes;
                    }
                    if total > 0.0 {
                        *used.entry((resource, week)).or_insert(0.0) += total;
                    }
                }
            }
        }

        used.into_iter()
            .filter_map(|((resource, week), used_minutes)| {
                let capacity_minutes = self.capacity.machine_minutes(&resource)?;
                let utilization_pct = if capacity_minutes > 0.0 {
                    used_minutes / capacity_minutes * 100.0
                } else {
                    0.0
                };
                Some(ResourceUtilization {
                    resource,
                    week,
                    used_minutes,
                    capacity_minutes,
                    utilization_pct,
                })
            })
            .collect()
    }

    /// 每週各工序數量、工時與使用率
    fn weekly_summary(&self, production: &[StageProductionRow]) -> Vec<WeeklyStageSummary> {
        let slots: HashMap<&str, &PartSlot> = self
            .planning
            .parts
            .iter()
            .map(|s| (s.part.code.as_str(), s))
            .collect();

        // 各工序涉及的資源產能（去重）
        let mut stage_resources: BTreeMap<Stage, BTreeSet<String>> = BTreeMap::new();
        for slot in &self.planning.parts {
            for stage in Stage::ALL {
                if let Some(resource) = self.resource_for(slot, stage) {
                    stage_resources.entry(stage).or_default().insert(resource);
                }
            }
        }

        let mut rows = Vec::new();
        for week in 1..=self.planning.horizon_weeks {
            for stage in Stage::ALL {
                let mut units = Decimal::ZERO;
                let mut minutes = 0.0;
                for row in production.iter().filter(|r| r.week == week && r.stage == stage) {
                    units += row.quantity;
                    if let Some(slot) = slots.get(row.part_code.as_str()) {
                        minutes += to_f64(row.quantity) * self.minutes_per_unit(slot, stage);
                    }
                }

                let capacity_minutes: f64 = stage_resources
                    .get(&stage)
                    .map(|set| {
                        set.iter()
                            .filter_map(|r| self.capacity.machine_minutes(r))
                            .sum()
                    })
                    .unwrap_or(0.0);
                let utilization_pct = if capacity_minutes > 0.0 {
                    minutes / capacity_minutes * 100.0
                } else {
                    0.0
                };

                rows.push(WeeklyStageSummary {
                    week,
                    stage,
                    units,
                    hours: minutes / 60.0,
                    capacity_hours: capacity_minutes / 60.0,
                    utilization_pct,
                });
            }
        }
        rows
    }

    /// 佔線指示為 1 的換模紀錄
    fn changeovers(&self, values: &[f64]) -> Vec<ChangeoverRow> {
        let mut rows = Vec::new();
        for (part_idx, slot) in self.planning.parts.iter().enumerate() {
            for week in 1..=self.planning.horizon_weeks {
                if Self::value(values, self.planning.pool.setup(part_idx, week)) > SETUP_THRESHOLD {
                    rows.push(ChangeoverRow {
                        part_code: slot.part.code.clone(),
                        casting_line: self.capacity.resolve_code(slot.part.casting_line()),
                        week,
                        setup_minutes: self.config.setup_minutes,
                    });
                }
            }
        }
        rows
    }

    /// 鑄造線真空使用率
    fn vacuum_utilization(&self, values: &[f64]) -> Vec<VacuumUtilizationRow> {
        let pool = &self.planning.pool;
        let mut by_line: BTreeMap<(String, u32), (f64, f64)> = BTreeMap::new();

        for slot in &self.planning.parts {
            let line = self.capacity.resolve_code(slot.part.casting_line());
            let minutes = self.minutes_per_unit(slot, Stage::Casting);
            for week in 1..=self.planning.horizon_weeks {
                let quantity: f64 = slot
                    .variants
                    .iter()
                    .map(|&v| Self::value(values, pool.stage(v, week, Stage::Casting)))
                    .sum();
                if quantity <= 0.0 {
                    continue;
                }
                let entry = by_line.entry((line.clone(), week)).or_insert((0.0, 0.0));
                if slot.part.requires_vacuum {
                    entry.0 += quantity * minutes;
                }
                entry.1 += quantity * minutes;
            }
        }

        by_line
            .into_iter()
            .filter(|(_, (vacuum, _))| *vacuum > 0.0)
            .map(|((line, week), (vacuum_minutes, casting_minutes))| {
                let capacity = self.capacity.machine_minutes(&line).unwrap_or(0.0);
                VacuumUtilizationRow {
                    vacuum_utilization_pct: if capacity > 0.0 {
                        vacuum_minutes / capacity * 100.0
                    } else {
                        0.0
                    },
                    casting_line: line,
                    week,
                    vacuum_minutes,
                    casting_minutes,
                }
            })
            .collect()
    }

    /// 使用率達門檻的瓶頸資源（嚴重者在前）
    fn bottlenecks(utilization: &[ResourceUtilization]) -> Vec<BottleneckRow> {
        let mut rows: Vec<BottleneckRow> = utilization
            .iter()
            .filter_map(|u| {
                BottleneckSeverity::classify(u.utilization_pct).map(|severity| BottleneckRow {
                    resource: u.resource.clone(),
                    week: u.week,
                    utilization_pct: u.utilization_pct,
                    severity,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(b.utilization_pct.total_cmp(&a.utilization_pct))
        });
        rows
    }

    /// 訂單履行（變體交貨量依最早到期優先分配到訂單明細）
    fn order_fulfillment(&self, flow_timing: &[FlowTimingRow]) -> Vec<OrderFulfillmentRow> {
        let mut by_variant: BTreeMap<(String, u32), Vec<&OrderLine>> = BTreeMap::new();
        for scheduled in &self.decomposition.orders {
            by_variant
                .entry((scheduled.order.part_code.clone(), scheduled.due_week))
                .or_default()
                .push(&scheduled.order);
        }

        let timings: HashMap<(&str, u32), &FlowTimingRow> = flow_timing
            .iter()
            .map(|r| ((r.part_code.as_str(), r.due_week), r))
            .collect();

        let mut rows = Vec::new();
        for ((part_code, due_week), orders) in by_variant {
            let timing = timings.get(&(part_code.as_str(), due_week)).copied();
            let delivered = timing.map_or(Decimal::ZERO, |t| t.delivered);
            let last_delivery_week = timing.and_then(|t| t.last_delivery_week);

            for (order, allocated) in AllocationCalculator::allocate_to_orders(&orders, delivered) {
                let status = if allocated >= order.quantity {
                    if last_delivery_week.map_or(false, |w| w <= due_week) {
                        FulfillmentStatus::OnTime
                    } else {
                        FulfillmentStatus::Late
                    }
                } else if allocated > Decimal::ZERO {
                    FulfillmentStatus::Partial
                } else {
                    FulfillmentStatus::NotFulfilled
                };

                rows.push(OrderFulfillmentRow {
                    order_id: order.id,
                    customer: order.customer.clone(),
                    part_code: part_code.clone(),
                    due_week,
                    ordered: order.quantity,
                    delivered: allocated,
                    last_delivery_week,
                    status,
                });
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;
    use chrono::NaiveDate;
    use mps_calc::{DemandDecomposer, RoutingBuilder};
    use mps_core::plan::{BottleneckSeverity, FulfillmentStatus};
    use mps_core::{
        MachineRecord, MouldBoxRecord, OrderLine, PartMasterRecord, RoutingStepRecord,
        SolveStatus, WarningSeverity,
    };

    struct Fixture {
        config: PlanConfig,
        capacity: CapacityProvider,
        decomposition: Decomposition,
        planning: PlanningModel,
    }

    impl Fixture {
        fn new() -> Self {
            let start = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
            let config = PlanConfig::new(start)
                .with_efficiency(1.0)
                .with_working_days(1)
                .with_setup(5.0, 0.0);
            let record = PartMasterRecord::new("P1", "L1", 6.0)
                .with_unit_weight(200.0)
                .with_step(Stage::Mc1, RoutingStepRecord::new("MC-A", 3.0, 1.0));
            let machines = vec![
                MachineRecord::new("L1", "Casting", 10.0),
                MachineRecord::new("MC-A", "Machining", 10.0),
            ];
            let orders = vec![
                OrderLine::new("P1", Decimal::from(60), start + chrono::Duration::days(21))
                    .with_customer("A"),
                OrderLine::new("P1", Decimal::from(40), start + chrono::Duration::days(22))
                    .with_customer("B"),
            ];

            let catalog = RoutingBuilder::build(&[record], &config).unwrap();
            let capacity =
                CapacityProvider::build(&machines, &[] as &[MouldBoxRecord], &config).unwrap();
            let decomposition = DemandDecomposer::new(&config, &catalog)
                .decompose(orders, &[])
                .unwrap();
            let planning = ModelBuilder::new(&config, &catalog, &capacity, &decomposition)
                .build()
                .unwrap();

            Self {
                config,
                capacity,
                decomposition,
                planning,
            }
        }

        fn solution(&self, assignments: &[(Stage, u32, f64)], unmet: f64) -> SolverSolution {
            let pool = &self.planning.pool;
            let mut values = vec![0.0; self.planning.model.num_columns()];
            for &(stage, week, value) in assignments {
                let column = pool.stage(0, week, stage).unwrap();
                values[column.0] = value;
                if stage == Stage::Casting {
                    values[pool.setup(0, week).unwrap().0] = 1.0;
                }
            }
            values[pool.unmet(0).unwrap().0] = unmet;
            SolverSolution {
                status: SolveStatus::Optimal,
                objective: self.planning.model.objective_value(&values),
                values,
            }
        }

        fn extract(&self, solution: &SolverSolution) -> ProductionPlan {
            ResultsExtractor::new(&self.config, &self.capacity, &self.decomposition, &self.planning)
                .extract(solution, 0)
        }
    }

    #[test]
    fn test_extract_on_time_plan() {
        let fixture = Fixture::new();
        let solution = fixture.solution(
            &[
                (Stage::Casting, 1, 100.0),
                (Stage::Mc1, 2, 100.0),
                (Stage::Delivery, 4, 100.0),
            ],
            0.0,
        );

        let plan = fixture.extract(&solution);

        assert_eq!(plan.production.len(), 3);
        let casting = plan.stage_table(Stage::Casting);
        assert_eq!(casting[0].quantity, Decimal::from(100));
        assert_eq!(casting[0].resource.as_deref(), Some("L1"));
        assert!((casting[0].tonnage - 20.0).abs() < 1e-9);

        assert!(plan.unmet_demand.is_empty());
        assert_eq!(plan.flow_timing.len(), 1);
        let timing = &plan.flow_timing[0];
        assert_eq!(timing.first_casting_week, Some(1));
        assert_eq!(timing.last_delivery_week, Some(4));
        assert!(timing.on_time);

        assert_eq!(plan.changeovers.len(), 1);
        assert_eq!(plan.summary.total_delivered, Decimal::from(100));
        assert_eq!(plan.summary.fulfillment_pct, 100.0);

        // 600 分鐘鑄造 / 600 分鐘產能
        let line = plan
            .resource_utilization
            .iter()
            .find(|u| u.resource == "L1" && u.week == 1)
            .unwrap();
        assert!((line.utilization_pct - 100.0).abs() < 1e-9);
        assert_eq!(plan.bottlenecks[0].severity, BottleneckSeverity::Critical);

        assert_eq!(plan.order_fulfillment.len(), 2);
        assert!(plan
            .order_fulfillment
            .iter()
            .all(|o| o.status == FulfillmentStatus::OnTime && o.delivered == o.ordered));
    }

    #[test]
    fn test_extract_is_idempotent() {
        let fixture = Fixture::new();
        let solution = fixture.solution(
            &[
                (Stage::Casting, 1, 70.0),
                (Stage::Mc1, 2, 70.0),
                (Stage::Delivery, 5, 70.0),
            ],
            30.0,
        );

        let first = serde_json::to_value(fixture.extract(&solution).production).unwrap();
        let second = serde_json::to_value(fixture.extract(&solution).production).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_partial_and_late_fulfillment() {
        let fixture = Fixture::new();
        let solution = fixture.solution(
            &[
                (Stage::Casting, 1, 70.0),
                (Stage::Mc1, 2, 70.0),
                (Stage::Delivery, 5, 70.0),
            ],
            30.0,
        );

        let plan = fixture.extract(&solution);

        assert_eq!(plan.unmet_demand.len(), 1);
        assert_eq!(plan.unmet_demand[0].unmet, Decimal::from(30));
        assert_eq!(plan.flow_timing[0].weeks_late, 1);
        assert!(!plan.flow_timing[0].on_time);

        // 承諾交期較早的 A 先分配
        let a = plan.order_fulfillment.iter().find(|o| o.customer == "A").unwrap();
        let b = plan.order_fulfillment.iter().find(|o| o.customer == "B").unwrap();
        assert_eq!(a.delivered, Decimal::from(60));
        assert_eq!(a.status, FulfillmentStatus::Late);
        assert_eq!(b.delivered, Decimal::from(10));
        assert_eq!(b.status, FulfillmentStatus::Partial);
    }

    #[test]
    fn test_reconcile_trims_overdelivery_and_fixes_unmet() {
        let fixture = Fixture::new();
        let solution = fixture.solution(
            &[
                (Stage::Casting, 1, 100.0),
                (Stage::Mc1, 2, 100.0),
                (Stage::Delivery, 3, 80.0),
                (Stage::Delivery, 4, 30.0),
            ],
            5.0,
        );

        let plan = fixture.extract(&solution);

        let deliveries = plan.stage_table(Stage::Delivery);
        let total: Decimal = deliveries.iter().map(|r| r.quantity).sum();
        assert_eq!(total, Decimal::from(100));
        // 從最後一筆交貨修剪
        assert_eq!(deliveries[1].quantity, Decimal::from(20));
        assert!(plan.unmet_demand.is_empty());
        assert!(plan
            .warnings
            .iter()
            .any(|w| w.severity == WarningSeverity::Warning && w.message.contains("修剪")));
        assert!(plan.warnings.iter().any(|w| w.message.contains("校正")));
    }

    #[test]
    fn test_noise_values_dropped() {
        let fixture = Fixture::new();
        let solution = fixture.solution(
            &[
                (Stage::Casting, 1, 100.0),
                (Stage::Casting, 2, 0.0004),
                (Stage::Mc1, 2, 100.0),
                (Stage::Delivery, 4, 100.0),
            ],
            0.0,
        );

        let plan = fixture.extract(&solution);
        assert_eq!(plan.stage_table(Stage::Casting).len(), 1);
    }
}
