//! 約束建構
//!
//! 流量與工序先後約束皆以「第 1..w 週累計」的形式對每個 w 建立。
//! 零件層級的在製品由同零件所有變體共用，工序先後則在變體內部強制。

use mps_calc::LeadTimeCalculator;
use mps_core::{ConstraintClass, Stage};
use std::collections::BTreeMap;

use crate::builder::{to_f64, ModelContext, PartSlot};
use crate::model::{ColumnId, MilpModel};

/// 砂心產能在機台資料中的作業名稱
pub(crate) const CORE_OPERATION: &str = "core";

/// 鑄造之後的流程區段
#[derive(Debug, Clone, Copy)]
enum Segment {
    Grinding,
    Machining,
    Painting,
    Delivery,
}

impl Segment {
    const ORDER: [Segment; 4] = [
        Segment::Grinding,
        Segment::Machining,
        Segment::Painting,
        Segment::Delivery,
    ];
}

/// 零件層級流量守恆
///
/// 每個區段的第一道工序累計量 ≤ 前一區段出口的累計產出 + 兩者之間的在製品。
/// 區段被途程略過時，其出口檢查點的在製品併入下一個區段。鑄造產出依冷卻
/// 延遲週數往後推移。
pub(crate) fn add_flow_constraints(ctx: &ModelContext<'_>, model: &mut MilpModel) {
    for slot in ctx.parts {
        let part = &slot.part;
        let routing = &part.routing;
        let wip = ctx.decomposition.wip_of(&part.code);
        let residual_finished = to_f64(ctx.decomposition.residual_finished(&part.code));

        let mut prev_exit = Stage::Casting;
        let mut pending_wip = to_f64(wip.post_casting);

        for segment in Segment::ORDER {
            let (stages, wip_after) = match segment {
                Segment::Grinding => (
                    routing.grinding.then_some((Stage::Grinding, Stage::Grinding)),
                    to_f64(wip.post_grinding),
                ),
                Segment::Machining => (
                    routing.last_machining().map(|last| (Stage::Mc1, last)),
                    to_f64(wip.post_machining),
                ),
                Segment::Painting => (
                    routing.last_painting().map(|last| (Stage::Sp1, last)),
                    residual_finished,
                ),
                Segment::Delivery => (Some((Stage::Delivery, Stage::Delivery)), 0.0),
            };

            let Some((entry, exit)) = stages else {
                pending_wip += wip_after;
                continue;
            };

            let lag = if prev_exit == Stage::Casting {
                part.cooling_lag_weeks
            } else {
                0
            };

            for week in 1..=ctx.horizon_weeks {
                let mut terms = ctx.pool.cumulative_terms(&slot.variants, entry, week, 1.0);
                if terms.is_empty() {
                    continue;
                }
                let feed_through = LeadTimeCalculator::shift_back(week, lag).unwrap_or(0);
                terms.extend(ctx.pool.cumulative_terms(&slot.variants, prev_exit, feed_through, -1.0));
                model.add_le(ConstraintClass::FlowConservation, terms, pending_wip);
            }

            prev_exit = exit;
            pending_wip = wip_after;
        }
    }
}

/// 變體內部工序先後：MC2 ≤ MC1、MC3 ≤ MC2（或 MC1），塗裝同理
pub(crate) fn add_seriality_constraints(ctx: &ModelContext<'_>, model: &mut MilpModel) {
    const FOLLOWERS: [Stage; 4] = [Stage::Mc2, Stage::Mc3, Stage::Sp2, Stage::Sp3];

    for slot in ctx.parts {
        let routing = &slot.part.routing;
        for stage in FOLLOWERS {
            let Some(predecessor) = routing.predecessor(stage) else {
                continue;
            };
            for &v in &slot.variants {
                for week in 1..=ctx.horizon_weeks {
                    let mut terms = ctx.pool.cumulative_terms(&[v], stage, week, 1.0);
                    if terms.is_empty() {
                        continue;
                    }
                    terms.extend(ctx.pool.cumulative_terms(&[v], predecessor, week, -1.0));
                    model.add_le(ConstraintClass::StageSeriality, terms, 0.0);
                }
            }
        }
    }
}

/// 交期前置：累計交貨 ≤ 在製品合計 + 提前 L 週的累計鑄造
pub(crate) fn add_lead_time_constraints(ctx: &ModelContext<'_>, model: &mut MilpModel) {
    for slot in ctx.parts {
        let part = &slot.part;
        let wip = ctx.decomposition.wip_of(&part.code);
        let wip_total = to_f64(ctx.decomposition.residual_finished(&part.code))
            + to_f64(wip.post_machining)
            + to_f64(wip.post_grinding)
            + to_f64(wip.post_casting);

        for week in 1..=ctx.horizon_weeks {
            let mut terms = ctx.pool.cumulative_terms(&slot.variants, Stage::Delivery, week, 1.0);
            if terms.is_empty() {
                continue;
            }
            let cast_through =
                LeadTimeCalculator::shift_back(week, part.lead_time_weeks).unwrap_or(0);
            terms.extend(ctx.pool.cumulative_terms(&slot.variants, Stage::Casting, cast_through, -1.0));
            model.add_le(ConstraintClass::LeadTime, terms, wip_total);
        }
    }
}

/// 需求平衡：Σ 交貨 + 未滿足 = 淨需求（等式）
pub(crate) fn add_demand_balance(ctx: &ModelContext<'_>, model: &mut MilpModel) {
    for slot in ctx.parts {
        for &v in &slot.variants {
            let Some(unmet) = ctx.pool.unmet(v) else {
                continue;
            };
            let mut terms = ctx
                .pool
                .cumulative_terms(&[v], Stage::Delivery, ctx.horizon_weeks, 1.0);
            terms.push((unmet, 1.0));
            model.add_eq(ConstraintClass::DemandBalance, terms, to_f64(ctx.variant(v).net_demand));
        }
    }
}

/// 機台資源產能：每資源每週 Σ 數量 × 每件分鐘 ≤ 週可用分鐘
pub(crate) fn add_resource_capacity(ctx: &ModelContext<'_>, model: &mut MilpModel) {
    let mut by_resource: BTreeMap<(String, u32), Vec<(ColumnId, f64)>> = BTreeMap::new();

    for slot in ctx.parts {
        for stage in Stage::MACHINED {
            let Some(op) = slot.part.operation(stage) else {
                continue;
            };
            let resource = ctx.capacity.resolve_code(&op.resource);
            let minutes = op.minutes_per_unit();
            for week in 1..=ctx.horizon_weeks {
                let terms = ctx.pool.week_terms(&slot.variants, stage, week, minutes);
                if !terms.is_empty() {
                    by_resource
                        .entry((resource.clone(), week))
                        .or_default()
                        .extend(terms);
                }
            }
        }
    }

    for ((resource, _week), terms) in by_resource {
        if let Some(capacity) = ctx.capacity.machine_minutes(&resource) {
            model.add_le(ConstraintClass::ResourceCapacity, terms, capacity);
        }
    }
}

/// 鑄造線產能：Σ 鑄造量 × 有效週期（真空件折減）+ 換模分鐘 × Σ 佔線指示 ≤ 週可用分鐘
pub(crate) fn add_casting_line_capacity(ctx: &ModelContext<'_>, model: &mut MilpModel) {
    let mut by_line: BTreeMap<(String, u32), Vec<(ColumnId, f64)>> = BTreeMap::new();

    for (part_idx, slot) in ctx.parts.iter().enumerate() {
        let line = ctx.capacity.resolve_code(slot.part.casting_line());
        let minutes = slot.part.effective_casting_minutes(ctx.config.vacuum_capacity_penalty);
        for week in 1..=ctx.horizon_weeks {
            let mut terms = ctx.pool.week_terms(&slot.variants, Stage::Casting, week, minutes);
            if terms.is_empty() {
                continue;
            }
            if let Some(setup) = ctx.pool.setup(part_idx, week) {
                if ctx.config.setup_minutes > 0.0 {
                    terms.push((setup, ctx.config.setup_minutes));
                }
            }
            by_line.entry((line.clone(), week)).or_default().extend(terms);
        }
    }

    for ((line, _week), terms) in by_line {
        if let Some(capacity) = ctx.capacity.machine_minutes(&line) {
            model.add_le(ConstraintClass::CastingLine, terms, capacity);
        }
    }
}

/// 砂心產能：每週 Σ 鑄造量 × 每件砂心分鐘 ≤ 砂心作業週可用分鐘合計
///
/// 機台資料沒有砂心作業時不建立。
pub(crate) fn add_core_capacity(ctx: &ModelContext<'_>, model: &mut MilpModel) {
    let Some(capacity) = ctx
        .capacity
        .operation_minutes(CORE_OPERATION)
        .filter(|minutes| *minutes > 0.0)
    else {
        return;
    };

    for week in 1..=ctx.horizon_weeks {
        let terms: Vec<(ColumnId, f64)> = ctx
            .parts
            .iter()
            .filter(|slot| slot.part.core_minutes_per_unit > 0.0)
            .flat_map(|slot| {
                ctx.pool.week_terms(
                    &slot.variants,
                    Stage::Casting,
                    week,
                    slot.part.core_minutes_per_unit,
                )
            })
            .collect();
        model.add_le(ConstraintClass::CoreCapacity, terms, capacity);
    }
}

/// 換模連結：Σ 鑄造量 ≤ M × 佔線指示
///
/// M 取零件鑄造需求與鑄造線週產能可容納件數的較小值。
pub(crate) fn add_setup_links(ctx: &ModelContext<'_>, model: &mut MilpModel) {
    for (part_idx, slot) in ctx.parts.iter().enumerate() {
        let big_m = setup_big_m(ctx, slot);
        if big_m <= 0.0 {
            continue;
        }
        for week in 1..=ctx.horizon_weeks {
            let Some(setup) = ctx.pool.setup(part_idx, week) else {
                continue;
            };
            let mut terms = ctx.pool.week_terms(&slot.variants, Stage::Casting, week, 1.0);
            if terms.is_empty() {
                continue;
            }
            terms.push((setup, -big_m));
            model.add_le(ConstraintClass::SetupLink, terms, 0.0);
        }
    }
}

fn setup_big_m(ctx: &ModelContext<'_>, slot: &PartSlot) -> f64 {
    let demand: f64 = slot
        .variants
        .iter()
        .map(|&v| to_f64(ctx.variant(v).requirements.casting).ceil())
        .sum();
    let minutes = slot
        .part
        .effective_casting_minutes(ctx.config.vacuum_capacity_penalty);
    let line_units = ctx
        .capacity
        .machine_minutes(slot.part.casting_line())
        .filter(|_| minutes > 0.0)
        .map(|capacity| (capacity / minutes).floor())
        .unwrap_or(demand);
    demand.min(line_units)
}

/// 模箱產能：每尺寸每週 Σ 鑄造量 ÷ 每箱件數 ≤ 可用模數
pub(crate) fn add_mould_box_capacity(ctx: &ModelContext<'_>, model: &mut MilpModel) {
    let mut by_box: BTreeMap<(String, u32), Vec<(ColumnId, f64)>> = BTreeMap::new();

    for slot in ctx.parts {
        let Some(spec) = &slot.part.mould_box else {
            continue;
        };
        let moulds_per_unit = 1.0 / spec.units_per_box;
        for week in 1..=ctx.horizon_weeks {
            let terms = ctx
                .pool
                .week_terms(&slot.variants, Stage::Casting, week, moulds_per_unit);
            if !terms.is_empty() {
                by_box.entry((spec.size.clone(), week)).or_default().extend(terms);
            }
        }
    }

    for ((size, _week), terms) in by_box {
        if let Some(usable) = ctx.capacity.usable_mould_boxes(&size) {
            model.add_le(ConstraintClass::MouldBox, terms, usable);
        }
    }
}

/// 熔解噸位：每週 Σ 鑄造量 × 單件噸數 ≤ 上限（含加班）
pub(crate) fn add_melt_tonnage(ctx: &ModelContext<'_>, model: &mut MilpModel) {
    let Some(tons) = ctx.config.casting_tons_per_week else {
        return;
    };
    let limit = tons * ctx.config.capacity_multiplier();

    for week in 1..=ctx.horizon_weeks {
        let terms: Vec<(ColumnId, f64)> = ctx
            .parts
            .iter()
            .filter(|slot| slot.part.unit_weight_kg > 0.0)
            .flat_map(|slot| {
                ctx.pool
                    .week_terms(&slot.variants, Stage::Casting, week, slot.part.unit_tons())
            })
            .collect();
        model.add_le(ConstraintClass::MeltTonnage, terms, limit);
    }
}
