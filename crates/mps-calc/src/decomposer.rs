//! 需求分解器

use mps_core::{
    normalize_code, DeliveryWindow, DemandVariant, ExcludedOrder, OrderLine, PlanConfig,
    PlanWarning, PlanningCalendar, Result, VariantKey, WipSnapshot,
};
use mps_core::plan::WipCoverageRow;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::allocation::AllocationCalculator;
use crate::bucketing::{BucketingCalculator, ScheduledOrder};
use crate::netting::{NettingCalculator, PartRequirement};
use crate::routing::PartCatalog;

/// 需求分解結果
#[derive(Debug, Clone)]
pub struct Decomposition {
    /// 排程週曆
    pub calendar: PlanningCalendar,

    /// 需求變體（依零件、到期週排序）
    pub variants: Vec<DemandVariant>,

    /// 零件層級需求表
    pub part_requirements: BTreeMap<String, PartRequirement>,

    /// 在製品快照（正規化、同零件合併）
    pub wip: BTreeMap<String, WipSnapshot>,

    /// 有效訂單（已對應週次）
    pub orders: Vec<ScheduledOrder>,

    /// 被排除的訂單
    pub excluded: Vec<ExcludedOrder>,

    /// 警告
    pub warnings: Vec<PlanWarning>,
}

impl Decomposition {
    /// 零件的在製品快照（無資料時為空快照）
    pub fn wip_of(&self, part_code: &str) -> WipSnapshot {
        self.wip
            .get(part_code)
            .cloned()
            .unwrap_or_else(|| WipSnapshot::new(part_code))
    }

    /// 分配後剩餘的成品 + 塗裝後庫存
    pub fn residual_finished(&self, part_code: &str) -> Decimal {
        match self.part_requirements.get(part_code) {
            Some(req) => req.residual_finished(&self.wip_of(part_code)),
            None => {
                let wip = self.wip_of(part_code);
                wip.finished_goods + wip.post_paint
            }
        }
    }

    /// 淨需求合計
    pub fn total_net_demand(&self) -> Decimal {
        self.variants.iter().map(|v| v.net_demand).sum()
    }

    /// 毛需求合計
    pub fn total_gross_demand(&self) -> Decimal {
        self.variants.iter().map(|v| v.gross_demand).sum()
    }

    /// 在製品使用量表
    pub fn wip_coverage(&self) -> Vec<WipCoverageRow> {
        self.part_requirements
            .values()
            .map(|req| WipCoverageRow {
                part_code: req.part_code.clone(),
                finished_goods_used: req.finished_goods_used,
                post_paint_used: req.post_paint_used,
                post_machining_used: req.post_machining_used,
                post_grinding_used: req.post_grinding_used,
                post_casting_used: req.post_casting_used,
            })
            .collect()
    }
}

/// 需求分解器
pub struct DemandDecomposer<'a> {
    /// 排程配置
    config: &'a PlanConfig,

    /// 零件目錄
    catalog: &'a PartCatalog,
}

impl<'a> DemandDecomposer<'a> {
    /// 創建新的需求分解器
    pub fn new(config: &'a PlanConfig, catalog: &'a PartCatalog) -> Self {
        Self { config, catalog }
    }

    /// 將訂單分解為扣除在製品後的週需求變體
    pub fn decompose(&self, orders: Vec<OrderLine>, wip: &[WipSnapshot]) -> Result<Decomposition> {
        tracing::info!(
            "開始需求分解：訂單 {} 筆，在製品 {} 筆",
            orders.len(),
            wip.len()
        );
        let mut warnings = Vec::new();

        // Step 1: 驗證訂單（零件不存在者排除）
        tracing::debug!("Step 1: 驗證訂單");
        let (valid, excluded) = self.validate_orders(orders, &mut warnings);

        // Step 2: 週次分桶與排程週數
        tracing::debug!("Step 2: 週次分桶");
        let (calendar, scheduled) = BucketingCalculator::assign_weeks(valid, self.config);
        let grouped = BucketingCalculator::aggregate(&scheduled);

        // Step 3: 整理在製品快照
        tracing::debug!("Step 3: 整理在製品");
        let wip_map = self.collect_wip(wip, &grouped, &mut warnings)?;

        // Step 4: 逐零件淨需求計算並分配到變體
        tracing::debug!("Step 4: 淨需求與變體分配");
        let mut variants = Vec::new();
        let mut part_requirements = BTreeMap::new();

        for (part_code, weeks) in &grouped {
            let gross: Decimal = weeks.values().copied().sum();
            let snapshot = wip_map
                .get(part_code)
                .cloned()
                .unwrap_or_else(|| WipSnapshot::new(part_code));
            let requirement = NettingCalculator::net_part(part_code, gross, &snapshot);
            if !NettingCalculator::needs_production(&requirement) {
                tracing::debug!("零件 {} 毛需求 {} 全數由庫存滿足，不需生產", part_code, gross);
            }

            let gross_by_week: Vec<(u32, Decimal)> =
                weeks.iter().map(|(w, q)| (*w, *q)).collect();
            let shares = AllocationCalculator::split_by_due_week(&gross_by_week, &requirement);
            let lead_time = self
                .catalog
                .get(part_code)
                .map_or(self.config.min_lead_time_weeks, |p| p.lead_time_weeks);

            for ((due_week, gross), share) in gross_by_week.iter().zip(shares) {
                let window = DeliveryWindow::around(
                    *due_week,
                    self.config.delivery_buffer_weeks,
                    calendar.horizon_weeks,
                );
                let variant = DemandVariant {
                    key: VariantKey::new(part_code, *due_week),
                    gross_demand: *gross,
                    net_demand: share.net,
                    requirements: share.requirements,
                    window,
                    wip_only: share.net <= Decimal::ZERO,
                };

                if variant.net_demand > Decimal::ZERO {
                    if window.is_empty() {
                        warnings.push(PlanWarning::warning(
                            part_code,
                            format!(
                                "{} 到期週 {} 超出排程範圍 {} 週，淨需求 {} 將列為未滿足",
                                variant.label(),
                                due_week,
                                calendar.horizon_weeks,
                                variant.net_demand
                            ),
                        ));
                    } else if NettingCalculator::producible_weeks(lead_time, *due_week, self.config)
                        == 0
                        && variant.requirements.casting > Decimal::ZERO
                    {
                        warnings.push(PlanWarning::info(
                            part_code,
                            format!(
                                "{} 交期早於前置 {} 週，新鑄造無法及時交貨",
                                variant.label(),
                                lead_time
                            ),
                        ));
                    }
                }

                variants.push(variant);
            }

            tracing::debug!(
                "零件 {}：毛需求 {}，淨需求 {}，鑄造需求 {}",
                part_code,
                requirement.gross,
                requirement.net,
                requirement.requirements.casting
            );
            part_requirements.insert(part_code.clone(), requirement);
        }

        let decomposition = Decomposition {
            calendar,
            variants,
            part_requirements,
            wip: wip_map,
            orders: scheduled,
            excluded,
            warnings,
        };

        tracing::info!(
            "需求分解完成：變體 {} 個，毛需求 {}，淨需求 {}，排除訂單 {} 組",
            decomposition.variants.len(),
            decomposition.total_gross_demand(),
            decomposition.total_net_demand(),
            decomposition.excluded.len()
        );

        Ok(decomposition)
    }

    /// 驗證訂單：正規化零件代碼，排除主檔不存在的零件與非正數量
    fn validate_orders(
        &self,
        orders: Vec<OrderLine>,
        warnings: &mut Vec<PlanWarning>,
    ) -> (Vec<OrderLine>, Vec<ExcludedOrder>) {
        let mut valid = Vec::with_capacity(orders.len());
        let mut excluded: BTreeMap<String, ExcludedOrder> = BTreeMap::new();

        for mut order in orders {
            order.part_code = normalize_code(&order.part_code);

            if order.quantity <= Decimal::ZERO {
                warnings.push(PlanWarning::info(
                    &order.part_code,
                    format!("訂單 {} 數量 {} 非正數，略過", order.id, order.quantity),
                ));
                continue;
            }

            if !self.catalog.contains(&order.part_code) {
                let entry = excluded
                    .entry(order.part_code.clone())
                    .or_insert_with(|| ExcludedOrder {
                        part_code: order.part_code.clone(),
                        order_lines: 0,
                        total_quantity: Decimal::ZERO,
                        reason: "零件不在主檔中".to_string(),
                    });
                entry.order_lines += 1;
                entry.total_quantity += order.quantity;
                continue;
            }

            valid.push(order);
        }

        for record in excluded.values() {
            tracing::warn!(
                "排除零件 {}：訂單 {} 筆，數量 {}（{}）",
                record.part_code,
                record.order_lines,
                record.total_quantity,
                record.reason
            );
            warnings.push(PlanWarning::warning(
                &record.part_code,
                format!(
                    "零件不在主檔中，排除訂單 {} 筆共 {} 件",
                    record.order_lines, record.total_quantity
                ),
            ));
        }

        (valid, excluded.into_values().collect())
    }

    /// 正規化並合併在製品快照
    fn collect_wip(
        &self,
        wip: &[WipSnapshot],
        grouped: &BTreeMap<String, BTreeMap<u32, Decimal>>,
        warnings: &mut Vec<PlanWarning>,
    ) -> Result<BTreeMap<String, WipSnapshot>> {
        let mut merged: BTreeMap<String, WipSnapshot> = BTreeMap::new();

        for snapshot in wip {
            snapshot.validate()?;
            let code = normalize_code(&snapshot.part_code);

            if !self.catalog.contains(&code) {
                warnings.push(PlanWarning::info(
                    &code,
                    "在製品零件不在主檔中，忽略".to_string(),
                ));
                continue;
            }

            merged
                .entry(code.clone())
                .or_insert_with(|| WipSnapshot::new(&code))
                .merge(snapshot);
        }

        for (code, snapshot) in &merged {
            if !grouped.contains_key(code) && snapshot.total() > Decimal::ZERO {
                warnings.push(PlanWarning::info(
                    code,
                    format!("在製品 {} 件無對應訂單", snapshot.total()),
                ));
            }
        }

        Ok(merged)
    }
}
