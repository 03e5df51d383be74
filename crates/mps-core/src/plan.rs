//! 生產計劃輸出模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ExcludedOrder, Stage};

/// 求解狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// 證明最佳
    Optimal,
    /// 時間上限內的最佳可行解（不保證最佳）
    TimeLimited,
}

impl SolveStatus {
    pub fn is_optimal(&self) -> bool {
        *self == SolveStatus::Optimal
    }
}

/// 警告嚴重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningSeverity {
    Info,
    Warning,
    Error,
}

/// 排程警告（不中斷計算，但必須回報給呼叫端）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanWarning {
    /// 相關零件（或資源）代碼
    pub subject: String,
    pub message: String,
    pub severity: WarningSeverity,
}

impl PlanWarning {
    pub fn new(subject: &str, message: String, severity: WarningSeverity) -> Self {
        Self {
            subject: subject.to_string(),
            message,
            severity,
        }
    }

    pub fn info(subject: &str, message: String) -> Self {
        Self::new(subject, message, WarningSeverity::Info)
    }

    pub fn warning(subject: &str, message: String) -> Self {
        Self::new(subject, message, WarningSeverity::Warning)
    }
}

/// 工序生產明細（單一變體、單一週、單一工序）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageProductionRow {
    pub stage: Stage,
    pub part_code: String,
    /// 變體標籤，如 `P1_W6`
    pub variant: String,
    pub due_week: u32,
    pub week: u32,
    /// 數量（四捨五入至小數 2 位）
    pub quantity: Decimal,
    /// 噸數
    pub tonnage: f64,
    /// 使用資源（交貨為 None）
    pub resource: Option<String>,
    /// 是否為真空件
    pub vacuum: bool,
}

/// 每週工序彙總
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStageSummary {
    pub week: u32,
    pub stage: Stage,
    pub units: Decimal,
    /// 耗用工時
    pub hours: f64,
    /// 相關資源週產能工時合計
    pub capacity_hours: f64,
    /// 使用率（%）
    pub utilization_pct: f64,
}

/// 資源每週使用率
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceUtilization {
    pub resource: String,
    pub week: u32,
    /// 耗用分鐘（鑄造線含換模時間）
    pub used_minutes: f64,
    pub capacity_minutes: f64,
    pub utilization_pct: f64,
}

/// 換模紀錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeoverRow {
    pub part_code: String,
    pub casting_line: String,
    pub week: u32,
    pub setup_minutes: f64,
}

/// 未滿足需求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmetDemandRow {
    pub part_code: String,
    pub variant: String,
    pub due_week: u32,
    pub net_demand: Decimal,
    pub delivered: Decimal,
    pub unmet: Decimal,
}

/// 變體流程時程
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowTimingRow {
    pub part_code: String,
    pub variant: String,
    pub due_week: u32,
    /// 第一次鑄造週
    pub first_casting_week: Option<u32>,
    /// 最後交貨週（含庫存出貨）
    pub last_delivery_week: Option<u32>,
    /// 交貨數量（含庫存出貨）
    pub delivered: Decimal,
    pub unmet: Decimal,
    pub on_time: bool,
    pub weeks_late: u32,
}

/// 需求分解的在製品使用量
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WipCoverageRow {
    pub part_code: String,
    pub finished_goods_used: Decimal,
    pub post_paint_used: Decimal,
    pub post_machining_used: Decimal,
    pub post_grinding_used: Decimal,
    pub post_casting_used: Decimal,
}

/// 庫存直接出貨
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockDeliveryRow {
    pub part_code: String,
    pub variant: String,
    pub week: u32,
    pub quantity: Decimal,
}

/// 鑄造線真空使用率
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VacuumUtilizationRow {
    pub casting_line: String,
    pub week: u32,
    /// 真空件有效耗用分鐘
    pub vacuum_minutes: f64,
    /// 全部鑄造耗用分鐘（不含換模）
    pub casting_minutes: f64,
    /// 真空件佔鑄造線產能比例（%）
    pub vacuum_utilization_pct: f64,
}

/// 訂單履行狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FulfillmentStatus {
    OnTime,
    Late,
    Partial,
    NotFulfilled,
}

/// 訂單履行明細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFulfillmentRow {
    pub order_id: Uuid,
    pub customer: String,
    pub part_code: String,
    pub due_week: u32,
    pub ordered: Decimal,
    pub delivered: Decimal,
    pub last_delivery_week: Option<u32>,
    pub status: FulfillmentStatus,
}

/// 瓶頸等級
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BottleneckSeverity {
    Medium,
    High,
    Critical,
}

impl BottleneckSeverity {
    /// 依使用率判定（≥100 Critical、≥95 High、≥85 Medium）
    pub fn classify(utilization_pct: f64) -> Option<Self> {
        if utilization_pct >= 100.0 {
            Some(BottleneckSeverity::Critical)
        } else if utilization_pct >= 95.0 {
            Some(BottleneckSeverity::High)
        } else if utilization_pct >= 85.0 {
            Some(BottleneckSeverity::Medium)
        } else {
            None
        }
    }
}

/// 瓶頸資源
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckRow {
    pub resource: String,
    pub week: u32,
    pub utilization_pct: f64,
    pub severity: BottleneckSeverity,
}

/// 求解摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveSummary {
    pub status: SolveStatus,
    pub objective: f64,
    pub horizon_weeks: u32,
    pub variables: usize,
    pub constraints: usize,
    pub total_demand: Decimal,
    pub total_delivered: Decimal,
    pub total_unmet: Decimal,
    /// 需求滿足率（%）
    pub fulfillment_pct: f64,
    /// 換模次數
    pub changeovers: usize,
    /// 計算耗時（毫秒）
    pub elapsed_ms: u128,
}

/// 生產計劃（交給報表端的結構化結果）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionPlan {
    /// 九個工序的生產明細（只含正數量）
    pub production: Vec<StageProductionRow>,
    pub weekly_summary: Vec<WeeklyStageSummary>,
    pub resource_utilization: Vec<ResourceUtilization>,
    pub changeovers: Vec<ChangeoverRow>,
    pub unmet_demand: Vec<UnmetDemandRow>,
    pub flow_timing: Vec<FlowTimingRow>,
    pub wip_coverage: Vec<WipCoverageRow>,
    pub stock_deliveries: Vec<StockDeliveryRow>,
    pub vacuum_utilization: Vec<VacuumUtilizationRow>,
    pub order_fulfillment: Vec<OrderFulfillmentRow>,
    pub bottlenecks: Vec<BottleneckRow>,
    pub excluded_orders: Vec<ExcludedOrder>,
    pub warnings: Vec<PlanWarning>,
    pub summary: SolveSummary,
}

impl ProductionPlan {
    /// 單一工序的生產明細表
    pub fn stage_table(&self, stage: Stage) -> Vec<&StageProductionRow> {
        self.production.iter().filter(|r| r.stage == stage).collect()
    }

    /// 指定零件在指定工序的累計數量（週 1..=week）
    pub fn cumulative(&self, part_code: &str, stage: Stage, week: u32) -> Decimal {
        self.production
            .iter()
            .filter(|r| r.stage == stage && r.part_code == part_code && r.week <= week)
            .map(|r| r.quantity)
            .sum()
    }

    /// 是否保證最佳
    pub fn is_optimal(&self) -> bool {
        self.summary.status.is_optimal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(120.0, Some(BottleneckSeverity::Critical))]
    #[case(100.0, Some(BottleneckSeverity::Critical))]
    #[case(96.0, Some(BottleneckSeverity::High))]
    #[case(85.0, Some(BottleneckSeverity::Medium))]
    #[case(60.0, None)]
    fn test_bottleneck_classify(#[case] pct: f64, #[case] expected: Option<BottleneckSeverity>) {
        assert_eq!(BottleneckSeverity::classify(pct), expected);
    }

    #[test]
    fn test_warning_constructors() {
        let w = PlanWarning::warning("P1", "測試".to_string());
        assert_eq!(w.severity, WarningSeverity::Warning);
        assert_eq!(PlanWarning::info("P1", String::new()).severity, WarningSeverity::Info);
        let e = PlanWarning::new("P1", String::new(), WarningSeverity::Error);
        assert_eq!(e.severity, WarningSeverity::Error);
    }
}
