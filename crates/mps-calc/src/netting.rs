//! 在製品淨需求計算（跳站邏輯）

use mps_core::{PlanConfig, StageRequirements, WipSnapshot};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 單一零件的淨需求計算結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartRequirement {
    /// 零件代碼
    pub part_code: String,

    /// 毛需求
    pub gross: Decimal,

    /// 使用的成品庫存
    pub finished_goods_used: Decimal,

    /// 使用的塗裝後庫存
    pub post_paint_used: Decimal,

    /// 淨需求（仍需交貨的生產量）
    pub net: Decimal,

    /// 加工後在製品跳過的數量
    pub post_machining_used: Decimal,

    /// 研磨後在製品跳過的數量
    pub post_grinding_used: Decimal,

    /// 鑄造後在製品跳過的數量
    pub post_casting_used: Decimal,

    /// 各工序新投入需求量
    pub requirements: StageRequirements,
}

impl PartRequirement {
    /// 由庫存直接出貨的數量
    pub fn stock_covered(&self) -> Decimal {
        self.finished_goods_used + self.post_paint_used
    }

    /// 分配後剩餘的成品 + 塗裝後庫存
    pub fn residual_finished(&self, wip: &WipSnapshot) -> Decimal {
        (wip.finished_goods + wip.post_paint - self.stock_covered()).max(Decimal::ZERO)
    }
}

/// 淨需求計算器
pub struct NettingCalculator;

impl NettingCalculator {
    /// 計算單一零件的各工序需求
    ///
    /// 先以成品、再以塗裝後庫存抵減交貨量；其後逐站往上游走，
    /// 每個檢查點的在製品讓同數量跳過該工序：
    /// `工序需求 = max(0, 下游需求 − 檢查點在製品)`。
    pub fn net_part(part_code: &str, gross: Decimal, wip: &WipSnapshot) -> PartRequirement {
        let gross = gross.max(Decimal::ZERO);

        let finished_goods_used = wip.finished_goods.max(Decimal::ZERO).min(gross);
        let after_fg = gross - finished_goods_used;
        let post_paint_used = wip.post_paint.max(Decimal::ZERO).min(after_fg);
        let net = after_fg - post_paint_used;

        let painting = net;
        let post_machining_used = wip.post_machining.max(Decimal::ZERO).min(painting);
        let machining = painting - post_machining_used;
        let post_grinding_used = wip.post_grinding.max(Decimal::ZERO).min(machining);
        let grinding = machining - post_grinding_used;
        let post_casting_used = wip.post_casting.max(Decimal::ZERO).min(grinding);
        let casting = grinding - post_casting_used;

        PartRequirement {
            part_code: part_code.to_string(),
            gross,
            finished_goods_used,
            post_paint_used,
            net,
            post_machining_used,
            post_grinding_used,
            post_casting_used,
            requirements: StageRequirements {
                painting,
                machining,
                grinding,
                casting,
            },
        }
    }

    /// 淨需求計算結果是否需要生產
    pub fn needs_production(requirement: &PartRequirement) -> bool {
        requirement.net > Decimal::ZERO
    }

    /// 零件在排程範圍內的最大可產週數（供診斷訊息使用）
    pub fn producible_weeks(lead_time_weeks: u32, due_week: u32, config: &PlanConfig) -> u32 {
        (due_week + config.delivery_buffer_weeks).saturating_sub(lead_time_weeks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mps_core::Checkpoint;

    #[test]
    fn test_netting_without_wip() {
        let req = NettingCalculator::net_part("P1", Decimal::from(250), &WipSnapshot::new("P1"));

        assert_eq!(req.net, Decimal::from(250));
        assert_eq!(req.requirements.casting, Decimal::from(250));
        assert_eq!(req.requirements.painting, Decimal::from(250));
        assert!(NettingCalculator::needs_production(&req));
    }

    #[test]
    fn test_netting_skip_ahead() {
        let wip = WipSnapshot::new("P1")
            .with(Checkpoint::FinishedGoods, Decimal::from(10))
            .with(Checkpoint::PostPaint, Decimal::from(20))
            .with(Checkpoint::PostMachining, Decimal::from(30))
            .with(Checkpoint::PostGrinding, Decimal::from(15))
            .with(Checkpoint::PostCasting, Decimal::from(5));

        let req = NettingCalculator::net_part("P1", Decimal::from(100), &wip);

        assert_eq!(req.stock_covered(), Decimal::from(30));
        assert_eq!(req.net, Decimal::from(70));
        assert_eq!(req.requirements.painting, Decimal::from(70));
        assert_eq!(req.requirements.machining, Decimal::from(40));
        assert_eq!(req.requirements.grinding, Decimal::from(25));
        assert_eq!(req.requirements.casting, Decimal::from(20));
        assert_eq!(req.residual_finished(&wip), Decimal::ZERO);
    }

    #[test]
    fn test_netting_wip_exceeds_demand() {
        let wip = WipSnapshot::new("P2")
            .with(Checkpoint::FinishedGoods, Decimal::from(30))
            .with(Checkpoint::PostPaint, Decimal::from(50))
            .with(Checkpoint::PostCasting, Decimal::from(100));

        let req = NettingCalculator::net_part("P2", Decimal::from(60), &wip);

        assert_eq!(req.finished_goods_used, Decimal::from(30));
        assert_eq!(req.post_paint_used, Decimal::from(30));
        assert_eq!(req.net, Decimal::ZERO);
        assert_eq!(req.post_casting_used, Decimal::ZERO);
        assert_eq!(req.requirements, StageRequirements::default());
        assert_eq!(req.residual_finished(&wip), Decimal::from(20));
        assert!(!NettingCalculator::needs_production(&req));
    }

    #[test]
    fn test_producible_weeks() {
        let config = PlanConfig::default();
        assert_eq!(NettingCalculator::producible_weeks(2, 1, &config), 0);
        assert_eq!(NettingCalculator::producible_weeks(3, 6, &config), 4);
    }
}
