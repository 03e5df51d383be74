//! 在製品與交貨分配（最早到期優先）

use mps_core::{OrderLine, StageRequirements};
use rust_decimal::Decimal;

use crate::netting::PartRequirement;

/// 單一變體分配到的需求
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariantShare {
    /// 由成品 + 塗裝後庫存出貨的數量
    pub stock_covered: Decimal,
    /// 淨需求
    pub net: Decimal,
    /// 各工序新投入需求量
    pub requirements: StageRequirements,
}

/// 最早到期優先的數量池
struct Pool(Decimal);

impl Pool {
    /// 從池中取用最多 `want`，回傳實際取用量
    fn take(&mut self, want: Decimal) -> Decimal {
        let used = self.0.min(want).max(Decimal::ZERO);
        self.0 -= used;
        used
    }
}

/// 分配計算器
pub struct AllocationCalculator;

impl AllocationCalculator {
    /// 將零件層級的在製品使用量依到期週分配到各變體
    ///
    /// `gross_by_week` 需已依到期週由早到晚排序。各檢查點的使用量依序
    /// 抵減最早到期的變體，因此各變體的工序需求加總必等於零件層級結果。
    pub fn split_by_due_week(
        gross_by_week: &[(u32, Decimal)],
        requirement: &PartRequirement,
    ) -> Vec<VariantShare> {
        let mut stock = Pool(requirement.stock_covered());
        let mut post_machining = Pool(requirement.post_machining_used);
        let mut post_grinding = Pool(requirement.post_grinding_used);
        let mut post_casting = Pool(requirement.post_casting_used);

        gross_by_week
            .iter()
            .map(|(_, gross)| {
                let stock_covered = stock.take(*gross);
                let net = *gross - stock_covered;
                let painting = net;
                let machining = painting - post_machining.take(painting);
                let grinding = machining - post_grinding.take(machining);
                let casting = grinding - post_casting.take(grinding);

                VariantShare {
                    stock_covered,
                    net,
                    requirements: StageRequirements {
                        painting,
                        machining,
                        grinding,
                        casting,
                    },
                }
            })
            .collect()
    }

    /// 將變體的交貨總量依最早到期優先分配到訂單明細
    ///
    /// 同週訂單依承諾交期排序，相同時保留輸入順序。
    pub fn allocate_to_orders<'a>(
        orders: &[&'a OrderLine],
        delivered: Decimal,
    ) -> Vec<(&'a OrderLine, Decimal)> {
        let mut sorted: Vec<(usize, &'a OrderLine)> = orders.iter().copied().enumerate().collect();
        sorted.sort_by(|(ia, a), (ib, b)| a.committed_date.cmp(&b.committed_date).then(ia.cmp(ib)));

        let mut remaining = Pool(delivered);
        sorted
            .into_iter()
            .map(|(_, order)| (order, remaining.take(order.quantity)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netting::NettingCalculator;
    use chrono::NaiveDate;
    use mps_core::{Checkpoint, WipSnapshot};

    fn d(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn test_earliest_due_consumes_wip_first() {
        let wip = WipSnapshot::new("P1")
            .with(Checkpoint::FinishedGoods, d(50))
            .with(Checkpoint::PostMachining, d(40))
            .with(Checkpoint::PostCasting, d(10));
        let weeks = vec![(2, d(30)), (4, d(60)), (6, d(40))];
        let requirement = NettingCalculator::net_part("P1", d(130), &wip);

        let shares = AllocationCalculator::split_by_due_week(&weeks, &requirement);

        // 第 2 週：30 全由成品出貨
        assert_eq!(shares[0].stock_covered, d(30));
        assert_eq!(shares[0].net, d(0));
        // 第 4 週：成品剩 20，淨需求 40，加工後在製品 40 全部跳過
        assert_eq!(shares[1].stock_covered, d(20));
        assert_eq!(shares[1].net, d(40));
        assert_eq!(shares[1].requirements.machining, d(0));
        // 第 6 週：需完整生產，鑄造後在製品跳過 10
        assert_eq!(shares[2].requirements.machining, d(40));
        assert_eq!(shares[2].requirements.casting, d(30));

        let mut total = StageRequirements::default();
        for share in &shares {
            total.add(&share.requirements);
        }
        assert_eq!(total, requirement.requirements);
    }

    #[test]
    fn test_allocate_to_orders_by_committed_date() {
        let week = NaiveDate::from_ymd_opt(2025, 10, 15).unwrap();
        let late = OrderLine::new("P1", d(40), week.succ_opt().unwrap()).with_customer("B");
        let early = OrderLine::new("P1", d(30), week).with_customer("A");
        let orders = vec![&late, &early];

        let allocation = AllocationCalculator::allocate_to_orders(&orders, d(50));

        assert_eq!(allocation[0].0.customer, "A");
        assert_eq!(allocation[0].1, d(30));
        assert_eq!(allocation[1].0.customer, "B");
        assert_eq!(allocation[1].1, d(20));
    }
}
