//! 週次分桶

use chrono::Duration;
use mps_core::{OrderLine, PlanConfig, PlanningCalendar};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// 已對應到週次的訂單明細
#[derive(Debug, Clone)]
pub struct ScheduledOrder {
    /// 訂單明細（零件代碼已正規化）
    pub order: OrderLine,
    /// 到期週
    pub due_week: u32,
}

/// 週次分桶計算器
pub struct BucketingCalculator;

impl BucketingCalculator {
    /// 將訂單對應到週次並決定排程週數
    ///
    /// 未填承諾交期的訂單以起始日加上預設偏移週數為交期。
    pub fn assign_weeks(
        orders: Vec<OrderLine>,
        config: &PlanConfig,
    ) -> (PlanningCalendar, Vec<ScheduledOrder>) {
        let probe = PlanningCalendar::new(config.planning_start, config.max_planning_weeks);
        let default_due =
            config.planning_start + Duration::weeks(i64::from(config.default_due_offset_weeks));

        let scheduled: Vec<ScheduledOrder> = orders
            .into_iter()
            .map(|order| {
                let due_week = probe.week_of(order.committed_date.unwrap_or(default_due));
                ScheduledOrder { order, due_week }
            })
            .collect();

        let latest_week = scheduled.iter().map(|s| s.due_week).max();
        let calendar = PlanningCalendar::from_latest_week(config, latest_week);

        tracing::debug!(
            "週次分桶：訂單 {} 筆，最晚週 {:?}，排程 {} 週",
            scheduled.len(),
            latest_week,
            calendar.horizon_weeks
        );

        (calendar, scheduled)
    }

    /// 依 (零件, 到期週) 彙總毛需求（重複訂單合併）
    pub fn aggregate(orders: &[ScheduledOrder]) -> BTreeMap<String, BTreeMap<u32, Decimal>> {
        let mut grouped: BTreeMap<String, BTreeMap<u32, Decimal>> = BTreeMap::new();
        for scheduled in orders {
            *grouped
                .entry(scheduled.order.part_code.clone())
                .or_default()
                .entry(scheduled.due_week)
                .or_insert(Decimal::ZERO) += scheduled.order.quantity;
        }
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_assign_weeks_and_horizon() {
        let config = PlanConfig::new(date(2025, 10, 1));
        let orders = vec![
            OrderLine::new("P1", Decimal::from(10), date(2025, 10, 3)),
            OrderLine::new("P1", Decimal::from(20), date(2025, 11, 5)),
            OrderLine::new("P2", Decimal::from(5), date(2025, 10, 1)).without_committed_date(),
        ];

        let (calendar, scheduled) = BucketingCalculator::assign_weeks(orders, &config);

        assert_eq!(scheduled[0].due_week, 1);
        assert_eq!(scheduled[1].due_week, 6);
        // 未填交期：起始日 + 3 週
        assert_eq!(scheduled[2].due_week, 4);
        assert_eq!(calendar.horizon_weeks, 8);
    }

    #[test]
    fn test_no_orders_uses_default_horizon() {
        let config = PlanConfig::default();
        let (calendar, scheduled) = BucketingCalculator::assign_weeks(Vec::new(), &config);
        assert!(scheduled.is_empty());
        assert_eq!(calendar.horizon_weeks, 10);
    }

    #[test]
    fn test_aggregate_duplicates() {
        let config = PlanConfig::new(date(2025, 10, 1));
        let orders = vec![
            OrderLine::new("P1", Decimal::from(10), date(2025, 10, 8)),
            OrderLine::new("P1", Decimal::from(15), date(2025, 10, 10)),
            OrderLine::new("P1", Decimal::from(7), date(2025, 10, 20)),
        ];
        let (_, scheduled) = BucketingCalculator::assign_weeks(orders, &config);

        let grouped = BucketingCalculator::aggregate(&scheduled);
        let p1 = &grouped["P1"];
        assert_eq!(p1[&2], Decimal::from(25));
        assert_eq!(p1[&3], Decimal::from(7));
    }
}
