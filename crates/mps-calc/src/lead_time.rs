//! 前置週數計算

use mps_core::PlanConfig;

/// 一週的時數
const HOURS_PER_WEEK: f64 = 24.0 * 7.0;

/// 前置週數計算器
pub struct LeadTimeCalculator;

impl LeadTimeCalculator {
    /// 冷卻 + 落砂造成的延遲週數
    ///
    /// 在寬限時數內不增加週數，否則為 `ceil(時數 / 168)`。
    pub fn cooling_weeks(cooling_hours: f64, config: &PlanConfig) -> u32 {
        if cooling_hours <= config.cooling_grace_hours || cooling_hours <= 0.0 {
            return 0;
        }
        (cooling_hours / HOURS_PER_WEEK).ceil() as u32
    }

    /// 最短前置週數 = max(設定最小值, 冷卻週數 + 管線緩衝)
    pub fn lead_time_weeks(cooling_weeks: u32, config: &PlanConfig) -> u32 {
        config
            .min_lead_time_weeks
            .max(cooling_weeks + config.pipeline_buffer_weeks)
    }

    /// 將週次往前推移；結果小於第 1 週時回傳 None
    pub fn shift_back(week: u32, weeks: u32) -> Option<u32> {
        week.checked_sub(weeks).filter(|w| *w >= 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0)]
    #[case(96.0, 0)]
    #[case(120.0, 0)]
    #[case(150.0, 1)]
    #[case(168.0, 1)]
    #[case(200.0, 2)]
    fn test_cooling_weeks(#[case] hours: f64, #[case] expected: u32) {
        let config = PlanConfig::default();
        assert_eq!(LeadTimeCalculator::cooling_weeks(hours, &config), expected);
    }

    #[test]
    fn test_lead_time_weeks() {
        let config = PlanConfig::default();

        // 無冷卻延遲：max(2, 0 + 2)
        assert_eq!(LeadTimeCalculator::lead_time_weeks(0, &config), 2);

        // 冷卻 1 週：max(2, 1 + 2)
        assert_eq!(LeadTimeCalculator::lead_time_weeks(1, &config), 3);

        let strict = PlanConfig::default().with_lead_time(5, 2);
        assert_eq!(LeadTimeCalculator::lead_time_weeks(1, &strict), 5);
    }

    #[test]
    fn test_shift_back() {
        assert_eq!(LeadTimeCalculator::shift_back(6, 3), Some(3));
        assert_eq!(LeadTimeCalculator::shift_back(3, 3), None);
        assert_eq!(LeadTimeCalculator::shift_back(2, 5), None);
        assert_eq!(LeadTimeCalculator::shift_back(4, 0), Some(4));
    }
}
