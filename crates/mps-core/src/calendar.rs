//! 排程週曆模型

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::PlanConfig;

/// 排程週曆
///
/// 週次從 1 開始，第 1 週從排程起始日開始。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningCalendar {
    /// 排程起始日
    pub start: NaiveDate,

    /// 排程週數
    pub horizon_weeks: u32,
}

impl PlanningCalendar {
    /// 創建新的週曆
    pub fn new(start: NaiveDate, horizon_weeks: u32) -> Self {
        Self {
            start,
            horizon_weeks: horizon_weeks.max(1),
        }
    }

    /// 依最晚訂單週推算排程週數
    ///
    /// 週數 = min(最晚訂單週 + 緩衝週數, 最大週數)；沒有訂單時使用預設週數。
    pub fn from_latest_week(config: &PlanConfig, latest_week: Option<u32>) -> Self {
        let horizon = match latest_week {
            Some(week) => (week + config.planning_buffer_weeks).min(config.max_planning_weeks),
            None => config.default_horizon_weeks.min(config.max_planning_weeks),
        };
        Self::new(config.planning_start, horizon)
    }

    /// 日期所屬週次（起始日之前的日期歸入第 1 週）
    pub fn week_of(&self, date: NaiveDate) -> u32 {
        let days = (date - self.start).num_days();
        if days < 0 {
            return 1;
        }
        (days / 7 + 1) as u32
    }
}
