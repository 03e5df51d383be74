//! 需求變體模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Stage;

/// 需求變體鍵：(零件, 到期週)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantKey {
    /// 零件代碼
    pub part_code: String,
    /// 到期週
    pub due_week: u32,
}

impl VariantKey {
    pub fn new(part_code: &str, due_week: u32) -> Self {
        Self {
            part_code: part_code.to_string(),
            due_week,
        }
    }

    /// 報表標籤，如 `P1_W6`
    pub fn label(&self) -> String {
        format!("{}_W{}", self.part_code, self.due_week)
    }
}

/// 交貨視窗（含兩端週次）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryWindow {
    /// 最早可交貨週
    pub earliest: u32,
    /// 最晚可交貨週
    pub latest: u32,
}

impl DeliveryWindow {
    /// 依到期週、緩衝週數與排程週數建立視窗
    ///
    /// 到期週超出排程範圍時視窗可能為空。
    pub fn around(due_week: u32, buffer_weeks: u32, horizon_weeks: u32) -> Self {
        Self {
            earliest: due_week.saturating_sub(buffer_weeks).max(1),
            latest: (due_week + buffer_weeks).min(horizon_weeks),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.earliest > self.latest
    }

    pub fn contains(&self, week: u32) -> bool {
        week >= self.earliest && week <= self.latest
    }
}

/// 各生產工序的新投入需求量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRequirements {
    /// 塗裝
    pub painting: Decimal,
    /// 加工
    pub machining: Decimal,
    /// 研磨
    pub grinding: Decimal,
    /// 鑄造
    pub casting: Decimal,
}

impl StageRequirements {
    /// 指定工序的需求量（交貨回傳 None，由淨需求決定）
    pub fn for_stage(&self, stage: Stage) -> Option<Decimal> {
        match stage {
            Stage::Casting => Some(self.casting),
            Stage::Grinding => Some(self.grinding),
            Stage::Mc1 | Stage::Mc2 | Stage::Mc3 => Some(self.machining),
            Stage::Sp1 | Stage::Sp2 | Stage::Sp3 => Some(self.painting),
            Stage::Delivery => None,
        }
    }

    /// 累加
    pub fn add(&mut self, other: &StageRequirements) {
        self.painting += other.painting;
        self.machining += other.machining;
        self.grinding += other.grinding;
        self.casting += other.casting;
    }
}

/// 需求變體（零件 × 到期週的淨需求切片）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandVariant {
    /// 變體鍵
    pub key: VariantKey,

    /// 毛需求（同零件同週訂單合計）
    pub gross_demand: Decimal,

    /// 淨需求（扣除成品與塗裝後庫存後仍需生產交貨的數量）
    pub net_demand: Decimal,

    /// 各工序新投入需求量
    pub requirements: StageRequirements,

    /// 交貨視窗
    pub window: DeliveryWindow,

    /// 淨需求為零、僅由庫存滿足（不建立生產變數，但仍回報交貨）
    pub wip_only: bool,
}

impl DemandVariant {
    /// 由庫存直接出貨的數量
    pub fn stock_covered(&self) -> Decimal {
        self.gross_demand - self.net_demand
    }

    pub fn label(&self) -> String {
        self.key.label()
    }

    pub fn part_code(&self) -> &str {
        &self.key.part_code
    }

    pub fn due_week(&self) -> u32 {
        self.key.due_week
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_clipping() {
        let window = DeliveryWindow::around(1, 1, 8);
        assert_eq!(window, DeliveryWindow { earliest: 1, latest: 2 });

        let window = DeliveryWindow::around(8, 1, 8);
        assert_eq!(window, DeliveryWindow { earliest: 7, latest: 8 });
        assert!(window.contains(8));
        assert!(!window.contains(9));
    }

    #[test]
    fn test_window_beyond_horizon_is_empty() {
        let window = DeliveryWindow::around(12, 1, 8);
        assert!(window.is_empty());
        assert!(!window.contains(8));
    }

    #[test]
    fn test_requirements_by_stage() {
        let req = StageRequirements {
            painting: Decimal::from(40),
            machining: Decimal::from(30),
            grinding: Decimal::from(20),
            casting: Decimal::from(10),
        };
        assert_eq!(req.for_stage(Stage::Mc2), Some(Decimal::from(30)));
        assert_eq!(req.for_stage(Stage::Sp3), Some(Decimal::from(40)));
        assert_eq!(req.for_stage(Stage::Delivery), None);
        assert_eq!(VariantKey::new("P1", 6).label(), "P1_W6");
    }
}
