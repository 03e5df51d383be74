//! 在製品快照模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{MpsError, Result};

/// 在製品檢查點（由下游往上游）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Checkpoint {
    /// 成品
    FinishedGoods,
    /// 塗裝後
    PostPaint,
    /// 加工後
    PostMachining,
    /// 研磨後
    PostGrinding,
    /// 鑄造後
    PostCasting,
}

impl Checkpoint {
    pub const ALL: [Checkpoint; 5] = [
        Checkpoint::FinishedGoods,
        Checkpoint::PostPaint,
        Checkpoint::PostMachining,
        Checkpoint::PostGrinding,
        Checkpoint::PostCasting,
    ];
}

/// 單一零件的在製品快照
///
/// 視為期初庫存，只讀取不修改；消耗量由需求分解另行記錄。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WipSnapshot {
    /// 零件代碼
    pub part_code: String,

    /// 成品
    pub finished_goods: Decimal,

    /// 塗裝後
    pub post_paint: Decimal,

    /// 加工後
    pub post_machining: Decimal,

    /// 研磨後
    pub post_grinding: Decimal,

    /// 鑄造後
    pub post_casting: Decimal,
}

impl WipSnapshot {
    /// 創建空的快照
    pub fn new(part_code: &str) -> Self {
        Self {
            part_code: part_code.to_string(),
            ..Self::default()
        }
    }

    /// 建構器模式：設置檢查點數量
    pub fn with(mut self, checkpoint: Checkpoint, quantity: Decimal) -> Self {
        match checkpoint {
            Checkpoint::FinishedGoods => self.finished_goods = quantity,
            Checkpoint::PostPaint => self.post_paint = quantity,
            Checkpoint::PostMachining => self.post_machining = quantity,
            Checkpoint::PostGrinding => self.post_grinding = quantity,
            Checkpoint::PostCasting => self.post_casting = quantity,
        }
        self
    }

    /// 取得檢查點數量
    pub fn get(&self, checkpoint: Checkpoint) -> Decimal {
        match checkpoint {
            Checkpoint::FinishedGoods => self.finished_goods,
            Checkpoint::PostPaint => self.post_paint,
            Checkpoint::PostMachining => self.post_machining,
            Checkpoint::PostGrinding => self.post_grinding,
            Checkpoint::PostCasting => self.post_casting,
        }
    }

    /// 五個檢查點合計
    pub fn total(&self) -> Decimal {
        Checkpoint::ALL.iter().map(|c| self.get(*c)).sum()
    }

    /// 合併同零件的另一筆快照
    pub fn merge(&mut self, other: &WipSnapshot) {
        self.finished_goods += other.finished_goods;
        self.post_paint += other.post_paint;
        self.post_machining += other.post_machining;
        self.post_grinding += other.post_grinding;
        self.post_casting += other.post_casting;
    }

    /// 驗證數量皆非負
    pub fn validate(&self) -> Result<()> {
        for checkpoint in Checkpoint::ALL {
            if self.get(checkpoint) < Decimal::ZERO {
                return Err(MpsError::InvalidInput(format!(
                    "零件 {} 的在製品 {:?} 為負值",
                    self.part_code, checkpoint
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wip_total_and_merge() {
        let mut wip = WipSnapshot::new("P1")
            .with(Checkpoint::FinishedGoods, Decimal::from(10))
            .with(Checkpoint::PostCasting, Decimal::from(5));
        assert_eq!(wip.total(), Decimal::from(15));

        wip.merge(&WipSnapshot::new("P1").with(Checkpoint::PostCasting, Decimal::from(7)));
        assert_eq!(wip.post_casting, Decimal::from(12));
        assert_eq!(wip.total(), Decimal::from(22));
        assert_eq!(wip.part_code, "P1");
    }

    #[test]
    fn test_negative_wip_rejected() {
        let wip = WipSnapshot::new("P1").with(Checkpoint::PostPaint, Decimal::from(-1));
        assert!(wip.validate().is_err());
    }
}
