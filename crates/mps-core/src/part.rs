//! 零件主檔與途程模型

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 生產工序（依流程順序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    /// 鑄造
    Casting,
    /// 研磨
    Grinding,
    /// 加工 1
    Mc1,
    /// 加工 2
    Mc2,
    /// 加工 3
    Mc3,
    /// 塗裝 1
    Sp1,
    /// 塗裝 2
    Sp2,
    /// 塗裝 3
    Sp3,
    /// 交貨
    Delivery,
}

impl Stage {
    /// 全部工序（依流程順序）
    pub const ALL: [Stage; 9] = [
        Stage::Casting,
        Stage::Grinding,
        Stage::Mc1,
        Stage::Mc2,
        Stage::Mc3,
        Stage::Sp1,
        Stage::Sp2,
        Stage::Sp3,
        Stage::Delivery,
    ];

    /// 需要機台資源的下游工序
    pub const MACHINED: [Stage; 7] = [
        Stage::Grinding,
        Stage::Mc1,
        Stage::Mc2,
        Stage::Mc3,
        Stage::Sp1,
        Stage::Sp2,
        Stage::Sp3,
    ];

    /// 工序索引（0..9）
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// 報表名稱
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Casting => "Casting",
            Stage::Grinding => "Grinding",
            Stage::Mc1 => "MC1",
            Stage::Mc2 => "MC2",
            Stage::Mc3 => "MC3",
            Stage::Sp1 => "SP1",
            Stage::Sp2 => "SP2",
            Stage::Sp3 => "SP3",
            Stage::Delivery => "Delivery",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 主檔中的單一途程欄位組（資源代碼、週期時間、批量）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingStepRecord {
    /// 資源代碼（空白、"0" 或 "nan" 表示不經過此工序）
    pub resource: Option<String>,

    /// 週期時間（分鐘）
    pub cycle_minutes: Option<f64>,

    /// 批量（每個週期處理件數）
    pub batch_size: Option<f64>,
}

impl RoutingStepRecord {
    pub fn new(resource: &str, cycle_minutes: f64, batch_size: f64) -> Self {
        Self {
            resource: Some(resource.to_string()),
            cycle_minutes: Some(cycle_minutes),
            batch_size: Some(batch_size),
        }
    }
}

/// 零件主檔原始資料列
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartMasterRecord {
    /// 零件代碼
    pub part_code: String,

    /// 單件重量（公斤）
    pub unit_weight_kg: f64,

    /// 模箱尺寸
    pub box_size: Option<String>,

    /// 每模箱件數
    pub box_quantity: Option<f64>,

    /// 鑄造線代碼
    pub casting_line: String,

    /// 鑄造週期時間（分鐘）
    pub casting_cycle_minutes: f64,

    /// 鑄造批量
    pub casting_batch_size: Option<f64>,

    /// 砂心週期時間（分鐘，0 表示不需砂心）
    pub core_cycle_minutes: f64,

    /// 砂心批量
    pub core_batch_size: Option<f64>,

    pub grinding: RoutingStepRecord,
    pub mc1: RoutingStepRecord,
    pub mc2: RoutingStepRecord,
    pub mc3: RoutingStepRecord,
    pub sp1: RoutingStepRecord,
    pub sp2: RoutingStepRecord,
    pub sp3: RoutingStepRecord,

    /// 冷卻時數
    pub cooling_hours: f64,

    /// 落砂時數
    pub shakeout_hours: f64,

    /// 真空時間（分鐘，> 0 表示需要真空）
    pub vacuum_minutes: f64,
}

impl PartMasterRecord {
    /// 創建只含鑄造資訊的主檔列
    pub fn new(part_code: &str, casting_line: &str, casting_cycle_minutes: f64) -> Self {
        Self {
            part_code: part_code.to_string(),
            casting_line: casting_line.to_string(),
            casting_cycle_minutes,
            ..Self::default()
        }
    }

    /// 建構器模式：設置單件重量
    pub fn with_unit_weight(mut self, kg: f64) -> Self {
        self.unit_weight_kg = kg;
        self
    }

    /// 建構器模式：設置模箱
    pub fn with_mould_box(mut self, box_size: &str, units_per_box: f64) -> Self {
        self.box_size = Some(box_size.to_string());
        self.box_quantity = Some(units_per_box);
        self
    }

    /// 建構器模式：設置砂心週期與批量
    pub fn with_core(mut self, cycle_minutes: f64, batch_size: f64) -> Self {
        self.core_cycle_minutes = cycle_minutes;
        self.core_batch_size = Some(batch_size);
        self
    }

    /// 建構器模式：設置下游工序途程
    pub fn with_step(mut self, stage: Stage, step: RoutingStepRecord) -> Self {
        match stage {
            Stage::Grinding => self.grinding = step,
            Stage::Mc1 => self.mc1 = step,
            Stage::Mc2 => self.mc2 = step,
            Stage::Mc3 => self.mc3 = step,
            Stage::Sp1 => self.sp1 = step,
            Stage::Sp2 => self.sp2 = step,
            Stage::Sp3 => self.sp3 = step,
            Stage::Casting | Stage::Delivery => {}
        }
        self
    }

    /// 建構器模式：設置冷卻與落砂時數
    pub fn with_cooling(mut self, cooling_hours: f64, shakeout_hours: f64) -> Self {
        self.cooling_hours = cooling_hours;
        self.shakeout_hours = shakeout_hours;
        self
    }

    /// 建構器模式：設置真空時間
    pub fn with_vacuum_minutes(mut self, minutes: f64) -> Self {
        self.vacuum_minutes = minutes;
        self
    }

    /// 取得下游工序的途程欄位
    pub fn step(&self, stage: Stage) -> Option<&RoutingStepRecord> {
        match stage {
            Stage::Grinding => Some(&self.grinding),
            Stage::Mc1 => Some(&self.mc1),
            Stage::Mc2 => Some(&self.mc2),
            Stage::Mc3 => Some(&self.mc3),
            Stage::Sp1 => Some(&self.sp1),
            Stage::Sp2 => Some(&self.sp2),
            Stage::Sp3 => Some(&self.sp3),
            Stage::Casting | Stage::Delivery => None,
        }
    }
}

/// 單一工序作業參數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOp {
    /// 資源代碼（已正規化）
    pub resource: String,

    /// 週期時間（分鐘）
    pub cycle_minutes: f64,

    /// 批量
    pub batch_size: f64,
}

impl StageOp {
    /// 每件耗用分鐘
    pub fn minutes_per_unit(&self) -> f64 {
        if self.batch_size > 0.0 {
            self.cycle_minutes / self.batch_size
        } else {
            self.cycle_minutes
        }
    }
}

/// 加工途程
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachiningRoute {
    /// 不經加工
    Skipped,
    /// 經 MC1，並視情況經 MC2/MC3
    Through { mc2: bool, mc3: bool },
}

/// 塗裝途程
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaintingRoute {
    /// 不經塗裝
    Skipped,
    /// 經 SP1，並視情況經 SP2/SP3
    Through { sp2: bool, sp3: bool },
}

/// 零件途程描述（每個零件計算一次）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routing {
    /// 是否經研磨
    pub grinding: bool,
    /// 加工途程
    pub machining: MachiningRoute,
    /// 塗裝途程
    pub painting: PaintingRoute,
}

impl Routing {
    /// 完整途程（所有工序皆經過）
    pub fn full() -> Self {
        Self {
            grinding: true,
            machining: MachiningRoute::Through { mc2: true, mc3: true },
            painting: PaintingRoute::Through { sp2: true, sp3: true },
        }
    }

    /// 是否經過指定工序（鑄造與交貨一定經過）
    pub fn has(&self, stage: Stage) -> bool {
        match stage {
            Stage::Casting | Stage::Delivery => true,
            Stage::Grinding => self.grinding,
            Stage::Mc1 => matches!(self.machining, MachiningRoute::Through { .. }),
            Stage::Mc2 => matches!(self.machining, MachiningRoute::Through { mc2: true, .. }),
            Stage::Mc3 => matches!(self.machining, MachiningRoute::Through { mc3: true, .. }),
            Stage::Sp1 => matches!(self.painting, PaintingRoute::Through { .. }),
            Stage::Sp2 => matches!(self.painting, PaintingRoute::Through { sp2: true, .. }),
            Stage::Sp3 => matches!(self.painting, PaintingRoute::Through { sp3: true, .. }),
        }
    }

    /// 實際經過的工序（依流程順序）
    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        Stage::ALL.into_iter().filter(move |s| self.has(*s))
    }

    /// 最後一道加工工序
    pub fn last_machining(&self) -> Option<Stage> {
        match self.machining {
            MachiningRoute::Skipped => None,
            MachiningRoute::Through { mc3: true, .. } => Some(Stage::Mc3),
            MachiningRoute::Through { mc2: true, .. } => Some(Stage::Mc2),
            MachiningRoute::Through { .. } => Some(Stage::Mc1),
        }
    }

    /// 最後一道塗裝工序
    pub fn last_painting(&self) -> Option<Stage> {
        match self.painting {
            PaintingRoute::Skipped => None,
            PaintingRoute::Through { sp3: true, .. } => Some(Stage::Sp3),
            PaintingRoute::Through { sp2: true, .. } => Some(Stage::Sp2),
            PaintingRoute::Through { .. } => Some(Stage::Sp1),
        }
    }

    /// 同一加工/塗裝群組內的前一道工序
    ///
    /// MC3 在略過 MC2 時接 MC1；SP3 同理。群組的第一道工序回傳 None。
    pub fn predecessor(&self, stage: Stage) -> Option<Stage> {
        if !self.has(stage) {
            return None;
        }
        match stage {
            Stage::Mc2 => Some(Stage::Mc1),
            Stage::Mc3 if self.has(Stage::Mc2) => Some(Stage::Mc2),
            Stage::Mc3 => Some(Stage::Mc1),
            Stage::Sp2 => Some(Stage::Sp1),
            Stage::Sp3 if self.has(Stage::Sp2) => Some(Stage::Sp2),
            Stage::Sp3 => Some(Stage::Sp1),
            _ => None,
        }
    }
}

/// 模箱規格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MouldBoxSpec {
    /// 模箱尺寸
    pub size: String,
    /// 每模箱件數
    pub units_per_box: f64,
}

/// 零件（由途程建構器產生，建構後不可變）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    /// 零件代碼（已正規化）
    pub code: String,

    /// 單件重量（公斤）
    pub unit_weight_kg: f64,

    /// 模箱規格
    pub mould_box: Option<MouldBoxSpec>,

    /// 鑄造作業（資源為鑄造線）
    pub casting: StageOp,

    /// 每件鑄件耗用的砂心分鐘（0 表示不需砂心）
    pub core_minutes_per_unit: f64,

    /// 下游工序作業參數（只含途程實際經過的工序）
    pub operations: BTreeMap<Stage, StageOp>,

    /// 途程描述
    pub routing: Routing,

    /// 冷卻 + 落砂時數
    pub cooling_hours: f64,

    /// 是否需要真空
    pub requires_vacuum: bool,

    /// 冷卻造成的鑄造到研磨延遲週數
    pub cooling_lag_weeks: u32,

    /// 最短前置週數
    pub lead_time_weeks: u32,
}

impl Part {
    /// 取得工序作業參數
    pub fn operation(&self, stage: Stage) -> Option<&StageOp> {
        match stage {
            Stage::Casting => Some(&self.casting),
            Stage::Delivery => None,
            other => self.operations.get(&other),
        }
    }

    /// 鑄造線代碼
    pub fn casting_line(&self) -> &str {
        &self.casting.resource
    }

    /// 鑄造每件有效耗用分鐘（真空件除以折減係數）
    pub fn effective_casting_minutes(&self, vacuum_capacity_penalty: f64) -> f64 {
        let base = self.casting.minutes_per_unit();
        if self.requires_vacuum && vacuum_capacity_penalty > 0.0 {
            base / vacuum_capacity_penalty
        } else {
            base
        }
    }

    /// 單件噸數
    pub fn unit_tons(&self) -> f64 {
        self.unit_weight_kg / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_stage_order() {
        assert_eq!(Stage::ALL.len(), 9);
        assert_eq!(Stage::Casting.index(), 0);
        assert_eq!(Stage::Delivery.index(), 8);
        assert!(Stage::Mc1 < Stage::Sp1);
        assert_eq!(Stage::Sp2.to_string(), "SP2");
    }

    #[rstest]
    #[case(Routing::full(), Some(Stage::Mc3), Some(Stage::Sp3))]
    #[case(
        Routing { grinding: true, machining: MachiningRoute::Through { mc2: true, mc3: false }, painting: PaintingRoute::Through { sp2: false, sp3: false } },
        Some(Stage::Mc2),
        Some(Stage::Sp1)
    )]
    #[case(
        Routing { grinding: true, machining: MachiningRoute::Skipped, painting: PaintingRoute::Skipped },
        None,
        None
    )]
    fn test_last_stages(
        #[case] routing: Routing,
        #[case] machining: Option<Stage>,
        #[case] painting: Option<Stage>,
    ) {
        assert_eq!(routing.last_machining(), machining);
        assert_eq!(routing.last_painting(), painting);
    }

    #[test]
    fn test_predecessor_skips_missing_stage() {
        let routing = Routing {
            grinding: true,
            machining: MachiningRoute::Through { mc2: false, mc3: true },
            painting: PaintingRoute::Through { sp2: true, sp3: true },
        };

        assert_eq!(routing.predecessor(Stage::Mc3), Some(Stage::Mc1));
        assert_eq!(routing.predecessor(Stage::Mc2), None);
        assert_eq!(routing.predecessor(Stage::Sp3), Some(Stage::Sp2));
        assert_eq!(routing.predecessor(Stage::Sp1), None);
        assert_eq!(
            routing.stages().collect::<Vec<_>>(),
            vec![
                Stage::Casting,
                Stage::Grinding,
                Stage::Mc1,
                Stage::Mc3,
                Stage::Sp1,
                Stage::Sp2,
                Stage::Sp3,
                Stage::Delivery
            ]
        );
    }

    #[test]
    fn test_effective_casting_minutes() {
        let part = Part {
            code: "P1".to_string(),
            unit_weight_kg: 250.0,
            mould_box: None,
            casting: StageOp {
                resource: "L1".to_string(),
                cycle_minutes: 6.0,
                batch_size: 2.0,
            },
            core_minutes_per_unit: 0.0,
            operations: BTreeMap::new(),
            routing: Routing::full(),
            cooling_hours: 0.0,
            requires_vacuum: true,
            cooling_lag_weeks: 0,
            lead_time_weeks: 2,
        };

        assert_eq!(part.casting.minutes_per_unit(), 3.0);
        assert!((part.effective_casting_minutes(0.75) - 4.0).abs() < 1e-9);
        assert_eq!(part.unit_tons(), 0.25);
        assert_eq!(part.casting_line(), "L1");
    }
}
