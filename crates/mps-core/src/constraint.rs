//! 約束類別

use serde::{Deserialize, Serialize};

/// 模型約束類別
///
/// 用於不可行診斷：求解器回報不可行時，逐一放寬各類別以定位衝突來源。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConstraintClass {
    /// 零件層級流量守恆（含 WIP 跳站）
    FlowConservation,
    /// 需求變體內部工序先後
    StageSeriality,
    /// 交期前置（鑄造到交貨的最短週數）
    LeadTime,
    /// 需求平衡（交貨 + 未滿足 = 淨需求）
    DemandBalance,
    /// 機台資源產能（研磨、加工、塗裝）
    ResourceCapacity,
    /// 鑄造線產能（含真空折減與換模時間）
    CastingLine,
    /// 砂心產能（作業彙總）
    CoreCapacity,
    /// 換模指示變數連結
    SetupLink,
    /// 模箱產能
    MouldBox,
    /// 熔解噸位上限
    MeltTonnage,
}

impl ConstraintClass {
    /// 不可行時優先檢查的約束類別（依常見程度排序）
    pub const SUSPECTS: [ConstraintClass; 6] = [
        ConstraintClass::LeadTime,
        ConstraintClass::ResourceCapacity,
        ConstraintClass::CastingLine,
        ConstraintClass::CoreCapacity,
        ConstraintClass::MouldBox,
        ConstraintClass::MeltTonnage,
    ];

    /// 中文說明
    pub fn description(&self) -> &'static str {
        match self {
            ConstraintClass::FlowConservation => "流量守恆",
            ConstraintClass::StageSeriality => "工序先後",
            ConstraintClass::LeadTime => "交期前置不足",
            ConstraintClass::DemandBalance => "需求平衡",
            ConstraintClass::ResourceCapacity => "機台產能不足",
            ConstraintClass::CastingLine => "鑄造線產能不足",
            ConstraintClass::CoreCapacity => "砂心產能不足",
            ConstraintClass::SetupLink => "換模連結",
            ConstraintClass::MouldBox => "模箱產能不足",
            ConstraintClass::MeltTonnage => "熔解噸位不足",
        }
    }

    /// 將多個類別串成一段訊息
    pub fn describe_all(classes: &[ConstraintClass]) -> String {
        if classes.is_empty() {
            return "無法定位".to_string();
        }
        classes
            .iter()
            .map(|c| c.description())
            .collect::<Vec<_>>()
            .join("、")
    }
}
