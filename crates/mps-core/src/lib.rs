//! # MPS Core
//!
//! 主生產排程核心資料模型與類型定義

pub mod calendar;
pub mod capacity;
pub mod config;
pub mod constraint;
pub mod order;
pub mod part;
pub mod plan;
pub mod variant;
pub mod wip;

// Re-export 主要類型
pub use calendar::PlanningCalendar;
pub use capacity::{MachineRecord, MouldBoxRecord};
pub use config::{PlanConfig, SolverConfig};
pub use constraint::ConstraintClass;
pub use order::{ExcludedOrder, OrderLine};
pub use part::{
    MachiningRoute, MouldBoxSpec, PaintingRoute, Part, PartMasterRecord, Routing,
    RoutingStepRecord, Stage, StageOp,
};
pub use plan::{PlanWarning, ProductionPlan, SolveStatus, WarningSeverity};
pub use variant::{DeliveryWindow, DemandVariant, StageRequirements, VariantKey};
pub use wip::{Checkpoint, WipSnapshot};

/// MPS 錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum MpsError {
    #[error("無效的配置: {0}")]
    InvalidConfig(String),

    #[error("無效的輸入資料: {0}")]
    InvalidInput(String),

    #[error("找不到零件: {0}")]
    PartNotFound(String),

    #[error("資源產能缺失: {0}")]
    MissingCapacity(String),

    #[error("求解器錯誤: {0}")]
    SolverError(String),

    #[error("模型不可行，疑似衝突約束: {}", ConstraintClass::describe_all(.suspects))]
    Infeasible { suspects: Vec<ConstraintClass> },
}

pub type Result<T> = std::result::Result<T, MpsError>;

/// 正規化零件/資源代碼（去除空白並轉大寫）
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  ab-12 "), "AB-12");
    }

    #[test]
    fn test_infeasible_message_lists_classes() {
        let err = MpsError::Infeasible {
            suspects: vec![ConstraintClass::LeadTime, ConstraintClass::MouldBox],
        };
        let msg = err.to_string();
        assert!(msg.contains("交期前置"));
        assert!(msg.contains("模箱產能"));
    }
}
