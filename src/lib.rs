//! # MPS
//!
//! 鑄造廠主生產排程：在製品感知的需求分解、途程建構、產能彙整、
//! MILP 模型建構與求解、結果萃取。

pub use mps_calc;
pub use mps_core;
pub use mps_optimizer;

pub use mps_core::plan;
pub use mps_core::{
    Checkpoint, MachineRecord, MouldBoxRecord, MpsError, OrderLine, PartMasterRecord, PlanConfig,
    ProductionPlan, Result, RoutingStepRecord, SolveStatus, Stage, WipSnapshot,
};
pub use mps_optimizer::{PlanningEngine, PlanningInput};
