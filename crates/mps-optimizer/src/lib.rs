//! # MPS Optimizer
//!
//! 最佳化模組（模型建構、求解、結果萃取）

pub mod builder;
mod constraints;
pub mod engine;
pub mod extract;
pub mod model;
pub mod solver;
pub mod variables;

// Re-export 主要類型
pub use builder::{ModelBuilder, PartSlot, PlanningModel};
pub use engine::{PlanningEngine, PlanningInput};
pub use extract::ResultsExtractor;
pub use model::{ColumnId, MilpModel, RowId};
pub use solver::{
    HighsSolver, InfeasibilityDiagnoser, MilpSolver, SolverOutcome, SolverSolution,
    FEASIBILITY_TOLERANCE,
};
pub use variables::VariablePool;
