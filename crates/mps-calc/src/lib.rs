//! # MPS Calculation
//!
//! 產能、途程與需求分解計算

pub mod allocation;
pub mod bucketing;
pub mod capacity;
pub mod decomposer;
pub mod lead_time;
pub mod netting;
pub mod routing;

// Re-export 主要類型
pub use allocation::AllocationCalculator;
pub use bucketing::{BucketingCalculator, ScheduledOrder};
pub use capacity::CapacityProvider;
pub use decomposer::{Decomposition, DemandDecomposer};
pub use lead_time::LeadTimeCalculator;
pub use netting::{NettingCalculator, PartRequirement};
pub use routing::{PartCatalog, RoutingBuilder};
