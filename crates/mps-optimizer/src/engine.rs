//! 主生產排程引擎

use mps_calc::{CapacityProvider, DemandDecomposer, RoutingBuilder};
use mps_core::{
    MachineRecord, MouldBoxRecord, MpsError, OrderLine, PartMasterRecord, PlanConfig,
    ProductionPlan, Result, WipSnapshot,
};

use crate::builder::ModelBuilder;
use crate::extract::ResultsExtractor;
use crate::solver::{HighsSolver, InfeasibilityDiagnoser, MilpSolver, SolverOutcome};

/// 排程輸入資料
#[derive(Debug, Clone, Default)]
pub struct PlanningInput {
    /// 零件主檔（含途程）
    pub parts: Vec<PartMasterRecord>,
    /// 訂單明細
    pub orders: Vec<OrderLine>,
    /// 機台與鑄造線
    pub machines: Vec<MachineRecord>,
    /// 模箱產能
    pub mould_boxes: Vec<MouldBoxRecord>,
    /// 在製品快照
    pub wip: Vec<WipSnapshot>,
}

impl PlanningInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_part(mut self, part: PartMasterRecord) -> Self {
        self.parts.push(part);
        self
    }

    pub fn with_order(mut self, order: OrderLine) -> Self {
        self.orders.push(order);
        self
    }

    pub fn with_machine(mut self, machine: MachineRecord) -> Self {
        self.machines.push(machine);
        self
    }

    pub fn with_mould_box(mut self, mould_box: MouldBoxRecord) -> Self {
        self.mould_boxes.push(mould_box);
        self
    }

    pub fn with_wip(mut self, wip: WipSnapshot) -> Self {
        self.wip.push(wip);
        self
    }
}

/// 主生產排程引擎
pub struct PlanningEngine {
    config: PlanConfig,
}

impl PlanningEngine {
    /// 創建新的排程引擎
    pub fn new(config: PlanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    /// 以 HiGHS 求解排程
    pub fn plan(&self, input: PlanningInput) -> Result<ProductionPlan> {
        let solver = HighsSolver::new(self.config.solver.clone());
        self.plan_with(input, &solver)
    }

    /// 以指定求解器求解排程
    pub fn plan_with<S: MilpSolver + ?Sized>(
        &self,
        input: PlanningInput,
        solver: &S,
    ) -> Result<ProductionPlan> {
        tracing::info!(
            "開始主生產排程：零件 {} 筆，訂單 {} 筆，機台 {} 筆，在製品 {} 筆",
            input.parts.len(),
            input.orders.len(),
            input.machines.len(),
            input.wip.len()
        );

        let start_time = std::time::Instant::now();
        self.config.validate()?;

        // Step 1: 途程建構
        tracing::debug!("Step 1: 途程建構");
        let catalog = RoutingBuilder::build(&input.parts, &self.config)?;
        tracing::debug!("零件數量: {}", catalog.len());

        // Step 2: 產能表
        tracing::debug!("Step 2: 產能表");
        let capacity = CapacityProvider::build(&input.machines, &input.mould_boxes, &self.config)?;

        // Step 3: 需求分解
        tracing::debug!("Step 3: 需求分解");
        let decomposition =
            DemandDecomposer::new(&self.config, &catalog).decompose(input.orders, &input.wip)?;
        tracing::debug!(
            "需求變體 {} 個，排程 {} 週",
            decomposition.variants.len(),
            decomposition.calendar.horizon_weeks
        );

        // Step 4: 建構模型
        tracing::debug!("Step 4: 建構模型");
        let planning =
            ModelBuilder::new(&self.config, &catalog, &capacity, &decomposition).build()?;

        // Step 5: 求解
        tracing::debug!("Step 5: 求解");
        let solution = match solver.solve(&planning.model)? {
            SolverOutcome::Solved(solution) => solution,
            SolverOutcome::Infeasible => {
                tracing::warn!("模型不可行，開始診斷");
                let suspects = InfeasibilityDiagnoser::diagnose(&planning.model, solver)?;
                return Err(MpsError::Infeasible { suspects });
            }
        };
        tracing::debug!("求解狀態: {:?}，目標值 {:.2}", solution.status, solution.objective);

        // Step 6: 結果萃取
        tracing::debug!("Step 6: 結果萃取");
        let elapsed_ms = start_time.elapsed().as_millis();
        let plan = ResultsExtractor::new(&self.config, &capacity, &decomposition, &planning)
            .extract(&solution, elapsed_ms);

        tracing::info!(
            "主生產排程完成：達成率 {:.1}%，耗時 {:?}",
            plan.summary.fulfillment_pct,
            start_time.elapsed()
        );

        Ok(plan)
    }
}
