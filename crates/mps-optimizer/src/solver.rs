//! 求解器介面與 HiGHS 後端

use highs::{Col, HighsModelStatus, RowProblem, Sense};
use mps_core::{ConstraintClass, MpsError, Result, SolveStatus, SolverConfig};

use crate::model::MilpModel;

/// 可行性檢查容許誤差
pub const FEASIBILITY_TOLERANCE: f64 = 1e-5;

/// 求解結果
#[derive(Debug, Clone)]
pub struct SolverSolution {
    pub status: SolveStatus,
    /// 依欄索引排列的變數值
    pub values: Vec<f64>,
    pub objective: f64,
}

/// 求解結果
#[derive(Debug, Clone)]
pub enum SolverOutcome {
    /// 最佳解或時間上限內的可行解
    Solved(SolverSolution),
    /// 模型不可行
    Infeasible,
}

/// MILP 求解器
pub trait MilpSolver {
    /// 求解（阻塞直到完成或達時間上限）
    fn solve(&self, model: &MilpModel) -> Result<SolverOutcome>;
}

/// HiGHS 求解器
#[derive(Debug, Clone)]
pub struct HighsSolver {
    config: SolverConfig,
}

impl HighsSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl MilpSolver for HighsSolver {
    fn solve(&self, model: &MilpModel) -> Result<SolverOutcome> {
        if model.num_columns() == 0 {
            return Ok(SolverOutcome::Solved(SolverSolution {
                status: SolveStatus::Optimal,
                values: Vec::new(),
                objective: 0.0,
            }));
        }

        let mut problem = RowProblem::new();
        let columns: Vec<Col> = model
            .columns()
            .iter()
            .map(|c| {
                if c.integer {
                    problem.add_integer_column(c.cost, c.lower..=c.upper)
                } else {
                    problem.add_column(c.cost, c.lower..=c.upper)
                }
            })
            .collect();

        for row in model.rows() {
            let terms: Vec<(Col, f64)> = row
                .terms
                .iter()
                .map(|(id, coef)| (columns[id.0], *coef))
                .collect();
            problem.add_row(row.lower..=row.upper, terms);
        }

        let mut highs = problem.optimise(Sense::Minimise);
        highs.set_option("output_flag", false);
        highs.set_option("time_limit", self.config.time_limit_secs);
        highs.set_option("threads", self.config.threads as i32);
        if let Some(gap) = self.config.mip_rel_gap {
            highs.set_option("mip_rel_gap", gap);
        }

        tracing::debug!(
            "呼叫 HiGHS：時間上限 {} 秒，執行緒 {}",
            self.config.time_limit_secs,
            self.config.threads
        );

        let solved = highs
            .try_solve()
            .map_err(|status| MpsError::SolverError(format!("HiGHS 執行失敗: {:?}", status)))?;

        let status = match solved.status() {
            HighsModelStatus::Optimal | HighsModelStatus::ModelEmpty => SolveStatus::Optimal,
            HighsModelStatus::ReachedTimeLimit | HighsModelStatus::ReachedIterationLimit => {
                SolveStatus::TimeLimited
            }
            // 變數皆有下界且成本非負，不會無界
            HighsModelStatus::Infeasible | HighsModelStatus::UnboundedOrInfeasible => {
                return Ok(SolverOutcome::Infeasible);
            }
            other => {
                return Err(MpsError::SolverError(format!("HiGHS 回傳狀態 {:?}", other)));
            }
        };

        let values = solved.get_solution().columns().to_vec();
        if status == SolveStatus::TimeLimited && !model.is_feasible(&values, 1e-4) {
            return Err(MpsError::SolverError(
                "時間上限內未找到可行解".to_string(),
            ));
        }

        Ok(SolverOutcome::Solved(SolverSolution {
            status,
            objective: model.objective_value(&values),
            values,
        }))
    }
}

/// 不可行診斷
///
/// 逐一移除可疑的約束類別後重新求解，能恢復可行的類別即為疑似衝突來源。
pub struct InfeasibilityDiagnoser;

impl InfeasibilityDiagnoser {
    pub fn diagnose<S: MilpSolver + ?Sized>(
        model: &MilpModel,
        solver: &S,
    ) -> Result<Vec<ConstraintClass>> {
        let present: Vec<ConstraintClass> = ConstraintClass::SUSPECTS
            .into_iter()
            .filter(|class| model.count_class(*class) > 0)
            .collect();

        let mut suspects = Vec::new();
        for class in &present {
            let relaxed = model.without_classes(&[*class]);
            if let SolverOutcome::Solved(_) = solver.solve(&relaxed)? {
                tracing::debug!("移除 {:?} 後可行", class);
                suspects.push(*class);
            }
        }

        // 單一類別無法解釋時，回報同時移除後可行的組合
        if suspects.is_empty() && !present.is_empty() {
            let relaxed = model.without_classes(&present);
            if let SolverOutcome::Solved(_) = solver.solve(&relaxed)? {
                suspects = present;
            }
        }

        tracing::warn!("不可行診斷結果：{}", ConstraintClass::describe_all(&suspects));
        Ok(suspects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solver() -> HighsSolver {
        HighsSolver::new(SolverConfig {
            time_limit_secs: 10.0,
            threads: 1,
            mip_rel_gap: None,
        })
    }

    #[test]
    fn test_solve_small_mip() {
        // min -x - y, x + 2y ≤ 4.5, x ≤ 3, y 整數
        let mut model = MilpModel::new();
        let x = model.add_column(-1.0, 0.0, 3.0);
        let y = model.add_integer_column(-1.0, 0.0, 10.0);
        model.add_le(ConstraintClass::ResourceCapacity, vec![(x, 1.0), (y, 2.0)], 4.5);

        let SolverOutcome::Solved(solution) = solver().solve(&model).unwrap() else {
            panic!("應可行");
        };

        assert_eq!(solution.status, SolveStatus::Optimal);
        assert!((solution.values[x.0] - 3.0).abs() < 1e-6);
        assert!((solution.values[y.0] - 0.0).abs() < 1e-6);
        assert!((solution.objective + 3.0).abs() < 1e-6);
        assert!(model.is_feasible(&solution.values, FEASIBILITY_TOLERANCE));
    }

    #[test]
    fn test_empty_model() {
        let model = MilpModel::new();
        assert!(matches!(
            solver().solve(&model).unwrap(),
            SolverOutcome::Solved(_)
        ));
    }

    #[test]
    fn test_infeasible_and_diagnosis() {
        // x = 5（需求），x ≤ 3（產能），x ≤ 10（模箱）
        let mut model = MilpModel::new();
        let x = model.add_column(0.0, 0.0, f64::INFINITY);
        model.add_eq(ConstraintClass::DemandBalance, vec![(x, 1.0)], 5.0);
        model.add_le(ConstraintClass::ResourceCapacity, vec![(x, 1.0)], 3.0);
        model.add_le(ConstraintClass::MouldBox, vec![(x, 1.0)], 10.0);

        assert!(matches!(
            solver().solve(&model).unwrap(),
            SolverOutcome::Infeasible
        ));

        let suspects = InfeasibilityDiagnoser::diagnose(&model, &solver()).unwrap();
        assert_eq!(suspects, vec![ConstraintClass::ResourceCapacity]);
    }
}
