// ==========================================
// 班组排班优化系统 - good_lp 求解后端
// ==========================================
// 求解器: microlp（纯 Rust 分支定界）
// 说明: microlp 只返回最优/不可行/无界，不产出 FEASIBLE
// ==========================================

use crate::domain::types::SolverStatus;
use crate::engine::model::{Assignment, Model, Sense, VarDomain, VarId};
use crate::engine::solver::{SolveOutcome, SolverBackend};
use good_lp::solvers::microlp::microlp;
use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
    Variable,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct MicroLpBackend;

fn linear(handles: &[Variable], terms: &[(VarId, f64)]) -> Expression {
    terms
        .iter()
        .fold(Expression::from(0.0), |acc, (var, coef)| {
            acc + *coef * handles[var.index()]
        })
}

impl SolverBackend for MicroLpBackend {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(&self, model: &Model) -> SolveOutcome {
        let mut vars = ProblemVariables::new();
        let handles: Vec<Variable> = model
            .vars()
            .iter()
            .map(|def| {
                let definition = variable().min(def.lower).max(def.upper);
                let definition = match def.domain {
                    VarDomain::Binary => definition.integer(),
                    VarDomain::Continuous => definition,
                };
                vars.add(definition)
            })
            .collect();

        let objective = linear(&handles, model.objective());
        let mut problem = vars.maximise(objective).using(microlp);

        for c in model.constraints() {
            let lhs = linear(&handles, &c.terms);
            let rhs = c.rhs;
            let _ = match c.sense {
                Sense::Le => problem.add_constraint(constraint!(lhs <= rhs)),
                Sense::Ge => problem.add_constraint(constraint!(lhs >= rhs)),
                Sense::Eq => problem.add_constraint(constraint!(lhs == rhs)),
            };
        }

        match problem.solve() {
            Ok(solution) => SolveOutcome {
                status: SolverStatus::Optimal,
                assignment: Some(Assignment::new(
                    handles.iter().map(|v| solution.value(*v)).collect(),
                )),
            },
            Err(ResolutionError::Infeasible) => SolveOutcome::without_solution(SolverStatus::Infeasible),
            Err(ResolutionError::Unbounded) => SolveOutcome::without_solution(SolverStatus::Unbounded),
            Err(e) => {
                tracing::warn!(error = %e, "microlp 求解失败");
                SolveOutcome::without_solution(SolverStatus::NotSolved)
            }
        }
    }
}
