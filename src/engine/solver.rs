// ==========================================
// 班组排班优化系统 - 求解器网关
// ==========================================
// 职责: 以时间预算调用 ILP 后端，统一结果状态
// 说明: 后端为同步阻塞调用，放入 blocking 线程并受 timeout 约束
// ==========================================

use crate::domain::types::SolverStatus;
use crate::engine::model::{Assignment, Model};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 后端单次求解结果
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub status: SolverStatus,
    /// 仅 Optimal / Feasible 时存在
    pub assignment: Option<Assignment>,
}

impl SolveOutcome {
    pub fn without_solution(status: SolverStatus) -> Self {
        Self {
            status,
            assignment: None,
        }
    }
}

/// ILP 求解后端
pub trait SolverBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// 求解最大化模型（阻塞）
    fn solve(&self, model: &Model) -> SolveOutcome;
}

/// 网关求解报告
#[derive(Debug, Clone)]
pub struct SolveReport {
    pub status: SolverStatus,
    pub assignment: Option<Assignment>,
    pub objective: Option<f64>,
    pub wall_time: Duration,
    pub constraint_count: usize,
}

// ==========================================
// SolverGateway
// ==========================================
#[derive(Clone)]
pub struct SolverGateway {
    backend: Arc<dyn SolverBackend>,
}

impl SolverGateway {
    pub fn new(backend: Arc<dyn SolverBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// 同步求解入口
    ///
    /// # 参数
    /// - model: 已构建的模型
    /// - budget: 墙钟时间预算，超时记为 NOT_SOLVED
    pub fn solve(&self, model: Model, budget: Duration) -> SolveReport {
        let started = Instant::now();
        let constraint_count = model.num_constraints();

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            // 已在运行时中
            tokio::task::block_in_place(|| handle.block_on(self.solve_async(model, budget)))
        } else {
            match tokio::runtime::Runtime::new() {
                Ok(rt) => {
                    let report = rt.block_on(self.solve_async(model, budget));
                    // 超时后后端线程仍可能在运行，不等待其结束
                    rt.shutdown_background();
                    report
                }
                Err(e) => {
                    tracing::error!(error = %e, "创建求解运行时失败");
                    SolveReport {
                        status: SolverStatus::NotSolved,
                        assignment: None,
                        objective: None,
                        wall_time: started.elapsed(),
                        constraint_count,
                    }
                }
            }
        }
    }

    async fn solve_async(&self, model: Model, budget: Duration) -> SolveReport {
        let started = Instant::now();
        let constraint_count = model.num_constraints();
        let model = Arc::new(model);

        let backend = Arc::clone(&self.backend);
        let task_model = Arc::clone(&model);
        let task = tokio::task::spawn_blocking(move || backend.solve(&task_model));

        let outcome = match tokio::time::timeout(budget, task).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_err)) => {
                tracing::error!(error = %join_err, backend = self.backend.name(), "求解线程异常退出");
                SolveOutcome::without_solution(SolverStatus::NotSolved)
            }
            Err(_) => {
                tracing::warn!(
                    budget_ms = budget.as_millis() as u64,
                    backend = self.backend.name(),
                    "求解超出时间预算"
                );
                SolveOutcome::without_solution(SolverStatus::NotSolved)
            }
        };

        let objective = outcome
            .assignment
            .as_ref()
            .map(|a| model.objective_value(a.values()));
        let wall_time = started.elapsed();

        tracing::info!(
            status = %outcome.status,
            backend = self.backend.name(),
            wall_time_ms = wall_time.as_millis() as u64,
            constraint_count,
            objective = ?objective,
            "求解结束"
        );

        SolveReport {
            status: outcome.status,
            assignment: outcome.assignment,
            objective,
            wall_time,
            constraint_count,
        }
    }
}
