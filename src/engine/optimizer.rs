// ==========================================
// 班组排班优化系统 - 优化控制器
// ==========================================
// 职责: 装载窗口台账 -> 构建模型 -> 限时求解 -> 回写
// 红线: 仅 OPTIMAL 写入台账，其余状态原样返回且不改动数据
// ==========================================

use crate::config::optimizer_config::OptimizerConfig;
use crate::domain::roster::Roster;
use crate::domain::types::{DayCategory, RunKind, Shift, SolverStatus, WeekKey, DAYS_PER_WEEK};
use crate::engine::clock::Clock;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::model::Assignment;
use crate::engine::model_builder::{
    BuildParams, RollingHorizonModelBuilder, SlackPenalty, VariableIndex, WindowWorker,
    WINDOW_DAYS,
};
use crate::engine::repositories::RosterRepositories;
use crate::engine::solver::SolverGateway;
use crate::repository::OptimizationRun;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// 前瞻排班的截断日: 第一周（下周）全部固定
pub const PLAN_AHEAD_CUT_DAY: usize = DAYS_PER_WEEK + 1;

/// 一次优化运行的结果
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationReport {
    pub run_id: String,
    pub kind: RunKind,
    pub status: SolverStatus,
    pub wall_time: Duration,
    pub constraint_count: usize,
    pub rosters_written: usize,
}

impl OptimizationReport {
    pub fn is_optimal(&self) -> bool {
        self.status == SolverStatus::Optimal
    }

    /// 非最优状态映射为错误
    pub fn into_result(self) -> EngineResult<Self> {
        match self.status {
            SolverStatus::Optimal => Ok(self),
            SolverStatus::Feasible => Err(EngineError::SolverFeasibleOnly),
            SolverStatus::Infeasible => Err(EngineError::SolverInfeasible),
            SolverStatus::Unbounded => Err(EngineError::SolverUnbounded),
            SolverStatus::NotSolved => Err(EngineError::SolverNotSolved),
        }
    }
}

// ==========================================
// OptimizerController
// ==========================================
pub struct OptimizerController {
    repos: RosterRepositories,
    gateway: SolverGateway,
    clock: Arc<dyn Clock>,
    config: OptimizerConfig,
}

impl OptimizerController {
    pub fn new(
        repos: RosterRepositories,
        gateway: SolverGateway,
        clock: Arc<dyn Clock>,
        config: OptimizerConfig,
    ) -> Self {
        Self {
            repos,
            gateway,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// 前瞻排班: 窗口 [下周, 申请周]，仅写入申请周
    ///
    /// # 参数
    /// - headcount: 参与求解的人数上限
    /// - multiplier: 在岗/备班下限倍率
    pub fn plan_ahead(&self, headcount: usize, multiplier: u32) -> EngineResult<OptimizationReport> {
        let window_start = self.clock.current_week_number(1);
        self.run(
            RunKind::PlanAhead,
            window_start,
            PLAN_AHEAD_CUT_DAY,
            headcount,
            multiplier,
            None,
        )
    }

    /// 缺勤后重排: 窗口 [本周, 下周]，cut_day_index 之前固定
    ///
    /// # 参数
    /// - cut_day_index: 1 基窗口日（1..=14）
    pub fn reoptimize_after_disruption(
        &self,
        headcount: usize,
        multiplier: u32,
        cut_day_index: usize,
    ) -> EngineResult<OptimizationReport> {
        let window_start = self.clock.current_week_number(0);
        let slack = SlackPenalty {
            category: self.config.slack_penalty,
            shift: self.config.shift_slack_penalty,
        };
        self.run(
            RunKind::Reoptimize,
            window_start,
            cut_day_index,
            headcount,
            multiplier,
            Some(slack),
        )
    }

    fn run(
        &self,
        kind: RunKind,
        window_start: WeekKey,
        cut_day: usize,
        headcount: usize,
        multiplier: u32,
        slack: Option<SlackPenalty>,
    ) -> EngineResult<OptimizationReport> {
        let span = tracing::info_span!(
            "optimize",
            kind = kind.as_str(),
            window = %window_start,
            cut_day,
            headcount,
            multiplier
        );
        let _guard = span.enter();

        let workers = self.load_window(window_start, headcount)?;
        let params = BuildParams {
            cut_day,
            multiplier,
            min_staffing: self.config.min_staffing,
            slack,
        };
        let built = RollingHorizonModelBuilder::new(&workers, &params)?.build();
        let index = built.index;
        let report = self.gateway.solve(built.model, self.config.time_budget);

        let mut written = Ok(0);
        if report.status == SolverStatus::Optimal {
            if let Some(assignment) = report.assignment.as_ref() {
                written = self.write_back(&workers, &index, assignment, cut_day);
            }
        } else {
            tracing::warn!(status = %report.status, "求解未达最优，不写入台账");
        }

        let outcome = OptimizationReport {
            run_id: Uuid::new_v4().to_string(),
            kind,
            status: report.status,
            wall_time: report.wall_time,
            constraint_count: report.constraint_count,
            rosters_written: *written.as_ref().unwrap_or(&0),
        };
        self.record_run(&outcome, window_start, cut_day);

        let rosters_written = written?;
        tracing::info!(
            run_id = %outcome.run_id,
            status = %outcome.status,
            rosters_written,
            "优化运行完成"
        );
        Ok(outcome)
    }

    /// 装载窗口两周台账
    ///
    /// 取两周均有台账的前 headcount 名人员（按 id）
    fn load_window(&self, window_start: WeekKey, headcount: usize) -> EngineResult<Vec<WindowWorker>> {
        let excluded = self.config.excluded_role;
        let first = self.repos.roster_repo.list_rosters(window_start, excluded)?;
        let mut second: HashMap<_, Roster> = self
            .repos
            .roster_repo
            .list_rosters(window_start.next(), excluded)?
            .into_iter()
            .map(|r| (r.worker_id, r))
            .collect();

        let total = first.len();
        let workers: Vec<WindowWorker> = first
            .into_iter()
            .filter_map(|week1| {
                second.remove(&week1.worker_id).map(|week2| WindowWorker {
                    worker_id: week1.worker_id,
                    weeks: [week1, week2],
                })
            })
            .take(headcount)
            .collect();

        if workers.len() < total.min(headcount) {
            tracing::warn!(
                window = %window_start,
                loaded = workers.len(),
                "部分人员缺少第二周台账，已跳过"
            );
        }
        Ok(workers)
    }

    /// 将 cut_day 及之后的解写回对应周台账（单事务）
    fn write_back(
        &self,
        workers: &[WindowWorker],
        index: &VariableIndex,
        assignment: &Assignment,
        cut_day: usize,
    ) -> EngineResult<usize> {
        let first_free = cut_day - 1;
        let touched_weeks: Vec<usize> = (first_free / DAYS_PER_WEEK..WINDOW_DAYS / DAYS_PER_WEEK).collect();

        let mut updated: Vec<Roster> = Vec::with_capacity(workers.len() * touched_weeks.len());
        for (w, worker) in workers.iter().enumerate() {
            for k in touched_weeks.iter().copied() {
                let mut roster = worker.weeks[k].clone();
                for day in 0..DAYS_PER_WEEK {
                    let d = k * DAYS_PER_WEEK + day;
                    if d < first_free {
                        continue;
                    }
                    apply_solution_day(&mut roster, day, w, d, index, assignment);
                }
                roster.published = true;
                updated.push(roster);
            }
        }

        self.repos.roster_repo.save_batch(&mut updated)?;
        Ok(updated.len())
    }

    fn record_run(&self, report: &OptimizationReport, window_start: WeekKey, cut_day: usize) {
        let run = OptimizationRun {
            run_id: report.run_id.clone(),
            kind: report.kind,
            status: report.status,
            window_start: window_start.first_day(),
            cut_day_index: cut_day,
            wall_time_ms: report.wall_time.as_millis() as u64,
            constraint_count: report.constraint_count,
            rosters_written: report.rosters_written,
        };
        if let Err(e) = self.repos.run_repo.insert(&run) {
            tracing::warn!(run_id = %run.run_id, error = %e, "优化运行审计写入失败");
        }
    }
}

/// 将一天的解写入台账（整日 setter）
fn apply_solution_day(
    roster: &mut Roster,
    day: usize,
    w: usize,
    window_day: usize,
    index: &VariableIndex,
    assignment: &Assignment,
) {
    let category = DayCategory::ALL
        .into_iter()
        .find(|c| assignment.is_set(index.category(w, window_day, *c)));

    match category {
        Some(DayCategory::Work) => {
            let shift = Shift::ALL
                .into_iter()
                .find(|s| assignment.is_set(index.shift(w, window_day, *s)));
            match shift {
                Some(shift) => roster.assign_shift(day, shift),
                None => roster.set_category(day, Some(DayCategory::Work)),
            }
        }
        Some(other) => roster.set_category(day, Some(other)),
        None => {
            tracing::warn!(worker = %roster.worker_id, week = %roster.week, day, "解中该日无类别，保持原值");
        }
    }
}
