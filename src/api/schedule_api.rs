// ==========================================
// 班组排班优化系统 - 管理侧 API
// ==========================================
// 职责: 每周前瞻排班、缺勤后重排、驳回休假
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::ledger::is_uniform;
use crate::domain::types::{LeaveMode, ShiftMark, SolverStatus};
use crate::engine::clock::{Clock, APPLICATION_WEEK_OFFSET};
use crate::engine::disruption::DisruptionResolver;
use crate::engine::leave::ClaimWindow;
use crate::engine::optimizer::{OptimizationReport, OptimizerController};
use crate::engine::repositories::RosterRepositories;
use crate::i18n::{t, t_with_args};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// 求解状态对应的提示
pub fn solver_status_message(status: SolverStatus) -> String {
    t(&format!("solver.{}", status.as_str()))
}

/// 排班运行答复
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleRunReply {
    pub report: OptimizationReport,
    /// 申请周未提交申请的用户名
    pub missing_applications: Vec<String>,
    pub message: String,
}

// ==========================================
// ScheduleApi
// ==========================================
pub struct ScheduleApi {
    repos: RosterRepositories,
    optimizer: Arc<OptimizerController>,
    resolver: Arc<DisruptionResolver>,
    clock: Arc<dyn Clock>,
}

impl ScheduleApi {
    pub fn new(
        repos: RosterRepositories,
        optimizer: Arc<OptimizerController>,
        resolver: Arc<DisruptionResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repos,
            optimizer,
            resolver,
            clock,
        }
    }

    /// 申请周未提交申请（全为 0）的用户
    pub fn users_without_application(&self) -> ApiResult<Vec<String>> {
        let week = self.clock.current_week_number(APPLICATION_WEEK_OFFSET);
        let excluded = self.optimizer.config().excluded_role;
        let names: HashMap<_, _> = self
            .repos
            .worker_repo
            .list_all()?
            .into_iter()
            .map(|w| (w.id, w.username))
            .collect();

        Ok(self
            .repos
            .roster_repo
            .list_rosters(week, excluded)?
            .into_iter()
            .filter(|r| is_uniform(r.application.marks(), ShiftMark::NotApplied))
            .filter_map(|r| names.get(&r.worker_id).cloned())
            .collect())
    }

    /// 每周前瞻排班（申请周）
    ///
    /// 缺少申请的用户仅作提示，不阻止求解
    pub fn optimize_schedule(&self) -> ApiResult<ScheduleRunReply> {
        let missing = self.users_without_application()?;
        let config = self.optimizer.config();
        if !missing.is_empty() {
            tracing::warn!(users = ?missing, "部分用户未提交申请");
        }

        let report = self.optimizer.plan_ahead(config.headcount, config.multiplier)?;
        let mut lines = Vec::new();
        if missing.is_empty() {
            lines.push(t("schedule.all_applied"));
        } else {
            lines.push(t_with_args(
                "schedule.missing_applications",
                &[("users", &missing.join(", "))],
            ));
        }
        lines.push(solver_status_message(report.status));

        Ok(ScheduleRunReply {
            report,
            missing_applications: missing,
            message: lines.join("\n"),
        })
    }

    /// 手动触发重排
    ///
    /// # 参数
    /// - cut_day_index: 1 基窗口日（本周周一 = 1）
    pub fn reoptimize(&self, cut_day_index: usize) -> ApiResult<ScheduleRunReply> {
        let config = self.optimizer.config();
        let report = self.optimizer.reoptimize_after_disruption(
            config.headcount,
            config.multiplier,
            cut_day_index,
        )?;
        let message = solver_status_message(report.status);
        Ok(ScheduleRunReply {
            report,
            missing_applications: Vec::new(),
            message,
        })
    }

    /// 驳回休假: 区间内的休假日恢复为未排
    pub fn reject_vacation(&self, username: &str, start: NaiveDate, end: NaiveDate) -> ApiResult<String> {
        let worker = self
            .repos
            .worker_repo
            .find_by_username(username)?
            .ok_or_else(|| ApiError::NotFound(format!("用户 {} 不存在", username)))?;
        let window = ClaimWindow::new(LeaveMode::Vacation, start, end)?;
        self.resolver.claim_vacation(worker.id, &window, false)?;

        tracing::info!(user = username, %start, %end, "休假已驳回");
        Ok(t_with_args(
            "claim.vacation_canceled",
            &[
                ("user", username),
                ("start", &start.to_string()),
                ("end", &end.to_string()),
            ],
        ))
    }
}
