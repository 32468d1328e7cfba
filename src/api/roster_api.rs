// ==========================================
// 班组排班优化系统 - 人员侧 API
// ==========================================
// 职责: 班次申请修改、保存/丢弃、摘要查询、缺勤申请
// 说明: 申请与修改均作用于申请周（本周 + 2）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::summary::{application_summary, modification_summary, schedule_summary};
use crate::domain::codec::{canonicalize, ChangeRequest};
use crate::domain::roster::Roster;
use crate::domain::types::{LeaveMode, WeekKey};
use crate::domain::worker::WorkerId;
use crate::engine::clock::{Clock, APPLICATION_WEEK_OFFSET};
use crate::engine::disruption::DisruptionResolver;
use crate::engine::error::EngineError;
use crate::engine::leave::{validate_claim_dates, LeaveRequest};
use crate::engine::repositories::RosterRepositories;
use crate::i18n::{t, t_with_args};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 缺勤申请答复
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReply {
    pub accepted: bool,
    pub message: String,
}

impl ClaimReply {
    pub fn accepted(message: String) -> Self {
        Self {
            accepted: true,
            message,
        }
    }

    pub fn rejected(message: String) -> Self {
        Self {
            accepted: false,
            message,
        }
    }
}

// ==========================================
// RosterApi
// ==========================================
pub struct RosterApi {
    repos: RosterRepositories,
    resolver: Arc<DisruptionResolver>,
    clock: Arc<dyn Clock>,
}

impl RosterApi {
    pub fn new(
        repos: RosterRepositories,
        resolver: Arc<DisruptionResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repos,
            resolver,
            clock,
        }
    }

    fn worker_id(&self, username: &str) -> ApiResult<WorkerId> {
        self.repos
            .worker_repo
            .find_by_username(username)?
            .map(|w| w.id)
            .ok_or_else(|| ApiError::NotFound(format!("用户 {} 不存在", username)))
    }

    fn application_week(&self) -> WeekKey {
        self.clock.current_week_number(APPLICATION_WEEK_OFFSET)
    }

    fn application_roster(&self, username: &str) -> ApiResult<Roster> {
        let worker = self.worker_id(username)?;
        Ok(self
            .repos
            .roster_repo
            .get_roster(worker, self.application_week())?)
    }

    /// 将结构化变更请求叠加到待保存修改
    ///
    /// # 返回
    /// 修改摘要；周末返回截止提示且不做任何改动
    pub fn apply_change_request(&self, username: &str, request: &ChangeRequest) -> ApiResult<String> {
        if self.clock.is_weekend() {
            return Ok(t("roster.weekend_lockout"));
        }
        let mut roster = self.application_roster(username)?;
        let incoming = canonicalize(request);
        roster.modification = roster.modification.overlay(&incoming);
        self.repos.roster_repo.save(&mut roster)?;

        tracing::info!(user = username, week = %roster.week, "申请修改已记录");
        Ok(format!(
            "{}\n{}",
            t("roster.modification_recorded"),
            modification_summary(&roster)
        ))
    }

    /// 保存修改: 覆写申请并清空修改
    pub fn save_modification(&self, username: &str) -> ApiResult<String> {
        if self.clock.is_weekend() {
            return Ok(t("roster.weekend_lockout"));
        }
        let mut roster = self.application_roster(username)?;
        if !roster.commit_modification() {
            return Ok(t("roster.no_modification"));
        }
        self.repos.roster_repo.save(&mut roster)?;

        tracing::info!(user = username, week = %roster.week, "申请已更新");
        Ok(format!(
            "{}\n{}",
            t("roster.modification_saved"),
            application_summary(&roster)
        ))
    }

    /// 丢弃修改
    pub fn drop_modification(&self, username: &str) -> ApiResult<String> {
        let mut roster = self.application_roster(username)?;
        if !roster.has_pending_modification() {
            return Ok(t("roster.no_modification"));
        }
        roster.reset_modification();
        self.repos.roster_repo.save(&mut roster)?;
        Ok(t("roster.modification_dropped"))
    }

    pub fn get_application_summary(&self, username: &str) -> ApiResult<String> {
        Ok(application_summary(&self.application_roster(username)?))
    }

    pub fn get_modification_summary(&self, username: &str) -> ApiResult<String> {
        let roster = self.application_roster(username)?;
        if !roster.has_pending_modification() {
            return Ok(t("roster.no_modification"));
        }
        Ok(modification_summary(&roster))
    }

    /// 排班摘要
    ///
    /// # 参数
    /// - week_offset: 相对本周的偏移（0 = 本周）
    pub fn get_schedule_summary(&self, username: &str, week_offset: i64) -> ApiResult<String> {
        let worker = self.worker_id(username)?;
        let roster = self
            .repos
            .roster_repo
            .get_roster(worker, self.clock.current_week_number(week_offset))?;
        Ok(schedule_summary(&roster))
    }

    /// 缺勤申请
    ///
    /// 日期范围与额度拒绝以 accepted=false 返回
    pub fn claim_leave(&self, username: &str, request: &LeaveRequest) -> ApiResult<ClaimReply> {
        let worker = self.worker_id(username)?;
        let start = request.start.to_string();
        let end = request.end.to_string();

        if request.end < request.start {
            return Ok(ClaimReply::rejected(t_with_args(
                "claim.invalid_range",
                &[("start", &start)],
            )));
        }

        let window = match validate_claim_dates(&*self.clock, request.mode, request.start, request.end) {
            Ok(window) => window,
            Err(EngineError::DateRangeInvalid {
                mode,
                earliest,
                latest,
            }) => {
                tracing::info!(user = username, %mode, %earliest, "申请日期不在允许范围");
                let earliest = earliest.to_string();
                let message = match (mode, latest) {
                    (LeaveMode::Sickness, Some(latest)) => t_with_args(
                        "claim.sickness_out_of_range",
                        &[("earliest", &earliest), ("latest", &latest.to_string())],
                    ),
                    _ => t_with_args("claim.vacation_too_early", &[("earliest", &earliest)]),
                };
                return Ok(ClaimReply::rejected(message));
            }
            Err(e) => return Err(e.into()),
        };

        match request.mode {
            LeaveMode::Vacation => match self.resolver.claim_vacation(worker, &window, true) {
                Ok(outcome) => Ok(ClaimReply::accepted(t_with_args(
                    "claim.vacation_applied",
                    &[
                        ("start", &start),
                        ("end", &end),
                        ("remaining", &outcome.remaining.to_string()),
                    ],
                ))),
                Err(EngineError::QuotaExceeded {
                    requested,
                    remaining,
                }) => Ok(ClaimReply::rejected(t_with_args(
                    "claim.quota_exceeded",
                    &[
                        ("requested", &requested.to_string()),
                        ("remaining", &remaining.to_string()),
                    ],
                ))),
                Err(e) => Err(e.into()),
            },
            LeaveMode::Sickness => {
                let outcome = self.resolver.claim_sickness(worker, &window)?;
                let mut lines = vec![t_with_args(
                    "claim.sickness_applied",
                    &[("start", &start), ("end", &end)],
                )];
                if !outcome.substitutions.is_empty() {
                    lines.push(t_with_args(
                        "claim.substitutions",
                        &[("count", &outcome.substitutions.len().to_string())],
                    ));
                }
                if let Some(cascade) = &outcome.cascade {
                    lines.push(t_with_args(
                        "claim.rescheduled",
                        &[("date", &cascade.date.to_string())],
                    ));
                }
                Ok(ClaimReply::accepted(lines.join(" ")))
            }
        }
    }
}
