// ==========================================
// 班组排班优化系统 - 缺勤处理器
// ==========================================
// 职责: 休假/病假申请落账，病假替班与休息日召回级联
// 红线: 额度校验先于任何写入；一次申请的全部台账单事务保存
// ==========================================

use crate::domain::roster::Roster;
use crate::domain::types::{DayCategory, LeaveMode, Shift, WeekKey, WorkerRole, DAYS_PER_WEEK};
use crate::domain::worker::WorkerId;
use crate::engine::clock::{Clock, APPLICATION_WEEK_OFFSET};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::fairness::{pick_day_off_worker, select_substitute, SubstituteCandidate};
use crate::engine::leave::ClaimWindow;
use crate::engine::optimizer::{OptimizationReport, OptimizerController};
use crate::engine::repositories::RosterRepositories;
use crate::repository::RosterRepository;
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// 休假申请结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VacationOutcome {
    pub days: u32,
    pub weeks_touched: usize,
    /// 授予后（或取消前）的年度剩余额度
    pub remaining: u32,
}

/// 一次备班替班
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub date: NaiveDate,
    pub shift: Shift,
    pub substitute: WorkerId,
}

/// 无备班可用时的级联处理
#[derive(Debug, Clone)]
pub struct Cascade {
    pub date: NaiveDate,
    pub shift: Shift,
    /// 被召回的休息人员（无人可召回时为 None）
    pub called_in: Option<WorkerId>,
    pub report: OptimizationReport,
}

/// 病假申请结果
#[derive(Debug, Clone, Default)]
pub struct SicknessOutcome {
    pub days_marked: usize,
    pub substitutions: Vec<Substitution>,
    pub cascade: Option<Cascade>,
}

// ==========================================
// WorkingSet - 单次申请的台账工作集
// ==========================================
struct WorkingSet<'a> {
    repo: &'a RosterRepository,
    excluded: Option<WorkerRole>,
    rosters: BTreeMap<(WeekKey, WorkerId), Roster>,
    loaded_weeks: HashSet<WeekKey>,
    dirty: BTreeSet<(WeekKey, WorkerId)>,
}

impl<'a> WorkingSet<'a> {
    fn new(repo: &'a RosterRepository, excluded: Option<WorkerRole>) -> Self {
        Self {
            repo,
            excluded,
            rosters: BTreeMap::new(),
            loaded_weeks: HashSet::new(),
            dirty: BTreeSet::new(),
        }
    }

    /// 装载某周全部参与排班人员的台账（已缓存的不覆盖）
    fn load_week(&mut self, week: WeekKey) -> EngineResult<()> {
        if self.loaded_weeks.insert(week) {
            for roster in self.repo.list_rosters(week, self.excluded)? {
                self.rosters.entry((week, roster.worker_id)).or_insert(roster);
            }
        }
        Ok(())
    }

    fn roster(&mut self, worker: WorkerId, week: WeekKey) -> EngineResult<&Roster> {
        Ok(&*self.fetch(worker, week)?)
    }

    fn roster_mut(&mut self, worker: WorkerId, week: WeekKey) -> EngineResult<&mut Roster> {
        self.dirty.insert((week, worker));
        self.fetch(worker, week)
    }

    fn fetch(&mut self, worker: WorkerId, week: WeekKey) -> EngineResult<&mut Roster> {
        Ok(match self.rosters.entry((week, worker)) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(v) => v.insert(self.repo.get_roster(worker, week)?),
        })
    }

    /// 可选查询（上周台账可能不存在）
    fn find(&mut self, worker: WorkerId, week: WeekKey) -> EngineResult<Option<&Roster>> {
        if !self.rosters.contains_key(&(week, worker)) {
            match self.repo.find(worker, week)? {
                Some(roster) => {
                    self.rosters.insert((week, worker), roster);
                }
                None => return Ok(None),
            }
        }
        Ok(self.rosters.get(&(week, worker)))
    }

    /// 某周当天为指定类别的人员
    fn workers_on(&self, week: WeekKey, day: usize, category: DayCategory, except: WorkerId) -> Vec<WorkerId> {
        self.rosters
            .range((week, WorkerId(i64::MIN))..=(week, WorkerId(i64::MAX)))
            .filter(|((_, id), r)| *id != except && r.category(day) == Some(category))
            .map(|((_, id), _)| *id)
            .collect()
    }

    /// 清除某周 day 之后的召回审计位
    fn clear_call_ins_after(&mut self, week: WeekKey, day: usize) {
        for ((w, id), roster) in self
            .rosters
            .range_mut((week, WorkerId(i64::MIN))..=(week, WorkerId(i64::MAX)))
        {
            let before = (roster.reserve_call_in_days, roster.day_off_call_in_days);
            let flags = (roster.reserve_call_in, roster.day_off_call_in);
            roster.clear_call_ins_after(day);
            if before != (roster.reserve_call_in_days, roster.day_off_call_in_days)
                || flags != (roster.reserve_call_in, roster.day_off_call_in)
            {
                self.dirty.insert((*w, *id));
            }
        }
    }

    /// 单事务保存全部改动
    fn commit(mut self) -> EngineResult<usize> {
        let mut changed: Vec<Roster> = self
            .dirty
            .iter()
            .filter_map(|key| self.rosters.remove(key))
            .collect();
        if changed.is_empty() {
            return Ok(0);
        }
        self.repo.save_batch(&mut changed)?;
        Ok(changed.len())
    }
}

// ==========================================
// DisruptionResolver
// ==========================================
pub struct DisruptionResolver {
    repos: RosterRepositories,
    optimizer: Arc<OptimizerController>,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
}

impl DisruptionResolver {
    pub fn new(
        repos: RosterRepositories,
        optimizer: Arc<OptimizerController>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repos,
            optimizer,
            clock,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// 注入随机源（测试可复现）
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 休假申请/撤销
    ///
    /// # 参数
    /// - grant: true 授予，false 撤销（休假日恢复为未排）
    ///
    /// # 错误
    /// - `EngineError::QuotaExceeded`: 年度额度不足（未写入任何数据）
    /// - `RepositoryError::NotFound`: 涉及的某周台账不存在（未写入任何数据）
    pub fn claim_vacation(
        &self,
        worker: WorkerId,
        window: &ClaimWindow,
        grant: bool,
    ) -> EngineResult<VacationOutcome> {
        let cap = self.optimizer.config().vacation_cap;
        let length = window.length();
        let segments = window.segments();

        // 先装载全部涉及周的台账，缺周即失败
        let mut rosters = Vec::with_capacity(segments.len());
        for segment in &segments {
            rosters.push(self.repos.roster_repo.get_roster(worker, segment.week)?);
        }

        // 额度按 ISO 年分别计算；已是休假的日期不重复计入
        let mut fresh_by_year: BTreeMap<i32, u32> = BTreeMap::new();
        for (segment, roster) in segments.iter().zip(&rosters) {
            let fresh = segment
                .days
                .iter()
                .filter(|day| roster.category(**day) != Some(DayCategory::Vacation))
                .count() as u32;
            *fresh_by_year.entry(segment.week.year()).or_insert(0) += fresh;
        }
        let mut claimed_by_year: BTreeMap<i32, u32> = BTreeMap::new();
        for year in fresh_by_year.keys().copied() {
            let claimed = self.repos.roster_repo.count_vacation_days(worker, year)?;
            claimed_by_year.insert(year, claimed);
        }

        if grant {
            for (year, fresh) in &fresh_by_year {
                let claimed = claimed_by_year.get(year).copied().unwrap_or(0);
                if claimed + fresh > cap {
                    let remaining = cap.saturating_sub(claimed);
                    tracing::info!(worker = %worker, year, claimed, requested = fresh, remaining, "休假额度不足");
                    return Err(EngineError::QuotaExceeded {
                        requested: *fresh,
                        remaining,
                    });
                }
            }
        }

        for (segment, roster) in segments.iter().zip(rosters.iter_mut()) {
            for day in segment.days.iter().copied() {
                if grant {
                    roster.mark_leave(day, LeaveMode::Vacation);
                } else if roster.category(day) == Some(DayCategory::Vacation) {
                    roster.set_category(day, None);
                }
            }
        }
        self.repos.roster_repo.save_batch(&mut rosters)?;

        // 剩余额度以申请起始周所在年份为准
        let first_year = window.first_week().year();
        let claimed = claimed_by_year.get(&first_year).copied().unwrap_or(0);
        let remaining = if grant {
            let fresh = fresh_by_year.get(&first_year).copied().unwrap_or(0);
            cap.saturating_sub(claimed + fresh)
        } else {
            cap.saturating_sub(claimed)
        };
        tracing::info!(
            worker = %worker,
            grant,
            start = %window.start,
            end = %window.end,
            weeks = segments.len(),
            "休假申请已处理"
        );
        Ok(VacationOutcome {
            days: length,
            weeks_touched: segments.len(),
            remaining,
        })
    }

    /// 病假申请
    ///
    /// 申请周之前的日期逐日处理（替班或级联），申请周内的日期仅标记病假
    ///
    /// # 错误
    /// - `EngineError::DateRangeInvalid`: 起始日早于本周周一（未写入任何数据）
    /// - `EngineError::InvalidWindow`: 级联重排切点越出窗口（未写入任何数据）
    pub fn claim_sickness(&self, worker: WorkerId, window: &ClaimWindow) -> EngineResult<SicknessOutcome> {
        let current = self.clock.current_week_number(0);
        let application_start = self
            .clock
            .current_week_number(APPLICATION_WEEK_OFFSET)
            .first_day();
        let config = self.optimizer.config();

        // 已过去的周不可追溯
        if window.start < current.first_day() {
            return Err(EngineError::DateRangeInvalid {
                mode: LeaveMode::Sickness,
                earliest: current.first_day(),
                latest: None,
            });
        }

        let mut ws = WorkingSet::new(&self.repos.roster_repo, config.excluded_role);
        let mut outcome = SicknessOutcome::default();
        let mut extra_call_ins: HashMap<WorkerId, u32> = HashMap::new();
        let mut cascade_at: Option<(NaiveDate, usize, Shift, Option<WorkerId>)> = None;

        for date in window.dates() {
            let week = WeekKey::containing(date);
            let day = date.weekday().num_days_from_monday() as usize;

            // 申请周（未发布）或级联之后: 仅标记
            if date >= application_start || cascade_at.is_some() {
                ws.roster_mut(worker, week)?.mark_leave(day, LeaveMode::Sickness);
                outcome.days_marked += 1;
                continue;
            }

            let held = ws.roster(worker, week)?.held_shift(day);
            ws.roster_mut(worker, week)?.mark_leave(day, LeaveMode::Sickness);
            outcome.days_marked += 1;

            let Some(shift) = held else {
                tracing::debug!(worker = %worker, %date, "非上班日，直接标记病假");
                continue;
            };

            ws.load_week(week)?;
            let candidates = self.reserve_candidates(&mut ws, worker, week, day, &extra_call_ins)?;
            let picked = select_substitute(shift, &candidates, &mut *self.rng());

            match picked {
                Some(substitute) => {
                    ws.roster_mut(substitute, week)?.record_reserve_call_in(day, shift);
                    *extra_call_ins.entry(substitute).or_insert(0) += 1;
                    tracing::info!(worker = %worker, substitute = %substitute, %date, %shift, "备班替班");
                    outcome.substitutions.push(Substitution {
                        date,
                        shift,
                        substitute,
                    });
                }
                None => {
                    let cut = reoptimize_cut(current, week, day)?;
                    let no_cover = EngineError::NoCoverageAvailable { week, day };
                    tracing::warn!(worker = %worker, %date, %shift, reason = %no_cover, "无可用备班，转入休息日召回");

                    let off = ws.workers_on(week, day, DayCategory::Off, worker);
                    let called_in = pick_day_off_worker(&off, &mut *self.rng());
                    match called_in {
                        Some(id) => ws.roster_mut(id, week)?.record_day_off_call_in(day, shift),
                        None => tracing::warn!(%date, %shift, "无休息人员可召回，交由重排处理"),
                    }
                    ws.clear_call_ins_after(week, day);
                    cascade_at = Some((date, cut, shift, called_in));
                }
            }
        }

        let written = ws.commit()?;
        tracing::info!(worker = %worker, rosters_written = written, days = outcome.days_marked, "病假台账已保存");

        if let Some((date, cut, shift, called_in)) = cascade_at {
            let report = self
                .optimizer
                .reoptimize_after_disruption(config.headcount, config.multiplier, cut)?
                .into_result()?;
            outcome.cascade = Some(Cascade {
                date,
                shift,
                called_in,
                report,
            });
        }
        Ok(outcome)
    }

    /// 当天备班候选人
    fn reserve_candidates(
        &self,
        ws: &mut WorkingSet<'_>,
        sick: WorkerId,
        week: WeekKey,
        day: usize,
        extra_call_ins: &HashMap<WorkerId, u32>,
    ) -> EngineResult<Vec<SubstituteCandidate>> {
        let reserves = ws.workers_on(week, day, DayCategory::Reserve, sick);
        let mut candidates = Vec::with_capacity(reserves.len());
        for worker_id in reserves {
            let worked_night_before = if day > 0 {
                ws.roster(worker_id, week)?.worked_night(day - 1)
            } else {
                ws.find(worker_id, week.prev())?
                    .map(|r| r.worked_night(DAYS_PER_WEEK - 1))
                    .unwrap_or(false)
            };
            let call_in_days = self
                .repos
                .roster_repo
                .count_reserve_call_in_days(worker_id, week.year())?
                + extra_call_ins.get(&worker_id).copied().unwrap_or(0);
            candidates.push(SubstituteCandidate {
                worker_id,
                call_in_days,
                worked_night_before,
            });
        }
        Ok(candidates)
    }
}

/// 级联重排切点（1-based，覆盖 [本周, 下周] 两周窗口）
fn reoptimize_cut(current: WeekKey, week: WeekKey, day: usize) -> EngineResult<usize> {
    let cut = week.weeks_since(current) * DAYS_PER_WEEK as i64 + day as i64 + 1;
    let window_days = (2 * DAYS_PER_WEEK) as i64;
    if !(1..=window_days).contains(&cut) {
        return Err(EngineError::InvalidWindow(format!(
            "切点 {} 越出窗口: week={}, current={}",
            cut, week, current
        )));
    }
    Ok(cut as usize)
}
