// ==========================================
// 班组排班优化系统 - 滚动窗口模型构建器
// ==========================================
// 窗口: 两个连续 ISO 周，窗口日 1..14，班次序号 s = 3(d-1)+k，1..42
// 历史: 截断日之前的变量以上下界固定为台账值（不删除变量）
// 重排: 截断日及之后已发布的日期加入带惩罚的松弛承诺
// ==========================================

use crate::config::optimizer_config::{MinStaffing, MIN_RESERVES_PER_DAY};
use crate::domain::ledger::max_run_length;
use crate::domain::roster::Roster;
use crate::domain::types::{DayCategory, Shift, DAYS_PER_WEEK, SHIFTS_PER_DAY};
use crate::domain::worker::WorkerId;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::model::{Model, Sense, VarId};

/// 窗口周数
pub const WINDOW_WEEKS: usize = 2;

/// 窗口天数
pub const WINDOW_DAYS: usize = WINDOW_WEEKS * DAYS_PER_WEEK;

/// 每周上班天数上限
const MAX_WORK_DAYS: usize = 4;

/// 每周休息天数基准
const BASE_OFF_DAYS: usize = 2;

/// 缺勤达到该天数后不再安排备班
const RESERVE_LEAVE_THRESHOLD: usize = 3;

/// 每周夜班上限
const MAX_NIGHTS_PER_WEEK: usize = 2;

/// 窗口内一名人员的两周台账
#[derive(Debug, Clone)]
pub struct WindowWorker {
    pub worker_id: WorkerId,
    pub weeks: [Roster; WINDOW_WEEKS],
}

impl WindowWorker {
    /// 窗口日（0 基）对应的台账与周内序号
    pub fn day(&self, window_day: usize) -> (&Roster, usize) {
        (
            &self.weeks[window_day / DAYS_PER_WEEK],
            window_day % DAYS_PER_WEEK,
        )
    }
}

/// 松弛惩罚
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlackPenalty {
    /// 日类别偏离承诺的惩罚
    pub category: f64,
    /// 班次偏离承诺的惩罚
    pub shift: f64,
}

/// 构建参数
#[derive(Debug, Clone)]
pub struct BuildParams {
    /// 截断日（1 基窗口日），之前的天全部固定
    pub cut_day: usize,
    pub multiplier: u32,
    pub min_staffing: MinStaffing,
    /// 仅重排时提供
    pub slack: Option<SlackPenalty>,
}

/// 变量索引
#[derive(Debug, Clone, Default)]
pub struct VariableIndex {
    shifts: Vec<Vec<VarId>>,
    categories: Vec<Vec<[VarId; 5]>>,
}

impl VariableIndex {
    /// 人员位置 w、窗口日（0 基）、班次
    pub fn shift(&self, worker: usize, window_day: usize, shift: Shift) -> VarId {
        self.shifts[worker][window_day * SHIFTS_PER_DAY + shift.index()]
    }

    pub fn category(&self, worker: usize, window_day: usize, category: DayCategory) -> VarId {
        self.categories[worker][window_day][category.index()]
    }
}

/// 构建结果
#[derive(Debug, Clone)]
pub struct BuiltModel {
    pub model: Model,
    pub index: VariableIndex,
    pub fixed_vars: usize,
    pub slack_vars: usize,
}

// ==========================================
// RollingHorizonModelBuilder
// ==========================================
pub struct RollingHorizonModelBuilder<'a> {
    workers: &'a [WindowWorker],
    params: &'a BuildParams,
    first_free: usize,
}

impl<'a> RollingHorizonModelBuilder<'a> {
    pub fn new(workers: &'a [WindowWorker], params: &'a BuildParams) -> EngineResult<Self> {
        if params.cut_day == 0 || params.cut_day > WINDOW_DAYS {
            return Err(EngineError::InvalidWindow(format!(
                "截断日应在 1..={} 之间，实际为 {}",
                WINDOW_DAYS, params.cut_day
            )));
        }
        if workers.is_empty() {
            return Err(EngineError::InvalidWindow("窗口内没有可排班人员".to_string()));
        }
        Ok(Self {
            workers,
            params,
            first_free: params.cut_day - 1,
        })
    }

    fn is_free(&self, window_day: usize) -> bool {
        window_day >= self.first_free
    }

    /// 构建完整模型
    pub fn build(&self) -> BuiltModel {
        let mut model = Model::new();
        let mut index = VariableIndex::default();

        for worker in self.workers {
            let (shifts, categories) = self.add_worker_vars(&mut model, worker);
            index.shifts.push(shifts);
            index.categories.push(categories);
        }

        let mut fixed_vars = 0;
        let mut slack_vars = 0;
        for (w, worker) in self.workers.iter().enumerate() {
            fixed_vars += self.fix_history(&mut model, &index, w, worker);
            self.add_worker_constraints(&mut model, &index, w, worker);
            self.add_preferences(&mut model, &index, w, worker);
            if let Some(penalty) = self.params.slack {
                slack_vars += self.add_commitment_slacks(&mut model, &index, w, worker, penalty);
            }
        }
        self.add_coverage_constraints(&mut model, &index);

        tracing::debug!(
            workers = self.workers.len(),
            cut_day = self.params.cut_day,
            vars = model.num_vars(),
            constraints = model.num_constraints(),
            fixed_vars,
            slack_vars,
            "模型构建完成"
        );

        BuiltModel {
            model,
            index,
            fixed_vars,
            slack_vars,
        }
    }

    fn add_worker_vars(
        &self,
        model: &mut Model,
        worker: &WindowWorker,
    ) -> (Vec<VarId>, Vec<[VarId; 5]>) {
        let mut shifts = Vec::with_capacity(WINDOW_DAYS * SHIFTS_PER_DAY);
        let mut categories = Vec::with_capacity(WINDOW_DAYS);
        for d in 0..WINDOW_DAYS {
            for shift in Shift::ALL {
                shifts.push(model.add_bool(format!(
                    "x_w{}_s{}",
                    worker.worker_id,
                    d * SHIFTS_PER_DAY + shift.index() + 1
                )));
            }
            categories.push(DayCategory::ALL.map(|c| {
                model.add_bool(format!("{}_w{}_d{}", c, worker.worker_id, d + 1))
            }));
        }
        (shifts, categories)
    }

    /// 固定历史与已登记的缺勤
    ///
    /// # 返回
    /// 被固定的变量数
    fn fix_history(
        &self,
        model: &mut Model,
        index: &VariableIndex,
        w: usize,
        worker: &WindowWorker,
    ) -> usize {
        let mut fixed = 0;
        for d in 0..WINDOW_DAYS {
            let (roster, day) = worker.day(d);
            let recorded = roster.category(day);

            if !self.is_free(d) {
                for shift in Shift::ALL {
                    let value = if roster.schedule.is_applied(day, shift) { 1.0 } else { 0.0 };
                    model.fix(index.shift(w, d, shift), value);
                }
                for category in DayCategory::ALL {
                    let value = if recorded == Some(category) { 1.0 } else { 0.0 };
                    model.fix(index.category(w, d, category), value);
                }
                fixed += SHIFTS_PER_DAY + DayCategory::ALL.len();
                continue;
            }

            match recorded {
                Some(leave) if leave.is_leave() => {
                    for shift in Shift::ALL {
                        model.fix(index.shift(w, d, shift), 0.0);
                    }
                    for category in DayCategory::ALL {
                        let value = if category == leave { 1.0 } else { 0.0 };
                        model.fix(index.category(w, d, category), value);
                    }
                    fixed += SHIFTS_PER_DAY + DayCategory::ALL.len();
                }
                _ => {
                    model.fix(index.category(w, d, DayCategory::Vacation), 0.0);
                    model.fix(index.category(w, d, DayCategory::Sick), 0.0);
                    fixed += 2;
                }
            }
        }
        fixed
    }

    fn add_worker_constraints(
        &self,
        model: &mut Model,
        index: &VariableIndex,
        w: usize,
        worker: &WindowWorker,
    ) {
        let id = worker.worker_id;

        for d in 0..WINDOW_DAYS {
            let (roster, day) = worker.day(d);

            // 五类别恰好其一（无记录的历史日跳过）
            if self.is_free(d) || roster.category(day).is_some() {
                let terms = DayCategory::ALL
                    .iter()
                    .map(|c| (index.category(w, d, *c), 1.0))
                    .collect();
                model.add_constraint(format!("onehot_w{}_d{}", id, d + 1), terms, Sense::Eq, 1.0);
            }

            // 上班日恰好一个班次，非上班日零班次
            if self.is_free(d) {
                let mut terms: Vec<(VarId, f64)> = Shift::ALL
                    .iter()
                    .map(|s| (index.shift(w, d, *s), 1.0))
                    .collect();
                terms.push((index.category(w, d, DayCategory::Work), -1.0));
                model.add_constraint(format!("shift_excl_w{}_d{}", id, d + 1), terms, Sense::Eq, 0.0);
            }

            // 夜班后次日不得上早/中班
            if d + 1 < WINDOW_DAYS && self.is_free(d + 1) {
                model.add_constraint(
                    format!("rest_w{}_d{}", id, d + 1),
                    vec![
                        (index.shift(w, d, Shift::Night), 1.0),
                        (index.shift(w, d + 1, Shift::Morning), 1.0),
                        (index.shift(w, d + 1, Shift::Afternoon), 1.0),
                    ],
                    Sense::Le,
                    1.0,
                );
            }
        }

        for k in 0..WINDOW_WEEKS {
            self.add_week_constraints(model, index, w, worker, k);
        }
    }

    /// 周内约束: 天数配额、夜班上限、备班邻接
    fn add_week_constraints(
        &self,
        model: &mut Model,
        index: &VariableIndex,
        w: usize,
        worker: &WindowWorker,
        k: usize,
    ) {
        let id = worker.worker_id;
        let roster = &worker.weeks[k];
        let week_days: Vec<usize> = (k * DAYS_PER_WEEK..(k + 1) * DAYS_PER_WEEK).collect();
        if !week_days.iter().any(|d| self.is_free(*d)) {
            return;
        }

        let leave = roster.leave_days();
        let off_target = BASE_OFF_DAYS.saturating_sub(leave);

        // 整周可优化时施加天数配额
        if week_days.iter().all(|d| self.is_free(*d)) {
            let quotas = [
                (DayCategory::Work, MAX_WORK_DAYS.min(DAYS_PER_WEEK - leave)),
                (DayCategory::Off, off_target),
                (
                    DayCategory::Reserve,
                    usize::from(leave < RESERVE_LEAVE_THRESHOLD),
                ),
            ];
            for (category, target) in quotas {
                let terms = week_days
                    .iter()
                    .map(|d| (index.category(w, *d, category), 1.0))
                    .collect();
                model.add_constraint(
                    format!("quota_{}_w{}_wk{}", category, id, k + 1),
                    terms,
                    Sense::Eq,
                    target as f64,
                );
            }
        }

        // 夜班上限（不因历史强制不可行）
        let fixed_nights = week_days
            .iter()
            .filter(|d| !self.is_free(**d) && roster.worked_night(**d % DAYS_PER_WEEK))
            .count();
        let night_cap = MAX_NIGHTS_PER_WEEK.max(fixed_nights);
        let terms = week_days
            .iter()
            .map(|d| (index.shift(w, *d, Shift::Night), 1.0))
            .collect();
        model.add_constraint(
            format!("nights_w{}_wk{}", id, k + 1),
            terms,
            Sense::Le,
            night_cap as f64,
        );

        // 备班须紧邻休息日；连续缺勤、召回或无休息配额时暂停
        let leave_run = max_run_length(roster.days.leave_mask().iter(), true);
        if leave_run > 1 || roster.has_call_in() || off_target == 0 {
            tracing::trace!(worker = %id, week = %roster.week, leave_run, "备班邻接规则暂停");
            return;
        }
        for d in week_days.iter().copied().filter(|d| self.is_free(*d)) {
            let mut terms = vec![(index.category(w, d, DayCategory::Reserve), 1.0)];
            if d > 0 {
                terms.push((index.category(w, d - 1, DayCategory::Off), -1.0));
            }
            if d + 1 < WINDOW_DAYS {
                terms.push((index.category(w, d + 1, DayCategory::Off), -1.0));
            }
            model.add_constraint(format!("reserve_adj_w{}_d{}", id, d + 1), terms, Sense::Le, 0.0);
        }
    }

    /// 偏好目标: 可优化区间内的申请位
    fn add_preferences(
        &self,
        model: &mut Model,
        index: &VariableIndex,
        w: usize,
        worker: &WindowWorker,
    ) {
        for d in self.first_free..WINDOW_DAYS {
            let (roster, day) = worker.day(d);
            for shift in Shift::ALL {
                if roster.application.is_applied(day, shift) {
                    model.add_objective_term(index.shift(w, d, shift), 1.0);
                }
            }
        }
    }

    /// 已发布承诺的软约束
    ///
    /// committed=1: x + s >= 1；committed=0: x - s <= 0；目标扣除 penalty·s
    fn add_commitment_slacks(
        &self,
        model: &mut Model,
        index: &VariableIndex,
        w: usize,
        worker: &WindowWorker,
        penalty: SlackPenalty,
    ) -> usize {
        let mut added = 0;
        for d in self.first_free..WINDOW_DAYS {
            let (roster, day) = worker.day(d);
            if !roster.published {
                continue;
            }
            let committed = match roster.category(day) {
                Some(c) if !c.is_leave() => c,
                _ => continue,
            };

            let mut anchors: Vec<(VarId, bool, f64, String)> =
                [DayCategory::Work, DayCategory::Off, DayCategory::Reserve]
                    .into_iter()
                    .map(|c| {
                        (
                            index.category(w, d, c),
                            c == committed,
                            penalty.category,
                            format!("{}", c),
                        )
                    })
                    .collect();
            if let Some(held) = roster.held_shift(day) {
                anchors.extend(Shift::ALL.into_iter().map(|s| {
                    (index.shift(w, d, s), s == held, penalty.shift, s.to_string())
                }));
            }

            for (var, is_committed, weight, label) in anchors {
                let slack = model.add_slack(
                    format!("slack_{}_w{}_d{}", label, worker.worker_id, d + 1),
                    1.0,
                );
                if is_committed {
                    model.add_constraint(
                        format!("keep_{}_w{}_d{}", label, worker.worker_id, d + 1),
                        vec![(var, 1.0), (slack, 1.0)],
                        Sense::Ge,
                        1.0,
                    );
                } else {
                    model.add_constraint(
                        format!("keep_not_{}_w{}_d{}", label, worker.worker_id, d + 1),
                        vec![(var, 1.0), (slack, -1.0)],
                        Sense::Le,
                        0.0,
                    );
                }
                model.add_objective_term(slack, -weight);
                added += 1;
            }
        }
        added
    }

    /// 全体约束: 班次最低在岗、每日最低备班
    fn add_coverage_constraints(&self, model: &mut Model, index: &VariableIndex) {
        let workers = self.workers.len();
        for d in self.first_free..WINDOW_DAYS {
            for shift in Shift::ALL {
                let required = self
                    .params
                    .min_staffing
                    .required(d * SHIFTS_PER_DAY + shift.index(), self.params.multiplier);
                if required == 0 {
                    continue;
                }
                let terms = (0..workers).map(|w| (index.shift(w, d, shift), 1.0)).collect();
                model.add_constraint(
                    format!("staff_s{}", d * SHIFTS_PER_DAY + shift.index() + 1),
                    terms,
                    Sense::Ge,
                    required as f64,
                );
            }

            let reserves = MIN_RESERVES_PER_DAY * self.params.multiplier;
            if reserves > 0 {
                let terms = (0..workers)
                    .map(|w| (index.category(w, d, DayCategory::Reserve), 1.0))
                    .collect();
                model.add_constraint(format!("reserve_d{}", d + 1), terms, Sense::Ge, reserves as f64);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{LeaveMode, WeekKey};

    fn worker(id: i64) -> WindowWorker {
        let week = WeekKey::new(2026, 43).unwrap();
        WindowWorker {
            worker_id: WorkerId(id),
            weeks: [
                Roster::new(WorkerId(id), week),
                Roster::new(WorkerId(id), week.next()),
            ],
        }
    }

    /// 标准周: 上上上上 休 备 休
    fn publish_standard_week(roster: &mut Roster, shift: Shift) {
        for day in 0..4 {
            roster.assign_shift(day, shift);
        }
        roster.set_category(4, Some(DayCategory::Off));
        roster.set_category(5, Some(DayCategory::Reserve));
        roster.set_category(6, Some(DayCategory::Off));
        roster.published = true;
    }

    fn params(cut_day: usize, slack: Option<SlackPenalty>) -> BuildParams {
        BuildParams {
            cut_day,
            multiplier: 0,
            min_staffing: MinStaffing::default(),
            slack,
        }
    }

    fn find<'m>(model: &'m Model, name: &str) -> Option<&'m crate::engine::model::LinearConstraint> {
        model.constraints().iter().find(|c| c.name == name)
    }

    #[test]
    fn test_rejects_invalid_cut() {
        let workers = vec![worker(1)];
        assert!(RollingHorizonModelBuilder::new(&workers, &params(0, None)).is_err());
        assert!(RollingHorizonModelBuilder::new(&workers, &params(15, None)).is_err());
        assert!(RollingHorizonModelBuilder::new(&[], &params(8, None)).is_err());
    }

    #[test]
    fn test_history_is_fixed_before_cut() {
        let mut w = worker(1);
        publish_standard_week(&mut w.weeks[0], Shift::Morning);
        let workers = vec![w];
        let p = params(8, None);
        let built = RollingHorizonModelBuilder::new(&workers, &p).unwrap().build();
        let model = &built.model;

        let monday_morning = model.var(built.index.shift(0, 0, Shift::Morning));
        assert!(monday_morning.is_fixed());
        assert_eq!(monday_morning.lower, 1.0);
        let friday_off = model.var(built.index.category(0, 4, DayCategory::Off));
        assert_eq!((friday_off.lower, friday_off.upper), (1.0, 1.0));

        // 第二周仅固定休假/病假为 0
        let next_monday_work = model.var(built.index.category(0, 7, DayCategory::Work));
        assert!(!next_monday_work.is_fixed());
        let next_monday_sick = model.var(built.index.category(0, 7, DayCategory::Sick));
        assert!(next_monday_sick.is_fixed());

        assert_eq!(built.slack_vars, 0);
        assert_eq!(built.fixed_vars, 7 * 8 + 7 * 2);
    }

    #[test]
    fn test_quota_targets_follow_leave_days() {
        let mut w = worker(1);
        w.weeks[1].mark_leave(0, LeaveMode::Vacation);
        w.weeks[1].mark_leave(3, LeaveMode::Sickness);
        let workers = vec![w];
        let p = params(8, None);
        let built = RollingHorizonModelBuilder::new(&workers, &p).unwrap().build();

        assert_eq!(find(&built.model, "quota_WORK_w1_wk2").unwrap().rhs, 4.0);
        assert_eq!(find(&built.model, "quota_OFF_w1_wk2").unwrap().rhs, 0.0);
        assert_eq!(find(&built.model, "quota_RESERVE_w1_wk2").unwrap().rhs, 1.0);
        // 第一周不在可优化区间
        assert!(find(&built.model, "quota_WORK_w1_wk1").is_none());
        // 无休息配额时不施加邻接规则
        assert!(find(&built.model, "reserve_adj_w1_d9").is_none());

        let vacation = built.model.var(built.index.category(0, 7, DayCategory::Vacation));
        assert_eq!(vacation.lower, 1.0);
        let shift = built.model.var(built.index.shift(0, 7, Shift::Morning));
        assert_eq!(shift.upper, 0.0);
    }

    #[test]
    fn test_reserve_adjacency_and_rest_rules() {
        let workers = vec![worker(1)];
        let p = params(8, None);
        let built = RollingHorizonModelBuilder::new(&workers, &p).unwrap().build();

        let adj = find(&built.model, "reserve_adj_w1_d8").unwrap();
        assert_eq!(adj.terms.len(), 3);
        assert_eq!(adj.sense, Sense::Le);
        let last = find(&built.model, "reserve_adj_w1_d14").unwrap();
        assert_eq!(last.terms.len(), 2);

        // 第 7 天夜班 -> 第 8 天早/中班（跨周）
        assert!(find(&built.model, "rest_w1_d7").is_some());
        assert!(find(&built.model, "rest_w1_d6").is_none());
        assert!(find(&built.model, "nights_w1_wk2").is_some());
        assert!(find(&built.model, "nights_w1_wk1").is_none());
    }

    #[test]
    fn test_adjacency_suspended_by_call_in_or_leave_run() {
        let mut called = worker(1);
        called.weeks[1].reserve_call_in = true;
        let mut leave = worker(2);
        leave.weeks[1].mark_leave(2, LeaveMode::Vacation);
        leave.weeks[1].mark_leave(3, LeaveMode::Vacation);
        let workers = vec![called, leave];
        let p = params(8, None);
        let built = RollingHorizonModelBuilder::new(&workers, &p).unwrap().build();

        assert!(!built
            .model
            .constraints()
            .iter()
            .any(|c| c.name.starts_with("reserve_adj")));
    }

    #[test]
    fn test_coverage_scales_with_multiplier() {
        let workers = vec![worker(1), worker(2)];
        let mut p = params(8, None);
        p.multiplier = 2;
        let built = RollingHorizonModelBuilder::new(&workers, &p).unwrap().build();

        // 第二周周一中班: 4 × 2
        let staff = find(&built.model, "staff_s23").unwrap();
        assert_eq!(staff.rhs, 8.0);
        assert_eq!(staff.terms.len(), 2);
        assert!(find(&built.model, "staff_s1").is_none());
        assert_eq!(find(&built.model, "reserve_d8").unwrap().rhs, 4.0);

        p.multiplier = 0;
        let built = RollingHorizonModelBuilder::new(&workers, &p).unwrap().build();
        assert!(!built.model.constraints().iter().any(|c| c.name.starts_with("staff_")));
    }

    #[test]
    fn test_slacks_anchor_published_days_after_cut() {
        let mut w = worker(1);
        publish_standard_week(&mut w.weeks[0], Shift::Afternoon);
        publish_standard_week(&mut w.weeks[1], Shift::Morning);
        w.weeks[0].mark_leave(3, LeaveMode::Sickness);
        let workers = vec![w];
        let p = params(
            4,
            Some(SlackPenalty {
                category: 1000.0,
                shift: 100.0,
            }),
        );
        let built = RollingHorizonModelBuilder::new(&workers, &p).unwrap().build();

        // 第 4 天为病假（固定），不加松弛
        assert!(find(&built.model, "keep_WORK_w1_d4").is_none());
        let sick = built.model.var(built.index.category(0, 3, DayCategory::Sick));
        assert_eq!(sick.lower, 1.0);

        // 第 5 天休息: 1 个保持 + 2 个排除
        assert!(find(&built.model, "keep_OFF_w1_d5").is_some());
        assert!(find(&built.model, "keep_not_WORK_w1_d5").is_some());
        // 第 8 天上早班: 3 个类别 + 3 个班次
        assert!(find(&built.model, "keep_morning_w1_d8").is_some());
        assert!(find(&built.model, "keep_not_night_w1_d8").is_some());

        // 天数 5..7: 3×3；天数 8..14: 4 个上班日 ×6 + 3 个非上班日 ×3
        assert_eq!(built.slack_vars, 9 + 24 + 9);
        assert!(built
            .model
            .objective()
            .iter()
            .any(|(_, coef)| *coef == -1000.0));

        // 第一周跨越截断日，不施加天数配额
        assert!(find(&built.model, "quota_WORK_w1_wk1").is_none());
        assert!(find(&built.model, "quota_WORK_w1_wk2").is_some());
    }
}
