// ==========================================
// 班组排班优化系统 - 周排班台账实体
// ==========================================
// 主键: (worker, ISO 年, ISO 周)
// 红线: 每天五类别恰好其一；非上班日不得排班
// 说明: 所有写入经由整日 setter，不暴露中间态
// ==========================================

use crate::domain::codec::{
    decode, decode_days, encode, encode_days, CodecError, DayMask, DayPlan, ShiftGrid,
};
use crate::domain::ledger::is_uniform;
use crate::domain::types::{
    DayCategory, LeaveMode, Shift, ShiftMark, WeekKey, DAYS_PER_WEEK,
};
use crate::domain::worker::WorkerId;

// ==========================================
// Roster - 周排班台账
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    pub worker_id: WorkerId,
    pub week: WeekKey,
    /// 班次偏好申请
    pub application: ShiftGrid,
    /// 待保存的申请修改（Unset = 无修改）
    pub modification: ShiftGrid,
    /// 已发布排班
    pub schedule: ShiftGrid,
    /// 每日类别
    pub days: DayPlan,
    /// 备班召回日（审计）
    pub reserve_call_in_days: DayMask,
    /// 休息日召回日（审计）
    pub day_off_call_in_days: DayMask,
    pub reserve_call_in: bool,
    pub day_off_call_in: bool,
    pub published: bool,
    /// 乐观锁版本号
    pub revision: i32,
}

impl Roster {
    /// 新建空白台账（未申请、未排班）
    pub fn new(worker_id: WorkerId, week: WeekKey) -> Self {
        Self {
            worker_id,
            week,
            application: ShiftGrid::filled(ShiftMark::NotApplied),
            modification: ShiftGrid::unset(),
            schedule: ShiftGrid::unset(),
            days: DayPlan::unplanned(),
            reserve_call_in_days: DayMask::empty(),
            day_off_call_in_days: DayMask::empty(),
            reserve_call_in: false,
            day_off_call_in: false,
            published: false,
            revision: 0,
        }
    }

    pub fn category(&self, day: usize) -> Option<DayCategory> {
        self.days.get(day)
    }

    /// 设置某天类别（非上班日同时清空当天排班）
    pub fn set_category(&mut self, day: usize, category: Option<DayCategory>) {
        self.days.set(day, category);
        match category {
            Some(DayCategory::Work) => {}
            Some(_) => self.schedule.fill_day(day, ShiftMark::NotApplied),
            None => self.schedule.fill_day(day, ShiftMark::Unset),
        }
    }

    /// 排入某天某班次（类别置为上班，当天其余班次清零）
    pub fn assign_shift(&mut self, day: usize, shift: Shift) {
        self.days.set(day, Some(DayCategory::Work));
        self.schedule.fill_day(day, ShiftMark::NotApplied);
        self.schedule.set(day, shift, ShiftMark::Applied);
    }

    /// 标记缺勤，并清除当天的班次申请
    pub fn mark_leave(&mut self, day: usize, mode: LeaveMode) {
        self.set_category(day, Some(mode.category()));
        self.application.fill_day(day, ShiftMark::NotApplied);
    }

    /// 当天所上班次（仅上班日）
    pub fn held_shift(&self, day: usize) -> Option<Shift> {
        if self.days.is(day, DayCategory::Work) {
            self.schedule.applied_shift(day)
        } else {
            None
        }
    }

    pub fn worked_night(&self, day: usize) -> bool {
        self.held_shift(day) == Some(Shift::Night)
    }

    pub fn leave_days(&self) -> usize {
        self.days.leave_mask().count()
    }

    /// 是否存在待保存的修改
    pub fn has_pending_modification(&self) -> bool {
        !is_uniform(self.modification.marks(), ShiftMark::Unset)
    }

    pub fn reset_modification(&mut self) {
        self.modification = ShiftGrid::unset();
    }

    /// 将修改合并进申请并清空修改
    ///
    /// # 返回
    /// - true: 存在修改并已合并
    /// - false: 无待保存修改
    pub fn commit_modification(&mut self) -> bool {
        if !self.has_pending_modification() {
            return false;
        }
        self.application = self.application.overlay(&self.modification);
        self.reset_modification();
        true
    }

    /// 备班召回: 备班 -> 上班，记录审计位
    pub fn record_reserve_call_in(&mut self, day: usize, shift: Shift) {
        self.assign_shift(day, shift);
        self.reserve_call_in_days.set(day, true);
        self.reserve_call_in = true;
    }

    /// 休息日召回: 休息 -> 上班，记录审计位
    pub fn record_day_off_call_in(&mut self, day: usize, shift: Shift) {
        self.assign_shift(day, shift);
        self.day_off_call_in_days.set(day, true);
        self.day_off_call_in = true;
    }

    /// 清除 day 之后的召回审计位，并按剩余位重算标志
    pub fn clear_call_ins_after(&mut self, day: usize) {
        for later in (day + 1)..DAYS_PER_WEEK {
            self.reserve_call_in_days.set(later, false);
            self.day_off_call_in_days.set(later, false);
        }
        self.reserve_call_in = self.reserve_call_in_days.any();
        self.day_off_call_in = self.day_off_call_in_days.any();
    }

    /// 本周是否存在召回（标志或审计位）
    pub fn has_call_in(&self) -> bool {
        self.reserve_call_in
            || self.day_off_call_in
            || DayMask::merge3(
                &self.reserve_call_in_days,
                &self.day_off_call_in_days,
                &DayMask::empty(),
            )
            .any()
    }

    /// 写入前校验排班不变式
    pub fn validate(&self) -> Result<(), String> {
        for day in 0..DAYS_PER_WEEK {
            let applied = self.schedule.applied_shifts(day).len();
            let is_work = self.days.is(day, DayCategory::Work);
            if is_work && applied > 1 {
                return Err(format!(
                    "worker={} week={} 第{}天排入{}个班次",
                    self.worker_id, self.week, day, applied
                ));
            }
            if !is_work && applied > 0 {
                return Err(format!(
                    "worker={} week={} 第{}天非上班日却排入班次",
                    self.worker_id, self.week, day
                ));
            }
        }
        Ok(())
    }

    /// 转换为持久化记录
    pub fn to_record(&self) -> RosterRecord {
        let [work_days, off_days, reserve_days, vacation, sickness] = self.days.to_masks();
        RosterRecord {
            worker_id: self.worker_id.0,
            year: self.week.year(),
            week: self.week.week(),
            application: encode(&self.application, false),
            modification: encode(&self.modification, true),
            schedule: encode(&self.schedule, true),
            work_days,
            off_days,
            reserve_days,
            vacation,
            sickness,
            reserve_call_in_days: encode_days(&self.reserve_call_in_days),
            day_off_call_in_days: encode_days(&self.day_off_call_in_days),
            reserve_call_in: self.reserve_call_in,
            day_off_call_in: self.day_off_call_in,
            published: self.published,
            revision: self.revision,
        }
    }
}

// ==========================================
// RosterRecord - 持久化格式
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRecord {
    pub worker_id: i64,
    pub year: i32,
    pub week: u32,
    pub application: String,
    pub modification: String,
    pub schedule: String,
    pub work_days: String,
    pub off_days: String,
    pub reserve_days: String,
    pub vacation: String,
    pub sickness: String,
    pub reserve_call_in_days: String,
    pub day_off_call_in_days: String,
    pub reserve_call_in: bool,
    pub day_off_call_in: bool,
    pub published: bool,
    pub revision: i32,
}

impl TryFrom<RosterRecord> for Roster {
    type Error = CodecError;

    fn try_from(record: RosterRecord) -> Result<Self, Self::Error> {
        let week = WeekKey::new(record.year, record.week).ok_or_else(|| {
            CodecError::FormatError(format!("无效的 ISO 周: {}-W{}", record.year, record.week))
        })?;

        Ok(Roster {
            worker_id: WorkerId(record.worker_id),
            week,
            application: decode(&record.application)?,
            modification: decode(&record.modification)?,
            schedule: decode(&record.schedule)?,
            days: DayPlan::from_masks([
                &record.work_days,
                &record.off_days,
                &record.reserve_days,
                &record.vacation,
                &record.sickness,
            ])?,
            reserve_call_in_days: decode_days(&record.reserve_call_in_days)?,
            day_off_call_in_days: decode_days(&record.day_off_call_in_days)?,
            reserve_call_in: record.reserve_call_in,
            day_off_call_in: record.day_off_call_in,
            published: record.published,
            revision: record.revision,
        })
    }
}
