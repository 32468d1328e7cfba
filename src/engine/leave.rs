// ==========================================
// 班组排班优化系统 - 缺勤申请窗口
// ==========================================
// 职责: 日期区间校验、按周拆分
// 规则: 首周吸收至多 7 - first_day 天，其余每周至多 7 天
// ==========================================

use crate::domain::types::{weekday_index, LeaveMode, WeekKey, DAYS_PER_WEEK};
use crate::engine::clock::{Clock, APPLICATION_WEEK_OFFSET};
use crate::engine::error::{EngineError, EngineResult};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// 缺勤申请（来自请求层）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub mode: LeaveMode,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// 单周内的缺勤段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekSegment {
    pub week: WeekKey,
    /// 周内序号（0 = 周一），升序
    pub days: Vec<usize>,
}

/// 闭区间 [start, end] 的缺勤窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ClaimWindow {
    pub fn new(mode: LeaveMode, start: NaiveDate, end: NaiveDate) -> EngineResult<Self> {
        if end < start {
            return Err(EngineError::DateRangeInvalid {
                mode,
                earliest: start,
                latest: None,
            });
        }
        Ok(Self { start, end })
    }

    /// 天数（含首尾）
    pub fn length(&self) -> u32 {
        ((self.end - self.start).num_days() + 1) as u32
    }

    pub fn first_week(&self) -> WeekKey {
        WeekKey::containing(self.start)
    }

    /// 首日周内序号
    pub fn first_day(&self) -> usize {
        weekday_index(self.start.weekday())
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(self.length() as usize)
    }

    pub fn segments(&self) -> Vec<WeekSegment> {
        decompose(self.first_week(), self.first_day(), self.length() as usize)
    }
}

/// 从 week 的第 first_day 天起拆分 length 天
pub fn decompose(week: WeekKey, first_day: usize, length: usize) -> Vec<WeekSegment> {
    let mut segments = Vec::new();
    let mut remaining = length;
    let mut current = week;
    let mut from = first_day.min(DAYS_PER_WEEK - 1);

    while remaining > 0 {
        let take = remaining.min(DAYS_PER_WEEK - from);
        segments.push(WeekSegment {
            week: current,
            days: (from..from + take).collect(),
        });
        remaining -= take;
        current = current.next();
        from = 0;
    }
    segments
}

/// 校验申请日期范围
///
/// - 休假: 不早于申请周周一
/// - 病假: 起始日须在本周内
pub fn validate_claim_dates(
    clock: &dyn Clock,
    mode: LeaveMode,
    start: NaiveDate,
    end: NaiveDate,
) -> EngineResult<ClaimWindow> {
    let window = ClaimWindow::new(mode, start, end)?;
    match mode {
        LeaveMode::Vacation => {
            let (earliest, _) = clock
                .first_and_last_day_of_week(clock.current_week_number(APPLICATION_WEEK_OFFSET));
            if start < earliest {
                return Err(EngineError::DateRangeInvalid {
                    mode,
                    earliest,
                    latest: None,
                });
            }
        }
        LeaveMode::Sickness => {
            let (earliest, latest) = clock.first_and_last_day_of_week(clock.current_week_number(0));
            if start < earliest || start > latest {
                return Err(EngineError::DateRangeInvalid {
                    mode,
                    earliest,
                    latest: Some(latest),
                });
            }
        }
    }
    Ok(window)
}
