// ==========================================
// 班组排班优化系统 - 时钟
// ==========================================
// 职责: 当前周/年/周首末日的唯一来源，注入以便测试
// ==========================================

use crate::domain::types::WeekKey;
use chrono::{Datelike, Local, NaiveDate, Weekday};

/// 时钟接口
pub trait Clock: Send + Sync {
    /// 今天
    fn today(&self) -> NaiveDate;

    /// 当前周偏移 offset 周后的 ISO 周
    fn current_week_number(&self, offset: i64) -> WeekKey {
        WeekKey::containing(self.today()).offset(offset)
    }

    /// 当前 ISO 年
    fn current_year(&self) -> i32 {
        self.current_week_number(0).year()
    }

    /// 某周的首日（周一）与末日（周日）
    fn first_and_last_day_of_week(&self, week: WeekKey) -> (NaiveDate, NaiveDate) {
        (week.first_day(), week.last_day())
    }

    /// 今天是否为周末（申请截止）
    fn is_weekend(&self) -> bool {
        matches!(self.today().weekday(), Weekday::Sat | Weekday::Sun)
    }
}

/// 系统时钟（本地时区）
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// 固定时钟（测试/回放）
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// 排班窗口中的周次
///
/// - 当前周: offset 0
/// - 下周: offset 1
/// - 申请周: offset 2
pub const APPLICATION_WEEK_OFFSET: i64 = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_weeks() {
        let clock = FixedClock(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        assert_eq!(clock.current_week_number(0).week(), 42);
        assert_eq!(clock.current_week_number(APPLICATION_WEEK_OFFSET).week(), 44);
        assert_eq!(clock.current_year(), 2026);
        assert!(!clock.is_weekend());

        let (first, last) = clock.first_and_last_day_of_week(clock.current_week_number(1));
        assert_eq!(first, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2026, 10, 25).unwrap());
    }
}
