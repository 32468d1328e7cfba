// ==========================================
// 班组排班优化系统 - 领域类型定义
// ==========================================
// 约定: 周内顺序 Mon..Sun，班次顺序 早/中/夜
// 说明: 该顺序即持久化字符串的字节顺序，不可调整
// ==========================================

use chrono::{Datelike, Duration, IsoWeek, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 每周天数
pub const DAYS_PER_WEEK: usize = 7;

/// 每天班次数
pub const SHIFTS_PER_DAY: usize = 3;

/// 每周班次数（排班字符串长度）
pub const SHIFTS_PER_WEEK: usize = DAYS_PER_WEEK * SHIFTS_PER_DAY;

/// 周内日期名称（Mon..Sun）
pub const DAY_NAMES: [&str; DAYS_PER_WEEK] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// 周内序号 -> 日期名称（首字母大写）
pub fn day_label(day: usize) -> &'static str {
    match day {
        0 => "Monday",
        1 => "Tuesday",
        2 => "Wednesday",
        3 => "Thursday",
        4 => "Friday",
        5 => "Saturday",
        _ => "Sunday",
    }
}

/// 解析日期名称（大小写不敏感，支持三字母缩写）
pub fn parse_day_name(name: &str) -> Option<usize> {
    let lowered = name.trim().to_ascii_lowercase();
    DAY_NAMES
        .iter()
        .position(|full| *full == lowered || (lowered.len() == 3 && full.starts_with(&lowered)))
}

/// chrono::Weekday -> 周内序号
pub fn weekday_index(weekday: Weekday) -> usize {
    weekday.num_days_from_monday() as usize
}

// ==========================================
// 班次 (Shift)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shift {
    Morning,   // 早班
    Afternoon, // 中班
    Night,     // 夜班
}

impl Shift {
    pub const ALL: [Shift; SHIFTS_PER_DAY] = [Shift::Morning, Shift::Afternoon, Shift::Night];

    /// 班次在一天内的位置
    pub fn index(self) -> usize {
        match self {
            Shift::Morning => 0,
            Shift::Afternoon => 1,
            Shift::Night => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Shift> {
        Shift::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Shift::Morning => "morning",
            Shift::Afternoon => "afternoon",
            Shift::Night => "night",
        }
    }

    /// 解析班次名称（大小写不敏感）
    pub fn parse(name: &str) -> Option<Shift> {
        let lowered = name.trim().to_ascii_lowercase();
        Shift::ALL.into_iter().find(|s| s.as_str() == lowered)
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 日类别 (Day Category)
// ==========================================
// 红线: 每天恰好属于五类之一
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayCategory {
    Work,     // 上班
    Off,      // 休息
    Reserve,  // 备班
    Vacation, // 休假
    Sick,     // 病假
}

impl DayCategory {
    /// 与持久化列顺序一致: work_days/off_days/reserve_days/vacation/sickness
    pub const ALL: [DayCategory; 5] = [
        DayCategory::Work,
        DayCategory::Off,
        DayCategory::Reserve,
        DayCategory::Vacation,
        DayCategory::Sick,
    ];

    pub fn index(self) -> usize {
        match self {
            DayCategory::Work => 0,
            DayCategory::Off => 1,
            DayCategory::Reserve => 2,
            DayCategory::Vacation => 3,
            DayCategory::Sick => 4,
        }
    }

    /// 是否为缺勤类别（休假/病假）
    pub fn is_leave(self) -> bool {
        matches!(self, DayCategory::Vacation | DayCategory::Sick)
    }
}

impl fmt::Display for DayCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayCategory::Work => write!(f, "WORK"),
            DayCategory::Off => write!(f, "OFF"),
            DayCategory::Reserve => write!(f, "RESERVE"),
            DayCategory::Vacation => write!(f, "VACATION"),
            DayCategory::Sick => write!(f, "SICK"),
        }
    }
}

// ==========================================
// 班次标记 (Shift Mark)
// ==========================================
// 三态: 未设置 'x' / 申请或排入 '1' / 未申请或未排入 '0'
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShiftMark {
    #[default]
    Unset,
    Applied,
    NotApplied,
}

impl ShiftMark {
    /// 字符 -> 标记（'1' / 'x' / 其他一律视为 '0'）
    pub fn from_char(ch: char) -> ShiftMark {
        match ch {
            '1' => ShiftMark::Applied,
            'x' => ShiftMark::Unset,
            _ => ShiftMark::NotApplied,
        }
    }

    pub fn to_char(self, unset_as_x: bool) -> char {
        match self {
            ShiftMark::Applied => '1',
            ShiftMark::NotApplied => '0',
            ShiftMark::Unset if unset_as_x => 'x',
            ShiftMark::Unset => '0',
        }
    }

    pub fn from_bool(value: bool) -> ShiftMark {
        if value {
            ShiftMark::Applied
        } else {
            ShiftMark::NotApplied
        }
    }

    pub fn is_applied(self) -> bool {
        self == ShiftMark::Applied
    }
}

// ==========================================
// 缺勤类型 (Leave Mode)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveMode {
    Vacation,
    Sickness,
}

impl LeaveMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LeaveMode::Vacation => "vacation",
            LeaveMode::Sickness => "sickness",
        }
    }

    pub fn category(self) -> DayCategory {
        match self {
            LeaveMode::Vacation => DayCategory::Vacation,
            LeaveMode::Sickness => DayCategory::Sick,
        }
    }
}

impl fmt::Display for LeaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 人员角色 (Worker Role)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerRole {
    Crew,       // 一线班组
    Supervisor, // 管理员（不参与排班）
}

impl WorkerRole {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerRole::Crew => "crew",
            WorkerRole::Supervisor => "supervisor",
        }
    }

    pub fn parse(value: &str) -> Option<WorkerRole> {
        match value.trim().to_ascii_lowercase().as_str() {
            "crew" | "user" => Some(WorkerRole::Crew),
            "supervisor" | "admin" => Some(WorkerRole::Supervisor),
            _ => None,
        }
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// ISO 周 (Week Key)
// ==========================================
// 以该周周一为内部表示，年份与周号均按 ISO 8601 推导
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekKey {
    monday: NaiveDate,
}

impl WeekKey {
    /// 由 ISO 年 + 周号构造（周号越界返回 None）
    pub fn new(year: i32, week: u32) -> Option<WeekKey> {
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).map(|monday| WeekKey { monday })
    }

    /// 日期所在的 ISO 周
    pub fn containing(date: NaiveDate) -> WeekKey {
        let offset = date.weekday().num_days_from_monday() as i64;
        WeekKey {
            monday: date - Duration::days(offset),
        }
    }

    fn iso(&self) -> IsoWeek {
        self.monday.iso_week()
    }

    pub fn year(&self) -> i32 {
        self.iso().year()
    }

    pub fn week(&self) -> u32 {
        self.iso().week()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.monday
    }

    pub fn last_day(&self) -> NaiveDate {
        self.monday + Duration::days(6)
    }

    /// 周内第 day 天（0 = 周一）
    pub fn date_of(&self, day: usize) -> NaiveDate {
        self.monday + Duration::days(day as i64)
    }

    /// 偏移 n 周（可为负）
    pub fn offset(&self, weeks: i64) -> WeekKey {
        WeekKey {
            monday: self.monday + Duration::weeks(weeks),
        }
    }

    pub fn next(&self) -> WeekKey {
        self.offset(1)
    }

    pub fn prev(&self) -> WeekKey {
        self.offset(-1)
    }

    /// 与另一周相差的周数（self - other）
    pub fn weeks_since(&self, other: WeekKey) -> i64 {
        (self.monday - other.monday).num_days() / DAYS_PER_WEEK as i64
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year(), self.week())
    }
}

// ==========================================
// 求解状态 (Solver Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unbounded,
    NotSolved,
}

impl SolverStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SolverStatus::Optimal => "OPTIMAL",
            SolverStatus::Feasible => "FEASIBLE",
            SolverStatus::Infeasible => "INFEASIBLE",
            SolverStatus::Unbounded => "UNBOUNDED",
            SolverStatus::NotSolved => "NOT_SOLVED",
        }
    }

    pub fn parse(value: &str) -> Option<SolverStatus> {
        match value {
            "OPTIMAL" => Some(SolverStatus::Optimal),
            "FEASIBLE" => Some(SolverStatus::Feasible),
            "INFEASIBLE" => Some(SolverStatus::Infeasible),
            "UNBOUNDED" => Some(SolverStatus::Unbounded),
            "NOT_SOLVED" => Some(SolverStatus::NotSolved),
            _ => None,
        }
    }
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 优化运行类型 (Run Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunKind {
    PlanAhead,  // 前瞻排班（申请周）
    Reoptimize, // 缺勤后局部重排
}

impl RunKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RunKind::PlanAhead => "PLAN_AHEAD",
            RunKind::Reoptimize => "REOPTIMIZE",
        }
    }

    pub fn parse(value: &str) -> Option<RunKind> {
        match value {
            "PLAN_AHEAD" => Some(RunKind::PlanAhead),
            "REOPTIMIZE" => Some(RunKind::Reoptimize),
            _ => None,
        }
    }
}
