// ==========================================
// 班组排班优化系统 - 优化参数
// ==========================================
// 来源: config_kv（缺省时取 Default）
// ==========================================

use crate::domain::types::{WorkerRole, SHIFTS_PER_WEEK};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 每周各班次最低在岗人数（Mon..Sun × 早/中/夜）
///
/// 工作日 早2/中4/夜2，周末 早1/中2/夜1
pub const DEFAULT_MIN_STAFFING: [u32; SHIFTS_PER_WEEK] = [
    2, 4, 2, // Mon
    2, 4, 2, // Tue
    2, 4, 2, // Wed
    2, 4, 2, // Thu
    2, 4, 2, // Fri
    1, 2, 1, // Sat
    1, 2, 1, // Sun
];

/// 每日最低备班人数（乘以倍率）
pub const MIN_RESERVES_PER_DAY: u32 = 2;

/// 最低在岗表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinStaffing(pub [u32; SHIFTS_PER_WEEK]);

impl Default for MinStaffing {
    fn default() -> Self {
        MinStaffing(DEFAULT_MIN_STAFFING)
    }
}

impl MinStaffing {
    /// 周内班次位置（0..21）的最低人数，乘以倍率
    pub fn required(&self, week_shift: usize, multiplier: u32) -> u32 {
        self.0[week_shift % SHIFTS_PER_WEEK] * multiplier
    }

    /// 从 JSON 数组解析（长度必须为 21）
    pub fn parse(raw: &str) -> Result<Self, String> {
        let values: Vec<u32> =
            serde_json::from_str(raw).map_err(|e| format!("最低在岗表解析失败: {}", e))?;
        let table: [u32; SHIFTS_PER_WEEK] = values.try_into().map_err(|v: Vec<u32>| {
            format!("最低在岗表长度应为{}，实际为{}", SHIFTS_PER_WEEK, v.len())
        })?;
        Ok(MinStaffing(table))
    }
}

/// 优化参数
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    /// 参与求解的人数上限
    pub headcount: usize,
    /// 在岗/备班下限倍率
    pub multiplier: u32,
    /// 年度休假上限（天）
    pub vacation_cap: u32,
    /// 单次求解时限
    pub time_budget: Duration,
    /// 日类别承诺松弛惩罚
    pub slack_penalty: f64,
    /// 班次承诺松弛惩罚
    pub shift_slack_penalty: f64,
    pub min_staffing: MinStaffing,
    /// 不参与排班的角色
    pub excluded_role: Option<WorkerRole>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            headcount: 15,
            multiplier: 1,
            vacation_cap: 20,
            time_budget: Duration::from_secs(30),
            slack_penalty: 1000.0,
            shift_slack_penalty: 100.0,
            min_staffing: MinStaffing::default(),
            excluded_role: Some(WorkerRole::Supervisor),
        }
    }
}
