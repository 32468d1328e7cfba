// ==========================================
// 班组排班优化系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::codec::CodecError;
use crate::domain::types::{LeaveMode, WeekKey};
use crate::repository::error::RepositoryError;
use chrono::NaiveDate;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 业务规则拒绝 =====
    #[error("休假额度不足: 申请{requested}天, 剩余{remaining}天")]
    QuotaExceeded { requested: u32, remaining: u32 },

    #[error("{mode} 申请日期无效: 最早 {earliest}, 最晚 {latest:?}")]
    DateRangeInvalid {
        mode: LeaveMode,
        earliest: NaiveDate,
        latest: Option<NaiveDate>,
    },

    #[error("无可用替班: week={week}, day={day}")]
    NoCoverageAvailable { week: WeekKey, day: usize },

    #[error("无效的求解窗口: {0}")]
    InvalidWindow(String),

    // ===== 求解器非最优结果 =====
    #[error("求解器仅找到可行解（非最优），未写入台账")]
    SolverFeasibleOnly,

    #[error("问题不可行")]
    SolverInfeasible,

    #[error("问题无界")]
    SolverUnbounded,

    #[error("求解器未求解（超时或内部错误）")]
    SolverNotSolved,
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
