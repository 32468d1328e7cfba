// ==========================================
// 班组排班优化系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、台账编解码
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod codec;
pub mod ledger;
pub mod roster;
pub mod types;
pub mod worker;

// 重导出核心类型
pub use codec::{ChangeRequest, CodecError, DayMask, DayPlan, ShiftGrid};
pub use roster::{Roster, RosterRecord};
pub use types::{
    DayCategory, LeaveMode, RunKind, Shift, ShiftMark, SolverStatus, WeekKey, WorkerRole,
};
pub use worker::{Worker, WorkerId};
