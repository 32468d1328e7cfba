// ==========================================
// 班组排班优化系统 - API 层
// ==========================================
// 职责: 面向对话/命令行的业务接口
// ==========================================

pub mod error;
pub mod roster_api;
pub mod schedule_api;
pub mod summary;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use roster_api::{ClaimReply, RosterApi};
pub use schedule_api::{solver_status_message, ScheduleApi, ScheduleRunReply};
