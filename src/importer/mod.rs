// ==========================================
// 班组排班优化系统 - 导入层
// ==========================================
// 职责: 外部 CSV 数据导入为人员与周台账
// ==========================================

pub mod error;
pub mod roster_csv;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use roster_csv::{ImportSummary, RosterCsvImporter, RosterRow};
