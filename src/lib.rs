// ==========================================
// 班组排班优化系统 - 核心库
// ==========================================
// 系统定位: 三班制班组的滚动两周排班与缺勤重排
// 技术栈: Rust + SQLite + 整数线性规划
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 台账与编码
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 建模、求解、缺勤处理
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建库）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    DayCategory, LeaveMode, RunKind, Shift, ShiftMark, SolverStatus, WeekKey, WorkerRole,
};

// 领域实体
pub use domain::{Roster, Worker, WorkerId};

// 引擎
pub use engine::{
    DisruptionResolver, EngineError, MicroLpBackend, OptimizationReport, OptimizerController,
    SolverGateway,
};

// API
pub use api::{ApiError, RosterApi, ScheduleApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "班组排班优化系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
