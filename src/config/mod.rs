// ==========================================
// 班组排班优化系统 - 配置层
// ==========================================
// 职责: 系统配置管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod optimizer_config;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use optimizer_config::{MinStaffing, OptimizerConfig, MIN_RESERVES_PER_DAY};
