// ==========================================
// 班组排班优化系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::api::{RosterApi, ScheduleApi};
use crate::config::config_manager::ConfigManager;
use crate::config::OptimizerConfig;
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::clock::{Clock, SystemClock};
use crate::engine::disruption::DisruptionResolver;
use crate::engine::lp_backend::MicroLpBackend;
use crate::engine::optimizer::OptimizerController;
use crate::engine::repositories::RosterRepositories;
use crate::engine::solver::SolverGateway;
use crate::importer::RosterCsvImporter;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "CREW_OPTIMIZER_DB_PATH";

/// 应用状态
///
/// 包含所有API实例和共享资源，命令行入口与集成测试共用
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 启动时加载的优化参数快照
    pub config: OptimizerConfig,

    /// 仓储集合
    pub repos: RosterRepositories,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 员工侧API（申请、修改、请假、查询）
    pub roster_api: Arc<RosterApi>,

    /// 管理侧API（前瞻排班、重排、驳回休假）
    pub schedule_api: Arc<ScheduleApi>,

    /// 台账导入
    pub importer: Arc<RosterCsvImporter>,
}

impl AppState {
    /// 创建新的AppState实例（系统时钟）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::with_clock(db_path, Arc::new(SystemClock))
    }

    /// 使用指定时钟创建AppState
    ///
    /// # 说明
    /// 1. 打开共享连接并建库（幂等）
    /// 2. 从 config_kv 加载优化参数
    /// 3. 组装求解网关、优化控制器、缺勤处理器与各API
    pub fn with_clock(db_path: String, clock: Arc<dyn Clock>) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("建库失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let config = config_manager
            .load_optimizer_config()
            .map_err(|e| format!("优化参数加载失败: {}", e))?;

        // ==========================================
        // Repository / Engine
        // ==========================================
        let repos = RosterRepositories::from_connection(conn);
        let gateway = SolverGateway::new(Arc::new(MicroLpBackend));
        tracing::info!(backend = gateway.backend_name(), "求解后端就绪");

        let optimizer = Arc::new(OptimizerController::new(
            repos.clone(),
            gateway,
            clock.clone(),
            config.clone(),
        ));
        let resolver = Arc::new(DisruptionResolver::new(
            repos.clone(),
            optimizer.clone(),
            clock.clone(),
        ));

        // ==========================================
        // API
        // ==========================================
        let roster_api = Arc::new(RosterApi::new(repos.clone(), resolver.clone(), clock.clone()));
        let schedule_api = Arc::new(ScheduleApi::new(
            repos.clone(),
            optimizer,
            resolver,
            clock,
        ));
        let importer = Arc::new(RosterCsvImporter::new(repos.clone()));

        tracing::info!("AppState初始化完成");
        Ok(Self {
            db_path,
            config,
            repos,
            config_manager,
            roster_api,
            schedule_api,
            importer,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 CREW_OPTIMIZER_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./crew_optimizer.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        let dir = data_dir.join("crew-optimizer-dev");

        #[cfg(not(debug_assertions))]
        let dir = data_dir.join("crew-optimizer");

        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("crew_optimizer.db");
        }
    }

    path.to_string_lossy().to_string()
}
