// ==========================================
// 班组排班优化系统 - 引擎层仓储集合
// ==========================================
// 职责: 聚合引擎所需仓储，减少构造函数参数
// ==========================================

use crate::repository::{OptimizationRunRepository, RosterRepository, WorkerRepository};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// 排班仓储集合
#[derive(Clone)]
pub struct RosterRepositories {
    /// 人员仓储
    pub worker_repo: Arc<WorkerRepository>,
    /// 周排班台账仓储
    pub roster_repo: Arc<RosterRepository>,
    /// 优化运行审计仓储
    pub run_repo: Arc<OptimizationRunRepository>,
}

impl RosterRepositories {
    /// 创建新的仓储集合
    pub fn new(
        worker_repo: Arc<WorkerRepository>,
        roster_repo: Arc<RosterRepository>,
        run_repo: Arc<OptimizationRunRepository>,
    ) -> Self {
        Self {
            worker_repo,
            roster_repo,
            run_repo,
        }
    }

    /// 基于同一连接构造全部仓储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self::new(
            Arc::new(WorkerRepository::new(conn.clone())),
            Arc::new(RosterRepository::new(conn.clone())),
            Arc::new(OptimizationRunRepository::new(conn)),
        )
    }
}
