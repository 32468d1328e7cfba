// ==========================================
// 班组排班优化系统 - 人员实体
// ==========================================
// 内部一律以 WorkerId 引用人员，用户名仅用于边界查询
// ==========================================

use crate::domain::types::WorkerRole;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 人员稳定整数 ID（worker 表主键）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub i64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 人员
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub username: String,
    pub role: WorkerRole,
}
