// ==========================================
// 班组排班优化系统 - 人员数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::types::WorkerRole;
use crate::domain::worker::{Worker, WorkerId};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

/// 人员仓储
/// 职责: 管理 worker 表，提供用户名 <-> WorkerId 映射
pub struct WorkerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WorkerRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<(i64, String, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    }

    fn to_worker((id, username, role): (i64, String, String)) -> RepositoryResult<Worker> {
        let role = WorkerRole::parse(&role).ok_or_else(|| RepositoryError::FieldValueError {
            field: "role".to_string(),
            message: format!("未知角色: {}", role),
        })?;
        Ok(Worker {
            id: WorkerId(id),
            username,
            role,
        })
    }

    /// 新建人员
    ///
    /// # 返回
    /// - Ok(WorkerId): 新分配的 ID
    /// - Err(UniqueConstraintViolation): 用户名已存在
    pub fn create(&self, username: &str, role: WorkerRole) -> RepositoryResult<WorkerId> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO worker (username, role) VALUES (?1, ?2)",
            params![username, role.as_str()],
        )?;
        Ok(WorkerId(conn.last_insert_rowid()))
    }

    /// 按用户名查询
    pub fn find_by_username(&self, username: &str) -> RepositoryResult<Option<Worker>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                "SELECT worker_id, username, role FROM worker WHERE username = ?1",
                params![username],
                Self::map_row,
            )
            .optional()?;
        raw.map(Self::to_worker).transpose()
    }

    /// 按 ID 查询（不存在时返回 NotFound）
    pub fn get(&self, id: WorkerId) -> RepositoryResult<Worker> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                "SELECT worker_id, username, role FROM worker WHERE worker_id = ?1",
                params![id.0],
                Self::map_row,
            )
            .optional()?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "Worker".to_string(),
                id: id.to_string(),
            })?;
        Self::to_worker(raw)
    }

    /// 查询全部人员（按 ID 升序）
    pub fn list_all(&self) -> RepositoryResult<Vec<Worker>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT worker_id, username, role FROM worker ORDER BY worker_id")?;
        let raws = stmt
            .query_map([], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(Self::to_worker).collect()
    }
}
