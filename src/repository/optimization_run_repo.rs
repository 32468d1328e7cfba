// ==========================================
// 班组排班优化系统 - 优化运行审计仓储
// ==========================================
// 职责: 记录每次求解的状态、耗时与约束规模，便于追溯
// ==========================================

use crate::domain::types::{RunKind, SolverStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// 一次优化运行的审计记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRun {
    pub run_id: String,
    pub kind: RunKind,
    pub status: SolverStatus,
    /// 窗口首日（第一周周一）
    pub window_start: NaiveDate,
    /// 1 基窗口日序号，之前的天视为既成事实
    pub cut_day_index: usize,
    pub wall_time_ms: u64,
    pub constraint_count: usize,
    pub rosters_written: usize,
}

pub struct OptimizationRunRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OptimizationRunRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, run: &OptimizationRun) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO optimization_run (
                   run_id, kind, status, window_start, cut_day_index,
                   wall_time_ms, constraint_count, rosters_written
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                run.run_id,
                run.kind.as_str(),
                run.status.as_str(),
                run.window_start.format("%Y-%m-%d").to_string(),
                run.cut_day_index as i64,
                run.wall_time_ms as i64,
                run.constraint_count as i64,
                run.rosters_written as i64,
            ],
        )?;
        Ok(())
    }

    /// 最近的运行记录（新 -> 旧）
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<OptimizationRun>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT run_id, kind, status, window_start, cut_day_index,
                      wall_time_ms, constraint_count, rosters_written
               FROM optimization_run
               ORDER BY created_at DESC, rowid DESC
               LIMIT ?1"#,
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, i64>(7)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(
                |(run_id, kind, status, window_start, cut, wall, constraints, written)| {
                    let field_err = |field: &str, value: &str| RepositoryError::FieldValueError {
                        field: field.to_string(),
                        message: format!("无法解析: {}", value),
                    };
                    Ok(OptimizationRun {
                        kind: RunKind::parse(&kind).ok_or_else(|| field_err("kind", &kind))?,
                        status: SolverStatus::parse(&status)
                            .ok_or_else(|| field_err("status", &status))?,
                        window_start: NaiveDate::parse_from_str(&window_start, "%Y-%m-%d")
                            .map_err(|_| field_err("window_start", &window_start))?,
                        run_id,
                        cut_day_index: cut as usize,
                        wall_time_ms: wall as u64,
                        constraint_count: constraints as usize,
                        rosters_written: written as usize,
                    })
                },
            )
            .collect()
    }
}
