// ==========================================
// 班组排班优化系统 - 周排班台账仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 并发控制: revision 乐观锁；批量保存单事务，全部成功或全部回滚
// ==========================================

use crate::domain::codec::decode_days;
use crate::domain::roster::{Roster, RosterRecord};
use crate::domain::types::{WeekKey, WorkerRole};
use crate::domain::worker::WorkerId;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    r.worker_id, r.year, r.week, r.application, r.modification, r.schedule,
    r.work_days, r.off_days, r.reserve_days, r.vacation, r.sickness,
    r.reserve_call_in_days, r.day_off_call_in_days,
    r.reserve_call_in, r.day_off_call_in, r.published, r.revision
"#;

// ==========================================
// RosterRepository - 周排班台账仓储
// ==========================================
pub struct RosterRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RosterRepository {
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

    fn map_row(row: &Row<'_>) -> rusqlite::Result<RosterRecord> {
        Ok(RosterRecord {
            worker_id: row.get(0)?,
            year: row.get(1)?,
            week: row.get(2)?,
            application: row.get(3)?,
            modification: row.get(4)?,
            schedule: row.get(5)?,
            work_days: row.get(6)?,
            off_days: row.get(7)?,
            reserve_days: row.get(8)?,
            vacation: row.get(9)?,
            sickness: row.get(10)?,
            reserve_call_in_days: row.get(11)?,
            day_off_call_in_days: row.get(12)?,
            reserve_call_in: row.get(13)?,
            day_off_call_in: row.get(14)?,
            published: row.get(15)?,
            revision: row.get(16)?,
        })
    }

    fn record_key(worker_id: WorkerId, week: WeekKey) -> String {
        format!("roster(worker={}, week={})", worker_id, week)
    }

    /// 新建台账
    ///
    /// # 错误
    /// - UniqueConstraintViolation: (worker, year, week) 已存在
    /// - ValidationError: 排班不变式不成立
    pub fn insert(&self, roster: &Roster) -> RepositoryResult<()> {
        roster.validate().map_err(RepositoryError::ValidationError)?;
        let record = roster.to_record();
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO roster (
                   worker_id, year, week, application, modification, schedule,
                   work_days, off_days, reserve_days, vacation, sickness,
                   reserve_call_in_days, day_off_call_in_days,
                   reserve_call_in, day_off_call_in, published, revision
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"#,
            params![
                record.worker_id,
                record.year,
                record.week,
                record.application,
                record.modification,
                record.schedule,
                record.work_days,
                record.off_days,
                record.reserve_days,
                record.vacation,
                record.sickness,
                record.reserve_call_in_days,
                record.day_off_call_in_days,
                record.reserve_call_in,
                record.day_off_call_in,
                record.published,
                record.revision,
            ],
        )?;
        Ok(())
    }

    /// 查询单个台账
    pub fn find(&self, worker_id: WorkerId, week: WeekKey) -> RepositoryResult<Option<Roster>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM roster r WHERE r.worker_id = ?1 AND r.year = ?2 AND r.week = ?3",
            SELECT_COLUMNS
        );
        let record = conn
            .query_row(
                &sql,
                params![worker_id.0, week.year(), week.week()],
                Self::map_row,
            )
            .optional()?;

        match record {
            Some(r) => Ok(Some(Roster::try_from(r)?)),
            None => Ok(None),
        }
    }

    /// 查询单个台账（不存在时返回 NotFound，核心层不自动建档）
    pub fn get_roster(&self, worker_id: WorkerId, week: WeekKey) -> RepositoryResult<Roster> {
        self.find(worker_id, week)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "Roster".to_string(),
                id: format!("worker={}, week={}", worker_id, week),
            })
    }

    /// 查询某周全部台账（按 worker_id 升序）
    ///
    /// # 参数
    /// - week: ISO 周
    /// - exclude_role: 需排除的角色（通常为管理员）
    pub fn list_rosters(
        &self,
        week: WeekKey,
        exclude_role: Option<WorkerRole>,
    ) -> RepositoryResult<Vec<Roster>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT {}
               FROM roster r
               JOIN worker w ON w.worker_id = r.worker_id
               WHERE r.year = ?1 AND r.week = ?2 AND w.role != ?3
               ORDER BY r.worker_id"#,
            SELECT_COLUMNS
        );
        // 不排除时用不存在的角色占位
        let excluded = exclude_role.map(|r| r.as_str()).unwrap_or("");

        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![week.year(), week.week(), excluded], Self::map_row)?
            .collect::<rusqlite::Result<Vec<RosterRecord>>>()?;

        records
            .into_iter()
            .map(|r| Roster::try_from(r).map_err(RepositoryError::from))
            .collect()
    }

    /// 单条保存（带乐观锁检查）
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: revision 不匹配（已被其他请求更新）
    /// - `RepositoryError::NotFound`: 台账不存在
    pub fn save(&self, roster: &mut Roster) -> RepositoryResult<()> {
        self.save_batch(std::slice::from_mut(roster))
    }

    /// 批量保存（单事务，带乐观锁检查）
    ///
    /// 任一台账冲突或校验失败时整批回滚，内存中的 revision 仅在提交后递增
    pub fn save_batch(&self, rosters: &mut [Roster]) -> RepositoryResult<()> {
        for roster in rosters.iter() {
            roster.validate().map_err(RepositoryError::ValidationError)?;
        }

        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        for roster in rosters.iter() {
            let record = roster.to_record();
            let rows_affected = tx.execute(
                r#"UPDATE roster
                   SET application = ?1, modification = ?2, schedule = ?3,
                       work_days = ?4, off_days = ?5, reserve_days = ?6,
                       vacation = ?7, sickness = ?8,
                       reserve_call_in_days = ?9, day_off_call_in_days = ?10,
                       reserve_call_in = ?11, day_off_call_in = ?12, published = ?13,
                       revision = revision + 1, updated_at = datetime('now')
                   WHERE worker_id = ?14 AND year = ?15 AND week = ?16 AND revision = ?17"#,
                params![
                    record.application,
                    record.modification,
                    record.schedule,
                    record.work_days,
                    record.off_days,
                    record.reserve_days,
                    record.vacation,
                    record.sickness,
                    record.reserve_call_in_days,
                    record.day_off_call_in_days,
                    record.reserve_call_in,
                    record.day_off_call_in,
                    record.published,
                    record.worker_id,
                    record.year,
                    record.week,
                    record.revision,
                ],
            )?;

            if rows_affected == 0 {
                // 判断是记录不存在还是 revision 冲突
                let actual: Option<i32> = tx
                    .query_row(
                        "SELECT revision FROM roster WHERE worker_id = ?1 AND year = ?2 AND week = ?3",
                        params![record.worker_id, record.year, record.week],
                        |row| row.get(0),
                    )
                    .optional()?;

                return Err(match actual {
                    Some(actual_revision) => RepositoryError::OptimisticLockFailure {
                        record: Self::record_key(roster.worker_id, roster.week),
                        expected: roster.revision,
                        actual: actual_revision,
                    },
                    None => RepositoryError::NotFound {
                        entity: "Roster".to_string(),
                        id: format!("worker={}, week={}", roster.worker_id, roster.week),
                    },
                });
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        for roster in rosters.iter_mut() {
            roster.revision += 1;
        }
        Ok(())
    }

    /// 年内已休假天数
    pub fn count_vacation_days(&self, worker_id: WorkerId, year: i32) -> RepositoryResult<u32> {
        self.count_marked_days(worker_id, year, "vacation")
    }

    /// 年内备班召回天数（替班公平性依据）
    pub fn count_reserve_call_in_days(
        &self,
        worker_id: WorkerId,
        year: i32,
    ) -> RepositoryResult<u32> {
        self.count_marked_days(worker_id, year, "reserve_call_in_days")
    }

    fn count_marked_days(
        &self,
        worker_id: WorkerId,
        year: i32,
        column: &'static str,
    ) -> RepositoryResult<u32> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM roster WHERE worker_id = ?1 AND year = ?2",
            column
        );
        let mut stmt = conn.prepare(&sql)?;
        let masks = stmt
            .query_map(params![worker_id.0, year], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        let mut total = 0u32;
        for raw in masks {
            total += decode_days(&raw)?.count() as u32;
        }
        Ok(total)
    }
}
