// ==========================================
// 班组排班优化系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::optimizer_config::{MinStaffing, OptimizerConfig};
use crate::db::open_sqlite_connection;
use crate::domain::types::WorkerRole;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取并解析数值型配置，缺失时返回默认值
    fn get_parsed_or<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_global_config_value(key)? {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map_err(|e| format!("配置值格式错误 (key: {}, value: {}): {}", key, raw, e).into()),
            None => Ok(default),
        }
    }

    /// 获取所有配置的快照（JSON格式，按 key 排序）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 加载优化参数
    ///
    /// # 说明
    /// - 缺失的键使用 OptimizerConfig::default() 对应值
    /// - 存在但无法解析的键返回错误（不静默回退）
    pub fn load_optimizer_config(&self) -> Result<OptimizerConfig, Box<dyn Error>> {
        let defaults = OptimizerConfig::default();

        let min_staffing = match self.get_global_config_value(config_keys::MIN_STAFFING)? {
            Some(raw) => MinStaffing::parse(&raw)?,
            None => defaults.min_staffing,
        };

        let excluded_role = match self.get_global_config_value(config_keys::EXCLUDED_ROLE)? {
            Some(raw) if raw.trim().is_empty() || raw.trim() == "none" => None,
            Some(raw) => Some(
                WorkerRole::parse(&raw).ok_or_else(|| format!("未知角色: {}", raw))?,
            ),
            None => defaults.excluded_role,
        };

        Ok(OptimizerConfig {
            headcount: self.get_parsed_or(config_keys::HEADCOUNT, defaults.headcount)?,
            multiplier: self.get_parsed_or(config_keys::MULTIPLIER, defaults.multiplier)?,
            vacation_cap: self.get_parsed_or(config_keys::VACATION_CAP, defaults.vacation_cap)?,
            time_budget: Duration::from_secs(self.get_parsed_or(
                config_keys::TIME_BUDGET_SECS,
                defaults.time_budget.as_secs(),
            )?),
            slack_penalty: self.get_parsed_or(config_keys::SLACK_PENALTY, defaults.slack_penalty)?,
            shift_slack_penalty: self.get_parsed_or(
                config_keys::SHIFT_SLACK_PENALTY,
                defaults.shift_slack_penalty,
            )?,
            min_staffing,
            excluded_role,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 求解规模
    pub const HEADCOUNT: &str = "optimizer.headcount";
    pub const MULTIPLIER: &str = "optimizer.multiplier";

    // 休假
    pub const VACATION_CAP: &str = "vacation.annual_cap";

    // 求解器
    pub const TIME_BUDGET_SECS: &str = "solver.time_budget_secs";
    pub const SLACK_PENALTY: &str = "solver.slack_penalty";
    pub const SHIFT_SLACK_PENALTY: &str = "solver.shift_slack_penalty";

    // 在岗下限 (JSON 数组，21 项)
    pub const MIN_STAFFING: &str = "staffing.min_per_shift";

    // 不参与排班的角色
    pub const EXCLUDED_ROLE: &str = "roster.excluded_role";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = manager().load_optimizer_config().unwrap();
        assert_eq!(config, OptimizerConfig::default());
    }

    #[test]
    fn test_overrides_and_snapshot() {
        let manager = manager();
        manager.set_global_config_value(config_keys::MULTIPLIER, "0").unwrap();
        manager.set_global_config_value(config_keys::VACATION_CAP, "25").unwrap();
        manager.set_global_config_value(config_keys::EXCLUDED_ROLE, "none").unwrap();
        manager.set_global_config_value(config_keys::VACATION_CAP, "30").unwrap();

        let config = manager.load_optimizer_config().unwrap();
        assert_eq!(config.multiplier, 0);
        assert_eq!(config.vacation_cap, 30);
        assert_eq!(config.excluded_role, None);

        let snapshot = manager.get_config_snapshot().unwrap();
        assert!(snapshot.contains("vacation.annual_cap"));
    }

    #[test]
    fn test_malformed_value_is_error() {
        let manager = manager();
        manager.set_global_config_value(config_keys::HEADCOUNT, "many").unwrap();
        assert!(manager.load_optimizer_config().is_err());
    }
}
