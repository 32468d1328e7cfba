// ==========================================
// 班组排班优化系统 - 台账 CSV 导入
// ==========================================
// 表头: username, role, year, week, application, schedule,
//       work_days, off_days, reserve_days, vacation, sickness, published
// 说明: 除 username/year/week 外均可缺省；先全量校验再写入
// ==========================================

use crate::domain::ledger::{default_days_str, default_schedule_str};
use crate::domain::roster::{Roster, RosterRecord};
use crate::domain::types::WorkerRole;
use crate::domain::worker::WorkerId;
use crate::engine::repositories::RosterRepositories;
use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// 单行解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct RosterRow {
    pub username: String,
    pub role: WorkerRole,
    pub record: RosterRecord,
}

/// 导入统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub rows: usize,
    pub workers_created: usize,
    pub rosters_inserted: usize,
    pub rosters_updated: usize,
}

// ==========================================
// 解析
// ==========================================

/// 读取 CSV 为 表头 -> 值 映射（跳过空白行）
pub fn parse_to_raw_records<R: Read>(reader: R) -> ImportResult<Vec<HashMap<String, String>>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: HashMap<String, String> = headers
            .iter()
            .cloned()
            .zip(record.iter().map(|v| v.trim().to_string()))
            .collect();
        if row.values().all(|v| v.is_empty()) {
            continue;
        }
        records.push(row);
    }
    Ok(records)
}

fn required<'a>(raw: &'a HashMap<String, String>, row: usize, field: &str) -> ImportResult<&'a str> {
    raw.get(field)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ImportError::FieldMappingError {
            row,
            message: format!("缺少字段 {}", field),
        })
}

fn optional(raw: &HashMap<String, String>, field: &str, default: String) -> String {
    raw.get(field)
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or(default)
}

fn parse_number<T: std::str::FromStr>(value: &str, row: usize, field: &str) -> ImportResult<T>
where
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| ImportError::TypeConversionError {
        row,
        field: field.to_string(),
        message: format!("{} ({})", e, value),
    })
}

fn parse_bool(value: &str, row: usize, field: &str) -> ImportResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" => Ok(false),
        "1" | "true" | "yes" => Ok(true),
        other => Err(ImportError::TypeConversionError {
            row,
            field: field.to_string(),
            message: format!("无法识别的布尔值 {}", other),
        }),
    }
}

/// 映射并校验单行（row 为 1 基文件行号，含表头）
pub fn map_row(raw: &HashMap<String, String>, row: usize) -> ImportResult<RosterRow> {
    let username = required(raw, row, "username")?.to_string();
    let role = match raw.get("role").map(String::as_str).filter(|v| !v.is_empty()) {
        Some(value) => WorkerRole::parse(value).ok_or_else(|| ImportError::TypeConversionError {
            row,
            field: "role".to_string(),
            message: format!("未知角色 {}", value),
        })?,
        None => WorkerRole::Crew,
    };
    let year: i32 = parse_number(required(raw, row, "year")?, row, "year")?;
    let week: u32 = parse_number(required(raw, row, "week")?, row, "week")?;

    let record = RosterRecord {
        worker_id: 0,
        year,
        week,
        application: optional(raw, "application", default_schedule_str('0')),
        modification: default_schedule_str('x'),
        schedule: optional(raw, "schedule", default_schedule_str('x')),
        work_days: optional(raw, "work_days", default_days_str('0')),
        off_days: optional(raw, "off_days", default_days_str('0')),
        reserve_days: optional(raw, "reserve_days", default_days_str('0')),
        vacation: optional(raw, "vacation", default_days_str('0')),
        sickness: optional(raw, "sickness", default_days_str('0')),
        reserve_call_in_days: default_days_str('0'),
        day_off_call_in_days: default_days_str('0'),
        reserve_call_in: false,
        day_off_call_in: false,
        published: parse_bool(raw.get("published").map(String::as_str).unwrap_or(""), row, "published")?,
        revision: 0,
    };

    // 预先解码，尽早暴露格式错误
    let roster = Roster::try_from(record.clone()).map_err(|e| ImportError::FieldMappingError {
        row,
        message: e.to_string(),
    })?;
    roster
        .validate()
        .map_err(|message| ImportError::FieldMappingError { row, message })?;

    Ok(RosterRow {
        username,
        role,
        record,
    })
}

// ==========================================
// RosterCsvImporter
// ==========================================
pub struct RosterCsvImporter {
    repos: RosterRepositories,
}

impl RosterCsvImporter {
    pub fn new(repos: RosterRepositories) -> Self {
        Self { repos }
    }

    /// 从文件导入
    pub fn import_file(&self, path: &Path) -> ImportResult<ImportSummary> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => {}
            other => return Err(ImportError::UnsupportedFormat(other.unwrap_or("").to_string())),
        }
        let file = File::open(path)?;
        tracing::info!(path = %path.display(), "开始导入台账");
        self.import_reader(file)
    }

    /// 从任意读取器导入
    pub fn import_reader<R: Read>(&self, reader: R) -> ImportResult<ImportSummary> {
        let raws = parse_to_raw_records(reader)?;
        let rows = raws
            .iter()
            .enumerate()
            .map(|(i, raw)| map_row(raw, i + 2))
            .collect::<ImportResult<Vec<_>>>()?;

        let mut summary = ImportSummary {
            rows: rows.len(),
            ..Default::default()
        };
        let mut known: HashMap<String, WorkerId> = HashMap::new();

        for (i, row) in rows.into_iter().enumerate() {
            let worker_id = match known.get(&row.username) {
                Some(id) => *id,
                None => {
                    let id = match self.repos.worker_repo.find_by_username(&row.username)? {
                        Some(worker) => worker.id,
                        None => {
                            summary.workers_created += 1;
                            self.repos.worker_repo.create(&row.username, row.role)?
                        }
                    };
                    known.insert(row.username.clone(), id);
                    id
                }
            };

            let mut record = row.record;
            record.worker_id = worker_id.0;
            let mut roster = Roster::try_from(record).map_err(|e| ImportError::FieldMappingError {
                row: i + 2,
                message: e.to_string(),
            })?;

            match self.repos.roster_repo.find(worker_id, roster.week)? {
                Some(existing) => {
                    roster.revision = existing.revision;
                    self.repos.roster_repo.save(&mut roster)?;
                    summary.rosters_updated += 1;
                }
                None => {
                    self.repos.roster_repo.insert(&roster)?;
                    summary.rosters_inserted += 1;
                }
            }
        }

        tracing::info!(
            rows = summary.rows,
            workers_created = summary.workers_created,
            inserted = summary.rosters_inserted,
            updated = summary.rosters_updated,
            "台账导入完成"
        );
        Ok(summary)
    }
}
