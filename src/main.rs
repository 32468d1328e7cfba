// ==========================================
// 班组排班优化系统 - 命令行入口
// ==========================================
// 用法:
//   crew-optimizer <db> init
//   crew-optimizer <db> import <csv>
//   crew-optimizer <db> plan-ahead
//   crew-optimizer <db> reoptimize <cut_day>
// db 为 - 时使用默认路径（CREW_OPTIMIZER_DB_PATH 或用户数据目录）
// ==========================================

use anyhow::{anyhow, bail, Context};
use crew_optimizer::app::{get_default_db_path, AppState};
use crew_optimizer::logging;
use std::path::Path;

const USAGE: &str = "用法: crew-optimizer <db|-> <init | import <csv> | plan-ahead | reoptimize <cut_day>>";

fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let db_path = match args.next() {
        Some(path) if path != "-" => path,
        Some(_) => get_default_db_path(),
        None => bail!(USAGE),
    };
    let command = args.next().ok_or_else(|| anyhow!(USAGE))?;

    tracing::info!(
        version = crew_optimizer::VERSION,
        db = %db_path,
        command = %command,
        "{}",
        crew_optimizer::APP_NAME
    );

    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    match command.as_str() {
        "init" => {
            println!("数据库已就绪: {}", state.db_path);
        }
        "import" => {
            let csv = args.next().ok_or_else(|| anyhow!(USAGE))?;
            let summary = state
                .importer
                .import_file(Path::new(&csv))
                .with_context(|| format!("导入失败: {}", csv))?;
            println!(
                "rows={} workers_created={} inserted={} updated={}",
                summary.rows,
                summary.workers_created,
                summary.rosters_inserted,
                summary.rosters_updated
            );
        }
        "plan-ahead" => {
            let reply = state.schedule_api.optimize_schedule()?;
            println!("{}", reply.message);
            println!("{}", serde_json::to_string_pretty(&reply.report)?);
        }
        "reoptimize" => {
            let cut: usize = args
                .next()
                .ok_or_else(|| anyhow!(USAGE))?
                .parse()
                .context("cut_day 应为 1..=14 的整数")?;
            let reply = state.schedule_api.reoptimize(cut)?;
            println!("{}", reply.message);
            println!("{}", serde_json::to_string_pretty(&reply.report)?);
        }
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }

    Ok(())
}
