// ==========================================
// 班组排班优化系统 - 台账摘要
// ==========================================
// 职责: 将申请/修改/排班渲染为面向人员的文本
// ==========================================

use crate::domain::roster::Roster;
use crate::domain::types::{day_label, Shift, ShiftMark, DAYS_PER_WEEK};
use crate::i18n::{t, t_with_args};

fn week_arg(roster: &Roster) -> String {
    roster.week.week().to_string()
}

/// 申请摘要: 每个申请日一行 "Monday: morning, night"
pub fn application_summary(roster: &Roster) -> String {
    let mut lines = vec![t_with_args(
        "summary.application_header",
        &[("week", &week_arg(roster))],
    )];
    for day in 0..DAYS_PER_WEEK {
        let shifts: Vec<&str> = roster
            .application
            .applied_shifts(day)
            .into_iter()
            .map(Shift::as_str)
            .collect();
        if !shifts.is_empty() {
            lines.push(format!("{}: {}", day_label(day), shifts.join(", ")));
        }
    }
    if lines.len() == 1 {
        lines.push(t("common.none"));
    }
    lines.join("\n")
}

/// 修改摘要: 仅列出已设置的位
pub fn modification_summary(roster: &Roster) -> String {
    let mut lines = vec![t_with_args(
        "summary.modification_header",
        &[("week", &week_arg(roster))],
    )];
    for day in 0..DAYS_PER_WEEK {
        let mut changes = Vec::new();
        for shift in Shift::ALL {
            match roster.modification.get(day, shift) {
                ShiftMark::Applied => changes.push(format!("{} {}", t("summary.applied"), shift)),
                ShiftMark::NotApplied => {
                    changes.push(format!("{} {}", t("summary.withdrawn"), shift))
                }
                ShiftMark::Unset => {}
            }
        }
        if !changes.is_empty() {
            lines.push(format!("{}: {}", day_label(day), changes.join(", ")));
        }
    }
    if lines.len() == 1 {
        lines.push(t("common.none"));
    }
    lines.join("\n")
}

/// 排班摘要: 每天的类别与班次
pub fn schedule_summary(roster: &Roster) -> String {
    let mut lines = vec![t_with_args(
        "summary.schedule_header",
        &[("week", &week_arg(roster))],
    )];
    for day in 0..DAYS_PER_WEEK {
        let category = match roster.category(day) {
            Some(c) => t(&format!("category.{}", c)),
            None => t("category.UNPLANNED"),
        };
        match roster.held_shift(day) {
            Some(shift) => lines.push(format!("{}: {} ({})", day_label(day), category, shift)),
            None => lines.push(format!("{}: {}", day_label(day), category)),
        }
    }
    lines.join("\n")
}
