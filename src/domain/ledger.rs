// ==========================================
// 班组排班优化系统 - 排班台账基础操作
// ==========================================
// 职责: 台账字符串/标记序列上的纯函数
// 红线: 无 IO，无状态
// ==========================================

use crate::domain::codec::{decode_days, encode_days, ChangeRequest, CodecError, DayMask};
use crate::domain::types::{parse_day_name, DAYS_PER_WEEK, SHIFTS_PER_WEEK};
use std::collections::BTreeMap;

/// 默认班次串（21 个 ch）
pub fn default_schedule_str(ch: char) -> String {
    std::iter::repeat(ch).take(SHIFTS_PER_WEEK).collect()
}

/// 默认日期串（7 个 ch）
pub fn default_days_str(ch: char) -> String {
    std::iter::repeat(ch).take(DAYS_PER_WEEK).collect()
}

/// 序列中所有元素是否都等于 target
///
/// 空序列视为一致（无待定修改）
pub fn is_uniform<T, I>(items: I, target: T) -> bool
where
    T: PartialEq,
    I: IntoIterator<Item = T>,
{
    items.into_iter().all(|item| item == target)
}

/// target 的最长连续长度
pub fn max_run_length<T, I>(items: I, target: T) -> usize
where
    T: PartialEq,
    I: IntoIterator<Item = T>,
{
    let mut longest = 0;
    let mut current = 0;
    for item in items {
        if item == target {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// 从 index（含）开始是否还存在 target
pub fn contains_from<T, I>(items: I, index: usize, target: T) -> bool
where
    T: PartialEq,
    I: IntoIterator<Item = T>,
{
    items.into_iter().skip(index).any(|item| item == target)
}

/// 三个 7 字符日期串按位或
pub fn merge_tristate(s1: &str, s2: &str, s3: &str) -> Result<String, CodecError> {
    let len = s1.chars().count();
    for other in [s2, s3] {
        let other_len = other.chars().count();
        if other_len != len {
            return Err(CodecError::LengthMismatch {
                left: len,
                right: other_len,
            });
        }
    }

    let merged = DayMask::merge3(&decode_days(s1)?, &decode_days(s2)?, &decode_days(s3)?);
    Ok(encode_days(&merged))
}

/// 将任意键顺序的日期映射整理为 Mon..Sun 顺序
///
/// # 说明
/// - 缺失日期直接跳过
/// - 无法识别的日期名记录告警后忽略
pub fn order_by_day(request: &ChangeRequest) -> Vec<(usize, &BTreeMap<String, Option<bool>>)> {
    let mut ordered: Vec<(usize, &BTreeMap<String, Option<bool>>)> = request
        .roster
        .iter()
        .filter_map(|(name, shifts)| match parse_day_name(name) {
            Some(day) => Some((day, shifts)),
            None => {
                tracing::warn!(day = %name, "忽略未知日期名称");
                None
            }
        })
        .collect();

    ordered.sort_by_key(|(day, _)| *day);
    ordered
}
