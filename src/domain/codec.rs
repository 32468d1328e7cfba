// ==========================================
// 班组排班优化系统 - 排班字符串编解码
// ==========================================
// 持久化格式:
// - 班次串 21 字符: Mon..Sun × 早/中/夜，取值 {0,1,x}
// - 日期串 7 字符: Mon..Sun，取值 {0,1}
// 内存格式: ShiftGrid / DayMask / DayPlan
// ==========================================

use crate::domain::ledger::order_by_day;
use crate::domain::types::{
    DayCategory, Shift, ShiftMark, DAYS_PER_WEEK, SHIFTS_PER_DAY, SHIFTS_PER_WEEK,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::BitOr;
use thiserror::Error;

/// 编解码错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("格式错误: {0}")]
    FormatError(String),

    #[error("长度不一致: left={left}, right={right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("日类别冲突: 第{day}天同时属于多个类别")]
    CategoryConflict { day: usize },
}

// ==========================================
// ShiftGrid - 7×3 班次网格
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShiftGrid([[ShiftMark; SHIFTS_PER_DAY]; DAYS_PER_WEEK]);

impl ShiftGrid {
    /// 全部未设置（'x'）
    pub fn unset() -> Self {
        Self::filled(ShiftMark::Unset)
    }

    pub fn filled(mark: ShiftMark) -> Self {
        ShiftGrid([[mark; SHIFTS_PER_DAY]; DAYS_PER_WEEK])
    }

    pub fn get(&self, day: usize, shift: Shift) -> ShiftMark {
        self.0[day][shift.index()]
    }

    pub fn set(&mut self, day: usize, shift: Shift, mark: ShiftMark) {
        self.0[day][shift.index()] = mark;
    }

    pub fn is_applied(&self, day: usize, shift: Shift) -> bool {
        self.get(day, shift).is_applied()
    }

    /// 当天第一个被标记为 '1' 的班次
    pub fn applied_shift(&self, day: usize) -> Option<Shift> {
        Shift::ALL.into_iter().find(|s| self.is_applied(day, *s))
    }

    /// 当天被标记为 '1' 的全部班次
    pub fn applied_shifts(&self, day: usize) -> Vec<Shift> {
        Shift::ALL
            .into_iter()
            .filter(|s| self.is_applied(day, *s))
            .collect()
    }

    /// 将某天三个班次统一置为 mark
    pub fn fill_day(&mut self, day: usize, mark: ShiftMark) {
        self.0[day] = [mark; SHIFTS_PER_DAY];
    }

    /// 按持久化顺序展开的标记序列
    pub fn marks(&self) -> impl Iterator<Item = ShiftMark> + '_ {
        self.0.iter().flat_map(|day| day.iter().copied())
    }

    /// 类型化的 overwrite_mask: overlay 中已设置的位置覆盖 self
    pub fn overlay(&self, overlay: &ShiftGrid) -> ShiftGrid {
        let mut merged = *self;
        for day in 0..DAYS_PER_WEEK {
            for shift in Shift::ALL {
                let mark = overlay.get(day, shift);
                if mark != ShiftMark::Unset {
                    merged.set(day, shift, mark);
                }
            }
        }
        merged
    }
}

/// 解码 21 字符班次串
///
/// # 规则
/// - '1' -> Applied
/// - 'x' -> Unset
/// - 其他字符 -> NotApplied
pub fn decode(bits: &str) -> Result<ShiftGrid, CodecError> {
    let chars: Vec<char> = bits.chars().collect();
    if chars.len() != SHIFTS_PER_WEEK {
        return Err(CodecError::FormatError(format!(
            "班次串长度应为{}，实际为{}",
            SHIFTS_PER_WEEK,
            chars.len()
        )));
    }

    let mut grid = ShiftGrid::unset();
    for (pos, ch) in chars.into_iter().enumerate() {
        let day = pos / SHIFTS_PER_DAY;
        if let Some(shift) = Shift::from_index(pos % SHIFTS_PER_DAY) {
            grid.set(day, shift, ShiftMark::from_char(ch));
        }
    }
    Ok(grid)
}

/// 编码为 21 字符班次串
///
/// # 参数
/// - unset_as_x: true 时未设置位置输出 'x'，否则输出 '0'
pub fn encode(grid: &ShiftGrid, unset_as_x: bool) -> String {
    grid.marks().map(|m| m.to_char(unset_as_x)).collect()
}

/// 以 overlay 覆盖 base: overlay 为 '0'/'1' 的位置取 overlay，其余保留 base
pub fn overwrite_mask(base: &str, overlay: &str) -> Result<String, CodecError> {
    let left = base.chars().count();
    let right = overlay.chars().count();
    if left != right {
        return Err(CodecError::LengthMismatch { left, right });
    }

    Ok(base
        .chars()
        .zip(overlay.chars())
        .map(|(b, o)| if o == '0' || o == '1' { o } else { b })
        .collect())
}

// ==========================================
// ChangeRequest - 结构化变更请求
// ==========================================
// 由对话层解析后提供: {"roster": {"monday": {"morning": true, ...}}}
// null 表示该班次不变更
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeRequest {
    #[serde(default)]
    pub roster: BTreeMap<String, BTreeMap<String, Option<bool>>>,
}

impl ChangeRequest {
    /// 追加一条 (日期, 班次, 取值)
    pub fn with(mut self, day: &str, shift: &str, value: Option<bool>) -> Self {
        self.roster
            .entry(day.to_string())
            .or_default()
            .insert(shift.to_string(), value);
        self
    }
}

/// 补全结构化请求: 缺失的日期/班次一律为 Unset
pub fn canonicalize(request: &ChangeRequest) -> ShiftGrid {
    let mut grid = ShiftGrid::unset();
    for (day, shifts) in order_by_day(request) {
        for (name, value) in shifts {
            match Shift::parse(name) {
                Some(shift) => {
                    let mark = value.map(ShiftMark::from_bool).unwrap_or(ShiftMark::Unset);
                    grid.set(day, shift, mark);
                }
                None => tracing::warn!(shift = %name, "忽略未知班次名称"),
            }
        }
    }
    grid
}

// ==========================================
// DayMask - 7 日布尔掩码
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayMask([bool; DAYS_PER_WEEK]);

impl DayMask {
    pub fn empty() -> Self {
        DayMask([false; DAYS_PER_WEEK])
    }

    pub fn from_days(days: [bool; DAYS_PER_WEEK]) -> Self {
        DayMask(days)
    }

    pub fn get(&self, day: usize) -> bool {
        self.0[day]
    }

    pub fn set(&mut self, day: usize, value: bool) {
        self.0[day] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().copied()
    }

    pub fn count(&self) -> usize {
        self.iter().filter(|d| *d).count()
    }

    pub fn any(&self) -> bool {
        self.iter().any(|d| d)
    }

    /// 三个掩码按位或
    pub fn merge3(a: &DayMask, b: &DayMask, c: &DayMask) -> DayMask {
        *a | *b | *c
    }
}

impl BitOr for DayMask {
    type Output = DayMask;

    fn bitor(self, rhs: DayMask) -> DayMask {
        let mut out = self;
        for day in 0..DAYS_PER_WEEK {
            out.0[day] = self.0[day] || rhs.0[day];
        }
        out
    }
}

/// 解码 7 字符日期串（严格二值）
pub fn decode_days(bits: &str) -> Result<DayMask, CodecError> {
    let chars: Vec<char> = bits.chars().collect();
    if chars.len() != DAYS_PER_WEEK {
        return Err(CodecError::FormatError(format!(
            "日期串长度应为{}，实际为{}",
            DAYS_PER_WEEK,
            chars.len()
        )));
    }

    let mut mask = DayMask::empty();
    for (day, ch) in chars.into_iter().enumerate() {
        match ch {
            '1' => mask.set(day, true),
            '0' => {}
            other => {
                return Err(CodecError::FormatError(format!(
                    "日期串包含非法字符 '{}'（位置 {}）",
                    other, day
                )))
            }
        }
    }
    Ok(mask)
}

pub fn encode_days(mask: &DayMask) -> String {
    mask.iter().map(|d| if d { '1' } else { '0' }).collect()
}

// ==========================================
// DayPlan - 每日类别（五选一）
// ==========================================
// None 表示尚未排定（持久化为五个类别位均为 0）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayPlan([Option<DayCategory>; DAYS_PER_WEEK]);

impl DayPlan {
    pub fn unplanned() -> Self {
        DayPlan([None; DAYS_PER_WEEK])
    }

    pub fn from_categories(days: [Option<DayCategory>; DAYS_PER_WEEK]) -> Self {
        DayPlan(days)
    }

    pub fn get(&self, day: usize) -> Option<DayCategory> {
        self.0[day]
    }

    /// 整体替换某天的类别（单次写入，保证五选一）
    pub fn set(&mut self, day: usize, category: Option<DayCategory>) {
        self.0[day] = category;
    }

    pub fn is(&self, day: usize, category: DayCategory) -> bool {
        self.0[day] == Some(category)
    }

    /// 某类别的日期掩码
    pub fn mask(&self, category: DayCategory) -> DayMask {
        let mut mask = DayMask::empty();
        for day in 0..DAYS_PER_WEEK {
            mask.set(day, self.is(day, category));
        }
        mask
    }

    pub fn count(&self, category: DayCategory) -> usize {
        self.mask(category).count()
    }

    /// 休假 ∪ 病假
    pub fn leave_mask(&self) -> DayMask {
        self.mask(DayCategory::Vacation) | self.mask(DayCategory::Sick)
    }

    pub fn is_fully_planned(&self) -> bool {
        self.0.iter().all(|c| c.is_some())
    }

    /// 由五个持久化日期串还原
    ///
    /// # 参数
    /// - masks: 顺序为 work_days/off_days/reserve_days/vacation/sickness
    pub fn from_masks(masks: [&str; 5]) -> Result<DayPlan, CodecError> {
        let mut decoded = Vec::with_capacity(masks.len());
        for raw in masks {
            decoded.push(decode_days(raw)?);
        }

        let mut plan = DayPlan::unplanned();
        for day in 0..DAYS_PER_WEEK {
            for (category, mask) in DayCategory::ALL.iter().zip(decoded.iter()) {
                if mask.get(day) {
                    if plan.get(day).is_some() {
                        return Err(CodecError::CategoryConflict { day });
                    }
                    plan.set(day, Some(*category));
                }
            }
        }
        Ok(plan)
    }

    /// 拆分为五个持久化日期串（顺序同 from_masks）
    pub fn to_masks(&self) -> [String; 5] {
        DayCategory::ALL.map(|category| encode_days(&self.mask(category)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::default_schedule_str;

    #[test]
    fn test_decode_encode_roundtrip_binary() {
        let samples = [
            "100000000000000000000",
            "101010101010101010101",
            "000000000000000000001",
            "111111111111111111111",
        ];
        for s in samples {
            let grid = decode(s).unwrap();
            assert_eq!(encode(&grid, false), s);
        }
    }

    #[test]
    fn test_decode_maps_positions_and_sentinels() {
        let grid = decode("1x0000000000000000001").unwrap();
        assert_eq!(grid.get(0, Shift::Morning), ShiftMark::Applied);
        assert_eq!(grid.get(0, Shift::Afternoon), ShiftMark::Unset);
        assert_eq!(grid.get(0, Shift::Night), ShiftMark::NotApplied);
        assert_eq!(grid.get(6, Shift::Night), ShiftMark::Applied);
        assert_eq!(encode(&grid, true), "1x0000000000000000001");
        assert_eq!(encode(&grid, false), "100000000000000000001");
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert!(matches!(decode("1010"), Err(CodecError::FormatError(_))));
        assert!(matches!(
            decode(&format!("{}0", default_schedule_str('0'))),
            Err(CodecError::FormatError(_))
        ));
    }

    #[test]
    fn test_canonicalize_matches_decode_of_full_boolean_request() {
        let mut request = ChangeRequest::default();
        for (i, day) in ["sunday", "monday", "Wednesday", "tuesday", "friday", "thursday", "saturday"]
            .iter()
            .enumerate()
        {
            request = request
                .with(day, "night", Some(i % 2 == 0))
                .with(day, "morning", Some(true))
                .with(day, "afternoon", Some(false));
        }
        let grid = canonicalize(&request);
        assert_eq!(decode(&encode(&grid, false)).unwrap(), grid);
    }

    #[test]
    fn test_canonicalize_defaults_missing_to_unset() {
        let request = ChangeRequest::default().with("tuesday", "night", Some(true));
        let grid = canonicalize(&request);
        assert_eq!(grid.get(1, Shift::Night), ShiftMark::Applied);
        assert_eq!(grid.get(1, Shift::Morning), ShiftMark::Unset);
        assert_eq!(grid.get(0, Shift::Morning), ShiftMark::Unset);
        assert_eq!(encode(&grid, true), "xxxxx1xxxxxxxxxxxxxxx");
    }

    #[test]
    fn test_overwrite_mask() {
        let merged = overwrite_mask("1100000", "x0x1xxx").unwrap();
        assert_eq!(merged, "1001000");
        // 幂等
        assert_eq!(overwrite_mask("1100000", &merged).unwrap(), merged);
        assert_eq!(
            overwrite_mask("110", "1"),
            Err(CodecError::LengthMismatch { left: 3, right: 1 })
        );
    }

    #[test]
    fn test_grid_overlay_matches_string_overwrite() {
        let base = decode("110000000000000000000").unwrap();
        let overlay = decode("0xxxxxxxxxxxxxxxxxxx1").unwrap();
        let merged = base.overlay(&overlay);
        assert_eq!(
            encode(&merged, true),
            overwrite_mask(&encode(&base, true), &encode(&overlay, true)).unwrap()
        );
    }

    #[test]
    fn test_day_plan_masks() {
        let plan = DayPlan::from_masks(["1111000", "0000101", "0000010", "0000000", "0000000"])
            .unwrap();
        assert!(plan.is_fully_planned());
        assert_eq!(plan.count(DayCategory::Work), 4);
        assert_eq!(plan.get(5), Some(DayCategory::Reserve));
        assert_eq!(plan.to_masks()[1], "0000101");

        let conflict = DayPlan::from_masks(["1000000", "1000000", "0000000", "0000000", "0000000"]);
        assert_eq!(conflict, Err(CodecError::CategoryConflict { day: 0 }));

        assert!(decode_days("10x0000").is_err());
    }
}
