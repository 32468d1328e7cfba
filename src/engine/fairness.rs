// ==========================================
// 班组排班优化系统 - 替班公平性规则
// ==========================================
// 规则1: 空缺为早/中班时，排除前一日上夜班的备班人员
// 规则2: 剩余人员中取年内召回天数最少者，并列时均匀随机
// ==========================================

use crate::domain::types::Shift;
use crate::domain::worker::WorkerId;
use rand::seq::SliceRandom;
use rand::Rng;

/// 替班候选人
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubstituteCandidate {
    pub worker_id: WorkerId,
    /// 年内备班召回天数
    pub call_in_days: u32,
    /// 前一日是否上夜班（周一回看上周日）
    pub worked_night_before: bool,
}

/// 过滤违反夜班后休息规则的候选人
pub fn rested_candidates(
    vacant: Shift,
    candidates: &[SubstituteCandidate],
) -> Vec<SubstituteCandidate> {
    candidates
        .iter()
        .filter(|c| vacant == Shift::Night || !c.worked_night_before)
        .copied()
        .collect()
}

/// 选择替班人员
///
/// # 返回
/// - Some(worker): 召回最少者之一
/// - None: 无合格候选
pub fn select_substitute<R: Rng + ?Sized>(
    vacant: Shift,
    candidates: &[SubstituteCandidate],
    rng: &mut R,
) -> Option<WorkerId> {
    let eligible = rested_candidates(vacant, candidates);
    let fewest = eligible.iter().map(|c| c.call_in_days).min()?;
    let tied: Vec<WorkerId> = eligible
        .iter()
        .filter(|c| c.call_in_days == fewest)
        .map(|c| c.worker_id)
        .collect();
    tied.choose(rng).copied()
}

/// 从休息人员中随机召回一人
pub fn pick_day_off_worker<R: Rng + ?Sized>(off_workers: &[WorkerId], rng: &mut R) -> Option<WorkerId> {
    off_workers.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn candidate(id: i64, call_in_days: u32, worked_night_before: bool) -> SubstituteCandidate {
        SubstituteCandidate {
            worker_id: WorkerId(id),
            call_in_days,
            worked_night_before,
        }
    }

    #[test]
    fn test_fewest_call_ins_win() {
        // A:0, B:2, C:0 -> 只能抽到 A 或 C
        let pool = [candidate(1, 0, false), candidate(2, 2, false), candidate(3, 0, false)];
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let picked = select_substitute(Shift::Morning, &pool, &mut rng).unwrap();
            assert_ne!(picked, WorkerId(2));
            seen.insert(picked);
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_night_before_excluded_for_day_shifts() {
        let pool = [candidate(1, 0, true), candidate(2, 5, false)];
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_substitute(Shift::Afternoon, &pool, &mut rng), Some(WorkerId(2)));
        assert_eq!(select_substitute(Shift::Night, &pool, &mut rng), Some(WorkerId(1)));

        let tired = [candidate(1, 0, true)];
        assert_eq!(select_substitute(Shift::Morning, &tired, &mut rng), None);
        assert_eq!(select_substitute(Shift::Morning, &[], &mut rng), None);
    }

    #[test]
    fn test_pick_day_off_worker() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(pick_day_off_worker(&[], &mut rng), None);
        let picked = pick_day_off_worker(&[WorkerId(4), WorkerId(9)], &mut rng).unwrap();
        assert!(picked == WorkerId(4) || picked == WorkerId(9));
    }
}
