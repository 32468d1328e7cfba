// ==========================================
// 缺勤处理集成测试
// ==========================================
// 测试目标: 病假替班/级联重排、替班公平性、休假额度与跨周拆分
// 时间基准: 2026-10-16（周五，W42）
// ==========================================


use crew_optimizer::api::{ClaimReply, RosterApi, ScheduleApi};
use crew_optimizer::domain::{
    DayCategory, LeaveMode, RunKind, Shift, ShiftMark, SolverStatus, WeekKey, WorkerId,
};
use crew_optimizer::engine::{ClaimWindow, EngineError, LeaveRequest, RosterRepositories, Substitution};
use crew_optimizer::logging;
use std::collections::HashSet;
use test_helpers::*;

fn sickness(start: chrono::NaiveDate, end: chrono::NaiveDate) -> ClaimWindow {
    ClaimWindow::new(LeaveMode::Sickness, start, end).unwrap()
}

// ==========================================
// 病假
// ==========================================

#[test]
fn test_three_day_sickness_with_substitute_and_cascade() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();

    let sam = seed_worker(&repos, "sam");
    let rita = seed_worker(&repos, "rita");
    let otto = seed_worker(&repos, "otto");
    // 周五 sam 休息；周六 rita 备班；周日无人备班，仅 otto 休息
    seed_roster(&repos, sam, week(42), |r| publish_pattern(r, "MMROOMM"));
    seed_roster(&repos, rita, week(42), |r| publish_pattern(r, "MMMOORM"));
    seed_roster(&repos, otto, week(42), |r| publish_pattern(r, "AAAAROO"));
    for id in [sam, rita, otto] {
        seed_blank(&repos, id, week(43));
    }

    let (_, resolver) = build_engine(&repos, relaxed_config(), 7);
    let outcome = resolver
        .claim_sickness(sam, &sickness(date(2026, 10, 16), date(2026, 10, 18)))
        .unwrap();

    assert_eq!(outcome.days_marked, 3);
    assert_eq!(
        outcome.substitutions,
        vec![Substitution {
            date: date(2026, 10, 17),
            shift: Shift::Morning,
            substitute: rita,
        }]
    );
    let cascade = outcome.cascade.expect("Sunday should cascade");
    assert_eq!(cascade.date, date(2026, 10, 18));
    assert_eq!(cascade.shift, Shift::Morning);
    assert_eq!(cascade.called_in, Some(otto));
    assert_eq!(cascade.report.status, SolverStatus::Optimal);
    assert_eq!(cascade.report.kind, RunKind::Reoptimize);

    let sam_week = repos.roster_repo.get_roster(sam, week(42)).unwrap();
    for day in 4..7 {
        assert_eq!(sam_week.category(day), Some(DayCategory::Sick));
    }
    assert_eq!(sam_week.held_shift(0), Some(Shift::Morning));

    let rita_week = repos.roster_repo.get_roster(rita, week(42)).unwrap();
    assert_eq!(rita_week.held_shift(5), Some(Shift::Morning));
    assert!(rita_week.reserve_call_in);
    assert!(rita_week.reserve_call_in_days.get(5));

    let otto_week = repos.roster_repo.get_roster(otto, week(42)).unwrap();
    assert_eq!(otto_week.held_shift(6), Some(Shift::Morning));
    assert!(otto_week.day_off_call_in);
    assert!(otto_week.day_off_call_in_days.get(6));

    // 重排后下周已排满并发布
    for id in [sam, rita, otto] {
        let next = repos.roster_repo.get_roster(id, week(43)).unwrap();
        assert!(next.published);
        assert_eq!(next.days.count(DayCategory::Work), 4);
        assert_eq!(next.days.count(DayCategory::Off), 2);
        assert_eq!(next.days.count(DayCategory::Reserve), 1);
    }

    let runs = repos.run_repo.list_recent(1).unwrap();
    assert_eq!(runs[0].cut_day_index, 7);
    assert_eq!(runs[0].window_start, date(2026, 10, 12));
}

#[test]
fn test_sickness_on_rest_days_only_marks() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();
    let sam = seed_worker(&repos, "sam");
    seed_roster(&repos, sam, week(42), |r| publish_pattern(r, "MMMMORO"));

    let (_, resolver) = build_engine(&repos, relaxed_config(), 7);
    let outcome = resolver
        .claim_sickness(sam, &sickness(date(2026, 10, 16), date(2026, 10, 18)))
        .unwrap();

    assert_eq!(outcome.days_marked, 3);
    assert!(outcome.substitutions.is_empty());
    assert!(outcome.cascade.is_none());
    assert!(repos.run_repo.list_recent(5).unwrap().is_empty());

    let roster = repos.roster_repo.get_roster(sam, week(42)).unwrap();
    assert_eq!(roster.days.count(DayCategory::Sick), 3);
    assert_eq!(roster.revision, 1);
}

#[test]
fn test_sickness_in_application_week_is_only_marked() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();
    let sam = seed_worker(&repos, "sam");
    let rita = seed_worker(&repos, "rita");
    seed_roster(&repos, sam, week(44), |r| {
        r.application.set(0, Shift::Morning, ShiftMark::Applied);
    });
    seed_roster(&repos, rita, week(44), |r| publish_pattern(r, "RMMMMOO"));

    let (_, resolver) = build_engine(&repos, relaxed_config(), 7);
    let outcome = resolver
        .claim_sickness(sam, &sickness(date(2026, 10, 26), date(2026, 10, 27)))
        .unwrap();

    assert_eq!(outcome.days_marked, 2);
    assert!(outcome.substitutions.is_empty());

    let roster = repos.roster_repo.get_roster(sam, week(44)).unwrap();
    assert_eq!(roster.category(0), Some(DayCategory::Sick));
    // 缺勤日的申请位被清除
    assert!(!roster.application.is_applied(0, Shift::Morning));
    let untouched = repos.roster_repo.get_roster(rita, week(44)).unwrap();
    assert_eq!(untouched.revision, 0);
}

#[test]
fn test_sickness_before_current_week_is_rejected_without_writes() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();

    let sam = seed_worker(&repos, "sam");
    let otto = seed_worker(&repos, "otto");
    // 上周（W41）周四无人备班，若放行将触发级联
    seed_roster(&repos, sam, week(41), |r| publish_pattern(r, "MMMMOOR"));
    seed_roster(&repos, otto, week(41), |r| publish_pattern(r, "AAAOMRO"));

    let (_, resolver) = build_engine(&repos, relaxed_config(), 5);
    let result = resolver.claim_sickness(sam, &sickness(date(2026, 10, 8), date(2026, 10, 8)));
    match result {
        Err(EngineError::DateRangeInvalid { earliest, .. }) => {
            assert_eq!(earliest, date(2026, 10, 12));
        }
        other => panic!("unexpected result: {:?}", other.map(|o| o.days_marked)),
    }

    for id in [sam, otto] {
        let roster = repos.roster_repo.get_roster(id, week(41)).unwrap();
        assert_eq!(roster.revision, 0);
        assert!(!roster.day_off_call_in);
    }
    let sam_week = repos.roster_repo.get_roster(sam, week(41)).unwrap();
    assert_eq!(sam_week.held_shift(3), Some(Shift::Morning));
    assert!(repos.run_repo.list_recent(1).unwrap().is_empty());
}

// ==========================================
// 替班公平性
// ==========================================

/// 周四 sam 早班生病；ava/ben/cal 备班
fn seed_thursday_reserves(
    repos: &RosterRepositories,
    ava_pattern: &str,
    ben_prior_call_ins: usize,
) -> (WorkerId, WorkerId, WorkerId, WorkerId) {
    let sam = seed_worker(repos, "sam");
    let ava = seed_worker(repos, "ava");
    let ben = seed_worker(repos, "ben");
    let cal = seed_worker(repos, "cal");

    seed_roster(repos, sam, week(42), |r| publish_pattern(r, "MMMMORO"));
    seed_roster(repos, ava, week(42), |r| publish_pattern(r, ava_pattern));
    seed_roster(repos, ben, week(42), |r| publish_pattern(r, "MMORAAO"));
    seed_roster(repos, cal, week(42), |r| publish_pattern(r, "AAORMMO"));

    seed_roster(repos, ben, week(40), |r| {
        for day in 0..ben_prior_call_ins {
            r.set_category(day, Some(DayCategory::Reserve));
            r.record_reserve_call_in(day, Shift::Afternoon);
        }
    });
    (sam, ava, ben, cal)
}

#[test]
fn test_substitute_skips_night_worker_and_busy_reserve() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();
    // ava 周三夜班，不能接周四早班；ben 已被召回 2 次
    let (sam, _ava, _ben, cal) = seed_thursday_reserves(&repos, "MMNROOA", 2);

    let (_, resolver) = build_engine(&repos, relaxed_config(), 3);
    let outcome = resolver
        .claim_sickness(sam, &sickness(date(2026, 10, 15), date(2026, 10, 15)))
        .unwrap();

    assert_eq!(outcome.substitutions.len(), 1);
    assert_eq!(outcome.substitutions[0].substitute, cal);
    assert!(outcome.cascade.is_none());

    let cal_week = repos.roster_repo.get_roster(cal, week(42)).unwrap();
    assert_eq!(cal_week.held_shift(3), Some(Shift::Morning));
    assert!(cal_week.reserve_call_in);
}

#[test]
fn test_substitute_draw_is_uniform_among_least_called() {
    let mut picked = HashSet::new();
    for seed in 0..24 {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repos = open_repos(&db_path).unwrap();
        let (sam, ava, ben, cal) = seed_thursday_reserves(&repos, "MMOROAA", 2);

        let (_, resolver) = build_engine(&repos, relaxed_config(), seed);
        let outcome = resolver
            .claim_sickness(sam, &sickness(date(2026, 10, 15), date(2026, 10, 15)))
            .unwrap();
        let substitute = outcome.substitutions[0].substitute;
        assert_ne!(substitute, ben);
        assert!(substitute == ava || substitute == cal);
        picked.insert(substitute);
    }
    assert_eq!(picked.len(), 2);
}

#[test]
fn test_monday_vacancy_looks_back_to_previous_sunday() {
    for seed in 0..16 {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let repos = open_repos(&db_path).unwrap();

        let sam = seed_worker(&repos, "sam");
        let ava = seed_worker(&repos, "ava");
        let cal = seed_worker(&repos, "cal");
        // ava 上周日夜班，不能接周一早班
        seed_roster(&repos, ava, week(41), |r| publish_pattern(r, "MMMORON"));
        seed_roster(&repos, cal, week(41), |r| publish_pattern(r, "MMMMORO"));

        seed_roster(&repos, sam, week(42), |r| publish_pattern(r, "MMMMORO"));
        seed_roster(&repos, ava, week(42), |r| publish_pattern(r, "ROMMMOA"));
        seed_roster(&repos, cal, week(42), |r| publish_pattern(r, "ROAAAOM"));

        let (_, resolver) = build_engine(&repos, relaxed_config(), seed);
        let outcome = resolver
            .claim_sickness(sam, &sickness(date(2026, 10, 12), date(2026, 10, 12)))
            .unwrap();

        assert_eq!(
            outcome.substitutions,
            vec![Substitution {
                date: date(2026, 10, 12),
                shift: Shift::Morning,
                substitute: cal,
            }],
            "seed {}",
            seed
        );
        assert!(outcome.cascade.is_none());
        let ava_week = repos.roster_repo.get_roster(ava, week(42)).unwrap();
        assert_eq!(ava_week.category(0), Some(DayCategory::Reserve));
    }
}

// ==========================================
// 休假
// ==========================================

fn roster_api(
    repos: &RosterRepositories,
) -> (RosterApi, ScheduleApi) {
    let (optimizer, resolver) = build_engine(repos, relaxed_config(), 11);
    (
        RosterApi::new(repos.clone(), resolver.clone(), fixed_clock()),
        ScheduleApi::new(repos.clone(), optimizer, resolver, fixed_clock()),
    )
}

fn vacation(start: chrono::NaiveDate, end: chrono::NaiveDate) -> LeaveRequest {
    LeaveRequest {
        mode: LeaveMode::Vacation,
        start,
        end,
    }
}

#[test]
fn test_vacation_quota_rejection_leaves_ledger_untouched() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();
    let alice = seed_worker(&repos, "alice");

    // 已休 18 天
    for (n, days) in [(30, 7), (31, 7), (32, 4)] {
        seed_roster(&repos, alice, week(n), |r| {
            for day in 0..days {
                r.mark_leave(day, LeaveMode::Vacation);
            }
        });
    }
    seed_blank(&repos, alice, week(44));
    assert_eq!(repos.roster_repo.count_vacation_days(alice, 2026).unwrap(), 18);

    let (api, _) = roster_api(&repos);
    let reply = api
        .claim_leave("alice", &vacation(date(2026, 10, 26), date(2026, 10, 30)))
        .unwrap();
    assert_eq!(
        reply,
        ClaimReply::rejected(
            "You can't take 5 more vacation days, you have only 2 days left!".to_string()
        )
    );
    assert_eq!(repos.roster_repo.count_vacation_days(alice, 2026).unwrap(), 18);
    assert_eq!(repos.roster_repo.get_roster(alice, week(44)).unwrap().revision, 0);

    // 剩余额度内的申请通过
    let reply = api
        .claim_leave("alice", &vacation(date(2026, 10, 26), date(2026, 10, 27)))
        .unwrap();
    assert!(reply.accepted);
    assert!(reply.message.contains("0 vacation days left"));
    assert_eq!(repos.roster_repo.count_vacation_days(alice, 2026).unwrap(), 20);
}

#[test]
fn test_vacation_quota_is_per_year_and_ignores_days_already_taken() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();
    let alice = seed_worker(&repos, "alice");

    for (n, days) in [(30, 7), (31, 7), (32, 4)] {
        seed_roster(&repos, alice, week(n), |r| {
            for day in 0..days {
                r.mark_leave(day, LeaveMode::Vacation);
            }
        });
    }
    let last_2026 = WeekKey::new(2026, 53).unwrap();
    let first_2027 = WeekKey::new(2027, 1).unwrap();
    seed_blank(&repos, alice, last_2026);
    seed_blank(&repos, alice, first_2027);

    let (_, resolver) = build_engine(&repos, relaxed_config(), 1);
    // 2027-01-02/03 属 2026-W53，01-04 起属 2027-W01
    let window = ClaimWindow::new(LeaveMode::Vacation, date(2027, 1, 2), date(2027, 1, 6)).unwrap();
    let outcome = resolver.claim_vacation(alice, &window, true).unwrap();
    assert_eq!(outcome.days, 5);
    assert_eq!(outcome.weeks_touched, 2);
    assert_eq!(outcome.remaining, 0);
    assert_eq!(repos.roster_repo.count_vacation_days(alice, 2026).unwrap(), 20);
    assert_eq!(repos.roster_repo.count_vacation_days(alice, 2027).unwrap(), 3);

    // 重复申请同一区间不再占用额度
    let again = resolver.claim_vacation(alice, &window, true).unwrap();
    assert_eq!(again.remaining, 0);
    assert_eq!(repos.roster_repo.count_vacation_days(alice, 2026).unwrap(), 20);
    assert_eq!(repos.roster_repo.count_vacation_days(alice, 2027).unwrap(), 3);

    // 2026 年已满，再多一天即拒绝
    let year_end = ClaimWindow::new(LeaveMode::Vacation, date(2026, 12, 31), date(2027, 1, 2)).unwrap();
    assert!(matches!(
        resolver.claim_vacation(alice, &year_end, true),
        Err(EngineError::QuotaExceeded { requested: 2, remaining: 0 })
    ));
}

#[test]
fn test_multi_week_vacation_and_rejection() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();
    let alice = seed_worker(&repos, "alice");
    seed_blank(&repos, alice, week(44));
    seed_blank(&repos, alice, week(45));

    let (api, schedule) = roster_api(&repos);
    // 2026-10-30（周五）至 2026-11-08（周日）共 10 天
    let reply = api
        .claim_leave("alice", &vacation(date(2026, 10, 30), date(2026, 11, 8)))
        .unwrap();
    assert!(reply.accepted, "{}", reply.message);

    let first = repos.roster_repo.get_roster(alice, week(44)).unwrap();
    let second = repos.roster_repo.get_roster(alice, week(45)).unwrap();
    for day in 0..4 {
        assert_eq!(first.category(day), None);
    }
    for day in 4..7 {
        assert_eq!(first.category(day), Some(DayCategory::Vacation));
    }
    assert_eq!(second.days.count(DayCategory::Vacation), 7);
    assert_eq!(repos.roster_repo.count_vacation_days(alice, 2026).unwrap(), 10);

    let message = schedule
        .reject_vacation("alice", date(2026, 10, 30), date(2026, 11, 8))
        .unwrap();
    assert!(message.contains("alice"));
    assert_eq!(repos.roster_repo.count_vacation_days(alice, 2026).unwrap(), 0);
    let second = repos.roster_repo.get_roster(alice, week(45)).unwrap();
    assert_eq!(second.category(0), None);
}

#[test]
fn test_vacation_is_all_or_nothing_when_a_week_is_missing() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();
    let alice = seed_worker(&repos, "alice");
    seed_blank(&repos, alice, week(44));

    let (api, _) = roster_api(&repos);
    assert!(api
        .claim_leave("alice", &vacation(date(2026, 10, 30), date(2026, 11, 8)))
        .is_err());

    let first = repos.roster_repo.get_roster(alice, week(44)).unwrap();
    assert_eq!(first.days.count(DayCategory::Vacation), 0);
    assert_eq!(first.revision, 0);
}

#[test]
fn test_claim_date_ranges_are_validated() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();
    seed_worker(&repos, "alice");
    let (api, _) = roster_api(&repos);

    let early = api
        .claim_leave("alice", &vacation(date(2026, 10, 20), date(2026, 10, 22)))
        .unwrap();
    assert!(!early.accepted);
    assert!(early.message.contains("2026-10-26"));

    let late_sickness = api
        .claim_leave(
            "alice",
            &LeaveRequest {
                mode: LeaveMode::Sickness,
                start: date(2026, 10, 19),
                end: date(2026, 10, 20),
            },
        )
        .unwrap();
    assert!(!late_sickness.accepted);
    assert!(late_sickness.message.contains("2026-10-12"));
    assert!(late_sickness.message.contains("2026-10-18"));

    let reversed = api
        .claim_leave("alice", &vacation(date(2026, 10, 30), date(2026, 10, 28)))
        .unwrap();
    assert!(!reversed.accepted);

    assert!(api
        .claim_leave("nobody", &vacation(date(2026, 10, 26), date(2026, 10, 27)))
        .is_err());
}
