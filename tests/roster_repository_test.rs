// ==========================================
// Repository 层集成测试
// ==========================================
// 测试目标: 台账持久化、乐观锁、整批回滚、年度计数
// ==========================================


use crew_optimizer::domain::{DayCategory, LeaveMode, Shift, WorkerRole};
use crew_optimizer::logging;
use crew_optimizer::repository::RepositoryError;
use test_helpers::*;

#[test]
fn test_roster_round_trip_through_sqlite() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let repos = open_repos(&db_path).unwrap();

    let alice = seed_worker(&repos, "alice");
    let inserted = seed_roster(&repos, alice, week(42), |r| publish_pattern(r, "MANROO-"));

    let loaded = repos.roster_repo.get_roster(alice, week(42)).unwrap();
    assert_eq!(loaded, inserted);
    assert_eq!(loaded.held_shift(1), Some(Shift::Afternoon));
    assert!(loaded.worked_night(2));
    assert_eq!(loaded.category(3), Some(DayCategory::Reserve));
    assert_eq!(loaded.category(6), None);
    assert!(loaded.published);

    assert!(repos.roster_repo.find(alice, week(43)).unwrap().is_none());
    assert!(matches!(
        repos.roster_repo.get_roster(alice, week(43)),
        Err(RepositoryError::NotFound { .. })
    ));
}

#[test]
fn test_list_rosters_excludes_role_and_orders_by_worker() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();

    let boss = repos.worker_repo.create("boss", WorkerRole::Supervisor).unwrap();
    let bob = seed_worker(&repos, "bob");
    let alice = seed_worker(&repos, "alice");
    for id in [boss, bob, alice] {
        seed_blank(&repos, id, week(44));
    }

    let crew = repos
        .roster_repo
        .list_rosters(week(44), Some(WorkerRole::Supervisor))
        .unwrap();
    let ids: Vec<_> = crew.iter().map(|r| r.worker_id).collect();
    assert_eq!(ids, vec![bob, alice]);

    let everyone = repos.roster_repo.list_rosters(week(44), None).unwrap();
    assert_eq!(everyone.len(), 3);
}

#[test]
fn test_stale_revision_is_rejected() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();
    let alice = seed_worker(&repos, "alice");
    seed_blank(&repos, alice, week(44));

    let mut first = repos.roster_repo.get_roster(alice, week(44)).unwrap();
    let mut second = first.clone();

    first.assign_shift(0, Shift::Morning);
    repos.roster_repo.save(&mut first).unwrap();
    assert_eq!(first.revision, 1);

    second.set_category(0, Some(DayCategory::Off));
    let err = repos.roster_repo.save(&mut second).unwrap_err();
    match err {
        RepositoryError::OptimisticLockFailure { expected, actual, .. } => {
            assert_eq!(expected, 0);
            assert_eq!(actual, 1);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(second.revision, 0);

    let stored = repos.roster_repo.get_roster(alice, week(44)).unwrap();
    assert_eq!(stored.held_shift(0), Some(Shift::Morning));
}

#[test]
fn test_batch_save_rolls_back_on_conflict() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();
    let alice = seed_worker(&repos, "alice");
    let bob = seed_worker(&repos, "bob");
    seed_blank(&repos, alice, week(44));
    seed_blank(&repos, bob, week(44));

    // bob 的台账被并发修改
    let mut concurrent = repos.roster_repo.get_roster(bob, week(44)).unwrap();
    concurrent.set_category(2, Some(DayCategory::Reserve));
    repos.roster_repo.save(&mut concurrent).unwrap();

    let mut a = repos.roster_repo.get_roster(alice, week(44)).unwrap();
    let mut b = a.clone();
    b.worker_id = bob;
    a.mark_leave(0, LeaveMode::Vacation);
    b.mark_leave(0, LeaveMode::Vacation);

    let mut batch = vec![a, b];
    assert!(repos.roster_repo.save_batch(&mut batch).is_err());
    assert!(batch.iter().all(|r| r.revision == 0));

    let stored = repos.roster_repo.get_roster(alice, week(44)).unwrap();
    assert_eq!(stored.category(0), None);
    assert_eq!(stored.revision, 0);
}

#[test]
fn test_year_counters() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();
    let alice = seed_worker(&repos, "alice");

    seed_roster(&repos, alice, week(30), |r| {
        for day in 0..7 {
            r.mark_leave(day, LeaveMode::Vacation);
        }
    });
    seed_roster(&repos, alice, week(31), |r| {
        r.mark_leave(0, LeaveMode::Vacation);
        r.mark_leave(1, LeaveMode::Sickness);
        r.set_category(2, Some(DayCategory::Reserve));
        r.record_reserve_call_in(2, Shift::Night);
    });
    // 其他年份不计入
    seed_roster(&repos, alice, crew_optimizer::domain::WeekKey::new(2025, 30).unwrap(), |r| {
        r.mark_leave(0, LeaveMode::Vacation);
    });

    assert_eq!(repos.roster_repo.count_vacation_days(alice, 2026).unwrap(), 8);
    assert_eq!(repos.roster_repo.count_reserve_call_in_days(alice, 2026).unwrap(), 1);
    assert_eq!(repos.roster_repo.count_vacation_days(alice, 2025).unwrap(), 1);
}

#[test]
fn test_invalid_roster_is_not_written() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repos = open_repos(&db_path).unwrap();
    let alice = seed_worker(&repos, "alice");
    seed_blank(&repos, alice, week(44));

    let mut roster = repos.roster_repo.get_roster(alice, week(44)).unwrap();
    roster.assign_shift(0, Shift::Morning);
    // 同一天两个班次
    roster
        .schedule
        .set(0, Shift::Night, crew_optimizer::domain::ShiftMark::Applied);
    assert!(matches!(
        repos.roster_repo.save(&mut roster),
        Err(RepositoryError::ValidationError(_))
    ));
}
