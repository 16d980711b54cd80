use githard_core::db::open_db;
use githard_core::{ProjectService, ProjectServiceError, SqliteProjectRepository};
use std::path::Path;
use std::thread;

const WORKERS: usize = 8;
const CHECKOUTS_PER_WORKER: i64 = 25;

fn with_service<T>(
    path: &Path,
    f: impl FnOnce(&ProjectService<SqliteProjectRepository<'_>>) -> T,
) -> T {
    let conn = open_db(path).unwrap();
    let service = ProjectService::new(SqliteProjectRepository::try_new(&conn).unwrap());
    f(&service)
}

fn seeded_database(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("githard.sqlite3");
    with_service(&path, |service| {
        service.create_project("Atlas", "p1", None).unwrap();
    });
    path
}

#[test]
fn concurrent_joins_of_same_user_record_one_membership() {
    let dir = tempfile::tempdir().unwrap();
    let path = seeded_database(&dir);

    let outcomes = thread::scope(|scope| {
        let handles = (0..WORKERS)
            .map(|_| {
                scope.spawn(|| with_service(&path, |service| service.add_member("p1", "u1")))
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>()
    });

    let joined = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let rejected = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Err(ProjectServiceError::AlreadyMember { .. })))
        .count();
    assert_eq!(joined, 1);
    assert_eq!(rejected, WORKERS - 1);

    let project = with_service(&path, |service| service.get_project("p1").unwrap());
    assert_eq!(project.users, vec!["u1".to_string()]);
}

#[test]
fn concurrent_joins_of_distinct_users_are_all_kept() {
    let dir = tempfile::tempdir().unwrap();
    let path = seeded_database(&dir);

    thread::scope(|scope| {
        for worker in 0..WORKERS {
            let path = &path;
            scope.spawn(move || {
                with_service(path, |service| {
                    service.add_member("p1", &format!("user-{worker}")).unwrap();
                })
            });
        }
    });

    let mut users = with_service(&path, |service| service.get_project("p1").unwrap().users);
    users.sort();
    let mut expected = (0..WORKERS)
        .map(|worker| format!("user-{worker}"))
        .collect::<Vec<_>>();
    expected.sort();
    assert_eq!(users, expected);
}

#[test]
fn concurrent_usage_updates_lose_no_deltas() {
    let dir = tempfile::tempdir().unwrap();
    let path = seeded_database(&dir);

    thread::scope(|scope| {
        for _ in 0..WORKERS {
            scope.spawn(|| {
                with_service(&path, |service| {
                    for _ in 0..CHECKOUTS_PER_WORKER {
                        service.update_hw_usage("p1", "HWSet1", 1).unwrap();
                    }
                    service.update_hw_usage("p1", "HWSet2", 1).unwrap();
                })
            });
        }
    });

    let project = with_service(&path, |service| service.get_project("p1").unwrap());
    assert_eq!(
        project.hw_sets.get("HWSet1"),
        Some(&(WORKERS as u64 * CHECKOUTS_PER_WORKER as u64))
    );
    assert_eq!(project.hw_sets.get("HWSet2"), Some(&(WORKERS as u64)));
}

#[test]
fn concurrent_checkins_never_drive_quantity_negative() {
    let dir = tempfile::tempdir().unwrap();
    let path = seeded_database(&dir);
    with_service(&path, |service| {
        service.update_hw_usage("p1", "HWSet1", 3).unwrap();
    });

    let outcomes = thread::scope(|scope| {
        let handles = (0..WORKERS)
            .map(|_| {
                scope.spawn(|| {
                    with_service(&path, |service| service.update_hw_usage("p1", "HWSet1", -1))
                })
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>()
    });

    let accepted = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(accepted, 3);
    assert!(outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().err())
        .all(|err| matches!(err, ProjectServiceError::InvalidQuantity(_))));

    let project = with_service(&path, |service| service.get_project("p1").unwrap());
    assert!(!project.hw_sets.contains_key("HWSet1"));
}
