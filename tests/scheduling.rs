// Scheduler registration, ordering, and failure modes.
//
// Run:
//   cargo test --test scheduling -- --nocapture

use std::cell::RefCell;
use std::rc::Rc;

use archon_ecs::{
    system, EcsError, Phase, ScheduleError, Scheduler, Store,
};

fn recorder(
    log: &Rc<RefCell<Vec<&'static str>>>,
    name: &'static str,
) -> archon_ecs::SystemDescriptor {
    let log = Rc::clone(log);
    system(name, move |_ctx, _dt| {
        log.borrow_mut().push(name);
        Ok(())
    })
}

#[test]
fn phases_run_in_fixed_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut store = Store::new();
    let mut scheduler = Scheduler::new();

    scheduler.add_system(Phase::PostUpdate, recorder(&log, "post")).unwrap();
    scheduler.add_system(Phase::PreUpdate, recorder(&log, "pre")).unwrap();
    scheduler.add_system(Phase::Update, recorder(&log, "main")).unwrap();
    scheduler.add_system(Phase::Startup, recorder(&log, "startup")).unwrap();

    scheduler.run_startup(&mut store).unwrap();
    scheduler.run_update(&mut store, 0.0).unwrap();
    assert_eq!(*log.borrow(), vec!["startup", "pre", "main", "post"]);

    // Startup phases do not run again.
    log.borrow_mut().clear();
    scheduler.run_update(&mut store, 0.0).unwrap();
    assert_eq!(*log.borrow(), vec!["pre", "main", "post"]);
}

#[test]
fn insertion_order_breaks_ties() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut store = Store::new();
    let mut scheduler = Scheduler::new();

    scheduler.add_system(Phase::Update, recorder(&log, "first")).unwrap();
    scheduler.add_system(Phase::Update, recorder(&log, "second")).unwrap();
    scheduler.add_system(Phase::Update, recorder(&log, "third")).unwrap();

    scheduler.run_update(&mut store, 0.0).unwrap();
    assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
}

#[test]
fn before_and_after_constraints_reorder() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut store = Store::new();
    let mut scheduler = Scheduler::new();

    scheduler.add_system(Phase::Update, recorder(&log, "damage")).unwrap();
    scheduler
        .add_system(Phase::Update, recorder(&log, "input").before(&["damage"]))
        .unwrap();
    scheduler
        .add_system(Phase::Update, recorder(&log, "cleanup").after(&["damage"]))
        .unwrap();

    scheduler.run_update(&mut store, 0.0).unwrap();
    assert_eq!(*log.borrow(), vec!["input", "damage", "cleanup"]);
}

#[test]
fn constraints_may_reference_later_registrations() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut store = Store::new();
    let mut scheduler = Scheduler::new();

    // "late" is not registered yet when "early" declares its ordering;
    // validation happens at sort time.
    scheduler
        .add_system(Phase::Update, recorder(&log, "early").after(&["late"]))
        .unwrap();
    scheduler.add_system(Phase::Update, recorder(&log, "late")).unwrap();

    scheduler.run_update(&mut store, 0.0).unwrap();
    assert_eq!(*log.borrow(), vec!["late", "early"]);
}

#[test]
fn cyclic_constraints_fail_before_any_system_runs() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut store = Store::new();
    let mut scheduler = Scheduler::new();

    scheduler
        .add_system(Phase::Update, recorder(&log, "a").after(&["b"]))
        .unwrap();
    scheduler
        .add_system(Phase::Update, recorder(&log, "b").after(&["a"]))
        .unwrap();

    let result = scheduler.run_update(&mut store, 0.0);
    assert!(matches!(
        result,
        Err(EcsError::Schedule(ScheduleError::CyclicDependency { phase: "update" }))
    ));
    assert!(log.borrow().is_empty(), "no system body may run once a cycle is found");
}

#[test]
fn unknown_ordering_reference_fails_at_sort_time() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut store = Store::new();
    let mut scheduler = Scheduler::new();

    scheduler
        .add_system(Phase::Update, recorder(&log, "orphan").after(&["ghost"]))
        .unwrap();

    let result = scheduler.run_update(&mut store, 0.0);
    match result {
        Err(EcsError::Schedule(ScheduleError::SystemNotFound { name })) => {
            assert_eq!(name, "ghost");
        }
        other => panic!("expected SystemNotFound, got {other:?}"),
    }
}

#[test]
fn duplicate_names_are_rejected() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut scheduler = Scheduler::new();

    scheduler.add_system(Phase::Update, recorder(&log, "movement")).unwrap();
    let result = scheduler.add_system(Phase::PostUpdate, recorder(&log, "movement"));
    assert!(matches!(
        result,
        Err(EcsError::Schedule(ScheduleError::DuplicateSystem { .. }))
    ));
}

#[test]
fn removal_and_introspection() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut store = Store::new();
    let mut scheduler = Scheduler::new();

    scheduler.add_system(Phase::Update, recorder(&log, "keep")).unwrap();
    scheduler.add_system(Phase::Update, recorder(&log, "drop")).unwrap();
    assert_eq!(scheduler.get_all_systems(), vec!["keep", "drop"]);
    assert!(scheduler.has_system("drop"));
    assert_eq!(scheduler.len(), 2);

    scheduler.remove_system("drop").unwrap();
    assert!(!scheduler.has_system("drop"));
    assert!(matches!(
        scheduler.remove_system("drop"),
        Err(EcsError::Schedule(ScheduleError::SystemNotFound { .. }))
    ));

    scheduler.run_update(&mut store, 0.0).unwrap();
    assert_eq!(*log.borrow(), vec!["keep"]);

    scheduler.clear();
    assert!(scheduler.is_empty());
}

#[test]
fn removing_a_system_reopens_its_name() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut scheduler = Scheduler::new();

    scheduler.add_system(Phase::Update, recorder(&log, "movement")).unwrap();
    scheduler.remove_system("movement").unwrap();
    scheduler.add_system(Phase::Update, recorder(&log, "movement")).unwrap();
    assert!(scheduler.has_system("movement"));
}
