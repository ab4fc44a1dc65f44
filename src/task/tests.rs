use crate::task::{Task, TaskError};

#[test]
fn new_task_is_zeroed() {
    let t = Task::default();
    assert_eq!(t.period, 0);
    assert_eq!(t.deadline, 0);
    assert_eq!(t.threads(), 0);
    assert_eq!(t.chunk, 0);
    assert_eq!(t.max_wcet(), None);
    assert_eq!(t.wcet(1), None);
}

#[test]
fn wcet_table_is_one_based() {
    let mut t = Task::new(10, 20, 3);
    t.set_wcet(1, 3).unwrap();
    t.set_wcet(2, 5).unwrap();
    t.set_wcet(3, 8).unwrap();
    assert_eq!(t.wcet(0), None);
    assert_eq!(t.wcet(1), Some(3));
    assert_eq!(t.wcet(2), Some(5));
    assert_eq!(t.wcet(3), Some(8));
    assert_eq!(t.wcet(4), None);
    assert_eq!(t.max_wcet(), Some(8));
    assert_eq!(
        t.set_wcet(4, 1),
        Err(TaskError::ThreadCountOutOfRange {
            requested: 4,
            threads: 3
        })
    );
    assert!(t.set_wcet(0, 1).is_err());
}

#[test]
fn resizing_discards_wcets() {
    let mut t = Task::with_wcets("a", 10, 10, vec![2, 3]);
    assert_eq!(t.set_threads(4), 4);
    assert_eq!(t.wcets(), &[0, 0, 0, 0]);
    t.set_threads(0);
    assert_eq!(t.max_wcet(), None);
}

#[test]
fn duplicate_copies_prefix() {
    let mut t = Task::with_wcets("dup", 40, 30, vec![10, 12, 15]);
    t.chunk = 7;
    let d = t.duplicate(2).unwrap();
    assert_eq!(d.name(), "dup");
    assert_eq!(d.period, 40);
    assert_eq!(d.deadline, 30);
    assert_eq!(d.wcets(), &[10, 12]);
    assert_eq!(d.chunk, 0);
    assert_eq!(
        t.duplicate(4),
        Err(TaskError::DuplicateTooWide {
            requested: 4,
            threads: 3
        })
    );
}

#[test]
fn merge_keeps_max_wcet() {
    let mut t = Task::with_wcets("m", 40, 30, vec![10, 12, 15]);
    t.merge().unwrap();
    assert_eq!(t.wcets(), &[15]);
    assert_eq!(Task::default().merge(), Err(TaskError::NoThreads));
}

#[test]
fn growth_factor_table() {
    let mut t = Task::with_wcets("g", 100, 100, vec![0, 0, 0, 30]);
    t.apply_growth_factor(0.5).unwrap();
    // one = 30 / 2.5 = 12
    assert_eq!(t.wcets(), &[12, 18, 24, 30]);
    assert!(t.wcets().windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn constrained_deadlines() {
    assert!(Task::new(100, 100, 1).is_constrained());
    assert!(Task::new(100, 50, 1).is_constrained());
    assert!(!Task::new(100, 120, 1).is_constrained());
}

#[test]
fn display_format() {
    let mut t = Task::with_wcets("t:1", 100, 90, vec![25, 30]);
    t.chunk = 12;
    assert_eq!(
        t.to_string(),
        "(p: 100, d:  90, m: 2) [u:0.300, q:12, t:1]\twcet{ 25,  30} "
    );
    assert!(Task::header().starts_with("(period, dedlin, tpj.)"));
}
