use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::blocking::LimitedPreemptive;
use crate::feasibility::{self, FeasibilityEngine, Load, Malformation, Verdict};
use crate::task::Task;
use crate::taskset::TaskSet;
use crate::tests::task;

fn set(tasks: Vec<Task>) -> TaskSet {
    tasks.into_iter().collect()
}

#[test]
fn single_task() {
    let ts = set(vec![task("a", 100, 100, 30)]);
    assert_eq!(feasibility::star_bound(&ts), Ok(100));
    assert_eq!(FeasibilityEngine::new().check(&ts), Verdict::Feasible);
    assert_eq!(feasibility::slack(&ts, 100), 70);
}

#[test]
fn overutilized_set_is_malformed() {
    let ts = set(vec![task("a", 50, 50, 20), task("b", 80, 80, 50)]);
    let verdict = FeasibilityEngine::new().check(&ts);
    assert!(matches!(
        verdict,
        Verdict::Malformed(Malformation::Overutilized { .. })
    ));
    assert_eq!(verdict.exit_code(), 255);
    assert!(feasibility::star_bound(&ts).is_err());
}

#[test]
fn exactly_full_utilization_is_malformed() {
    let ts = set(vec![task("a", 10, 10, 5), task("b", 20, 20, 10)]);
    assert!(matches!(
        FeasibilityEngine::new().check(&ts),
        Verdict::Malformed(Malformation::Overutilized { .. })
    ));
}

#[test]
fn ten_tenths_fill_the_processor() {
    // summing 0.1 ten times in floating point stays below one
    let ts: TaskSet = (1..=10)
        .map(|i| task(&format!("t:{i}"), 10, 10, 1))
        .collect();
    let verdict = FeasibilityEngine::new().check(&ts);
    assert!(matches!(
        verdict,
        Verdict::Malformed(Malformation::Overutilized { .. })
    ));
    assert_eq!(verdict.exit_code(), 255);
    assert!(feasibility::star_bound(&ts).is_err());
}

#[test]
fn star_bound_is_exact() {
    // U = 0.8, sum U_i (P_i - D_i) = 8, so the bound is exactly 8 / 0.2 = 40
    let ts = set(vec![task("a", 20, 20, 8), task("b", 50, 30, 20)]);
    assert_eq!(feasibility::star_bound(&ts), Ok(40));

    // U = 0.7, sum U_i (P_i - D_i) = 6.3, and 6.3 / 0.3 is exactly 21
    let ts: TaskSet = (1..=7).map(|i| task(&format!("t:{i}"), 10, 1, 1)).collect();
    let load = Load::of(&ts).unwrap();
    assert_eq!((load.scale, load.busy, load.laxity), (10, 7, 63));
    assert_eq!(load.star_term(), 21);
    assert_eq!(feasibility::star_bound(&ts), Ok(10));
}

#[test]
fn two_tasks_with_constrained_deadline() {
    let ts = set(vec![task("a", 20, 20, 8), task("b", 50, 30, 10)]);
    let t_star = feasibility::star_bound(&ts).unwrap();
    assert_eq!(t_star, 30);
    let mut engine = FeasibilityEngine::new();
    assert_eq!(engine.check(&ts), Verdict::Feasible);
    for entry in engine.deadlines().up_to(t_star) {
        let t = entry.deadline();
        assert!(feasibility::demand(&ts, t) <= t);
    }
    assert_eq!(feasibility::demand(&ts, 30), 18);
    assert_eq!(feasibility::slack(&ts, 30), 12);
}

#[test]
fn unconstrained_deadline_is_malformed() {
    for wcet in [1, 10, 50] {
        let ts = set(vec![task("u", 100, 120, wcet)]);
        assert_eq!(
            FeasibilityEngine::new().check(&ts),
            Verdict::Malformed(Malformation::UnconstrainedDeadline {
                name: "u".to_string(),
                deadline: 120,
                period: 100
            })
        );
    }
}

#[test]
fn other_malformations() {
    let check = |ts: TaskSet| FeasibilityEngine::new().check(&ts);
    assert_eq!(check(TaskSet::new()), Verdict::Malformed(Malformation::EmptyTaskSet));
    assert!(matches!(
        check(set(vec![task("p", 0, 10, 1)])),
        Verdict::Malformed(Malformation::ZeroPeriod { .. })
    ));
    assert!(matches!(
        check(set(vec![task("d", 10, 0, 1)])),
        Verdict::Malformed(Malformation::ZeroDeadline { .. })
    ));
    assert!(matches!(
        check(set(vec![Task::new(10, 10, 0)])),
        Verdict::Malformed(Malformation::NoThreads { .. })
    ));
    assert_eq!(
        check(set(vec![Task::with_wcets("w", 10, 10, vec![2, 0])])),
        Verdict::Malformed(Malformation::ZeroWcet {
            name: "w".to_string(),
            threads: 2
        })
    );
}

#[test]
fn infeasible_set() {
    // U = 0.5 + 0.4 = 0.9, but both deadlines are short
    let ts = set(vec![task("a", 10, 5, 5), task("b", 20, 6, 8)]);
    let verdict = FeasibilityEngine::new().check(&ts);
    assert_eq!(verdict, Verdict::Infeasible);
    assert_eq!(verdict.exit_code(), 1);
    assert!(feasibility::slack(&ts, 6) < 0);
}

#[test]
fn verdict_codes_and_text() {
    assert_eq!(Verdict::Feasible.exit_code(), 0);
    assert_eq!(Verdict::Feasible.to_string(), "Yes");
    assert_eq!(Verdict::Infeasible.to_string(), "No");
    assert_eq!(
        Verdict::from(Malformation::EmptyTaskSet).to_string(),
        "N/A (Poorly formed set)"
    );
}

#[test]
fn engine_reuses_and_rebuilds_deadlines() {
    let mut ts = set(vec![task("a", 20, 20, 8), task("b", 50, 30, 10)]);
    let mut engine = FeasibilityEngine::new();
    engine.check(&ts);
    assert_eq!(engine.deadlines().horizon(), 30);
    let before = engine.deadlines().clone();
    engine.check(&ts);
    assert_eq!(engine.deadlines(), &before);

    // raising the bound below the hyperperiod grows the list
    let h = ts.find("b").unwrap();
    ts.get_mut(h).unwrap().set_wcet(1, 20).unwrap();
    assert_eq!(feasibility::star_bound(&ts), Ok(40));
    assert_eq!(ts.hyperperiod(), 100);
    assert_eq!(engine.check(&ts), Verdict::Feasible);
    assert_eq!(engine.deadlines().horizon(), 40);
    assert!(engine.deadlines().find(40).is_some());
    assert!(engine.deadlines().len() > before.len());
    for entry in before.iter() {
        assert_eq!(engine.deadlines().find(entry.deadline()), Some(entry));
    }

    // a structural change forces a rebuild
    ts.insert(task("c", 100, 10, 1));
    engine.check(&ts);
    assert!(engine.deadlines().find(10).is_some());
}

#[test]
fn traced_check_lists_deadline_points() {
    let ts = set(vec![task("a", 20, 20, 8), task("b", 50, 30, 10)]);
    let mut out = Vec::new();
    let verdict = FeasibilityEngine::new()
        .check_traced(&ts, &LimitedPreemptive, &[8, 10], &mut out)
        .unwrap();
    assert_eq!(verdict, Verdict::Feasible);
    let text = String::from_utf8(out).unwrap();
    assert_eq!(
        text,
        "t = 20: demand = 8, blocking = 9, slack = 3\n\
         t = 30: demand = 18, blocking = 0, slack = 12\n"
    );
}

fn brute_force_violation(ts: &TaskSet, limit: u64) -> Option<u64> {
    (1..=limit).find(|t| feasibility::demand(ts, *t) > *t)
}

fn random_set(rng: &mut StdRng) -> TaskSet {
    let n = rng.gen_range(2..=4);
    (0..n)
        .map(|i| {
            let period = rng.gen_range(5..=40);
            let wcet = rng.gen_range(1..=(period / 3).max(1));
            let deadline = rng.gen_range(wcet..=period);
            task(&format!("t:{}", i + 1), period, deadline, wcet)
        })
        .collect()
}

#[test]
fn no_violation_beyond_t_star() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut checked = 0;
    while checked < 100 {
        let ts = random_set(&mut rng);
        let t_star = match feasibility::star_bound(&ts) {
            Ok(t) => t,
            Err(_) => continue,
        };
        checked += 1;
        let limit = (4 * t_star).min(20_000);
        match FeasibilityEngine::new().check(&ts) {
            Verdict::Feasible => assert_eq!(brute_force_violation(&ts, limit), None, "{ts}"),
            Verdict::Infeasible => {
                let first = brute_force_violation(&ts, t_star);
                assert!(first.is_some(), "{ts}");
            }
            Verdict::Malformed(m) => panic!("unexpected: {m}"),
        }
    }
}
