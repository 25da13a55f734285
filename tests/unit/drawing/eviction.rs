use super::*;

fn id(index: u32) -> ItemId {
    ItemId {
        index,
        generation: 0,
    }
}

fn rec(index: u32, score: f64, cost: usize) -> CacheRecord {
    CacheRecord {
        item: id(index),
        score,
        cost,
        persistent: false,
    }
}

#[test]
fn empty_candidates_or_zero_budget_pick_nothing() {
    assert!(pick_items_for_caching(Vec::new(), 1000).is_empty());
    assert!(pick_items_for_caching(vec![rec(1, 10.0, 4)], 0).is_empty());
}

#[test]
fn picks_best_prefix_not_best_knapsack() {
    // A cheaper low-score record would fit after the cutoff, but greedy stops.
    let picked = pick_items_for_caching(
        vec![rec(1, 100.0, 60), rec(2, 90.0, 50), rec(3, 10.0, 10)],
        100,
    );
    assert_eq!(picked, vec![id(1)]);
}

#[test]
fn budget_is_never_exceeded() {
    for budget in [0usize, 3, 4, 7, 8, 11, 12, 100] {
        let recs = vec![rec(1, 3.0, 4), rec(2, 2.0, 4), rec(3, 1.0, 4)];
        let picked = pick_items_for_caching(recs.clone(), budget);
        let total: usize = recs
            .iter()
            .filter(|r| picked.contains(&r.item))
            .map(|r| r.cost)
            .sum();
        assert!(total <= budget);
        assert_eq!(picked.len(), (budget / 4).min(3));
    }
}

#[test]
fn ties_break_by_handle_regardless_of_input_order() {
    let a = pick_items_for_caching(vec![rec(7, 5.0, 4), rec(3, 5.0, 4)], 4);
    let b = pick_items_for_caching(vec![rec(3, 5.0, 4), rec(7, 5.0, 4)], 4);
    assert_eq!(a, vec![id(3)]);
    assert_eq!(a, b);
}

#[test]
fn persistent_records_come_first() {
    let mut p = rec(9, 0.0, 4);
    p.persistent = true;
    let picked = pick_items_for_caching(vec![rec(1, 1e9, 4), p], 4);
    assert_eq!(picked, vec![id(9)]);
}

#[test]
fn cost_overflow_stops_selection() {
    let picked = pick_items_for_caching(vec![rec(1, 2.0, usize::MAX), rec(2, 1.0, 1)], usize::MAX);
    assert_eq!(picked, vec![id(1)]);
}
