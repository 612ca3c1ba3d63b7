//! Order selection for a single delivery trip.
//!
//! A weight-bounded 0/1 knapsack over the live candidate pool: a greedy
//! pass seeds the incumbent, then a depth-first branch-and-bound search
//! with a fractional-knapsack upper bound proves optimality. The search is
//! CPU-bound and interruptible through a cooperatively polled cancellation
//! token.

use std::cmp::Ordering;

use tokio_util::sync::CancellationToken;

use crate::error::PlanCancelled;
use crate::models::{Candidate, DeliveryPlan};

/// Search-tree entries between cancellation polls unless configured
/// otherwise. A knob, not a correctness constant: it bounds how long a
/// fired deadline can go unnoticed.
pub const DEFAULT_CHECK_INTERVAL: u32 = 16_384;

/// Select the maximum-value subset of `candidates` whose total weight fits
/// within `capacity`.
///
/// Pure apart from polling `cancel` every `check_every` recursion entries
/// (`0` disables polling). Identical inputs yield identical plans: the sort
/// is stable, the integer comparator has no floating-point ties and the
/// recursion order is fixed.
pub fn plan(
    candidates: &[Candidate],
    robot_id: &str,
    capacity: i64,
    cancel: &CancellationToken,
    check_every: u32,
) -> Result<DeliveryPlan, PlanCancelled> {
    if capacity <= 0 || candidates.is_empty() {
        return Ok(DeliveryPlan::empty(robot_id));
    }

    let mut sorted = candidates.to_vec();
    sorted.sort_by(density_cmp);

    let mut search = Search {
        candidates: &sorted,
        capacity,
        cancel,
        check_every: u64::from(check_every),
        steps: 0,
        best_value: 0,
        best_set: Vec::new(),
        path: Vec::new(),
    };

    let (seed_value, seed_set) = greedy_seed(&sorted, capacity);
    if seed_value > 0 {
        search.best_value = seed_value;
        search.best_set = seed_set;
    }

    search.dfs(0, 0, 0)?;

    let total_weight = search.best_set.iter().map(|c| c.weight).sum();
    Ok(DeliveryPlan {
        robot_id: robot_id.to_string(),
        total_weight,
        total_value: search.best_value,
        orders: search.best_set,
    })
}

/// Descending value-per-unit-weight. Zero-weight orders are infinitely
/// dense and sort first, higher value among them. Positive weights compare
/// by integer cross-multiplication so there are no float ties; equal
/// densities compare equal and the stable sort preserves the input's
/// ascending order-id.
fn density_cmp(a: &Candidate, b: &Candidate) -> Ordering {
    match (a.weight == 0, b.weight == 0) {
        (true, true) => b.value.cmp(&a.value),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => (b.value * a.weight).cmp(&(a.value * b.weight)),
    }
}

/// One pass over the density-sorted list: every zero-weight order is taken,
/// a positive-weight order only when it fits the remaining capacity. The
/// result is a feasible incumbent for the search, not necessarily optimal.
fn greedy_seed(candidates: &[Candidate], capacity: i64) -> (i64, Vec<Candidate>) {
    let mut remaining = capacity;
    let mut value = 0;
    let mut selected = Vec::new();
    for &candidate in candidates {
        if candidate.weight <= 0 {
            value += candidate.value;
            selected.push(candidate);
        } else if candidate.weight <= remaining {
            remaining -= candidate.weight;
            value += candidate.value;
            selected.push(candidate);
        }
    }
    (value, selected)
}

struct Search<'a> {
    candidates: &'a [Candidate],
    capacity: i64,
    cancel: &'a CancellationToken,
    check_every: u64,
    steps: u64,
    best_value: i64,
    best_set: Vec<Candidate>,
    path: Vec<Candidate>,
}

impl Search<'_> {
    fn dfs(&mut self, i: usize, cur_weight: i64, cur_value: i64) -> Result<(), PlanCancelled> {
        if cur_weight > self.capacity {
            return Ok(());
        }

        self.steps += 1;
        if self.check_every > 0
            && self.steps % self.check_every == 0
            && self.cancel.is_cancelled()
        {
            return Err(PlanCancelled {
                after_steps: self.steps,
            });
        }

        if cur_value as f64 + self.fractional_bound(i, cur_weight) <= self.best_value as f64 {
            return Ok(());
        }

        if cur_value > self.best_value {
            self.best_value = cur_value;
            // The path is mutated on ascent; the incumbent needs its own copy.
            self.best_set = self.path.clone();
        }

        if i == self.candidates.len() {
            return Ok(());
        }

        let candidate = self.candidates[i];

        self.path.push(candidate);
        self.dfs(i + 1, cur_weight + candidate.weight, cur_value + candidate.value)?;
        self.path.pop();

        self.dfs(i + 1, cur_weight, cur_value)
    }

    /// Admissible upper bound on any completion from index `i`: whole items
    /// in density order while they fit, then the first item that does not
    /// fit contributes its value pro-rated to the remaining capacity.
    fn fractional_bound(&self, i: usize, cur_weight: i64) -> f64 {
        if cur_weight >= self.capacity {
            return 0.0;
        }
        let mut remaining = self.capacity - cur_weight;
        let mut bound = 0.0;
        for candidate in &self.candidates[i..] {
            if candidate.weight <= 0 {
                bound += candidate.value as f64;
            } else if candidate.weight <= remaining {
                remaining -= candidate.weight;
                bound += candidate.value as f64;
            } else {
                bound += candidate.value as f64 * remaining as f64 / candidate.weight as f64;
                break;
            }
        }
        bound
    }
}
