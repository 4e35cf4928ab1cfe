//! The schema ordering heuristic (spec §4.6): a deterministic total order
//! on tables and on arrows, used by canonicalization's sort key and by the
//! search tree's splitting-cell tie-break.

use cset_core::Schema;
use itertools::Itertools;
use tracing::warn;

/// A deterministic ranking of table indices. `rank(t)` is `t`'s position
/// in the order (`0` is first).
#[derive(Debug, Clone)]
pub struct TableOrder {
    order: Vec<usize>,
    rank: Vec<usize>,
}

impl TableOrder {
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn rank(&self, t: usize) -> usize {
        self.rank[t]
    }
}

/// A deterministic ranking of arrow indices, analogous to [`TableOrder`].
#[derive(Debug, Clone)]
pub struct ArrowOrder {
    order: Vec<usize>,
    rank: Vec<usize>,
}

impl ArrowOrder {
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn rank(&self, a: usize) -> usize {
        self.rank[a]
    }
}

fn rank_from_order(order: &[usize]) -> Vec<usize> {
    let mut rank = vec![0usize; order.len()];
    for (position, &idx) in order.iter().enumerate() {
        rank[idx] = position;
    }
    rank
}

/// `sort ascending by key, then reverse`, tie-broken by declaration index
/// for determinism — the literal recipe spec §4.6 gives for deriving both
/// the table order and the arrow order from scores.
fn ascending_then_reversed<T: Ord + Clone>(indices: impl Iterator<Item = usize>, key: impl Fn(usize) -> T) -> Vec<usize> {
    indices.sorted_by_key(|&i| (key(i), i)).rev().collect()
}

/// Computes the table and arrow orders for `schema` via fixed-point
/// iteration over `(in_score, out_score)` pairs (spec §4.6).
pub fn schema_order(schema: &Schema) -> (TableOrder, ArrowOrder) {
    let n = schema.table_count();
    let mut score: Vec<(u64, u64)> = vec![(1, 1); n];
    let mut current_order = ascending_then_reversed(schema.tables(), |t| score[t]);

    // Scores are monotone non-decreasing sums over a finite graph, so the
    // induced order is guaranteed (spec §4.6) to stabilize; `n + 1`
    // iterations is the bound SPEC_FULL documents for that convergence.
    let max_iters = n + 1;
    let mut converged = false;
    for _ in 0..max_iters {
        let mut next_score = score.clone();
        for t in schema.tables() {
            let in_sum: u64 = schema.in_arrows(t).map(|a| score[schema.src(a)].0).sum();
            let out_sum: u64 = schema.out_arrows(t).map(|b| score[schema.tgt(b)].1).sum();
            next_score[t] = (score[t].0 + in_sum, score[t].1 + out_sum);
        }
        score = next_score;
        let next_order = ascending_then_reversed(schema.tables(), |t| score[t]);
        if next_order == current_order {
            converged = true;
            current_order = next_order;
            break;
        }
        current_order = next_order;
    }
    if !converged && n > 0 {
        warn!("schema ordering heuristic did not converge within {max_iters} iterations; using its last order");
    }

    let table_order = TableOrder {
        rank: rank_from_order(&current_order),
        order: current_order,
    };

    let arrow_order = {
        let order = ascending_then_reversed(schema.arrows(), |a| {
            let s = schema.src(a);
            let t = schema.tgt(a);
            (score[s].0 + score[t].0, score[s].1 + score[t].1)
        });
        ArrowOrder {
            rank: rank_from_order(&order),
            order,
        }
    };

    (table_order, arrow_order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolated_tables_keep_a_deterministic_order() {
        let schema = Schema::new(
            ["A", "B", "C"],
            [] as [(String, String, String); 0],
            [] as [String; 0],
            [] as [(String, String, String); 0],
        )
        .unwrap();
        let (order, _) = schema_order(&schema);
        assert_eq!(order.order().len(), 3);
        // with identical scores throughout, ties break by declaration index,
        // and the final reversal puts the highest index first
        assert_eq!(order.order(), &[2, 1, 0]);
    }

    #[test]
    fn a_table_with_many_in_neighbors_ranks_differently_from_a_sink() {
        // A, B, C all map into D: D accumulates a much larger in_score.
        let schema = Schema::new(
            ["A", "B", "C", "D"],
            [("a", "A", "D"), ("b", "B", "D"), ("c", "C", "D")],
            [] as [String; 0],
            [] as [(String, String, String); 0],
        )
        .unwrap();
        let (order, arrow_order) = schema_order(&schema);
        assert_eq!(order.order().len(), 4);
        assert_eq!(arrow_order.order().len(), 3);
    }
}
