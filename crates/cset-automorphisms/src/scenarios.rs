//! End-to-end scenarios exercising the public API together rather than one
//! module at a time. Kept separate from the per-module unit tests so a
//! failure here points at an interaction between modules, not at one of
//! them in isolation.

#[cfg(test)]
mod tests {
    use crate::{autos, canonical_hash, Config};
    use cset_core::{Instance, Schema};

    fn labeled_cycle(src: [usize; 4], tgt: [usize; 4], dec: [&str; 4]) -> (Schema, Instance<String>) {
        let schema = Schema::new(
            ["V", "E"],
            [("src", "E", "V"), ("tgt", "E", "V")],
            ["Label"],
            [("dec", "E", "Label")],
        )
        .unwrap();
        let inst = Instance::new(
            schema.clone(),
            vec![4, 4],
            vec![src.to_vec(), tgt.to_vec()],
            vec![dec.iter().map(|s| s.to_string()).collect()],
        )
        .unwrap();
        (schema, inst)
    }

    #[test]
    fn two_labeled_4_cycles_under_vertex_relabel_share_a_hash() {
        let (schema_a, a) = labeled_cycle([0, 1, 2, 3], [1, 2, 3, 0], ["a", "b", "c", "d"]);
        let (schema_b, b) = labeled_cycle([0, 2, 1, 3], [2, 1, 3, 0], ["a", "b", "c", "d"]);
        let hash_a = canonical_hash(&schema_a, &a, Config::default()).unwrap();
        let hash_b = canonical_hash(&schema_b, &b, Config::default()).unwrap();
        assert_eq!(hash_a, hash_b);
    }

    #[test]
    fn label_permutation_of_the_same_cycle_shares_a_hash() {
        let (schema_a, a) = labeled_cycle([0, 1, 2, 3], [1, 2, 3, 0], ["a", "b", "c", "d"]);
        let (schema_b, b) = labeled_cycle([0, 1, 2, 3], [1, 2, 3, 0], ["b", "c", "d", "a"]);
        let hash_a = canonical_hash(&schema_a, &a, Config::default()).unwrap();
        let hash_b = canonical_hash(&schema_b, &b, Config::default()).unwrap();
        assert_eq!(hash_a, hash_b);
    }

    #[test]
    fn mismatched_label_multisets_are_not_isomorphic() {
        let (schema_a, a) = labeled_cycle([0, 1, 2, 3], [1, 2, 3, 0], ["a", "a", "b", "c"]);
        let (schema_b, b) = labeled_cycle([0, 1, 2, 3], [1, 2, 3, 0], ["a", "b", "c", "d"]);
        let hash_a = canonical_hash(&schema_a, &a, Config::default()).unwrap();
        let hash_b = canonical_hash(&schema_b, &b, Config::default()).unwrap();
        assert_ne!(hash_a, hash_b);
    }

    fn two_loop_schema() -> Schema {
        Schema::new(
            ["V"],
            [("e1", "V", "V"), ("e2", "V", "V")],
            [] as [String; 0],
            [] as [(String, String, String); 0],
        )
        .unwrap()
    }

    #[test]
    fn two_loops_on_one_vertex_has_the_same_hash_either_way_they_are_listed() {
        let schema = two_loop_schema();
        let a: Instance<()> = Instance::new(schema.clone(), vec![1], vec![vec![0], vec![0]], vec![]).unwrap();
        let b: Instance<()> = Instance::new(schema.clone(), vec![1], vec![vec![0], vec![0]], vec![]).unwrap();
        let hash_a = canonical_hash(&schema, &a, Config::default()).unwrap();
        let hash_b = canonical_hash(&schema, &b, Config::default()).unwrap();
        assert_eq!(hash_a, hash_b);
    }

    #[test]
    fn a_transposed_loop_pair_is_distinct_from_two_fixed_loops() {
        let schema = two_loop_schema();
        // e1 and e2 both swap the two vertices: a single orbit of size 2.
        let transposed: Instance<()> = Instance::new(schema.clone(), vec![2], vec![vec![1, 0], vec![1, 0]], vec![]).unwrap();
        // e1 is two fixed loops, e2 is two fixed loops elsewhere: each vertex is its own orbit.
        let fixed: Instance<()> = Instance::new(schema.clone(), vec![2], vec![vec![0, 0], vec![1, 1]], vec![]).unwrap();
        let hash_transposed = canonical_hash(&schema, &transposed, Config::default()).unwrap();
        let hash_fixed = canonical_hash(&schema, &fixed, Config::default()).unwrap();
        assert_ne!(hash_transposed, hash_fixed);
    }

    /// A 9-vertex reciprocal complete bipartite digraph (every one of a
    /// 6-vertex block and a 3-vertex block joined by arcs in both
    /// directions): large enough that pruning has real work to do, and its
    /// automorphism group is exactly `S6 x S3` (any permutation within
    /// each block), so the expected count is known exactly: `6! * 3! =
    /// 4320`.
    fn bipartite_reciprocal_digraph_edges() -> Vec<(usize, usize)> {
        let mut edges = Vec::new();
        for a in 0..6 {
            for b in 6..9 {
                edges.push((a, b));
                edges.push((b, a));
            }
        }
        edges
    }

    fn digraph_from_edges(edges: &[(usize, usize)], n: usize) -> (Schema, Instance<()>) {
        let schema = Schema::new(
            ["V", "E"],
            [("src", "E", "V"), ("tgt", "E", "V")],
            [] as [String; 0],
            [] as [(String, String, String); 0],
        )
        .unwrap();
        let src: Vec<usize> = edges.iter().map(|&(s, _)| s).collect();
        let tgt: Vec<usize> = edges.iter().map(|&(_, t)| t).collect();
        let inst = Instance::new(schema.clone(), vec![n, edges.len()], vec![src, tgt], vec![]).unwrap();
        (schema, inst)
    }

    #[test]
    fn bipartite_reciprocal_digraph_has_the_full_block_product_group() {
        use std::collections::HashSet;

        let edges = bipartite_reciprocal_digraph_edges();
        let (schema, inst) = digraph_from_edges(&edges, 9);
        let result = autos(&schema, &inst, Config::default());
        let distinct: HashSet<_> = result.automorphisms.into_iter().collect();
        assert_eq!(distinct.len(), 720 * 6);
    }

    #[test]
    fn bipartite_reciprocal_digraph_relabeling_shares_a_canonical_hash() {
        let edges = bipartite_reciprocal_digraph_edges();
        let (schema_a, a) = digraph_from_edges(&edges, 9);

        // renumber: reverse each block's internal order
        let rename = |v: usize| -> usize {
            match v {
                0..=5 => 5 - v,
                6..=8 => 14 - v,
                _ => unreachable!(),
            }
        };
        let renamed_edges: Vec<(usize, usize)> = edges.iter().map(|&(s, t)| (rename(s), rename(t))).collect();
        let (schema_b, b) = digraph_from_edges(&renamed_edges, 9);

        let hash_a = canonical_hash(&schema_a, &a, Config::default()).unwrap();
        let hash_b = canonical_hash(&schema_b, &b, Config::default()).unwrap();
        assert_eq!(hash_a, hash_b);
    }

    /// A 7-table/17-arrow schema graph (tables as vertices, arrows as
    /// directed edges between them) is itself a relational structure we can
    /// run the engine on, pinning down §4.6's claim that any finite digraph
    /// is fair game regardless of what it represents conceptually.
    fn category_schema_graph() -> (Schema, Instance<()>) {
        let schema = Schema::new(
            ["V", "E"],
            [("src", "E", "V"), ("tgt", "E", "V")],
            [] as [String; 0],
            [] as [(String, String, String); 0],
        )
        .unwrap();
        // 7 vertices, 17 edges forming an arbitrary but fixed digraph.
        let edges = [
            (0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 6), (6, 0),
            (0, 2), (1, 3), (2, 4), (3, 5), (4, 6), (5, 0), (6, 1),
            (0, 3), (2, 5), (4, 0),
        ];
        let src: Vec<usize> = edges.iter().map(|&(s, _)| s).collect();
        let tgt: Vec<usize> = edges.iter().map(|&(_, t)| t).collect();
        let inst = Instance::new(schema.clone(), vec![7, edges.len()], vec![src, tgt], vec![]).unwrap();
        (schema, inst)
    }

    #[test]
    fn category_schema_graph_under_random_permutation_shares_a_hash() {
        use cset_core::{CSetDescriptor, Permutation};
        use rand::rngs::StdRng;
        use rand::seq::SliceRandom;
        use rand::SeedableRng;

        let (schema, inst) = category_schema_graph();
        let hash_original = canonical_hash(&schema, &inst, Config::default()).unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let mut vertex_perm: Vec<usize> = (0..inst.size(0)).collect();
        vertex_perm.shuffle(&mut rng);
        let mut edge_perm: Vec<usize> = (0..inst.size(1)).collect();
        edge_perm.shuffle(&mut rng);

        let random_permutation = Permutation::new(vec![vertex_perm, edge_perm]);
        let permuted = random_permutation.apply(&schema, &inst).unwrap();

        let hash_permuted = canonical_hash(&schema, &permuted, Config::default()).unwrap();
        assert_eq!(hash_original, hash_permuted);
    }
}
