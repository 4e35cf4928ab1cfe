use crate::coloring::Coloring;
use crate::error::CsetError;
use crate::instance::{AttrValue, CSetDescriptor, Instance};
use crate::schema::Schema;

/// A per-table bijection, keyed by the table's schema index rather than its
/// name (spec §9: "replace maps keyed by table name with a fixed-size array
/// indexed by the table's position in schema order").
///
/// `tables[t][i]` is where element `i` of table `t` is sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permutation {
    tables: Vec<Vec<usize>>,
}

impl Permutation {
    pub fn new(tables: Vec<Vec<usize>>) -> Self {
        Permutation { tables }
    }

    /// The identity permutation over tables of the given sizes.
    pub fn identity(sizes: &[usize]) -> Self {
        Permutation {
            tables: sizes.iter().map(|&n| (0..n).collect()).collect(),
        }
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn table(&self, t: usize) -> &[usize] {
        &self.tables[t]
    }

    /// `self[t][i]`, the image of `i` in table `t`.
    pub fn at(&self, t: usize, i: usize) -> usize {
        self.tables[t][i]
    }

    /// True iff every table component is a bijection of `0..len`.
    pub fn is_perm(&self) -> bool {
        self.tables.iter().all(|p| {
            let mut seen = vec![false; p.len()];
            for &x in p {
                if x >= p.len() || seen[x] {
                    return false;
                }
                seen[x] = true;
            }
            true
        })
    }

    /// `(P ∘ Q)[t][i] = Q[t][P[t][i]]`, matching spec §4.1's composition
    /// order (apply `P` first, then `Q`).
    pub fn compose(&self, other: &Permutation) -> Permutation {
        assert_eq!(
            self.table_count(),
            other.table_count(),
            "composed permutations must range over the same tables"
        );
        let tables = self
            .tables
            .iter()
            .zip(&other.tables)
            .map(|(p, q)| {
                assert_eq!(p.len(), q.len(), "composed table components must have equal length");
                p.iter().map(|&i| q[i]).collect()
            })
            .collect();
        Permutation { tables }
    }

    /// The per-table inverse permutation. Panics if any component is not a
    /// bijection; callers that cannot guarantee that should check
    /// `is_perm` first.
    pub fn invert(&self) -> Permutation {
        let tables = self
            .tables
            .iter()
            .map(|p| {
                let mut inv = vec![usize::MAX; p.len()];
                for (i, &x) in p.iter().enumerate() {
                    assert!(
                        x < p.len() && inv[x] == usize::MAX,
                        "component is not a bijection"
                    );
                    inv[x] = i;
                }
                inv
            })
            .collect();
        Permutation { tables }
    }

    /// Applies `self` to `instance`, producing the relabeled instance:
    /// `img'_a[P[s][i]] = P[t][img_a[i]]` for every arrow `a: s -> t`.
    ///
    /// Fails with `NotAnAutomorphism` if `self` is not a permutation;
    /// callers are responsible for only calling this with an actual
    /// automorphism if they want the result to equal the input.
    pub fn apply<V: AttrValue>(
        &self,
        schema: &Schema,
        instance: &Instance<V>,
    ) -> Result<Instance<V>, CsetError> {
        if !self.is_perm() {
            return Err(CsetError::NotAnAutomorphism(
                "permutation has a non-bijective table component".into(),
            ));
        }
        let sizes: Vec<usize> = schema.tables().map(|t| instance.size(t)).collect();
        let mut images = vec![Vec::new(); schema.arrow_count()];
        for a in schema.arrows() {
            let s = schema.src(a);
            let t = schema.tgt(a);
            let mut img = vec![0usize; sizes[s]];
            for (i, &target) in instance.image(a).iter().enumerate() {
                img[self.at(s, i)] = self.at(t, target);
            }
            images[a] = img;
        }
        let mut attr_values = vec![Vec::new(); schema.attr_arrow_count()];
        for alpha in schema.attr_arrows() {
            let s = schema.attr_src(alpha);
            let values = instance.attr_values(alpha);
            let mut relabeled = values.to_vec();
            for (i, value) in values.iter().enumerate() {
                relabeled[self.at(s, i)] = value.clone();
            }
            attr_values[alpha] = relabeled;
        }
        Instance::new(schema.clone(), sizes, images, attr_values)
    }

    /// Pushes a coloring forward along `self`: the element that used to
    /// carry color `c` at index `i` now carries it at index `self[t][i]`.
    /// Used by the search tree's auto-prune check (spec §4.4.2) to test
    /// whether a candidate automorphism fixes or maps one node's saturated
    /// coloring onto another's.
    pub fn act_on_coloring(&self, coloring: &Coloring) -> Coloring {
        let tables = (0..coloring.table_count())
            .map(|t| {
                let mut moved = vec![0u32; coloring.table(t).len()];
                for (i, &c) in coloring.table(t).iter().enumerate() {
                    moved[self.at(t, i)] = c;
                }
                moved
            })
            .collect();
        Coloring::new(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    fn four_cycle() -> (Schema, Instance<()>) {
        let schema = Schema::new(
            ["V", "E"],
            [("src", "E", "V"), ("tgt", "E", "V")],
            [] as [String; 0],
            [] as [(String, String, String); 0],
        )
        .unwrap();
        let inst = Instance::new(
            schema.clone(),
            vec![4, 4],
            vec![vec![0, 1, 2, 3], vec![1, 2, 3, 0]],
            vec![],
        )
        .unwrap();
        (schema, inst)
    }

    #[test]
    fn identity_is_an_automorphism() {
        let (schema, inst) = four_cycle();
        let id = Permutation::identity(&[4, 4]);
        let applied = id.apply(&schema, &inst).unwrap();
        assert_eq!(applied.image(0), inst.image(0));
        assert_eq!(applied.image(1), inst.image(1));
    }

    #[test]
    fn compose_then_invert_is_identity() {
        let p = Permutation::new(vec![vec![1, 2, 0], vec![0, 1]]);
        let q = Permutation::new(vec![vec![2, 0, 1], vec![1, 0]]);
        let r = p.compose(&q);
        let back = r.compose(&q.invert());
        assert_eq!(back, p);
    }

    #[test]
    fn rotation_is_an_automorphism_of_the_cycle() {
        let (schema, inst) = four_cycle();
        // rotate vertices and edges by one step
        let rot = Permutation::new(vec![vec![1, 2, 3, 0], vec![1, 2, 3, 0]]);
        let applied = rot.apply(&schema, &inst).unwrap();
        assert_eq!(applied.image(0), inst.image(0));
        assert_eq!(applied.image(1), inst.image(1));
    }

    #[test]
    fn non_bijective_component_is_rejected() {
        let (schema, inst) = four_cycle();
        let bad = Permutation::new(vec![vec![0, 0, 2, 3], vec![0, 1, 2, 3]]);
        let err = bad.apply(&schema, &inst).unwrap_err();
        assert!(matches!(err, CsetError::NotAnAutomorphism(_)));
    }
}
