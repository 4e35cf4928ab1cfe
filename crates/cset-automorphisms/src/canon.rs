//! Canonicalization and hashing (spec §4.5): apply every discovered
//! automorphism to the input, sort the results by a deterministic
//! lexicographic key, and return the minimum — plus a stable hash of
//! that representative for fast isomorphism testing by equality.

use std::hash::{Hash, Hasher};

use cset_core::{AttrValue, CSetDescriptor, CsetError, Instance, Schema};
use tracing::instrument;

use crate::order::schema_order;
use crate::pseudo::{lower, pseudo_inv};
use crate::search::{Config, autos, leaf_relabelings};

/// The lexicographic sort key `κ` (spec §4.5 step 2): attribute values in
/// schema order, then ordinary arrow images in schema order. Empty on the
/// attribute side for pure inputs, so the same key works for both.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey<V: AttrValue> {
    attrs: Vec<Vec<V>>,
    images: Vec<Vec<usize>>,
}

#[derive(Debug, Hash)]
struct Serialized<V: AttrValue> {
    sizes: Vec<usize>,
    images: Vec<Vec<usize>>,
    attrs: Vec<Vec<V>>,
}

/// Orders attribute arrows and ordinary arrows by their rank in the
/// pseudo-schema's arrow order (attribute arrows occupy the stable
/// `orig.arrow_count() + alpha` slot there, per [`crate::pseudo`]), so
/// both groups are ranked by the same §4.6 heuristic applied once.
fn key_orders(orig_schema: &Schema, pseudo_schema: &Schema) -> (Vec<usize>, Vec<usize>) {
    let (_table_order, pseudo_arrow_order) = schema_order(pseudo_schema);

    let mut attr_order: Vec<usize> = orig_schema.attr_arrows().collect();
    attr_order.sort_by_key(|&alpha| pseudo_arrow_order.rank(orig_schema.arrow_count() + alpha));

    let mut arrow_order: Vec<usize> = orig_schema.arrows().collect();
    arrow_order.sort_by_key(|&a| pseudo_arrow_order.rank(a));

    (attr_order, arrow_order)
}

fn sort_key<V: AttrValue>(instance: &Instance<V>, attr_order: &[usize], arrow_order: &[usize]) -> SortKey<V> {
    SortKey {
        attrs: attr_order.iter().map(|&alpha| instance.attr_values(alpha).to_vec()).collect(),
        images: arrow_order.iter().map(|&a| instance.image(a).to_vec()).collect(),
    }
}

/// Returns a canonical representative of `instance`'s isomorphism class:
/// field-for-field equal for any two isomorphic inputs (spec §4.5, §6
/// output contract). Fails with [`CsetError::EmptyIsosList`] if the search
/// tree produces no leaves at all, which never happens for a valid instance
/// and signals a bug rather than a legitimate empty result — spec §9's open
/// question on this resolved against a silent passthrough of the input.
///
/// Candidate relabelings come from the search tree's leaves, not from
/// `result.automorphisms`: a leaf's permutation carries `instance` onto
/// that leaf's discrete labeling, and the lexicographic minimum across all
/// of them is the canonical form. `result.automorphisms` are the
/// permutations that fix `instance`, which is a different, narrower thing
/// (spec §6's automorphism output contract) and applying them here would
/// just hand back `instance` itself instead of the class minimum.
#[instrument(skip(schema, instance), fields(tables = schema.table_count(), arrows = schema.arrow_count()))]
pub fn canonical_iso<V: AttrValue>(schema: &Schema, instance: &Instance<V>, config: Config) -> Result<Instance<V>, CsetError> {
    let (pseudo_schema, pseudo_instance, value_tables) = lower(schema, instance);
    let result = autos(&pseudo_schema, &pseudo_instance, config);
    let relabelings = leaf_relabelings(&result.tree);
    if relabelings.is_empty() {
        return Err(CsetError::EmptyIsosList);
    }

    let (attr_order, arrow_order) = key_orders(schema, &pseudo_schema);

    let mut best: Option<(SortKey<V>, Instance<V>)> = None;
    for rho in &relabelings {
        let applied_pseudo = rho.apply(&pseudo_schema, &pseudo_instance)?;
        let lifted = pseudo_inv(&applied_pseudo, schema, instance, &value_tables);
        let key = sort_key(&lifted, &attr_order, &arrow_order);
        let better = match &best {
            None => true,
            Some((bkey, _)) => key < *bkey,
        };
        if better {
            best = Some((key, lifted));
        }
    }

    Ok(best.expect("relabelings is non-empty, so a minimum exists").1)
}

/// `H(serialize(canonical_iso(g)))` (spec §4.5 step 4): equal whenever
/// `canonical_iso` of two instances are equal, giving constant-time
/// isomorphism testing by hash comparison.
pub fn canonical_hash<V: AttrValue>(schema: &Schema, instance: &Instance<V>, config: Config) -> Result<u64, CsetError> {
    let canon = canonical_iso(schema, instance, config)?;
    let (pseudo_schema, _, _) = lower(schema, &canon);
    let (attr_order, arrow_order) = key_orders(schema, &pseudo_schema);
    let sizes: Vec<usize> = schema.tables().map(|t| canon.size(t)).collect();
    let serialized = Serialized {
        sizes,
        images: arrow_order.iter().map(|&a| canon.image(a).to_vec()).collect(),
        attrs: attr_order.iter().map(|&alpha| canon.attr_values(alpha).to_vec()).collect(),
    };
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    serialized.hash(&mut hasher);
    Ok(hasher.finish())
}
