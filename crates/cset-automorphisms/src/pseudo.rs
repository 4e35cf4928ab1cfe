//! Pseudo-structure lowering (spec §4.3): converts an attributed instance
//! into a pure one by turning each attribute domain into a synthetic table
//! of its distinct sorted values, so the search tree only ever has to deal
//! with ordinary arrows between tables.
//!
//! Ordinary arrows keep their original schema index in the pseudo schema;
//! attribute arrow `alpha` becomes the ordinary arrow at index
//! `orig.arrow_count() + alpha`. That stable offset is what lets
//! `pseudo_inv` read results back out without re-deriving a name mapping.

use cset_core::{AttrValue, CSetDescriptor, Instance, Schema};

/// Per-domain sorted distinct values, recorded at lowering time so
/// `pseudo_inv` can translate a synthetic table's element index back into
/// the attribute value it stands for.
#[derive(Debug, Clone)]
pub struct ValueTables<V> {
    values: Vec<Vec<V>>,
}

impl<V: AttrValue> ValueTables<V> {
    pub fn empty(domain_count: usize) -> Self {
        ValueTables {
            values: vec![Vec::new(); domain_count],
        }
    }

    pub fn values(&self, domain: usize) -> &[V] {
        &self.values[domain]
    }

    fn rank_of(&self, domain: usize, value: &V) -> usize {
        self.values[domain]
            .binary_search(value)
            .expect("value was collected from the instance that built this ValueTables")
    }
}

/// Lowers an attributed `(schema, instance)` pair to a pure pseudo-schema
/// and pseudo-instance. Takes the no-attributes fast path from the
/// original Julia implementation: an instance with no attribute arrows is
/// returned unchanged rather than having zero synthetic tables appended.
pub fn lower<V: AttrValue>(schema: &Schema, instance: &Instance<V>) -> (Schema, Instance<()>, ValueTables<V>) {
    if schema.attr_arrow_count() == 0 {
        let sizes: Vec<usize> = schema.tables().map(|t| instance.size(t)).collect();
        let images: Vec<Vec<usize>> = schema.arrows().map(|a| instance.image(a).to_vec()).collect();
        let pure = Instance::new(schema.clone(), sizes, images, vec![]).expect("copy of a valid instance stays valid");
        return (schema.clone(), pure, ValueTables::empty(schema.domain_count()));
    }

    let mut value_tables = ValueTables {
        values: (0..schema.domain_count()).map(|_| Vec::new()).collect(),
    };
    for alpha in schema.attr_arrows() {
        let d = schema.attr_domain(alpha);
        value_tables.values[d].extend(instance.attr_values(alpha).iter().cloned());
    }
    for values in &mut value_tables.values {
        values.sort();
        values.dedup();
    }

    let table_names: Vec<String> = schema
        .tables()
        .map(|t| schema.table_name(t).to_string())
        .chain(schema.domains().map(|d| schema.domain_name(d).to_string()))
        .collect();

    let arrow_decls: Vec<(String, String, String)> = schema
        .arrows()
        .map(|a| {
            (
                schema.arrow_name(a).to_string(),
                schema.table_name(schema.src(a)).to_string(),
                schema.table_name(schema.tgt(a)).to_string(),
            )
        })
        .chain(schema.attr_arrows().map(|alpha| {
            (
                schema.attr_arrow_name(alpha).to_string(),
                schema.table_name(schema.attr_src(alpha)).to_string(),
                schema.domain_name(schema.attr_domain(alpha)).to_string(),
            )
        }))
        .collect();

    let pseudo_schema = Schema::new(table_names, arrow_decls, [] as [String; 0], [] as [(String, String, String); 0])
        .expect("names inherited from a valid schema stay unique and well-formed");

    let mut sizes: Vec<usize> = schema.tables().map(|t| instance.size(t)).collect();
    sizes.extend(value_tables.values.iter().map(|v| v.len()));

    let mut images: Vec<Vec<usize>> = schema.arrows().map(|a| instance.image(a).to_vec()).collect();
    for alpha in schema.attr_arrows() {
        let d = schema.attr_domain(alpha);
        let ranks = instance
            .attr_values(alpha)
            .iter()
            .map(|v| value_tables.rank_of(d, v))
            .collect();
        images.push(ranks);
    }

    let pseudo_instance = Instance::new(pseudo_schema.clone(), sizes, images, vec![])
        .expect("lowering only ever produces in-range images by construction");

    (pseudo_schema, pseudo_instance, value_tables)
}

/// Reverses [`lower`]'s attribute-arrow step: deep-copies `orig_instance`
/// and overlays it with the arrow data of `p` (a relabeling of the
/// pseudo-structure), translating synthetic-table ranks back into
/// attribute values via `value_tables`.
pub fn pseudo_inv<V: AttrValue>(
    p: &Instance<()>,
    orig_schema: &Schema,
    orig_instance: &Instance<V>,
    value_tables: &ValueTables<V>,
) -> Instance<V> {
    let sizes: Vec<usize> = orig_schema.tables().map(|t| orig_instance.size(t)).collect();
    let images: Vec<Vec<usize>> = orig_schema.arrows().map(|a| p.image(a).to_vec()).collect();
    let attr_values: Vec<Vec<V>> = orig_schema
        .attr_arrows()
        .map(|alpha| {
            let d = orig_schema.attr_domain(alpha);
            let pseudo_arrow = orig_schema.arrow_count() + alpha;
            p.image(pseudo_arrow)
                .iter()
                .map(|&rank| value_tables.values(d)[rank].clone())
                .collect()
        })
        .collect();
    Instance::new(orig_schema.clone(), sizes, images, attr_values)
        .expect("pseudo_inv only ever reassembles data already validated by lower")
}
