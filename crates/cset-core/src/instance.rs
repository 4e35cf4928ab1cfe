use std::fmt::Debug;

use tracing::{debug, trace};

use crate::error::CsetError;
use crate::schema::Schema;

/// Bound satisfied by values drawn from an attribute domain.
///
/// The attribute-domain machinery itself (string/int storage, parsing) is
/// out of scope for this engine; all it requires is that values within one
/// instance admit a total order, can be hashed, and can be cheaply cloned
/// when instances are duplicated during canonicalization.
pub trait AttrValue: Ord + std::hash::Hash + Clone + Debug {}
impl<T: Ord + std::hash::Hash + Clone + Debug> AttrValue for T {}

/// The input contract of the engine (spec §6 "External interfaces"):
/// everything the core needs to know about one relational structure,
/// without caring how it is stored or produced.
pub trait CSetDescriptor<V: AttrValue> {
    fn schema(&self) -> &Schema;
    fn size(&self, t: usize) -> usize;
    fn image(&self, a: usize) -> &[usize];
    fn attr_values(&self, alpha: usize) -> &[V];
}

/// Lazily-built inverse index for an arrow: `preimage(a, j)` is the set of
/// elements of `src(a)` mapping to `j` under `a`.
pub trait Preimage<V: AttrValue>: CSetDescriptor<V> {
    fn preimage(&self, a: usize, j: usize) -> &[usize];
}

/// The concrete, in-memory `CSetDescriptor` + `Preimage` implementation.
///
/// Table elements are numbered `0..size(t)` internally (the spec's
/// `1..n_t` shifted down by one; nothing outside this module sees the
/// off-by-one). Arrow images and attribute values are stored as plain
/// `Vec`s indexed by the schema's arrow/attribute-arrow indices.
#[derive(Debug, Clone)]
pub struct Instance<V: AttrValue> {
    schema: Schema,
    sizes: Vec<usize>,
    images: Vec<Vec<usize>>,
    attr_values: Vec<Vec<V>>,
    preimage_cache: Vec<std::cell::OnceCell<Vec<Vec<usize>>>>,
}

impl<V: AttrValue> Instance<V> {
    /// Builds an instance over `schema`, validating every arrow image and
    /// attribute-value sequence against the declared table sizes.
    pub fn new(
        schema: Schema,
        sizes: Vec<usize>,
        images: Vec<Vec<usize>>,
        attr_values: Vec<Vec<V>>,
    ) -> Result<Self, CsetError> {
        if sizes.len() != schema.table_count() {
            return Err(CsetError::InvalidInstance(format!(
                "expected {} table sizes, got {}",
                schema.table_count(),
                sizes.len()
            )));
        }
        if images.len() != schema.arrow_count() {
            return Err(CsetError::InvalidInstance(format!(
                "expected {} arrow images, got {}",
                schema.arrow_count(),
                images.len()
            )));
        }
        if attr_values.len() != schema.attr_arrow_count() {
            return Err(CsetError::InvalidInstance(format!(
                "expected {} attribute value sequences, got {}",
                schema.attr_arrow_count(),
                attr_values.len()
            )));
        }
        for a in schema.arrows() {
            let s = schema.src(a);
            let t = schema.tgt(a);
            let img = &images[a];
            if img.len() != sizes[s] {
                return Err(CsetError::InvalidInstance(format!(
                    "arrow {:?} image has length {}, expected {}",
                    schema.arrow_name(a),
                    img.len(),
                    sizes[s]
                )));
            }
            if let Some(&j) = img.iter().find(|&&j| j >= sizes[t]) {
                return Err(CsetError::InvalidInstance(format!(
                    "arrow {:?} maps into out-of-range element {}",
                    schema.arrow_name(a),
                    j
                )));
            }
        }
        for alpha in schema.attr_arrows() {
            let s = schema.attr_src(alpha);
            if attr_values[alpha].len() != sizes[s] {
                return Err(CsetError::InvalidInstance(format!(
                    "attribute arrow {:?} has {} values, expected {}",
                    schema.attr_arrow_name(alpha),
                    attr_values[alpha].len(),
                    sizes[s]
                )));
            }
        }
        let preimage_cache = (0..schema.arrow_count())
            .map(|_| std::cell::OnceCell::new())
            .collect();
        debug!(tables = sizes.len(), total_elements = sizes.iter().sum::<usize>(), "instance built");
        Ok(Instance {
            schema,
            sizes,
            images,
            attr_values,
            preimage_cache,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl<V: AttrValue> CSetDescriptor<V> for Instance<V> {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn size(&self, t: usize) -> usize {
        self.sizes[t]
    }

    fn image(&self, a: usize) -> &[usize] {
        &self.images[a]
    }

    fn attr_values(&self, alpha: usize) -> &[V] {
        &self.attr_values[alpha]
    }
}

impl<V: AttrValue> Preimage<V> for Instance<V> {
    fn preimage(&self, a: usize, j: usize) -> &[usize] {
        let buckets = self.preimage_cache[a].get_or_init(|| {
            trace!(arrow = a, "building preimage index");
            let t = self.schema.tgt(a);
            let mut buckets = vec![Vec::new(); self.sizes[t]];
            for (i, &target) in self.images[a].iter().enumerate() {
                buckets[target].push(i);
            }
            buckets
        });
        &buckets[j]
    }
}
