//! Canonical labeling and automorphism search for attributed C-sets: color
//! refinement, pseudo-structure lowering, the McKay-style DFS search tree
//! over ordered color partitions, canonicalization, and the deterministic
//! schema-ordering heuristic that both of the latter rely on.
//!
//! Built on the data types in `cset-core`; this crate holds the algorithms.

mod canon;
mod order;
mod pseudo;
mod refine;
#[cfg(test)]
mod scenarios;
mod search;

pub use canon::{canonical_hash, canonical_iso};
pub use order::{ArrowOrder, TableOrder, schema_order};
pub use pseudo::{ValueTables, lower, pseudo_inv};
pub use refine::color_refine;
pub use search::{Config, HistoryEvent, Node, NodeState, SearchResult, SearchTree, autos};

/// Re-exports the types most call sites need in one `use cset_automorphisms::prelude::*;`.
pub mod prelude {
    pub use crate::{Config, HistoryEvent, NodeState, SearchTree, autos, canonical_hash, canonical_iso, color_refine, lower, pseudo_inv, schema_order};
    pub use cset_core::prelude::*;
}
