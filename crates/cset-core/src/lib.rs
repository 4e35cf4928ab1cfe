//! Core data types for attributed C-sets: schemas, instances, colorings,
//! and permutations. This crate owns the input contract that the
//! automorphism engine in `cset-automorphisms` consumes; it has no
//! dependency on the engine itself.

mod coloring;
mod error;
mod instance;
mod perm;
mod schema;

pub use coloring::Coloring;
pub use error::CsetError;
pub use instance::{AttrValue, CSetDescriptor, Instance, Preimage};
pub use perm::Permutation;
pub use schema::Schema;

/// Re-exports the types most call sites need in one `use cset_core::prelude::*;`.
pub mod prelude {
    pub use crate::{AttrValue, CSetDescriptor, Coloring, CsetError, Instance, Permutation, Preimage, Schema};
}
