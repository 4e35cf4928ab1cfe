use thiserror::Error;

/// Errors produced by the core of the automorphism engine.
///
/// All variants are fatal: the core never retries or recovers internally,
/// it only ever propagates. Callers catch at the `autos`/`canonical_hash`
/// boundary, per the error handling policy of the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CsetError {
    /// A schema had duplicate names, or an arrow referenced a table that
    /// does not exist. Reported once, at `Schema::new`.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// An instance had an arrow image or attribute value out of range for
    /// its schema. Reported once, at `Instance::new`.
    #[error("invalid instance: {0}")]
    InvalidInstance(String),

    /// A purported permutation failed `is_perm` while being applied to an
    /// instance.
    #[error("not an automorphism: {0}")]
    NotAnAutomorphism(String),

    /// `canonical_iso` found no automorphisms to choose from. Unreachable
    /// in practice since the identity permutation is always a leaf of the
    /// search tree.
    #[error("no automorphisms found, expected at least the identity")]
    EmptyIsosList,
}
