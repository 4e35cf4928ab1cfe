//! The optional debugging event log (spec §6: `history: bool`). Collecting
//! it never changes what the search finds — it is a side channel the
//! caller can inspect after the fact, nothing inside the search reads it
//! back.

/// One entry in a search's event log, tagged with the path of the node it
/// concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    StartIter { path: Vec<(usize, usize)> },
    AddLeaf { path: Vec<(usize, usize)> },
    AutoPrune { path: Vec<(usize, usize)>, skipped_from_depth: usize },
    OrbitPrune { path: Vec<(usize, usize)>, element: usize },
    OrderPrune { path: Vec<(usize, usize)> },
    FlagSkip { path: Vec<(usize, usize)> },
    NewChild { path: Vec<(usize, usize)> },
    Return { path: Vec<(usize, usize)> },
}
