//! The DFS search tree over ordered color partitions (spec §4.4): the
//! algorithmic core. Explores individualizations of a non-equitable
//! partition's splitting cell, refines at every node, and prunes with
//! three independent tactics (automorphism-based, orbit-based,
//! indicator/order-based).

mod history;

pub use history::HistoryEvent;

use std::collections::{HashSet, VecDeque};
use std::hash::{Hash, Hasher};

use cset_core::{AttrValue, Coloring, Permutation, Preimage, Schema};
use tracing::trace;

use crate::order::{TableOrder, schema_order};
use crate::refine::color_refine;

/// Per-invocation toggles on `autos` (spec §6).
#[derive(Debug, Clone, Copy)]
pub struct Config {
    auto_prune: bool,
    orbit_prune: bool,
    order_prune: bool,
    history: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            auto_prune: true,
            orbit_prune: true,
            order_prune: false,
            history: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auto_prune(mut self, enabled: bool) -> Self {
        self.auto_prune = enabled;
        self
    }

    pub fn with_orbit_prune(mut self, enabled: bool) -> Self {
        self.orbit_prune = enabled;
        self
    }

    pub fn with_order_prune(mut self, enabled: bool) -> Self {
        self.order_prune = enabled;
        self
    }

    pub fn with_history(mut self, enabled: bool) -> Self {
        self.history = enabled;
        self
    }
}

/// The state machine a node moves through (spec §4.4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Fresh,
    Refined,
    Leaf,
    Branching,
    Done,
}

/// One node of the search tree: the coloring it was entered with, the
/// equitable coloring refinement produced, and the path of
/// individualizations (`(table, element)` pairs) that led here from the
/// root.
#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<usize>,
    path: Vec<(usize, usize)>,
    init_coloring: Coloring,
    saturated: Option<Coloring>,
    indicator: Option<u64>,
    children: Vec<usize>,
    state: NodeState,
}

impl Node {
    pub fn path(&self) -> &[(usize, usize)] {
        &self.path
    }

    pub fn saturated(&self) -> Option<&Coloring> {
        self.saturated.as_ref()
    }

    pub fn indicator(&self) -> Option<u64> {
        self.indicator
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn children(&self) -> &[usize] {
        &self.children
    }
}

/// The tree explored by one `autos` invocation. Stored as an arena
/// (`Vec<Node>` with parent/child indices) rather than a recursive owned
/// structure, per spec §9's note that the natural recursion should be
/// convertible to an explicit representation for platforms with small
/// stacks or very large instances.
#[derive(Debug, Clone)]
pub struct SearchTree {
    nodes: Vec<Node>,
}

impl SearchTree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> usize {
        0
    }

    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }
}

fn hash_coloring(coloring: &Coloring) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    coloring.hash(&mut hasher);
    hasher.finish()
}

fn ancestor(tree: &SearchTree, mut id: usize, depth: usize) -> usize {
    while tree.node(id).path.len() > depth {
        id = tree.node(id).parent.expect("a node above the target depth always has a parent");
    }
    id
}

fn indicator_sequence(tree: &SearchTree, id: usize) -> Vec<u64> {
    let mut seq = Vec::new();
    let mut cur = Some(id);
    while let Some(n) = cur {
        let node = tree.node(n);
        seq.push(node.indicator.expect("node must be refined before its indicator is read"));
        cur = node.parent;
    }
    seq.reverse();
    seq
}

/// `common(a, b)`: length of the shared prefix (spec §9 open question,
/// resolved to preserve the reference's behavior when one path is a
/// prefix of the other: `common([1,2], [1,2,3]) == 2`).
fn common_prefix_len(a: &[(usize, usize)], b: &[(usize, usize)]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// `ind_π < indicator[..len]` compared over the overlapping range only
/// (spec §9 open question: the orientation that updates `indicator` on
/// strict improvement but prunes on strict domination).
fn prefix_dominates(best: &[u64], candidate: &[u64]) -> bool {
    let len = candidate.len().min(best.len());
    candidate[..len].cmp(&best[..len]) == std::cmp::Ordering::Less
}

fn permutation_from_discrete(coloring: &Coloring) -> Permutation {
    debug_assert!(coloring.is_discrete(), "auto-prune only ever compares discrete leaf colorings");
    let tables = (0..coloring.table_count())
        .map(|t| coloring.as_permutation_table(t))
        .collect();
    Permutation::new(tables)
}

/// Checks that `perm` fixes `instance` under the relabeling `Permutation`
/// defines — the output contract every returned automorphism must satisfy
/// (spec §6), checked directly against the descriptor rather than requiring
/// a concrete `Instance`.
fn is_automorphism<V: AttrValue, P: Preimage<V>>(perm: &Permutation, schema: &Schema, instance: &P) -> bool {
    if !perm.is_perm() {
        return false;
    }
    for a in schema.arrows() {
        let s = schema.src(a);
        let t = schema.tgt(a);
        let image = instance.image(a);
        for i in 0..instance.size(s) {
            if image[perm.at(s, i)] != perm.at(t, image[i]) {
                return false;
            }
        }
    }
    for alpha in schema.attr_arrows() {
        let s = schema.attr_src(alpha);
        let values = instance.attr_values(alpha);
        for i in 0..instance.size(s) {
            if values[perm.at(s, i)] != values[i] {
                return false;
            }
        }
    }
    true
}

/// Closes a generating set under composition via BFS over the Cayley graph
/// rooted at the identity, turning a handful of witnessed generators into
/// the actual automorphism group (spec I2: closed under composition).
fn close_group(identity: Permutation, seeds: &[Permutation]) -> Vec<Permutation> {
    let mut elements: HashSet<Permutation> = HashSet::new();
    let mut queue: VecDeque<Permutation> = VecDeque::new();
    elements.insert(identity.clone());
    queue.push_back(identity);
    while let Some(g) = queue.pop_front() {
        for s in seeds {
            let h = g.compose(s);
            if elements.insert(h.clone()) {
                queue.push_back(h);
            }
        }
    }
    elements.into_iter().collect()
}

/// Every leaf's discrete coloring, read as the permutation relabeling
/// `instance` onto that leaf's candidate labeling. These are *not*
/// automorphisms of `instance` in general — canonicalization (spec §4.5)
/// needs exactly this broader set of candidate relabelings to find the
/// lexicographic minimum across the whole isomorphism class, which is why
/// it reads from the tree directly rather than from `SearchResult::automorphisms`.
pub fn leaf_relabelings(tree: &SearchTree) -> Vec<Permutation> {
    tree.nodes
        .iter()
        .filter(|n| n.saturated.as_ref().is_some_and(Coloring::is_discrete))
        .map(|n| permutation_from_discrete(n.saturated.as_ref().unwrap()))
        .collect()
}

fn orbit_of(x: usize, generators: &[Vec<usize>]) -> HashSet<usize> {
    let mut orbit = HashSet::new();
    orbit.insert(x);
    let mut frontier = vec![x];
    while let Some(e) = frontier.pop() {
        for g in generators {
            let y = g[e];
            if orbit.insert(y) {
                frontier.push(y);
            }
        }
    }
    orbit
}

struct Ctx<'a, V: AttrValue, P: Preimage<V>> {
    schema: &'a Schema,
    instance: &'a P,
    config: Config,
    table_order: TableOrder,
    tree: SearchTree,
    leaves: Vec<usize>,
    skip: HashSet<Vec<(usize, usize)>>,
    indicator: Option<Vec<u64>>,
    history: Vec<HistoryEvent>,
    /// Automorphisms witnessed while pruning (spec I8): a skipped branch
    /// never becomes a leaf, so its generator has to be captured here
    /// instead of recovered from `leaves` after the fact.
    generators: Vec<Permutation>,
    _marker: std::marker::PhantomData<V>,
}

/// Finds the splitting cell: among color classes of size >= 2, the
/// smallest, ties broken by first table in schema order then lowest color
/// value (spec §4.4 step 4). Returns `(table, color, elements)`.
fn splitting_cell(schema: &Schema, coloring: &Coloring, table_order: &TableOrder) -> Option<(usize, u32, Vec<usize>)> {
    let mut best: Option<(usize, usize, u32, usize, Vec<usize>)> = None;
    for t in schema.tables() {
        for (color, elems) in coloring.classes(t).into_iter().enumerate() {
            if elems.len() < 2 {
                continue;
            }
            let key = (elems.len(), table_order.rank(t), color as u32);
            let better = match &best {
                None => true,
                Some((bsize, brank, bcolor, _, _)) => key < (*bsize, *brank, *bcolor),
            };
            if better {
                best = Some((elems.len(), table_order.rank(t), color as u32, t, elems));
            }
        }
    }
    best.map(|(_, _, color, t, elems)| (t, color, elems))
}

fn sibling_autos<V: AttrValue, P: Preimage<V>>(ctx: &Ctx<V, P>, node_id: usize) -> Vec<Permutation> {
    let node_path = ctx.tree.node(node_id).path.clone();
    let depth = node_path.len();
    let subtree_leaves: Vec<usize> = ctx
        .leaves
        .iter()
        .copied()
        .filter(|&l| {
            let path = &ctx.tree.node(l).path;
            path.len() >= depth && path[..depth] == node_path[..]
        })
        .collect();

    let mut generators = Vec::new();
    for (idx, &li) in subtree_leaves.iter().enumerate() {
        for &lj in &subtree_leaves[idx + 1..] {
            let ci = ctx.tree.node(li).saturated.as_ref().unwrap();
            let cj = ctx.tree.node(lj).saturated.as_ref().unwrap();
            let pi = permutation_from_discrete(ci);
            let pj = permutation_from_discrete(cj);
            let gamma = pi.compose(&pj.invert());
            generators.push(gamma);
        }
    }
    generators
}

fn visit<V: AttrValue, P: Preimage<V>>(ctx: &mut Ctx<V, P>, node_id: usize) {
    let init = ctx.tree.node(node_id).init_coloring.clone();
    let saturated = color_refine(ctx.schema, ctx.instance, Some(init));
    let indicator = hash_coloring(&saturated);
    {
        let node = &mut ctx.tree.nodes[node_id];
        node.saturated = Some(saturated.clone());
        node.indicator = Some(indicator);
        node.state = NodeState::Refined;
    }
    let path = ctx.tree.node(node_id).path.clone();
    if ctx.config.history {
        ctx.history.push(HistoryEvent::StartIter { path: path.clone() });
    }
    trace!(depth = path.len(), indicator, "visiting search tree node");

    let ind_pi = indicator_sequence(&ctx.tree, node_id);

    if ctx.config.order_prune {
        if let Some(best) = ctx.indicator.clone() {
            if prefix_dominates(&best, &ind_pi) {
                if ctx.config.history {
                    ctx.history.push(HistoryEvent::OrderPrune { path: path.clone() });
                }
                ctx.tree.nodes[node_id].state = NodeState::Done;
                return;
            }
        }
    }

    let cell = splitting_cell(ctx.schema, &saturated, &ctx.table_order);

    let Some((table, _color, elements)) = cell else {
        leaf(ctx, node_id, path, ind_pi);
        return;
    };

    ctx.tree.nodes[node_id].state = NodeState::Branching;

    if ctx.skip.contains(&path) {
        for _ in &elements {
            if ctx.config.history {
                ctx.history.push(HistoryEvent::FlagSkip { path: path.clone() });
            }
        }
        ctx.tree.nodes[node_id].state = NodeState::Done;
        if ctx.config.history {
            ctx.history.push(HistoryEvent::Return { path: path.clone() });
        }
        return;
    }

    let mut visited_elements: Vec<usize> = Vec::new();
    for &x in &elements {
        if ctx.config.orbit_prune && !visited_elements.is_empty() {
            let generators = sibling_autos(ctx, node_id);
            if !generators.is_empty() {
                let table_generators: Vec<Vec<usize>> = generators.iter().map(|g| g.table(table).to_vec()).collect();
                let orbit = orbit_of(x, &table_generators);
                if visited_elements.iter().any(|v| orbit.contains(v)) {
                    if ctx.config.history {
                        ctx.history.push(HistoryEvent::OrbitPrune { path: path.clone(), element: x });
                    }
                    for g in &generators {
                        if is_automorphism(g, ctx.schema, ctx.instance) {
                            ctx.generators.push(g.clone());
                        }
                    }
                    visited_elements.push(x);
                    continue;
                }
            }
        }

        let mut child_coloring = saturated.clone();
        child_coloring.individualize(table, x);
        let mut child_path = path.clone();
        child_path.push((table, x));
        let child_id = ctx.tree.nodes.len();
        ctx.tree.nodes.push(Node {
            parent: Some(node_id),
            path: child_path,
            init_coloring: child_coloring,
            saturated: None,
            indicator: None,
            children: Vec::new(),
            state: NodeState::Fresh,
        });
        ctx.tree.nodes[node_id].children.push(child_id);
        if ctx.config.history {
            ctx.history.push(HistoryEvent::NewChild { path: ctx.tree.node(child_id).path.clone() });
        }
        visit(ctx, child_id);
        visited_elements.push(x);
    }

    ctx.tree.nodes[node_id].state = NodeState::Done;
    if ctx.config.history {
        ctx.history.push(HistoryEvent::Return { path });
    }
}

fn leaf<V: AttrValue, P: Preimage<V>>(ctx: &mut Ctx<V, P>, node_id: usize, path: Vec<(usize, usize)>, ind_pi: Vec<u64>) {
    ctx.tree.nodes[node_id].state = NodeState::Leaf;
    ctx.leaves.push(node_id);
    if ctx.config.history {
        ctx.history.push(HistoryEvent::AddLeaf { path: path.clone() });
    }

    let should_update = match &ctx.indicator {
        None => true,
        Some(best) => ind_pi > *best,
    };
    if should_update {
        ctx.indicator = Some(ind_pi);
    }

    if ctx.config.auto_prune {
        auto_prune(ctx, node_id, &path);
    }

    ctx.tree.nodes[node_id].state = NodeState::Done;
    if ctx.config.history {
        ctx.history.push(HistoryEvent::Return { path });
    }
}

/// McKay's identity-node trick (spec §4.4.2): if an earlier leaf `p` and
/// this leaf `N` witness a genuine automorphism `γ` of the whole
/// structure that fixes the common ancestor and maps `p`'s branch onto
/// `N`'s, then `N`'s branch contributes nothing isomorphism-wise that
/// `p`'s branch didn't already explore, and every ancestor of `N` from
/// that branch point down can stop trying further children.
fn auto_prune<V: AttrValue, P: Preimage<V>>(ctx: &mut Ctx<V, P>, node_id: usize, n_path: &[(usize, usize)]) {
    let n_depth = n_path.len();
    let earlier_leaves: Vec<usize> = ctx.leaves[..ctx.leaves.len() - 1].to_vec();
    for p_id in earlier_leaves {
        let p_path = ctx.tree.node(p_id).path.clone();
        let i = common_prefix_len(&p_path, n_path);

        let sigma = permutation_from_discrete(ctx.tree.node(node_id).saturated.as_ref().unwrap());
        let tau = permutation_from_discrete(ctx.tree.node(p_id).saturated.as_ref().unwrap());
        let gamma = tau.compose(&sigma.invert());

        let a_id = ancestor(&ctx.tree, p_id, i);
        let b_id = ancestor(&ctx.tree, p_id, i + 1);
        let c_id = ancestor(&ctx.tree, node_id, i + 1);

        let a_col = ctx.tree.node(a_id).saturated.clone().unwrap();
        let b_col = ctx.tree.node(b_id).saturated.clone().unwrap();
        let c_col = ctx.tree.node(c_id).saturated.clone().unwrap();

        if gamma.act_on_coloring(&a_col) == a_col && gamma.act_on_coloring(&b_col) == c_col {
            if is_automorphism(&gamma, ctx.schema, ctx.instance) {
                ctx.generators.push(gamma.clone());
            }
            for j in (i + 1)..=n_depth {
                let prefix = n_path[..j].to_vec();
                ctx.skip.insert(prefix.clone());
                if ctx.config.history {
                    ctx.history.push(HistoryEvent::FlagSkip { path: prefix });
                }
            }
            if ctx.config.history {
                ctx.history.push(HistoryEvent::AutoPrune {
                    path: n_path.to_vec(),
                    skipped_from_depth: i + 1,
                });
            }
            break;
        }
    }
}

/// The result of one `autos` invocation: the automorphisms found, the
/// search tree that found them, and the (possibly empty) debug event log.
pub struct SearchResult {
    /// Every permutation here satisfies `apply(g, instance) == instance`
    /// (spec §6's output contract): the identity is always present, and the
    /// set is closed under composition.
    pub automorphisms: Vec<Permutation>,
    pub tree: SearchTree,
    pub history: Vec<HistoryEvent>,
}

/// Runs the search tree over `instance` and returns every automorphism
/// found (spec §4.4). `instance` must already be the pure pseudo-structure
/// — attributed inputs are lowered before this is called.
pub fn autos<V: AttrValue, P: Preimage<V>>(schema: &Schema, instance: &P, config: Config) -> SearchResult {
    let sizes: Vec<usize> = schema.tables().map(|t| instance.size(t)).collect();
    let (table_order, _arrow_order) = schema_order(schema);

    let root = Node {
        parent: None,
        path: Vec::new(),
        init_coloring: Coloring::uniform(&sizes),
        saturated: None,
        indicator: None,
        children: Vec::new(),
        state: NodeState::Fresh,
    };

    let mut ctx = Ctx {
        schema,
        instance,
        config,
        table_order,
        tree: SearchTree { nodes: vec![root] },
        leaves: Vec::new(),
        skip: HashSet::new(),
        indicator: None,
        history: Vec::new(),
        generators: Vec::new(),
        _marker: std::marker::PhantomData,
    };

    visit(&mut ctx, 0);

    // A leaf's own permutation relabels `instance` onto that leaf's discrete
    // labeling, not onto itself; two leaves witness a genuine automorphism
    // only when composing one with the other's inverse maps `instance` back
    // to `instance`. `ctx.generators` carries the witnesses harvested at
    // pruning time, since a pruned branch never gets a leaf to compare
    // against afterwards; pairing every surviving leaf against a fixed
    // reference fills in the rest.
    let mut seeds = ctx.generators.clone();
    if let Some(&reference) = ctx.leaves.first() {
        let reference_perm = permutation_from_discrete(ctx.tree.node(reference).saturated.as_ref().unwrap());
        for &l in &ctx.leaves {
            let perm = permutation_from_discrete(ctx.tree.node(l).saturated.as_ref().unwrap());
            let gamma = perm.compose(&reference_perm.invert());
            if is_automorphism(&gamma, schema, instance) {
                seeds.push(gamma);
            }
        }
    }

    let identity = Permutation::identity(&sizes);
    let automorphisms = close_group(identity, &seeds);

    SearchResult {
        automorphisms,
        tree: ctx.tree,
        history: ctx.history,
    }
}
