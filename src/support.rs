//! Where fragments occur.
//!
//! A [`Projection`] lists, per compound, every embedding of a fragment: the
//! compound atom behind each DFS vertex plus the compound bonds used. Child
//! projections are derived from the parent's by trying every bond that
//! extends an embedding along the rightmost path, so matching never starts
//! from scratch.

use std::collections::{BTreeMap, HashSet};

use bit_set::BitSet;
use petgraph::{graph::NodeIndex, visit::EdgeRef};

use crate::{
    canonize::{DfsCode, DfsEdge, Label},
    enumerate::Level,
    molecule::Index,
    store::{edge_type, CompoundStore, EdgeType},
};

/// One occurrence of a fragment in a compound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embedding {
    /// Compound atom of every DFS vertex.
    pub nodes: Vec<NodeIndex<Index>>,
    /// Compound bonds covered.
    pub edges: BitSet,
}

/// Every embedding of a fragment, grouped by compound slot.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    occurrences: BTreeMap<usize, Vec<Embedding>>,
}

/// Frequency of a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Support {
    /// Number of compounds containing the fragment.
    pub count: usize,
    /// Sum of the multiplicities of those compounds.
    pub weighted_sum: u64,
    /// Store slots of those compounds.
    pub matching: BitSet,
}

impl Support {
    /// External ids of the matching compounds, in registration order.
    pub fn ids(&self, store: &CompoundStore) -> Vec<u64> {
        self.matching
            .iter()
            .filter_map(|slot| store.get(slot).map(|c| c.id()))
            .collect()
    }
}

/// What a single extension step may add.
#[derive(Debug, Clone, Copy)]
pub struct ExtensionRules<'a> {
    pub level: Level,
    /// Atoms with a smaller label belong to an earlier root.
    pub min_label: Label,
    /// Edge types allowed in fragments.
    pub edge_types: &'a HashSet<EdgeType>,
}

impl ExtensionRules<'_> {
    fn admits(&self, a: Label, bond: crate::molecule::Bond, b: Label) -> bool {
        self.edge_types.contains(&edge_type(a, bond, b))
    }
}

impl Projection {
    /// Projections of every single-bond fragment whose first atom has label
    /// `root`, keyed by their (minimal) one-edge code.
    pub fn seeds(
        store: &CompoundStore,
        root: Label,
        rules: &ExtensionRules,
    ) -> BTreeMap<DfsEdge, Projection> {
        let mut seeds: BTreeMap<DfsEdge, Projection> = BTreeMap::new();
        for (slot, compound) in store.iter().enumerate() {
            let graph = compound.molecule().graph();
            for u in graph.node_indices() {
                if compound.label(u) != root {
                    continue;
                }
                for e in graph.edges(u) {
                    let v = if e.source() == u { e.target() } else { e.source() };
                    let (lu, lv) = (compound.label(u), compound.label(v));
                    if lv < root || !rules.admits(lu, *e.weight(), lv) {
                        continue;
                    }
                    let edge = DfsEdge {
                        from: 0,
                        to: 1,
                        from_label: lu,
                        bond: *e.weight(),
                        to_label: lv,
                    };
                    let mut edges = BitSet::new();
                    edges.insert(e.id().index());
                    seeds
                        .entry(edge)
                        .or_default()
                        .occurrences
                        .entry(slot)
                        .or_default()
                        .push(Embedding {
                            nodes: vec![u, v],
                            edges,
                        });
                }
            }
        }
        seeds
    }

    /// Projections of every one-bond extension of the fragment `code`, keyed
    /// by the added DFS edge and ordered by the DFS edge order.
    pub fn extend(
        &self,
        store: &CompoundStore,
        code: &DfsCode,
        rules: &ExtensionRules,
    ) -> BTreeMap<DfsEdge, Projection> {
        let mut children: BTreeMap<DfsEdge, Projection> = BTreeMap::new();
        let rmpath = code.rightmost_path();
        let Some(&rightmost) = rmpath.first() else {
            return children;
        };
        let fresh = code.vertex_count();
        let degrees = code.degrees();

        for (&slot, embeddings) in &self.occurrences {
            let Some(compound) = store.get(slot) else {
                continue;
            };
            let graph = compound.molecule().graph();
            for emb in embeddings {
                let mut grow = |edge: DfsEdge, child: Embedding| {
                    children
                        .entry(edge)
                        .or_default()
                        .occurrences
                        .entry(slot)
                        .or_default()
                        .push(child);
                };

                // Ring closures from the rightmost vertex back onto the
                // rightmost path.
                if rules.level == Level::Graphs {
                    let g = emb.nodes[rightmost];
                    for e in graph.edges(g) {
                        if emb.edges.contains(e.id().index()) {
                            continue;
                        }
                        let w = if e.source() == g { e.target() } else { e.source() };
                        let Some(to) = emb.nodes.iter().position(|n| *n == w) else {
                            continue;
                        };
                        let (lg, lw) = (compound.label(g), compound.label(w));
                        if !rmpath[1..].contains(&to) || !rules.admits(lg, *e.weight(), lw) {
                            continue;
                        }
                        let mut child = emb.clone();
                        child.edges.insert(e.id().index());
                        grow(
                            DfsEdge {
                                from: rightmost,
                                to,
                                from_label: lg,
                                bond: *e.weight(),
                                to_label: lw,
                            },
                            child,
                        );
                    }
                }

                // New atoms hanging off the rightmost path.
                for &from in &rmpath {
                    if rules.level == Level::Paths && degrees[from] >= 2 {
                        continue;
                    }
                    let g = emb.nodes[from];
                    for e in graph.edges(g) {
                        let w = if e.source() == g { e.target() } else { e.source() };
                        if emb.nodes.contains(&w) {
                            continue;
                        }
                        let (lg, lw) = (compound.label(g), compound.label(w));
                        if lw < rules.min_label || !rules.admits(lg, *e.weight(), lw) {
                            continue;
                        }
                        let mut child = emb.clone();
                        child.nodes.push(w);
                        child.edges.insert(e.id().index());
                        grow(
                            DfsEdge {
                                from,
                                to: fresh,
                                from_label: lg,
                                bond: *e.weight(),
                                to_label: lw,
                            },
                            child,
                        );
                    }
                }
            }
        }
        children
    }

    /// Count the compounds this projection covers.
    pub fn support(&self, store: &CompoundStore) -> Support {
        let matching: BitSet = self.occurrences.keys().copied().collect();
        let weighted_sum = matching.iter().map(|slot| store.multiplicity(slot)).sum();
        Support {
            count: matching.len(),
            weighted_sum,
            matching,
        }
    }

    /// Number of embeddings over all compounds.
    pub fn embedding_count(&self) -> usize {
        self.occurrences.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }
}
