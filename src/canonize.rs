//! Canonical codes for fragments.
//!
//! A fragment is identified by its minimum DFS code: among all sequences of
//! edges produced by depth-first walks over the fragment, the smallest one
//! under the gSpan edge order (Yan & Han, 2002). Isomorphic fragments share
//! their minimum code, and a code is only ever extended if it is already
//! minimal, so every fragment is visited once.
//!
//! Codes are generic over the bond payload `E`. Fragments use [`Bond`];
//! backbone (skeleton) codes use `()` so that fragments differing only in
//! bond orders collapse onto the same key.

use std::cmp::Ordering;

use bit_set::BitSet;

use crate::molecule::Bond;

/// An interned atom label (see [`crate::store`]).
pub type Label = u32;

/// One edge of a DFS code, connecting DFS vertex `from` to DFS vertex `to`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DfsEdge<E = Bond> {
    pub from: usize,
    pub to: usize,
    pub from_label: Label,
    pub bond: E,
    pub to_label: Label,
}

impl<E> DfsEdge<E> {
    /// `true` iff this edge discovers a new vertex.
    pub fn is_forward(&self) -> bool {
        self.from < self.to
    }
}

impl<E: Ord> Ord for DfsEdge<E> {
    /// Backward edges precede forward edges into a later vertex; among forward
    /// edges into the same vertex, deeper sources come first. Ties fall back
    /// to the labels.
    fn cmp(&self, other: &Self) -> Ordering {
        let topology = match (self.is_forward(), other.is_forward()) {
            (false, false) => self.from.cmp(&other.from).then(self.to.cmp(&other.to)),
            (true, true) => self.to.cmp(&other.to).then(other.from.cmp(&self.from)),
            (false, true) => {
                if self.from < other.to {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (true, false) => {
                if self.to <= other.from {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
        };
        topology.then_with(|| {
            (self.from_label, &self.bond, self.to_label).cmp(&(
                other.from_label,
                &other.bond,
                other.to_label,
            ))
        })
    }
}

impl<E: Ord> PartialOrd for DfsEdge<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A sequence of [`DfsEdge`]s describing a connected fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DfsCode<E = Bond>(Vec<DfsEdge<E>>);

impl<E> Default for DfsCode<E> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<E: Ord> Ord for DfsCode<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<E: Ord> PartialOrd for DfsCode<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E: Copy + Ord> DfsCode<E> {
    /// Construct a code from its edges; the edges are not checked.
    pub fn from_edges(edges: Vec<DfsEdge<E>>) -> Self {
        Self(edges)
    }

    pub fn edges(&self) -> &[DfsEdge<E>] {
        &self.0
    }

    /// Number of edges (bonds).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, edge: DfsEdge<E>) {
        self.0.push(edge);
    }

    /// Number of DFS vertices.
    pub fn vertex_count(&self) -> usize {
        self.0
            .iter()
            .map(|e| e.from.max(e.to) + 1)
            .max()
            .unwrap_or(0)
    }

    /// The label of every DFS vertex, in DFS order.
    pub fn labels(&self) -> Vec<Label> {
        let mut labels = vec![0; self.vertex_count()];
        for e in &self.0 {
            labels[e.from] = e.from_label;
            labels[e.to] = e.to_label;
        }
        labels
    }

    /// Degree of every DFS vertex within the fragment.
    pub fn degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.vertex_count()];
        for e in &self.0 {
            degrees[e.from] += 1;
            degrees[e.to] += 1;
        }
        degrees
    }

    /// The DFS vertices on the rightmost path, starting with the rightmost
    /// vertex and ending at the root.
    pub fn rightmost_path(&self) -> Vec<usize> {
        let Some(mut cur) = self.vertex_count().checked_sub(1) else {
            return Vec::new();
        };
        let mut path = vec![cur];
        for e in self.0.iter().rev() {
            if e.is_forward() && e.to == cur {
                cur = e.from;
                path.push(cur);
            }
        }
        path
    }

    /// `true` iff this code is the minimum DFS code of the fragment it
    /// describes.
    pub fn is_min(&self) -> bool {
        minimum(&CodeGraph::from_code(self, |b| b), Some(&self.0)).is_some()
    }
}

impl DfsCode<Bond> {
    /// The minimum code of this fragment with every bond label erased.
    pub fn skeleton(&self) -> DfsCode<()> {
        let graph = CodeGraph::from_code(self, |_| ());
        DfsCode(minimum(&graph, None).unwrap_or_default())
    }
}

/// Compute the minimum DFS code of the connected graph with vertex labels
/// `labels` and edges `(u, v, bond)`.
///
/// Two label-preserving isomorphic graphs always yield the same code and
/// non-isomorphic graphs never do.
pub fn canonicalize<E: Copy + Ord>(labels: &[Label], edges: &[(usize, usize, E)]) -> DfsCode<E> {
    let mut adj = vec![Vec::new(); labels.len()];
    for (id, &(u, v, bond)) in edges.iter().enumerate() {
        adj[u].push((v, id, bond));
        adj[v].push((u, id, bond));
    }
    let graph = CodeGraph {
        labels: labels.to_vec(),
        adj,
        edge_count: edges.len(),
    };
    DfsCode(minimum(&graph, None).unwrap_or_default())
}

/// Adjacency-list view of a small graph.
struct CodeGraph<E> {
    labels: Vec<Label>,
    adj: Vec<Vec<(usize, usize, E)>>,
    edge_count: usize,
}

impl<E: Copy> CodeGraph<E> {
    fn from_code<F: Copy + Ord>(code: &DfsCode<F>, bond: impl Fn(F) -> E) -> Self {
        let labels = code.labels();
        let mut adj = vec![Vec::new(); labels.len()];
        for (id, e) in code.0.iter().enumerate() {
            adj[e.from].push((e.to, id, bond(e.bond)));
            adj[e.to].push((e.from, id, bond(e.bond)));
        }
        Self {
            labels,
            adj,
            edge_count: code.0.len(),
        }
    }
}

/// A partial mapping of DFS vertices onto graph vertices.
#[derive(Clone)]
struct Walk {
    map: Vec<usize>,
    inv: Vec<Option<usize>>,
    used: BitSet,
}

/// Build the minimum DFS code greedily, one edge at a time, keeping every
/// walk that realises the current minimum prefix. With a `target`, give up
/// (returning `None`) as soon as the minimum drops below it.
fn minimum<E: Copy + Ord>(
    graph: &CodeGraph<E>,
    target: Option<&[DfsEdge<E>]>,
) -> Option<Vec<DfsEdge<E>>> {
    let mut code: Vec<DfsEdge<E>> = Vec::with_capacity(graph.edge_count);
    let n = graph.labels.len();

    let mut best: Option<DfsEdge<E>> = None;
    let mut walks: Vec<Walk> = Vec::new();
    for u in 0..n {
        for &(v, id, bond) in &graph.adj[u] {
            let edge = DfsEdge {
                from: 0,
                to: 1,
                from_label: graph.labels[u],
                bond,
                to_label: graph.labels[v],
            };
            let mut walk = Walk {
                map: vec![u, v],
                inv: vec![None; n],
                used: BitSet::with_capacity(graph.edge_count),
            };
            walk.inv[u] = Some(0);
            walk.inv[v] = Some(1);
            walk.used.insert(id);
            keep_if_best(&mut best, &mut walks, edge, walk);
        }
    }

    while let Some(edge) = best.take() {
        if let Some(target) = target {
            if target.get(code.len()).is_some_and(|t| edge < *t) {
                return None;
            }
        }
        code.push(edge);
        if code.len() == graph.edge_count {
            break;
        }

        let rmpath = DfsCode(code.clone()).rightmost_path();
        let rightmost = rmpath[0];
        let fresh = rightmost + 1;
        let mut next: Vec<Walk> = Vec::new();
        for walk in &walks {
            // Backward edges leave the rightmost vertex.
            let g = walk.map[rightmost];
            for &(w, id, bond) in &graph.adj[g] {
                if walk.used.contains(id) {
                    continue;
                }
                let Some(to) = walk.inv[w] else { continue };
                if !rmpath.contains(&to) {
                    continue;
                }
                let edge = DfsEdge {
                    from: rightmost,
                    to,
                    from_label: graph.labels[g],
                    bond,
                    to_label: graph.labels[w],
                };
                let mut grown = walk.clone();
                grown.used.insert(id);
                keep_if_best(&mut best, &mut next, edge, grown);
            }

            // Forward edges leave any vertex of the rightmost path.
            for &from in &rmpath {
                let g = walk.map[from];
                for &(w, id, bond) in &graph.adj[g] {
                    if walk.inv[w].is_some() {
                        continue;
                    }
                    let edge = DfsEdge {
                        from,
                        to: fresh,
                        from_label: graph.labels[g],
                        bond,
                        to_label: graph.labels[w],
                    };
                    let mut grown = walk.clone();
                    grown.map.push(w);
                    grown.inv[w] = Some(fresh);
                    grown.used.insert(id);
                    keep_if_best(&mut best, &mut next, edge, grown);
                }
            }
        }
        walks = next;
    }
    Some(code)
}

fn keep_if_best<E: Ord + Copy>(
    best: &mut Option<DfsEdge<E>>,
    walks: &mut Vec<Walk>,
    edge: DfsEdge<E>,
    walk: Walk,
) {
    match best.as_ref().map(|b| edge.cmp(b)) {
        None | Some(Ordering::Less) => {
            *best = Some(edge);
            walks.clear();
            walks.push(walk);
        }
        Some(Ordering::Equal) => walks.push(walk),
        Some(Ordering::Greater) => (),
    }
}
