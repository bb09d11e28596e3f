//! Enumerate significant fragments, one root at a time.
//!
//! Each root is an atom type. Mining a root walks the tree of minimum DFS
//! codes whose smallest atom label is that root, depth first and with an
//! explicit stack, so roots share nothing but read-only inputs and can be
//! mined in any order or in parallel. Children of a fragment are visited in
//! DFS edge order, which makes the output reproducible.
//!
//! A fragment is refined further only while it occurs in more than one
//! compound (unless singles are refined), stays below the hop limit and
//! still has a chance of producing a significant refinement according to
//! the active [`Bound`]s. With backbone refinement classes (BBRC) enabled,
//! all significant fragments sharing a skeleton are collapsed onto their
//! best-scoring member.

use std::collections::{HashMap, HashSet};

use bit_set::BitSet;
use clap::ValueEnum;
use tracing::{debug, info};

use crate::{
    bounds::{upper_bound, Bound},
    canonize::{DfsCode, DfsEdge, Label},
    error::MiningError,
    loader::write_pattern,
    molecule::{Atom, MGraph},
    session::Settings,
    significance::{Direction, Labels, Significance},
    store::{CompoundStore, EdgeType},
    support::{ExtensionRules, Projection, Support},
};

/// Shape of the fragments to mine.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Level {
    /// Unbranched chains only.
    Paths,
    /// Acyclic fragments.
    #[default]
    Trees,
    /// Any connected fragment, ring closures included.
    Graphs,
}

/// Everything a mining run reads, fixed when mining starts.
#[derive(Debug, Clone)]
pub struct MiningContext {
    settings: Settings,
    labels: Labels,
    critical: Option<f64>,
    edge_types: HashSet<EdgeType>,
    frequent_labels: BitSet,
    min_support: u64,
}

impl MiningContext {
    /// Check that `store` is complete and precompute the label statistics and
    /// frequent edge types.
    pub fn new(store: &CompoundStore, settings: &Settings) -> Result<Self, MiningError> {
        store.check_coverage()?;

        let mut values = Vec::with_capacity(store.len());
        let mut multiplicity = Vec::with_capacity(store.len());
        for c in store.iter() {
            values.push(c.activity().ok_or(MiningError::MissingActivity(c.id()))?);
            multiplicity.push(c.multiplicity());
        }
        let labels = if settings.regression {
            Labels::continuous(&values, &multiplicity)
        } else {
            Labels::categorical(&values, &multiplicity)
        };
        let critical = labels.critical_value(settings.significance)?;

        let edge_types = store.frequent_edge_types(settings.min_frequency);
        let frequent_labels = store.frequent_labels(settings.min_frequency);
        info!(
            compounds = store.len(),
            roots = store.label_count(),
            frequent_edge_types = edge_types.len(),
            min_frequency = settings.min_frequency,
            level = ?settings.level,
            significance = settings.significance,
            critical = ?critical,
            backbone = settings.backbone,
            bounds = ?settings.bounds,
            regression = settings.regression,
            "mining context ready"
        );
        Ok(Self {
            settings: settings.clone(),
            labels,
            critical,
            edge_types,
            frequent_labels,
            min_support: settings.min_frequency.ceil() as u64,
        })
    }
}

/// One emitted fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentRecord {
    /// Root the fragment was mined under.
    pub root: usize,
    pub pattern: String,
    pub code: DfsCode,
    /// Atom of every DFS vertex of `code`.
    pub atoms: Vec<Atom>,
    pub statistic: f64,
    pub p_value: f64,
    pub score: f64,
    pub direction: Direction,
    /// Number of matching compounds.
    pub support: usize,
    /// Weighted number of matching compounds.
    pub weighted_support: u64,
    /// Ids of the matching compounds, in registration order.
    pub matching_ids: Vec<u64>,
    /// Matching ids split by class, highest class first; a single group for
    /// continuous activities.
    pub groups: Vec<Vec<u64>>,
    /// Index of the fragment's backbone class within its root.
    pub backbone: usize,
}

impl FragmentRecord {
    /// The fragment as a molecular graph, node `i` being DFS vertex `i`.
    pub fn graph(&self) -> MGraph {
        let mut graph = MGraph::default();
        let nodes: Vec<_> = self.atoms.iter().map(|a| graph.add_node(*a)).collect();
        for e in self.code.edges() {
            graph.add_edge(nodes[e.from], nodes[e.to], e.bond);
        }
        graph
    }
}

struct Frame {
    code: DfsCode,
    projection: Projection,
    support: Support,
}

struct Candidate {
    code: DfsCode,
    support: Support,
    significance: Significance,
    backbone: usize,
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        self.significance.score > other.significance.score
            || (self.significance.score == other.significance.score && self.code > other.code)
    }
}

/// Mines single roots over a read-only store and context.
pub struct Miner<'a> {
    store: &'a CompoundStore,
    context: &'a MiningContext,
}

impl<'a> Miner<'a> {
    pub fn new(store: &'a CompoundStore, context: &'a MiningContext) -> Self {
        Self { store, context }
    }

    /// Mine every fragment whose smallest atom label is `root`.
    pub fn mine_root(&self, root: usize) -> Result<Vec<FragmentRecord>, MiningError> {
        let settings = &self.context.settings;
        let label = Label::try_from(root).map_err(|_| MiningError::RootOutOfRange {
            index: root,
            count: self.store.label_count(),
        })?;
        let atom = self.store.atom(label).ok_or(MiningError::RootOutOfRange {
            index: root,
            count: self.store.label_count(),
        })?;
        info!(root, %atom, "mining root");
        if !self.context.frequent_labels.contains(root) {
            debug!(root, "root atom is infrequent");
            return Ok(Vec::new());
        }

        let rules = ExtensionRules {
            level: settings.level,
            min_label: label,
            edge_types: &self.context.edge_types,
        };
        let mut stack: Vec<Frame> = Vec::new();
        self.push_children(
            &mut stack,
            &DfsCode::default(),
            Projection::seeds(self.store, label, &rules),
        );

        let mut backbones: HashMap<DfsCode<()>, usize> = HashMap::new();
        let mut emitted: Vec<Candidate> = Vec::new();
        let (mut visited, mut pruned) = (0usize, 0usize);

        while let Some(frame) = stack.pop() {
            visited += 1;
            let significance = self.context.labels.evaluate(&frame.support.matching);
            let significant = self
                .context
                .critical
                .map_or(true, |critical| significance.score >= critical);

            if significant {
                let next = backbones.len();
                let backbone = *backbones.entry(frame.code.skeleton()).or_insert(next);
                let candidate = Candidate {
                    code: frame.code.clone(),
                    support: frame.support.clone(),
                    significance,
                    backbone,
                };
                if !settings.backbone || backbone == emitted.len() {
                    emitted.push(candidate);
                } else if candidate.beats(&emitted[backbone]) {
                    emitted[backbone] = candidate;
                }
            }

            if !self.may_refine(&frame) {
                continue;
            }
            if self.is_pruned(&frame.support.matching) {
                pruned += 1;
                continue;
            }
            let children = frame.projection.extend(self.store, &frame.code, &rules);
            self.push_children(&mut stack, &frame.code, children);
        }

        debug!(root, visited, pruned, emitted = emitted.len(), "root finished");
        emitted
            .into_iter()
            .map(|candidate| self.record(root, candidate))
            .collect()
    }

    fn push_children(
        &self,
        stack: &mut Vec<Frame>,
        parent: &DfsCode,
        children: impl IntoIterator<Item = (DfsEdge, Projection)>,
    ) {
        let min_frequency = self.context.settings.min_frequency;
        let mut frames = Vec::new();
        for (edge, projection) in children {
            let mut code = parent.clone();
            code.push(edge);
            if !code.is_min() {
                continue;
            }
            let support = projection.support(self.store);
            if (support.weighted_sum as f64) < min_frequency {
                continue;
            }
            frames.push(Frame {
                code,
                projection,
                support,
            });
        }
        stack.extend(frames.into_iter().rev());
    }

    fn may_refine(&self, frame: &Frame) -> bool {
        let settings = &self.context.settings;
        if settings.max_hops.is_some_and(|max| frame.code.len() >= max) {
            return false;
        }
        frame.support.count > 1 || settings.refine_singles
    }

    fn is_pruned(&self, matching: &BitSet) -> bool {
        let Some(critical) = self.context.critical else {
            return false;
        };
        let bounds = &self.context.settings.bounds;
        if !bounds.contains(&Bound::Significance) {
            return false;
        }
        let min_support = if bounds.contains(&Bound::Dynamic) {
            self.context.min_support
        } else {
            0
        };
        upper_bound(&self.context.labels, matching, min_support) < critical
    }

    fn record(&self, root: usize, candidate: Candidate) -> Result<FragmentRecord, MiningError> {
        let Candidate {
            code,
            support,
            significance,
            backbone,
        } = candidate;
        let graph = self.store.fragment_graph(&code).ok_or_else(|| {
            MiningError::Internal(format!("fragment {code:?} uses an unknown atom label"))
        })?;
        let atoms = graph.node_weights().copied().collect();
        let matching_ids = support.ids(self.store);
        let groups = match &self.context.labels {
            Labels::Categorical(classes) => (0..classes.values().len())
                .rev()
                .map(|class| {
                    support
                        .matching
                        .iter()
                        .filter(|slot| classes.class_of(*slot) == class)
                        .filter_map(|slot| self.store.get(slot).map(|c| c.id()))
                        .collect()
                })
                .collect(),
            Labels::Continuous(_) => vec![matching_ids.clone()],
        };
        Ok(FragmentRecord {
            root,
            pattern: write_pattern(&graph),
            code,
            atoms,
            statistic: significance.statistic,
            p_value: significance.p_value,
            score: significance.score,
            direction: significance.direction,
            support: support.count,
            weighted_support: support.weighted_sum,
            matching_ids,
            groups,
            backbone,
        })
    }
}
