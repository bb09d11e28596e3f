//! Registered compounds and the atom label alphabet.
//!
//! Atoms are interned into dense [`Label`]s in order of first appearance
//! across all registered compounds; the labels double as root indices. The
//! store also knows which edge types (atom label, bond, atom label) are
//! frequent enough to take part in mining.

use std::collections::{HashMap, HashSet};

use bit_set::BitSet;
use petgraph::{graph::NodeIndex, visit::EdgeRef};

use crate::{
    canonize::{DfsCode, Label},
    error::MiningError,
    molecule::{Atom, Bond, Index, MGraph, Molecule},
};

/// An undirected edge type, smaller label first.
pub type EdgeType = (Label, Bond, Label);

/// Normalise an edge type so that both directions map to the same key.
pub fn edge_type(a: Label, bond: Bond, b: Label) -> EdgeType {
    if a <= b {
        (a, bond, b)
    } else {
        (b, bond, a)
    }
}

/// A registered compound.
#[derive(Debug, Clone)]
pub struct Compound {
    id: u64,
    molecule: Molecule,
    labels: Vec<Label>,
    activity: Option<f64>,
    weight: Option<f64>,
}

impl Compound {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn molecule(&self) -> &Molecule {
        &self.molecule
    }

    /// Label of the atom at `node`.
    pub fn label(&self, node: NodeIndex<Index>) -> Label {
        self.labels[node.index()]
    }

    pub fn activity(&self) -> Option<f64> {
        self.activity
    }

    /// How many times this compound counts: its weight rounded down, or 1.
    pub fn multiplicity(&self) -> u64 {
        self.weight.map_or(1, |w| w.floor() as u64)
    }
}

/// All compounds of a session, addressed by insertion slot.
#[derive(Debug, Clone, Default)]
pub struct CompoundStore {
    compounds: Vec<Compound>,
    slots: HashMap<u64, usize>,
    atoms: Vec<Atom>,
    atom_labels: HashMap<Atom, Label>,
}

impl CompoundStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `molecule` under `id`, interning any new atom types.
    pub fn insert(&mut self, id: u64, molecule: Molecule) -> Result<usize, MiningError> {
        if self.slots.contains_key(&id) {
            return Err(MiningError::DuplicateCompound(id));
        }
        let labels = molecule
            .graph()
            .node_weights()
            .map(|atom| self.intern(*atom))
            .collect();
        let slot = self.compounds.len();
        self.compounds.push(Compound {
            id,
            molecule,
            labels,
            activity: None,
            weight: None,
        });
        self.slots.insert(id, slot);
        Ok(slot)
    }

    fn intern(&mut self, atom: Atom) -> Label {
        if let Some(label) = self.atom_labels.get(&atom) {
            return *label;
        }
        let label = self.atoms.len() as Label;
        self.atoms.push(atom);
        self.atom_labels.insert(atom, label);
        label
    }

    pub fn set_activity(&mut self, id: u64, value: f64) -> Result<(), MiningError> {
        if !value.is_finite() {
            return Err(MiningError::InvalidActivity { id, value });
        }
        self.compound_mut(id)?.activity = Some(value);
        Ok(())
    }

    pub fn set_weight(&mut self, id: u64, value: f64) -> Result<(), MiningError> {
        if !value.is_finite() || value < 1.0 {
            return Err(MiningError::InvalidWeight { id, value });
        }
        self.compound_mut(id)?.weight = Some(value);
        Ok(())
    }

    fn compound_mut(&mut self, id: u64) -> Result<&mut Compound, MiningError> {
        let slot = *self.slots.get(&id).ok_or(MiningError::UnknownCompound(id))?;
        Ok(&mut self.compounds[slot])
    }

    pub fn len(&self) -> usize {
        self.compounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compounds.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<&Compound> {
        self.compounds.get(slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Compound> {
        self.compounds.iter()
    }

    /// Multiplicity of the compound in `slot` (0 for unknown slots).
    pub fn multiplicity(&self, slot: usize) -> u64 {
        self.compounds.get(slot).map_or(0, Compound::multiplicity)
    }

    /// Number of distinct atom types, i.e. the number of roots.
    pub fn label_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn atom(&self, label: Label) -> Option<Atom> {
        self.atoms.get(label as usize).copied()
    }

    /// `true` iff any compound carries a weight.
    pub fn has_weights(&self) -> bool {
        self.compounds.iter().any(|c| c.weight.is_some())
    }

    /// Check that every compound has an activity and, if any weight was given,
    /// a weight.
    pub fn check_coverage(&self) -> Result<(), MiningError> {
        if self.compounds.is_empty() {
            return Err(MiningError::NoCompounds);
        }
        if let Some(c) = self.compounds.iter().find(|c| c.activity.is_none()) {
            return Err(MiningError::MissingActivity(c.id));
        }
        if self.has_weights() {
            if let Some(c) = self.compounds.iter().find(|c| c.weight.is_none()) {
                return Err(MiningError::MissingWeight(c.id));
            }
        }
        Ok(())
    }

    /// Atom labels whose weighted support reaches `min_frequency`.
    pub fn frequent_labels(&self, min_frequency: f64) -> BitSet {
        let mut support = vec![0u64; self.atoms.len()];
        for c in &self.compounds {
            let seen: BitSet = c.labels.iter().map(|l| *l as usize).collect();
            for l in seen.iter() {
                support[l] += c.multiplicity();
            }
        }
        support
            .iter()
            .enumerate()
            .filter(|(_, s)| **s as f64 >= min_frequency)
            .map(|(l, _)| l)
            .collect()
    }

    /// Edge types whose weighted support reaches `min_frequency`.
    pub fn frequent_edge_types(&self, min_frequency: f64) -> HashSet<EdgeType> {
        let mut support: HashMap<EdgeType, u64> = HashMap::new();
        for c in &self.compounds {
            let graph = c.molecule.graph();
            let seen: HashSet<EdgeType> = graph
                .edge_references()
                .map(|e| edge_type(c.label(e.source()), *e.weight(), c.label(e.target())))
                .collect();
            for t in seen {
                *support.entry(t).or_default() += c.multiplicity();
            }
        }
        support
            .into_iter()
            .filter(|(_, s)| *s as f64 >= min_frequency)
            .map(|(t, _)| t)
            .collect()
    }

    /// Build the fragment described by `code` as a molecular graph whose node
    /// indices are the DFS vertices.
    pub fn fragment_graph(&self, code: &DfsCode) -> Option<MGraph> {
        let mut graph = MGraph::default();
        let nodes = code
            .labels()
            .into_iter()
            .map(|l| self.atom(l).map(|atom| graph.add_node(atom)))
            .collect::<Option<Vec<_>>>()?;
        for e in code.edges() {
            graph.add_edge(nodes[e.from], nodes[e.to], e.bond);
        }
        Some(graph)
    }

    /// Forget every compound and label.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_smiles;

    fn store(smiles: &[&str]) -> CompoundStore {
        let mut store = CompoundStore::new();
        for (i, s) in smiles.iter().enumerate() {
            store.insert(i as u64 + 1, parse_smiles(s, true).unwrap()).unwrap();
        }
        store
    }

    #[test]
    fn labels_in_discovery_order() {
        let store = store(&["CO", "NC", "c1ccccc1"]);
        assert_eq!(store.label_count(), 4);
        assert_eq!(store.atom(0).map(|a| a.to_string()), Some("C".to_string()));
        assert_eq!(store.atom(1).map(|a| a.to_string()), Some("O".to_string()));
        assert_eq!(store.atom(2).map(|a| a.to_string()), Some("N".to_string()));
        assert_eq!(store.atom(3).map(|a| a.to_string()), Some("c".to_string()));
    }

    #[test]
    fn duplicate_and_unknown_ids() {
        let mut store = store(&["CC"]);
        assert_eq!(
            store.insert(1, parse_smiles("C", true).unwrap()),
            Err(MiningError::DuplicateCompound(1))
        );
        assert_eq!(store.set_activity(5, 1.0), Err(MiningError::UnknownCompound(5)));
        assert!(matches!(store.set_weight(1, 0.5), Err(MiningError::InvalidWeight { id: 1, .. })));
        assert!(matches!(
            store.set_activity(1, f64::NAN),
            Err(MiningError::InvalidActivity { id: 1, .. })
        ));
    }

    #[test]
    fn coverage() {
        let mut store = store(&["CC", "CO"]);
        assert_eq!(store.check_coverage(), Err(MiningError::MissingActivity(1)));
        store.set_activity(1, 1.0).unwrap();
        store.set_activity(2, 0.0).unwrap();
        assert_eq!(store.check_coverage(), Ok(()));
        store.set_weight(2, 3.7).unwrap();
        assert_eq!(store.check_coverage(), Err(MiningError::MissingWeight(1)));
        store.set_weight(1, 1.0).unwrap();
        assert_eq!(store.check_coverage(), Ok(()));
        assert_eq!(store.multiplicity(1), 3);
        assert_eq!(CompoundStore::new().check_coverage(), Err(MiningError::NoCompounds));
    }

    #[test]
    fn frequent_edge_types_respect_weights() {
        let mut store = store(&["CC", "CO", "CO"]);
        let frequent = store.frequent_edge_types(2.0);
        assert!(frequent.contains(&(0, Bond::Single, 1)));
        assert!(!frequent.contains(&(0, Bond::Single, 0)));
        store.set_weight(1, 2.0).unwrap();
        assert!(store.frequent_edge_types(2.0).contains(&(0, Bond::Single, 0)));
        assert_eq!(store.frequent_labels(3.0).iter().collect::<Vec<_>>(), vec![0]);
    }
}
