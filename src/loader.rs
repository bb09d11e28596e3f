//! Read compounds from SMILES or gSpan text and write fragment patterns.
//!
//! This is the graph codec sitting between text and [`Molecule`]s. The SMILES
//! reader understands the organic subset, bracket atoms (isotope, chirality,
//! hydrogen count, charge and class are accepted and ignored), explicit and
//! implicit bonds, branches, ring closures (`1`..`9`, `%nn`) and disconnected
//! components. Hydrogens are never part of a [`Molecule`]: explicit hydrogen
//! atoms are dropped together with their bonds.
//!
//! Patterns are written SMARTS-style with every atom bracketed and every bond
//! explicit, e.g. `[C]-[C](=[O])-[N]` or `[c]1:[c]:[c]:[c]:[c]:[c]:1`.

use std::collections::{BTreeMap, HashMap};

use bit_set::BitSet;
use petgraph::{
    graph::{EdgeIndex, NodeIndex},
    visit::EdgeRef,
};
use thiserror::Error;

use crate::molecule::{Atom, Bond, Element, Index, MGraph, Molecule, ParseBondError};

/// gSpan atom label of an aromatic carbon.
pub const AROMATIC_CARBON_LABEL: u32 = 254;

/// Thrown by [`parse_smiles`] when the input is not a structure it can read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseSmilesError {
    #[error("empty structure")]
    Empty,
    #[error("unexpected character {1:?} at position {0}")]
    UnexpectedChar(usize, char),
    #[error("unknown element {0:?}")]
    UnknownElement(String),
    #[error("unsupported feature {0:?}")]
    Unsupported(char),
    #[error("ring bond {0} is never closed")]
    UnclosedRing(u32),
    #[error("unbalanced branch parentheses")]
    UnbalancedBranch,
    #[error("self-loop or duplicate bond")]
    Malformed,
    #[error("unexpected end of input")]
    UnexpectedEnd,
}

/// Thrown by [`parse_gspan`], carrying the offending (1-based) line number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseGspanError {
    #[error("line {0}: expected `t # <id>`, `v <i> <label>` or `e <i> <j> <label>`")]
    Syntax(usize),
    #[error("line {0}: vertex or edge outside of a graph block")]
    Orphan(usize),
    #[error("line {0}: vertices must be numbered consecutively from 0")]
    VertexOrder(usize),
    #[error("line {0}: unknown atom label {1}")]
    AtomLabel(usize, u32),
    #[error("line {0}: {1}")]
    BondLabel(usize, ParseBondError),
    #[error("line {0}: unknown vertex {1}")]
    Vertex(usize, usize),
    #[error("line {0}: self-loop or duplicate edge")]
    Malformed(usize),
}

/// A position in the written structure; hydrogens occupy a place in the
/// chain but have no node.
#[derive(Debug, Copy, Clone)]
enum Slot {
    Heavy(NodeIndex<Index>, bool),
    Hydrogen,
}

struct SmilesParser {
    chars: Vec<char>,
    pos: usize,
    graph: MGraph,
}

/// Parse a SMILES string into a [`Molecule`], perceiving aromatic rings
/// written in Kekulé form if `aromatic` is set.
pub fn parse_smiles(input: &str, aromatic: bool) -> Result<Molecule, ParseSmilesError> {
    let graph = SmilesParser::new(input).parse()?;
    let mut mol = Molecule::from_graph(graph);
    if aromatic {
        mol.perceive_aromaticity();
    }
    Ok(mol)
}

impl SmilesParser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.trim().chars().collect(),
            pos: 0,
            graph: MGraph::default(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn parse(mut self) -> Result<MGraph, ParseSmilesError> {
        if self.chars.is_empty() {
            return Err(ParseSmilesError::Empty);
        }

        let mut prev: Option<Slot> = None;
        let mut branches: Vec<Option<Slot>> = Vec::new();
        let mut pending: Option<Bond> = None;
        let mut rings: HashMap<u32, (Slot, Option<Bond>)> = HashMap::new();

        while let Some(c) = self.peek() {
            let at = self.pos;
            match c {
                '(' => {
                    self.pos += 1;
                    if prev.is_none() {
                        return Err(ParseSmilesError::UnexpectedChar(at, c));
                    }
                    branches.push(prev);
                }
                ')' => {
                    self.pos += 1;
                    if pending.is_some() {
                        return Err(ParseSmilesError::UnexpectedChar(at, c));
                    }
                    prev = branches.pop().ok_or(ParseSmilesError::UnbalancedBranch)?;
                }
                '-' | '/' | '\\' | '=' | '#' | ':' => {
                    self.pos += 1;
                    if pending.is_some() || prev.is_none() {
                        return Err(ParseSmilesError::UnexpectedChar(at, c));
                    }
                    pending = Some(match c {
                        '=' => Bond::Double,
                        '#' => Bond::Triple,
                        ':' => Bond::Aromatic,
                        _ => Bond::Single,
                    });
                }
                '$' => return Err(ParseSmilesError::Unsupported(c)),
                '.' => {
                    self.pos += 1;
                    if pending.is_some() {
                        return Err(ParseSmilesError::UnexpectedChar(at, c));
                    }
                    prev = None;
                }
                '0'..='9' | '%' => {
                    let number = self.ring_number()?;
                    let here = prev.ok_or(ParseSmilesError::UnexpectedChar(at, c))?;
                    match rings.remove(&number) {
                        Some((there, opening)) => {
                            if let (Some(a), Some(b)) = (pending, opening) {
                                if a != b {
                                    return Err(ParseSmilesError::Malformed);
                                }
                            }
                            self.connect(there, here, pending.or(opening))?;
                        }
                        None => {
                            rings.insert(number, (here, pending));
                        }
                    }
                    pending = None;
                }
                '[' => {
                    self.pos += 1;
                    let atom = self.bracket_atom()?;
                    if let Some(p) = prev {
                        self.connect(p, atom, pending.take())?;
                    }
                    prev = Some(atom);
                }
                _ => {
                    let atom = self.organic_atom()?;
                    if let Some(p) = prev {
                        self.connect(p, atom, pending.take())?;
                    }
                    prev = Some(atom);
                }
            }
        }

        if !branches.is_empty() {
            return Err(ParseSmilesError::UnbalancedBranch);
        }
        if let Some(number) = rings.keys().min() {
            return Err(ParseSmilesError::UnclosedRing(*number));
        }
        if pending.is_some() {
            return Err(ParseSmilesError::UnexpectedEnd);
        }
        if self.graph.node_count() == 0 {
            return Err(ParseSmilesError::Empty);
        }
        Ok(self.graph)
    }

    fn connect(&mut self, a: Slot, b: Slot, bond: Option<Bond>) -> Result<(), ParseSmilesError> {
        let (Slot::Heavy(u, u_arom), Slot::Heavy(v, v_arom)) = (a, b) else {
            return Ok(());
        };
        if u == v || self.graph.find_edge(u, v).is_some() {
            return Err(ParseSmilesError::Malformed);
        }
        let bond = bond.unwrap_or(if u_arom && v_arom {
            Bond::Aromatic
        } else {
            Bond::Single
        });
        self.graph.add_edge(u, v, bond);
        Ok(())
    }

    fn add_atom(&mut self, element: Element, aromatic: bool) -> Slot {
        if element == Element::Hydrogen {
            Slot::Hydrogen
        } else {
            Slot::Heavy(self.graph.add_node(Atom::new(element, aromatic)), aromatic)
        }
    }

    fn ring_number(&mut self) -> Result<u32, ParseSmilesError> {
        let at = self.pos;
        match self.next() {
            Some('%') => {
                let hi = self.next().and_then(|c| c.to_digit(10));
                let lo = self.next().and_then(|c| c.to_digit(10));
                match (hi, lo) {
                    (Some(hi), Some(lo)) => Ok(10 * hi + lo),
                    _ => Err(ParseSmilesError::UnexpectedChar(at, '%')),
                }
            }
            Some(c) => c
                .to_digit(10)
                .ok_or(ParseSmilesError::UnexpectedChar(at, c)),
            None => Err(ParseSmilesError::UnexpectedEnd),
        }
    }

    fn organic_atom(&mut self) -> Result<Slot, ParseSmilesError> {
        let at = self.pos;
        let c = self.next().ok_or(ParseSmilesError::UnexpectedEnd)?;
        let (element, aromatic) = match c {
            'B' if self.peek() == Some('r') => {
                self.pos += 1;
                (Element::Bromine, false)
            }
            'C' if self.peek() == Some('l') => {
                self.pos += 1;
                (Element::Chlorine, false)
            }
            'B' => (Element::Boron, false),
            'C' => (Element::Carbon, false),
            'N' => (Element::Nitrogen, false),
            'O' => (Element::Oxygen, false),
            'P' => (Element::Phosphorus, false),
            'S' => (Element::Sulfur, false),
            'F' => (Element::Fluorine, false),
            'I' => (Element::Iodine, false),
            'b' => (Element::Boron, true),
            'c' => (Element::Carbon, true),
            'n' => (Element::Nitrogen, true),
            'o' => (Element::Oxygen, true),
            'p' => (Element::Phosphorus, true),
            's' => (Element::Sulfur, true),
            '*' => return Err(ParseSmilesError::Unsupported(c)),
            _ => return Err(ParseSmilesError::UnexpectedChar(at, c)),
        };
        Ok(self.add_atom(element, aromatic))
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    fn bracket_atom(&mut self) -> Result<Slot, ParseSmilesError> {
        // Isotope.
        self.skip_digits();

        // Element symbol, two letters preferred.
        let first = self.next().ok_or(ParseSmilesError::UnexpectedEnd)?;
        let second = self.peek().filter(|c| c.is_ascii_lowercase());
        let (element, aromatic) = if first.is_ascii_uppercase() {
            match second.and_then(|s| format!("{first}{s}").parse::<Element>().ok()) {
                Some(element) => {
                    self.pos += 1;
                    (element, false)
                }
                None => (
                    first
                        .to_string()
                        .parse::<Element>()
                        .map_err(|_| ParseSmilesError::UnknownElement(first.to_string()))?,
                    false,
                ),
            }
        } else if first.is_ascii_lowercase() {
            let two = second.map(|s| format!("{first}{s}"));
            match two.as_deref() {
                Some("se") => {
                    self.pos += 1;
                    (Element::Selenium, true)
                }
                Some("as") => {
                    self.pos += 1;
                    (Element::Arsenic, true)
                }
                _ => match first {
                    'b' => (Element::Boron, true),
                    'c' => (Element::Carbon, true),
                    'n' => (Element::Nitrogen, true),
                    'o' => (Element::Oxygen, true),
                    'p' => (Element::Phosphorus, true),
                    's' => (Element::Sulfur, true),
                    _ => return Err(ParseSmilesError::UnknownElement(first.to_string())),
                },
            }
        } else if first == '*' {
            return Err(ParseSmilesError::Unsupported(first));
        } else {
            return Err(ParseSmilesError::UnexpectedChar(self.pos - 1, first));
        };

        // Chirality.
        if self.peek() == Some('@') {
            while self.peek() == Some('@') {
                self.pos += 1;
            }
            let tag: String = self.chars[self.pos..].iter().take(2).collect();
            if matches!(tag.as_str(), "TH" | "AL" | "SP" | "TB" | "OH") {
                self.pos += 2;
                self.skip_digits();
            }
        }

        // Hydrogen count.
        if self.peek() == Some('H') {
            self.pos += 1;
            self.skip_digits();
        }

        // Charge.
        while let Some('+' | '-') = self.peek() {
            self.pos += 1;
            self.skip_digits();
        }

        // Atom class.
        if self.peek() == Some(':') {
            self.pos += 1;
            self.skip_digits();
        }

        let at = self.pos;
        match self.next() {
            Some(']') => Ok(self.add_atom(element, aromatic)),
            Some(c) => Err(ParseSmilesError::UnexpectedChar(at, c)),
            None => Err(ParseSmilesError::UnexpectedEnd),
        }
    }
}

/// Write a connected fragment graph as a pattern string.
///
/// The walk starts at node 0 and takes incident bonds in edge index order, so
/// a given graph always produces the same string.
pub fn write_pattern(graph: &MGraph) -> String {
    let mut out = String::new();
    if graph.node_count() == 0 {
        return out;
    }

    // First walk: spanning tree children and ring closure bonds.
    let n = graph.node_count();
    let mut order = vec![usize::MAX; n];
    let mut children: Vec<Vec<EdgeIndex<Index>>> = vec![Vec::new(); n];
    let mut closures = BitSet::new();
    let mut seen_edges = BitSet::new();
    let mut counter = 0;
    let mut stack = vec![NodeIndex::<Index>::new(0)];
    order[0] = counter;
    let mut cursor = vec![0usize; n];
    let incident: Vec<Vec<(EdgeIndex<Index>, NodeIndex<Index>)>> = graph
        .node_indices()
        .map(|v| {
            let mut edges: Vec<_> = graph
                .edges(v)
                .map(|e| (e.id(), other_end(graph, e.id(), v)))
                .collect();
            edges.sort_by_key(|(e, _)| *e);
            edges
        })
        .collect();
    while let Some(&v) = stack.last() {
        let Some(&(e, w)) = incident[v.index()].get(cursor[v.index()]) else {
            stack.pop();
            continue;
        };
        cursor[v.index()] += 1;
        if !seen_edges.insert(e.index()) {
            continue;
        }
        if order[w.index()] == usize::MAX {
            counter += 1;
            order[w.index()] = counter;
            children[v.index()].push(e);
            stack.push(w);
        } else {
            closures.insert(e.index());
        }
    }

    // Second walk: emit atoms, ring digits and branches.
    let mut digits: BTreeMap<usize, u32> = BTreeMap::new();
    let mut in_use: Vec<bool> = Vec::new();
    write_atom(
        graph,
        &incident,
        &children,
        &closures,
        &order,
        &mut digits,
        &mut in_use,
        NodeIndex::new(0),
        &mut out,
    );
    out
}

fn other_end(graph: &MGraph, e: EdgeIndex<Index>, v: NodeIndex<Index>) -> NodeIndex<Index> {
    match graph.edge_endpoints(e) {
        Some((a, b)) if a == v => b,
        Some((a, _)) => a,
        None => v,
    }
}

#[allow(clippy::too_many_arguments)]
fn write_atom(
    graph: &MGraph,
    incident: &[Vec<(EdgeIndex<Index>, NodeIndex<Index>)>],
    children: &[Vec<EdgeIndex<Index>>],
    closures: &BitSet,
    order: &[usize],
    digits: &mut BTreeMap<usize, u32>,
    in_use: &mut Vec<bool>,
    v: NodeIndex<Index>,
    out: &mut String,
) {
    out.push('[');
    out.push_str(&graph[v].to_string());
    out.push(']');

    for &(e, w) in &incident[v.index()] {
        if !closures.contains(e.index()) {
            continue;
        }
        if order[v.index()] < order[w.index()] {
            let digit = match in_use.iter().position(|used| !used) {
                Some(free) => free,
                None => {
                    in_use.push(false);
                    in_use.len() - 1
                }
            };
            in_use[digit] = true;
            let digit = digit as u32 + 1;
            digits.insert(e.index(), digit);
            push_ring_digit(out, digit);
        } else if let Some(digit) = digits.remove(&e.index()) {
            out.push(graph[e].symbol());
            push_ring_digit(out, digit);
            in_use[digit as usize - 1] = false;
        }
    }

    let kids = &children[v.index()];
    for (i, &e) in kids.iter().enumerate() {
        let w = other_end(graph, e, v);
        let branch = i + 1 < kids.len();
        if branch {
            out.push('(');
        }
        out.push(graph[e].symbol());
        write_atom(graph, incident, children, closures, order, digits, in_use, w, out);
        if branch {
            out.push(')');
        }
    }
}

fn push_ring_digit(out: &mut String, digit: u32) {
    if digit < 10 {
        out.push_str(&digit.to_string());
    } else {
        out.push_str(&format!("%{digit:02}"));
    }
}

/// Parse gSpan graph blocks into `(id, molecule)` pairs.
///
/// Vertex labels are atomic numbers, with [`AROMATIC_CARBON_LABEL`] for
/// aromatic carbon; edge labels are 1 (single), 2 (double), 3 (triple) and
/// 4 (aromatic). Hydrogen vertices are dropped. Blank lines are skipped.
pub fn parse_gspan(input: &str) -> Result<Vec<(u64, Molecule)>, ParseGspanError> {
    let mut out = Vec::new();
    let mut current: Option<(u64, MGraph, Vec<Option<NodeIndex<Index>>>)> = None;

    for (i, line) in input.lines().enumerate() {
        let lineno = i + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [] => continue,
            ["t", "#", id, ..] => {
                let id = id.parse().map_err(|_| ParseGspanError::Syntax(lineno))?;
                if let Some((id, graph, _)) = current.take() {
                    out.push((id, Molecule::from_graph(graph)));
                }
                current = Some((id, MGraph::default(), Vec::new()));
            }
            ["v", index, label] => {
                let (_, graph, nodes) = current.as_mut().ok_or(ParseGspanError::Orphan(lineno))?;
                let index: usize = index.parse().map_err(|_| ParseGspanError::Syntax(lineno))?;
                let label: u32 = label.parse().map_err(|_| ParseGspanError::Syntax(lineno))?;
                if index != nodes.len() {
                    return Err(ParseGspanError::VertexOrder(lineno));
                }
                let atom = if label == AROMATIC_CARBON_LABEL {
                    Atom::new(Element::Carbon, true)
                } else {
                    let element = u8::try_from(label)
                        .ok()
                        .and_then(Element::from_atomic_number)
                        .ok_or(ParseGspanError::AtomLabel(lineno, label))?;
                    Atom::new(element, false)
                };
                if atom.element() == Element::Hydrogen {
                    nodes.push(None);
                } else {
                    nodes.push(Some(graph.add_node(atom)));
                }
            }
            ["e", src, dst, label] => {
                let (_, graph, nodes) = current.as_mut().ok_or(ParseGspanError::Orphan(lineno))?;
                let src: usize = src.parse().map_err(|_| ParseGspanError::Syntax(lineno))?;
                let dst: usize = dst.parse().map_err(|_| ParseGspanError::Syntax(lineno))?;
                let label: usize = label.parse().map_err(|_| ParseGspanError::Syntax(lineno))?;
                let bond =
                    Bond::try_from(label).map_err(|e| ParseGspanError::BondLabel(lineno, e))?;
                let u = *nodes.get(src).ok_or(ParseGspanError::Vertex(lineno, src))?;
                let v = *nodes.get(dst).ok_or(ParseGspanError::Vertex(lineno, dst))?;
                if let (Some(u), Some(v)) = (u, v) {
                    if u == v || graph.find_edge(u, v).is_some() {
                        return Err(ParseGspanError::Malformed(lineno));
                    }
                    graph.add_edge(u, v, bond);
                }
            }
            _ => return Err(ParseGspanError::Syntax(lineno)),
        }
    }
    if let Some((id, graph, _)) = current.take() {
        out.push((id, Molecule::from_graph(graph)));
    }
    Ok(out)
}

/// Write a fragment graph as a gSpan block with the given id.
pub fn write_gspan(id: u64, graph: &MGraph) -> String {
    let mut out = format!("t # {id}\n");
    for v in graph.node_indices() {
        let atom = graph[v];
        let label = if atom.is_aromatic() && atom.element() == Element::Carbon {
            AROMATIC_CARBON_LABEL
        } else {
            atom.element().atomic_number() as u32
        };
        out.push_str(&format!("v {} {label}\n", v.index()));
    }
    for e in graph.edge_references() {
        out.push_str(&format!(
            "e {} {} {}\n",
            e.source().index(),
            e.target().index(),
            e.weight().label()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bonds(mol: &Molecule) -> Vec<Bond> {
        let mut b: Vec<_> = mol.graph().edge_weights().copied().collect();
        b.sort();
        b
    }

    #[test]
    fn parse_simple_chain() {
        let mol = parse_smiles("CC(=O)O", true).unwrap();
        assert_eq!(mol.atom_count(), 4);
        assert_eq!(bonds(&mol), vec![Bond::Single, Bond::Single, Bond::Double]);
    }

    #[test]
    fn parse_two_letter_elements() {
        let mol = parse_smiles("ClCBr", true).unwrap();
        let elements: Vec<_> = mol.graph().node_weights().map(|a| a.element()).collect();
        assert_eq!(elements, vec![Element::Chlorine, Element::Carbon, Element::Bromine]);
    }

    #[test]
    fn parse_drops_hydrogens() {
        let mol = parse_smiles("[H]C([2H])O", true).unwrap();
        assert_eq!(mol.atom_count(), 2);
        assert_eq!(mol.bond_count(), 1);
    }

    #[test]
    fn parse_bracket_atoms() {
        let mol = parse_smiles("[NH4+].[O-][13C@@H](Cl)[Fe+2]", true).unwrap();
        assert_eq!(mol.atom_count(), 5);
        assert_eq!(mol.bond_count(), 3);
    }

    #[test]
    fn parse_aromatic_lowercase() {
        let mol = parse_smiles("c1ccccc1", true).unwrap();
        assert_eq!(bonds(&mol), vec![Bond::Aromatic; 6]);
        assert!(mol.graph().node_weights().all(|a| a.is_aromatic()));
    }

    #[test]
    fn kekule_benzene_perceived() {
        let mol = parse_smiles("C1=CC=CC=C1", true).unwrap();
        assert_eq!(bonds(&mol), vec![Bond::Aromatic; 6]);
        let mol = parse_smiles("C1=CC=CC=C1", false).unwrap();
        assert_eq!(bonds(&mol).iter().filter(|b| **b == Bond::Double).count(), 3);
    }

    #[test]
    fn barbiturate_ring_not_aromatic() {
        let mol = parse_smiles("O=C1NC(=S)NC(=O)C1C(=O)NC2=CC=CC=C2", true).unwrap();
        let aromatic = mol.graph().edge_weights().filter(|b| **b == Bond::Aromatic).count();
        assert_eq!(aromatic, 6);
        assert_eq!(mol.atom_count(), 18);
        assert_eq!(mol.bond_count(), 19);
    }

    #[test]
    fn ring_closure_with_bond_and_percent() {
        let mol = parse_smiles("C%10CCC%10.C%11.C%11", true).unwrap();
        assert_eq!(mol.bond_count(), 5);
        let mol = parse_smiles("C=1CCC1", false).unwrap();
        assert_eq!(bonds(&mol), vec![Bond::Single, Bond::Single, Bond::Single, Bond::Double]);
    }

    #[test]
    fn parse_errors() {
        assert_eq!(parse_smiles("", true).unwrap_err(), ParseSmilesError::Empty);
        assert_eq!(parse_smiles("C1CC", true).unwrap_err(), ParseSmilesError::UnclosedRing(1));
        assert_eq!(parse_smiles("C(C", true).unwrap_err(), ParseSmilesError::UnbalancedBranch);
        assert_eq!(parse_smiles("CC)", true).unwrap_err(), ParseSmilesError::UnbalancedBranch);
        assert_eq!(parse_smiles("C11", true).unwrap_err(), ParseSmilesError::Malformed);
        assert_eq!(parse_smiles("C=", true).unwrap_err(), ParseSmilesError::UnexpectedEnd);
        assert!(matches!(parse_smiles("[Xx]", true), Err(ParseSmilesError::UnknownElement(_))));
        assert!(matches!(parse_smiles("C?C", true), Err(ParseSmilesError::UnexpectedChar(1, '?'))));
    }

    #[test]
    fn write_chain_with_branch() {
        let mol = parse_smiles("CC(=O)N", false).unwrap();
        assert_eq!(write_pattern(mol.graph()), "[C]-[C](=[O])-[N]");
    }

    #[test]
    fn write_ring() {
        let mol = parse_smiles("c1ccccc1", true).unwrap();
        assert_eq!(write_pattern(mol.graph()), "[c]1:[c]:[c]:[c]:[c]:[c]:1");
    }

    #[test]
    fn written_pattern_parses_back() {
        let mol = parse_smiles("O=C1NC(=S)NC(=O)C1C(=O)NC2=CC=CC=C2", true).unwrap();
        let pattern = write_pattern(mol.graph());
        let back = parse_smiles(&pattern, false).unwrap();
        assert_eq!(back.atom_count(), mol.atom_count());
        assert_eq!(bonds(&back), bonds(&mol));
    }

    #[test]
    fn gspan_blocks() {
        let text = "t # 7\nv 0 6\nv 1 8\nv 2 1\ne 0 1 2\ne 0 2 1\n\n\
                    t # 9\nv 0 254\nv 1 254\ne 0 1 4\n";
        let graphs = parse_gspan(text).unwrap();
        assert_eq!(graphs.len(), 2);
        assert_eq!(graphs[0].0, 7);
        assert_eq!(graphs[0].1.atom_count(), 2);
        assert_eq!(graphs[0].1.bond_count(), 1);
        assert!(graphs[1].1.graph().node_weights().all(|a| a.is_aromatic()));
        assert_eq!(write_gspan(9, graphs[1].1.graph()), "t # 9\nv 0 254\nv 1 254\ne 0 1 4\n");
    }

    #[test]
    fn gspan_errors() {
        assert_eq!(parse_gspan("v 0 6\n").unwrap_err(), ParseGspanError::Orphan(1));
        assert_eq!(parse_gspan("t # 1\nv 1 6\n").unwrap_err(), ParseGspanError::VertexOrder(2));
        assert_eq!(
            parse_gspan("t # 1\nv 0 6\ne 0 3 1\n").unwrap_err(),
            ParseGspanError::Vertex(3, 3)
        );
        assert!(matches!(
            parse_gspan("t # 1\nv 0 6\nv 1 6\ne 0 1 7\n"),
            Err(ParseGspanError::BondLabel(4, _))
        ));
    }
}
