//! Graph-theoretic representation of a compound.
//!
//! Compounds are simple, undirected graphs with typed [`Atom`]s as nodes and
//! typed [`Bond`]s as edges. Besides element and bond types, a [`Molecule`]
//! records which atoms and bonds lie on a ring; ring membership drives
//! aromaticity perception and is computed once, when the molecule is built.

use std::{
    collections::{HashSet, VecDeque},
    fmt::Display,
    str::FromStr,
};

use bit_set::BitSet;
use petgraph::{
    graph::{EdgeIndex, Graph, NodeIndex},
    visit::EdgeRef,
    Undirected,
};

/// Index type of [`MGraph`] nodes and edges.
pub type Index = u32;

/// The graph type underlying every [`Molecule`].
pub type MGraph = Graph<Atom, Bond, Undirected, Index>;

/// Thrown by [`Element::from_str`] if the string does not represent a valid
/// chemical element.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParseElementError;

impl Display for ParseElementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "not a chemical element symbol")
    }
}

impl std::error::Error for ParseElementError {}

macro_rules! periodic_table {
    ( $(($element:ident, $name:literal, $number:literal),)* ) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        /// Represents a chemical element.
        pub enum Element {
            $( $element, )*
        }

        impl Element {
            /// Return this element's symbol, e.g. `"Cl"`.
            pub fn symbol(&self) -> &'static str {
                match &self {
                    $( Element::$element => $name, )*
                }
            }

            /// Return this element's atomic number.
            pub fn atomic_number(&self) -> u8 {
                match &self {
                    $( Element::$element => $number, )*
                }
            }

            /// Look an element up by atomic number.
            pub fn from_atomic_number(number: u8) -> Option<Self> {
                match number {
                    $( $number => Some(Element::$element), )*
                    _ => None,
                }
            }
        }

        impl Display for Element {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.symbol())
            }
        }

        impl FromStr for Element {
            type Err = ParseElementError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $name => Ok(Element::$element), )*
                    _ => Err(ParseElementError),
                }
            }
        }
    };
}

periodic_table!(
    (Hydrogen, "H", 1),
    (Helium, "He", 2),
    (Lithium, "Li", 3),
    (Beryllium, "Be", 4),
    (Boron, "B", 5),
    (Carbon, "C", 6),
    (Nitrogen, "N", 7),
    (Oxygen, "O", 8),
    (Fluorine, "F", 9),
    (Neon, "Ne", 10),
    (Sodium, "Na", 11),
    (Magnesium, "Mg", 12),
    (Aluminum, "Al", 13),
    (Silicon, "Si", 14),
    (Phosphorus, "P", 15),
    (Sulfur, "S", 16),
    (Chlorine, "Cl", 17),
    (Argon, "Ar", 18),
    (Potassium, "K", 19),
    (Calcium, "Ca", 20),
    (Scandium, "Sc", 21),
    (Titanium, "Ti", 22),
    (Vanadium, "V", 23),
    (Chromium, "Cr", 24),
    (Manganese, "Mn", 25),
    (Iron, "Fe", 26),
    (Cobalt, "Co", 27),
    (Nickel, "Ni", 28),
    (Copper, "Cu", 29),
    (Zinc, "Zn", 30),
    (Gallium, "Ga", 31),
    (Germanium, "Ge", 32),
    (Arsenic, "As", 33),
    (Selenium, "Se", 34),
    (Bromine, "Br", 35),
    (Krypton, "Kr", 36),
    (Rubidium, "Rb", 37),
    (Strontium, "Sr", 38),
    (Yttrium, "Y", 39),
    (Zirconium, "Zr", 40),
    (Niobium, "Nb", 41),
    (Molybdenum, "Mo", 42),
    (Technetium, "Tc", 43),
    (Ruthenium, "Ru", 44),
    (Rhodium, "Rh", 45),
    (Palladium, "Pd", 46),
    (Silver, "Ag", 47),
    (Cadmium, "Cd", 48),
    (Indium, "In", 49),
    (Tin, "Sn", 50),
    (Antimony, "Sb", 51),
    (Tellurium, "Te", 52),
    (Iodine, "I", 53),
    (Xenon, "Xe", 54),
    (Cesium, "Cs", 55),
    (Barium, "Ba", 56),
    (Lanthanum, "La", 57),
    (Cerium, "Ce", 58),
    (Praseodymium, "Pr", 59),
    (Neodymium, "Nd", 60),
    (Promethium, "Pm", 61),
    (Samarium, "Sm", 62),
    (Europium, "Eu", 63),
    (Gadolinium, "Gd", 64),
    (Terbium, "Tb", 65),
    (Dysprosium, "Dy", 66),
    (Holmium, "Ho", 67),
    (Erbium, "Er", 68),
    (Thulium, "Tm", 69),
    (Ytterbium, "Yb", 70),
    (Lutetium, "Lu", 71),
    (Hafnium, "Hf", 72),
    (Tantalum, "Ta", 73),
    (Wolfram, "W", 74),
    (Rhenium, "Re", 75),
    (Osmium, "Os", 76),
    (Iridium, "Ir", 77),
    (Platinum, "Pt", 78),
    (Gold, "Au", 79),
    (Mercury, "Hg", 80),
    (Thallium, "Tl", 81),
    (Lead, "Pb", 82),
    (Bismuth, "Bi", 83),
    (Polonium, "Po", 84),
    (Astatine, "At", 85),
    (Radon, "Rn", 86),
    (Francium, "Fr", 87),
    (Radium, "Ra", 88),
    (Actinium, "Ac", 89),
    (Thorium, "Th", 90),
    (Protactinium, "Pa", 91),
    (Uranium, "U", 92),
    (Neptunium, "Np", 93),
    (Plutonium, "Pu", 94),
    (Americium, "Am", 95),
    (Curium, "Cm", 96),
    (Berkelium, "Bk", 97),
    (Californium, "Cf", 98),
    (Einsteinium, "Es", 99),
    (Fermium, "Fm", 100),
    (Mendelevium, "Md", 101),
    (Nobelium, "No", 102),
    (Lawrencium, "Lr", 103),
    (Rutherfordium, "Rf", 104),
    (Dubnium, "Db", 105),
    (Seaborgium, "Sg", 106),
    (Bohrium, "Bh", 107),
    (Hassium, "Hs", 108),
    (Meitnerium, "Mt", 109),
    (Darmstadtium, "Ds", 110),
    (Roentgenium, "Rg", 111),
    (Copernicium, "Cn", 112),
    (Nihonium, "Nh", 113),
    (Flerovium, "Fl", 114),
    (Moscovium, "Mc", 115),
    (Livermorium, "Lv", 116),
    (Tennessine, "Ts", 117),
    (Oganesson, "Og", 118),);

/// The nodes of a [`Molecule`] graph.
///
/// An atom is its element plus an aromaticity flag; with aromaticity
/// perception enabled, aromatic carbon and aliphatic carbon are different
/// atom types for mining purposes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Atom {
    element: Element,
    aromatic: bool,
}

impl Atom {
    /// Construct an [`Atom`] of type `element`.
    pub fn new(element: Element, aromatic: bool) -> Self {
        Self { element, aromatic }
    }

    /// Return this [`Atom`]'s element.
    pub fn element(&self) -> Element {
        self.element
    }

    /// Return `true` iff this atom is part of an aromatic system.
    pub fn is_aromatic(&self) -> bool {
        self.aromatic
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.aromatic {
            write!(f, "{}", self.element.symbol().to_lowercase())
        } else {
            write!(f, "{}", self.element.symbol())
        }
    }
}

/// The edges of a [`Molecule`] graph.
///
/// Variant order is the order bonds take in canonical codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bond {
    Single,
    Double,
    Triple,
    Aromatic,
}

impl Bond {
    /// The SMILES/SMARTS symbol of this bond.
    pub fn symbol(&self) -> char {
        match self {
            Bond::Single => '-',
            Bond::Double => '=',
            Bond::Triple => '#',
            Bond::Aromatic => ':',
        }
    }

    /// The numeric bond label used by gSpan files (aromatic is `4`).
    pub fn label(&self) -> usize {
        match self {
            Bond::Single => 1,
            Bond::Double => 2,
            Bond::Triple => 3,
            Bond::Aromatic => 4,
        }
    }
}

/// Thrown by [`Bond::try_from`] when given anything other than 1, 2, 3 or 4.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParseBondError;

impl Display for ParseBondError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bond label must be 1, 2, 3 or 4")
    }
}

impl std::error::Error for ParseBondError {}

impl TryFrom<usize> for Bond {
    type Error = ParseBondError;
    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Bond::Single),
            2 => Ok(Bond::Double),
            3 => Ok(Bond::Triple),
            4 => Ok(Bond::Aromatic),
            _ => Err(ParseBondError),
        }
    }
}

/// A simple, loopless graph with [`Atom`]s as nodes and [`Bond`]s as edges.
///
/// Molecules never contain hydrogen atoms; codecs drop them while parsing.
#[derive(Debug, Clone)]
pub struct Molecule {
    graph: MGraph,
    ring_bonds: BitSet,
    ring_atoms: BitSet,
}

impl Molecule {
    /// Construct a [`Molecule`] from an existing `MGraph`, computing ring
    /// membership of its atoms and bonds.
    pub fn from_graph(graph: MGraph) -> Self {
        let mut mol = Self {
            graph,
            ring_bonds: BitSet::new(),
            ring_atoms: BitSet::new(),
        };
        mol.update_rings();
        mol
    }

    /// Return a representation of this molecule as an `MGraph`.
    pub fn graph(&self) -> &MGraph {
        &self.graph
    }

    /// Number of (heavy) atoms.
    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of bonds.
    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Return `true` iff this molecule contains self-loops or multiple edges
    /// between any pair of nodes.
    pub fn is_malformed(&self) -> bool {
        let mut uniq = HashSet::new();
        !self.graph.edge_indices().all(|ix| {
            self.graph
                .edge_endpoints(ix)
                .is_some_and(|(src, dst)| src != dst && uniq.insert((src.min(dst), src.max(dst))))
        })
    }

    /// Return `true` iff `node` lies on a ring.
    pub fn in_ring(&self, node: NodeIndex<Index>) -> bool {
        self.ring_atoms.contains(node.index())
    }

    /// Return `true` iff `edge` lies on a ring.
    pub fn is_ring_bond(&self, edge: EdgeIndex<Index>) -> bool {
        self.ring_bonds.contains(edge.index())
    }

    /// Number of atoms lying on at least one ring.
    pub fn ring_atom_count(&self) -> usize {
        self.ring_atoms.len()
    }

    fn update_rings(&mut self) {
        self.ring_bonds.clear();
        self.ring_atoms.clear();
        for e in self.graph.edge_indices() {
            if self.smallest_ring_through(e).is_some() {
                self.ring_bonds.insert(e.index());
                if let Some((src, dst)) = self.graph.edge_endpoints(e) {
                    self.ring_atoms.insert(src.index());
                    self.ring_atoms.insert(dst.index());
                }
            }
        }
    }

    /// Return the bonds of a smallest ring through `edge`, or `None` if `edge`
    /// is a bridge.
    fn smallest_ring_through(&self, edge: EdgeIndex<Index>) -> Option<Vec<EdgeIndex<Index>>> {
        let (src, dst) = self.graph.edge_endpoints(edge)?;

        // Breadth-first search from src to dst that never uses `edge` itself.
        let mut parent: Vec<Option<EdgeIndex<Index>>> = vec![None; self.graph.node_count()];
        let mut seen = BitSet::with_capacity(self.graph.node_count());
        let mut queue = VecDeque::from([src]);
        seen.insert(src.index());
        while let Some(n) = queue.pop_front() {
            if n == dst {
                break;
            }
            for e in self.graph.edges(n) {
                let m = if e.source() == n { e.target() } else { e.source() };
                if e.id() == edge || !seen.insert(m.index()) {
                    continue;
                }
                parent[m.index()] = Some(e.id());
                queue.push_back(m);
            }
        }
        if !seen.contains(dst.index()) {
            return None;
        }

        // Walk back from dst to src.
        let mut ring = vec![edge];
        let mut cur = dst;
        while cur != src {
            let e = parent[cur.index()]?;
            ring.push(e);
            let (a, b) = self.graph.edge_endpoints(e)?;
            cur = if a == cur { b } else { a };
        }
        Some(ring)
    }

    /// Perceive aromatic rings written in Kekulé form.
    ///
    /// Every smallest ring of five to seven atoms is tested with a Hückel
    /// count: an atom contributes one electron if it carries a double ring
    /// bond, two if it is a N, P, O, S or Se lone-pair donor, and none if it
    /// carries an exocyclic double bond; any other atom disqualifies the
    /// ring. Rings totalling 4n+2 electrons become aromatic. Rings already
    /// written with aromatic atoms are left untouched.
    pub fn perceive_aromaticity(&mut self) {
        let mut rings = Vec::new();
        let mut uniq = HashSet::new();
        for e in self.graph.edge_indices() {
            if !self.is_ring_bond(e) {
                continue;
            }
            if let Some(ring) = self.smallest_ring_through(e) {
                let mut key: Vec<usize> = ring.iter().map(|ix| ix.index()).collect();
                key.sort_unstable();
                if uniq.insert(key) {
                    rings.push(ring);
                }
            }
        }

        let mut aromatic_bonds = BitSet::new();
        let mut aromatic_atoms = BitSet::new();
        'rings: for ring in rings {
            if !(5..=7).contains(&ring.len()) {
                continue;
            }
            let mut atoms = BitSet::new();
            for e in &ring {
                if let Some((src, dst)) = self.graph.edge_endpoints(*e) {
                    atoms.insert(src.index());
                    atoms.insert(dst.index());
                }
            }
            let mut electrons = 0;
            for a in atoms.iter() {
                match self.pi_electrons(NodeIndex::new(a)) {
                    Some(n) => electrons += n,
                    None => continue 'rings,
                }
            }
            if electrons % 4 == 2 {
                aromatic_bonds.extend(ring.iter().map(|e| e.index()));
                aromatic_atoms.union_with(&atoms);
            }
        }

        for e in aromatic_bonds.iter() {
            if let Some(w) = self.graph.edge_weight_mut(EdgeIndex::new(e)) {
                *w = Bond::Aromatic;
            }
        }
        for a in aromatic_atoms.iter() {
            if let Some(w) = self.graph.node_weight_mut(NodeIndex::new(a)) {
                w.aromatic = true;
            }
        }
    }

    fn pi_electrons(&self, node: NodeIndex<Index>) -> Option<u32> {
        let atom = self.graph.node_weight(node)?;
        if atom.is_aromatic() {
            return None;
        }
        let mut exocyclic_double = false;
        for e in self.graph.edges(node) {
            match e.weight() {
                Bond::Double if self.is_ring_bond(e.id()) => return Some(1),
                Bond::Double => exocyclic_double = true,
                Bond::Triple | Bond::Aromatic => return None,
                Bond::Single => (),
            }
        }
        if exocyclic_double {
            return Some(0);
        }
        let degree = self.graph.edges(node).count();
        match atom.element() {
            Element::Nitrogen | Element::Phosphorus if degree <= 3 => Some(2),
            Element::Oxygen | Element::Sulfur | Element::Selenium if degree <= 2 => Some(2),
            _ => None,
        }
    }
}
