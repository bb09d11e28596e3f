//! Mine molecular fragments whose occurrence is significantly associated with
//! compound activity, collapsed into backbone refinement classes (BBRC).
//!
//! ```
//! use bbrc_miner::{Session, Level};
//!
//! let mut session = Session::new();
//! session.set_level(Level::Paths).unwrap();
//! session.set_significance(0.0).unwrap();
//! for (id, smiles, activity) in [(1, "CCO", 1.0), (2, "CCO", 1.0), (3, "CCN", 0.0)] {
//!     session.add_compound(smiles, id).unwrap();
//!     session.add_activity(activity, id).unwrap();
//! }
//! let fragments = session.mine_root(0).unwrap();
//! assert!(fragments.iter().any(|f| f.pattern == "[C]-[O]"));
//! ```

// Molecule definition, atoms and bonds
pub mod molecule;

// Data IO: SMILES, gSpan, fragment patterns
pub mod loader;

// Minimum DFS codes
pub mod canonize;

// Compounds, activities, weights and the label alphabet
pub mod store;

// Embeddings and support counting
pub mod support;

// Statistical tests
pub mod significance;

// Pruning bounds
pub mod bounds;

// The hard bit: per-root enumeration
pub mod enumerate;

// Session lifecycle and settings
pub mod session;

// Record formatting
pub mod output;

pub mod error;

// Python library
#[cfg(feature = "python")]
pub mod python;

pub use bounds::Bound;
pub use enumerate::{FragmentRecord, Level};
pub use error::MiningError;
pub use output::OutputFormat;
pub use session::{Session, SessionState, Settings};
