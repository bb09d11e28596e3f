//! A mining session: configure, add compounds and activities, mine roots.
//!
//! The session is a small state machine. Settings may only change while it is
//! [`SessionState::Configuring`]; adding the first compound moves it to
//! [`SessionState::PopulatingData`]. The first mining call checks that the
//! data is complete, freezes it into a [`MiningContext`] and moves on to
//! [`SessionState::Mining`]. Once every root has been mined the session is
//! [`SessionState::Done`] until [`Session::reset`] brings it back to
//! configuring, with the settings kept.

use std::fmt::Display;

use bit_set::BitSet;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::{
    bounds::Bound,
    enumerate::{FragmentRecord, Level, Miner, MiningContext},
    error::MiningError,
    loader::parse_smiles,
    molecule::Molecule,
    output::{format_record, OutputFormat},
    store::CompoundStore,
};

/// Where a [`Session`] is in its lifecycle.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Configuring,
    PopulatingData,
    Mining,
    Done,
}

impl Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Configuring => "configuring",
            SessionState::PopulatingData => "populating data",
            SessionState::Mining => "mining",
            SessionState::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// Mining parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Minimum weighted support of an emitted fragment.
    pub min_frequency: f64,
    pub level: Level,
    /// Confidence level of the significance test; 0 disables the filter.
    pub significance: f64,
    /// Refine fragments that occur in a single compound.
    pub refine_singles: bool,
    /// Treat activities as continuous and use the KS test.
    pub regression: bool,
    /// Collapse fragments into backbone refinement classes.
    pub backbone: bool,
    /// Upper bounds used for pruning; empty disables pruning.
    pub bounds: Vec<Bound>,
    /// Largest number of bonds in a fragment.
    pub max_hops: Option<usize>,
    /// Perceive aromaticity when reading SMILES.
    pub aromatic: bool,
    /// Print every emitted fragment to stdout.
    pub console_out: bool,
    pub output: OutputFormat,
    /// Keep the backbone class of every fragment for grouped output.
    pub bbrc_sep: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_frequency: 2.0,
            level: Level::Trees,
            significance: 0.95,
            refine_singles: false,
            regression: false,
            backbone: true,
            bounds: vec![Bound::Significance, Bound::Dynamic],
            max_hops: None,
            aromatic: true,
            console_out: false,
            output: OutputFormat::Yaml,
            bbrc_sep: false,
        }
    }
}

impl Settings {
    /// Reject settings that cannot be mined with.
    pub fn validate(&self) -> Result<(), MiningError> {
        if !self.min_frequency.is_finite() || self.min_frequency < 1.0 {
            return Err(MiningError::InvalidSetting(format!(
                "minimum frequency {} must be a number of at least 1",
                self.min_frequency
            )));
        }
        if self.refine_singles && self.min_frequency > 1.0 {
            return Err(MiningError::InvalidSetting(format!(
                "minimum frequency {} cannot be used while refining singles",
                self.min_frequency
            )));
        }
        if !(0.0..=1.0).contains(&self.significance) {
            return Err(MiningError::InvalidSetting(format!(
                "significance level {} is not within [0, 1]",
                self.significance
            )));
        }
        if self.bounds.contains(&Bound::Dynamic) && !self.bounds.contains(&Bound::Significance) {
            return Err(MiningError::InvalidSetting(
                "the dynamic bound needs significance bound pruning".to_string(),
            ));
        }
        if self.max_hops == Some(0) {
            return Err(MiningError::InvalidSetting(
                "maximum hops must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of mining a single root.
pub type RootResult = Result<Vec<FragmentRecord>, MiningError>;

/// A mining session.
#[derive(Debug, Default)]
pub struct Session {
    settings: Settings,
    state: SessionState,
    store: CompoundStore,
    context: Option<MiningContext>,
    mined: BitSet,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Result<Self, MiningError> {
        settings.validate()?;
        Ok(Self {
            settings,
            ..Self::default()
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn store(&self) -> &CompoundStore {
        &self.store
    }

    fn expect_state(
        &self,
        operation: &'static str,
        allowed: &[SessionState],
    ) -> Result<(), MiningError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(MiningError::WrongState {
                operation,
                state: self.state,
            })
        }
    }

    /// Apply `change` to a copy of the settings and keep it if it validates.
    fn configure(
        &mut self,
        operation: &'static str,
        change: impl FnOnce(&mut Settings),
    ) -> Result<(), MiningError> {
        self.expect_state(operation, &[SessionState::Configuring])?;
        let mut settings = self.settings.clone();
        change(&mut settings);
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn set_min_frequency(&mut self, value: f64) -> Result<(), MiningError> {
        self.configure("set_min_frequency", |s| s.min_frequency = value)
    }

    pub fn set_level(&mut self, level: Level) -> Result<(), MiningError> {
        self.configure("set_level", |s| s.level = level)
    }

    pub fn set_significance(&mut self, value: f64) -> Result<(), MiningError> {
        self.configure("set_significance", |s| s.significance = value)
    }

    /// Refining singles forces the minimum frequency down to 1.
    pub fn set_refine_singles(&mut self, enabled: bool) -> Result<(), MiningError> {
        self.configure("set_refine_singles", |s| {
            if enabled && s.min_frequency != 1.0 {
                warn!(
                    min_frequency = s.min_frequency,
                    "refining singles, minimum frequency set to 1"
                );
                s.min_frequency = 1.0;
            }
            s.refine_singles = enabled;
        })
    }

    pub fn set_regression(&mut self, enabled: bool) -> Result<(), MiningError> {
        self.configure("set_regression", |s| s.regression = enabled)
    }

    pub fn set_backbone(&mut self, enabled: bool) -> Result<(), MiningError> {
        self.configure("set_backbone", |s| s.backbone = enabled)
    }

    pub fn set_bounds(&mut self, bounds: &[Bound]) -> Result<(), MiningError> {
        self.configure("set_bounds", |s| s.bounds = bounds.to_vec())
    }

    pub fn set_max_hops(&mut self, max_hops: Option<usize>) -> Result<(), MiningError> {
        self.configure("set_max_hops", |s| s.max_hops = max_hops)
    }

    pub fn set_aromatic(&mut self, enabled: bool) -> Result<(), MiningError> {
        self.configure("set_aromatic", |s| s.aromatic = enabled)
    }

    pub fn set_console_out(&mut self, enabled: bool) -> Result<(), MiningError> {
        self.configure("set_console_out", |s| s.console_out = enabled)
    }

    pub fn set_output_format(&mut self, format: OutputFormat) -> Result<(), MiningError> {
        self.configure("set_output_format", |s| s.output = format)
    }

    pub fn set_bbrc_sep(&mut self, enabled: bool) -> Result<(), MiningError> {
        self.configure("set_bbrc_sep", |s| s.bbrc_sep = enabled)
    }

    /// Register the compound with SMILES `smiles` under `id`.
    pub fn add_compound(&mut self, smiles: &str, id: u64) -> Result<(), MiningError> {
        self.expect_state(
            "add_compound",
            &[SessionState::Configuring, SessionState::PopulatingData],
        )?;
        let molecule = parse_smiles(smiles, self.settings.aromatic).map_err(|source| {
            MiningError::MalformedStructure {
                id,
                pattern: smiles.to_string(),
                source,
            }
        })?;
        self.add_molecule(molecule, id)
    }

    /// Register an already-built molecule under `id`.
    pub fn add_molecule(&mut self, molecule: Molecule, id: u64) -> Result<(), MiningError> {
        self.expect_state(
            "add_molecule",
            &[SessionState::Configuring, SessionState::PopulatingData],
        )?;
        if molecule.is_malformed() {
            return Err(MiningError::MalformedGraph(id));
        }
        self.store.insert(id, molecule)?;
        self.state = SessionState::PopulatingData;
        Ok(())
    }

    pub fn add_activity(&mut self, value: f64, id: u64) -> Result<(), MiningError> {
        self.expect_state(
            "add_activity",
            &[SessionState::Configuring, SessionState::PopulatingData],
        )?;
        self.store.set_activity(id, value)
    }

    pub fn add_weight(&mut self, value: f64, id: u64) -> Result<(), MiningError> {
        self.expect_state(
            "add_weight",
            &[SessionState::Configuring, SessionState::PopulatingData],
        )?;
        self.store.set_weight(id, value)
    }

    pub fn compound_count(&self) -> usize {
        self.store.len()
    }

    /// Number of roots, i.e. distinct atom types over all compounds.
    pub fn root_count(&self) -> usize {
        self.store.label_count()
    }

    /// Freeze the data on the first mining call.
    fn prepare(&mut self, operation: &'static str) -> Result<(), MiningError> {
        match self.state {
            SessionState::Configuring | SessionState::PopulatingData => {
                let context = MiningContext::new(&self.store, &self.settings)?;
                self.context = Some(context);
                self.mined = BitSet::with_capacity(self.root_count());
                self.state = SessionState::Mining;
                Ok(())
            }
            SessionState::Mining => Ok(()),
            SessionState::Done => Err(MiningError::WrongState {
                operation,
                state: self.state,
            }),
        }
    }

    fn finish_if_complete(&mut self) {
        if self.mined.len() == self.root_count() {
            info!(roots = self.root_count(), "all roots mined");
            self.state = SessionState::Done;
        }
    }

    fn print(&self, records: &[FragmentRecord]) {
        if self.settings.console_out {
            for record in records {
                println!("{}", format_record(record, self.settings.output));
            }
        }
    }

    /// Mine the fragments of root `index`. Every root can be mined once.
    pub fn mine_root(&mut self, index: usize) -> RootResult {
        self.prepare("mine_root")?;
        if index >= self.root_count() {
            return Err(MiningError::RootOutOfRange {
                index,
                count: self.root_count(),
            });
        }
        if self.mined.contains(index) {
            return Err(MiningError::RootAlreadyMined(index));
        }
        let context = self
            .context
            .as_ref()
            .ok_or_else(|| MiningError::Internal("mining context missing".to_string()))?;
        let result = Miner::new(&self.store, context).mine_root(index);
        self.mined.insert(index);
        self.finish_if_complete();
        if let Ok(records) = &result {
            self.print(records);
        }
        result
    }

    /// Mine every root not mined yet, in parallel. Results are indexed by root;
    /// roots mined earlier get an empty list.
    pub fn mine_all(&mut self) -> Result<Vec<RootResult>, MiningError> {
        self.prepare("mine_all")?;
        let context = self
            .context
            .as_ref()
            .ok_or_else(|| MiningError::Internal("mining context missing".to_string()))?;
        let miner = Miner::new(&self.store, context);
        let mined = &self.mined;
        let results: Vec<RootResult> = (0..self.store.label_count())
            .into_par_iter()
            .map(|root| {
                if mined.contains(root) {
                    Ok(Vec::new())
                } else {
                    miner.mine_root(root)
                }
            })
            .collect();
        for root in 0..self.root_count() {
            self.mined.insert(root);
        }
        self.finish_if_complete();
        for records in results.iter().flatten() {
            self.print(records);
        }
        Ok(results)
    }

    /// Drop all compounds and results, keeping the settings.
    pub fn reset(&mut self) {
        self.store.clear();
        self.context = None;
        self.mined.clear();
        self.state = SessionState::Configuring;
    }
}
