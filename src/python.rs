use pyo3::{exceptions::PyValueError, prelude::*};

use crate::{
    bounds,
    enumerate::Level,
    error::MiningError,
    output::{format_record, OutputFormat},
    session::Session,
};

impl From<MiningError> for PyErr {
    fn from(err: MiningError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

fn level(name: &str) -> PyResult<Level> {
    match name {
        "paths" => Ok(Level::Paths),
        "trees" => Ok(Level::Trees),
        "graphs" => Ok(Level::Graphs),
        _ => Err(PyValueError::new_err(format!("unknown level {name:?}"))),
    }
}

/// A mining session. Fragments come back as YAML lines.
#[pyclass(name = "Session")]
struct PySession {
    inner: Session,
}

#[pymethods]
impl PySession {
    #[new]
    fn new() -> Self {
        Self {
            inner: Session::new(),
        }
    }

    fn set_min_frequency(&mut self, value: f64) -> PyResult<()> {
        Ok(self.inner.set_min_frequency(value)?)
    }

    fn set_level(&mut self, name: &str) -> PyResult<()> {
        Ok(self.inner.set_level(level(name)?)?)
    }

    fn set_significance(&mut self, value: f64) -> PyResult<()> {
        Ok(self.inner.set_significance(value)?)
    }

    fn set_refine_singles(&mut self, enabled: bool) -> PyResult<()> {
        Ok(self.inner.set_refine_singles(enabled)?)
    }

    fn set_regression(&mut self, enabled: bool) -> PyResult<()> {
        Ok(self.inner.set_regression(enabled)?)
    }

    fn set_backbone(&mut self, enabled: bool) -> PyResult<()> {
        Ok(self.inner.set_backbone(enabled)?)
    }

    #[pyo3(signature = (pruning = true, dynamic = true))]
    fn set_bounds(&mut self, pruning: bool, dynamic: bool) -> PyResult<()> {
        let mut chosen = Vec::new();
        if pruning {
            chosen.push(bounds::Bound::Significance);
            if dynamic {
                chosen.push(bounds::Bound::Dynamic);
            }
        }
        Ok(self.inner.set_bounds(&chosen)?)
    }

    #[pyo3(signature = (max_hops = None))]
    fn set_max_hops(&mut self, max_hops: Option<usize>) -> PyResult<()> {
        Ok(self.inner.set_max_hops(max_hops)?)
    }

    fn set_aromatic(&mut self, enabled: bool) -> PyResult<()> {
        Ok(self.inner.set_aromatic(enabled)?)
    }

    fn add_compound(&mut self, smiles: &str, id: u64) -> PyResult<()> {
        Ok(self.inner.add_compound(smiles, id)?)
    }

    fn add_activity(&mut self, value: f64, id: u64) -> PyResult<()> {
        Ok(self.inner.add_activity(value, id)?)
    }

    fn add_weight(&mut self, value: f64, id: u64) -> PyResult<()> {
        Ok(self.inner.add_weight(value, id)?)
    }

    fn compound_count(&self) -> usize {
        self.inner.compound_count()
    }

    fn root_count(&self) -> usize {
        self.inner.root_count()
    }

    fn mine_root(&mut self, index: usize) -> PyResult<Vec<String>> {
        let records = self.inner.mine_root(index)?;
        Ok(records
            .iter()
            .map(|r| format_record(r, OutputFormat::Yaml))
            .collect())
    }

    fn reset(&mut self) {
        self.inner.reset()
    }
}

/// A Python module implemented in Rust. The name of this function must match
/// the `lib.name` setting in the `Cargo.toml`, else Python will not be able to
/// import the module.
#[pymodule]
fn bbrc_miner(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySession>()?;
    Ok(())
}
