use numpy::{PyArray1, PyArrayMethods};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::config::{Method, SimulationRequest};
use crate::flow::FlowCytometry;
use crate::layout::Trajectory;
use crate::progress::NoProgress;
use crate::simulate::{run_flow_snapshot, run_time_series};
use crate::{SimError, SimResult};

impl From<SimError> for PyErr {
    fn from(err: SimError) -> Self {
        PyValueError::new_err(err.to_string())
    }
}

fn parse_request(request_json: &str) -> Result<SimulationRequest, SimError> {
    serde_json::from_str(request_json)
        .map_err(|err| SimError::InvalidArgument(format!("malformed simulation request: {err}")))
}

/// Returns `(time, states)` with `states` shaped `(steps, state_dim)`.
#[pyfunction(signature = (request_json, method=None))]
pub fn simulate_time_series(
    py: Python<'_>,
    request_json: &str,
    method: Option<&str>,
) -> PyResult<Py<PyAny>> {
    let request = parse_request(request_json)?;
    let method = match method {
        Some(name) => name.parse::<Method>()?,
        None => request.params.method,
    };
    let trajectory = py.detach(move || -> SimResult<Trajectory> {
        let circuit = request.circuit()?;
        run_time_series(&circuit, &request.params, method, &mut NoProgress)
    })?;
    let rows = trajectory.n_steps();
    let dim = trajectory.dim;
    let time = PyArray1::from_vec(py, trajectory.time);
    let states = PyArray1::from_vec(py, trajectory.states).reshape([rows, dim])?;
    Ok((time, states).into_pyobject(py)?.into_any().unbind())
}

/// Returns a dict mapping protein label to its final counts across runs.
#[pyfunction(signature = (request_json, n_threads=None))]
pub fn simulate_flow(
    py: Python<'_>,
    request_json: &str,
    n_threads: Option<usize>,
) -> PyResult<Py<PyAny>> {
    let mut request = parse_request(request_json)?;
    if n_threads.is_some() {
        request.params.n_threads = n_threads;
    }
    let snapshot = py.detach(move || -> SimResult<FlowCytometry> {
        let circuit = request.circuit()?;
        run_flow_snapshot(&circuit, &request.params, &mut NoProgress)
    })?;
    let out = PyDict::new(py);
    for protein in snapshot.proteins {
        out.set_item(protein.label, PyArray1::from_vec(py, protein.values))?;
    }
    Ok(out.into_any().unbind())
}

#[pymodule]
fn circuitsim(_py: Python<'_>, module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_function(wrap_pyfunction!(simulate_time_series, module)?)?;
    module.add_function(wrap_pyfunction!(simulate_flow, module)?)?;
    Ok(())
}
