use indexmap::IndexMap;
use ndarray::Array2;
use serde::{Serialize, Serializer};

use crate::error::{SimplexError, SimplexResult};
use crate::model::{ColumnKind, LinearProgram};
use crate::tableau::{Tableau, TableauIx};

pub trait SolveAlgorithm {
    fn solve(&self, lp: &LinearProgram) -> SolutionResult;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Optimal,
    Infeasible,
    Unbounded,
    Error,
}

impl From<&SimplexError> for Status {
    fn from(err: &SimplexError) -> Self {
        match err {
            SimplexError::Infeasible { .. } => Status::Infeasible,
            SimplexError::Unbounded { .. } => Status::Unbounded,
            SimplexError::Validation(_) | SimplexError::IterationLimitExceeded { .. } => {
                Status::Error
            }
        }
    }
}

//row-major number[][]
fn serialize_matrix<S: Serializer>(m: &Array2<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(m.rows().into_iter().map(|row| row.to_vec()))
}

/// Tableau as it looked when the pivot at (`pivot_row_index`, `pivot_col_index`)
/// was chosen. Both indices are absent on the step that ends a phase's pivot
/// loop (optimal or unbounded). Phase 1 steps recorded after that one are the
/// pivots that swap zero level artificials out of the basis.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotStep {
    pub step: usize,
    pub phase: u8,
    #[serde(serialize_with = "serialize_matrix")]
    pub tableau: Array2<f64>,
    pub pivot_row_index: Option<usize>,
    pub pivot_col_index: Option<usize>,
}

impl PivotStep {
    pub fn pivot(&self) -> Option<TableauIx> {
        match (self.pivot_row_index, self.pivot_col_index) {
            (Some(i), Some(j)) => Some(TableauIx::new(i, j)),
            _ => None,
        }
    }

    //objective row rhs, in the internal maximization sense
    pub fn objective_value(&self) -> f64 {
        let (m, n) = self.tableau.dim();
        self.tableau[[m - 1, n - 1]]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionResult {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution_values: Option<IndexMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimal_value: Option<f64>,
    pub pivot_steps: Vec<PivotStep>,
    #[serde(serialize_with = "serialize_matrix")]
    pub final_tableau: Array2<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub iterations: usize,
    #[serde(skip)]
    pub error: Option<SimplexError>,
}

impl SolutionResult {
    /// Reads decision values and the objective out of an optimal tableau.
    pub fn extract(
        tableau: &Tableau,
        flipped_obj_fn: bool,
        pivot_steps: Vec<PivotStep>,
        iterations: usize,
    ) -> Self {
        let mut decision_cols = tableau
            .columns()
            .iter()
            .enumerate()
            .filter_map(|(j, kind)| match kind {
                ColumnKind::Decision(i) => Some((*i, j)),
                _ => None,
            })
            .collect::<Vec<(usize, usize)>>();
        decision_cols.sort();

        let mut solution_values = IndexMap::with_capacity(decision_cols.len());
        for (i, col) in decision_cols {
            //non-basic variables sit at zero
            let value = tableau
                .basis()
                .iter()
                .position(|&b| b == col)
                .map(|row| tableau.rhs(row))
                .unwrap_or(0.0_f64);
            solution_values.insert(format!("x{}", i + 1), value);
        }

        let mut obj_fn_val = tableau.objective_value();
        if flipped_obj_fn {
            obj_fn_val *= -1.0_f64;
        }
        //avoid reporting -0
        if obj_fn_val == 0.0_f64 {
            obj_fn_val = 0.0_f64;
        }

        Self {
            status: Status::Optimal,
            solution_values: Some(solution_values),
            optimal_value: Some(obj_fn_val),
            pivot_steps,
            final_tableau: tableau.snapshot(),
            message: None,
            iterations,
            error: None,
        }
    }

    pub fn from_error(
        err: SimplexError,
        pivot_steps: Vec<PivotStep>,
        final_tableau: Option<Array2<f64>>,
        iterations: usize,
    ) -> Self {
        Self {
            status: Status::from(&err),
            solution_values: None,
            optimal_value: None,
            pivot_steps,
            final_tableau: final_tableau.unwrap_or_else(|| Array2::zeros((0, 0))),
            message: Some(err.to_string()),
            iterations,
            error: Some(err),
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == Status::Optimal
    }

    pub fn var_value(&self, name: &str) -> Option<f64> {
        self.solution_values.as_ref()?.get(name).copied()
    }

    //decision values in x1..xN order
    pub fn values(&self) -> Vec<f64> {
        self.solution_values
            .as_ref()
            .map(|vals| vals.values().copied().collect())
            .unwrap_or_default()
    }

    pub fn into_result(self) -> SimplexResult<Self> {
        match self.error.clone() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}
