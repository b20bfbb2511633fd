//! Two phase tableau simplex solver that records every pivot it performs,
//! so callers can replay the solve step by step.

pub mod constraint;
pub mod error;
pub mod model;
pub mod simplex;
pub mod solver;
pub mod tableau;

pub use constraint::{Comp, Constraint};
pub use error::{SimplexError, SimplexResult};
pub use model::{ColumnKind, LinearProgram, OptDir, StandardForm};
pub use simplex::{Simplex, SimplexOptions, StepRecorder};
pub use solver::{PivotStep, SolutionResult, SolveAlgorithm, Status};
pub use tableau::{PivotChoice, Tableau, TableauIx};

pub fn solve(lp: &LinearProgram) -> SolutionResult {
    Simplex::new().solve(lp)
}
