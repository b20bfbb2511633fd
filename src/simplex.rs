use ndarray::Array1;

use crate::error::{SimplexError, SimplexResult};
use crate::model::{LinearProgram, StandardForm};
use crate::solver::{PivotStep, SolutionResult, SolveAlgorithm};
use crate::tableau::{PivotChoice, Tableau, TableauIx};

/// Tuning knobs for [`Simplex`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplexOptions {
    /// Entries within `tol` of zero are treated as zero during pivot selection.
    pub tol: f64,
    /// Largest artificial sum still accepted as feasible after phase one.
    pub feasibility_tol: f64,
    /// Pivot budget over both phases, `None` uses `10 * (rows + columns)`.
    pub max_iter: Option<usize>,
}

impl Default for SimplexOptions {
    fn default() -> Self {
        Self {
            tol: 1e-9,
            feasibility_tol: 1e-7,
            max_iter: None,
        }
    }
}

/// Appends a copy of the tableau for every decision the engine makes.
#[derive(Debug, Default)]
pub struct StepRecorder {
    steps: Vec<PivotStep>,
}

impl StepRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, phase: u8, tableau: &Tableau, pivot: Option<TableauIx>) {
        self.steps.push(PivotStep {
            step: self.steps.len(),
            phase,
            tableau: tableau.snapshot(),
            pivot_row_index: pivot.map(|ix| ix.i()),
            pivot_col_index: pivot.map(|ix| ix.j()),
        });
    }

    pub fn into_steps(self) -> Vec<PivotStep> {
        self.steps
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum PhaseState {
    Phase1,
    Phase2,
    Done,
}

//per-solve working state, dropped once the result is built
struct SimplexRun {
    std: StandardForm,
    tableau: Tableau,
    recorder: StepRecorder,
    iterations: usize,
    max_iter: usize,
    options: SimplexOptions,
}

impl SimplexRun {
    fn new(std: StandardForm, options: SimplexOptions) -> Self {
        let tableau = std.as_tableau();
        let max_iter = options
            .max_iter
            .unwrap_or(10 * (std.n_rows() + std.n_cols()));
        Self {
            std,
            tableau,
            recorder: StepRecorder::new(),
            iterations: 0,
            max_iter,
            options,
        }
    }

    //pivot until the current objective is optimal or unbounded
    fn _solve(&mut self, phase: u8) -> SimplexResult<()> {
        let tol = self.options.tol;
        loop {
            match self.tableau.pivot_ind(tol) {
                PivotChoice::Optimal => {
                    self.recorder.record(phase, &self.tableau, None);
                    log::debug!(
                        "phase {} optimal after {} pivots, objective {}",
                        phase,
                        self.iterations,
                        self.tableau.objective_value()
                    );
                    return Ok(());
                }
                PivotChoice::Unbounded(column) => {
                    self.recorder.record(phase, &self.tableau, None);
                    return Err(SimplexError::Unbounded { column });
                }
                PivotChoice::Pivot(ix) => {
                    if self.iterations >= self.max_iter {
                        return Err(SimplexError::IterationLimitExceeded {
                            iterations: self.iterations,
                        });
                    }
                    self.pivot(phase, ix);
                }
            }
        }
    }

    fn pivot(&mut self, phase: u8, ix: TableauIx) {
        log::debug!(
            "phase {} pivot {}: {} enters, {} leaves (row {}, col {})",
            phase,
            self.iterations,
            self.tableau.columns()[ix.j()].label(),
            self.tableau.columns()[self.tableau.basis()[ix.i()]].label(),
            ix.i(),
            ix.j()
        );
        self.recorder.record(phase, &self.tableau, Some(ix));
        self.tableau.pivot(&ix, self.options.tol);
        self.iterations += 1;
        log::trace!("\n{}", self.tableau);
        debug_assert!(self.tableau.is_canonical(self.options.tol.sqrt()));
    }

    fn phase1(&mut self) -> SimplexResult<()> {
        log::info!(
            "phase 1: {} artificial variables",
            self.std.artificial_cols().len()
        );

        //maximize the negated artificial sum
        let mut costs = Array1::<f64>::zeros(self.std.n_cols());
        for j in self.std.artificial_cols() {
            costs[j] = -1.0_f64;
        }
        self.tableau.set_objective(&costs);
        self._solve(1)?;

        let residual = -self.tableau.objective_value();
        if residual > self.options.feasibility_tol {
            log::info!("phase 1 ended with artificial sum {}, infeasible", residual);
            return Err(SimplexError::Infeasible { residual });
        }
        Ok(())
    }

    //swap zero level artificials out of the basis, drop rows that cannot be
    //swapped, then drop the artificial columns
    fn transition(&mut self) -> SimplexResult<()> {
        let tol = self.options.tol;
        let mut i = 0;
        while i < self.tableau.n_rows() {
            if !self.tableau.columns()[self.tableau.basis()[i]].is_artificial() {
                i += 1;
                continue;
            }
            match self.tableau.replacement_col(i, tol) {
                Some(j) => {
                    if self.iterations >= self.max_iter {
                        return Err(SimplexError::IterationLimitExceeded {
                            iterations: self.iterations,
                        });
                    }
                    self.pivot(1, TableauIx::new(i, j));
                    i += 1;
                }
                None => {
                    log::warn!("constraint row {} is redundant, removing it", i);
                    self.tableau.remove_row(i);
                }
            }
        }

        let col_mask = self
            .tableau
            .columns()
            .iter()
            .map(|kind| !kind.is_artificial())
            .collect::<Vec<bool>>();
        self.tableau.filter_cols(&col_mask);
        Ok(())
    }

    fn phase2(&mut self) -> SimplexResult<()> {
        //real costs for the columns that survived the transition
        let costs = self
            .tableau
            .columns()
            .iter()
            .map(|kind| {
                self.std
                    .columns
                    .iter()
                    .position(|k| k == kind)
                    .map(|j| self.std.c[j])
                    .unwrap_or(0.0_f64)
            })
            .collect::<Array1<f64>>();
        log::info!(
            "phase 2: {} rows, {} columns",
            self.tableau.n_rows(),
            self.tableau.n_cols()
        );
        self.tableau.set_objective(&costs);
        self._solve(2)
    }

    fn execute(&mut self) -> SimplexResult<()> {
        let mut state = if self.std.needs_phase1() {
            PhaseState::Phase1
        } else {
            PhaseState::Phase2
        };

        while state != PhaseState::Done {
            state = match state {
                PhaseState::Phase1 => {
                    self.phase1()?;
                    self.transition()?;
                    PhaseState::Phase2
                }
                PhaseState::Phase2 => {
                    self.phase2()?;
                    PhaseState::Done
                }
                PhaseState::Done => PhaseState::Done,
            };
        }
        Ok(())
    }

    fn into_result(mut self) -> SolutionResult {
        match self.execute() {
            Ok(()) => {
                log::info!(
                    "optimal after {} pivots, objective {}",
                    self.iterations,
                    self.tableau.objective_value()
                );
                SolutionResult::extract(
                    &self.tableau,
                    self.std.flipped_obj_fn,
                    self.recorder.into_steps(),
                    self.iterations,
                )
            }
            Err(err) => {
                log::info!("solve stopped: {}", err);
                SolutionResult::from_error(
                    err,
                    self.recorder.into_steps(),
                    Some(self.tableau.snapshot()),
                    self.iterations,
                )
            }
        }
    }
}

/// Two phase tableau simplex that records every pivot it performs.
#[derive(Debug, Clone, Default)]
pub struct Simplex {
    options: SimplexOptions,
}

impl Simplex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SimplexOptions) -> Self {
        Self { options }
    }

    pub fn solve(&self, lp: &LinearProgram) -> SolutionResult {
        match lp.as_standard_form() {
            Ok(std) => SimplexRun::new(std, self.options).into_result(),
            Err(err) => {
                log::info!("rejected problem: {}", err);
                SolutionResult::from_error(err, Vec::new(), None, 0)
            }
        }
    }

    pub fn try_solve(&self, lp: &LinearProgram) -> SimplexResult<SolutionResult> {
        self.solve(lp).into_result()
    }
}

impl SolveAlgorithm for Simplex {
    fn solve(&self, lp: &LinearProgram) -> SolutionResult {
        Simplex::solve(self, lp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{Comp, Constraint};
    use crate::model::OptDir;
    use crate::solver::Status;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn lp(dir: OptDir, obj: &[f64], cons: Vec<Constraint>) -> LinearProgram {
        let mut lp = LinearProgram::new(obj.len());
        lp.set_obj_fn(dir, obj);
        cons.into_iter().fold(lp, |lp, c| lp.with_constraint(c))
    }

    #[test]
    fn skips_phase1_without_artificials() {
        init();
        let result = Simplex::new().solve(&lp(
            OptDir::Max,
            &[1.0, 1.0],
            vec![
                Constraint::new(&[1, 2], Comp::Le, 4),
                Constraint::new(&[3, 2], Comp::Le, 6),
            ],
        ));

        assert!(result.is_optimal());
        assert!(result.pivot_steps.iter().all(|s| s.phase == 2));
        assert_eq!(result.iterations, 2);
        //two pivots and the terminal snapshot
        assert_eq!(result.pivot_steps.len(), 3);
        assert!(result.pivot_steps.last().unwrap().pivot().is_none());
    }

    #[test]
    fn two_phase_min() {
        init();
        //min 2x1 + 3x2, x1 + x2 >= 4, x1 + 3x2 >= 6
        let result = Simplex::new().solve(&lp(
            OptDir::Min,
            &[2.0, 3.0],
            vec![
                Constraint::new(&[1, 1], Comp::Ge, 4),
                Constraint::new(&[1, 3], Comp::Ge, 6),
            ],
        ));

        assert_eq!(result.status, Status::Optimal);
        assert!((result.var_value("x1").unwrap() - 3.0).abs() < 1e-9);
        assert!((result.var_value("x2").unwrap() - 1.0).abs() < 1e-9);
        assert!((result.optimal_value.unwrap() - 9.0).abs() < 1e-9);
        assert!(result.pivot_steps.iter().any(|s| s.phase == 1));
        assert!(result.pivot_steps.iter().any(|s| s.phase == 2));
        //artificial columns are gone from the final tableau
        assert_eq!(result.final_tableau.ncols(), 5);
    }

    #[test]
    fn equality_constraint() {
        init();
        //max x1 + 2x2, x1 + x2 = 3, x2 <= 2
        let result = Simplex::new().solve(&lp(
            OptDir::Max,
            &[1.0, 2.0],
            vec![
                Constraint::new(&[1, 1], Comp::Eq, 3),
                Constraint::new(&[0, 1], Comp::Le, 2),
            ],
        ));

        assert!(result.is_optimal());
        assert!((result.var_value("x1").unwrap() - 1.0).abs() < 1e-9);
        assert!((result.var_value("x2").unwrap() - 2.0).abs() < 1e-9);
        assert!((result.optimal_value.unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn redundant_row_is_removed() {
        init();
        //second equality duplicates the first
        let result = Simplex::new().solve(&lp(
            OptDir::Max,
            &[1.0, 1.0],
            vec![
                Constraint::new(&[1, 1], Comp::Eq, 2),
                Constraint::new(&[2, 2], Comp::Eq, 4),
                Constraint::new(&[1, 0], Comp::Le, 1),
            ],
        ));

        assert!(result.is_optimal());
        assert!((result.optimal_value.unwrap() - 2.0).abs() < 1e-9);
        //two constraint rows and the objective row remain
        assert_eq!(result.final_tableau.nrows(), 3);
    }

    #[test]
    fn zero_level_artificial_is_pivoted_out() {
        init();
        //x1 = 1 is forced, leaving an artificial basic at zero after phase 1
        let result = Simplex::new().solve(&lp(
            OptDir::Max,
            &[1.0, 1.0, 1.0],
            vec![
                Constraint::new(&[1, 1, 0], Comp::Eq, 2),
                Constraint::new(&[1, -1, 1], Comp::Eq, 0),
                Constraint::new(&[1, 0, 0], Comp::Ge, 1),
                Constraint::new(&[0, 0, 1], Comp::Le, 3),
            ],
        ));

        assert!(result.is_optimal());
        assert!((result.var_value("x1").unwrap() - 1.0).abs() < 1e-9);
        assert!((result.var_value("x2").unwrap() - 1.0).abs() < 1e-9);
        assert!(result.var_value("x3").unwrap().abs() < 1e-9);
        assert!((result.optimal_value.unwrap() - 2.0).abs() < 1e-9);

        //phase one terminal snapshot, then the swap pivot, still in phase one
        let terminal = result
            .pivot_steps
            .iter()
            .position(|s| s.phase == 1 && s.pivot().is_none())
            .unwrap();
        assert!(result.pivot_steps[terminal + 1..]
            .iter()
            .any(|s| s.phase == 1 && s.pivot().is_some()));
        //no row was dropped: four constraints plus the objective
        assert_eq!(result.final_tableau.nrows(), 5);
    }

    #[test]
    fn iteration_cap_is_fatal() {
        init();
        let simplex = Simplex::with_options(SimplexOptions {
            max_iter: Some(1),
            ..SimplexOptions::default()
        });
        let result = simplex.solve(&lp(
            OptDir::Max,
            &[1.0, 1.0],
            vec![
                Constraint::new(&[1, 2], Comp::Le, 4),
                Constraint::new(&[3, 2], Comp::Le, 6),
            ],
        ));

        assert_eq!(result.status, Status::Error);
        assert_eq!(
            result.error,
            Some(SimplexError::IterationLimitExceeded { iterations: 1 })
        );
        assert!(result.message.unwrap().contains("1 pivots"));
        assert!(result.solution_values.is_none());
    }

    #[test]
    fn validation_error_has_no_tableau() {
        let result = Simplex::new().solve(&LinearProgram::new(2));

        assert_eq!(result.status, Status::Error);
        assert!(result.pivot_steps.is_empty());
        assert_eq!(result.final_tableau.len(), 0);
        assert!(matches!(
            Simplex::new().try_solve(&LinearProgram::new(2)),
            Err(SimplexError::Validation(_))
        ));
    }

    #[test]
    fn recorder_numbers_steps() {
        let tableau = lp(OptDir::Max, &[1.0], vec![Constraint::new(&[1], Comp::Le, 1)])
            .as_standard_form()
            .unwrap()
            .as_tableau();
        let mut recorder = StepRecorder::new();
        recorder.record(2, &tableau, Some(TableauIx::new(0, 0)));
        recorder.record(2, &tableau, None);

        let steps = recorder.into_steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step, 0);
        assert_eq!(steps[1].step, 1);
        assert_eq!(steps[0].pivot_row_index, Some(0));
        assert_eq!(steps[1].pivot_col_index, None);
    }
}
