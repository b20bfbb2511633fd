use ndarray::{Array1, Array2};
use num::ToPrimitive;
use serde::{Deserialize, Serialize};
use tabular::{Row, Table};

use std::fmt;

use crate::constraint::{Comp, Constraint};
use crate::error::{SimplexError, SimplexResult};
use crate::tableau::Tableau;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptDir {
    #[default]
    Max,
    Min,
}

impl fmt::Display for OptDir {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OptDir::Max => write!(f, "Max"),
            OptDir::Min => write!(f, "Min"),
        }
    }
}

/// A linear program over the non-negative variables `x1..xN`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearProgram {
    pub num_vars: usize,
    pub objective: Vec<f64>,
    pub constraints: Vec<Constraint>,
    #[serde(rename = "optimization", default)]
    pub opt_dir: OptDir,
}

/// Role of a tableau column.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Decision(usize),
    Slack(usize),
    Surplus(usize),
    Artificial(usize),
}

impl ColumnKind {
    pub fn is_artificial(&self) -> bool {
        matches!(self, ColumnKind::Artificial(_))
    }

    pub fn label(&self) -> String {
        match self {
            ColumnKind::Decision(i) => format!("x{}", i + 1),
            ColumnKind::Slack(r) | ColumnKind::Surplus(r) => format!("s{}", r + 1),
            ColumnKind::Artificial(r) => format!("a{}", r + 1),
        }
    }
}

/// Equality form `A x = b`, `x >= 0`, `b >= 0`, with the objective always maximized.
#[derive(Clone, Debug)]
pub struct StandardForm {
    pub a: Array2<f64>,
    pub b: Array1<f64>,
    //maximization costs, one per column of `a`
    pub c: Array1<f64>,
    pub basis: Vec<usize>,
    pub columns: Vec<ColumnKind>,
    pub flipped_obj_fn: bool,
}

impl StandardForm {
    pub fn n_rows(&self) -> usize {
        self.a.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.a.ncols()
    }

    pub fn artificial_cols(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, kind)| kind.is_artificial())
            .map(|(j, _)| j)
            .collect()
    }

    pub fn needs_phase1(&self) -> bool {
        self.columns.iter().any(|kind| kind.is_artificial())
    }

    //constraint rows followed by an all zero objective row
    pub fn as_tableau(&self) -> Tableau {
        let m = self.n_rows();
        let n = self.n_cols();
        let mut tbl = Array2::<f64>::zeros((m + 1, n + 1));

        for i in 0..m {
            for j in 0..n {
                tbl[[i, j]] = self.a[[i, j]];
            }
            tbl[[i, n]] = self.b[i];
        }

        Tableau::new(tbl, self.basis.clone(), self.columns.clone())
    }
}

impl LinearProgram {
    pub fn new(num_vars: usize) -> Self {
        Self {
            num_vars,
            objective: vec![0.0; num_vars],
            constraints: Vec::new(),
            opt_dir: OptDir::Max,
        }
    }

    //set objective function and optimization direction
    pub fn set_obj_fn<T: ToPrimitive>(&mut self, opt_dir: OptDir, coeffs: &[T]) {
        self.objective = coeffs
            .iter()
            .map(|c| c.to_f64().unwrap_or(f64::NAN))
            .collect();
        self.opt_dir = opt_dir;
    }

    //add a constraint to the model
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.add_constraint(constraint);
        self
    }

    pub fn opt_dir(&self) -> OptDir {
        self.opt_dir
    }

    pub fn validate(&self) -> SimplexResult<()> {
        if self.num_vars < 1 {
            return Err(SimplexError::Validation(
                "numVars must be at least 1".to_string(),
            ));
        }
        if self.objective.len() != self.num_vars {
            return Err(SimplexError::Validation(format!(
                "objective has {} coefficients, expected {}",
                self.objective.len(),
                self.num_vars
            )));
        }
        if self.objective.iter().any(|c| !c.is_finite()) {
            return Err(SimplexError::Validation(
                "objective contains a non-finite coefficient".to_string(),
            ));
        }
        if self.constraints.is_empty() {
            return Err(SimplexError::Validation(
                "at least one constraint is required".to_string(),
            ));
        }
        for (i, cons) in self.constraints.iter().enumerate() {
            if cons.coeffs().len() != self.num_vars {
                return Err(SimplexError::Validation(format!(
                    "constraint {} has {} coefficients, expected {}",
                    i + 1,
                    cons.coeffs().len(),
                    self.num_vars
                )));
            }
            if !cons.rhs().is_finite() || cons.coeffs().iter().any(|c| !c.is_finite()) {
                return Err(SimplexError::Validation(format!(
                    "constraint {} contains a non-finite value",
                    i + 1
                )));
            }
        }
        Ok(())
    }

    pub fn as_standard_form(&self) -> SimplexResult<StandardForm> {
        self.validate()?;

        let n = self.num_vars;
        let m = self.constraints.len();
        let rows = self
            .constraints
            .iter()
            .map(|c| c.as_standard_form())
            .collect::<Vec<_>>();

        //decision vars, then slack/surplus, then artificial
        let mut columns = (0..n).map(ColumnKind::Decision).collect::<Vec<_>>();
        let mut slack_col = vec![None; m];
        let mut artificial_col = vec![None; m];
        for (i, row) in rows.iter().enumerate() {
            if row.flipped {
                log::debug!("constraint {} has negative rhs, row negated", i + 1);
            }
            if row.needs_slack() {
                slack_col[i] = Some(columns.len());
                columns.push(if row.comp == Comp::Ge {
                    ColumnKind::Surplus(i)
                } else {
                    ColumnKind::Slack(i)
                });
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.needs_artificial() {
                artificial_col[i] = Some(columns.len());
                columns.push(ColumnKind::Artificial(i));
            }
        }

        let mut a = Array2::<f64>::zeros((m, columns.len()));
        let mut b = Array1::<f64>::zeros(m);
        let mut basis = vec![0; m];
        for (i, row) in rows.iter().enumerate() {
            for (j, coeff) in row.coeffs.iter().enumerate() {
                a[[i, j]] = *coeff;
            }
            b[i] = row.rhs;
            if let Some(j) = slack_col[i] {
                a[[i, j]] = if row.comp == Comp::Ge { -1.0 } else { 1.0 };
            }
            if let Some(j) = artificial_col[i] {
                a[[i, j]] = 1.0;
            }
            //slack of a <= row or artificial of any other row starts basic
            basis[i] = match row.comp {
                Comp::Le => slack_col[i],
                _ => artificial_col[i],
            }
            .ok_or_else(|| {
                SimplexError::Validation(format!("constraint {} has no basic column", i + 1))
            })?;
        }

        //convert to maximization problem
        let flipped_obj_fn = self.opt_dir == OptDir::Min;
        let mut c = Array1::<f64>::zeros(columns.len());
        for (j, coeff) in self.objective.iter().enumerate() {
            c[j] = if flipped_obj_fn { -*coeff } else { *coeff };
        }

        log::debug!(
            "standard form: {} rows, {} columns, {} artificial",
            m,
            columns.len(),
            artificial_col.iter().flatten().count()
        );

        Ok(StandardForm {
            a,
            b,
            c,
            basis,
            columns,
            flipped_obj_fn,
        })
    }
}

impl fmt::Display for LinearProgram {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut table = Table::new("{:<}{:^}{:<}");

        let mut obj = String::new();
        for (i, coeff) in self.objective.iter().enumerate() {
            if *coeff == 0.0_f64 {
                continue;
            }
            let sign = if *coeff < 0.0 {
                "-"
            } else if obj.is_empty() {
                ""
            } else {
                "+"
            };
            if obj.is_empty() {
                obj += &format!("{}{}*x{}", sign, coeff.abs(), i + 1);
            } else {
                obj += &format!(" {} {}*x{}", sign, coeff.abs(), i + 1);
            }
        }
        if obj.is_empty() {
            obj = "0".to_string();
        }

        table.add_row(
            Row::new()
                .with_cell(self.opt_dir)
                .with_cell(" : ")
                .with_cell(obj),
        );
        table.add_row(
            Row::new()
                .with_cell("Subject to")
                .with_cell(" : ")
                .with_cell(""),
        );
        for constraint in &self.constraints {
            table.add_row(
                Row::new()
                    .with_cell("")
                    .with_cell("")
                    .with_cell(constraint),
            );
        }

        write!(f, "{}", table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LinearProgram {
        let mut lp = LinearProgram::new(2);
        lp.set_obj_fn(OptDir::Min, &[2, 3]);
        lp.with_constraint(Constraint::new(&[1, 1], Comp::Le, 4))
            .with_constraint(Constraint::new(&[1, -1], Comp::Ge, 1))
            .with_constraint(Constraint::new(&[1, 2], Comp::Eq, -2))
    }

    #[test]
    fn standard_form_layout() {
        let std = sample().as_standard_form().unwrap();

        //x1 x2 s1 s2 a2 a3
        assert_eq!(std.n_rows(), 3);
        assert_eq!(std.n_cols(), 6);
        assert_eq!(
            std.columns,
            vec![
                ColumnKind::Decision(0),
                ColumnKind::Decision(1),
                ColumnKind::Slack(0),
                ColumnKind::Surplus(1),
                ColumnKind::Artificial(1),
                ColumnKind::Artificial(2),
            ]
        );
        assert_eq!(std.basis, vec![2, 4, 5]);
        assert!(std.needs_phase1());
        assert_eq!(std.artificial_cols(), vec![4, 5]);

        //surplus enters with -1
        assert_eq!(std.a[[1, 3]], -1.0);
        assert_eq!(std.a[[1, 4]], 1.0);

        //negative rhs equality row was negated
        assert_eq!(std.b[2], 2.0);
        assert_eq!(std.a[[2, 0]], -1.0);
        assert_eq!(std.a[[2, 1]], -2.0);

        //min is solved as max of the negated objective
        assert!(std.flipped_obj_fn);
        assert_eq!(std.c[0], -2.0);
        assert_eq!(std.c[1], -3.0);
        assert_eq!(std.c[2], 0.0);
    }

    #[test]
    fn all_le_rows_skip_phase1() {
        let mut lp = LinearProgram::new(2);
        lp.set_obj_fn(OptDir::Max, &[1, 1]);
        let lp = lp.with_constraint(Constraint::new(&[1, 2], Comp::Le, 4));
        let std = lp.as_standard_form().unwrap();

        assert!(!std.needs_phase1());
        assert_eq!(std.basis, vec![2]);
        assert!(!std.flipped_obj_fn);
    }

    #[test]
    fn negative_le_row_needs_artificial() {
        let mut lp = LinearProgram::new(1);
        lp.set_obj_fn(OptDir::Max, &[1]);
        let lp = lp.with_constraint(Constraint::new(&[1], Comp::Le, -1));
        let std = lp.as_standard_form().unwrap();

        assert!(std.needs_phase1());
        assert_eq!(std.columns[1], ColumnKind::Surplus(0));
    }

    #[test]
    fn rejects_malformed_input() {
        let mut lp = LinearProgram::new(2);
        lp.set_obj_fn(OptDir::Max, &[1, 1]);
        assert!(matches!(
            lp.validate(),
            Err(SimplexError::Validation(_))
        ));

        let lp = lp.with_constraint(Constraint::new(&[1], Comp::Le, 1));
        assert!(matches!(
            lp.as_standard_form(),
            Err(SimplexError::Validation(_))
        ));

        let mut lp = LinearProgram::new(0);
        lp.set_obj_fn::<f64>(OptDir::Max, &[]);
        assert!(matches!(lp.validate(), Err(SimplexError::Validation(_))));

        let mut lp = LinearProgram::new(1);
        lp.set_obj_fn(OptDir::Max, &[f64::NAN]);
        let lp = lp.with_constraint(Constraint::new(&[1], Comp::Le, 1));
        assert!(matches!(lp.validate(), Err(SimplexError::Validation(_))));
    }

    #[test]
    fn deserializes_request_shape() {
        let lp: LinearProgram = serde_json::from_str(
            r#"{
                "numVars": 2,
                "objective": [1, 1],
                "constraints": [
                    {"coeffs": [1, 2], "rhs": 4},
                    {"coeffs": [3, 2], "rhs": 6, "inequality": "L"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(lp.num_vars, 2);
        assert_eq!(lp.opt_dir(), OptDir::Max);
        assert_eq!(lp.constraints[0].comp(), Comp::Le);

        let lp: LinearProgram = serde_json::from_str(
            r#"{"numVars": 1, "objective": [1], "constraints": [], "optimization": "min"}"#,
        )
        .unwrap();
        assert_eq!(lp.opt_dir(), OptDir::Min);
    }

    #[test]
    fn display_lists_constraints() {
        let out = format!("{}", sample());
        assert!(out.contains("Min"));
        assert!(out.contains("Subject to"));
        assert!(out.contains("2*x1 + 3*x2"));
    }
}
