use colored::*;
use ndarray::{s, Array1, Array2, Axis};
use tabular::{Row, Table};

use std::cmp::Ordering;
use std::fmt;

use crate::model::ColumnKind;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TableauIx {
    i: usize,
    j: usize,
}

impl TableauIx {
    pub fn new(i: usize, j: usize) -> Self {
        Self { i, j }
    }

    pub fn i(&self) -> usize {
        self.i
    }

    pub fn j(&self) -> usize {
        self.j
    }
}

/// Outcome of scanning the tableau for the next pivot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PivotChoice {
    Pivot(TableauIx),
    Optimal,
    Unbounded(usize),
}

//equal within tol, otherwise ordinary float ordering
fn cmp_tol(a: f64, b: f64, tol: f64) -> Ordering {
    if (a - b).abs() <= tol {
        Ordering::Equal
    } else {
        a.partial_cmp(&b).unwrap_or(Ordering::Equal)
    }
}

/// Dense simplex tableau: one row per constraint plus the objective row last,
/// one column per variable plus the right hand side last.
#[derive(Debug, Clone, PartialEq)]
pub struct Tableau {
    pub(crate) tbl: Array2<f64>,
    pub(crate) basis: Vec<usize>,
    pub(crate) columns: Vec<ColumnKind>,
}

impl Tableau {
    //constructor
    pub fn new(tbl: Array2<f64>, basis: Vec<usize>, columns: Vec<ColumnKind>) -> Self {
        debug_assert_eq!(tbl.nrows(), basis.len() + 1);
        debug_assert_eq!(tbl.ncols(), columns.len() + 1);
        Self {
            tbl,
            basis,
            columns,
        }
    }

    pub fn tbl(&self) -> &Array2<f64> {
        &self.tbl
    }

    pub fn basis(&self) -> &[usize] {
        &self.basis
    }

    pub fn columns(&self) -> &[ColumnKind] {
        &self.columns
    }

    //constraint rows
    pub fn n_rows(&self) -> usize {
        self.basis.len()
    }

    //variable columns, rhs excluded
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn rhs(&self, i: usize) -> f64 {
        self.tbl[[i, self.n_cols()]]
    }

    pub fn objective_value(&self) -> f64 {
        self.tbl[[self.n_rows(), self.n_cols()]]
    }

    pub fn labels(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.label()).collect()
    }

    pub fn snapshot(&self) -> Array2<f64> {
        self.tbl.to_owned()
    }

    //value of every column in the current basic solution
    pub fn basic_solution(&self) -> Vec<f64> {
        let mut values = vec![0.0_f64; self.n_cols()];
        for (row, &col) in self.basis.iter().enumerate() {
            values[col] = self.rhs(row);
        }
        values
    }

    //install `costs` (maximized) as the objective row and zero the reduced
    //cost of every basic column
    pub fn set_objective(&mut self, costs: &Array1<f64>) {
        assert_eq!(costs.len(), self.n_cols());
        let m = self.n_rows();
        let n = self.n_cols();

        let mut obj = Array1::<f64>::zeros(n + 1);
        for j in 0..n {
            obj[j] = -costs[j];
        }

        for (i, &col) in self.basis.iter().enumerate() {
            let ratio = obj[col];
            if ratio == 0.0_f64 {
                continue;
            }
            let row = self.tbl.slice(s![i, ..]);
            obj.zip_mut_with(&row, |o, r| *o -= ratio * r);
        }

        self.tbl.slice_mut(s![m, ..]).assign(&obj);
    }

    //most negative reduced cost, lowest index on ties
    pub fn entering_col(&self, tol: f64) -> Option<usize> {
        let m = self.n_rows();
        self.tbl
            .slice(s![m, ..-1])
            .iter()
            .enumerate()
            .filter(|(_j, v)| **v < -tol)
            .min_by(|(_j1, v1), (_j2, v2)| cmp_tol(**v1, **v2, tol))
            .map(|(j, _v)| j)
    }

    //minimum ratio over strictly positive entries, lowest index on ties
    pub fn leaving_row(&self, j: usize, tol: f64) -> Option<usize> {
        let m = self.n_rows();
        let n = self.n_cols();
        self.tbl
            .slice(s![..m, j])
            .iter()
            .enumerate()
            .zip(self.tbl.slice(s![..m, n]))
            .filter(|((_i, a), _b)| **a > tol)
            .map(|((i, a), b)| (i, *b / *a))
            .min_by(|(_i1, r1), (_i2, r2)| cmp_tol(*r1, *r2, tol))
            .map(|(i, _r)| i)
    }

    pub fn pivot_ind(&self, tol: f64) -> PivotChoice {
        let Some(j) = self.entering_col(tol) else {
            return PivotChoice::Optimal;
        };
        match self.leaving_row(j, tol) {
            Some(i) => PivotChoice::Pivot(TableauIx::new(i, j)),
            None => PivotChoice::Unbounded(j),
        }
    }

    //non-artificial column with the largest magnitude entry in row `i`,
    //lowest index on ties
    pub fn replacement_col(&self, i: usize, tol: f64) -> Option<usize> {
        self.tbl
            .slice(s![i, ..-1])
            .iter()
            .enumerate()
            .filter(|(j, v)| !self.columns[*j].is_artificial() && v.abs() > tol)
            .min_by(|(_j1, v1), (_j2, v2)| cmp_tol(v2.abs(), v1.abs(), tol))
            .map(|(j, _v)| j)
    }

    //pivot
    pub fn pivot(&mut self, pivot_ind: &TableauIx, tol: f64) {
        //assert row and col in valid range
        assert!(pivot_ind.i() < self.n_rows());
        assert!(pivot_ind.j() < self.n_cols());

        let (pi, pj) = (pivot_ind.i(), pivot_ind.j());
        let width = self.tbl.ncols();

        //set coefficients in pivot row
        let div = self.tbl[[pi, pj]];
        for j in 0..width {
            self.tbl[[pi, j]] /= div;
        }

        for i in 0..self.tbl.nrows() {
            //skip pivot row
            if i == pi {
                continue;
            }
            let ratio = self.tbl[[i, pj]];
            if ratio == 0.0_f64 {
                continue;
            }
            for j in 0..width {
                //calc new coefficients
                self.tbl[[i, j]] -= self.tbl[[pi, j]] * ratio;
            }
        }

        //round off noise and make the pivot column an exact unit vector
        self.tbl.mapv_inplace(|v| if v.abs() < tol { 0.0 } else { v });
        self.tbl.column_mut(pj).fill(0.0);
        self.tbl[[pi, pj]] = 1.0;

        self.basis[pi] = pj;
    }

    //keep only the columns flagged true, rhs is always kept
    pub fn filter_cols(&mut self, col_mask: &[bool]) {
        assert_eq!(col_mask.len(), self.n_cols());
        let keep = col_mask
            .iter()
            .enumerate()
            .filter(|(_, &k)| k)
            .map(|(j, _)| j)
            .chain(std::iter::once(self.n_cols()))
            .collect::<Vec<usize>>();

        //old index -> new index
        let mut remap = vec![None; self.n_cols()];
        for (new, &old) in keep.iter().enumerate().take(keep.len() - 1) {
            remap[old] = Some(new);
        }

        assert!(
            self.basis.iter().all(|&j| col_mask[j]),
            "basic column filtered out of tableau"
        );

        self.tbl = self.tbl.select(Axis(1), &keep);
        self.columns = keep[..keep.len() - 1]
            .iter()
            .map(|&j| self.columns[j])
            .collect();
        self.basis = self
            .basis
            .iter()
            .filter_map(|&j| remap[j])
            .collect();
    }

    pub fn remove_row(&mut self, i: usize) {
        assert!(i < self.n_rows());
        let keep = (0..self.tbl.nrows())
            .filter(|&r| r != i)
            .collect::<Vec<usize>>();
        self.tbl = self.tbl.select(Axis(0), &keep);
        self.basis.remove(i);
    }

    //every basic column is a unit vector, rhs non-negative, basis distinct
    pub fn is_canonical(&self, tol: f64) -> bool {
        let m = self.n_rows();
        let mut seen = vec![false; self.n_cols()];
        for (row, &col) in self.basis.iter().enumerate() {
            if col >= self.n_cols() || seen[col] {
                return false;
            }
            seen[col] = true;
            for i in 0..=m {
                let expected = if i == row { 1.0 } else { 0.0 };
                if (self.tbl[[i, col]] - expected).abs() > tol {
                    return false;
                }
            }
            if self.rhs(row) < -tol {
                return false;
            }
        }
        true
    }

    fn row_labels(&self) -> Vec<String> {
        self.basis
            .iter()
            .map(|&col| self.columns[col].label())
            .chain(std::iter::once("z".to_string()))
            .collect()
    }

    /// Renders the tableau with the pivot element highlighted.
    pub fn render(&self, pivot: Option<TableauIx>, precision: usize) -> String {
        render_matrix(
            &self.tbl,
            &self.labels(),
            &self.row_labels(),
            pivot,
            precision,
        )
    }
}

//missing labels fall back to the row/column index
pub fn render_matrix(
    tbl: &Array2<f64>,
    col_labels: &[String],
    row_labels: &[String],
    pivot: Option<TableauIx>,
    precision: usize,
) -> String {
    let n = tbl.ncols();
    let row_fmt = "{:<}".to_string() + &"  {:>}".repeat(n);
    let mut table = Table::new(row_fmt.as_str());

    let mut header = Row::new().with_cell("basis");
    for j in 0..n {
        match col_labels.get(j) {
            Some(label) => header.add_cell(label),
            None if j + 1 == n => header.add_cell("rhs"),
            None => header.add_cell(j),
        };
    }
    table.add_row(header);

    for (i, tbl_row) in tbl.rows().into_iter().enumerate() {
        let mut row = match row_labels.get(i) {
            Some(label) => Row::new().with_cell(label),
            None => Row::new().with_cell(i),
        };
        for (j, v) in tbl_row.iter().enumerate() {
            let cell = format!("{:.*}", precision, v);
            let cell = match pivot {
                Some(ix) if ix.i() == i && ix.j() == j => cell.bold().yellow().to_string(),
                Some(ix) if ix.i() == i || ix.j() == j => cell.cyan().to_string(),
                _ => cell,
            };
            row.add_cell(cell);
        }
        table.add_row(row);
    }

    table.to_string()
}

impl fmt::Display for Tableau {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.render(None, 3))
    }
}
