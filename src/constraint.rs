use num::ToPrimitive;
use serde::{Deserialize, Serialize};

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Comp {
    #[default]
    #[serde(rename = "L")]
    Le, // <=
    #[serde(rename = "G")]
    Ge, // >=
    #[serde(rename = "E")]
    Eq, // ==
}

impl Comp {
    //direction after multiplying both sides by -1
    pub fn flip(self) -> Self {
        match self {
            Comp::Le => Comp::Ge,
            Comp::Eq => Comp::Eq,
            Comp::Ge => Comp::Le,
        }
    }
}

impl fmt::Display for Comp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Comp::Le => write!(f, "\u{2264}"),
            Comp::Eq => write!(f, "="),
            Comp::Ge => write!(f, "\u{2265}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub coeffs: Vec<f64>,
    pub rhs: f64,
    #[serde(rename = "inequality", default)]
    pub comp: Comp,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for (i, coeff) in self.coeffs.iter().enumerate() {
            if *coeff == 0.0_f64 {
                continue;
            }
            let sign = if *coeff < 0.0 { "-" } else if first { "" } else { "+" };
            if first {
                write!(f, "{}{}*x{}", sign, coeff.abs(), i + 1)?;
            } else {
                write!(f, " {} {}*x{}", sign, coeff.abs(), i + 1)?;
            }
            first = false;
        }
        if first {
            write!(f, "0")?;
        }
        write!(f, " {} {}", self.comp, self.rhs)
    }
}

//constraint row after sign normalization, rhs always >= 0
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintTransformationInfo {
    pub coeffs: Vec<f64>,
    pub rhs: f64,
    pub comp: Comp,
    pub flipped: bool,
}

impl ConstraintTransformationInfo {
    pub fn needs_slack(&self) -> bool {
        self.comp != Comp::Eq
    }

    pub fn needs_artificial(&self) -> bool {
        self.comp != Comp::Le
    }
}

impl Constraint {
    pub fn new<T: ToPrimitive, U: ToPrimitive>(coeffs: &[T], comp: Comp, rhs: U) -> Self {
        Self {
            coeffs: coeffs
                .iter()
                .map(|c| c.to_f64().unwrap_or(f64::NAN))
                .collect(),
            rhs: rhs.to_f64().unwrap_or(f64::NAN),
            comp,
        }
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    pub fn rhs(&self) -> f64 {
        self.rhs
    }

    pub fn comp(&self) -> Comp {
        self.comp
    }

    pub fn lhs_value(&self, values: &[f64]) -> f64 {
        self.coeffs
            .iter()
            .zip(values.iter())
            .map(|(a, x)| a * x)
            .sum()
    }

    pub fn is_satisfied(&self, values: &[f64], tol: f64) -> bool {
        let lhs = self.lhs_value(values);
        match self.comp {
            Comp::Le => lhs <= self.rhs + tol,
            Comp::Ge => lhs >= self.rhs - tol,
            Comp::Eq => (lhs - self.rhs).abs() <= tol,
        }
    }

    pub fn as_standard_form(&self) -> ConstraintTransformationInfo {
        let mut coeffs = self.coeffs.clone();
        let mut rhs = self.rhs;
        let mut comp = self.comp;

        //ensure positive rhs
        let flipped = rhs < 0.0_f64;
        if flipped {
            coeffs.iter_mut().for_each(|c| *c = -*c);
            rhs = -rhs;
            comp = comp.flip();
        }

        ConstraintTransformationInfo {
            coeffs,
            rhs,
            comp,
            flipped,
        }
    }
}
