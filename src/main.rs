use anyhow::{Context, Result};
use clap::{crate_version, Parser};
use clap_verbosity_flag::Verbosity;
use colored::*;
use env_logger::Builder;

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use simplex_trace::tableau::render_matrix;
use simplex_trace::{
    LinearProgram, Simplex, SimplexError, SimplexOptions, SolutionResult, Status,
};

/// Solve a linear program with the two phase simplex method and show every pivot.
#[derive(Parser, Debug)]
#[command(name = "simplex-trace", version = crate_version!())]
struct Cli {
    /// JSON problem file, reads stdin when omitted or "-"
    input: Option<PathBuf>,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,

    /// Print the tableau recorded at every step
    #[arg(long)]
    steps: bool,

    /// Decimal places used when printing tableaux
    #[arg(long, default_value_t = 3)]
    precision: usize,

    /// Zero tolerance used during pivot selection
    #[arg(long)]
    tol: Option<f64>,

    /// Pivot budget over both phases
    #[arg(long)]
    max_iter: Option<usize>,

    #[command(flatten)]
    verbose: Verbosity,
}

fn read_problem(input: Option<&PathBuf>) -> Result<LinearProgram> {
    let raw = match input {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading problem from stdin")?;
            buf
        }
    };
    serde_json::from_str(&raw).context("parsing linear program")
}

fn print_summary(lp: &LinearProgram, result: &SolutionResult, cli: &Cli) {
    println!("model:\n{}", lp);

    if cli.steps {
        for step in &result.pivot_steps {
            let rows = step.tableau.nrows();
            let row_labels = (1..rows)
                .map(|i| format!("r{}", i))
                .chain(std::iter::once("z".to_string()))
                .collect::<Vec<String>>();
            let title = match step.pivot() {
                Some(ix) => format!(
                    "step {} (phase {}): pivot on row {}, column {}",
                    step.step,
                    step.phase,
                    ix.i(),
                    ix.j()
                ),
                None => format!("step {} (phase {}): terminal", step.step, step.phase),
            };
            println!("{}", title.bold());
            println!(
                "{}",
                render_matrix(&step.tableau, &[], &row_labels, step.pivot(), cli.precision)
            );
        }
    }

    match result.status {
        Status::Optimal => {
            println!("{}", "optimal".green().bold());
            if let Some(values) = &result.solution_values {
                for (name, value) in values {
                    println!("  {} = {:.*}", name, cli.precision, value);
                }
            }
            if let Some(value) = result.optimal_value {
                println!("  objective = {:.*}", cli.precision, value);
            }
        }
        status => {
            let label = format!("{:?}", status).to_lowercase();
            println!("{}", label.red().bold());
            if let Some(message) = &result.message {
                println!("  {}", message);
            }
        }
    }
    println!("{} pivots", result.iterations);
}

//malformed problems fail the process, solver outcomes do not
fn check_input(result: &SolutionResult) -> Result<()> {
    if let Some(err @ SimplexError::Validation(_)) = &result.error {
        anyhow::bail!("{}", err);
    }
    Ok(())
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();

    Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    let lp = read_problem(cli.input.as_ref())?;
    log::info!("solving {} variables, {} constraints", lp.num_vars, lp.constraints.len());

    let defaults = SimplexOptions::default();
    let simplex = Simplex::with_options(SimplexOptions {
        tol: cli.tol.unwrap_or(defaults.tol),
        max_iter: cli.max_iter,
        ..defaults
    });
    let result = simplex.solve(&lp);

    if cli.json {
        let out = serde_json::to_string_pretty(&result).context("encoding result")?;
        println!("{}", out);
    } else {
        print_summary(&lp, &result, &cli);
    }
    check_input(&result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> LinearProgram {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn coefficient_mismatch_fails_the_run() {
        let lp = parse(
            r#"{"numVars": 2, "objective": [1, 1], "constraints": [{"coeffs": [1, 2, 3], "rhs": 4}]}"#,
        );
        let result = Simplex::new().solve(&lp);

        let err = check_input(&result).unwrap_err();
        assert!(err.to_string().contains("constraint 1 has 3 coefficients"));
    }

    #[test]
    fn solver_outcomes_do_not_fail_the_run() {
        let unbounded = parse(
            r#"{"numVars": 2, "objective": [1, 0], "constraints": [{"coeffs": [1, -1], "rhs": 1}]}"#,
        );
        let result = Simplex::new().solve(&unbounded);
        assert_eq!(result.status, Status::Unbounded);
        assert!(check_input(&result).is_ok());

        let bounded = parse(
            r#"{"numVars": 2, "objective": [1, 1], "constraints": [{"coeffs": [1, 2], "rhs": 4}, {"coeffs": [3, 2], "rhs": 6}]}"#,
        );
        assert!(check_input(&Simplex::new().solve(&bounded)).is_ok());
    }
}
