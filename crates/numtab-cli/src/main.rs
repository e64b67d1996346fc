//! numtab CLI: linear solvers, Newton interpolation and table extraction.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use nalgebra::DMatrix;
use serde::Serialize;

use numtab::linalg::TraceStep;
use numtab::{
    cholesky_decompose, gauss_jordan, gaussian_elimination, newton_interpolate, parse_matrix,
    parse_vector, solve_cholesky, solve_lu, EvalRegion, ExtractConfig, ExtractionReport,
    FitReport, NewtonTerm, TableExtractor,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "numtab")]
#[command(about = "Solve linear systems, interpolate tabulated data, read x/y tables from photos")]
#[command(version)]
struct Cli {
    /// Write the JSON result here instead of stdout.
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve A·x = b by Doolittle LU factorization.
    Lu(SystemArgs),

    /// Cholesky factorization of a symmetric positive-definite matrix.
    Cholesky {
        /// Matrix rows separated by ';', entries by ','.
        #[arg(long, allow_hyphen_values = true)]
        matrix: String,

        /// Optional right-hand side; when given, the system is solved.
        #[arg(long, allow_hyphen_values = true)]
        rhs: Option<String>,
    },

    /// Solve by Gaussian elimination and back substitution.
    Gauss(TracedSystemArgs),

    /// Solve by Gauss-Jordan reduction to [I | x].
    GaussJordan(TracedSystemArgs),

    /// Newton divided-difference interpolation.
    Newton(NewtonArgs),

    /// Read an x/y table from an image.
    Extract(ExtractArgs),
}

#[derive(Debug, Clone, Args)]
struct SystemArgs {
    /// Matrix rows separated by ';', entries by ','.
    #[arg(long, allow_hyphen_values = true)]
    matrix: String,

    /// Right-hand side entries separated by ','.
    #[arg(long, allow_hyphen_values = true)]
    rhs: String,
}

#[derive(Debug, Clone, Args)]
struct TracedSystemArgs {
    #[command(flatten)]
    system: SystemArgs,

    /// Include every row operation with its augmented matrix.
    #[arg(long)]
    steps: bool,
}

#[derive(Debug, Clone, Args)]
struct NewtonArgs {
    /// Node abscissas separated by ','.
    #[arg(long, allow_hyphen_values = true)]
    x: String,

    /// Node values separated by ','.
    #[arg(long, allow_hyphen_values = true)]
    y: String,

    /// Points at which to evaluate the polynomial (repeatable).
    #[arg(long, allow_hyphen_values = true)]
    eval: Vec<f64>,

    /// Decimal places in the polynomial text.
    #[arg(long, default_value = "6")]
    precision: usize,
}

#[derive(Debug, Clone, Args)]
struct ExtractArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Extraction config (JSON); missing fields take defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minimum OCR confidence in [0, 1].
    #[arg(long)]
    min_confidence: Option<f32>,

    /// Minimum row tolerance in pixels.
    #[arg(long)]
    row_tolerance_px: Option<f32>,

    /// Scene-text detector command line (program and arguments).
    #[arg(long)]
    scene_text_cmd: Option<String>,

    /// Interpolate the extracted table.
    #[arg(long)]
    newton: bool,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let out = cli.out.as_deref();

    match cli.command {
        Commands::Lu(args) => run_lu(&args, out),
        Commands::Cholesky { matrix, rhs } => run_cholesky(&matrix, rhs.as_deref(), out),
        Commands::Gauss(args) => run_gauss(&args, out),
        Commands::GaussJordan(args) => run_gauss_jordan(&args, out),
        Commands::Newton(args) => run_newton(&args, out),
        Commands::Extract(args) => run_extract(&args, out),
    }
}

fn emit<T: Serialize>(value: &T, out: Option<&Path>) -> CliResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            std::fs::write(path, &json)?;
            tracing::info!("Results written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter().map(|r| r.iter().copied().collect()).collect()
}

// ── linear systems ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct FactorOutput {
    method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    l: Option<Vec<Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    u: Option<Vec<Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    x: Option<Vec<f64>>,
}

#[derive(Serialize)]
struct StepOutput {
    operation: String,
    augmented: Vec<Vec<f64>>,
}

#[derive(Serialize)]
struct TracedOutput {
    method: &'static str,
    x: Vec<f64>,
    n_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    steps: Option<Vec<StepOutput>>,
}

fn run_lu(args: &SystemArgs, out: Option<&Path>) -> CliResult<()> {
    let a = parse_matrix(&args.matrix)?;
    let b = parse_vector(&args.rhs)?;
    let sol = solve_lu(&a, &b)?;
    emit(
        &FactorOutput {
            method: "lu",
            l: Some(rows(&sol.l)),
            u: Some(rows(&sol.u)),
            x: Some(sol.x.iter().copied().collect()),
        },
        out,
    )
}

fn run_cholesky(matrix: &str, rhs: Option<&str>, out: Option<&Path>) -> CliResult<()> {
    let a = parse_matrix(matrix)?;
    let output = match rhs {
        Some(rhs) => {
            let sol = solve_cholesky(&a, &parse_vector(rhs)?)?;
            FactorOutput {
                method: "cholesky",
                l: Some(rows(&sol.l)),
                u: None,
                x: Some(sol.x.iter().copied().collect()),
            }
        }
        None => FactorOutput {
            method: "cholesky",
            l: Some(rows(&cholesky_decompose(&a)?.l)),
            u: None,
            x: None,
        },
    };
    emit(&output, out)
}

fn traced<S: TraceStep + Display>(
    method: &'static str,
    steps: &[S],
    x: Vec<f64>,
    with_steps: bool,
) -> TracedOutput {
    TracedOutput {
        method,
        x,
        n_steps: steps.len(),
        steps: with_steps.then(|| {
            steps
                .iter()
                .map(|s| StepOutput {
                    operation: s.to_string(),
                    augmented: rows(&s.augmented()),
                })
                .collect()
        }),
    }
}

fn run_gauss(args: &TracedSystemArgs, out: Option<&Path>) -> CliResult<()> {
    let a = parse_matrix(&args.system.matrix)?;
    let b = parse_vector(&args.system.rhs)?;
    let run = gaussian_elimination(&a, &b)?;
    let x = run.solution().iter().copied().collect();
    emit(&traced("gauss", run.steps(), x, args.steps), out)
}

fn run_gauss_jordan(args: &TracedSystemArgs, out: Option<&Path>) -> CliResult<()> {
    let a = parse_matrix(&args.system.matrix)?;
    let b = parse_vector(&args.system.rhs)?;
    let run = gauss_jordan(&a, &b)?;
    let x = run.solution().iter().copied().collect();
    emit(&traced("gauss_jordan", run.steps(), x, args.steps), out)
}

// ── newton ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Evaluation {
    x: f64,
    y: f64,
    region: EvalRegion,
}

#[derive(Serialize)]
struct NewtonOutput {
    polynomial: String,
    power_coefficients: Vec<f64>,
    newton_coefficients: Vec<f64>,
    divided_differences: Vec<Vec<f64>>,
    terms: Vec<NewtonTerm>,
    report: FitReport,
    evaluations: Vec<Evaluation>,
}

fn newton_output(x: &[f64], y: &[f64], eval: &[f64], precision: usize) -> CliResult<NewtonOutput> {
    let interp = newton_interpolate(x, y)?;
    let poly = &interp.polynomial;
    let evaluations = eval
        .iter()
        .map(|&t| {
            let (value, region) = poly.eval_with_region(t);
            if region == EvalRegion::Extrapolation {
                tracing::warn!("x = {} lies outside the node range; extrapolating", t);
            }
            Evaluation {
                x: t,
                y: value,
                region,
            }
        })
        .collect();

    Ok(NewtonOutput {
        polynomial: format!("{:.*}", precision, poly),
        power_coefficients: poly.to_power_basis(),
        newton_coefficients: poly.coefficients().to_vec(),
        divided_differences: interp.table.to_rows(),
        report: FitReport::from_interpolation(&interp),
        terms: interp.terms,
        evaluations,
    })
}

fn run_newton(args: &NewtonArgs, out: Option<&Path>) -> CliResult<()> {
    let x: Vec<f64> = parse_vector(&args.x)?.iter().copied().collect();
    let y: Vec<f64> = parse_vector(&args.y)?.iter().copied().collect();
    emit(&newton_output(&x, &y, &args.eval, args.precision)?, out)
}

// ── extract ────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ExtractOutput {
    success: bool,
    x_values: Vec<f64>,
    y_values: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<ExtractionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    newton: Option<NewtonOutput>,
}

fn build_extract_config(args: &ExtractArgs) -> CliResult<ExtractConfig> {
    let mut config = match &args.config {
        Some(path) => ExtractConfig::from_json_file(path)?,
        None => ExtractConfig::default(),
    };
    if let Some(v) = args.min_confidence {
        config.recognition.min_confidence = v;
    }
    if let Some(v) = args.row_tolerance_px {
        config.table.row_tolerance_min_px = v;
    }
    if let Some(cmd) = &args.scene_text_cmd {
        config.backends.scene_text_command =
            Some(cmd.split_whitespace().map(str::to_string).collect());
    }
    Ok(config)
}

fn run_extract(args: &ExtractArgs, out: Option<&Path>) -> CliResult<()> {
    tracing::info!("Loading image: {}", args.image.display());
    let img = image::open(&args.image).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", args.image.display(), e).into()
    })?;
    tracing::info!("Image size: {}x{}", img.width(), img.height());

    let extractor = TableExtractor::with_config(build_extract_config(args)?);
    let output = match extractor.extract(&img) {
        Ok((table, report)) => {
            let newton = if args.newton {
                Some(newton_output(&table.x_values, &table.y_values, &[], 6)?)
            } else {
                None
            };
            ExtractOutput {
                success: true,
                x_values: table.x_values,
                y_values: table.y_values,
                error: None,
                report: Some(report),
                newton,
            }
        }
        Err(err) => {
            tracing::warn!("Extraction failed: {}", err);
            eprintln!(
                "Could not read a table from {}. Enter the values manually, e.g.\n  \
                 numtab newton --x \"0,1,2\" --y \"1,2,5\"",
                args.image.display()
            );
            ExtractOutput {
                success: false,
                x_values: Vec::new(),
                y_values: Vec::new(),
                error: Some(err.to_string()),
                report: None,
                newton: None,
            }
        }
    };
    emit(&output, out)
}
