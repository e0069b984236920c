//! lasercal CLI: build, store and inspect coordinate fields.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use lasercal::core::{init_with_level, level_from_verbosity, LaserLine};
use lasercal::field::{
    load_cam_grid_data, load_coax_model, load_field, save_field, BuildSource, CalibrationConfig,
    CoaxCalibrationData, CoordinateField, FieldReport, GridBuildParams, OutputPaths, Roi,
};
use lasercal::grid::{CamGridData, DEFAULT_MAX_X_DELTA};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "lasercal")]
#[command(about = "Build and inspect pixel to mm coordinate fields of laser triangulation sensors")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log through tracing spans instead of the plain logger.
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    tracing: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a closed-form field from coax parameters (JSON).
    Coax(CoaxArgs),

    /// Build a field from chessboard corners on the laser plane (CSV).
    Grid(GridArgs),

    /// Build the field described by a JSON config.
    Build {
        /// Path to the config.
        #[arg(long)]
        config: PathBuf,
    },

    /// Print world coordinates of pixels of a stored field.
    Inspect(InspectArgs),
}

#[derive(Debug, Clone, Args)]
struct OutputArgs {
    /// Path to write the binary field.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Path to write a checkerboard rendering (PNG, feature `image`).
    #[arg(long)]
    png: Option<PathBuf>,

    /// Directory to write the plain text table to.
    #[arg(long)]
    table_dir: Option<PathBuf>,

    /// Side of the rendered checkerboard squares in mm.
    #[arg(long, default_value_t = 1.0)]
    square_mm: f32,

    /// Path to write the build report (JSON). Printed to stdout otherwise.
    #[arg(long)]
    report: Option<PathBuf>,
}

impl OutputArgs {
    fn paths(&self) -> OutputPaths {
        OutputPaths {
            blob: self.out.clone(),
            checkerboard_png: self.png.clone(),
            table_dir: self.table_dir.clone(),
        }
    }
}

#[derive(Debug, Clone, Args)]
struct CoaxArgs {
    /// Coax parameters as JSON.
    #[arg(long)]
    params: PathBuf,

    /// Read a flat map of legacy key names instead of the JSON structure.
    #[arg(long)]
    legacy_keys: bool,

    /// Register an oriented line model per laser line.
    #[arg(long)]
    oriented: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Clone, Args)]
struct GridArgs {
    /// Corner CSV.
    #[arg(long)]
    csv: PathBuf,

    /// Keep cells as detected instead of rectifying them.
    #[arg(long)]
    no_rectify: bool,

    /// Leave the borders outside the corner grid not computed.
    #[arg(long)]
    no_extrapolate: bool,

    /// Maximum screen x drift of a chessboard column between rows.
    #[arg(long, default_value_t = DEFAULT_MAX_X_DELTA)]
    max_x_delta: i32,

    /// Snap corners to fitted row and column lines.
    #[arg(long)]
    linearize: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LineArg {
    Front,
    Behind,
    Center,
    All,
}

impl LineArg {
    fn lines(self) -> Vec<LaserLine> {
        match self {
            LineArg::Front => vec![LaserLine::Front],
            LineArg::Behind => vec![LaserLine::Behind],
            LineArg::Center => vec![LaserLine::Center],
            LineArg::All => LaserLine::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Args)]
struct InspectArgs {
    /// Binary field written by a build.
    #[arg(long)]
    field: PathBuf,

    /// Pixel as `x,y`; repeat for several pixels.
    #[arg(long = "pixel", value_parser = parse_pixel)]
    pixels: Vec<(i32, i32)>,

    #[arg(long, value_enum, default_value_t = LineArg::Front)]
    line: LineArg,
}

fn parse_pixel(s: &str) -> Result<(i32, i32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{s}`"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<i32>()
            .map_err(|e| format!("invalid coordinate `{v}`: {e}"))
    };
    Ok((parse(x)?, parse(y)?))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    #[cfg(feature = "tracing")]
    let use_tracing = cli.tracing;
    #[cfg(not(feature = "tracing"))]
    let use_tracing = false;

    if use_tracing {
        #[cfg(feature = "tracing")]
        lasercal::core::init_tracing(false);
    } else {
        init_with_level(level_from_verbosity(cli.verbose))?;
    }

    match cli.command {
        Commands::Coax(args) => run_coax(&args),
        Commands::Grid(args) => run_grid(&args),
        Commands::Build { config } => run_build(&config),
        Commands::Inspect(args) => run_inspect(&args),
    }
}

// ── builds ─────────────────────────────────────────────────────────────

fn read_coax_params(path: &Path, legacy_keys: bool) -> CliResult<CoaxCalibrationData> {
    let raw = fs::read_to_string(path)?;
    if legacy_keys {
        let keys: BTreeMap<String, f64> = serde_json::from_str(&raw)?;
        Ok(CoaxCalibrationData::from_parameters(&keys))
    } else {
        Ok(serde_json::from_str(&raw)?)
    }
}

fn run_coax(args: &CoaxArgs) -> CliResult<()> {
    let data = read_coax_params(&args.params, args.legacy_keys)?;
    for issue in data.check_consistency() {
        log::warn!("coax parameters: {issue}");
    }
    let mut field = CoordinateField::new();
    load_coax_model(&mut field, &data, args.oriented)?;
    finish(
        &field,
        &args.output.paths(),
        args.output.square_mm,
        args.output.report.as_deref(),
    )
}

fn run_grid(args: &GridArgs) -> CliResult<()> {
    log::info!("loading corners from {}", args.csv.display());
    let cam_grid = CamGridData::load_csv(&args.csv)?;
    let params = GridBuildParams {
        rectify: !args.no_rectify,
        extrapolate: !args.no_extrapolate,
        max_x_delta: args.max_x_delta,
        linearize: args.linearize,
    };
    let mut field = CoordinateField::new();
    load_cam_grid_data(&mut field, &cam_grid, &params)?;
    finish(
        &field,
        &args.output.paths(),
        args.output.square_mm,
        args.output.report.as_deref(),
    )
}

fn run_build(config_path: &Path) -> CliResult<()> {
    let config = CalibrationConfig::load_json(config_path)?;
    match &config.source {
        BuildSource::Coax { .. } => log::info!("building coax field"),
        BuildSource::Grid { csv, .. } => log::info!("building grid field from {}", csv.display()),
    }
    let field = config.build_field()?;
    finish(&field, &config.outputs, config.checkerboard_square_mm, None)
}

fn finish(
    field: &CoordinateField,
    outputs: &OutputPaths,
    square_mm: f32,
    report_path: Option<&Path>,
) -> CliResult<()> {
    let report = FieldReport::from_field(field);
    if report.discontinuities > 0 {
        log::warn!("{} pixels break the field layout", report.discontinuities);
    }

    if let Some(path) = &outputs.blob {
        save_field(field, path)?;
        log::info!("field written to {}", path.display());
    }
    if let Some(dir) = &outputs.table_dir {
        let path = field.coords_to_table_file(dir, "", 0, Roi::full(field.sensor_size()))?;
        log::info!("table written to {}", path.display());
    }
    if let Some(path) = &outputs.checkerboard_png {
        write_png(field, path, square_mm)?;
    }

    match report_path {
        Some(path) => {
            report.write_json(path)?;
            log::info!("report written to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

#[cfg(feature = "image")]
fn write_png(field: &CoordinateField, path: &Path, square_mm: f32) -> CliResult<()> {
    use lasercal::field::CoordinatePlane;

    let image = field.coords_to_checkerboard_image(
        Roi::full(field.sensor_size()),
        square_mm,
        CoordinatePlane::LaserPlane(LaserLine::Front),
    );
    lasercal::field::save_png(&image, path)?;
    log::info!("checkerboard written to {}", path.display());
    Ok(())
}

#[cfg(not(feature = "image"))]
fn write_png(_field: &CoordinateField, path: &Path, _square_mm: f32) -> CliResult<()> {
    Err(format!(
        "cannot write {}: built without the `image` feature",
        path.display()
    )
    .into())
}

// ── inspect ────────────────────────────────────────────────────────────

fn run_inspect(args: &InspectArgs) -> CliResult<()> {
    let field = load_field(&args.field)?;
    let size = field.sensor_size();
    println!(
        "field {}x{}, model {:?}, oriented lines: {}",
        size.width,
        size.height,
        field.sensor_model(),
        field.uses_oriented_line_calibration()
    );
    for &(x, y) in &args.pixels {
        for line in args.line.lines() {
            match field.to_3d(x, y, line) {
                Some(p) => println!("({x}, {y}) {line}: {:.4} {:.4} {:.4}", p.x, p.y, p.z),
                None => println!("({x}, {y}) {line}: invalid"),
            }
        }
    }
    Ok(())
}
