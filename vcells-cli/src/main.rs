//! Command-line driver for the `vcells` direct-neighbor Voronoi
//! tessellation engine.
//!
//! Parses the point cloud from `--infile` (whitespace-separated `x y z`
//! triples, one per line), dispatches to [`vcells::tessellate_with`], and
//! dumps the resulting ragged adjacency — one line per sorted point,
//! neighbor indices separated by single spaces — to `--outfile` or stdout.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use structopt::StructOpt;

use vcells::{Builder, DeviceKind, Point3};

/// Thin `FromStr` wrapper so `-x/--use-device` accepts `cpu`/`gpu` on the
/// command line while the library's own `DeviceKind` carries no string
/// parsing concerns.
#[derive(Clone, Copy, Debug)]
struct DeviceArg(DeviceKind);

impl FromStr for DeviceArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(DeviceArg(DeviceKind::Cpu)),
            "gpu" => Ok(DeviceArg(DeviceKind::Gpu)),
            other => anyhow::bail!("unknown device {:?}, expected \"cpu\" or \"gpu\"", other),
        }
    }
}

#[derive(StructOpt)]
#[structopt(
    name = "vcells",
    about = "Direct-neighbor Voronoi tessellation of a 3D point cloud",
    version_short = "v"
)]
struct Opt {
    /// Input file: whitespace-separated `x y z` per line, coords in (0,1).
    #[structopt(short = "i", long = "infile", parse(from_os_str))]
    infile: PathBuf,

    /// Output file; defaults to stdout.
    #[structopt(short = "o", long = "outfile", parse(from_os_str))]
    outfile: Option<PathBuf>,

    /// Execution path: "cpu" (multi-threaded host) or "gpu" (device
    /// emulation, see `vcells::backend::device`).
    #[structopt(short = "x", long = "use-device", default_value = "cpu")]
    use_device: DeviceArg,

    /// Initial k for kNN; 0 means "auto" (min(N, 64)).
    #[structopt(short = "k", long = "k-init", default_value = "0")]
    k_init: usize,

    /// kNN grid resolution G.
    #[structopt(short = "g", long = "grid-resolution", default_value = "16")]
    grid_resolution: usize,

    /// Host worker count; 0 means every hardware thread.
    #[structopt(short = "t", long = "cpu-nthreads", default_value = "0")]
    cpu_nthreads: usize,

    /// Device local work-group size.
    #[structopt(short = "d", long = "gpu-ndsize", default_value = "1")]
    gpu_ndsize: usize,

    /// Per-point plane capacity (`p_max`).
    #[structopt(short = "p", long = "p-maxsize", default_value = "32")]
    p_maxsize: usize,

    /// Per-point triangle capacity (`t_max`).
    #[structopt(short = "m", long = "t-maxsize", default_value = "32")]
    t_maxsize: usize,

    /// Point-batch size for chunked dispatch.
    #[structopt(short = "c", long = "chunksize", default_value = "8196")]
    chunksize: usize,

    /// Enable chunked dispatch.
    #[structopt(short = "u", long = "use-chunking")]
    use_chunking: bool,

    /// Retry capacity-overflowed points once with doubled caps.
    #[structopt(short = "r", long = "use-recompute")]
    use_recompute: bool,

    /// Show a progress bar during tessellation.
    #[structopt(long = "progress")]
    progress: bool,

    /// Minimum fraction (0.0-1.0) of points that must succeed for a zero
    /// exit code, exposed here for testing without recompiling.
    #[structopt(long = "fail-threshold", default_value = "0.99")]
    fail_threshold: f64,
}

fn load_points(path: &PathBuf) -> Result<Vec<Point3>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut points = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading line {} of {}", lineno + 1, path.display()))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut coords = line.split_whitespace();
        let x: f32 = coords
            .next()
            .with_context(|| format!("line {}: missing x coordinate", lineno + 1))?
            .parse()
            .with_context(|| format!("line {}: invalid x coordinate", lineno + 1))?;
        let y: f32 = coords
            .next()
            .with_context(|| format!("line {}: missing y coordinate", lineno + 1))?
            .parse()
            .with_context(|| format!("line {}: invalid y coordinate", lineno + 1))?;
        let z: f32 = coords
            .next()
            .with_context(|| format!("line {}: missing z coordinate", lineno + 1))?
            .parse()
            .with_context(|| format!("line {}: invalid z coordinate", lineno + 1))?;
        points.push(Point3::new(x, y, z));
    }
    Ok(points)
}

fn run() -> Result<bool> {
    let opt = Opt::from_args();

    let points = load_points(&opt.infile)?;
    tracing::info!(n_points = points.len(), path = %opt.infile.display(), "loaded input");

    let config = Builder::new()
        .k(opt.k_init)
        .device(opt.use_device.0)
        .cpu_nthreads(opt.cpu_nthreads)
        .gpu_ndsize(opt.gpu_ndsize)
        .chunksize(opt.chunksize)
        .use_chunking(opt.use_chunking)
        .use_recompute(opt.use_recompute)
        .knn_grid_resolution(opt.grid_resolution)
        .cc_p_maxsize(opt.p_maxsize)
        .cc_t_maxsize(opt.t_maxsize)
        .build();

    let progress = if opt.progress {
        Some(indicatif::ProgressBar::new(points.len() as u64))
    } else {
        None
    };

    let (adjacency, stats) = vcells::tessellate_with(points, config, progress)
        .context("tessellation failed")?;

    if stats.n_security_radius_reached > 0 {
        tracing::info!(
            n = stats.n_security_radius_reached,
            "points stopped early via security radius"
        );
    }
    if stats.n_p_overflow > 0 {
        eprintln!("{} points exceeded plane capacity (p_max)", stats.n_p_overflow);
    }
    if stats.n_t_overflow > 0 {
        eprintln!(
            "{} points exceeded triangle capacity (t_max)",
            stats.n_t_overflow
        );
    }
    if stats.n_infinite_boundary > 0 {
        eprintln!(
            "{} points failed boundary extraction",
            stats.n_infinite_boundary
        );
    }
    tracing::info!(
        n_points = stats.n_points,
        n_fatal = stats.n_fatal(),
        success_fraction = stats.success_fraction(),
        "tessellation complete"
    );

    match &opt.outfile {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            adjacency.write_lines(BufWriter::new(file))?;
        }
        None => {
            let stdout = io::stdout();
            adjacency.write_lines(BufWriter::new(stdout.lock()))?;
        }
    }

    Ok(stats.success_fraction() >= opt.fail_threshold)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(true) => Ok(()),
        Ok(false) => {
            eprintln!("tessellation did not meet the success threshold");
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}
