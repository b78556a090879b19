//! Simulate scintillation light and ionization charge arrival times for a
//! stream of events.
//!
//! ```bash
//! scint events.jsonl geometry.txt 0.4 out.jsonl
//! scint events.jsonl geometry.txt 0.4 - false --medium xenon --seed 7
//! ```
use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use env_logger::Env;
use scint::config::RunConfig;
use scint::deposit::read_events;
use scint::emission::Medium;
use scint::geometry::load_geometry;
use scint::output::JsonLinesWriter;
use scint::statistics::CountSampling;
use scint::Simulation;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use uom::si::f64::Length;
use uom::si::length::centimeter;

/// Scintillation light and charge timing simulation
#[derive(Parser, Debug)]
#[command(name = "scint", version)]
#[command(about = "Simulate photon and electron arrival times at a sensor array")]
struct Args {
    /// JSON stream of events (`-` for stdin)
    event_source: PathBuf,
    /// Sensor geometry file
    geometry: PathBuf,
    /// Sensor pixel edge in cm
    pixel_size: f64,
    /// Output JSON Lines file (`-` for stdout)
    output: PathBuf,
    /// Copy each input record into its output line
    #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new(), default_value = "true")]
    include_input: bool,

    /// Run seed (random when omitted)
    #[arg(long)]
    seed: Option<u64>,
    /// Worker threads (all cores when omitted)
    #[arg(long)]
    threads: Option<usize>,
    /// Events simulated concurrently
    #[arg(long, default_value = "64")]
    batch_size: usize,
    /// Drift electrons without diffusion
    #[arg(long)]
    no_diffusion: bool,
    /// Scintillating medium: argon or xenon
    #[arg(long, default_value = "argon")]
    medium: Medium,
    /// Count realisation: truncate or poisson
    #[arg(long, default_value = "truncate")]
    counts: CountSampling,
    /// Half-width of the charge footprint around a sensor, in cm
    #[arg(long, default_value = "5.0")]
    charge_window: f64,
    /// Drift field in kV/cm
    #[arg(long, default_value = "0.5")]
    field: f64,
    /// Photon detection efficiency
    #[arg(long, default_value = "0.4")]
    quantum_efficiency: f64,
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if path == Path::new("-") {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path)
        .with_context(|| format!("failed to open event source `{}`", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_output(path: &Path) -> Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    }
    let file = File::create(path)
        .with_context(|| format!("failed to create output file `{}`", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn run(args: Args) -> Result<()> {
    let sensors = load_geometry(&args.geometry)
        .with_context(|| format!("failed to load geometry `{}`", args.geometry.display()))?;

    let config = RunConfig::builder()
        .pixel_size(Length::new::<centimeter>(args.pixel_size))
        .medium(args.medium)
        .diffusion(!args.no_diffusion)
        .count_sampling(args.counts)
        .quantum_efficiency(args.quantum_efficiency)
        .field(args.field)
        .charge_half_width(Length::new::<centimeter>(args.charge_window))
        .include_input(args.include_input)
        .maybe_seed(args.seed)
        .maybe_threads(args.threads)
        .batch_size(args.batch_size)
        .build();
    log::info!(
        "{} medium, {} counts, pixel size {} cm",
        config.medium,
        config.count_sampling,
        args.pixel_size
    );

    let events = read_events(open_input(&args.event_source)?);
    let writer = JsonLinesWriter::new(open_output(&args.output)?);

    let simulation = Simulation::builder()
        .add_sensors(sensors)
        .config(config)
        .observer(writer)
        .build()
        .context("invalid run configuration")?;
    let seed = simulation.seed();
    simulation
        .run(events)
        .with_context(|| format!("simulation failed (seed {seed})"))?;

    Ok(())
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
