//! Headless driver: equilibrate a 2D Lennard-Jones crystal, optionally dilute it,
//! then average thermodynamic observables and classify the phase.

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::{debug, info};

use lj2d::io::{self, ObservableLog};
use lj2d::{MdConfig, ParticleSystem, ThermoAverages, ThermoSample};

/// Command-line arguments for a simulation run
#[derive(Parser, Debug)]
#[command(name = "lj2d")]
#[command(about = "2D Lennard-Jones molecular dynamics with velocity-Verlet", long_about = None)]
struct Args {
    /// Path to the YAML configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    config_file: Option<String>,

    /// Equilibrium records `x y vx vy` replacing the initial lattice
    #[arg(short, long)]
    load: Option<String>,

    /// Write the final state as equilibrium records (overrides config file)
    #[arg(short, long)]
    save: Option<String>,

    /// Write sampled observables as CSV (overrides config file)
    #[arg(long)]
    csv: Option<String>,

    /// Equilibration steps (overrides config file)
    #[arg(long)]
    equilibration_steps: Option<usize>,

    /// Averaging steps (overrides config file)
    #[arg(long)]
    averaging_steps: Option<usize>,

    /// Log every sampled frame
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

fn load_config(args: &Args) -> Result<MdConfig> {
    let mut config = match &args.config_file {
        Some(path) => {
            info!("Reading configuration from: {}", path);
            MdConfig::from_file(path)
                .wrap_err_with(|| format!("Unable to load configuration file: {}", path))?
        }
        None => MdConfig::default(),
    };

    if let Some(steps) = args.equilibration_steps {
        info!("Overriding equilibration_steps with: {}", steps);
        config.run.equilibration_steps = steps;
    }
    if let Some(steps) = args.averaging_steps {
        info!("Overriding averaging_steps with: {}", steps);
        config.run.averaging_steps = steps;
    }
    if let Some(path) = &args.save {
        config.output.equilibrium_out = Some(path.into());
    }
    if let Some(path) = &args.csv {
        config.output.observables_csv = Some(path.into());
    }

    config.validate().wrap_err("Invalid configuration")?;
    Ok(config)
}

/// Run `steps` integration steps, handing every full frame to `on_frame`
fn run_frames<F>(
    system: &mut ParticleSystem,
    steps: usize,
    substeps: usize,
    mut on_frame: F,
) -> Result<()>
where
    F: FnMut(&ParticleSystem) -> Result<()>,
{
    for step in 1..=steps {
        system
            .step()
            .wrap_err_with(|| format!("Integration failed at step {}", system.step_count() + 1))?;
        if step % substeps == 0 {
            on_frame(system)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    setup_logging(args.verbose);

    let config = load_config(&args)?;
    debug!("Configuration loaded:\n{:?}", config);

    let mut system = config.build_system().wrap_err("Failed to build particle system")?;
    if let Some(path) = &args.load {
        io::load_state(&mut system, path)
            .wrap_err_with(|| format!("Unable to load equilibrium state: {}", path))?;
    }

    system.accel().wrap_err("Initial force evaluation failed")?;
    info!(
        "N = {}, box = {:.4} x {:.4}, dt = {}, initial PE = {:.6}",
        system.n(),
        system.lx(),
        system.ly(),
        system.dt(),
        system.pe()
    );

    let substeps = config.run.substeps_per_frame;

    // Equilibration
    info!("Equilibrating for {} steps", config.run.equilibration_steps);
    run_frames(&mut system, config.run.equilibration_steps, substeps, |s| {
        debug!(
            "step {}: T = {:.5}, E = {:.6}",
            s.step_count(),
            s.temperature(),
            s.total_energy()
        );
        Ok(())
    })?;

    if let Some(factor) = config.run.rescale_factor {
        system.rescale_box(factor)?;
        system.reset_step_count();
        system.accel().wrap_err("Force evaluation after rescale failed")?;
        info!(
            "Rescaled box by {} to {:.4} x {:.4}",
            factor,
            system.lx(),
            system.ly()
        );
    }

    // Averaging
    let mut log = match &config.output.observables_csv {
        Some(path) => Some(
            ObservableLog::create(path)
                .wrap_err_with(|| format!("Unable to create {}", path.display()))?,
        ),
        None => None,
    };
    let mut averages = ThermoAverages::new();

    info!("Averaging for {} steps", config.run.averaging_steps);
    run_frames(&mut system, config.run.averaging_steps, substeps, |s| {
        let sample = ThermoSample::capture(s)?;
        debug!(
            "step {}: T = {:.5}, P = {:.5}, E = {:.6}",
            sample.step, sample.temperature, sample.pressure, sample.total_energy
        );
        averages.push(&sample);
        if let Some(log) = log.as_mut() {
            log.record(&sample)?;
        }
        Ok(())
    })?;
    if let Some(log) = log.as_mut() {
        log.flush()?;
    }

    if let (Some(t), Some(p), Some(pe), Some(ke)) = (
        averages.mean_temperature(),
        averages.mean_pressure(),
        averages.mean_pe(),
        averages.mean_ke(),
    ) {
        info!(
            "Averages over {} frames: T = {:.5}, P = {:.5}, PE = {:.6}, KE = {:.6}",
            averages.samples(),
            t,
            p,
            pe,
            ke
        );
    }

    let report = system.assess_phase(&config.phase)?;
    info!(
        "Phase: {} (KE/N = {:.5}, RDF peak = {:.3})",
        if report.solid { "solid" } else { "not solid" },
        report.mean_kinetic_energy,
        report.rdf_peak
    );

    if let Some(path) = &config.output.equilibrium_out {
        io::save_state(&system, path)
            .wrap_err_with(|| format!("Unable to save equilibrium state: {}", path.display()))?;
    }

    Ok(())
}
