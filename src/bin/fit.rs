//! Fit a state-transition model to a flight log.
//!
//! Usage:
//!   sysid_fit <flight.csv> --write <model.json> [OPTIONS]
//!
//! Examples:
//!   # Built-in fixed wing state list, two flap settings
//!   sysid_fit flight.csv --write model.json
//!
//!   # Custom states and per-step CSV dumps
//!   sysid_fit flight.csv --write model.yaml --config sysid.yaml --dump-fits fits/

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flyer_sysid::{
    resources::{SysIdConfig, SysIdConfigBuilder, VehicleType},
    systems::{ConditionEvaluator, CsvDumpObserver, FlightLog, TracingObserver, TrainingDataBuilder},
    FlightCondition,
};

#[derive(Parser)]
#[command(name = "sysid_fit")]
#[command(about = "Fit a linear state-transition model to flight data")]
#[command(version)]
struct Args {
    /// Flight data log (CSV)
    flight: PathBuf,

    /// Model file to write (.json, .yaml or .yml)
    #[arg(long)]
    write: PathBuf,

    /// System identification config (YAML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Vehicle type represented by the log (wing, quad)
    #[arg(long)]
    vehicle: Option<VehicleType>,

    /// Invert direction of elevator
    #[arg(long)]
    invert_elevator: bool,

    /// Invert direction of rudder
    #[arg(long)]
    invert_rudder: bool,

    /// Write signal and estimate of every selection step to this directory
    #[arg(long)]
    dump_fits: Option<PathBuf>,

    /// Stop selection after this many terms
    #[arg(long)]
    max_terms: Option<usize>,
}

fn default_config() -> flyer_sysid::Result<SysIdConfig> {
    SysIdConfigBuilder::new()
        .vehicle(VehicleType::Wing)
        .inceptors(&["aileron", "elevator", "rudder", "throttle"])
        .direct(&[
            "p",
            "q",
            "r",
            "ax",
            "ay",
            "az",
            "bgx",
            "bgy",
            "bgz",
            "alpha_dot",
            "alpha_deg",
            "beta_deg",
            "airspeed_mps",
        ])
        .terms(&[
            "qbar",
            "aileron*qbar",
            "abs(aileron)*qbar",
            "elevator*qbar",
            "abs(elevator)*qbar",
            "rudder*qbar",
            "abs(rudder)*qbar",
            "sin(alpha_deg_prev1)*qbar",
            "sin(beta_deg_prev1)*qbar",
            "ax_prev1",
            "ay_prev1",
            "az_prev1",
            "p_prev1",
            "q_prev1",
            "r_prev1",
            "abs(ay)",
            "abs(bgy)",
        ])
        .outputs(&["p"])
        .condition(FlightCondition::new().with("flaps", 0.0))
        .condition(FlightCondition::new().with("flaps", 0.5))
        .build()
}

fn load_config(args: &Args) -> flyer_sysid::Result<SysIdConfig> {
    let mut config = match &args.config {
        Some(path) => SysIdConfig::from_file(path)?,
        None => default_config()?,
    };
    if let Some(vehicle) = args.vehicle {
        config.vehicle = vehicle;
    }
    config.invert_elevator |= args.invert_elevator;
    config.invert_rudder |= args.invert_rudder;
    if let Some(max_terms) = args.max_terms {
        config.selector = config.selector.with_max_terms(max_terms);
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let log = FlightLog::from_csv_path(&args.flight)?;
    let builder = TrainingDataBuilder::new(log, &config)?;

    info!("Conditions report:");
    for (i, condition) in config.conditions.iter().enumerate() {
        match builder.sample_mask(condition) {
            Ok(mask) => info!(
                "{} {}: {} states, {} samples",
                i,
                condition,
                config.train_states().len(),
                mask.iter().filter(|&&m| m).count()
            ),
            Err(e) => warn!("{} {}: {}", i, condition, e),
        }
    }

    let evaluator = ConditionEvaluator::new(config);
    let report = match &args.dump_fits {
        Some(dir) => {
            if evaluator.config().parallel_conditions {
                warn!("--dump-fits evaluates conditions sequentially");
            }
            let mut observer = CsvDumpObserver::new(dir)?;
            let report = evaluator.evaluate_observed(&builder, &mut observer)?;
            info!("wrote {} fit dumps to {}", observer.written().len(), dir.display());
            report
        }
        None if evaluator.config().parallel_conditions => evaluator.evaluate(&builder)?,
        None => evaluator.evaluate_observed(&builder, &mut TracingObserver)?,
    };

    for failure in &report.failures {
        info!(
            "condition {} ({}) not fitted: {}",
            failure.index, failure.condition, failure.error
        );
    }

    report.record.save(&args.write)?;
    info!(
        "wrote {} with {} of {} conditions",
        args.write.display(),
        report.record.conditions.len(),
        evaluator.config().conditions.len()
    );
    Ok(())
}
