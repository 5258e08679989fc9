use std::{path::Path, time::Instant};

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use log::info;

use crate::{
    error::{Error, Result},
    simulation_parameters::SimulationParams,
    write_statistics, ChannelSimulation,
};

const CARGO_PKG_AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
const CARGO_PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

pub fn start() -> Result<()> {
    let matches = App::new("MPCD Channel Simulation")
        .version(CARGO_PKG_VERSION)
        .author(CARGO_PKG_AUTHORS)
        .about(CARGO_PKG_DESCRIPTION)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .help("Sets the level of verbosity"),
        )
        .subcommand(
            SubCommand::with_name("run")
                .about("Run simulation with given config")
                .arg(
                    Arg::with_name("SIMULATION_CONFIG")
                        .help("Sets the simulation paramaters")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::with_name("STEPS")
                        .long("steps")
                        .short("n")
                        .takes_value(true)
                        .default_value("1000")
                        .help("Number of streaming steps"),
                )
                .arg(
                    Arg::with_name("REPORT_INTERVAL")
                        .long("report-interval")
                        .short("r")
                        .takes_value(true)
                        .default_value("100")
                        .help("Log channel statistics every N steps"),
                )
                .arg(
                    Arg::with_name("OVERWRITE_CONFIG_FILE")
                        .long("overwrite-config-file")
                        .short("c")
                        .required(false)
                        .takes_value(true)
                        .help("Overwrite config"),
                )
                .arg(
                    Arg::with_name("STATISTICS_ENABLED")
                        .help("Track performance of individual steps")
                        .short("p")
                        .long("statistics-enabled")
                        .takes_value(false),
                )
                .arg(
                    Arg::with_name("STATISTICS_PATH")
                        .long("statistics-path")
                        .short("w")
                        .required(false)
                        .takes_value(true)
                        .help("Where to write statistics to"),
                ),
        )
        .get_matches();

    init_logger(matches.occurrences_of("v"));

    if let Some(run_matches) = matches.subcommand_matches("run") {
        run(run_matches)?;
    }
    Ok(())
}

fn init_logger(verbosity: u64) {
    let default_filter = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();
}

fn parse_arg<T: std::str::FromStr>(matches: &ArgMatches, name: &str) -> Result<T> {
    let value = matches
        .value_of(name)
        .ok_or_else(|| Error::InvalidParam(format!("missing argument {}", name)))?;
    value
        .parse::<T>()
        .map_err(|_| Error::InvalidParam(format!("invalid value for {}: '{}'", name, value)))
}

fn run(run_matches: &ArgMatches) -> Result<()> {
    let parameter_file = run_matches
        .value_of("SIMULATION_CONFIG")
        .ok_or_else(|| Error::InvalidParam("missing simulation config".into()))?;
    let overwrite_file = run_matches.value_of("OVERWRITE_CONFIG_FILE").map(Path::new);
    let steps: u64 = parse_arg(run_matches, "STEPS")?;
    let report_interval: u64 = parse_arg::<u64>(run_matches, "REPORT_INTERVAL")?.max(1);
    let counters_enabled = run_matches.is_present("STATISTICS_ENABLED");

    let simulation_params = SimulationParams::load(Path::new(parameter_file), overwrite_file)?;
    info!("{:?}", simulation_params);

    let mut simulation = ChannelSimulation::new(simulation_params, counters_enabled)?;

    let start_time = Instant::now();
    for _ in 0..steps {
        simulation.step()?;

        if simulation.timestep() % report_interval == 0 {
            let virtual_count = simulation.last_fill().map(|r| r.total()).unwrap_or(0);
            info!(
                "step {}: <vx>={:.5} kT={:.5} virtual={} collisions={}",
                simulation.timestep(),
                simulation.mean_velocity_x(),
                simulation.kinetic_temperature(),
                virtual_count,
                simulation.last_stream().collisions,
            );
        }
    }
    info!(
        "finished {} steps in {:.3}s",
        steps,
        start_time.elapsed().as_secs_f64()
    );

    if counters_enabled {
        let s = write_statistics(&simulation);
        print!("{}", s);
        if let Some(statistics_path) = run_matches.value_of("STATISTICS_PATH") {
            std::fs::write(statistics_path, s)?;
        }
    }

    Ok(())
}
