use anyhow::Context;
use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;
use tagsync_core::test_harness::{run_simulation, SimulationConfig};
use tagsync_core::SyncConfig;
use tracing_subscriber::EnvFilter;

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("TOML file overriding the default sync configuration")
}

fn load_config(args: &ArgMatches) -> anyhow::Result<SyncConfig> {
    match args.get_one::<PathBuf>("config") {
        Some(path) => SyncConfig::load(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(SyncConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Command::new("tagsync")
        .version(tagsync_core::VERSION)
        .about("Chunked entry synchronizer")
        .subcommand_required(true)
        .subcommand(
            Command::new("simulate")
                .about("Run a seeded save simulation against an in-memory store")
                .arg(
                    Arg::new("entries")
                        .long("entries")
                        .default_value("250")
                        .value_parser(value_parser!(usize))
                        .help("Number of entries to create"),
                )
                .arg(
                    Arg::new("deletes")
                        .long("deletes")
                        .default_value("40")
                        .value_parser(value_parser!(usize))
                        .help("Number of persisted entries to delete"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("failure-rate")
                        .long("failure-rate")
                        .default_value("0.05")
                        .value_parser(value_parser!(f64))
                        .help("Probability that the store rejects an update"),
                )
                .arg(
                    Arg::new("transport-failure-rate")
                        .long("transport-failure-rate")
                        .default_value("0.05")
                        .value_parser(value_parser!(f64))
                        .help("Probability that a batch call fails outright"),
                )
                .arg(
                    Arg::new("max-rounds")
                        .long("max-rounds")
                        .default_value("50")
                        .value_parser(value_parser!(usize))
                        .help("Save attempts per phase before giving up"),
                )
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("config")
                .about("Print the effective sync configuration")
                .arg(config_arg()),
        );

    let matches = cli.get_matches();

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let config = SimulationConfig {
                seed: args.get_one::<u64>("seed").copied().unwrap_or(42),
                entries: args.get_one::<usize>("entries").copied().unwrap_or(250),
                deletes: args.get_one::<usize>("deletes").copied().unwrap_or(40),
                failure_rate: args.get_one::<f64>("failure-rate").copied().unwrap_or(0.05),
                transport_failure_rate: args
                    .get_one::<f64>("transport-failure-rate")
                    .copied()
                    .unwrap_or(0.05),
                max_rounds: args.get_one::<usize>("max-rounds").copied().unwrap_or(50),
                sync: load_config(args)?,
            };

            let report = run_simulation(config).await?;
            println!("{}", report.generate_text());

            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("config", args)) => {
            let config = load_config(args)?;
            print!("{}", config.to_toml_string()?);
        }
        _ => {}
    }
    Ok(())
}
