use clap::{value_parser, Arg, Command};
use sca_core::test_harness::{run_simulator, SimulatorConfig};
use sca_probe::EnvironmentProbe;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Command::new("sca")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Scene Convergence Agents")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("simulate")
                .about("Run the convergence loop against scripted collaborators")
                .arg(
                    Arg::new("requirement")
                        .long("requirement")
                        .default_value("a cozy reading corner with warm lighting")
                        .help("Scene requirement fed to the loop"),
                )
                .arg(
                    Arg::new("components")
                        .long("components")
                        .default_value("armchair,reading_lamp,bookshelf")
                        .help("Comma-separated component names the scene must contain"),
                )
                .arg(
                    Arg::new("per-cycle")
                        .long("per-cycle")
                        .default_value("2")
                        .value_parser(value_parser!(usize))
                        .help("Subtasks proposed per planning call"),
                )
                .arg(
                    Arg::new("max-iters")
                        .long("max-iters")
                        .default_value("5")
                        .value_parser(value_parser!(u32))
                        .help("Iteration budget"),
                )
                .arg(
                    Arg::new("fail-at")
                        .long("fail-at")
                        .value_parser(value_parser!(usize))
                        .help("Inject a single command failure at this execution index"),
                )
                .arg(
                    Arg::new("fail-error")
                        .long("fail-error")
                        .default_value("poll() failed")
                        .help("Error message reported for the injected failure"),
                )
                .arg(
                    Arg::new("session-file")
                        .long("session-file")
                        .default_value("simulated_session.json")
                        .help("Where the session record is written"),
                ),
        )
        .subcommand(
            Command::new("analyze")
                .about("Analyze a scene description file and print the report")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .help("Path to a scene description (text or JSON)"),
                ),
        );

    match cli.get_matches().subcommand() {
        Some(("simulate", args)) => {
            let components: Vec<String> = args
                .get_one::<String>("components")
                .expect("defaulted")
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();

            let config = SimulatorConfig {
                requirement: args.get_one::<String>("requirement").expect("defaulted").clone(),
                components,
                subtasks_per_cycle: *args.get_one::<usize>("per-cycle").expect("defaulted"),
                fail_on_command: args.get_one::<usize>("fail-at").copied(),
                failure_message: args.get_one::<String>("fail-error").expect("defaulted").clone(),
                max_iterations: *args.get_one::<u32>("max-iters").expect("defaulted"),
                session_file: args
                    .get_one::<String>("session-file")
                    .expect("defaulted")
                    .into(),
                ..SimulatorConfig::default()
            };

            let report = run_simulator(config).await?;
            println!("{}", report.generate_text());
            std::process::exit(if report.converged() { 0 } else { 1 });
        }
        Some(("analyze", args)) => {
            let path = args.get_one::<String>("file").expect("required");
            let raw = std::fs::read_to_string(path)?;

            let report = EnvironmentProbe::new().analyze(&raw);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {}
    }

    Ok(())
}
