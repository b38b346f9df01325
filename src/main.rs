use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};

use ralph::commands::init::InitArgs;
use ralph::commands::run::RunArgs;
use ralph::commands::status::StatusArgs;
use ralph::{commands, error, telemetry};

#[derive(Debug, Parser)]
#[command(
    name = "ralph",
    version,
    about = "Ralph - Autonomous Coding Agent Loop",
    after_help = "Examples:
  ralph init                Initialize a new project
  ralph run                 Run coding loop (10 iterations)
  ralph run -n 5            Run 5 iterations
  ralph run --model sonnet  Use sonnet model"
)]
struct Cli {
    /// Project directory holding prompts, prd.json and the init marker
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Initialize a new project (interactive, runs once)
    Init(InitArgs),
    /// Run the coding loop
    Run(RunArgs),
    /// Show initialization and story progress
    Status(StatusArgs),
    /// Print the JSON Schema for .ralph.toml
    Schema,
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::Run(_) => "run",
            Self::Status(_) => "status",
            Self::Schema => "schema",
        }
    }
}

fn main() -> ExitCode {
    telemetry::init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    };

    let _span = tracing::info_span!("command", name = command.name()).entered();

    let result = match command {
        Commands::Init(args) => args.execute(cli.project_root),
        Commands::Run(args) => args.execute(cli.project_root),
        Commands::Status(args) => args.execute(cli.project_root),
        Commands::Schema => commands::schema::run_schema(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(exit_err) = e.downcast_ref::<error::ExitError>() {
                eprintln!("error: {exit_err}");
                exit_err.exit_code()
            } else {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        }
    }
}
