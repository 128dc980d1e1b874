//! chartpipe CLI - package, test and publish a Helm chart from throwaway containers

use chartpipe_core::TestMode;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod error;
mod exit_codes;

use commands::Settings;
use error::{CliError, Result};

#[derive(Parser)]
#[command(name = "chartpipe")]
#[command(author = "chartpipe Contributors")]
#[command(version)]
#[command(about = "Package, test and publish a Helm chart to an OCI registry", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Chart source directory
    #[arg(long, global = true)]
    chart_dir: Option<PathBuf>,

    /// Values file, relative to the chart directory
    #[arg(long, global = true)]
    values_file: Option<PathBuf>,

    /// Directory packaged archives are written to
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Registry host (overrides CONTAINER_REGISTRY)
    #[arg(long, global = true)]
    registry: Option<String>,

    /// Registry user (overrides CONTAINER_REGISTRY_USER)
    #[arg(long, global = true)]
    registry_user: Option<String>,

    /// What the test stage does
    #[arg(long, global = true, value_enum)]
    test_mode: Option<TestModeArg>,

    /// Docker-compatible client used to run containers
    #[arg(
        long,
        global = true,
        env = "CHARTPIPE_CONTAINER_CLI",
        default_value = "docker"
    )]
    container_cli: String,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Stamp the version into the values file and package the chart
    Package {
        /// Chart version tag
        tag: String,
    },

    /// Run chart tests
    Test {
        /// Chart version tag
        tag: String,
    },

    /// Package the chart and push it to the registry
    Publish {
        /// Chart version tag
        tag: String,
    },

    /// Package, test and publish
    All {
        /// Chart version tag
        tag: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TestModeArg {
    /// Skip chart tests
    Noop,
    /// Run `helm lint` against the chart
    Lint,
}

impl From<TestModeArg> for TestMode {
    fn from(value: TestModeArg) -> Self {
        match value {
            TestModeArg::Noop => TestMode::Noop,
            TestModeArg::Lint => TestMode::Lint,
        }
    }
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_tracing(cli.debug);

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(debug: bool) {
    let default = if debug {
        "chartpipe=debug,chartpipe_core=debug"
    } else {
        "chartpipe=info,chartpipe_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings {
        config: cli.config,
        chart_dir: cli.chart_dir,
        values_file: cli.values_file,
        output_dir: cli.output_dir,
        registry: cli.registry,
        registry_user: cli.registry_user,
        test_mode: cli.test_mode.map(Into::into),
        container_cli: cli.container_cli,
    };

    // Stages run strictly one after another
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::internal(format!("failed to start runtime: {}", e)))?;

    runtime.block_on(async {
        let command = async {
            match &cli.command {
                Commands::Package { tag } => commands::package::run(&settings, tag).await,
                Commands::Test { tag } => commands::test::run(&settings, tag).await,
                Commands::Publish { tag } => commands::publish::run(&settings, tag).await,
                Commands::All { tag } => commands::all::run(&settings, tag).await,
            }
        };

        // Dropping the command future releases its environments
        tokio::select! {
            result = command => result,
            _ = tokio::signal::ctrl_c() => Err(CliError::Cancelled),
        }
    })
}
