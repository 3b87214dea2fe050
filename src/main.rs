/*!
 * Bardsong CLI - Command Line Interface
 *
 * Thin inbound boundary over `DescriptionService`: parses the request,
 * prints the response document and maps failures to exit codes.
 */

use anyhow::Context;
use bardsong::{
    config::BardConfig,
    error::{EXIT_CONFIG, EXIT_FAILURE, EXIT_NOT_FOUND, EXIT_SUCCESS},
    logging, normalize_species_name, DescriptionService, Failure,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;

#[derive(Parser)]
#[command(name = "bardsong")]
#[command(version, about = "Species descriptions, retold in the style of the bard", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Debug logging (overrides logging.level)
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe a species by name or id
    Describe {
        /// Species name or numeric id
        name: String,

        /// Pick a random description instead of the first one
        #[arg(long)]
        random: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let code = match cli.command {
        Commands::Config => match config.to_toml() {
            Ok(rendered) => {
                print!("{}", rendered);
                EXIT_SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                EXIT_CONFIG
            }
        },
        Commands::Describe { name, random } => {
            if let Err(e) = logging::init_logging(&config.logging, cli.verbose) {
                eprintln!("Error: {}", e);
                std::process::exit(EXIT_CONFIG);
            }
            run_describe(config, &name, random)
        }
    };
    std::process::exit(code);
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<BardConfig> {
    match path {
        Some(path) => BardConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(BardConfig::default()),
    }
}

fn run_describe(mut config: BardConfig, raw_name: &str, random: bool) -> i32 {
    let Some(name) = normalize_species_name(raw_name) else {
        eprintln!("Error: species name must not be blank");
        return EXIT_NOT_FOUND;
    };
    if random {
        config.random_description = true;
    }

    let service = match DescriptionService::from_config(&config) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_CONFIG;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            return EXIT_FAILURE;
        }
    };

    let outcome = runtime.block_on(async {
        tokio::select! {
            outcome = service.describe_response(&name) => Some(outcome),
            _ = tokio::signal::ctrl_c() => None,
        }
    });

    match outcome {
        Some(Ok(response)) => match serde_json::to_string_pretty(&response) {
            Ok(json) => {
                println!("{}", json);
                EXIT_SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                EXIT_FAILURE
            }
        },
        Some(Err(failure)) => report(&name, &failure),
        None => {
            eprintln!("Cancelled");
            EXIT_FAILURE
        }
    }
}

fn report(name: &str, failure: &Failure) -> i32 {
    if failure.is_defect() {
        error!(species = name, kind = failure.kind(), error = %failure, "Description failed");
    }
    match failure {
        Failure::NotFound => eprintln!("Error: {} is not a valid species", name),
        other => eprintln!("Error: {}", other),
    }
    failure.exit_code()
}
