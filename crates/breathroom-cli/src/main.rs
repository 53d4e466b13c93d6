use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "breathroom", version, about = "Breathroom guided breathing timer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a live guided session
    Breathe(commands::breathe::BreatheArgs),
    /// Replay a session on a virtual clock
    Simulate(commands::simulate::SimulateArgs),
    /// Technique listing and validation
    Technique {
        #[command(subcommand)]
        action: commands::technique::TechniqueAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Logs go to stderr so JSON output on stdout stays clean. `RUST_LOG` overrides.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Breathe(args) => commands::breathe::run(args),
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Technique { action } => commands::technique::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
