use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod sync;

use commands::{
    ConfigCommand, DietCommand, FavoriteCommand, HydrationCommand, MealCommand, MealTypeCommand,
    SyncCommand,
};
use config::Config;

#[derive(Parser)]
#[command(name = "dietsync")]
#[command(version)]
#[command(about = "Offline-first diet planner with multi-device sync", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log sync activity to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the diet slots
    Diet(DietCommand),

    /// Add and remove meal entries in the active diet
    Meal(MealCommand),

    /// Manage the meal types of the active diet
    MealType(MealTypeCommand),

    /// Toggle or list favorite foods
    Favorite(FavoriteCommand),

    /// Show or set the daily hydration goal
    Hydration(HydrationCommand),

    /// Sync with the remote store
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config)?;

    let Some(command) = cli.command else {
        println!("Use --help to see available commands");
        return Ok(());
    };

    match command {
        Commands::Config(cmd) => cmd.run(&config)?,
        Commands::Sync(cmd) => {
            let engine = sync::open_engine(&config);
            cmd.run(&engine, &config).await?;
        }
        command => {
            let engine = sync::open_engine(&config);
            sync::try_auto_pull(&engine, &config).await;

            execute_command(&command, &engine)?;

            if config.sync.auto_sync {
                sync::try_auto_push(&engine).await;
            }
        }
    }

    Ok(())
}

fn execute_command(command: &Commands, engine: &sync::Engine) -> Result<(), commands::CommandError> {
    match command {
        Commands::Diet(cmd) => cmd.run(engine),
        Commands::Meal(cmd) => cmd.run(engine),
        Commands::MealType(cmd) => cmd.run(engine),
        Commands::Favorite(cmd) => cmd.run(engine),
        Commands::Hydration(cmd) => cmd.run(engine),
        Commands::Sync(_) | Commands::Config(_) => Ok(()),
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "dietsync=debug,dietsync_core=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
