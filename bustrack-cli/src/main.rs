//! bustrack CLI - Command-line interface
//!
//! Front end to the bustrack library: follow a route's bus live, manage the
//! config file, and inspect encoded route polylines.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::polyline::PolylineArgs;
use commands::track::TrackArgs;

#[derive(Parser)]
#[command(name = "bustrack")]
#[command(version = bustrack::VERSION)]
#[command(about = "Live school-bus tracking with stop proximity alerts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow a route's bus and alert when it nears your stop
    Track(TrackArgs),

    /// Manage ~/.bustrack/config.ini
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Decode an encoded route polyline
    Polyline(PolylineArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Track(args) => commands::track::run(args),
        Commands::Config(command) => commands::config::run(command),
        Commands::Polyline(args) => commands::polyline::run(args),
    };

    if let Err(e) = result {
        e.exit();
    }
}
