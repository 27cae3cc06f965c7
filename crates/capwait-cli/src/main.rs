use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "capwait",
    about = "capwait — wait for auto-scaling group capacity",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a single recorded poll against a group configuration
    Evaluate {
        /// Group configuration (TOML)
        #[arg(short, long)]
        config: String,
        /// Recorded poll (JSON object with `group` and `attachments`)
        #[arg(short, long)]
        snapshot: String,
        /// Convergence rule to apply
        #[arg(short, long, value_enum, default_value = "create")]
        mode: CapacityMode,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Replay a recorded poll sequence through the waiter on virtual time.
    ///
    /// The last recorded poll repeats until the wait converges, times out,
    /// or the group disappears. Exits non-zero on timeout or failure.
    Replay {
        /// Group configuration (TOML)
        #[arg(short, long)]
        config: String,
        /// Recorded polls (JSON array)
        #[arg(short, long)]
        polls: String,
        /// Group identifier (default: taken from the first recorded snapshot)
        #[arg(short, long)]
        group: Option<String>,
        /// What to wait for
        #[arg(short, long, value_enum, default_value = "create")]
        mode: ReplayMode,
        /// Member count to wait for in scale-down mode
        /// (default: desired_capacity from the configuration)
        #[arg(short, long)]
        want: Option<u32>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CapacityMode {
    /// At least the minimum, or the desired count when one is set
    Create,
    /// Exactly the desired count
    Update,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReplayMode {
    Create,
    Update,
    /// Wait until the group shrinks to the wanted member count
    ScaleDown,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("capwait=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate { config, snapshot, mode, format } => {
            commands::evaluate::evaluate(&config, &snapshot, mode, &format)
        }
        Commands::Replay { config, polls, group, mode, want } => {
            commands::replay::replay(&config, &polls, group.as_deref(), mode, want).await
        }
    }
}
