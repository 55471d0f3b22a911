#[cfg(not(feature = "std"))]
fn main() {}

#[cfg(feature = "std")]
use zk_battleships::{
    init_logging,
    simulation::{LocalMatch, MatchConfig},
    RecordId,
};

#[cfg(feature = "std")]
use clap::Parser;
#[cfg(feature = "std")]
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[cfg(feature = "std")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
#[cfg(feature = "std")]
enum Commands {
    /// Play a simulated match between two local peers.
    Local {
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
        #[arg(long, default_value_t = 20, help = "Monitor poll interval in milliseconds")]
        poll_ms: u64,
        #[arg(long, default_value_t = 0, help = "Replication lag between peers in milliseconds")]
        lag_ms: u64,
        #[arg(long, default_value_t = 0, help = "Simulated proving time in milliseconds")]
        prove_ms: u64,
        #[arg(long, default_value_t = 100, help = "Shots per player before the match is called off")]
        max_rounds: usize,
    },
}

#[cfg(feature = "std")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Local {
            seed,
            poll_ms,
            lag_ms,
            prove_ms,
            max_rounds,
        } => {
            let seed = match seed {
                Some(s) => {
                    println!("Using fixed seed: {} (game will be reproducible)", s);
                    s
                }
                None => rand::random(),
            };
            let config = MatchConfig {
                seed,
                poll_interval: Duration::from_millis(poll_ms.max(1)),
                replication_lag: Duration::from_millis(lag_ms),
                prove_delay: Duration::from_millis(prove_ms),
                max_rounds,
            };
            println!("Starting local match...");
            let game = LocalMatch::setup(config).await?;
            let summary = game.play().await?;
            print_boards(&game, game.invite).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

#[cfg(feature = "std")]
async fn print_boards(game: &LocalMatch, invite: RecordId) -> anyhow::Result<()> {
    for (name, client) in [("HOME", &game.home), ("AWAY", &game.away)] {
        let views = client.board_views(invite).await?;
        println!("\n{} fleet:\n{}", name, views.own);
    }
    Ok(())
}
