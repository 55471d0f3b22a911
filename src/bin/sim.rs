use std::time::Duration;

use serde_json::json;
use zk_battleships::simulation::{LocalMatch, MatchConfig};

/// Play one seeded match per argument and print a JSON summary line each.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <seed> [<seed> ...]", args[0]);
        std::process::exit(1);
    }

    for arg in &args[1..] {
        let seed: u64 = arg.parse()?;
        let config = MatchConfig {
            seed,
            poll_interval: Duration::from_millis(5),
            ..MatchConfig::default()
        };
        let game = LocalMatch::setup(config).await?;
        let summary = game.play().await?;
        let result = json!({
            "seed": seed,
            "winner": summary.winner,
            "home": summary.home,
            "away": summary.away,
        });
        println!("{}", serde_json::to_string(&result)?);
    }
    Ok(())
}
