//! Offline inspection of the settled-round history.

use clap::Parser;
use tombola::history::RoundStore;

#[derive(Parser)]
#[command(name = "inspect-rounds", about = "Print settled raffle rounds")]
struct Args {
    /// Data directory of the round history store
    #[arg(long, default_value = "./tombola_data")]
    data_dir: String,

    /// Maximum number of rounds to print, newest first
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let store = RoundStore::open_read_only(&args.data_dir)?;
    let rounds = store.load_recent(args.limit)?;

    if rounds.is_empty() {
        println!("no settled rounds in {}", args.data_dir);
        return Ok(());
    }

    for round in rounds {
        println!(
            "request {:>6}  winner {:<44}  pot {:>12}  players {:>3}  decided_at {}",
            round.request_id, round.winner, round.pot, round.player_count, round.decided_at,
        );
        println!("               vrf_output {}", round.vrf_output);
    }

    Ok(())
}
