//! Chicken Race
//!
//! Command line front end: plays races and runs the stores against a JSON
//! save file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use chicken_race::{
    economy::store::DEFAULT_STATE_FILE,
    BoosterFlags, BoosterKind, DeterministicRng, GameConfig, JsonFileStore, Ledger, RaceEngine,
    RacerId, VERSION,
};

#[derive(Debug, Parser)]
#[command(name = "chicken-race", version, about = "Pick a chicken, race, collect points")]
struct Opts {
    /// Save file holding points, boosters and backgrounds
    #[arg(short, long, default_value = DEFAULT_STATE_FILE)]
    state: PathBuf,

    /// Optional JSON file overriding race and economy settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the race RNG (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one race
    Race {
        /// Champion lane (1 or 2)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=2))]
        racer: u8,

        /// Spend an x2 booster
        #[arg(long)]
        x2: bool,

        /// Spend a guaranteed-win booster
        #[arg(long)]
        guaranteed: bool,

        /// Real seconds waited per race second (0 settles immediately)
        #[arg(long, default_value_t = 0.1)]
        time_scale: f64,
    },
    /// Buy one booster
    BuyBooster {
        /// Booster type
        #[arg(value_enum)]
        kind: BoosterArg,
    },
    /// Buy a background and make it active
    BuyBackground {
        /// Background id from the catalog
        id: u32,
    },
    /// Make an owned background active
    SelectBackground {
        /// Background id from the catalog
        id: u32,
    },
    /// List backgrounds and boosters
    Catalog,
    /// Show statistics
    Stats,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BoosterArg {
    X2,
    Guaranteed,
}

impl From<BoosterArg> for BoosterKind {
    fn from(arg: BoosterArg) -> Self {
        match arg {
            BoosterArg::X2 => BoosterKind::DoublePoints,
            BoosterArg::Guaranteed => BoosterKind::GuaranteedWin,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let opts = Opts::parse();
    info!("Chicken Race v{}", VERSION);

    let config = match &opts.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };

    let store = JsonFileStore::new(&opts.state);
    let mut ledger = Ledger::load(store, config.economy.clone())
        .with_context(|| format!("Failed to load save file {}", opts.state.display()))?;

    match opts.command {
        Command::Race { racer, x2, guaranteed, time_scale } => {
            let racer = RacerId::from_number(racer).context("racer must be 1 or 2")?;
            let rng = match opts.seed {
                Some(seed) => DeterministicRng::new(seed),
                None => DeterministicRng::from_entropy(),
            };
            let mut engine = RaceEngine::new(rng, config.race.clone());

            let start = engine.start_race(&mut ledger, Some(racer), BoosterFlags::new(x2, guaranteed))?;
            println!(
                "Off they go! racer 1: {:.2}s, racer 2: {:.2}s{}{}",
                start.racer_durations.one,
                start.racer_durations.two,
                if start.x2_applied { " [x2]" } else { "" },
                if start.guaranteed_applied { " [100% win]" } else { "" },
            );

            let wait = (start.settle_after() * time_scale.max(0.0)).min(60.0);
            tokio::time::sleep(Duration::from_secs_f64(wait)).await;

            let outcome = engine.settle_race(&mut ledger)?;
            engine.leave();
            if outcome.did_win {
                println!("You Won! {} crossed first, +{} points", outcome.winner, outcome.points_awarded);
            } else {
                println!("You Lost! {} crossed first", outcome.winner);
            }
            println!("Points: {}", ledger.points());
        }
        Command::BuyBooster { kind } => {
            let kind = BoosterKind::from(kind);
            ledger.buy_booster(kind)?;
            println!(
                "Bought {} (owned: {}), points: {}",
                kind.title(),
                ledger.booster_count(kind),
                ledger.points()
            );
        }
        Command::BuyBackground { id } => {
            ledger.buy_background(id)?;
            println!("Bought {}, points: {}", ledger.selected_background().name, ledger.points());
        }
        Command::SelectBackground { id } => {
            ledger.choose_background(id)?;
            println!("Background: {}", ledger.selected_background().name);
        }
        Command::Catalog => {
            println!("Points: {}", ledger.points());
            println!("Boosters:");
            for listing in ledger.booster_listings() {
                println!(
                    "  {:<14} {:<30} price {:>4}  owned {}",
                    listing.kind.title(),
                    listing.kind.description(),
                    listing.price,
                    listing.owned
                );
            }
            println!("Backgrounds:");
            for listing in ledger.background_listings() {
                let status = match (listing.selected, listing.owned) {
                    (true, _) => "selected",
                    (false, true) => "owned",
                    (false, false) if listing.affordable => "buy",
                    (false, false) => "locked",
                };
                println!(
                    "  [{}] {:<10} price {:>4}  {}",
                    listing.entry.id, listing.entry.name, listing.entry.price, status
                );
            }
        }
        Command::Stats => {
            let stats = ledger.statistics();
            println!("Total Races:            {}", stats.total_races);
            println!("Wins:                   {}", stats.wins);
            println!("Losses:                 {}", stats.losses);
            if let Some(rate) = stats.win_rate() {
                println!("Win Rate:               {:.1}%", rate * 100.0);
            }
            println!("x2 Boosters Owned:      {}", stats.x2_boosters);
            println!("100% Boosters Owned:    {}", stats.guaranteed_boosters);
            println!("Backgrounds Purchased:  {}", stats.backgrounds_purchased);
            if let Some(name) = stats.current_background {
                println!("Current Background:     {}", name);
            }
        }
    }

    Ok(())
}
