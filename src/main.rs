use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, ensure, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use urc_scout::batch::BatchProcessor;
use urc_scout::client::UrcClient;
use urc_scout::export::write_json;
use urc_scout::roles::RoleFallback;
use urc_scout::scoring::ScoreKind;
use urc_scout::squad::{extract_player_ids, extract_squad_details, fetch_squad};

#[derive(Parser)]
#[command(name = "urc_scout")]
#[command(about = "Score and rank rugby players from URC season stats", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and score a single player
    Player {
        /// Player id
        #[arg(long)]
        id: u64,

        #[arg(long, default_value_t = 202501)]
        season: u32,

        /// Minutes played this season (enables per-80 normalization)
        #[arg(long)]
        minutes: Option<f64>,

        /// Appearances this season (fallback normalization basis)
        #[arg(long)]
        appearances: Option<u32>,

        /// Position name or jersey number for role weighting
        #[arg(long)]
        position: Option<String>,

        /// Write the full report to this JSON file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Fetch a club roster and score the whole squad
    Squad {
        /// Club id, e.g. 5356
        #[arg(long)]
        club_id: String,

        #[arg(long, default_value_t = 202501)]
        season: u32,

        /// Seconds to sleep between sub-batches of players
        #[arg(long, default_value_t = 10.0)]
        backoff_secs: f64,

        #[arg(long)]
        minutes: Option<f64>,

        #[arg(long)]
        appearances: Option<u32>,

        /// Score to rank the squad by
        #[arg(long, default_value = "composite_contribution")]
        rank_by: ScoreKind,

        /// Use role-agnostic weights (instead of back-row weights) for
        /// players whose position cannot be resolved
        #[arg(long)]
        default_weights: bool,

        /// Write the batch summary to this JSON file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Player {
            id,
            season,
            minutes,
            appearances,
            position,
            out,
        } => run_player(id, season, minutes, appearances, position.as_deref(), out),
        Commands::Squad {
            club_id,
            season,
            backoff_secs,
            minutes,
            appearances,
            rank_by,
            default_weights,
            out,
        } => run_squad(SquadArgs {
            club_id,
            season,
            backoff_secs,
            minutes,
            appearances,
            rank_by,
            default_weights,
            out,
        }),
    }
}

fn run_player(
    id: u64,
    season: u32,
    minutes: Option<f64>,
    appearances: Option<u32>,
    position: Option<&str>,
    out: Option<PathBuf>,
) -> Result<()> {
    let processor = BatchProcessor::new(UrcClient::new(), season);
    match processor.process_player(id, "", minutes, appearances, position) {
        Ok(report) => {
            if let Some(path) = out {
                write_json(&path, &report)?;
            } else {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("serialize report")?
                );
            }
            Ok(())
        }
        Err(failure) => {
            bail!("player {id} failed ({:?}): {}", failure.kind, failure.error)
        }
    }
}

struct SquadArgs {
    club_id: String,
    season: u32,
    backoff_secs: f64,
    minutes: Option<f64>,
    appearances: Option<u32>,
    rank_by: ScoreKind,
    default_weights: bool,
    out: Option<PathBuf>,
}

fn run_squad(args: SquadArgs) -> Result<()> {
    let client = UrcClient::new();
    let raw = fetch_squad(&client, &args.club_id).context("squad fetch failed")?;
    let players = extract_player_ids(&raw);
    let details = extract_squad_details(&raw);
    ensure!(
        !players.is_empty(),
        "no players found for club {}",
        args.club_id
    );

    let mut processor = BatchProcessor::new(client, args.season)
        .with_backoff(Duration::from_secs_f64(args.backoff_secs.max(0.0)));
    if args.default_weights {
        processor = processor.with_role_fallback(RoleFallback::Defaults);
    }

    let summary =
        processor.process_batch(&players, args.minutes, args.appearances, Some(&details));
    println!(
        "processed {} players: {} scored, {} failed",
        summary.total, summary.successful, summary.failed
    );

    println!("rankings by {}:", args.rank_by.name());
    for (rank, entry) in summary.rankings(args.rank_by).iter().enumerate() {
        println!(
            "{:>3}. {:<28} {:>6.2}  (id {})",
            rank + 1,
            entry.name,
            entry.score,
            entry.player_id
        );
    }
    for failure in &summary.failures {
        println!(
            "  ! {} ({:?}): {}",
            failure.name, failure.kind, failure.error
        );
    }

    if let Some(path) = args.out {
        write_json(&path, &summary)?;
    }
    Ok(())
}
