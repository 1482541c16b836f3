//! WagerFlip simulator
//!
//! Runs a batch of coin flip games end to end against an in-memory ledger and prints
//! a JSON summary of the outcome.

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::{info, warn};
use wagerflip::games::RandomnessOracle;
use wagerflip::{
    AccountBook, Address, CoinChoice, EngineSettings, Ledger, SeededOracle, SettingsLoader, SystemClock,
    TokenType, TxContext, VrfOracle, WagerEngine,
};

#[derive(Parser, Debug)]
#[command(name = "wagerflip-sim")]
#[command(about = "Simulate coin flip wagers against an in-memory ledger", long_about = None)]
struct Args {
    /// Settings file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of players; the first half create games, the rest join them
    #[arg(long, default_value = "4")]
    players: usize,

    /// Number of games to create
    #[arg(long, default_value = "100")]
    games: usize,

    /// Games joined per batch call
    #[arg(long, default_value = "10")]
    batch_size: usize,

    /// Bet amount for every game
    #[arg(long, default_value = "1000000")]
    bet: u64,

    /// Token symbol; added to the settings if missing
    #[arg(long, default_value = "SUI")]
    token: String,

    /// Seed for player choices and the randomness oracle
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Resolve games with the schnorrkel VRF oracle instead of the seeded one
    #[arg(long)]
    vrf: bool,
}

#[derive(Debug, Serialize)]
struct SimulationSummary {
    oracle: &'static str,
    token: String,
    games_created: usize,
    games_resolved: usize,
    batches: usize,
    creator_wins: usize,
    joiner_wins: usize,
    total_fees: u64,
    treasury_balance: u64,
    supply_before: u128,
    supply_after: u128,
    value_conserved: bool,
    attestations_verified: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut loader = SettingsLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let mut settings = loader.load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.logging.level.as_filter().into()),
        )
        .init();

    if !settings.tokens.iter().any(|t| t.symbol == args.token) {
        let bet = args.bet.max(1);
        settings.tokens.extend(EngineSettings::with_token(&args.token, bet, bet).tokens);
    }

    let summary = if args.vrf {
        let seed: [u8; 32] = Sha256::digest(args.seed.to_be_bytes()).into();
        simulate(&args, &settings, VrfOracle::from_seed(&seed)?, "vrf")?
    } else {
        simulate(&args, &settings, SeededOracle::new(args.seed), "seeded")?
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn simulate<O: RandomnessOracle>(
    args: &Args,
    settings: &EngineSettings,
    oracle: O,
    oracle_name: &'static str,
) -> Result<SimulationSummary, Box<dyn std::error::Error>> {
    let (mut engine, _cap) = WagerEngine::initialize(settings, oracle, SystemClock, AccountBook::new())?;
    let token = TokenType::new(args.token.as_str());

    let players = args.players.max(2);
    let addresses: Vec<Address> = (0..players).map(|i| player_address(i as u64)).collect();
    let (creators, joiners) = addresses.split_at(players / 2);

    let funds = args.bet.saturating_mul(args.games as u64).saturating_mul(2).max(args.bet);
    for player in &addresses {
        engine.ledger_mut().mint(player, &token, funds)?;
    }
    let supply_before = engine.ledger().total_supply(&token) + engine.escrowed_total(&token);

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut game_ids = Vec::with_capacity(args.games);
    for i in 0..args.games {
        let creator = creators[i % creators.len()];
        let choice = CoinChoice::from_heads(rng.gen());
        game_ids.push(engine.create_game(&TxContext::new(creator), &token, args.bet, choice)?);
    }
    info!(games = game_ids.len(), creators = creators.len(), "Games opened");

    let batch_size = args.batch_size.clamp(1, engine.config().max_games_per_batch());
    if batch_size != args.batch_size {
        warn!(requested = args.batch_size, used = batch_size, "Batch size clamped to protocol limit");
    }

    let mut summary = SimulationSummary {
        oracle: oracle_name,
        token: token.to_string(),
        games_created: game_ids.len(),
        games_resolved: 0,
        batches: 0,
        creator_wins: 0,
        joiner_wins: 0,
        total_fees: 0,
        treasury_balance: 0,
        supply_before,
        supply_after: 0,
        value_conserved: false,
        attestations_verified: 0,
    };

    for (n, batch) in game_ids.chunks(batch_size).enumerate() {
        let joiner = joiners[n % joiners.len()];
        let payment = args.bet.saturating_mul(batch.len() as u64);
        let receipt = engine.join_games(&TxContext::new(joiner), batch, &token, payment)?;

        if receipt.verify_attestation()? {
            summary.attestations_verified += 1;
        }
        summary.batches += 1;
        summary.games_resolved += receipt.results.len();
        summary.total_fees += receipt.total_fees();
        for result in &receipt.results {
            if result.winner == result.creator {
                summary.creator_wins += 1;
            } else {
                summary.joiner_wins += 1;
            }
        }
    }

    summary.treasury_balance = engine.ledger().balance_of(&engine.config().treasury(), &token);
    summary.supply_after = engine.ledger().total_supply(&token) + engine.escrowed_total(&token);
    summary.value_conserved = summary.supply_before == summary.supply_after;
    if !summary.value_conserved {
        warn!(before = summary.supply_before, after = summary.supply_after, "Token supply changed");
    }

    Ok(summary)
}

fn player_address(index: u64) -> Address {
    let mut bytes = [0u8; 32];
    bytes[0] = 0x01;
    bytes[24..].copy_from_slice(&index.to_be_bytes());
    Address::new(bytes)
}
