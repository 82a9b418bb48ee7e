//! Recompute a dice roll from revealed seeds.
//!
//! verify-roll --client-seed abc --server-seed <revealed> --nonce 0 --roll 76.32

use clap::Parser;
use fairroll::games::{
    betting::quote,
    fairness_engine::{settle_roll, FairnessEngine, PROTOCOL_VERSION},
    BetCondition, BetConfiguration, VerifyRequest,
};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "verify-roll", about = "Verify a provably fair dice round")]
struct Args {
    #[arg(long)]
    client_seed: String,

    /// Server seed revealed by rotation
    #[arg(long)]
    server_seed: String,

    #[arg(long)]
    nonce: u64,

    /// Roll the operator reported for this round
    #[arg(long)]
    roll: Option<f64>,

    /// Commitment published before the round was played
    #[arg(long)]
    server_seed_hash: Option<String>,

    #[arg(long, requires = "condition")]
    target: Option<f64>,

    /// over or under
    #[arg(long)]
    condition: Option<BetCondition>,

    #[arg(long, default_value_t = 1.0)]
    house_edge: f64,

    /// Print the verification result as JSON
    #[arg(long, requires = "roll")]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "fairroll=info".into()),
        )
        .init();

    let args = Args::parse();

    if args.json {
        return print_json(&args);
    }

    let mut valid = true;

    let computed = FairnessEngine::derive_roll(&args.client_seed, &args.server_seed, args.nonce);
    let commitment = FairnessEngine::hash_server_seed(&args.server_seed);

    println!("🔍 Provably Fair Round Verification (protocol v{})", PROTOCOL_VERSION);
    println!("================================");
    println!("Input:           {}", FairnessEngine::round_input(&args.client_seed, "<server_seed>", args.nonce));
    println!("Server seed hash: {}", commitment);
    println!("Computed roll:   {:.2}", computed);

    if let Some(expected_hash) = &args.server_seed_hash {
        if expected_hash.eq_ignore_ascii_case(&commitment) {
            println!("   ✅ Server seed matches published commitment");
        } else {
            println!("   ❌ Server seed does NOT match commitment {}", expected_hash);
            valid = false;
        }
    }

    if let Some(roll) = args.roll {
        if FairnessEngine::verify(&args.client_seed, &args.server_seed, args.nonce, roll) {
            println!("   ✅ Reported roll {:.2} reproduces", roll);
        } else {
            println!("   ❌ Reported roll {:.2} does NOT reproduce", roll);
            valid = false;
        }
    }

    if let (Some(target), Some(condition)) = (args.target, args.condition) {
        let config = BetConfiguration::new(target, condition).with_house_edge(args.house_edge);
        let q = quote(&config);
        let settled = settle_roll(computed, &config, 1.0);
        println!(
            "Bet {} {:.2}: win chance {:.2}%, multiplier {:.4}x -> {}",
            condition,
            target,
            q.win_chance,
            settled.multiplier,
            if settled.won { "WIN" } else { "LOSS" }
        );
    }

    if valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_json(args: &Args) -> ExitCode {
    let request = VerifyRequest {
        client_seed: args.client_seed.clone(),
        server_seed: args.server_seed.clone(),
        nonce: args.nonce,
        expected_roll: args.roll.unwrap_or(f64::NAN),
        server_seed_hash: args.server_seed_hash.clone(),
    };
    let response = FairnessEngine::verify_request(&request);

    match serde_json::to_string_pretty(&response) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            tracing::error!("failed to encode verification result: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if response.is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
