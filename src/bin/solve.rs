use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use pickomino::constants::{FACE_LABELS, N_FACES};
use pickomino::dice_mechanics::{format_dice, outcome_dice, to_face_counts, FaceCounts};
use pickomino::env_config;
use pickomino::simulation::{simulate_turns, SimulationResult};
use pickomino::{ActionEvaluation, Decision, OutcomeTables, RewardPolicy, SolveSession, TableState};

const USAGE: &str = "Usage: pickomino-solve [--dice F,F,... | --counts W,1,2,3,4,5] [--chosen MASK] [--remaining N] [--score N] [--taken T,T,...] [--own-top T] [--opponent-top T] [--policy NAME] [--simulate N] [--seed S] [--json]";

struct Args {
    outcome: Option<FaceCounts>,
    chosen: u8,
    remaining: Option<u8>,
    score: u32,
    taken: Vec<u32>,
    own_top: Option<u32>,
    opponent_top: Option<u32>,
    policy: Option<RewardPolicy>,
    simulate: Option<usize>,
    seed: u64,
    json: bool,
}

fn fail(msg: &str) -> ! {
    eprintln!("{}", msg);
    std::process::exit(1);
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: Option<&String>) -> T {
    let Some(value) = value else {
        fail(&format!("Missing value for {}", flag));
    };
    value
        .parse()
        .unwrap_or_else(|_| fail(&format!("Invalid {} value: {}", flag, value)))
}

fn parse_list<T: std::str::FromStr>(flag: &str, value: Option<&String>) -> Vec<T> {
    let Some(value) = value else {
        fail(&format!("Missing value for {}", flag));
    };
    value
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.trim()
                .parse()
                .unwrap_or_else(|_| fail(&format!("Invalid {} entry: {}", flag, s)))
        })
        .collect()
}

/// Decimal, or binary with a `0b` prefix.
fn parse_mask(value: Option<&String>) -> u8 {
    let Some(value) = value else {
        fail("Missing value for --chosen");
    };
    let parsed = match value.strip_prefix("0b") {
        Some(bits) => u8::from_str_radix(bits, 2),
        None => value.parse(),
    };
    parsed.unwrap_or_else(|_| fail(&format!("Invalid --chosen value: {}", value)))
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        outcome: None,
        chosen: 0,
        remaining: None,
        score: 0,
        taken: Vec::new(),
        own_top: None,
        opponent_top: None,
        policy: None,
        simulate: None,
        seed: 42,
        json: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--dice" => {
                i += 1;
                let dice: Vec<u8> = parse_list("--dice", args.get(i));
                parsed.outcome =
                    Some(to_face_counts(&dice).unwrap_or_else(|e| fail(&e.to_string())));
            }
            "--counts" => {
                i += 1;
                let counts: Vec<u8> = parse_list("--counts", args.get(i));
                if counts.len() != N_FACES {
                    fail(&format!(
                        "--counts needs {} entries (W,1,2,3,4,5), got {}",
                        N_FACES,
                        counts.len()
                    ));
                }
                let mut outcome = [0u8; N_FACES];
                outcome.copy_from_slice(&counts);
                parsed.outcome = Some(outcome);
            }
            "--chosen" => {
                i += 1;
                parsed.chosen = parse_mask(args.get(i));
            }
            "--remaining" => {
                i += 1;
                parsed.remaining = Some(parse_value("--remaining", args.get(i)));
            }
            "--score" => {
                i += 1;
                parsed.score = parse_value("--score", args.get(i));
            }
            "--taken" => {
                i += 1;
                parsed.taken = parse_list("--taken", args.get(i));
            }
            "--own-top" => {
                i += 1;
                parsed.own_top = Some(parse_value("--own-top", args.get(i)));
            }
            "--opponent-top" => {
                i += 1;
                parsed.opponent_top = Some(parse_value("--opponent-top", args.get(i)));
            }
            "--policy" => {
                i += 1;
                parsed.policy = Some(parse_value("--policy", args.get(i)));
            }
            "--simulate" => {
                i += 1;
                parsed.simulate = Some(parse_value("--simulate", args.get(i)));
            }
            "--seed" => {
                i += 1;
                parsed.seed = parse_value("--seed", args.get(i));
            }
            "--json" => {
                parsed.json = true;
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                println!();
                println!("Options:");
                println!("  --dice F,F,...      Rolled dice as faces 0..5 (0 = worm)");
                println!("  --counts W,1,2,3,4,5  Rolled dice as face counts");
                println!("  --chosen MASK       Faces banked earlier this turn (bit 0 = worm, 0b.. accepted)");
                println!("  --remaining N       Dice rolled (default: dice in the roll)");
                println!("  --score N           Points banked so far (default: 0)");
                println!("  --taken T,T,...     Tiles no longer on the grill");
                println!("  --own-top T         Your top tile (lost on a failed turn)");
                println!("  --opponent-top T    Opponent's top tile (stolen on an exact score)");
                println!("  --policy NAME       standard, always-steal or exact-score");
                println!("  --simulate N        Play N turns under the optimal policy");
                println!("  --seed S            RNG seed for --simulate (default: 42)");
                println!("  --json              Print a JSON report");
                println!();
                println!("Rules are read from PICKOMINO_RULES (JSON) when set.");
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                fail(USAGE);
            }
        }
        i += 1;
    }
    parsed
}

#[derive(Serialize)]
struct Report {
    policy: RewardPolicy,
    num_dice: u8,
    failure_penalty: f64,
    turn_start_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    decision: Option<Decision>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    actions: Vec<ActionEvaluation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    simulation: Option<SimulationResult>,
}

fn format_outcome(outcome: &FaceCounts) -> String {
    (0..N_FACES)
        .map(|f| format!("{}x{}", outcome[f], FACE_LABELS[f]))
        .collect::<Vec<_>>()
        .join(" ")
}

fn main() {
    env_logger::init();
    let args = parse_args();

    let mut rules = env_config::load_rules().unwrap_or_else(|e| fail(&e.to_string()));
    if let Some(policy) = args.policy {
        rules.policy = policy;
    }
    let num_threads = env_config::init_rayon_threads_lenient();

    let mut table = TableState::fresh(&rules);
    for &tile in &args.taken {
        table.take(&rules, tile);
    }
    table.own_top = args.own_top;
    table.opponent_top = args.opponent_top;
    let context = rules
        .context_for(&table)
        .unwrap_or_else(|e| fail(&e.to_string()));

    let t0 = Instant::now();
    let tables = Arc::new(OutcomeTables::new(rules.num_dice));
    let session = SolveSession::new(Arc::clone(&tables), rules.num_dice, context);
    let start_value = session
        .turn_start_value()
        .unwrap_or_else(|e| fail(&e.to_string()));
    let start_ms = t0.elapsed().as_secs_f64() * 1000.0;

    let mut decision = None;
    let mut actions = Vec::new();
    if let Some(outcome) = args.outcome {
        let remaining = args
            .remaining
            .unwrap_or_else(|| outcome_dice(&outcome).min(u8::MAX as u32) as u8);
        decision = Some(
            session
                .decide(outcome, args.chosen, remaining, args.score)
                .unwrap_or_else(|e| fail(&e.to_string())),
        );
        actions = session
            .evaluate(outcome, args.chosen, remaining, args.score)
            .unwrap_or_else(|e| fail(&e.to_string()));
    }

    let simulation = args.simulate.map(|n| {
        simulate_turns(rules.num_dice, session.context(), &tables, n, args.seed)
            .unwrap_or_else(|e| fail(&e.to_string()))
    });

    let report = Report {
        policy: rules.policy,
        num_dice: rules.num_dice,
        failure_penalty: session.context().failure_penalty(),
        turn_start_value: start_value,
        decision,
        actions,
        simulation,
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{}", s),
            Err(e) => fail(&format!("Failed to serialize report: {}", e)),
        }
        return;
    }

    println!("Pickomino turn solver ({} threads)", num_threads);
    println!(
        "  Rules: {} dice, tiles {}..={}, policy {:?}",
        rules.num_dice,
        rules.tile_min,
        rules.tile_max(),
        rules.policy
    );
    println!("  Failure penalty: {:.2}", report.failure_penalty);
    println!(
        "  Turn-start EV:   {:.4} ({:.1} ms)",
        report.turn_start_value, start_ms
    );

    if let (Some(outcome), Some(decision)) = (args.outcome, report.decision) {
        println!();
        println!(
            "Roll: {}  [{}]  (chosen {:#08b}, score {})",
            format_dice(&outcome),
            format_outcome(&outcome),
            args.chosen,
            args.score
        );
        for a in &report.actions {
            let cont = match a.continue_value {
                Some(c) => format!("{:.4}", c),
                None => "-".to_string(),
            };
            println!(
                "  bank {} x{}: score {:>2}  stop {:.4}  roll {}  -> {:.4}",
                FACE_LABELS[a.face as usize],
                a.dice_banked,
                a.new_score,
                a.stop_value,
                cont,
                a.value
            );
        }
        println!("Best: {} (EV {:.4})", decision.action, decision.value);
    }

    if let Some(sim) = &report.simulation {
        println!();
        println!("Simulated {} turns in {:.2?}", sim.num_turns, sim.elapsed);
        println!("  Mean:    {:.4} (sd {:.4})", sim.mean, sim.std_dev);
        println!("  Range:   {:.2} .. {:.2}", sim.min, sim.max);
        println!("  Failed:  {:.1}%", sim.failure_rate * 100.0);
    }
}
