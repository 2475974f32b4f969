//! Bully election demo
//!
//! Plays a leader failure and recovery on a virtual clock and prints the
//! resulting message trace.
//!
//! # Example
//!
//! ```bash
//! # Default roster 1..5, fail the leader, let it come back later
//! bully-demo
//!
//! # Custom roster, two cascade hops, fail P12 and keep it down
//! bully-demo --nodes 3,7,9,12 --fail 12 --cascade-hops 2 --no-recover
//! ```

use clap::Parser;
use bully::{BullyResult, BullySimulator, ElectionConfig, MessageKind, ProcessId};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Bully leader election demo
///
/// Runs a deterministic election scenario. The same arguments always
/// produce the same trace.
#[derive(Parser, Debug)]
#[command(name = "bully-demo")]
#[command(version, about, long_about = None)]
struct Args {
    /// Process ids, comma separated
    #[arg(short = 'n', long, value_delimiter = ',', default_value = "1,2,3,4,5")]
    nodes: Vec<u64>,

    /// Process to fail (defaults to the initial leader)
    #[arg(short = 'f', long)]
    fail: Option<u64>,

    /// Virtual ms to run after the failure
    #[arg(short = 'd', long, default_value = "6000")]
    duration: u64,

    /// Intermediate election rounds to play out
    #[arg(long, default_value = "1")]
    cascade_hops: usize,

    /// Heartbeat period in virtual ms
    #[arg(long, default_value = "2000")]
    heartbeat_period: u64,

    /// Keep the failed process down
    #[arg(long)]
    no_recover: bool,

    /// Print heartbeat messages too
    #[arg(long)]
    show_heartbeats: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,bully=info")),
        )
        .init();

    let args = Args::parse();

    println!("═══════════════════════════════════════════════════════");
    println!("  Bully Leader Election — Failure & Recovery Demo");
    println!("═══════════════════════════════════════════════════════");
    println!();

    if let Err(e) = run(&args) {
        eprintln!("  ✗ {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> BullyResult<()> {
    let config = ElectionConfig::default()
        .with_cascade_hops(args.cascade_hops)
        .with_heartbeat_period(args.heartbeat_period)
        .with_default_roster(args.nodes.clone());
    let mut sim = BullySimulator::recording(config)?;

    let initial = sim.leader();
    let victim = match args.fail {
        Some(id) => ProcessId::new(id),
        None => initial.unwrap_or(ProcessId::new(1)),
    };
    info!(nodes = ?args.nodes, %victim, duration_ms = args.duration, "Starting scenario");

    // ── Phase 1: steady state ─────────────────────────────────
    sim.set_running(true);
    sim.advance_by(args.heartbeat_period + 500);
    print_phase("Steady state", &mut sim, args.show_heartbeats);

    // ── Phase 2: failure ──────────────────────────────────────
    sim.toggle(victim)?;
    sim.advance_by(args.duration);
    print_phase("After failure", &mut sim, args.show_heartbeats);

    // ── Phase 3: recovery ─────────────────────────────────────
    if !args.no_recover {
        sim.toggle(victim)?;
        sim.advance_by(args.duration);
        print_phase("After recovery", &mut sim, args.show_heartbeats);
    }

    println!("  Summary:");
    println!(
        "    Initial leader: {}",
        initial.map_or_else(|| "none".to_string(), |id| id.to_string())
    );
    println!(
        "    Final leader:   {}",
        sim.leader().map_or_else(|| "none".to_string(), |id| id.to_string())
    );
    println!("    Elections:      {}", sim.orchestrator().completed_sessions());
    println!("    Detections:     {}", sim.heartbeat().detections());
    println!("    Events:         {}", sim.events_processed());
    println!("    Virtual time:   {}", sim.now());
    println!();
    println!("  ✓ Demo complete.");
    Ok(())
}

fn print_phase(label: &str, sim: &mut BullySimulator, show_heartbeats: bool) {
    println!("  {} ({}):", label, sim.now());
    let messages = sim.observer_mut().drain_messages();
    for m in messages.iter().filter(|m| show_heartbeats || !m.is_heartbeat) {
        let kind = if m.is_heartbeat {
            "HEARTBEAT".to_string()
        } else {
            m.kind.to_string()
        };
        println!("    [{:>6}ms] {:<11} {} → {}", m.created_at.millis(), kind, m.from, m.to);
    }
    let elections = messages
        .iter()
        .filter(|m| !m.is_heartbeat && m.kind == MessageKind::Election)
        .count();
    println!(
        "    {} messages, {} ELECTION, leader now {}",
        messages.len(),
        elections,
        sim.leader().map_or_else(|| "none".to_string(), |id| id.to_string())
    );
    println!();
}
