use std::time::Instant;

use clap::Parser;

use petri_reach::bdd::BddConfig;
use petri_reach::generators;
use petri_reach::symbolic::build_with;

/// Symbolic reachability on a random net too large for explicit search.
#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Number of places.
    #[arg(value_name = "INT", default_value = "50")]
    places: usize,

    /// Number of transitions.
    #[arg(value_name = "INT", default_value = "40")]
    transitions: usize,

    #[clap(long, value_name = "INT", default_value = "1")]
    seed: u64,

    /// Computed-table size (in bits, so the actual size is `2^size` entries).
    #[clap(long, value_name = "INT", default_value = "16")]
    cache_bits: usize,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let net = generators::random(args.places, args.transitions, args.seed);
    let reachable = build_with(&net, BddConfig::default().with_cache_bits(args.cache_bits));

    println!("{:>5} {:>10} {:>10} {:>20}", "iter", "nodes", "frontier", "markings");
    for stats in reachable.iterations() {
        println!(
            "{:>5} {:>10} {:>10} {:>20}",
            stats.iteration, stats.nodes, stats.frontier_nodes, stats.states
        );
    }

    let dead = reachable.dead_states();
    println!("reachable markings: {}", reachable.count());
    println!("dead markings:      {}", reachable.symbolic().count(dead));
    println!("bdd = {:?}", reachable.bdd());

    println!("\nAll done in {:.3} s", time_total.elapsed().as_secs_f64());
    Ok(())
}
