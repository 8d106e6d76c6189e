use std::time::Instant;

use clap::{Parser, ValueEnum};

use petri_reach::analysis::Analyzer;
use petri_reach::config::AnalysisConfig;
use petri_reach::generators;
use petri_reach::net::Net;
use petri_reach::search::Weights;

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Family {
    Chain,
    Ring,
    Mutex,
    Philosophers,
    Random,
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Net family to generate.
    #[arg(value_enum, default_value = "philosophers")]
    family: Family,

    /// Size parameter of the family (places for random nets).
    #[arg(value_name = "INT", default_value = "5")]
    n: usize,

    /// Number of transitions (random nets only).
    #[clap(long, value_name = "INT", default_value = "40")]
    transitions: usize,

    /// Seed (random nets only).
    #[clap(long, value_name = "INT", default_value = "42")]
    seed: u64,

    /// Give up explicit search after this many markings.
    #[clap(long, value_name = "INT", default_value = "1000000")]
    limit: usize,

    /// Cap on candidates checked per cutting-plane search.
    #[clap(long, value_name = "INT", default_value = "10000")]
    max_attempts: usize,

    /// Comma-separated place weights to maximize.
    #[clap(long, value_name = "W,W,...", value_delimiter = ',', allow_hyphen_values = true)]
    weights: Option<Vec<i64>>,

    /// Skip the explicit/symbolic comparison.
    #[clap(long)]
    no_cross_validate: bool,

    /// Print the generated net.
    #[clap(long)]
    show_net: bool,
}

fn generate(args: &Cli) -> Net {
    match args.family {
        Family::Chain => generators::chain(args.n),
        Family::Ring => generators::ring(args.n),
        Family::Mutex => generators::mutex(args.n),
        Family::Philosophers => generators::philosophers(args.n),
        Family::Random => generators::random(args.n, args.transitions, args.seed),
    }
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

    let net = generate(&args);
    if args.show_net {
        println!("{}", net);
    }

    let config = AnalysisConfig::default()
        .with_explicit_limit(Some(args.limit))
        .with_max_attempts(args.max_attempts)
        .with_cross_validate(!args.no_cross_validate);
    let mut analyzer = Analyzer::new(&net, config);
    if let Some(weights) = args.weights.clone() {
        analyzer = analyzer.with_weights(Weights::new(weights));
    }

    let report = analyzer.run()?;
    println!("{}", report);

    if let Some(marking) = report.deadlock.marking() {
        println!("deadlock places: {:?}", net.marked_names(marking).collect::<Vec<_>>());
    }

    println!("\nAll done in {:.3} s", time_total.elapsed().as_secs_f64());
    Ok(())
}
