use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::PathBuf;

use v6gene::codec::render_cidr;
use v6gene::generator::{Generator, GeneratorConfig, DEFAULT_MAX_RETRIES};
use v6gene::report::RunReport;
use v6gene::seed;
use v6gene::trie::DepthCounts;

/// IPv6 prefix set generator based on a binary trie grown from seed prefixes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the seed prefix file, one address/length per line; the trie
    /// starts empty when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file for the generated prefix set; printed to stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Expected number of prefixes in the output set
    #[arg(short, long)]
    prefix_quantity: usize,

    /// Maximum delegation level allowed for any prefix in the trie
    #[arg(short, long)]
    max_level: usize,

    /// Inline target depth distribution, e.g. "32:100,48:400"
    #[arg(long, conflicts_with = "depth_distribution_path")]
    depth_distribution: Option<String>,

    /// File containing the target depth distribution in the same depth:count format
    #[arg(long)]
    depth_distribution_path: Option<PathBuf>,

    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Seed for the random generator; runs are reproducible when set
    #[arg(long)]
    rng_seed: Option<u64>,

    /// Attempt ceiling for collision retries during generation
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: usize,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Starting V6Gene prefix generator");

    let target = load_target_distribution(&args)?;

    let seeds = match &args.input {
        Some(path) => seed::read_seed_file(path)
            .wrap_err_with(|| format!("failed to read seed file {}", path.display()))?,
        None => Vec::new(),
    };
    info!("Seed file holds {} usable prefixes", seeds.len());

    let config = GeneratorConfig {
        prefix_quantity: args.prefix_quantity,
        max_level: args.max_level,
        target_distribution: target,
        max_retries: args.max_retries,
    };
    let mut generator = Generator::new(config, &seeds);

    let mut rng: StdRng = match args.rng_seed {
        Some(value) => StdRng::seed_from_u64(value),
        None => StdRng::from_entropy(),
    };

    let prefixes = generator
        .generate(&mut rng)
        .wrap_err("prefix generation failed")?;

    let report = RunReport::collect(generator.trie(), seeds.len());
    report.log_summary();
    if let Some(path) = &args.report {
        report
            .write_json(path)
            .wrap_err_with(|| format!("failed to write report to {}", path.display()))?;
        info!("Run report written to {}", path.display());
    }

    let rendered: Vec<String> = prefixes.iter().map(|bits| render_cidr(bits)).collect();
    match &args.output {
        Some(path) => {
            let mut content = rendered.join("\n");
            content.push('\n');
            fs::write(path, content)
                .wrap_err_with(|| format!("failed to write output to {}", path.display()))?;
            info!("{} prefixes written to {}", rendered.len(), path.display());
        }
        None => {
            for cidr in &rendered {
                println!("{cidr}");
            }
        }
    }

    Ok(())
}

fn load_target_distribution(args: &Args) -> Result<DepthCounts> {
    match (&args.depth_distribution, &args.depth_distribution_path) {
        (Some(text), None) => {
            seed::parse_depth_distribution(text).wrap_err("invalid --depth-distribution")
        }
        (None, Some(path)) => seed::read_depth_distribution_file(path)
            .wrap_err_with(|| format!("invalid depth distribution file {}", path.display())),
        (None, None) => Err(eyre!(
            "either --depth-distribution or --depth-distribution-path is required"
        )),
        // clap rejects the combination before we get here
        (Some(_), Some(_)) => unreachable!(),
    }
}
