
use mtage::{ BinaryTrace, BranchRecord, ConfigError, MTageConfig };
use mtage::sim;
use clap::{ Parser, ValueEnum };
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Synthetic { Loop, Random, Mixed }

/// Evaluate an MTAGE+COLT predictor over branch traces.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Binary trace files
    traces: Vec<PathBuf>,

    /// Preset configuration (unlimited, default, small)
    #[arg(short, long, default_value = "default")]
    preset: String,

    /// JSON configuration file (overrides --preset)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Evaluate a synthetic workload instead of trace files
    #[arg(short, long, value_enum)]
    synthetic: Option<Synthetic>,

    /// Number of conditional branches to evaluate per trace
    #[arg(short, long)]
    limit: Option<usize>,

    /// Print the configuration as JSON
    #[arg(long)]
    print_config: bool,
}

fn load_config(args: &Cli) -> Result<MTageConfig, Box<dyn std::error::Error>> {
    if let Some(path) = &args.config {
        return Ok(MTageConfig::from_file(path)?);
    }
    MTageConfig::preset(&args.preset)
        .ok_or_else(|| format!("unknown preset '{}'", args.preset).into())
}

fn evaluate(cfg: &MTageConfig, name: &str, records: &[BranchRecord],
    limit: Option<usize>) -> Result<(), ConfigError>
{
    let mut mtage = cfg.clone().build()?;
    println!("[*] Evaluating {} ({} records)", name, records.len());

    let start = Instant::now();
    let stats = sim::run_trace(&mut mtage, records, limit);
    println!("[*] Completed in {:.3?}", start.elapsed());

    println!("[*] Unique branches: {}", stats.num_unique_branches());
    println!("[*] Global hit rate: {}/{} ({:.2}% correct) ({} misses)",
        stats.global_hits, stats.global_brns, stats.hit_rate() * 100.0,
        stats.global_miss());
    println!("[*] MPKB: {:.4}", stats.mpkb());
    for (comp, miss) in mtage.components.iter()
        .zip(mtage.stat.component_miss.iter())
    {
        println!("    {}: {} misses ({:.2}% of updates) ({} allocs, {} resets)",
            comp.name(), miss, comp.table.stat.miss_rate() * 100.0,
            comp.table.stat.allocs, comp.table.stat.resets);
    }
    println!("    colt: {} misses", mtage.stat.colt_miss);

    println!("[*] Low hit rate branches:");
    for (pc, s) in stats.get_low_rate_branches(16) {
        let pat = if s.pat.len() > 64 {
            format!("{:b}", &s.pat.as_bitslice()[0..64])
        } else {
            format!("{:b}", s.pat)
        };
        println!("    {:016x}: {:6}/{:6} ({:.4}) {}",
            pc, s.hits, s.occ, s.hit_rate(), pat);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Cli::parse();
    let cfg = load_config(&args)?;
    cfg.validate()?;
    if args.print_config {
        println!("{}", cfg.to_json_pretty()?);
    }
    let storage_bits = cfg.storage_bits();
    println!("[*] Storage bits: {}b, {:.2}KiB",
        storage_bits, storage_bits as f64 / 1024.0 / 8.0);

    if let Some(kind) = args.synthetic {
        let records = match kind {
            Synthetic::Loop => sim::periodic_loop(0x0040_1000, 7, 200_000),
            Synthetic::Random => sim::random_branch(0, 0x0040_1000, 200_000),
            Synthetic::Mixed => sim::mixed_program(0, 50_000),
        };
        evaluate(&cfg, &format!("{:?}", kind), &records, args.limit)?;
        return Ok(());
    }

    if args.traces.is_empty() {
        println!("[!] No traces given (use --synthetic for a built-in workload)");
        return Ok(());
    }
    for path in args.traces.iter() {
        let trace = BinaryTrace::from_file(path)?;
        println!("[*] Loaded {} records from {}",
            trace.num_entries(), path.display());
        evaluate(&cfg, trace.name(), trace.as_slice(), args.limit)?;
    }
    Ok(())
}
