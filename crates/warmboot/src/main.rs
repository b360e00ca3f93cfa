//! warmboot-check: dry-run a warm boot reconciliation.
//!
//! Loads a state file and a JSON dump of the ASIC, scans the dump the way
//! the agent scans real hardware after a warm restart, and reports what
//! would be adopted. With `--sweep` every object is treated as unclaimed
//! and the deletions the agent would issue are listed.

use clap::Parser;
use log::{error, info};
use sonic_sai::sim::SimAsic;
use sonic_warmboot::{WarmBootCache, WarmBootConfig};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

/// Warm boot reconciliation checker
#[derive(Parser, Debug)]
#[command(name = "warmboot-check")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON config file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// State file written before the warm shutdown (overrides config)
    #[arg(short = 's', long)]
    snapshot: Option<PathBuf>,

    /// JSON dump of the programmed ASIC state
    #[arg(short = 'a', long)]
    asic_dump: PathBuf,

    /// Index full-width routes as host routes
    #[arg(long)]
    host_routes_in_host_table: bool,

    /// Delete everything unclaimed from the dump and list the deletions
    #[arg(long)]
    sweep: bool,

    /// Write the ECMP membership document here ("-" for stdout)
    #[arg(short = 'e', long)]
    emit_ecmp: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

fn load_config(args: &Args) -> sonic_warmboot::Result<WarmBootConfig> {
    let mut config = match &args.config {
        Some(path) => WarmBootConfig::load_or_default(path)?,
        None => WarmBootConfig::default(),
    };
    if let Some(snapshot) = &args.snapshot {
        config.snapshot_path = snapshot.clone();
    }
    if args.host_routes_in_host_table {
        config.host_routes_in_host_table = true;
    }
    Ok(config)
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args)?;
    info!("State file: {}", config.snapshot_path.display());
    info!("ASIC dump: {}", args.asic_dump.display());

    let dump = fs::read_to_string(&args.asic_dump)?;
    let mut asic: SimAsic = serde_json::from_str(&dump)?;

    let mut cache = WarmBootCache::new(config);
    cache.populate(&asic)?;
    println!("scanned: {}", cache.summary());

    let interfaces = cache.reconstruct_interface_map()?;
    let vlans = cache.reconstruct_vlan_map()?;
    let (arp, ndp) = vlans.iter().fold((0, 0), |(arp, ndp), vlan| {
        (arp + vlan.arp_table.len(), ndp + vlan.ndp_table.len())
    });
    println!(
        "reconstructed: interfaces={} vlans={} arp={} ndp={}",
        interfaces.len(),
        vlans.len(),
        arp,
        ndp
    );

    // The sweep releases the membership map, so emit first.
    if let Some(path) = &args.emit_ecmp {
        let doc = serde_json::to_string_pretty(&cache.to_json()?)?;
        if path.as_os_str() == "-" {
            println!("{}", doc);
        } else {
            fs::write(path, doc)?;
            info!("Wrote ecmp membership to {}", path.display());
        }
    }

    if args.sweep {
        let stats = cache.sweep(&mut asic)?;
        for object in asic.deleted() {
            println!("deleted {}", object);
        }
        println!("swept: {}", stats);
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("warmboot-check failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
