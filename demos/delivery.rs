//! Delivery simulation on a generated map.
//!
//! Run: cargo run --bin delivery -- --config demos/delivery.toml

use std::fs;
use std::io::Write;

use routegrid_demos::{DeliveryConfig, Simulation};

struct Args {
    config_path: Option<String>,
    ticks: Option<usize>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut result = Args {
        config_path: None,
        ticks: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    result.config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--ticks" | "-t" => {
                if i + 1 < args.len() {
                    result.ticks = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    result
}

fn print_help() {
    println!("delivery - agents shuttling goods between a factory and stores");
    println!();
    println!("USAGE:");
    println!("    delivery [--config <file.toml>] [--ticks <n>]");
    println!();
    println!("Logging is controlled with RUST_LOG (default: info).");
}

fn load_config(args: &Args) -> DeliveryConfig {
    let Some(path) = &args.config_path else {
        return DeliveryConfig::default();
    };
    match fs::read_to_string(path) {
        Ok(contents) => match basic_toml::from_str(&contents) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path);
                cfg
            }
            Err(e) => {
                log::warn!("Failed to parse config {}: {}", path, e);
                DeliveryConfig::default()
            }
        },
        Err(e) => {
            log::warn!("Failed to read config {}: {}", path, e);
            DeliveryConfig::default()
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = parse_args();
    let config = load_config(&args);
    let ticks = args.ticks.unwrap_or(config.ticks);

    let mut sim = Simulation::new(&config)?;
    log::info!(
        "{} agents, factory {}, stores {:?}",
        config.agents,
        sim.factory(),
        sim.stores()
    );

    let report_every = (ticks / 10).max(1);
    for t in 1..=ticks {
        sim.tick();
        if t % report_every == 0 {
            let r = sim.report();
            log::info!(
                "tick {t}: {} delivered, {} submitted, {} completed",
                r.delivered,
                r.stats.submitted,
                r.stats.completed
            );
        }
    }

    let r = sim.report();
    log::info!(
        "done after {} ticks: {} delivered, {} abandoned, {} unreachable",
        r.ticks,
        r.delivered,
        r.abandoned,
        r.unreachable
    );
    log::info!("scheduler: {:?}", r.stats);
    Ok(())
}
