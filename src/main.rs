use clap::Parser;
use colored::*;

use hotforge::cli::{render_summary, Args};
use hotforge::config::{init_tracing, ForgeConfig};
use hotforge::Orchestrator;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = args.apply_overrides(ForgeConfig::load(&args.config)?);
    config.validate()?;
    init_tracing(&config.log_level)?;

    let mut orchestrator = Orchestrator::from_config(config);

    let mut results = Vec::with_capacity(args.requests.len());
    for request in &args.requests {
        let result = orchestrator.process(request);
        if !args.json {
            println!("{}", render_summary(&result));
        }
        results.push(result);
    }

    let rolled_back = args
        .rollback
        .as_deref()
        .map(|capability| (capability, orchestrator.rollback(capability)));

    if args.json {
        let report = serde_json::json!({
            "results": results,
            "build_count": orchestrator.build_count(),
            "cache_count": orchestrator.cache_count(),
            "rollback": rolled_back.map(|(capability, ok)| {
                serde_json::json!({ "capability": capability, "rolled_back": ok })
            }),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "=".repeat(50).bright_blue());
    println!(
        "{} builds, {} cached, {} modules live",
        orchestrator.build_count(),
        orchestrator.cache_count(),
        orchestrator.integrator().loaded_count(),
    );
    match rolled_back {
        Some((capability, true)) => {
            println!("{}: {}", "Rolled back".bright_yellow(), capability)
        }
        Some((capability, false)) => {
            println!("{}: {} (nothing deployed)", "Rollback skipped".bright_red(), capability)
        }
        None => {}
    }
    Ok(())
}
