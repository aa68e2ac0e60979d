use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use view_provision::config::{resolve_config, BackendTarget, ConfigOverrides, ENDPOINT_ENV};
use view_provision::input::load_batch;
use view_provision::namespace::{HttpNamespace, StateFileNamespace, DEFAULT_REQUEST_TIMEOUT};
use view_provision::record::NodeDescriptor;
use view_provision::{plan_batch, provision_batch, PlanReport, RunReport};

mod cli;
use cli::{Command, PlanArgs, ProvisionArgs, RootArgs};

/// Log filter directives, e.g. `VPROV_LOG=view_provision=debug`.
const LOG_ENV: &str = "VPROV_LOG";

fn main() -> Result<()> {
    let args = RootArgs::parse();
    let verbose = matches!(&args.command, Command::Provision(args) if args.verbose);
    init_tracing(verbose);

    match args.command {
        Command::Plan(args) => cmd_plan(&args),
        Command::Provision(args) => cmd_provision(&args),
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_plan(args: &PlanArgs) -> Result<()> {
    let batch = load_batch(&args.input)?;
    let plan = plan_batch(batch);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }
    print_plan(&plan);
    Ok(())
}

fn cmd_provision(args: &ProvisionArgs) -> Result<()> {
    let overrides = ConfigOverrides {
        poll_interval_ms: args.poll_interval_ms,
        timeout_ms: args.timeout_ms,
        endpoint: args.endpoint.clone(),
        state_path: args.state.clone(),
    };
    let config = resolve_config(
        args.config.as_deref(),
        std::env::var(ENDPOINT_ENV).ok(),
        &overrides,
    )?;
    let policy = config.retry_policy();

    // Input is fully read before the backend is touched.
    let batch = load_batch(&args.input)?;

    let report = match config.backend_target()? {
        BackendTarget::Endpoint(url) => {
            if args.verbose {
                eprintln!("provision: using namespace service at {url}");
            }
            let namespace = HttpNamespace::new(&url, DEFAULT_REQUEST_TIMEOUT);
            provision_batch(&namespace, batch, policy)
        }
        BackendTarget::StateFile(path) => {
            if args.verbose {
                eprintln!("provision: using state file {}", path.display());
            }
            let namespace = StateFileNamespace::open(&path)
                .with_context(|| format!("open namespace state {}", path.display()))?;
            provision_batch(&namespace, batch, policy)
        }
    }
    .context("provisioning aborted")?;

    if let Some(out) = &args.report {
        write_json(out, &report)?;
        if args.verbose {
            eprintln!("provision: wrote report to {}", out.display());
        }
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report, args.verbose);
    }
    Ok(())
}

fn print_plan(plan: &PlanReport) {
    let mut stack: Vec<(&NodeDescriptor, usize)> =
        plan.forest.roots.iter().rev().map(|root| (root, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        println!("{}{} [{}]", "  ".repeat(depth), node.name, node.id);
        stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }
    for skipped in &plan.skipped {
        println!("skipped line {}: {}", skipped.line, skipped.reason);
    }
    for id in &plan.forest.orphans {
        println!("orphan record {id}: parent not in input");
    }
    for id in &plan.forest.detached {
        println!("detached record {id}: not reachable from a root");
    }
    if plan.forest.duplicates > 0 {
        println!("duplicate ids dropped: {}", plan.forest.duplicates);
    }
}

fn print_summary(report: &RunReport, verbose: bool) {
    if verbose {
        for view in &report.views {
            println!(
                "{:?} {} [{}] -> {}",
                view.source, view.name, view.record_id, view.view_id
            );
        }
    }
    println!(
        "provisioned {} views (created {}, existing {}, cached {})",
        report.views.len(),
        report.created,
        report.existing,
        report.cached
    );
    let dropped = report.skipped_records + report.orphans + report.detached + report.duplicates;
    if dropped > 0 {
        println!(
            "dropped {} records (invalid {}, orphaned {}, detached {}, duplicate {})",
            dropped, report.skipped_records, report.orphans, report.detached, report.duplicates
        );
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
