//! CLI argument parsing for view provisioning.
//!
//! The CLI stays thin: it resolves configuration and input, then hands off to
//! the library's plan/provision entry points.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "vprov",
    version,
    about = "Provision a hierarchy of views from flat id,name,parentId records",
    after_help = "Commands:\n  plan --input <file>        Show the view tree that would be provisioned\n  provision --input <file>   Get-or-create every view, parents first\n\nExamples:\n  vprov plan --input views.csv\n  vprov provision --input views.csv --state /tmp/views.json\n  vprov provision --input - --endpoint http://localhost:8080/api --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Plan(PlanArgs),
    Provision(ProvisionArgs),
}

/// Plan command inputs; no backend is contacted.
#[derive(Parser, Debug)]
#[command(about = "Parse records and print the assembled view tree")]
pub struct PlanArgs {
    /// Record file (`id,name,parentId` with a header line), or `-` for stdin
    #[arg(long, value_name = "FILE")]
    pub input: String,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Provision command inputs.
#[derive(Parser, Debug)]
#[command(about = "Provision views against a namespace backend")]
pub struct ProvisionArgs {
    /// Record file (`id,name,parentId` with a header line), or `-` for stdin
    #[arg(long, value_name = "FILE")]
    pub input: String,

    /// JSON config file with polling and backend settings
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Local namespace state file
    #[arg(long, value_name = "FILE", conflicts_with = "endpoint")]
    pub state: Option<PathBuf>,

    /// Base URL of a remote namespace service
    #[arg(long, value_name = "URL", conflicts_with = "state")]
    pub endpoint: Option<String>,

    /// Interval between convergence checks after a create
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Give up on a created view after this long
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Also write the JSON run report to this path
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Emit a verbose transcript of the run
    #[arg(long)]
    pub verbose: bool,
}
