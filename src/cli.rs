//! CLI argument parsing for the kata runner.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "kata",
    version,
    about = "Grade Go submissions against kata assertions",
    after_help = "Examples:\n  kata list --catalog fixtures/katas.json\n  kata show add --skeleton > add.go\n  kata run --kata add --source add.go\n  kata run --kata add --source - --json < add.go\n  kata verify --solutions solutions/ --jobs 4",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings shared by every command; each overrides the config file.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Config file (default: <config dir>/kata-runner/config.json when present)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Kata catalog JSON
    #[arg(long, value_name = "PATH", global = true)]
    pub catalog: Option<PathBuf>,

    /// Go toolchain command line
    #[arg(long = "go", value_name = "CMD", global = true)]
    pub go_command: Option<String>,

    /// Wall-clock limit for running a compiled submission
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout_seconds: Option<f64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List kata slugs and titles in catalog order
    List,
    Show(ShowArgs),
    Run(RunArgs),
    Verify(VerifyArgs),
    /// Print the effective configuration as JSON
    Config,
}

#[derive(Parser, Debug)]
#[command(about = "Show a kata's description and starter skeleton")]
pub struct ShowArgs {
    /// Kata slug
    #[arg(value_name = "SLUG")]
    pub slug: String,

    /// Print only the starter skeleton
    #[arg(long)]
    pub skeleton: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Grade one submission; exits 0 only when every assertion passes")]
pub struct RunArgs {
    /// Kata slug
    #[arg(long = "kata", value_name = "SLUG")]
    pub slug: String,

    /// Submission file, or `-` for stdin
    #[arg(long, value_name = "PATH")]
    pub source: PathBuf,

    /// Emit the grading report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Grade <DIR>/<slug>.go for every kata that has a solution file")]
pub struct VerifyArgs {
    /// Directory holding one `<slug>.go` per kata
    #[arg(long, value_name = "DIR")]
    pub solutions: PathBuf,

    /// Concurrent grading runs (default: available parallelism)
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,
}
