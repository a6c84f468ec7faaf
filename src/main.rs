use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

mod catalog;
mod cli;
mod config;
mod engine;
mod grader;
mod harness;
mod normalize;
mod quote;
mod render;
mod report;
mod templates;
mod util;

use catalog::Catalog;
use cli::{Command, GlobalArgs, RootArgs, RunArgs, ShowArgs, VerifyArgs};
use config::RunnerConfig;
use engine::go::GoToolchain;
use report::{Graded, Verdict};

fn main() -> Result<ExitCode> {
    let args = RootArgs::parse();
    init_tracing()?;
    let config = effective_config(&args.global)?;

    match args.command {
        Command::List => cmd_list(&config),
        Command::Show(show) => cmd_show(&config, show),
        Command::Run(run) => cmd_run(&config, run),
        Command::Verify(verify) => cmd_verify(&config, verify),
        Command::Config => cmd_config(&config),
    }
}

fn init_tracing() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("initialize tracing subscriber: {err}"))
}

fn effective_config(global: &GlobalArgs) -> Result<RunnerConfig> {
    let mut config = config::load_config(global.config.as_deref())?;
    if let Some(catalog) = &global.catalog {
        config.catalog = Some(catalog.clone());
    }
    if let Some(go_command) = &global.go_command {
        config.go_command = go_command.clone();
    }
    if let Some(seconds) = global.timeout_seconds {
        config.run_timeout_seconds = seconds;
    }
    config::validate_config(&config).context("validate effective config")?;
    Ok(config)
}

fn load_catalog(config: &RunnerConfig) -> Result<Catalog> {
    let path = config.catalog.as_ref().ok_or_else(|| {
        anyhow!("no catalog configured; pass --catalog or set \"catalog\" in the config file")
    })?;
    Catalog::load(path).with_context(|| format!("load catalog {}", path.display()))
}

fn cmd_list(config: &RunnerConfig) -> Result<ExitCode> {
    let catalog = load_catalog(config)?;
    for kata in catalog.katas() {
        println!("{}\t{}", kata.slug, kata.title);
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_show(config: &RunnerConfig, args: ShowArgs) -> Result<ExitCode> {
    let catalog = load_catalog(config)?;
    let kata = catalog
        .find(&args.slug)
        .with_context(|| format!("show {}", args.slug))?;
    if !args.skeleton {
        println!("{}\n", kata.title);
        if !kata.description.is_empty() {
            println!("{}\n", kata.description.trim_end());
        }
    }
    println!("{}", kata.skeleton.trim_end());
    Ok(ExitCode::SUCCESS)
}

fn cmd_run(config: &RunnerConfig, args: RunArgs) -> Result<ExitCode> {
    let catalog = load_catalog(config)?;
    let source = read_source(&args.source)?;
    let toolchain = GoToolchain::from_config(config)?;

    let start = Instant::now();
    let graded = grader::grade(&catalog, &args.slug, &source, &toolchain)
        .with_context(|| format!("grade submission for {}", args.slug))?;
    let elapsed = start.elapsed();

    if args.json {
        let text = serde_json::to_string_pretty(&graded.report).context("serialize report")?;
        println!("{text}");
    } else {
        print!("{}", render::render_report(&args.slug, &graded, elapsed));
    }
    Ok(exit_code(graded.verdict == Verdict::Passed))
}

fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("read submission from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("read submission {}", path.display()))
}

fn cmd_verify(config: &RunnerConfig, args: VerifyArgs) -> Result<ExitCode> {
    let catalog = load_catalog(config)?;
    let toolchain = GoToolchain::from_config(config)?;

    let work: Vec<(&str, PathBuf)> = catalog
        .katas()
        .iter()
        .map(|kata| (kata.slug.as_str(), args.solutions.join(format!("{}.go", kata.slug))))
        .filter(|(slug, path)| {
            let found = path.is_file();
            if !found {
                tracing::debug!(slug, "no solution file");
            }
            found
        })
        .collect();
    if work.is_empty() {
        return Err(anyhow!(
            "no <slug>.go solution files found in {}",
            args.solutions.display()
        ));
    }

    let jobs = args
        .jobs
        .or_else(|| std::thread::available_parallelism().ok().map(usize::from))
        .unwrap_or(1)
        .clamp(1, work.len());
    tracing::info!(katas = work.len(), jobs, "verifying solutions");

    let next = AtomicUsize::new(0);
    let mut results: Vec<(usize, Result<Graded>)> = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..jobs)
            .map(|_| {
                scope.spawn(|| {
                    let mut done = Vec::new();
                    loop {
                        let idx = next.fetch_add(1, Ordering::SeqCst);
                        let Some((slug, path)) = work.get(idx) else {
                            break;
                        };
                        let graded = read_source(path).and_then(|source| {
                            grader::grade(&catalog, slug, &source, &toolchain)
                                .with_context(|| format!("grade solution for {slug}"))
                        });
                        done.push((idx, graded));
                    }
                    done
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|worker| worker.join().map_err(|_| anyhow!("verify worker panicked")))
            .collect::<Result<Vec<_>>>()
            .map(|done| done.into_iter().flatten().collect::<Vec<_>>())
    })?;
    results.sort_by_key(|(idx, _)| *idx);

    let mut passed = 0;
    for (idx, graded) in results {
        let slug = work[idx].0;
        let graded = graded?;
        let mark = if graded.verdict == Verdict::Passed {
            passed += 1;
            "✓"
        } else {
            "✗"
        };
        println!(
            "{mark} {slug} {}/{} {}",
            graded.report.passed,
            graded.report.total,
            graded.verdict.label()
        );
    }
    println!("{passed}/{} katas passed", work.len());
    Ok(exit_code(passed == work.len()))
}

fn cmd_config(config: &RunnerConfig) -> Result<ExitCode> {
    let text = serde_json::to_string_pretty(config).context("serialize config")?;
    println!("{text}");
    Ok(ExitCode::SUCCESS)
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
