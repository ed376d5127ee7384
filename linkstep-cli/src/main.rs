mod config;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use config::{CliOverrides, ConfigMerger};
use linkstep_core::adapters::{CommandInvoker, FsWritePort, StdoutObserver};
use linkstep_core::pipeline::{
    ConfigPorts, ToolError, run_batch, run_plan, run_restore, write_report_artifacts,
};
use linkstep_core::settings::BatchSettings;
use linkstep_core::{BackupStore, FsBackupStore, FsLinkerConfig, FsTargetSource};
use linkstep_domain::load_targets;
use linkstep_types::{BuildTarget, LoadAddress, ToolInfo};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "linkstep",
    version,
    about = "Build every application at its own load address by patching a shared linker script."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build all applications in order, each linked at base + step * index.
    Build(BuildArgs),
    /// Show targets, their addresses, and optionally the linker patch, without building.
    Plan(PlanArgs),
    /// Restore the linker script from the backup left by an interrupted build.
    Restore(RestoreArgs),
}

#[derive(Debug, clap::Args)]
struct LayoutArgs {
    /// Project directory holding the applications and linker script (default: current directory).
    #[arg(long, default_value = ".")]
    project_dir: Utf8PathBuf,

    /// Directory of application sources, relative to the project (default: src/bin).
    #[arg(long)]
    bin_dir: Option<Utf8PathBuf>,

    /// Shared linker script, relative to the project (default: src/linker.ld).
    #[arg(long)]
    linker: Option<Utf8PathBuf>,

    /// Load address of the first application; also the literal patched in the linker script.
    #[arg(long)]
    base: Option<LoadAddress>,

    /// Distance between consecutive applications' load addresses.
    #[arg(long)]
    step: Option<LoadAddress>,
}

#[derive(Debug, Parser)]
struct BuildArgs {
    #[command(flatten)]
    layout: LayoutArgs,

    /// Build only the named applications (repeatable). Addresses still follow the full list.
    #[arg(long)]
    only: Vec<String>,

    /// Refuse to build when the linker script lacks the base-address literal.
    #[arg(long, default_value_t = false)]
    require_token: bool,

    /// Do not journal the linker script while it is patched.
    #[arg(long, default_value_t = false)]
    no_backup: bool,

    /// Write report.json and report.md to this directory.
    #[arg(long)]
    report_dir: Option<Utf8PathBuf>,

    /// Build command; `{name}` and `{address}` are substituted (default: cargo build --bin {name} --release).
    #[arg(last = true)]
    command: Vec<String>,
}

#[derive(Debug, Parser)]
struct PlanArgs {
    #[command(flatten)]
    layout: LayoutArgs,

    /// Print the unified diff each application's patch would make.
    #[arg(long, default_value_t = false)]
    diff: bool,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct RestoreArgs {
    /// Project directory (default: current directory).
    #[arg(long, default_value = ".")]
    project_dir: Utf8PathBuf,

    /// Shared linker script, relative to the project (default: src/linker.ld).
    #[arg(long)]
    linker: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        error!("{}", e);
        return ExitCode::from(e.exit_code());
    }
    ExitCode::from(0)
}

fn real_main() -> Result<(), ToolError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Build(args) => cmd_build(args),
        Command::Plan(args) => cmd_plan(args).map_err(ToolError::from),
        Command::Restore(args) => cmd_restore(args).map_err(ToolError::from),
    }
}

fn settings_for(layout: LayoutArgs, extra: CliOverrides) -> anyhow::Result<BatchSettings> {
    let file_config =
        config::load_or_default(&layout.project_dir).context("load linkstep.toml config")?;
    let overrides = CliOverrides {
        bin_dir: layout.bin_dir,
        linker: layout.linker,
        base: layout.base,
        step: layout.step,
        ..extra
    };
    let settings = ConfigMerger::new(file_config).merge(&layout.project_dir, overrides);
    debug!(?settings, "merged settings");
    Ok(settings)
}

fn enumerate(settings: &BatchSettings) -> anyhow::Result<Vec<BuildTarget>> {
    let source = FsTargetSource::new(settings.bin_dir_path());
    load_targets(&source).with_context(|| format!("enumerate {}", settings.bin_dir_path()))
}

fn cmd_build(args: BuildArgs) -> Result<(), ToolError> {
    let settings = settings_for(
        args.layout,
        CliOverrides {
            only: args.only,
            require_token: args.require_token,
            no_backup: args.no_backup,
            report_dir: args.report_dir,
            command: args.command,
            ..CliOverrides::default()
        },
    )?;

    let targets = enumerate(&settings)?;
    info!(count = targets.len(), "enumerated applications");

    let linker = FsLinkerConfig::new(settings.linker_path());
    let backup = FsBackupStore::new(settings.backup_path());
    let ports = ConfigPorts {
        config: &linker,
        backup: settings
            .backup_enabled
            .then_some(&backup as &dyn BackupStore),
    };
    let mut invoker = CommandInvoker::new(&settings.command, settings.project_dir.clone())?;
    let mut observer = StdoutObserver;

    let outcome = run_batch(
        &settings,
        &targets,
        ports,
        &mut invoker,
        &mut observer,
        tool_info(),
    );

    if let Some(dir) = settings.report_dir_path() {
        write_report_artifacts(&outcome.report, &dir, &FsWritePort)
            .with_context(|| format!("write report to {}", dir))?;
        info!("wrote report to {}", dir);
    }

    outcome.result
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let settings = settings_for(args.layout, CliOverrides::default())?;
    let targets = enumerate(&settings)?;
    let linker = FsLinkerConfig::new(settings.linker_path());
    let planned = run_plan(&settings, &targets, &linker)?;

    match args.format {
        OutputFormat::Text => {
            println!("Linker: {}", settings.linker_path());
            println!("Base:   {}  Step: {}\n", settings.base, settings.step);
            println!("  {:<4} {:<24} ADDRESS", "#", "APPLICATION");
            println!("  {:<4} {:<24} -------", "-", "-----------");
            for p in &planned {
                let note = if p.replacements == 0 {
                    "  (token not found)"
                } else {
                    ""
                };
                println!(
                    "  {:<4} {:<24} {}{}",
                    p.target.ordinal, p.target.name, p.address, note
                );
            }
            if args.diff {
                for p in planned.iter().filter(|p| !p.diff.is_empty()) {
                    println!("\n# {}", p.target.name);
                    print!("{}", p.diff);
                }
            }
        }
        OutputFormat::Json => {
            let rows: Vec<_> = planned
                .iter()
                .map(|p| {
                    let mut row = serde_json::json!({
                        "name": p.target.name,
                        "ordinal": p.target.ordinal,
                        "address": p.address,
                        "replacements": p.replacements,
                    });
                    if args.diff {
                        row["diff"] = serde_json::Value::String(p.diff.clone());
                    }
                    row
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}

fn cmd_restore(args: RestoreArgs) -> anyhow::Result<()> {
    let file_config =
        config::load_or_default(&args.project_dir).context("load linkstep.toml config")?;
    let settings = ConfigMerger::new(file_config).merge(
        &args.project_dir,
        CliOverrides {
            linker: args.linker,
            ..CliOverrides::default()
        },
    );

    let linker = FsLinkerConfig::new(settings.linker_path());
    let backup = FsBackupStore::new(settings.backup_path());
    if run_restore(&linker, &backup)? {
        println!("restored {} from {}", linker.path(), backup.path());
    } else {
        println!("nothing to restore: {} not found", backup.path());
    }
    Ok(())
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "linkstep".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    }
}
