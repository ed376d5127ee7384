//! Batch, plan, and restore pipelines, extracted from the CLI.
//!
//! These entry points are I/O-agnostic: the linker script, the build command, and
//! progress output are all reached through port traits.

use crate::ports::{BatchObserver, BuildInvoker, WritePort};
use crate::settings::BatchSettings;
use anyhow::Context;
use linkstep_domain::{AddressPlan, duplicate_names};
use linkstep_edit::{
    BackupStore, EditError, LinkerConfig, PatchOptions, Snapshot, ensure_no_stale_backup,
    patch_contents, preview_patch, recover_from_backup, run_patched,
};
use linkstep_types::{
    BatchReport, BuildOutcome, BuildStatus, BuildTarget, LoadAddress, PlanInfo, ToolInfo,
};
use tracing::{debug, info, warn};

/// Error type for pipeline results. Exit code 2 = policy block, 1 = everything else.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("application {name} build failed")]
    BuildFailed { name: String, address: LoadAddress },
    #[error("{0}")]
    PolicyBlock(String),
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ToolError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ToolError::PolicyBlock(_) => 2,
            ToolError::BuildFailed { .. } | ToolError::Internal(_) => 1,
        }
    }
}

impl From<EditError> for ToolError {
    fn from(e: EditError) -> Self {
        match e {
            EditError::PolicyBlock(b) => ToolError::PolicyBlock(b.to_string()),
            EditError::Runtime(err) => ToolError::Internal(err),
        }
    }
}

/// Outcome of `run_batch`. The report is populated even when `result` is an error.
pub struct BatchOutcome {
    pub report: BatchReport,
    pub result: Result<(), ToolError>,
}

/// The linker script side of a batch: the config plus its optional backup journal.
#[derive(Clone, Copy)]
pub struct ConfigPorts<'a> {
    pub config: &'a dyn LinkerConfig,
    pub backup: Option<&'a dyn BackupStore>,
}

/// Build every target in ordinal order, each under its own patched linker script.
///
/// For each target: snapshot, patch the base-address literal, build, restore. The
/// restore completes before the next target is touched. The first failed build stops
/// the batch; remaining targets are reported as not attempted.
pub fn run_batch(
    settings: &BatchSettings,
    targets: &[BuildTarget],
    ports: ConfigPorts<'_>,
    invoker: &mut dyn BuildInvoker,
    observer: &mut dyn BatchObserver,
    tool: ToolInfo,
) -> BatchOutcome {
    let mut report = BatchReport::new(
        tool,
        PlanInfo {
            base: settings.base,
            step: settings.step,
            linker: ports.config.location(),
        },
    );

    let result = drive(settings, targets, ports, invoker, observer, &mut report);
    if let Err(e) = &result
        && !matches!(e, ToolError::BuildFailed { .. })
    {
        report.error = Some(e.to_string());
    }
    report.finish();

    info!(
        built = report.summary.built,
        failed = report.summary.failed,
        not_attempted = report.summary.not_attempted,
        "batch finished"
    );
    BatchOutcome { report, result }
}

fn drive(
    settings: &BatchSettings,
    targets: &[BuildTarget],
    ports: ConfigPorts<'_>,
    invoker: &mut dyn BuildInvoker,
    observer: &mut dyn BatchObserver,
    report: &mut BatchReport,
) -> Result<(), ToolError> {
    let plan = AddressPlan::new(settings.base, settings.step).context("address plan")?;
    let token = plan.canonical_token();

    // Every address is fixed before the first build, from position alone.
    let assigned = plan.assign(targets).context("assign load addresses")?;

    for dup in duplicate_names(targets) {
        report
            .warnings
            .push(format!("duplicate target name: {dup}"));
    }

    let unknown: Vec<&str> = settings
        .only
        .iter()
        .filter(|name| !targets.iter().any(|t| &t.name == *name))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(anyhow::anyhow!("no application named {}", unknown.join(", ")).into());
    }

    if let Some(store) = ports.backup {
        ensure_no_stale_backup(store)?;
    }

    let opts = PatchOptions {
        token_policy: settings.token_policy,
    };

    let mut pending = assigned.iter();
    while let Some(&(target, address)) = pending.next() {
        if !settings.only.is_empty() && !settings.only.contains(&target.name) {
            debug!(app = target.name.as_str(), "not selected");
            report.results.push(
                BuildOutcome::new(target, address, BuildStatus::NotAttempted)
                    .with_message("not selected"),
            );
            continue;
        }

        info!(app = target.name.as_str(), %address, "building");
        let mut invoked = false;
        let run = run_patched(
            ports.config,
            ports.backup,
            &token,
            address,
            &opts,
            || {
                invoked = true;
                invoker.build(target, address)
            },
        );

        let run = match run {
            Ok(run) => run,
            Err(e) => {
                // After the build ran, only the restore can have failed.
                let status = if invoked {
                    observer.target_failed(target, address);
                    BuildStatus::Failed
                } else {
                    BuildStatus::NotAttempted
                };
                report
                    .results
                    .push(BuildOutcome::new(target, address, status).with_message(e.to_string()));
                skip_rest(report, pending, "batch stopped");
                return Err(e.into());
            }
        };

        let unpatched = run.replacements == 0;
        if unpatched {
            report.warnings.push(format!(
                "{token} not found in {}; {} built at the unpatched address",
                ports.config.location(),
                target.name
            ));
        }

        match run.output {
            Ok(true) => {
                if unpatched {
                    observer.target_unpatched(target, &token);
                } else {
                    observer.target_built(target, address);
                }
                report
                    .results
                    .push(BuildOutcome::new(target, address, BuildStatus::Built));
            }
            outcome => {
                let message = match outcome {
                    Err(e) => format!("{e:#}"),
                    Ok(_) => "build command reported failure".to_string(),
                };
                warn!(app = target.name.as_str(), %address, "{message}");
                observer.target_failed(target, address);
                report.results.push(
                    BuildOutcome::new(target, address, BuildStatus::Failed).with_message(message),
                );
                skip_rest(report, pending, "an earlier target failed");
                return Err(ToolError::BuildFailed {
                    name: target.name.clone(),
                    address,
                });
            }
        }
    }

    Ok(())
}

fn skip_rest<'a, 'b: 'a>(
    report: &mut BatchReport,
    rest: impl Iterator<Item = &'a (&'b BuildTarget, LoadAddress)>,
    why: &str,
) {
    for &(target, address) in rest {
        report.results.push(
            BuildOutcome::new(target, address, BuildStatus::NotAttempted).with_message(why),
        );
    }
}

/// One row of a dry-run plan.
#[derive(Debug, Clone)]
pub struct PlannedTarget {
    pub target: BuildTarget,
    pub address: LoadAddress,
    pub replacements: usize,
    pub diff: String,
}

/// Compute addresses and patch previews for every target without writing anything.
pub fn run_plan(
    settings: &BatchSettings,
    targets: &[BuildTarget],
    config: &dyn LinkerConfig,
) -> anyhow::Result<Vec<PlannedTarget>> {
    let plan = AddressPlan::new(settings.base, settings.step).context("address plan")?;
    let token = plan.canonical_token();
    let snapshot = Snapshot::take(config)?;
    let location = config.location();

    let mut out = Vec::with_capacity(targets.len());
    for (target, address) in plan.assign(targets).context("assign load addresses")? {
        let patched = patch_contents(&snapshot.contents, &token, address);
        out.push(PlannedTarget {
            target: target.clone(),
            address,
            replacements: patched.replacements,
            diff: preview_patch(&location, &snapshot.contents, &patched.contents),
        });
    }
    Ok(out)
}

/// Put the linker script back from the backup journal. Returns false when no backup existed.
pub fn run_restore(config: &dyn LinkerConfig, backup: &dyn BackupStore) -> anyhow::Result<bool> {
    let restored = recover_from_backup(config, backup)?;
    if restored {
        info!(location = config.location().as_str(), "restored from backup");
    } else {
        debug!(location = backup.location().as_str(), "no backup to restore");
    }
    Ok(restored)
}

/// Write `report.json` and `report.md` to `out_dir`.
#[cfg(feature = "reporting")]
pub fn write_report_artifacts(
    report: &BatchReport,
    out_dir: &camino::Utf8Path,
    writer: &dyn WritePort,
) -> anyhow::Result<()> {
    writer.create_dir_all(out_dir)?;

    let json = serde_json::to_string_pretty(report).context("serialize report")?;
    writer.write_file(&out_dir.join("report.json"), json.as_bytes())?;

    let md = linkstep_render::render_report_md(report);
    writer.write_file(&out_dir.join("report.md"), md.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkstep_edit::PolicyBlockError;

    #[test]
    fn exit_codes() {
        let build = ToolError::BuildFailed {
            name: "beta".to_string(),
            address: LoadAddress::new(0x8042_0000),
        };
        assert_eq!(build.exit_code(), 1);
        assert_eq!(build.to_string(), "application beta build failed");

        let block: ToolError = EditError::from(PolicyBlockError::StaleBackup {
            location: "x.bak".to_string(),
        })
        .into();
        assert_eq!(block.exit_code(), 2);

        let internal: ToolError = EditError::from(anyhow::anyhow!("disk full")).into();
        assert_eq!(internal.exit_code(), 1);
        assert!(internal.to_string().contains("disk full"));
    }
}
