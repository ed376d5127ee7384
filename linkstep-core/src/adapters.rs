//! Default process- and filesystem-backed port implementations.

use crate::ports::{BatchObserver, BuildInvoker, WritePort};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use linkstep_types::{BuildTarget, LoadAddress};
use std::process::Command;
use tracing::{debug, info, warn};

/// Runs an external command per target with inherited stdio.
///
/// Arguments may contain `{name}` (canonical target name) and `{address}` (hex load address).
#[derive(Debug, Clone)]
pub struct CommandInvoker {
    program: String,
    args: Vec<String>,
    current_dir: Utf8PathBuf,
}

impl CommandInvoker {
    pub fn new(command: &[String], current_dir: Utf8PathBuf) -> anyhow::Result<Self> {
        let Some((program, args)) = command.split_first() else {
            anyhow::bail!("build command is empty");
        };
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            current_dir,
        })
    }

    /// The argument list for one target, placeholders filled in.
    pub fn expand_args(&self, target: &BuildTarget, address: LoadAddress) -> Vec<String> {
        let address = address.to_string();
        self.args
            .iter()
            .map(|a| {
                a.replace("{name}", &target.name)
                    .replace("{address}", &address)
            })
            .collect()
    }
}

impl BuildInvoker for CommandInvoker {
    fn build(&mut self, target: &BuildTarget, address: LoadAddress) -> anyhow::Result<bool> {
        let args = self.expand_args(target, address);
        debug!(
            program = self.program.as_str(),
            args = ?args,
            dir = self.current_dir.as_str(),
            "invoking build"
        );
        let status = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.current_dir)
            .status()
            .with_context(|| format!("run {} for {}", self.program, target.name))?;
        debug!(app = target.name.as_str(), code = ?status.code(), "build exited");
        Ok(status.success())
    }
}

/// Prints per-target progress to stdout.
#[derive(Debug, Clone, Default)]
pub struct StdoutObserver;

impl BatchObserver for StdoutObserver {
    fn target_built(&mut self, target: &BuildTarget, address: LoadAddress) {
        println!(
            "[linkstep] application {} start with address {}",
            target.name, address
        );
    }

    fn target_failed(&mut self, target: &BuildTarget, _address: LoadAddress) {
        println!("[linkstep] application {} build failed", target.name);
    }

    fn target_unpatched(&mut self, target: &BuildTarget, token: &str) {
        println!(
            "[linkstep] application {} built at unpatched address (token {} not found)",
            target.name, token
        );
    }
}

/// Logs progress through `tracing` instead of stdout; for embedding.
#[derive(Debug, Clone, Default)]
pub struct TracingObserver;

impl BatchObserver for TracingObserver {
    fn target_built(&mut self, target: &BuildTarget, address: LoadAddress) {
        info!(app = target.name.as_str(), %address, "application built");
    }

    fn target_failed(&mut self, target: &BuildTarget, address: LoadAddress) {
        info!(app = target.name.as_str(), %address, "application build failed");
    }

    fn target_unpatched(&mut self, target: &BuildTarget, token: &str) {
        warn!(app = target.name.as_str(), token, "application built at unpatched address");
    }
}

/// Filesystem write operations.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        std::fs::write(path, contents).with_context(|| format!("write {}", path))
    }

    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(path).with_context(|| format!("create_dir_all {}", path))
    }
}
