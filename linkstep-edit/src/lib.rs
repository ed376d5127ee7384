//! Edit engine for the shared linker script.
//!
//! Responsibilities:
//! - Snapshot the linker config and substitute the base-address literal.
//! - Hold the patch for exactly one build via [`PatchGuard`] and restore on every exit path.
//! - Keep a backup journal so an interrupted run can be recovered.
//! - Generate a unified diff preview of a patch.

pub mod error;
pub mod ports;

pub use error::{EditError, EditResult, PolicyBlockError, RestoreMismatch};
pub use ports::{
    BackupStore, FsBackupStore, FsLinkerConfig, InMemoryBackupStore, InMemoryLinkerConfig,
    LinkerConfig,
};

use anyhow::Context;
use diffy::PatchFormatter;
use linkstep_types::LoadAddress;
use sha2::{Digest, Sha256};
use tracing::{debug, error, warn};

/// What to do when the linker config lacks the base-address literal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TokenPolicy {
    /// Build anyway (at the unpatched address) and log a warning.
    #[default]
    Warn,
    /// Refuse to build; the config is left untouched.
    Require,
}

#[derive(Debug, Clone, Default)]
pub struct PatchOptions {
    pub token_policy: TokenPolicy,
}

/// The linker config as it was before a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub contents: String,
    pub sha256: String,
}

impl Snapshot {
    pub fn take(config: &dyn LinkerConfig) -> anyhow::Result<Self> {
        let contents = config.read_config().context("snapshot linker config")?;
        Ok(Self::of(contents))
    }

    pub fn of(contents: String) -> Self {
        let sha256 = sha256_hex(contents.as_bytes());
        Self { contents, sha256 }
    }
}

/// Result of substituting the base-address literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patched {
    pub contents: String,
    pub replacements: usize,
}

/// Replace every occurrence of `token` with the textual form of `address`.
///
/// Zero matches yields content identical to `original`.
pub fn patch_contents(original: &str, token: &str, address: LoadAddress) -> Patched {
    if token.is_empty() {
        return Patched {
            contents: original.to_string(),
            replacements: 0,
        };
    }
    Patched {
        contents: original.replace(token, &address.to_string()),
        replacements: original.matches(token).count(),
    }
}

/// Apply the token policy to a patch that matched nothing.
pub fn check_token(
    patched: &Patched,
    token: &str,
    location: &str,
    policy: TokenPolicy,
) -> EditResult<()> {
    if patched.replacements > 0 {
        return Ok(());
    }
    match policy {
        TokenPolicy::Warn => {
            warn!(
                token,
                location, "base-address token not found; building at the unpatched address"
            );
            Ok(())
        }
        TokenPolicy::Require => Err(PolicyBlockError::TokenMissing {
            token: token.to_string(),
            location: location.to_string(),
        }
        .into()),
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// A live patch of the linker config.
///
/// Acquiring writes the patched text; [`PatchGuard::restore`] writes the snapshot back and
/// reports errors. Dropping an unrestored guard (panic, early return) restores too, logging
/// any error since `Drop` cannot return one.
pub struct PatchGuard<'a> {
    config: &'a dyn LinkerConfig,
    backup: Option<&'a dyn BackupStore>,
    snapshot: Snapshot,
    released: bool,
}

impl<'a> PatchGuard<'a> {
    pub fn acquire(
        config: &'a dyn LinkerConfig,
        backup: Option<&'a dyn BackupStore>,
        snapshot: Snapshot,
        patched: &str,
    ) -> EditResult<Self> {
        if let Some(store) = backup {
            store
                .save(&snapshot.contents)
                .with_context(|| format!("journal {}", store.location()))?;
        }

        // From here on the guard owns the config, so a failed write still gets reverted.
        let guard = Self {
            config,
            backup,
            snapshot,
            released: false,
        };
        config
            .write_config(patched)
            .with_context(|| format!("patch {}", config.location()))?;
        debug!(location = config.location().as_str(), "linker config patched");
        Ok(guard)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Write the snapshot back, verify it, and clear the backup.
    pub fn restore(mut self) -> EditResult<()> {
        self.released = true;
        self.write_back().map_err(EditError::from)
    }

    fn write_back(&self) -> anyhow::Result<()> {
        let location = self.config.location();
        self.config
            .write_config(&self.snapshot.contents)
            .with_context(|| format!("restore {location}"))?;

        let after = self
            .config
            .read_config()
            .with_context(|| format!("verify {location}"))?;
        let actual = sha256_hex(after.as_bytes());
        if actual != self.snapshot.sha256 {
            return Err(RestoreMismatch {
                location,
                expected: self.snapshot.sha256.clone(),
                actual,
            }
            .into());
        }

        if let Some(store) = self.backup {
            store
                .clear()
                .with_context(|| format!("clear {}", store.location()))?;
        }
        debug!(location = location.as_str(), "linker config restored");
        Ok(())
    }
}

impl Drop for PatchGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.write_back() {
            error!(
                location = self.config.location().as_str(),
                "failed to restore linker config: {e:#}"
            );
        }
    }
}

/// Run `f` with the config holding `patched`, restoring `original` on every exit path.
///
/// The body's own result is returned untouched; an `Err` here always means the config
/// could not be patched or restored.
pub fn with_patched_config<R>(
    config: &dyn LinkerConfig,
    backup: Option<&dyn BackupStore>,
    original: Snapshot,
    patched: &str,
    f: impl FnOnce() -> R,
) -> EditResult<R> {
    let guard = PatchGuard::acquire(config, backup, original, patched)?;
    let out = f();
    guard.restore()?;
    Ok(out)
}

/// Outcome of [`run_patched`].
#[derive(Debug)]
pub struct PatchedRun<R> {
    pub output: R,
    pub replacements: usize,
}

/// Snapshot, patch `token` to `address`, run `f`, restore.
pub fn run_patched<R>(
    config: &dyn LinkerConfig,
    backup: Option<&dyn BackupStore>,
    token: &str,
    address: LoadAddress,
    opts: &PatchOptions,
    f: impl FnOnce() -> R,
) -> EditResult<PatchedRun<R>> {
    let snapshot = Snapshot::take(config)?;
    let patched = patch_contents(&snapshot.contents, token, address);
    check_token(&patched, token, &config.location(), opts.token_policy)?;

    let output = with_patched_config(config, backup, snapshot, &patched.contents, f)?;
    Ok(PatchedRun {
        output,
        replacements: patched.replacements,
    })
}

/// Refuse to start while a backup from an interrupted run exists.
pub fn ensure_no_stale_backup(backup: &dyn BackupStore) -> EditResult<()> {
    if backup
        .load()
        .with_context(|| format!("check {}", backup.location()))?
        .is_some()
    {
        return Err(PolicyBlockError::StaleBackup {
            location: backup.location(),
        }
        .into());
    }
    Ok(())
}

/// Copy a leftover backup over the linker config. Returns false when there was none.
pub fn recover_from_backup(
    config: &dyn LinkerConfig,
    backup: &dyn BackupStore,
) -> anyhow::Result<bool> {
    let Some(contents) = backup
        .load()
        .with_context(|| format!("read {}", backup.location()))?
    else {
        return Ok(false);
    };
    config
        .write_config(&contents)
        .with_context(|| format!("recover {}", config.location()))?;
    backup.clear()?;
    Ok(true)
}

/// Unified diff between the snapshot and the patched text.
pub fn preview_patch(location: &str, original: &str, patched: &str) -> String {
    if original == patched {
        return String::new();
    }
    let formatter = PatchFormatter::new();
    let patch = diffy::create_patch(original, patched);

    let mut out = format!("--- a/{location}\n+++ b/{location}\n");
    let body = formatter.fmt_patch(&patch).to_string();
    // diffy repeats its own ---/+++ header; keep only the hunks.
    for line in body.lines().skip_while(|l| !l.starts_with("@@")) {
        out.push_str(line);
        out.push('\n');
    }
    out
}
