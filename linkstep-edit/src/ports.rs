//! Port traits for the shared linker configuration and its backup.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use std::cell::RefCell;

/// The shared linker configuration. Reads and writes always cover the whole text.
pub trait LinkerConfig {
    fn location(&self) -> String;
    fn read_config(&self) -> anyhow::Result<String>;
    fn write_config(&self, contents: &str) -> anyhow::Result<()>;
}

/// Holds a copy of the pre-patch contents while a patch is live.
pub trait BackupStore {
    fn location(&self) -> String;
    fn load(&self) -> anyhow::Result<Option<String>>;
    fn save(&self, contents: &str) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

/// Linker script on disk.
#[derive(Debug, Clone)]
pub struct FsLinkerConfig {
    path: Utf8PathBuf,
}

impl FsLinkerConfig {
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl LinkerConfig for FsLinkerConfig {
    fn location(&self) -> String {
        self.path.to_string()
    }

    fn read_config(&self) -> anyhow::Result<String> {
        fs::read_to_string(&self.path).with_context(|| format!("read {}", self.path))
    }

    fn write_config(&self, contents: &str) -> anyhow::Result<()> {
        fs::write(&self.path, contents).with_context(|| format!("write {}", self.path))
    }
}

/// Backup file next to the linker script, e.g. `linker.ld.linkstep.bak`.
#[derive(Debug, Clone)]
pub struct FsBackupStore {
    path: Utf8PathBuf,
}

impl FsBackupStore {
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    /// Backup path for `linker` with `suffix` appended to its file name.
    pub fn beside(linker: &Utf8Path, suffix: &str) -> Self {
        Self::new(Utf8PathBuf::from(format!("{linker}{suffix}")))
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl BackupStore for FsBackupStore {
    fn location(&self) -> String {
        self.path.to_string()
    }

    fn load(&self) -> anyhow::Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&self.path)
            .map(Some)
            .with_context(|| format!("read backup {}", self.path))
    }

    fn save(&self, contents: &str) -> anyhow::Result<()> {
        fs::write(&self.path, contents).with_context(|| format!("write backup {}", self.path))
    }

    fn clear(&self) -> anyhow::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("remove backup {}", self.path))?;
        }
        Ok(())
    }
}

/// In-memory linker config for embedding and testing.
///
/// Every write is appended to a history so callers can check what was written and in
/// which order. Writes can be made to fail after a given number of successes.
#[derive(Debug, Default)]
pub struct InMemoryLinkerConfig {
    contents: RefCell<String>,
    writes: RefCell<Vec<String>>,
    fail_writes_after: Option<usize>,
}

impl InMemoryLinkerConfig {
    pub fn new(contents: impl Into<String>) -> Self {
        Self {
            contents: RefCell::new(contents.into()),
            writes: RefCell::new(Vec::new()),
            fail_writes_after: None,
        }
    }

    /// Make every write after the first `n` fail.
    pub fn failing_writes_after(mut self, n: usize) -> Self {
        self.fail_writes_after = Some(n);
        self
    }

    pub fn contents(&self) -> String {
        self.contents.borrow().clone()
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.borrow().clone()
    }
}

impl LinkerConfig for InMemoryLinkerConfig {
    fn location(&self) -> String {
        "<memory>".to_string()
    }

    fn read_config(&self) -> anyhow::Result<String> {
        Ok(self.contents())
    }

    fn write_config(&self, contents: &str) -> anyhow::Result<()> {
        if let Some(limit) = self.fail_writes_after
            && self.writes.borrow().len() >= limit
        {
            anyhow::bail!("write <memory>: simulated failure");
        }
        self.writes.borrow_mut().push(contents.to_string());
        *self.contents.borrow_mut() = contents.to_string();
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBackupStore {
    contents: RefCell<Option<String>>,
}

impl InMemoryBackupStore {
    pub fn new(contents: Option<String>) -> Self {
        Self {
            contents: RefCell::new(contents),
        }
    }
}

impl BackupStore for InMemoryBackupStore {
    fn location(&self) -> String {
        "<memory backup>".to_string()
    }

    fn load(&self) -> anyhow::Result<Option<String>> {
        Ok(self.contents.borrow().clone())
    }

    fn save(&self, contents: &str) -> anyhow::Result<()> {
        *self.contents.borrow_mut() = Some(contents.to_string());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        *self.contents.borrow_mut() = None;
        Ok(())
    }
}
