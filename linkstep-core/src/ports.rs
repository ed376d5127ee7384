//! Port traits abstracting the build and reporting I/O away from the pipeline.

use camino::Utf8Path;
use linkstep_types::{BuildTarget, LoadAddress};

/// Runs the external build for one target while the linker script holds its address.
///
/// `Ok(false)` and `Err(_)` are both treated as a failed build.
pub trait BuildInvoker {
    fn build(&mut self, target: &BuildTarget, address: LoadAddress) -> anyhow::Result<bool>;
}

/// Per-target progress notifications. Informational only.
pub trait BatchObserver {
    fn target_built(&mut self, target: &BuildTarget, address: LoadAddress);
    fn target_failed(&mut self, target: &BuildTarget, address: LoadAddress);
    /// Built, but the linker script lacked `token`, so the image kept whatever address it names.
    fn target_unpatched(&mut self, target: &BuildTarget, token: &str);
}

/// File-system write operations.
pub trait WritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()>;
}
